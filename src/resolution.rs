use serde::{Deserialize, Serialize};

/// Rollup granularity the store keeps data at, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "FULL")]
    Full,
    #[serde(rename = "MIN5")]
    Min5,
    #[serde(rename = "MIN20")]
    Min20,
    #[serde(rename = "MIN60")]
    Min60,
    #[serde(rename = "MIN240")]
    Min240,
    #[serde(rename = "MIN1440")]
    Min1440,
}

const WEEK_MINUTES: i64 = 60 * 24 * 7;

// Largest span, in whole minutes, each tier is used for. Anything longer
// than the last entry goes to MIN1440.
const THRESHOLDS: [(i64, Resolution); 5] = [
    (400, Resolution::Full),
    (2000, Resolution::Min5),
    (8000, Resolution::Min20),
    (24000, Resolution::Min60),
    (18 * WEEK_MINUTES, Resolution::Min240),
];

impl Resolution {
    pub fn period_seconds(&self) -> i64 {
        match self {
            Resolution::Full => 60,
            Resolution::Min5 => 5 * 60,
            Resolution::Min20 => 20 * 60,
            Resolution::Min60 => 60 * 60,
            Resolution::Min240 => 240 * 60,
            Resolution::Min1440 => 1440 * 60,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Full => "FULL",
            Resolution::Min5 => "MIN5",
            Resolution::Min20 => "MIN20",
            Resolution::Min60 => "MIN60",
            Resolution::Min240 => "MIN240",
            Resolution::Min1440 => "MIN1440",
        }
    }
}

/// Picks the rollup to query for `[start, end]` (seconds). The span is
/// compared in whole minutes, so a span only moves to a coarser tier once
/// it exceeds a threshold by a full minute.
pub fn select_resolution(start: i64, end: i64) -> Resolution {
    let minutes = end.saturating_sub(start).max(0) / 60;
    THRESHOLDS
        .iter()
        .find(|(limit, _)| minutes <= *limit)
        .map(|(_, resolution)| *resolution)
        .unwrap_or(Resolution::Min1440)
}

#[cfg(test)]
pub mod tests {
    use super::{select_resolution, Resolution};

    const EIGHTEEN_WEEKS: i64 = 60 * 60 * 24 * 7 * 18;

    #[test]
    fn test_eighteen_week_boundary() {
        assert_eq!(select_resolution(0, EIGHTEEN_WEEKS + 60), Resolution::Min1440);
        assert_eq!(select_resolution(0, EIGHTEEN_WEEKS + 59), Resolution::Min240);
        assert_eq!(select_resolution(0, EIGHTEEN_WEEKS), Resolution::Min240);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(select_resolution(100, 100), Resolution::Full);
        assert_eq!(select_resolution(0, 400 * 60), Resolution::Full);
        assert_eq!(select_resolution(0, 401 * 60), Resolution::Min5);
        assert_eq!(select_resolution(1426120000, 1426147000), Resolution::Min5);
        assert_eq!(select_resolution(0, 8000 * 60), Resolution::Min20);
        assert_eq!(select_resolution(0, 8001 * 60), Resolution::Min60);
        assert_eq!(select_resolution(0, 24001 * 60), Resolution::Min240);
        // Inverted ranges fall back to the finest tier.
        assert_eq!(select_resolution(500, 0), Resolution::Full);
        assert_eq!(select_resolution(i64::MIN, i64::MAX), Resolution::Min1440);
        assert_eq!(select_resolution(i64::MAX, i64::MIN), Resolution::Full);
    }

    #[test]
    fn test_periods() {
        assert_eq!(Resolution::Full.period_seconds(), 60);
        assert_eq!(Resolution::Min5.period_seconds(), 300);
        assert_eq!(Resolution::Min1440.period_seconds(), 86400);
        assert!(Resolution::Full < Resolution::Min1440);
        assert_eq!(
            serde_json::to_string(&Resolution::Min240).unwrap(),
            "\"MIN240\""
        );
        assert_eq!(Resolution::Min20.as_str(), "MIN20");
    }
}
