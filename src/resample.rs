use crate::{
    grid::{Grid, SlotOrdering},
    metric::{DataKey, RawSample},
};

/// One value per grid slot, `None` where nothing is known.
pub type Series = Vec<Option<f64>>;

/// Aligns one metric's samples onto `grid`.
///
/// Samples are sorted by timestamp first. When several land in the same
/// slot, the earliest one is kept. Samples outside the grid, and samples
/// without a value for `data_key`, are ignored. Gaps between two placed
/// slots are filled by linear interpolation unless `statsd` is set; slots
/// before the first or after the last placed value are left empty.
pub fn resample(samples: &[RawSample], grid: &Grid, data_key: &DataKey, statsd: bool) -> Series {
    let mut sorted: Vec<&RawSample> = samples.iter().collect();
    sorted.sort_by_key(|s| s.timestamp);

    let mut series: Series = vec![None; grid.len()];
    let mut placed: Vec<usize> = Vec::new();
    for sample in sorted {
        let slot = match grid.ordering(sample.timestamp) {
            SlotOrdering::Slot(slot) => slot,
            SlotOrdering::Before => continue,
            SlotOrdering::After => break,
        };
        if series[slot].is_some() {
            // Overlaps an earlier sample.
            continue;
        }
        if let Some(value) = data_key.extract(sample) {
            series[slot] = Some(value);
            placed.push(slot);
        }
    }

    if !statsd {
        for pair in placed.windows(2) {
            interpolate(&mut series, pair[0], pair[1]);
        }
    }
    series
}

// Fills the slots strictly between `from` and `to` on the line between
// their values.
fn interpolate(series: &mut Series, from: usize, to: usize) {
    let (start, end) = match (series[from], series[to]) {
        (Some(start), Some(end)) => (start, end),
        _ => return,
    };
    let width = (to - from) as f64;
    for i in (from + 1)..to {
        let fraction = (i - from) as f64 / width;
        series[i] = Some(start + (end - start) * fraction);
    }
}
