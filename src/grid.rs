use thiserror::Error;

/// Largest number of slots a grid may have.
pub const MAX_SLOTS: usize = 1_000_000;

#[derive(Error, Debug, PartialEq)]
pub enum GridError {
    #[error("step must be greater than zero")]
    ZeroStep,
    #[error("end {end} is before start {start}")]
    InvertedRange { start: i64, end: i64 },
    #[error("time range {start}..{end} at step {step} is out of bounds")]
    RangeTooLarge { start: i64, end: i64, step: i64 },
}

// Where a timestamp lands relative to the grid.
#[derive(Debug, PartialEq, Eq)]
pub enum SlotOrdering {
    Before,
    Slot(usize),
    After,
}

/// Fixed-step time grid with slots at `start + i * step` for every
/// `i` in `0..=last`. All inputs are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    start: i64,
    // Requested end, not snapped to the grid.
    until: i64,
    step: i64,
    last: usize,
}

impl Grid {
    /// Every value derived from the grid, in seconds or milliseconds, is
    /// checked to fit in an `i64` here, and the slot count is bounded by
    /// [`MAX_SLOTS`].
    pub fn new(start: i64, end: i64, step: i64) -> Result<Self, GridError> {
        if step <= 0 {
            return Err(GridError::ZeroStep);
        }
        if end < start {
            return Err(GridError::InvertedRange { start, end });
        }
        let too_large = || GridError::RangeTooLarge { start, end, step };

        let span = end.checked_sub(start).ok_or_else(too_large)?;
        let last = usize::try_from(span / step).map_err(|_| too_large())?;
        if last >= MAX_SLOTS {
            return Err(too_large());
        }
        let slots = i64::try_from(last + 1).map_err(|_| too_large())?;
        slots
            .checked_mul(step)
            .and_then(|width| width.checked_add(start))
            .and_then(|snapped| snapped.checked_mul(1000))
            .ok_or_else(too_large)?;
        start.checked_mul(1000).ok_or_else(too_large)?;
        end.checked_mul(1000).ok_or_else(too_large)?;

        Ok(Self {
            start,
            until: end,
            step,
            last,
        })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    // A grid always has at least one slot.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.last + 1
    }

    /// One step past the last slot.
    pub fn end(&self) -> i64 {
        self.start + self.len() as i64 * self.step
    }

    /// The requested `[start, end]` in milliseconds.
    pub fn window_millis(&self) -> (i64, i64) {
        (self.start * 1000, self.until * 1000)
    }

    /// Slot for a timestamp in milliseconds. Sub-second offsets count, so
    /// a point one millisecond short of a boundary stays in the earlier slot.
    pub fn ordering(&self, timestamp_millis: i64) -> SlotOrdering {
        let offset = timestamp_millis.saturating_sub(self.start * 1000);
        let slot = offset.div_euclid(self.step * 1000);
        if slot < 0 {
            return SlotOrdering::Before;
        }
        match usize::try_from(slot) {
            Ok(slot) if slot <= self.last => SlotOrdering::Slot(slot),
            _ => SlotOrdering::After,
        }
    }
}
