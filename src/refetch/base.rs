use crate::refetch::{priority_schedule, RefetchStrategy, Schedule, HOUR};
use crate::state::{DocumentMeta, Source};

/// Doubles the delay of unchanged pages and halves it for changing ones
///
/// Halving stops at one hour; doubling is unbounded (saturating).
#[derive(Debug, Clone, Copy)]
pub struct BaseStrategy {
    start_delay: u64,
    refetching_delay: u64,
}

impl BaseStrategy {
    pub fn new(start_delay: u64, refetching_delay: u64) -> Self {
        Self {
            start_delay,
            refetching_delay,
        }
    }
}

impl RefetchStrategy for BaseStrategy {
    fn compute(&self, meta: &DocumentMeta, is_new: bool, is_changed: bool, now: i64) -> Schedule {
        if meta.source == Source::Priority {
            return priority_schedule(self.start_delay, self.refetching_delay, now);
        }

        let delay = if is_new || meta.delay == 0 {
            self.refetching_delay
        } else if !is_changed || !meta.responded_ok() {
            meta.delay.saturating_mul(2)
        } else if meta.delay > HOUR {
            meta.delay / 2
        } else {
            meta.delay
        };

        Schedule::after(now, delay, Source::Refetch)
    }
}
