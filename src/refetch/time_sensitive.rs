use crate::refetch::{priority_schedule, RefetchStrategy, Schedule, TWO_HOURS};
use crate::state::{DocumentMeta, Source};

/// Walks a fixed ladder of delays for pages that matter only while fresh
///
/// The ladder is `[2h, base, 2*base, 4*base]`. Unchanged pages climb one rung
/// per fetch and are dropped after the last one; changing pages step back
/// down, never below `base`.
#[derive(Debug, Clone, Copy)]
pub struct TimeSensitiveStrategy {
    start_delay: u64,
    ladder: [u64; 4],
}

impl TimeSensitiveStrategy {
    pub fn new(start_delay: u64, base_delay: u64) -> Self {
        Self {
            start_delay,
            ladder: [
                TWO_HOURS,
                base_delay,
                base_delay.saturating_mul(2),
                base_delay.saturating_mul(4),
            ],
        }
    }

    pub fn ladder(&self) -> &[u64; 4] {
        &self.ladder
    }

    /// Rung of `delay`, preferring the highest when rungs coincide
    fn rung(&self, delay: u64) -> Option<usize> {
        self.ladder.iter().rposition(|&d| d == delay)
    }
}

impl RefetchStrategy for TimeSensitiveStrategy {
    fn compute(&self, meta: &DocumentMeta, is_new: bool, is_changed: bool, now: i64) -> Schedule {
        if meta.source == Source::Priority {
            return priority_schedule(self.start_delay, self.ladder[1], now);
        }

        let last = self.ladder.len() - 1;
        let delay = if is_new || meta.delay == 0 {
            self.ladder[0]
        } else if !is_changed || !meta.responded_ok() {
            match self.rung(meta.delay) {
                Some(rung) if rung == last => return Schedule::Stop,
                Some(rung) => self.ladder[rung + 1],
                None => self.ladder[1],
            }
        } else {
            match self.rung(meta.delay) {
                Some(rung) => self.ladder[rung.saturating_sub(1).max(1)],
                None => self.ladder[2],
            }
        };

        Schedule::after(now, delay, Source::Refetch)
    }
}
