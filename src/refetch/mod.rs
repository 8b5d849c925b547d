//! Refetch scheduling strategies
//!
//! After every fetch a strategy decides when the URL is due again and which
//! queue it goes back to. Pages that keep changing are visited more often;
//! pages that stay the same, or stop answering 200, are backed off.
//!
//! # Components
//!
//! - `BaseStrategy`: doubles or halves the previous delay
//! - `TimeSensitiveStrategy`: walks a short ladder of delays and eventually
//!   stops refetching pages that no longer change

mod base;
mod time_sensitive;

pub use base::BaseStrategy;
pub use time_sensitive::TimeSensitiveStrategy;

use crate::config::StrategyKind;
use crate::state::{DocumentMeta, Source};

pub const HOUR: u64 = 3600;
pub const TWO_HOURS: u64 = 2 * HOUR;

/// When and where a URL is fetched next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextFetch {
    /// UNIX time (seconds) at which the URL becomes due
    pub expire_at: i64,

    /// Delay (seconds) used to compute `expire_at`
    pub delay: u64,

    /// Queue the URL is pushed back to; `Priority` or `Refetch`
    pub source: Source,
}

/// Outcome of a scheduling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Next(NextFetch),

    /// Do not refetch this URL again
    Stop,
}

impl Schedule {
    pub(crate) fn after(now: i64, delay: u64, source: Source) -> Self {
        assert!(delay > 0, "refetch delay must be positive");
        let offset = i64::try_from(delay).unwrap_or(i64::MAX);
        Schedule::Next(NextFetch {
            expire_at: now.saturating_add(offset),
            delay,
            source,
        })
    }

    pub fn next(&self) -> Option<&NextFetch> {
        match self {
            Schedule::Next(next) => Some(next),
            Schedule::Stop => None,
        }
    }
}

/// Decides the next fetch of a URL
pub trait RefetchStrategy: Send + Sync {
    /// Computes the schedule for `meta`
    ///
    /// # Arguments
    ///
    /// * `meta` - The attempt that just completed; `delay` and `source` are the
    ///   ones it was scheduled with
    /// * `is_new` - No seen record existed before this fetch
    /// * `is_changed` - The content moved away from the stored fingerprint
    /// * `now` - Current UNIX time in seconds
    fn compute(&self, meta: &DocumentMeta, is_new: bool, is_changed: bool, now: i64) -> Schedule;
}

/// Start URLs keep their own cadence; with no cadence they become ordinary refetches
pub(crate) fn priority_schedule(start_delay: u64, fallback_delay: u64, now: i64) -> Schedule {
    if start_delay > 0 {
        Schedule::after(now, start_delay, Source::Priority)
    } else {
        Schedule::after(now, fallback_delay, Source::Refetch)
    }
}

/// Builds the configured strategy
///
/// # Arguments
///
/// * `kind` - Which strategy to use
/// * `start_delay` - Refetch delay of start URLs (`restart-delay`)
/// * `refetching_delay` - Baseline delay of every other URL
pub fn build_strategy(
    kind: StrategyKind,
    start_delay: u64,
    refetching_delay: u64,
) -> Box<dyn RefetchStrategy> {
    match kind {
        StrategyKind::Base => Box::new(BaseStrategy::new(start_delay, refetching_delay)),
        StrategyKind::TimeSensitive => {
            Box::new(TimeSensitiveStrategy::new(start_delay, refetching_delay))
        }
    }
}
