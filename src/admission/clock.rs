use chrono::NaiveDate;
use std::fmt;
use tokio::time::Instant;

/// Source of time for the admission controller
///
/// The monotonic instant drives the sliding windows; the calendar date
/// keys the daily counters.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;

    fn today(&self) -> NaiveDate;
}

/// Wall clock: tokio's monotonic clock plus the local calendar date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}
