use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Calendar-day keyed request counter
///
/// Counts are only ever read for the current date, so a date rollover
/// resets the effective count to zero. Earlier dates are kept for audit.
#[derive(Debug, Clone, Default)]
pub struct DailyCounter {
    counts: BTreeMap<NaiveDate, u64>,
}

impl DailyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests recorded on `date`
    pub fn count(&self, date: NaiveDate) -> u64 {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    /// Records one request on `date`
    pub fn increment(&mut self, date: NaiveDate) {
        *self.counts.entry(date).or_insert(0) += 1;
    }

    /// All recorded days, oldest first
    pub fn history(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.counts.iter().map(|(date, count)| (*date, *count))
    }
}
