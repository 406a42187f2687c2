use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Length of the sliding window behind every per-minute limit
pub const WINDOW: Duration = Duration::from_secs(60);

/// Sliding 60-second record of timestamped cost events
///
/// Events are appended in non-decreasing timestamp order, so the oldest
/// event is always at the front and pruning only ever pops from the front.
#[derive(Debug, Clone, Default)]
pub struct UsageWindow {
    events: VecDeque<(Instant, u64)>,
}

impl UsageWindow {
    /// Creates an empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event
    ///
    /// A timestamp earlier than the newest recorded one is clamped up to it,
    /// which keeps the ordering invariant even if callers race on `now`.
    pub fn record(&mut self, at: Instant, cost: u64) {
        let at = match self.events.back() {
            Some(&(last, _)) if at < last => last,
            _ => at,
        };
        self.events.push_back((at, cost));
    }

    /// Drops every event that is 60 seconds old or older
    pub fn prune(&mut self, now: Instant) {
        while let Some(&(at, _)) = self.events.front() {
            if now.saturating_duration_since(at) >= WINDOW {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of events in the window
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sum of the costs of all events in the window
    pub fn total(&self) -> u64 {
        self.events.iter().map(|&(_, cost)| cost).sum()
    }

    /// Timestamp of the oldest event still in the window
    pub fn oldest(&self) -> Option<Instant> {
        self.events.front().map(|&(at, _)| at)
    }

    /// Timestamp of the newest event in the window
    pub fn newest(&self) -> Option<Instant> {
        self.events.back().map(|&(at, _)| at)
    }

    /// Finds the timestamp at which enough cost will have expired
    ///
    /// Walks the window oldest-first, accumulating costs until `needed` is
    /// covered, and returns the timestamp of the event that covered it.
    /// Returns `None` when the whole window is not enough.
    pub fn covering_timestamp(&self, needed: u64) -> Option<Instant> {
        let mut accumulated = 0u64;
        for &(at, cost) in &self.events {
            accumulated = accumulated.saturating_add(cost);
            if accumulated >= needed {
                return Some(at);
            }
        }
        None
    }

    /// Time remaining until an event recorded at `at` leaves the window
    pub fn time_until_expiry(at: Instant, now: Instant) -> Duration {
        WINDOW.saturating_sub(now.saturating_duration_since(at))
    }
}
