use crate::admission::clock::{Clock, SystemClock};
use crate::admission::daily::DailyCounter;
use crate::admission::limits::{ResourceClass, ResourceLimit, ResourceLimitTable};
use crate::admission::window::UsageWindow;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Delay applied to classes missing from the limit table
pub const UNREGISTERED_DELAY: Duration = Duration::from_secs(2);

/// Delay applied once a class has used up its daily quota
///
/// This does not compute the time until the provider resets the quota; it
/// waits a fixed interval and lets the caller proceed.
pub const DAILY_EXHAUSTED_DELAY: Duration = Duration::from_secs(3600);

/// Margin added to every window-derived delay
pub const SAFETY_MARGIN: Duration = Duration::from_secs(1);

/// Cost assumed for a request when there is no text to estimate from
pub const DEFAULT_COST_ESTIMATE: u64 = 100;

/// Estimates the cost of a text payload as one unit per four characters
pub fn estimate_cost(text: &str) -> u64 {
    ((text.chars().count() / 4) as u64).max(1)
}

/// Which constraint produced an admission delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayReason {
    Unregistered,
    DailyExhausted,
    RequestRate,
    CostRate,
    Floor,
}

/// Decision computed for one admission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPlan {
    /// How long the caller must wait before proceeding
    pub delay: Duration,

    /// The binding constraint, or `None` when no wait is needed
    pub reason: Option<DelayReason>,
}

impl AdmissionPlan {
    fn proceed() -> Self {
        Self {
            delay: Duration::ZERO,
            reason: None,
        }
    }

    fn wait(delay: Duration, reason: DelayReason) -> Self {
        Self {
            delay,
            reason: Some(reason),
        }
    }

    /// Keeps the longer of the current delay and `delay`
    fn max(self, delay: Duration, reason: DelayReason) -> Self {
        if delay > self.delay {
            Self::wait(delay, reason)
        } else {
            self
        }
    }
}

/// Point-in-time usage of one resource class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub requests_last_minute: usize,
    pub cost_last_minute: u64,
    pub requests_today: u64,
    pub limit: ResourceLimit,
}

/// Window and daily state for one resource class
#[derive(Debug, Default)]
struct ClassUsage {
    requests: UsageWindow,
    cost: UsageWindow,
    daily: DailyCounter,
}

impl ClassUsage {
    fn prune(&mut self, now: Instant) {
        self.requests.prune(now);
        self.cost.prune(now);
    }

    /// Computes the delay satisfying every limit of the class at once
    fn plan(
        &mut self,
        limit: &ResourceLimit,
        estimated_cost: u64,
        now: Instant,
        today: NaiveDate,
    ) -> AdmissionPlan {
        self.prune(now);

        let requests_today = self.daily.count(today);
        if requests_today >= u64::from(limit.requests_per_day) {
            return AdmissionPlan::wait(DAILY_EXHAUSTED_DELAY, DelayReason::DailyExhausted);
        }

        let mut plan = AdmissionPlan::proceed();

        if self.requests.len() >= limit.requests_per_minute as usize {
            if let Some(oldest) = self.requests.oldest() {
                let delay = UsageWindow::time_until_expiry(oldest, now) + SAFETY_MARGIN;
                plan = plan.max(delay, DelayReason::RequestRate);
            }
        }

        let windowed = self.cost.total();
        let projected = windowed.saturating_add(estimated_cost);
        if projected > limit.cost_per_minute {
            let overage = projected - limit.cost_per_minute;
            // An estimate larger than the whole budget can never be covered;
            // the best available is an empty window.
            let covering = self
                .cost
                .covering_timestamp(overage)
                .or_else(|| self.cost.newest());
            if let Some(at) = covering {
                let delay = UsageWindow::time_until_expiry(at, now) + SAFETY_MARGIN;
                plan = plan.max(delay, DelayReason::CostRate);
            }
        }

        plan.max(limit.floor_delay, DelayReason::Floor)
    }

    fn commit(&mut self, actual_cost: u64, now: Instant, today: NaiveDate) {
        self.requests.record(now, 1);
        self.cost.record(now, actual_cost);
        self.daily.increment(today);
    }
}

/// Admission control across all configured resource classes
///
/// Each class has its own lock, so callers for different classes never
/// contend. No lock is held while a caller sleeps: the delay is computed
/// under the lock, the lock is released, and only `commit` records usage.
#[derive(Debug)]
pub struct AdmissionController {
    limits: ResourceLimitTable,
    usage: HashMap<ResourceClass, Mutex<ClassUsage>>,
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    /// Creates a controller using the system clock
    pub fn new(limits: ResourceLimitTable) -> Self {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    /// Creates a controller with an explicit clock
    pub fn with_clock(limits: ResourceLimitTable, clock: Arc<dyn Clock>) -> Self {
        let usage = limits
            .iter()
            .map(|(class, _)| (class.clone(), Mutex::new(ClassUsage::default())))
            .collect();

        Self {
            limits,
            usage,
            clock,
        }
    }

    pub fn limits(&self) -> &ResourceLimitTable {
        &self.limits
    }

    fn lock(&self, class: &str) -> Option<MutexGuard<'_, ClassUsage>> {
        self.usage
            .get(class)
            .map(|state| state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Computes how long a request of `estimated_cost` against `class` must wait
    pub fn plan(&self, class: &str, estimated_cost: u64) -> AdmissionPlan {
        let (Some(limit), Some(mut usage)) = (self.limits.get(class), self.lock(class)) else {
            return AdmissionPlan::wait(UNREGISTERED_DELAY, DelayReason::Unregistered);
        };

        let now = self.clock.now();
        let today = self.clock.today();
        usage.prune(now);

        tracing::debug!(
            "Rate limit check for {}: RPM {}/{}, cost {}/{}, RPD {}/{}",
            class,
            usage.requests.len(),
            limit.requests_per_minute,
            usage.cost.total(),
            limit.cost_per_minute,
            usage.daily.count(today),
            limit.requests_per_day
        );

        usage.plan(limit, estimated_cost, now, today)
    }

    /// Waits until a request against `class` can proceed within every limit
    ///
    /// Never fails. The wait is a plain tokio sleep, so dropping the future
    /// cancels it without touching any usage state. The caller must call
    /// [`commit`](Self::commit) after the request succeeds.
    pub async fn acquire(&self, class: &str, estimated_cost: u64) {
        let plan = self.plan(class, estimated_cost);

        match plan.reason {
            Some(DelayReason::Unregistered) => {
                tracing::warn!(
                    "Unknown resource class {}, using default rate limiting",
                    class
                );
            }
            Some(DelayReason::DailyExhausted) => {
                tracing::error!(
                    "Daily request limit exceeded for {}, waiting {:?}",
                    class,
                    plan.delay
                );
            }
            Some(DelayReason::Floor) => {
                tracing::debug!("Pacing {} for {:?}", class, plan.delay);
            }
            Some(reason) => {
                tracing::info!(
                    "Rate limiting: waiting {:.2} seconds for {} ({:?})",
                    plan.delay.as_secs_f64(),
                    class,
                    reason
                );
            }
            None => {}
        }

        if !plan.delay.is_zero() {
            tokio::time::sleep(plan.delay).await;
        }
    }

    /// Records a completed request against `class`
    ///
    /// Only successful calls are committed; a call that failed before
    /// completing never counts against the quota.
    pub fn commit(&self, class: &str, actual_cost: u64) {
        let Some(mut usage) = self.lock(class) else {
            tracing::debug!("Ignoring commit for unregistered class {}", class);
            return;
        };

        let now = self.clock.now();
        let today = self.clock.today();
        usage.commit(actual_cost, now, today);

        tracing::debug!("Recorded request for {}: cost {}", class, actual_cost);
    }

    /// Records a completed request whose cost is estimated from its text
    pub fn commit_text(&self, class: &str, text: &str) {
        self.commit(class, estimate_cost(text));
    }

    /// Current usage of `class`, or `None` if the class is not registered
    pub fn usage(&self, class: &str) -> Option<UsageSnapshot> {
        let limit = *self.limits.get(class)?;
        let mut usage = self.lock(class)?;

        let now = self.clock.now();
        usage.prune(now);

        Some(UsageSnapshot {
            requests_last_minute: usage.requests.len(),
            cost_last_minute: usage.cost.total(),
            requests_today: usage.daily.count(self.clock.today()),
            limit,
        })
    }
}
