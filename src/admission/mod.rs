//! Admission control for quota-limited external services
//!
//! This module decides how long a caller must wait before issuing a request
//! against a resource class so that none of its limits is exceeded.
//!
//! # Components
//!
//! - `UsageWindow`: 60-second sliding record of (timestamp, cost) events
//! - `DailyCounter`: per-calendar-day request counts
//! - `ResourceLimitTable`: static limits per resource class
//! - `AdmissionController`: per-class state and the acquire/commit protocol
//!
//! # Example
//!
//! ```no_run
//! use paper_ingest::admission::{AdmissionController, ResourceLimit, ResourceLimitTable};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let table = ResourceLimitTable::new().with_limit(
//!     "gemini-2.0-flash",
//!     ResourceLimit {
//!         requests_per_minute: 15,
//!         cost_per_minute: 1_000_000,
//!         requests_per_day: 200,
//!         floor_delay: Duration::from_secs(4),
//!     },
//! );
//! let admission = AdmissionController::new(table);
//!
//! admission.acquire("gemini-2.0-flash", 2_000).await;
//! // ... issue the request ...
//! admission.commit("gemini-2.0-flash", 1_850);
//! # }
//! ```

mod clock;
mod controller;
mod daily;
mod limits;
mod window;

pub use clock::{Clock, SystemClock};
pub use controller::{
    estimate_cost, AdmissionController, AdmissionPlan, DelayReason, UsageSnapshot,
    DAILY_EXHAUSTED_DELAY, DEFAULT_COST_ESTIMATE, SAFETY_MARGIN, UNREGISTERED_DELAY,
};
pub use daily::DailyCounter;
pub use limits::{ResourceClass, ResourceLimit, ResourceLimitTable};
pub use window::{UsageWindow, WINDOW};
