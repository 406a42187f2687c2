//! Resumable work driver
//!
//! Walks an ordered work list through the pipeline one item at a time,
//! persisting progress after every item so that a restarted run picks up
//! after the last completed position. Delivery is at-least-once: a crash
//! mid-item replays that item, which the record store absorbs by keying
//! records on position.

mod progress;
mod runner;
mod work_list;

pub use progress::{FailureRecord, ProgressDocument, ProgressError, ProgressStore};
pub use runner::{
    ItemOutcome, RunSummary, WorkDriver, DEFAULT_ITEM_DELAY, DEFAULT_STAGE_TIMEOUT,
};
pub use work_list::{load_work_list, parse_work_list, WorkItem};
