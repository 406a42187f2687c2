//! Pipeline stages for processing a single work item
//!
//! This module contains:
//! - The `Pipeline` trait, the seam between the driver and the external
//!   fetch/extraction/embedding services
//! - The retrying HTTP fetcher
//! - The paper record and entity types the stages produce
//! - `HttpPipeline`, the concrete pipeline used by the binary
//!
//! Every stage receives a `StageContext`. Calls into quota-limited services
//! wait for admission first and only then run under the hard cutoff.

mod context;
mod fetcher;
mod http;
mod record;

pub use context::StageContext;
pub use fetcher::{build_http_client, RetryPolicy, RetryingFetcher};
pub use http::HttpPipeline;
pub use record::{normalize_vector, EntitySet, PaperRecord, VECTOR_DIMENSIONS};

use crate::driver::WorkItem;
use crate::StageResult;
use async_trait::async_trait;

/// The external stages a work item passes through
///
/// Each stage returns an explicit result; the driver decides from the
/// error kind whether to degrade (malformed responses) or fail the item.
/// Outbound calls go through [`StageContext::gated_text`] or
/// [`StageContext::timed`], which apply the per-call cutoff.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Downloads the item's source content
    ///
    /// The fetcher applies its own per-attempt timeout and retries.
    async fn fetch_content(
        &self,
        context: &StageContext<'_>,
        item: &WorkItem,
    ) -> StageResult<String>;

    /// Extracts the structured record from fetched content
    async fn extract_structured(
        &self,
        context: &StageContext<'_>,
        item: &WorkItem,
        content: &str,
    ) -> StageResult<PaperRecord>;

    /// Extracts categorized entities from fetched content
    async fn extract_entities(
        &self,
        context: &StageContext<'_>,
        content: &str,
    ) -> StageResult<EntitySet>;

    /// Generates an embedding vector for `text`
    ///
    /// An empty vector means no embedding was produced for this text.
    async fn generate_vector(
        &self,
        context: &StageContext<'_>,
        text: &str,
    ) -> StageResult<Vec<f32>>;
}
