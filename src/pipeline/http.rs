use crate::admission::{ResourceClass, DEFAULT_COST_ESTIMATE};
use crate::config::FetcherConfig;
use crate::driver::WorkItem;
use crate::pipeline::{EntitySet, PaperRecord, Pipeline, RetryingFetcher, StageContext};
use crate::StageResult;
use async_trait::async_trait;

/// Pipeline that downloads content over HTTP and stores it as-is
///
/// Fetches are gated by the configured resource class, if any. No
/// inference backend is bundled: structured extraction passes the content
/// through, and the entity and vector stages produce nothing.
#[derive(Debug, Clone)]
pub struct HttpPipeline {
    fetcher: RetryingFetcher,
    fetch_class: Option<ResourceClass>,
}

impl HttpPipeline {
    pub fn new(fetcher: RetryingFetcher, fetch_class: Option<ResourceClass>) -> Self {
        Self {
            fetcher,
            fetch_class,
        }
    }

    pub fn from_config(config: &FetcherConfig) -> crate::Result<Self> {
        let fetcher = RetryingFetcher::from_config(config)?;
        let fetch_class = config.resource_class.clone().map(ResourceClass::from);
        Ok(Self::new(fetcher, fetch_class))
    }
}

#[async_trait]
impl Pipeline for HttpPipeline {
    async fn fetch_content(
        &self,
        context: &StageContext<'_>,
        item: &WorkItem,
    ) -> StageResult<String> {
        let admission = context.admission();
        let class = self.fetch_class.as_ref().map(ResourceClass::as_str);
        if let Some(class) = class {
            admission.acquire(class, DEFAULT_COST_ESTIMATE).await;
        }

        let content = self.fetcher.fetch(&item.reference).await?;

        if let Some(class) = class {
            admission.commit_text(class, &content);
        }

        tracing::debug!(
            "Fetched {} characters for item {}",
            content.len(),
            item.position
        );
        Ok(content)
    }

    async fn extract_structured(
        &self,
        _context: &StageContext<'_>,
        item: &WorkItem,
        content: &str,
    ) -> StageResult<PaperRecord> {
        Ok(PaperRecord::minimal(item, content))
    }

    async fn extract_entities(
        &self,
        _context: &StageContext<'_>,
        _content: &str,
    ) -> StageResult<EntitySet> {
        Ok(EntitySet::default())
    }

    async fn generate_vector(
        &self,
        _context: &StageContext<'_>,
        _text: &str,
    ) -> StageResult<Vec<f32>> {
        Ok(Vec::new())
    }
}
