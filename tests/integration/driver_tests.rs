use async_trait::async_trait;
use paper_ingest::admission::{AdmissionController, ResourceLimitTable};
use paper_ingest::config::FetcherConfig;
use paper_ingest::driver::{ProgressStore, WorkDriver, WorkItem};
use paper_ingest::pipeline::{
    build_http_client, EntitySet, HttpPipeline, PaperRecord, Pipeline, RetryPolicy,
    RetryingFetcher, StageContext,
};
use paper_ingest::storage::{RecordStatus, RecordStore, SqliteRecordStore};
use paper_ingest::StageResult;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Pipeline that records which positions it was asked to fetch
#[derive(Default)]
struct RecordingPipeline {
    fetched: Arc<Mutex<Vec<usize>>>,
}

impl RecordingPipeline {
    /// Handle that stays readable after the pipeline moves into a driver
    fn log(&self) -> Arc<Mutex<Vec<usize>>> {
        self.fetched.clone()
    }
}

#[async_trait]
impl Pipeline for RecordingPipeline {
    async fn fetch_content(
        &self,
        _context: &StageContext<'_>,
        item: &WorkItem,
    ) -> StageResult<String> {
        self.fetched.lock().unwrap().push(item.position);
        Ok(format!("content {}", item.position))
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
        Ok(vec![0.25; 4])
    }
}

fn items(count: usize) -> Vec<WorkItem> {
    (0..count)
        .map(|position| WorkItem {
            position,
            label: format!("Paper {}", position),
            reference: format!("https://example.com/papers/{}", position),
        })
        .collect()
}

fn admission() -> Arc<AdmissionController> {
    Arc::new(AdmissionController::new(ResourceLimitTable::new()))
}

fn recording_driver(dir: &TempDir) -> WorkDriver<RecordingPipeline, SqliteRecordStore> {
    recording_driver_with(dir, RecordingPipeline::default())
}

fn recording_driver_with(
    dir: &TempDir,
    pipeline: RecordingPipeline,
) -> WorkDriver<RecordingPipeline, SqliteRecordStore> {
    let store = SqliteRecordStore::new(&dir.path().join("papers.db")).unwrap();
    WorkDriver::new(
        admission(),
        ProgressStore::new(dir.path().join("progress.json")),
        pipeline,
        store,
    )
    .with_item_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_resume_processes_remaining_positions_only() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("progress.json"),
        r#"{"last_processed_row": 4, "last_processed_title": "Paper 4", "total_rows": 10}"#,
    )
    .unwrap();

    let pipeline = RecordingPipeline::default();
    let fetched = pipeline.log();
    let mut driver = recording_driver_with(&dir, pipeline);

    let summary = driver.run(&items(10)).await.unwrap();

    assert_eq!(summary.start_position, 5);
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.failed, 0);
    assert_eq!(*fetched.lock().unwrap(), vec![5, 6, 7, 8, 9]);

    let document = driver.progress().load().unwrap();
    assert_eq!(document.last_processed_row, 9);
    assert_eq!(document.total_rows, 10);
}

#[tokio::test]
async fn test_rerun_over_completed_progress_processes_nothing() {
    let dir = TempDir::new().unwrap();

    {
        let mut driver = recording_driver(&dir);
        let summary = driver.run(&items(4)).await.unwrap();
        assert_eq!(summary.processed, 4);
    }

    let pipeline = RecordingPipeline::default();
    let fetched = pipeline.log();
    let mut driver = recording_driver_with(&dir, pipeline);
    let summary = driver.run(&items(4)).await.unwrap();

    assert_eq!(summary.attempted(), 0);
    assert!(fetched.lock().unwrap().is_empty());
    assert_eq!(driver.store().count_records().unwrap(), 4);
}

#[tokio::test]
async fn test_replayed_item_does_not_duplicate_records() {
    let dir = TempDir::new().unwrap();

    // A crashed run stored position 5 but never recorded it as complete
    {
        let mut store = SqliteRecordStore::new(&dir.path().join("papers.db")).unwrap();
        let id = store
            .upsert_record(5, &PaperRecord::minimal(&items(6)[5], "partial"))
            .unwrap();
        store.upsert_embedding(id, "title", &[0.1]).unwrap();
    }
    std::fs::write(
        dir.path().join("progress.json"),
        r#"{"last_processed_row": 4, "total_rows": 6}"#,
    )
    .unwrap();

    let mut driver = recording_driver(&dir);
    let summary = driver.run(&items(6)).await.unwrap();
    assert_eq!(summary.processed, 1);

    let store = driver.store();
    assert_eq!(store.count_records().unwrap(), 1);
    // title and fullText, each stored once
    assert_eq!(store.count_embeddings().unwrap(), 2);

    let stored = store.find_by_position(5).unwrap().unwrap();
    assert_eq!(stored.status, RecordStatus::Completed);
    assert_eq!(stored.record.full_text, "content 5");
}

#[tokio::test]
async fn test_end_to_end_over_http_isolates_failures() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for position in [0, 2, 3] {
        Mock::given(method("GET"))
            .and(path(format!("/papers/{}", position)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("<html>paper {}</html>", position)),
            )
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/papers/1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let work: Vec<WorkItem> = (0..4)
        .map(|position| WorkItem {
            position,
            label: format!("Paper {}", position),
            reference: format!("{}/papers/{}", base_url, position),
        })
        .collect();

    let client = build_http_client(&FetcherConfig::default()).unwrap();
    let fetcher = RetryingFetcher::new(
        client,
        RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Duration::from_secs(5),
            backoff_unit: Duration::from_millis(10),
        },
    );

    let dir = TempDir::new().unwrap();
    let mut driver = WorkDriver::new(
        admission(),
        ProgressStore::new(dir.path().join("progress.json")),
        HttpPipeline::new(fetcher, None),
        SqliteRecordStore::new(&dir.path().join("papers.db")).unwrap(),
    )
    .with_item_delay(Duration::ZERO);

    let summary = driver.run(&work).await.unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 1);

    let document = driver.progress().load().unwrap();
    assert_eq!(document.last_processed_row, 3);
    assert_eq!(document.failed_papers.len(), 1);
    assert_eq!(document.failed_papers[0].row, 1);
    assert_eq!(document.failed_papers[0].title, "Paper 1");

    let store = driver.store();
    assert_eq!(store.count_by_status(RecordStatus::Completed).unwrap(), 3);
    assert!(store.find_by_position(1).unwrap().is_none());
    assert_eq!(
        store.find_by_position(2).unwrap().unwrap().record.full_text,
        "<html>paper 2</html>"
    );
}
