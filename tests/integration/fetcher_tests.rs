use paper_ingest::admission::{
    estimate_cost, AdmissionController, ResourceLimit, ResourceLimitTable,
};
use paper_ingest::config::FetcherConfig;
use paper_ingest::driver::WorkItem;
use paper_ingest::pipeline::{
    build_http_client, HttpPipeline, Pipeline, RetryPolicy, RetryingFetcher, StageContext,
};
use paper_ingest::{AttemptError, FetchError, StageError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const BACKOFF_UNIT: Duration = Duration::from_millis(10);

/// Fetcher with millisecond backoff so retries stay fast
fn fast_fetcher(max_attempts: u32, attempt_timeout: Duration) -> RetryingFetcher {
    let client = build_http_client(&FetcherConfig::default()).expect("Failed to build client");
    RetryingFetcher::new(
        client,
        RetryPolicy {
            max_attempts,
            attempt_timeout,
            backoff_unit: BACKOFF_UNIT,
        },
    )
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .len()
}

/// Fails the first `failures` requests, then serves the body, noting when each arrived
struct FlakyResponder {
    failures: usize,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut arrivals = self.arrivals.lock().unwrap();
        arrivals.push(Instant::now());
        if arrivals.len() <= self.failures {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200).set_body_string("<html>paper</html>")
        }
    }
}

#[tokio::test]
async fn test_fails_twice_then_succeeds() {
    let mock_server = MockServer::start().await;
    let arrivals = Arc::new(Mutex::new(Vec::new()));

    Mock::given(method("GET"))
        .and(path("/paper"))
        .respond_with(FlakyResponder {
            failures: 2,
            arrivals: arrivals.clone(),
        })
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(3, Duration::from_secs(5));
    let body = fetcher
        .fetch(&format!("{}/paper", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "<html>paper</html>");
    assert_eq!(request_count(&mock_server).await, 3);

    // Backoff of 2 units after the first failure, then 3 units after the second
    let arrivals = arrivals.lock().unwrap();
    assert_eq!(arrivals.len(), 3);
    assert!(arrivals[1] - arrivals[0] >= BACKOFF_UNIT * 2);
    assert!(arrivals[2] - arrivals[1] >= BACKOFF_UNIT * 3);
}

#[tokio::test]
async fn test_always_failing_exhausts_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(3, Duration::from_secs(5));
    let result = fetcher.fetch(&format!("{}/broken", mock_server.uri())).await;

    match result {
        Err(FetchError::Exhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, AttemptError::Status(503)));
        }
        other => panic!("expected exhausted attempts, got {:?}", other),
    }
    assert_eq!(request_count(&mock_server).await, 3);
}

#[tokio::test]
async fn test_explicit_attempt_count() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(3, Duration::from_secs(5));
    let result = fetcher
        .fetch_with_attempts(&format!("{}/missing", mock_server.uri()), 5)
        .await;

    assert!(result.is_err());
    assert_eq!(request_count(&mock_server).await, 5);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(2, Duration::from_millis(100));
    let result = fetcher.fetch(&format!("{}/slow", mock_server.uri())).await;

    let error = result.unwrap_err();
    assert!(error.is_timeout(), "expected timeout, got {:?}", error);
    assert_eq!(request_count(&mock_server).await, 2);
}

#[tokio::test]
async fn test_follows_redirects() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/new", base_url).as_str()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved content"))
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(1, Duration::from_secs(5));
    let body = fetcher.fetch(&format!("{}/old", base_url)).await.unwrap();
    assert_eq!(body, "moved content");
}

fn gated_pipeline(fetcher: RetryingFetcher) -> (HttpPipeline, AdmissionController) {
    let limits = ResourceLimitTable::new().with_limit(
        "fetch",
        ResourceLimit {
            requests_per_minute: 60,
            cost_per_minute: 1_000_000,
            requests_per_day: 1_000,
            floor_delay: Duration::ZERO,
        },
    );
    let pipeline = HttpPipeline::new(fetcher, Some("fetch".into()));
    (pipeline, AdmissionController::new(limits))
}

fn item(reference: String) -> WorkItem {
    WorkItem {
        position: 0,
        label: "Spaceflight and bone density".to_string(),
        reference,
    }
}

#[tokio::test]
async fn test_pipeline_commits_fetch_usage() {
    let mock_server = MockServer::start().await;
    let body = "x".repeat(400);

    Mock::given(method("GET"))
        .and(path("/paper"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&mock_server)
        .await;

    let (pipeline, admission) = gated_pipeline(fast_fetcher(1, Duration::from_secs(5)));
    let context = StageContext::new(&admission, Duration::from_secs(60));
    let content = pipeline
        .fetch_content(&context, &item(format!("{}/paper", mock_server.uri())))
        .await
        .unwrap();
    assert_eq!(content, body);

    let usage = admission.usage("fetch").unwrap();
    assert_eq!(usage.requests_last_minute, 1);
    assert_eq!(usage.cost_last_minute, estimate_cost(&body));
    assert_eq!(usage.requests_today, 1);
}

#[tokio::test]
async fn test_pipeline_failed_fetch_is_not_committed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let (pipeline, admission) = gated_pipeline(fast_fetcher(2, Duration::from_secs(5)));
    let context = StageContext::new(&admission, Duration::from_secs(60));
    let result = pipeline
        .fetch_content(&context, &item(format!("{}/paper", mock_server.uri())))
        .await;

    assert!(matches!(result, Err(StageError::Fetch(_))));
    let usage = admission.usage("fetch").unwrap();
    assert_eq!(usage.requests_last_minute, 0);
    assert_eq!(usage.requests_today, 0);
}
