//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serde_json::json;

use genkit_gateway::providers::{EmbedRequest, GenerationBackend, RemoteRequest};
use genkit_gateway::telemetry;
use genkit_gateway::{
    Embedding, FunctionCall, GenerateResponse, GenkitClient, GenkitConfig, GenkitError, Result,
    SettingsOverrides,
};

// ============================================================================
// Mock backends
// ============================================================================

struct EchoBackend;

#[async_trait]
impl GenerationBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: &RemoteRequest<'_>) -> Result<GenerateResponse> {
        Ok(GenerateResponse::from_text(request.prompt))
    }

    async fn embed(&self, request: &EmbedRequest<'_>) -> Result<Vec<Embedding>> {
        Ok(request
            .texts
            .iter()
            .map(|_| Embedding::new(vec![0.1, 0.2], request.target.model))
            .collect())
    }
}

struct FailingBackend;

#[async_trait]
impl GenerationBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _request: &RemoteRequest<'_>) -> Result<GenerateResponse> {
        Err(GenkitError::AuthenticationFailed)
    }

    async fn embed(&self, _request: &EmbedRequest<'_>) -> Result<Vec<Embedding>> {
        Err(GenkitError::AuthenticationFailed)
    }
}

fn client(backend: Arc<dyn GenerationBackend>) -> GenkitClient {
    GenkitClient::builder(GenkitConfig::new("p", "t"))
        .backend(backend)
        .default_functions()
        .build()
        .unwrap()
}

// ============================================================================
// Snapshot helpers
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

/// Sum all counter values matching a name and, optionally, one label.
fn counter_total(snapshot: &SnapshotVec, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| match label {
            None => true,
            Some((k, v)) => key
                .key()
                .labels()
                .any(|l| l.key() == k && l.value() == v),
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Run async work under a local recorder and return the snapshot.
///
/// `block_in_place` keeps the sync `with_local_recorder` closure on the
/// current thread while `block_on` drives the inner async work.
fn record<F>(work: F) -> SnapshotVec
where
    F: std::future::Future<Output = ()>,
{
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(work))
    });
    snapshotter.snapshot().into_vec()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_hit_skips_request_metrics() {
    let client = client(Arc::new(EchoBackend));
    let snapshot = record(async {
        client.generate("hello", &SettingsOverrides::new()).await.unwrap();
        client.generate("hello", &SettingsOverrides::new()).await.unwrap();
    });

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL, None), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL, None), 1);
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL, None), 1);
    assert!(has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_request_records_error_status() {
    let client = client(Arc::new(FailingBackend));
    let snapshot = record(async {
        let result = client.generate("hello", &SettingsOverrides::new()).await.unwrap();
        assert!(!result.is_success());
    });

    assert_eq!(
        counter_total(&snapshot, telemetry::REQUESTS_TOTAL, Some(("status", "error"))),
        1
    );
    assert_eq!(
        counter_total(&snapshot, telemetry::REQUESTS_TOTAL, Some(("status", "ok"))),
        0
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn embed_batch_counts_hits_per_text() {
    let client = client(Arc::new(EchoBackend));
    let snapshot = record(async {
        client.embed("a").await.unwrap();
        client.embed_batch(&["a", "b"]).await.unwrap();
    });

    let embed = Some(("operation", "embed"));
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL, embed), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL, embed), 2);
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL, embed), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn function_calls_are_counted_by_status() {
    let client = client(Arc::new(EchoBackend));
    let snapshot = record(async {
        client
            .execute_function_calls(&[
                FunctionCall::new("parse_json", json!({"input": "1"})),
                FunctionCall::new("parse_json", json!({})),
                FunctionCall::new("missing", json!({})),
            ])
            .await;
    });

    assert_eq!(
        counter_total(&snapshot, telemetry::FUNCTION_CALLS_TOTAL, Some(("status", "ok"))),
        1
    );
    assert_eq!(
        counter_total(&snapshot, telemetry::FUNCTION_CALLS_TOTAL, Some(("status", "error"))),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // No panics when no recorder is installed.
    let client = client(Arc::new(EchoBackend));
    client.generate("hello", &SettingsOverrides::new()).await.unwrap();
}
