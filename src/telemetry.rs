//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! All metrics are prefixed with `genkit_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `backend`: backend name, e.g. "vertex"
//! - `operation`: "generate" or "embed"
//! - `status`: outcome, "ok" or "error"
//! - `function`: registered function name

/// Total cache hits.
///
/// Labels: `operation`.
pub const CACHE_HITS_TOTAL: &str = "genkit_cache_hits_total";

/// Total cache misses.
///
/// Labels: `operation`.
pub const CACHE_MISSES_TOTAL: &str = "genkit_cache_misses_total";

/// Total calls that reached the remote backend.
///
/// Labels: `backend`, `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "genkit_requests_total";

/// Remote call duration in seconds.
///
/// Labels: `backend`, `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "genkit_request_duration_seconds";

/// Total function dispatches.
///
/// Labels: `function`, `status` ("ok" | "error").
pub const FUNCTION_CALLS_TOTAL: &str = "genkit_function_calls_total";
