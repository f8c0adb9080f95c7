//! Backend trait for the remote generation service.
//!
//! [`GenkitClient`](crate::GenkitClient) never talks HTTP itself; it calls a
//! [`GenerationBackend`]. Production code uses
//! [`VertexClient`](super::VertexClient); tests substitute counting or
//! failing mocks.
//!
//! # Error Semantics
//!
//! Backends return `Err` for every failure (network error, remote-reported
//! error, malformed response). The client folds generation errors into
//! [`GenerationResult::Failure`](crate::GenerationResult::Failure) and never
//! caches them. Backends must not retry on their own.

use async_trait::async_trait;

use crate::Result;
use crate::types::{Embedding, FunctionDeclaration, GenerateResponse, GenerationSettings};

/// Which deployed model a call is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelTarget<'a> {
    pub project_id: &'a str,
    pub location: &'a str,
    pub model: &'a str,
}

/// A generation call. Credentials are owned by the backend.
#[derive(Debug, Clone, Copy)]
pub struct RemoteRequest<'a> {
    pub target: ModelTarget<'a>,
    pub prompt: &'a str,
    pub settings: &'a GenerationSettings,
    /// Functions advertised to the model. Empty means none.
    pub functions: &'a [FunctionDeclaration],
}

/// An embedding call for one or more texts.
#[derive(Debug, Clone, Copy)]
pub struct EmbedRequest<'a> {
    pub target: ModelTarget<'a>,
    pub texts: &'a [&'a str],
}

/// Remote text generation and embedding service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logging/metrics.
    fn name(&self) -> &str;

    /// Generate text for a single prompt. Atomic: no partial results.
    async fn generate(&self, request: &RemoteRequest<'_>) -> Result<GenerateResponse>;

    /// Embed every text in the request, one embedding per text in order.
    async fn embed(&self, request: &EmbedRequest<'_>) -> Result<Vec<Embedding>>;

    /// Whether `target` is reachable with the configured credentials.
    ///
    /// Default: assume healthy.
    async fn health(&self, _target: &ModelTarget<'_>) -> bool {
        true
    }
}
