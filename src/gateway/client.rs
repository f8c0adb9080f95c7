//! GenkitClient - caching front door to a generation backend

use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, debug, instrument, warn};

use crate::cache::ResponseCache;
use crate::cache::fingerprint::RequestFingerprint;
use crate::cache::response::merge_batch_results;
use crate::config::GenkitConfig;
use crate::functions::FunctionRegistry;
use crate::providers::{EmbedRequest, GenerationBackend, ModelTarget, RemoteRequest};
use crate::telemetry;
use crate::types::{
    Embedding, FunctionCall, FunctionDeclaration, FunctionResult, GenerationResult,
    GenerationSettings, SettingsOverrides, SettingsPolicy,
};
use crate::{GenkitError, Result};

use super::GenkitClientBuilder;

/// Caller-owned client: settings validation, response cache, backend calls
/// and function dispatch.
///
/// Each instance owns its cache, so independently built clients never share
/// entries. Cloning is cheap and clones share the cache.
///
/// Concurrent requests for the same uncached prompt may each reach the
/// backend. A backend call runs on its own task: dropping a pending
/// `generate` future does not interrupt it, and a successful result is
/// still cached for later callers.
#[derive(Clone)]
pub struct GenkitClient {
    config: Arc<GenkitConfig>,
    backend: Arc<dyn GenerationBackend>,
    functions: Arc<FunctionRegistry>,
    cache: Option<Arc<ResponseCache>>,
    settings_policy: SettingsPolicy,
}

impl GenkitClient {
    pub fn builder(config: GenkitConfig) -> GenkitClientBuilder {
        GenkitClientBuilder::new(config)
    }

    pub(super) fn from_parts(
        config: GenkitConfig,
        backend: Arc<dyn GenerationBackend>,
        functions: FunctionRegistry,
        cache: Option<ResponseCache>,
        settings_policy: SettingsPolicy,
    ) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            functions: Arc::new(functions),
            cache: cache.map(Arc::new),
            settings_policy,
        }
    }

    pub fn config(&self) -> &GenkitConfig {
        &self.config
    }

    /// The response cache, or `None` when caching is disabled.
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_deref()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    fn target(&self) -> ModelTarget<'_> {
        target_of(&self.config)
    }

    /// Generate text for `prompt`.
    ///
    /// Overrides are overlaid on the defaults and checked under the client's
    /// [`SettingsPolicy`]. Identical requests within the cache ttl are served
    /// from the cache without contacting the backend.
    ///
    /// Backend failures come back as [`GenerationResult::Failure`] and are
    /// never cached; re-issuing the request retries it.
    ///
    /// Must be called within a tokio runtime; cache misses spawn the backend
    /// call.
    ///
    /// # Errors
    ///
    /// [`GenkitError::Configuration`] if the settings are invalid.
    #[instrument(name = "genkit.generate", skip(self, prompt, overrides), fields(model = %self.config.model))]
    pub async fn generate(
        &self,
        prompt: &str,
        overrides: &SettingsOverrides,
    ) -> Result<GenerationResult> {
        let settings = GenerationSettings::resolve_with(overrides, self.settings_policy)?;
        let key = RequestFingerprint::generate(&self.config.model, prompt, &settings);

        if let Some(cache) = &self.cache
            && let Some(hit) = cache.lookup(&key)
        {
            return Ok(hit);
        }

        let backend = Arc::clone(&self.backend);
        let config = Arc::clone(&self.config);
        let cache = self.cache.clone();
        let functions = self.functions.definitions();
        let prompt = prompt.to_owned();

        let start = Instant::now();
        let task = tokio::spawn(
            async move {
                let request = RemoteRequest {
                    target: target_of(&config),
                    prompt: &prompt,
                    settings: &settings,
                    functions: &functions,
                };
                let result = GenerationResult::from(backend.generate(&request).await?);
                if let Some(cache) = &cache {
                    cache.insert(key, result.clone(), cache.default_ttl());
                }
                Ok::<_, GenkitError>(result)
            }
            .in_current_span(),
        );
        let outcome = task.await.unwrap_or_else(|e| {
            Err(GenkitError::Remote {
                code: "INTERNAL".into(),
                message: format!("generation task failed: {e}"),
            })
        });
        self.record_request("generate", start, outcome.is_ok());

        match outcome {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(error = %e, code = e.code(), "generation failed");
                Ok(GenerationResult::failure(&e))
            }
        }
    }

    /// Run the function calls a generation asked for.
    ///
    /// One result per call, in input order; each call succeeds or fails on
    /// its own.
    pub async fn execute_function_calls(&self, calls: &[FunctionCall]) -> Vec<FunctionResult> {
        debug!(count = calls.len(), "executing function calls");
        self.functions.execute_calls(calls).await
    }

    /// Declarations of every registered function.
    pub fn function_definitions(&self) -> Vec<FunctionDeclaration> {
        self.functions.definitions()
    }

    /// Embed a single text, using the cache when enabled.
    #[instrument(name = "genkit.embed", skip(self, text), fields(model = %self.config.model))]
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| GenkitError::MalformedResponse("no embedding returned".into()))
    }

    /// Embed several texts, one embedding per text in input order.
    ///
    /// Cached texts are served locally; the remaining texts go to the
    /// backend in a single call.
    #[instrument(name = "genkit.embed_batch", skip(self, texts), fields(model = %self.config.model, batch_size = texts.len()))]
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.config.model.as_str();

        let Some(cache) = &self.cache else {
            return self.embed_remote(texts).await;
        };

        let cached = cache.get_embedding_batch(model, texts);
        let misses: Vec<&str> = texts
            .iter()
            .zip(&cached)
            .filter(|(_, hit)| hit.is_none())
            .map(|(text, _)| *text)
            .collect();
        if misses.is_empty() {
            debug!(count = texts.len(), "embedding batch fully cached");
        }

        let fetched = if misses.is_empty() {
            Vec::new()
        } else {
            let fetched = self.embed_remote(&misses).await?;
            cache.insert_embedding_batch(model, &misses, &fetched);
            fetched
        };

        merge_batch_results(cached, fetched).ok_or_else(|| {
            GenkitError::MalformedResponse("embedding count does not match request".into())
        })
    }

    async fn embed_remote(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let request = EmbedRequest {
            target: self.target(),
            texts,
        };
        let start = Instant::now();
        let outcome = self.backend.embed(&request).await;
        self.record_request("embed", start, outcome.is_ok());

        let embeddings = outcome?;
        if embeddings.len() != texts.len() {
            return Err(GenkitError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    /// Whether the backend can reach the configured model. Never errors.
    pub async fn health_check(&self) -> bool {
        let healthy = self.backend.health(&self.target()).await;
        if !healthy {
            warn!(backend = self.backend.name(), model = %self.config.model, "health check failed");
        }
        healthy
    }

    fn record_request(&self, operation: &'static str, start: Instant, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        let backend = self.backend.name().to_owned();
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "backend" => backend.clone(),
            "operation" => operation,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "backend" => backend,
            "operation" => operation
        )
        .record(start.elapsed().as_secs_f64());
    }
}

fn target_of(config: &GenkitConfig) -> ModelTarget<'_> {
    ModelTarget {
        project_id: &config.project_id,
        location: &config.location,
        model: &config.model,
    }
}

impl std::fmt::Debug for GenkitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenkitClient")
            .field("model", &self.config.model)
            .field("backend", &self.backend.name())
            .field("functions", &self.functions.len())
            .field("cache", &self.cache.is_some())
            .field("settings_policy", &self.settings_policy)
            .finish()
    }
}
