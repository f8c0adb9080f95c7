//! Builder for configuring client instances

use std::sync::Arc;

use super::GenkitClient;
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::GenkitConfig;
use crate::functions::{FunctionDefinition, FunctionRegistry, builtin};
use crate::providers::{GenerationBackend, VertexClient};
use crate::types::SettingsPolicy;
use crate::Result;

/// Builder for [`GenkitClient`].
///
/// ```rust,no_run
/// use genkit_gateway::{GenkitClient, GenkitConfig};
///
/// # fn main() -> genkit_gateway::Result<()> {
/// let client = GenkitClient::builder(GenkitConfig::from_env()?)
///     .default_functions()
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct GenkitClientBuilder {
    config: GenkitConfig,
    backend: Option<Arc<dyn GenerationBackend>>,
    base_url: Option<String>,
    cache: Option<CacheConfig>,
    functions: FunctionRegistry,
    pending: Vec<FunctionDefinition>,
    default_functions: bool,
    settings_policy: SettingsPolicy,
}

impl GenkitClientBuilder {
    pub fn new(config: GenkitConfig) -> Self {
        Self {
            config,
            backend: None,
            base_url: None,
            cache: None,
            functions: FunctionRegistry::new(),
            pending: Vec::new(),
            default_functions: false,
            settings_policy: SettingsPolicy::default(),
        }
    }

    /// Use a custom backend instead of Vertex AI.
    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Point the Vertex backend at a different host.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the cache settings taken from the config.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Start from an existing registry.
    pub fn functions(mut self, registry: FunctionRegistry) -> Self {
        self.functions = registry;
        self
    }

    /// Register a function. Duplicate names fail at [`build`](Self::build).
    pub fn function(mut self, definition: FunctionDefinition) -> Self {
        self.pending.push(definition);
        self
    }

    /// Register the built-in functions.
    pub fn default_functions(mut self) -> Self {
        self.default_functions = true;
        self
    }

    /// How out-of-range settings are treated (default: reject).
    pub fn settings_policy(mut self, policy: SettingsPolicy) -> Self {
        self.settings_policy = policy;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// [`GenkitError::Configuration`](crate::GenkitError::Configuration) for
    /// an invalid config, unreadable credentials or a duplicate function name.
    pub fn build(self) -> Result<GenkitClient> {
        self.config.validate()?;

        let mut functions = self.functions;
        if self.default_functions {
            builtin::register_defaults(&mut functions)?;
        }
        for definition in self.pending {
            functions.register(definition)?;
        }

        let backend: Arc<dyn GenerationBackend> = match self.backend {
            Some(backend) => backend,
            None => {
                let mut vertex = VertexClient::builder(self.config.access_token()?)
                    .timeout(self.config.timeout());
                if let Some(url) = self.base_url {
                    vertex = vertex.base_url(url);
                }
                Arc::new(vertex.build()?)
            }
        };

        let cache_config = self.cache.unwrap_or_else(|| self.config.cache_config());
        let cache = cache_config
            .enabled
            .then(|| ResponseCache::new(&cache_config));

        tracing::debug!(
            backend = backend.name(),
            model = %self.config.model,
            functions = functions.len(),
            cache = cache.is_some(),
            "built genkit client"
        );

        Ok(GenkitClient::from_parts(
            self.config,
            backend,
            functions,
            cache,
            self.settings_policy,
        ))
    }
}
