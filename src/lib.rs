//! genkit-gateway - caching client for Vertex AI text generation
//!
//! This crate wraps a remote text-generation service with settings
//! validation, a bounded TTL + LRU response cache keyed by a canonical
//! request fingerprint, and a registry of schema-checked functions the model
//! can ask to call.
//!
//! # Generate Example
//!
//! ```rust,no_run
//! use genkit_gateway::{GenkitClient, GenkitConfig, SettingsOverrides};
//!
//! #[tokio::main]
//! async fn main() -> genkit_gateway::Result<()> {
//!     let client = GenkitClient::builder(GenkitConfig::from_env()?)
//!         .default_functions()
//!         .build()?;
//!
//!     let result = client
//!         .generate("What is the capital of France?", &SettingsOverrides::new().temperature(0.2))
//!         .await?;
//!
//!     match result.into_result() {
//!         Ok(response) => println!("{}", response.text),
//!         Err(e) => eprintln!("generation failed: {e}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Function Calls Example
//!
//! ```rust,no_run
//! use genkit_gateway::{FunctionCall, GenkitClient};
//! use serde_json::json;
//!
//! # async fn run(client: GenkitClient) {
//! let results = client
//!     .execute_function_calls(&[FunctionCall::new("get_current_time", json!({}))])
//!     .await;
//! for result in &results {
//!     println!("{}", result.to_response_json());
//! }
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod functions;
pub mod gateway;
pub mod prompt;
pub mod providers;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, ResponseCache};
pub use config::GenkitConfig;
pub use error::{GenkitError, Result};
pub use functions::{FunctionDefinition, FunctionHandler, FunctionRegistry};
pub use gateway::{GenkitClient, GenkitClientBuilder};
pub use providers::{GenerationBackend, VertexClient};
pub use version::{PKG_VERSION, version_string};

// Re-export all types
pub use types::{
    Embedding, FunctionCall, FunctionDeclaration, FunctionResult, GenerateResponse,
    GenerationResult, GenerationSettings, SafetySetting, SettingsOverrides, SettingsPolicy,
};
