//! Function-call dispatcher.
//!
//! A [`FunctionRegistry`] maps unique names to a [`FunctionDefinition`]: a
//! description, a JSON Schema for the arguments, and an async handler. The
//! model sees the handler-free [`FunctionDeclaration`]s; when its response
//! requests calls, [`FunctionRegistry::execute_calls`] dispatches them.
//!
//! Registration happens at startup and fails fast on duplicate names.
//! Dispatch validates arguments before the handler runs and hands back the
//! handler's own error unchanged.

pub mod builtin;
pub mod schema;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::telemetry;
use crate::types::{FunctionCall, FunctionDeclaration, FunctionResult};
use crate::{GenkitError, Result};

/// Async body of a registered function.
///
/// Implemented for any `Fn(Value) -> impl Future<Output = Result<Value>>`,
/// so closures work directly:
///
/// ```rust
/// # use genkit_gateway::functions::FunctionDefinition;
/// # use serde_json::json;
/// let echo = FunctionDefinition::new(
///     "echo",
///     "Return the arguments unchanged",
///     json!({"type": "object"}),
///     |args| async move { Ok(args) },
/// );
/// ```
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    async fn call(&self, args: Value) -> Result<Value>;
}

#[async_trait]
impl<F, Fut> FunctionHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<Value> {
        (self)(args).await
    }
}

/// A callable function: name, description, argument schema and handler.
#[derive(Clone)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema the arguments must satisfy.
    pub parameters: Value,
    handler: Arc<dyn FunctionHandler>,
}

impl FunctionDefinition {
    /// Define a function backed by an async closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::with_handler(name, description, parameters, handler)
    }

    /// Define a function backed by any [`FunctionHandler`].
    pub fn with_handler(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: impl FunctionHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(handler),
        }
    }

    /// The advertisement sent to the model.
    pub fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration::new(&self.name, &self.description, self.parameters.clone())
    }
}

impl std::fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Registry of callable functions, keyed by unique name.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    definitions: HashMap<String, FunctionDefinition>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with [`builtin`] functions.
    pub fn with_defaults() -> Self {
        let definitions = builtin::definitions()
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();
        Self { definitions }
    }

    /// Register a function. Fails if the name is already taken; the existing
    /// definition is left untouched.
    pub fn register(&mut self, definition: FunctionDefinition) -> Result<()> {
        if self.definitions.contains_key(&definition.name) {
            return Err(GenkitError::configuration(
                "functions",
                format!("function '{}' is already registered", definition.name),
            ));
        }
        debug!(function = %definition.name, "registered function");
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Declarations of every registered function, in no particular order.
    pub fn definitions(&self) -> Vec<FunctionDeclaration> {
        self.definitions
            .values()
            .map(FunctionDefinition::declaration)
            .collect()
    }

    /// Validate `args` against the named function's schema and run it.
    ///
    /// # Errors
    ///
    /// - [`GenkitError::NotFound`] if no function has this name.
    /// - [`GenkitError::Validation`] if the arguments fail the schema.
    /// - Whatever the handler itself returns.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| GenkitError::NotFound(name.to_string()))?;

        let result = match schema::validate(&args, &definition.parameters) {
            Ok(()) => definition.handler.call(args).await,
            Err(e) => Err(e),
        };

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(
            telemetry::FUNCTION_CALLS_TOTAL,
            "function" => name.to_string(),
            "status" => status
        )
        .increment(1);
        if let Err(ref e) = result {
            warn!(function = name, error = %e, "function call failed");
        }
        result
    }

    /// Run a batch of calls concurrently.
    ///
    /// Returns one [`FunctionResult`] per call, in input order. Calls are
    /// independent: one failing does not affect the others.
    pub async fn execute_calls(&self, calls: &[FunctionCall]) -> Vec<FunctionResult> {
        let pending = calls.iter().map(|call| async move {
            FunctionResult {
                name: call.name.clone(),
                outcome: self.call(&call.name, call.arguments.clone()).await,
            }
        });
        join_all(pending).await
    }
}
