//! Public types for the gateway API.

mod function;
mod generate;
mod response;
pub mod settings;

pub use function::{FunctionCall, FunctionDeclaration, FunctionResult};
pub use generate::{GenerateResponse, GenerationResult};
pub use response::Embedding;
pub use settings::{GenerationSettings, SafetySetting, SettingsOverrides, SettingsPolicy};
