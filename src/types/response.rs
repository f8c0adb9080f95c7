//! Embedding response type

use serde::{Deserialize, Serialize};

/// Dense vector returned by the embedding endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
}

impl Embedding {
    pub fn new(values: Vec<f32>, model: impl Into<String>) -> Self {
        Self {
            dimensions: values.len(),
            values,
            model: model.into(),
        }
    }
}
