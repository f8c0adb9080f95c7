//! Remote generation backends.
//!
//! [`GenerationBackend`] is the seam between [`GenkitClient`](crate::GenkitClient)
//! and the network; [`VertexClient`] is the production implementation.

pub mod traits;
pub mod vertex;

pub use traits::{EmbedRequest, GenerationBackend, ModelTarget, RemoteRequest};
pub use vertex::{VertexClient, VertexClientBuilder};
