//! Caching subsystem.
//!
//! - [`fingerprint::RequestFingerprint`]: canonical, order-independent
//!   cache key built from operation, model, input and effective settings.
//! - [`response::ResponseCache`]: bounded LRU + TTL store of successful
//!   generations and embeddings, owned by one
//!   [`GenkitClient`](crate::GenkitClient). See the [`response`] module docs.

pub mod fingerprint;
pub mod response;

pub use fingerprint::RequestFingerprint;
pub use response::{CacheConfig, ResponseCache};
