//! Client and builder

mod builder;
mod client;

pub use builder::GenkitClientBuilder;
pub use client::GenkitClient;
