//! HTTP boundary for Stampede
//!
//! The engine only ever talks to the system under test through the
//! [`UsersTarget`] trait. [`HttpTarget`] is the production implementation on
//! top of a single shared `reqwest::Client`; tests substitute in-memory
//! targets or point `HttpTarget` at a wiremock server.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-export main types for convenience
pub use client::{HttpTarget, UsersTarget};
pub use config::HttpConfig;
pub use errors::HttpError;
pub use types::{HttpMethod, TargetResponse, UserPayload};
