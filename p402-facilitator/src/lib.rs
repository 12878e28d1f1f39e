//! x402 facilitator server for Hedera and TON exact payments.
//!
//! - [`config`] — TOML configuration with environment variable expansion
//! - [`handlers`] — axum route handlers and router builder
//! - [`error`] — HTTP fault mapping
//! - [`rpc`] — reqwest-backed chain providers wired in by the binary

pub mod config;
pub mod error;
pub mod handlers;
pub mod rpc;

pub use config::FacilitatorConfig;
pub use handlers::{FacilitatorState, facilitator_router};
