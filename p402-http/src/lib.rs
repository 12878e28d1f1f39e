//! HTTP transport layer for the x402 payment protocol.
//!
//! - [`constants`] - protocol header names
//! - [`headers`] - base64 JSON codecs for the protocol headers
//! - [`client`] - reqwest-based client for a remote facilitator
//! - [`layer`] - tower/axum middleware enforcing payment on routes
//! - [`paygate`] - the underlying challenge-response state machine

pub mod client;
pub mod constants;
pub mod error;
pub mod headers;
pub mod layer;
pub mod paygate;

pub use client::FacilitatorClient;
pub use layer::{PaymentGate, PaymentGateLayer};
