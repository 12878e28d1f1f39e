//! Core types for the x402 exact-scheme payment protocol.
//!
//! This crate provides the foundational types used throughout the p402
//! workspace for implementing HTTP 402 Payment Required flows. It is
//! blockchain-agnostic; chain-specific scheme implementations live in
//! separate crates (`p402-hedera`, `p402-ton`).
//!
//! # Overview
//!
//! When a client requests a paid resource, the server responds with payment
//! requirements. The client constructs a payment payload satisfying them — a
//! payer-signed transfer for pre-submitted schemes, or a broadcast
//! transaction reference for post-hoc schemes — which a facilitator verifies
//! and settles against the chain.
//!
//! # Modules
//!
//! - [`chain`] - Namespaced network identifiers and pattern matching
//! - [`encoding`] - Base64 wire encoding helpers
//! - [`facilitator`] - Core trait for payment verification and settlement
//! - [`networks`] - Registry of well-known network definitions
//! - [`proto`] - Wire format types and the reason-code taxonomy
//! - [`replay`] - Replay-protection store contract
//! - [`scheme`] - Payment scheme identifiers and the handler registry
//! - [`timestamp`] - Unix timestamp wire type

pub mod chain;
pub mod encoding;
pub mod facilitator;
pub mod networks;
pub mod proto;
pub mod replay;
pub mod scheme;
pub mod timestamp;
