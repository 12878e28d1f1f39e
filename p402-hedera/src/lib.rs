//! Hedera chain support for the x402 payment protocol.
//!
//! Implements the pre-submitted `exact` scheme: the client hands the
//! facilitator a partially constructed, payer-signed `CryptoTransfer`; the
//! facilitator verifies it against the payment requirements, countersigns
//! with a managed fee-payer account, and broadcasts it.
//!
//! - [`exact::HederaExactFacilitator`] - the verify/settle handler
//! - [`inspect`] - pure transaction decoder producing normalized deltas
//! - [`provider::HederaProvider`] - injected chain capabilities
//! - [`testing`] - fixture builders for transfer transactions

pub mod account;
pub mod exact;
pub mod inspect;
pub mod networks;
pub mod pb;
pub mod provider;
pub mod testing;

pub use networks::{HEDERA_NAMESPACE, HEDERA_NETWORKS};
