//! TON chain support for the x402 payment protocol.
//!
//! Implements the post-hoc `exact` scheme: the client submits the transfer
//! itself, tagged with an invoice memo, and presents a claim; the
//! facilitator confirms the transfer on chain through an indexer and never
//! broadcasts anything.
//!
//! - [`exact::TonExactFacilitator`] - the verify/settle handler
//! - [`address::TonAddress`] - canonical address handling for both the raw
//!   and friendly textual encodings
//! - [`rpc::TonRpc`] - injected chain lookup capabilities
//! - [`retry::RetryPolicy`] - bounded backoff used by settlement

pub mod address;
pub mod exact;
pub mod memo;
pub mod networks;
pub mod retry;
pub mod rpc;

pub use networks::{TON_NAMESPACE, TON_NETWORKS};
