//! The `exact` payment scheme for Hedera networks.
//!
//! Pre-submitted model: the client constructs and payer-signs a
//! `CryptoTransfer`, the facilitator verifies it structurally, countersigns
//! with a managed fee-payer key, and broadcasts it.

pub mod error;
mod facilitator;
pub mod types;

pub use error::HederaExactError;
pub use facilitator::{HederaExactConfig, HederaExactFacilitator};
pub use types::{ExactHederaPayload, HederaAsset, RequirementsView};
