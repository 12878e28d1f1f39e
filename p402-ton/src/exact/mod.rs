//! The `exact` payment scheme over TON.

mod error;
mod facilitator;
mod types;

pub use error::TonExactError;
pub use facilitator::{TonExactConfig, TonExactFacilitator};
pub use types::{ExactTonPayload, RequirementsView, TON_ASSET, TonAsset};
