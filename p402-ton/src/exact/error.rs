//! Failure taxonomy for the TON exact scheme.

use crate::memo::MemoError;
use crate::rpc::TonRpcError;

/// Everything that can make a TON exact payment invalid.
///
/// [`TonExactError::NotFound`] and transport-level [`TonExactError::Rpc`]
/// failures are the only retryable conditions; everything else is final no
/// matter how often it is retried.
#[derive(Debug, thiserror::Error)]
pub enum TonExactError {
    /// The requirements name a different network than this handler serves.
    #[error("requirements are for a different network")]
    NetworkMismatch,

    /// The payload's echoed `accepted` copy differs from the authoritative
    /// requirements.
    #[error("accepted requirements do not match the authoritative requirements")]
    AcceptedRequirementsMismatch,

    /// The asset is neither `ton` nor a parsable jetton master address.
    #[error("asset is not ton or a valid jetton master address")]
    InvalidAsset,

    /// The amount is not a positive atomic-unit integer.
    #[error("amount is not a positive integer")]
    InvalidAmount,

    /// The recipient is not a parsable TON address.
    #[error("payTo is not a valid ton address: {0}")]
    InvalidPayTo(String),

    /// The memo failed format validation, or the payload carries none.
    #[error("invalid memo: {0}")]
    InvalidMemo(#[from] MemoError),

    /// The payment's validity deadline has passed.
    #[error("payment validity deadline has passed")]
    Expired,

    /// No matching transaction is known to the indexer yet. Retryable.
    #[error("transaction not found")]
    NotFound,

    /// The observed transfer pays a different destination.
    #[error("transfer destination does not match payTo")]
    DestinationMismatch,

    /// The observed amount, asset, or declared precision is wrong.
    #[error("transfer amount does not match: {0}")]
    AmountMismatch(String),

    /// The observed memo differs from the claimed one.
    #[error("transfer memo does not match")]
    MemoMismatch,

    /// The transaction id was already consumed.
    #[error("transaction already consumed")]
    Replay,

    /// The RPC backend failed. Retryable.
    #[error(transparent)]
    Rpc(#[from] TonRpcError),
}

impl TonExactError {
    /// Returns the stable wire reason code for this failure.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::NetworkMismatch => "network_mismatch",
            Self::AcceptedRequirementsMismatch => "accepted_payment_requirements_mismatch",
            Self::InvalidAsset => "invalid_asset",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidPayTo(_) => "invalid_pay_to",
            Self::InvalidMemo(_) => "invalid_memo",
            Self::Expired => "expired",
            Self::NotFound => "not_found",
            Self::DestinationMismatch => "destination_mismatch",
            Self::AmountMismatch(_) => "amount_mismatch",
            Self::MemoMismatch => "memo_mismatch",
            Self::Replay => "replay_detected",
            Self::Rpc(_) => "rpc_error",
        }
    }

    /// Returns `true` if retrying the same payment may succeed.
    ///
    /// Malformed indexer data is not retryable; the same response would
    /// come back again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotFound | Self::Rpc(TonRpcError::Transport(_)))
    }
}
