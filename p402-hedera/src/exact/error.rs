//! Failure taxonomy for the Hedera exact scheme.

use crate::inspect::InspectError;

/// Everything that can make a Hedera exact payment invalid.
///
/// Each variant maps to exactly one stable wire reason code via
/// [`HederaExactError::reason_code`]; the codes are part of the protocol
/// surface and never change between releases.
#[derive(Debug, thiserror::Error)]
pub enum HederaExactError {
    /// The requirements name a different network than this handler serves.
    #[error("requirements are for a different network")]
    NetworkMismatch,

    /// The payload's echoed `accepted` copy differs from the authoritative
    /// requirements.
    #[error("accepted requirements do not match the authoritative requirements")]
    AcceptedRequirementsMismatch,

    /// The asset is neither `hbar` nor a parsable token id.
    #[error("asset is not hbar or a valid token id")]
    InvalidAsset,

    /// The amount is not a positive atomic-unit integer.
    #[error("amount is not a positive integer")]
    InvalidAmount,

    /// The recipient is not a parsable account id, or does not exist.
    #[error("payTo is not a valid destination account: {0}")]
    InvalidPayTo(String),

    /// The fee payer is absent from `extra` or not a managed signer.
    #[error("fee payer is missing or not managed by this facilitator")]
    FeePayerNotManaged,

    /// The payload JSON carries no base64 transaction.
    #[error("payload is missing a base64 transaction")]
    MalformedPayload,

    /// The transaction bytes could not be decoded as a crypto transfer.
    #[error("transaction could not be decoded: {0}")]
    Decode(#[from] InspectError),

    /// The decoded payer-of-record differs from the asserted fee payer.
    #[error("transaction payer-of-record does not match the asserted fee payer")]
    FeePayerMismatch,

    /// The transaction carries operations other than the value transfer.
    #[error("transaction contains non-transfer operations")]
    NonTransferOps,

    /// The hbar delta list does not sum to zero.
    #[error("hbar transfer list does not sum to zero")]
    HbarSumNonZero,

    /// A token delta list does not sum to zero.
    #[error("token transfer list does not sum to zero")]
    TokenSumNonZero,

    /// The fee payer has a non-zero net delta for some asset.
    #[error("fee payer is a counterparty to the value transfer")]
    FeePayerTransferringFunds,

    /// The recipient is not credited exactly the required amount.
    #[error("payTo is not credited exactly the required amount")]
    AmountMismatch,

    /// Some account other than the recipient receives a positive credit.
    #[error("transaction credits accounts other than payTo")]
    ExtraPositiveTransfers,

    /// The destination is an alias account and the policy forbids that.
    #[error("payTo is an alias account and alias destinations are not allowed")]
    PayToAliasNotAllowed,

    /// The transaction id was already consumed.
    #[error("transaction id already consumed")]
    Replay,

    /// Account resolution failed at the chain boundary.
    #[error("account resolution failed: {0}")]
    Resolution(String),
}

impl HederaExactError {
    /// Returns the stable wire reason code for this failure.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::NetworkMismatch => "network_mismatch",
            Self::AcceptedRequirementsMismatch => "accepted_payment_requirements_mismatch",
            Self::InvalidAsset => "invalid_asset",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidPayTo(_) => "invalid_pay_to",
            Self::FeePayerNotManaged => "fee_payer_not_managed_by_facilitator",
            Self::MalformedPayload | Self::Decode(_) => {
                "invalid_exact_hedera_payload_transaction_could_not_be_decoded"
            }
            Self::FeePayerMismatch => "invalid_exact_hedera_payload_fee_payer_mismatch",
            Self::NonTransferOps => "invalid_exact_hedera_payload_contains_non_transfer_ops",
            Self::HbarSumNonZero => "invalid_exact_hedera_payload_hbar_sum_non_zero",
            Self::TokenSumNonZero => "invalid_exact_hedera_payload_token_sum_non_zero",
            Self::FeePayerTransferringFunds => {
                "invalid_exact_hedera_payload_fee_payer_transferring_funds"
            }
            Self::AmountMismatch => "invalid_exact_hedera_payload_amount_mismatch",
            Self::ExtraPositiveTransfers => {
                "invalid_exact_hedera_payload_extra_positive_transfers"
            }
            Self::PayToAliasNotAllowed => "invalid_exact_hedera_payload_pay_to_alias_not_allowed",
            Self::Replay => "invalid_transaction_state",
            Self::Resolution(_) => "unexpected_error",
        }
    }
}
