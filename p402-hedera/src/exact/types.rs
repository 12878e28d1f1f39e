//! Payload and requirement views for the Hedera exact scheme.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use p402::proto::PaymentRequirements;

use crate::account::{AccountId, TokenId};
use crate::exact::error::HederaExactError;

/// The native asset name accepted in `PaymentRequirements.asset`.
pub const HBAR_ASSET: &str = "hbar";

/// The `extra` key carrying the facilitator-managed fee payer.
pub const FEE_PAYER_KEY: &str = "feePayer";

/// Scheme-specific payload: a base64-encoded, payer-signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactHederaPayload {
    /// Base64-encoded serialized transaction bytes.
    pub transaction: String,
}

/// The asset a requirement names: the native coin or a specific token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HederaAsset {
    /// The native hbar coin, in tinybars.
    Hbar,
    /// A fungible token, in its smallest unit.
    Token(TokenId),
}

/// Validated, typed view of a requirement's Hedera-specific fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementsView {
    /// The asset under test.
    pub asset: HederaAsset,
    /// The required amount in atomic units.
    pub amount: i64,
    /// The destination account.
    pub pay_to: AccountId,
    /// The facilitator-managed fee payer asserted in `extra`.
    pub fee_payer: AccountId,
}

impl RequirementsView {
    /// Parses and validates the Hedera-specific fields of a requirement.
    ///
    /// # Errors
    ///
    /// Returns [`HederaExactError`] naming the first malformed field.
    pub fn parse(requirements: &PaymentRequirements) -> Result<Self, HederaExactError> {
        let asset = if requirements.asset == HBAR_ASSET {
            HederaAsset::Hbar
        } else {
            HederaAsset::Token(
                requirements
                    .asset
                    .parse()
                    .map_err(|_| HederaExactError::InvalidAsset)?,
            )
        };

        let amount = requirements
            .atomic_amount()
            .and_then(|a| i64::try_from(a).ok())
            .filter(|a| *a > 0)
            .ok_or(HederaExactError::InvalidAmount)?;

        let pay_to = requirements
            .pay_to
            .parse()
            .map_err(|_| HederaExactError::InvalidPayTo(requirements.pay_to.clone()))?;

        let fee_payer = fee_payer_of(&requirements.extra)
            .ok_or(HederaExactError::FeePayerNotManaged)?;

        Ok(Self {
            asset,
            amount,
            pay_to,
            fee_payer,
        })
    }
}

/// Extracts the fee payer account from a requirement's `extra` object.
#[must_use]
pub fn fee_payer_of(extra: &Value) -> Option<AccountId> {
    extra.get(FEE_PAYER_KEY)?.as_str()?.parse().ok()
}
