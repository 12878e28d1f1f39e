//! Payload and requirement views for the TON exact scheme.

use serde::{Deserialize, Serialize};

use p402::proto::PaymentRequirements;

use crate::address::TonAddress;
use crate::exact::error::TonExactError;
use crate::memo::MemoError;

/// The native asset name accepted in `PaymentRequirements.asset`.
pub const TON_ASSET: &str = "ton";

/// Scheme-specific payload: a claim about an already-submitted transfer.
///
/// Post-hoc settlement means the client pays first and then presents this
/// claim; the transaction id is optional because some wallets cannot report
/// it, in which case the transfer is found by memo instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactTonPayload {
    /// The submitted transaction's identifier, when the wallet reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// The invoice memo the transfer carries.
    pub memo: String,
    /// Unix deadline after which the claim is no longer honored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<u64>,
}

/// The asset a requirement names: the native coin or a jetton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TonAsset {
    /// Native toncoin, in nanotons.
    Ton,
    /// A jetton, identified by its master contract, in jetton sub-units.
    Jetton(TonAddress),
}

/// Validated, typed view of a requirement's TON-specific fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequirementsView {
    /// The asset under test.
    pub asset: TonAsset,
    /// The required amount in atomic units.
    pub amount: u128,
    /// The destination account, canonicalized.
    pub pay_to: TonAddress,
}

impl RequirementsView {
    /// Parses and validates the TON-specific fields of a requirement.
    ///
    /// # Errors
    ///
    /// Returns [`TonExactError`] naming the first malformed field.
    pub fn parse(requirements: &PaymentRequirements) -> Result<Self, TonExactError> {
        let asset = if requirements.asset == TON_ASSET {
            TonAsset::Ton
        } else {
            TonAsset::Jetton(
                requirements
                    .asset
                    .parse()
                    .map_err(|_| TonExactError::InvalidAsset)?,
            )
        };

        let amount = requirements
            .amount
            .parse::<u128>()
            .ok()
            .filter(|a| *a > 0)
            .ok_or(TonExactError::InvalidAmount)?;

        let pay_to = requirements
            .pay_to
            .parse()
            .map_err(|_| TonExactError::InvalidPayTo(requirements.pay_to.clone()))?;

        Ok(Self {
            asset,
            amount,
            pay_to,
        })
    }
}

impl ExactTonPayload {
    /// Parses the scheme payload out of the generic JSON payload.
    ///
    /// # Errors
    ///
    /// A payload that does not deserialize is reported as an invalid memo,
    /// since the memo is the one field every claim must carry.
    pub fn parse(payload: &serde_json::Value) -> Result<Self, TonExactError> {
        serde_json::from_value(payload.clone())
            .map_err(|_| TonExactError::InvalidMemo(MemoError::Empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p402::chain::ChainId;

    fn requirements(asset: &str, amount: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: ChainId::new("ton", "testnet"),
            asset: asset.into(),
            amount: amount.into(),
            pay_to: "0:3333333333333333333333333333333333333333333333333333333333333333"
                .into(),
            max_timeout_seconds: 300,
            extra: serde_json::Value::Null,
        }
    }

    #[test]
    fn parses_native_requirement() {
        let view = RequirementsView::parse(&requirements("ton", "1500000000")).unwrap();
        assert_eq!(view.asset, TonAsset::Ton);
        assert_eq!(view.amount, 1_500_000_000);
    }

    #[test]
    fn parses_jetton_requirement() {
        let master = "0:4444444444444444444444444444444444444444444444444444444444444444";
        let view = RequirementsView::parse(&requirements(master, "25000")).unwrap();
        assert_eq!(view.asset, TonAsset::Jetton(master.parse().unwrap()));
    }

    #[test]
    fn rejects_bad_fields() {
        assert!(matches!(
            RequirementsView::parse(&requirements("not-an-address", "1000")),
            Err(TonExactError::InvalidAsset)
        ));
        assert!(matches!(
            RequirementsView::parse(&requirements("ton", "0")),
            Err(TonExactError::InvalidAmount)
        ));
        assert!(matches!(
            RequirementsView::parse(&requirements("ton", "-5")),
            Err(TonExactError::InvalidAmount)
        ));
        assert!(matches!(
            RequirementsView::parse(&requirements("ton", "1.5")),
            Err(TonExactError::InvalidAmount)
        ));

        let mut bad_destination = requirements("ton", "1000");
        bad_destination.pay_to = "not-an-address".into();
        assert!(matches!(
            RequirementsView::parse(&bad_destination),
            Err(TonExactError::InvalidPayTo(_))
        ));
    }

    #[test]
    fn payload_fields_are_camel_case() {
        let payload: ExactTonPayload = serde_json::from_value(serde_json::json!({
            "transactionId": "tx-1",
            "memo": "x402:invoice-001",
            "validUntil": 1_700_000_600u64,
        }))
        .unwrap();
        assert_eq!(payload.transaction_id.as_deref(), Some("tx-1"));
        assert_eq!(payload.valid_until, Some(1_700_000_600));
    }
}
