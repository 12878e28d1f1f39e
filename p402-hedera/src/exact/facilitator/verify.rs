//! Four-phase verification for the Hedera exact scheme.
//!
//! 1. Requirements & parity: the echoed `accepted` copy must equal the
//!    authoritative requirements, and the requirements themselves must be
//!    well-formed with a managed fee payer. Never touches transaction bytes.
//! 2. Decode: base64 → protobuf → [`InspectedTransfer`]; the decoded
//!    payer-of-record must equal the asserted fee payer.
//! 3. Transfer semantics: transfer-only body, per-asset conservation, zero
//!    fee-payer delta, exact credit to `payTo`, no other positive credit.
//! 4. Replay & destination policy: the transaction id must be unconsumed and
//!    `payTo` must resolve to a registered non-alias account unless the
//!    policy allows otherwise.
//!
//! An earlier phase's failure short-circuits later ones.

use p402::chain::ChainId;
use p402::encoding::Base64Bytes;
use p402::facilitator::FacilitatorError;
use p402::proto::{PaymentPayload, PaymentRequirements};
use p402::replay::ReplayStore;

use crate::account::AccountId;
use crate::exact::error::HederaExactError;
use crate::exact::types::{ExactHederaPayload, HederaAsset, RequirementsView};
use crate::inspect::{Delta, InspectedTransfer, TransferParty, inspect_transaction};
use crate::provider::{AccountResolution, HederaProvider};

use super::config::HederaExactConfig;

/// A fully verified payment, ready for settlement.
#[derive(Debug)]
pub(crate) struct VerifiedPayment {
    /// Typed requirement fields.
    pub view: RequirementsView,
    /// Normalized decoded transaction.
    pub inspected: InspectedTransfer,
    /// The inferred payer, when a unique debited account exists.
    pub payer: Option<AccountId>,
    /// The raw transaction bytes, for countersigning.
    pub transaction_bytes: Vec<u8>,
}

/// An ordinary verification failure, with the payer attached when phase 3
/// already inferred one.
#[derive(Debug)]
pub(crate) struct VerifyFailure {
    pub error: HederaExactError,
    pub payer: Option<String>,
}

impl From<HederaExactError> for VerifyFailure {
    fn from(error: HederaExactError) -> Self {
        Self { error, payer: None }
    }
}

/// Runs all four verification phases.
///
/// The outer `Result` carries internal faults (replay store unreachable);
/// the inner one carries ordinary verification failures.
pub(crate) async fn verify_payment<P, S>(
    provider: &P,
    store: &S,
    config: &HederaExactConfig,
    payload: &PaymentPayload,
    requirements: &PaymentRequirements,
) -> Result<Result<VerifiedPayment, VerifyFailure>, FacilitatorError>
where
    P: HederaProvider + ?Sized,
    S: ReplayStore + ?Sized,
{
    let chain_id = provider.chain_id();
    let managed = provider.managed_signers();

    let view = match check_requirements(&chain_id, payload, requirements, &managed) {
        Ok(view) => view,
        Err(error) => return Ok(Err(error.into())),
    };

    let (inspected, transaction_bytes) = match decode_payload(payload, &view) {
        Ok(decoded) => decoded,
        Err(error) => return Ok(Err(error.into())),
    };
    tracing::debug!(
        transaction_id = %inspected.transaction_id,
        "decoded hedera transfer"
    );

    let payer = match check_transfer_semantics(&view, &inspected) {
        Ok(payer) => payer,
        Err(error) => return Ok(Err(error.into())),
    };
    let payer_string = payer.map(|account| account.to_string());

    if store.has(&inspected.transaction_id).await? {
        tracing::debug!(transaction_id = %inspected.transaction_id, "replayed transaction id");
        return Ok(Err(VerifyFailure {
            error: HederaExactError::Replay,
            payer: payer_string,
        }));
    }

    if !config.allow_alias_destination {
        let resolution = provider.resolve_account(view.pay_to).await;
        let error = match resolution {
            Ok(AccountResolution::Registered | AccountResolution::Unsupported) => None,
            Ok(AccountResolution::Alias) => Some(HederaExactError::PayToAliasNotAllowed),
            Ok(AccountResolution::NotFound) => {
                Some(HederaExactError::InvalidPayTo(view.pay_to.to_string()))
            }
            Err(e) => Some(HederaExactError::Resolution(e.to_string())),
        };
        if let Some(error) = error {
            return Ok(Err(VerifyFailure {
                error,
                payer: payer_string,
            }));
        }
    }

    Ok(Ok(VerifiedPayment {
        view,
        inspected,
        payer,
        transaction_bytes,
    }))
}

/// Phase 1: requirements well-formedness and accepted-copy parity.
pub(crate) fn check_requirements(
    chain_id: &ChainId,
    payload: &PaymentPayload,
    requirements: &PaymentRequirements,
    managed_signers: &[AccountId],
) -> Result<RequirementsView, HederaExactError> {
    if &requirements.network != chain_id {
        return Err(HederaExactError::NetworkMismatch);
    }
    if payload.accepted != *requirements {
        return Err(HederaExactError::AcceptedRequirementsMismatch);
    }
    let view = RequirementsView::parse(requirements)?;
    if !managed_signers.contains(&view.fee_payer) {
        return Err(HederaExactError::FeePayerNotManaged);
    }
    Ok(view)
}

/// Phase 2: decode the transaction and bind it to the asserted fee payer.
pub(crate) fn decode_payload(
    payload: &PaymentPayload,
    view: &RequirementsView,
) -> Result<(InspectedTransfer, Vec<u8>), HederaExactError> {
    let exact: ExactHederaPayload = serde_json::from_value(payload.payload.clone())
        .map_err(|_| HederaExactError::MalformedPayload)?;
    let bytes = Base64Bytes::from(exact.transaction.as_bytes())
        .decode()
        .map_err(|_| HederaExactError::MalformedPayload)?;
    let inspected = inspect_transaction(&bytes)?;
    if inspected.payer_of_record != view.fee_payer {
        return Err(HederaExactError::FeePayerMismatch);
    }
    Ok((inspected, bytes))
}

/// Phase 3: structural checks over the decoded balance deltas.
///
/// Returns the inferred payer: the unique net-debited account of the
/// requested asset, when there is exactly one and it is a numbered account.
pub(crate) fn check_transfer_semantics(
    view: &RequirementsView,
    inspected: &InspectedTransfer,
) -> Result<Option<AccountId>, HederaExactError> {
    if inspected.has_non_transfer_ops {
        return Err(HederaExactError::NonTransferOps);
    }

    if signed_sum(&inspected.hbar_deltas) != 0 {
        return Err(HederaExactError::HbarSumNonZero);
    }
    for (_, deltas) in &inspected.token_deltas {
        if signed_sum(deltas) != 0 {
            return Err(HederaExactError::TokenSumNonZero);
        }
    }

    if net_of(&inspected.hbar_deltas, view.fee_payer) != 0 {
        return Err(HederaExactError::FeePayerTransferringFunds);
    }
    for (_, deltas) in &inspected.token_deltas {
        if net_of(deltas, view.fee_payer) != 0 {
            return Err(HederaExactError::FeePayerTransferringFunds);
        }
    }

    static EMPTY: &[Delta] = &[];
    let requested = match view.asset {
        HederaAsset::Hbar => inspected.hbar_deltas.as_slice(),
        HederaAsset::Token(token) => inspected
            .token_deltas
            .iter()
            .find(|(t, _)| *t == token)
            .map_or(EMPTY, |(_, deltas)| deltas.as_slice()),
    };
    let nets = aggregate(requested);

    let pay_to_credit = nets
        .iter()
        .find(|(party, _)| party.account() == Some(view.pay_to))
        .map_or(0, |(_, net)| *net);
    if pay_to_credit != i128::from(view.amount) {
        return Err(HederaExactError::AmountMismatch);
    }

    if nets
        .iter()
        .any(|(party, net)| *net > 0 && party.account() != Some(view.pay_to))
    {
        return Err(HederaExactError::ExtraPositiveTransfers);
    }

    let mut debited = nets.iter().filter(|(_, net)| *net < 0);
    let payer = match (debited.next(), debited.next()) {
        (Some((party, _)), None) => party.account(),
        _ => None,
    };
    Ok(payer)
}

fn signed_sum(deltas: &[Delta]) -> i128 {
    deltas.iter().map(|d| i128::from(d.amount)).sum()
}

fn net_of(deltas: &[Delta], account: AccountId) -> i128 {
    deltas
        .iter()
        .filter(|d| d.party.account() == Some(account))
        .map(|d| i128::from(d.amount))
        .sum()
}

/// Aggregates repeated entries for the same party into net amounts,
/// preserving first-seen order.
fn aggregate(deltas: &[Delta]) -> Vec<(TransferParty, i128)> {
    let mut nets: Vec<(TransferParty, i128)> = Vec::with_capacity(deltas.len());
    for delta in deltas {
        match nets.iter_mut().find(|(party, _)| *party == delta.party) {
            Some((_, net)) => *net += i128::from(delta.amount),
            None => nets.push((delta.party.clone(), i128::from(delta.amount))),
        }
    }
    nets
}
