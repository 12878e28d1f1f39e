//! Post-hoc verification for the TON exact scheme.
//!
//! The client has already paid; verification confirms the transfer exists
//! on chain and matches the invoice. Checks run in order:
//!
//! 1. Requirements & parity: the echoed `accepted` copy must equal the
//!    authoritative requirements, and the requirements must be well-formed.
//! 2. Claim: the payload's memo must validate and the claim must not be
//!    expired.
//! 3. Lookup: fetch the transfer by id, or scan recent incoming transfers
//!    by memo. A miss is the retryable `not_found`.
//! 4. Transfer checks: canonical destination equality, exact amount in the
//!    right asset, declared jetton precision, and memo agreement.
//! 5. Replay: the transaction id must not have been consumed.
//!
//! An earlier check's failure short-circuits later ones.

use p402::chain::ChainId;
use p402::facilitator::FacilitatorError;
use p402::proto::{PaymentPayload, PaymentRequirements};
use p402::replay::ReplayStore;
use p402::timestamp::UnixTimestamp;

use crate::address::TonAddress;
use crate::exact::error::TonExactError;
use crate::exact::types::{ExactTonPayload, RequirementsView, TonAsset};
use crate::memo::{has_prefix, validate_memo};
use crate::rpc::{TonRpc, TransferView};

use super::config::TonExactConfig;

/// A confirmed payment, ready to be recorded as settled.
#[derive(Debug)]
pub(crate) struct VerifiedPayment {
    /// The matched on-chain transfer.
    pub transfer: TransferView,
    /// The sending account, when the indexer reports one.
    pub payer: Option<String>,
}

/// An ordinary verification failure, with the payer attached when the
/// transfer was already located.
#[derive(Debug)]
pub(crate) struct VerifyFailure {
    pub error: TonExactError,
    pub payer: Option<String>,
}

impl From<TonExactError> for VerifyFailure {
    fn from(error: TonExactError) -> Self {
        Self { error, payer: None }
    }
}

/// Runs all verification checks.
///
/// The outer `Result` carries internal faults (replay store unreachable);
/// the inner one carries ordinary verification failures, including
/// transient lookup misses.
pub(crate) async fn verify_payment<R, S>(
    rpc: &R,
    store: &S,
    config: &TonExactConfig,
    payload: &PaymentPayload,
    requirements: &PaymentRequirements,
) -> Result<Result<VerifiedPayment, VerifyFailure>, FacilitatorError>
where
    R: TonRpc + ?Sized,
    S: ReplayStore + ?Sized,
{
    let view = match check_requirements(&rpc.chain_id(), payload, requirements) {
        Ok(view) => view,
        Err(error) => return Ok(Err(error.into())),
    };

    let claim = match check_claim(config, payload, UnixTimestamp::now()) {
        Ok(claim) => claim,
        Err(error) => return Ok(Err(error.into())),
    };

    let transfer = match lookup_transfer(rpc, config, &view, &claim).await {
        Ok(transfer) => transfer,
        Err(error) => return Ok(Err(error.into())),
    };
    tracing::debug!(transaction_id = %transfer.transaction_id, "located ton transfer");
    let payer = transfer.source.clone();

    if let Err(error) = check_transfer(&view, config, &claim, &transfer) {
        return Ok(Err(VerifyFailure { error, payer }));
    }

    if store.has(&transfer.transaction_id).await? {
        tracing::debug!(transaction_id = %transfer.transaction_id, "replayed transaction id");
        return Ok(Err(VerifyFailure {
            error: TonExactError::Replay,
            payer,
        }));
    }

    Ok(Ok(VerifiedPayment { transfer, payer }))
}

/// Requirements well-formedness and accepted-copy parity.
pub(crate) fn check_requirements(
    chain_id: &ChainId,
    payload: &PaymentPayload,
    requirements: &PaymentRequirements,
) -> Result<RequirementsView, TonExactError> {
    if &requirements.network != chain_id {
        return Err(TonExactError::NetworkMismatch);
    }
    if payload.accepted != *requirements {
        return Err(TonExactError::AcceptedRequirementsMismatch);
    }
    RequirementsView::parse(requirements)
}

/// Claim well-formedness: memo format and expiry.
pub(crate) fn check_claim(
    config: &TonExactConfig,
    payload: &PaymentPayload,
    now: UnixTimestamp,
) -> Result<ExactTonPayload, TonExactError> {
    let claim = ExactTonPayload::parse(&payload.payload)?;
    validate_memo(&claim.memo, config.memo_mode)?;
    if let Some(deadline) = claim.valid_until {
        if now.as_secs() > deadline {
            return Err(TonExactError::Expired);
        }
    }
    Ok(claim)
}

/// Finds the claimed transfer: by id when the claim carries one, otherwise
/// by scanning recent incoming transfers for the memo.
async fn lookup_transfer<R>(
    rpc: &R,
    config: &TonExactConfig,
    view: &RequirementsView,
    claim: &ExactTonPayload,
) -> Result<TransferView, TonExactError>
where
    R: TonRpc + ?Sized,
{
    if let Some(id) = &claim.transaction_id {
        return rpc
            .transaction_by_id(id)
            .await?
            .ok_or(TonExactError::NotFound);
    }

    let recent = rpc
        .incoming_transfers(&view.pay_to.to_string(), config.effective_lookup_limit())
        .await?;
    recent
        .into_iter()
        .find(|t| t.memo.as_deref() == Some(claim.memo.as_str()))
        .ok_or(TonExactError::NotFound)
}

/// Checks the located transfer against the invoice.
pub(crate) fn check_transfer(
    view: &RequirementsView,
    config: &TonExactConfig,
    claim: &ExactTonPayload,
    transfer: &TransferView,
) -> Result<(), TonExactError> {
    let destination: TonAddress = transfer
        .destination
        .parse()
        .map_err(|_| TonExactError::DestinationMismatch)?;
    if destination != view.pay_to {
        return Err(TonExactError::DestinationMismatch);
    }

    match (view.asset, &transfer.jetton) {
        (TonAsset::Ton, None) => {}
        (TonAsset::Ton, Some(_)) => {
            return Err(TonExactError::AmountMismatch(
                "jetton transfer where native toncoin was required".into(),
            ));
        }
        (TonAsset::Jetton(_), None) => {
            return Err(TonExactError::AmountMismatch(
                "native transfer where a jetton was required".into(),
            ));
        }
        (TonAsset::Jetton(master), Some(info)) => {
            let observed: TonAddress = info
                .master
                .parse()
                .map_err(|_| TonExactError::AmountMismatch("unparsable jetton master".into()))?;
            if observed != master {
                return Err(TonExactError::AmountMismatch(format!(
                    "jetton {observed} does not match required {master}"
                )));
            }
            if let Some(expected) = config.jetton_decimals.get(&master.to_string()) {
                if info.decimals != *expected {
                    return Err(TonExactError::AmountMismatch(format!(
                        "jetton declares {} decimals, expected {expected}",
                        info.decimals
                    )));
                }
            }
        }
    }

    if transfer.amount != view.amount {
        return Err(TonExactError::AmountMismatch(format!(
            "transferred {} atomic units, required {}",
            transfer.amount, view.amount
        )));
    }

    // A namespaced memo binds the payment to one specific invoice; an
    // unprefixed legacy memo only has to find the transfer.
    if has_prefix(&claim.memo) && transfer.memo.as_deref() != Some(claim.memo.as_str()) {
        return Err(TonExactError::MemoMismatch);
    }

    Ok(())
}
