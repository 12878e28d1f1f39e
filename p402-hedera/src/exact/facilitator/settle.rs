//! Settlement for the Hedera exact scheme.
//!
//! Settlement re-runs full verification (state may have changed since the
//! caller's `verify`), consumes the transaction id in the replay store, and
//! only then countersigns and broadcasts. The consume-before-broadcast order
//! is what makes two racing settlements of the same payload broadcast at
//! most once; a failed broadcast releases the record so the payment stays
//! retryable, since it never reached the network.

use p402::facilitator::FacilitatorError;
use p402::proto::{ErrorReason, SettleRequest, SettleResponse};
use p402::replay::ReplayStore;

use crate::provider::HederaProvider;

use super::config::HederaExactConfig;
use super::verify::verify_payment;

pub(crate) async fn settle_payment<P, S>(
    provider: &P,
    store: &S,
    config: &HederaExactConfig,
    request: &SettleRequest,
) -> Result<SettleResponse, FacilitatorError>
where
    P: HederaProvider + ?Sized,
    S: ReplayStore + ?Sized,
{
    let network = request.payment_requirements.network.to_string();

    let verified = match verify_payment(
        provider,
        store,
        config,
        &request.payment_payload,
        &request.payment_requirements,
    )
    .await?
    {
        Ok(verified) => verified,
        Err(failure) => {
            return Ok(SettleResponse::error_with_message(
                failure.error.reason_code(),
                failure.error.to_string(),
                network,
            ));
        }
    };

    let replay_key = verified.inspected.transaction_id.clone();
    if !store.try_consume(&replay_key).await? {
        return Ok(SettleResponse::error_with_message(
            ErrorReason::InvalidTransactionState.as_str(),
            "transaction id already consumed",
            network,
        ));
    }

    match provider
        .sign_and_broadcast(verified.transaction_bytes, verified.view.fee_payer)
        .await
    {
        Ok(receipt) => {
            let transaction = receipt.transaction_id.unwrap_or_else(|| replay_key.clone());
            tracing::info!(%transaction, "settled hedera payment");
            Ok(SettleResponse::success(
                verified.payer.map(|account| account.to_string()),
                transaction,
                network,
            ))
        }
        Err(e) => {
            // The transaction never reached finality; keep it retryable.
            store.release(&replay_key).await?;
            tracing::warn!(transaction_id = %replay_key, error = %e, "hedera broadcast failed");
            Ok(SettleResponse::error_with_message(
                ErrorReason::TransactionFailed.as_str(),
                e.to_string(),
                network,
            ))
        }
    }
}
