//! Settlement for the TON exact scheme.
//!
//! Nothing is broadcast here: the client already paid. Settlement is
//! verification retried across the indexing lag, followed by consuming the
//! transaction id in the replay store. A transfer the indexer has not seen
//! yet fails with a transient `not_found`, so only that (and transport
//! errors) is retried; every other failure returns immediately.

use p402::facilitator::FacilitatorError;
use p402::proto::{SettleRequest, SettleResponse};
use p402::replay::ReplayStore;

use crate::rpc::TonRpc;

use super::config::TonExactConfig;
use super::verify::{VerifiedPayment, VerifyFailure, verify_payment};

enum SettleError {
    Internal(FacilitatorError),
    Failure(VerifyFailure),
}

impl SettleError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Internal(_) => false,
            Self::Failure(failure) => failure.error.is_retryable(),
        }
    }
}

pub(crate) async fn settle_payment<R, S>(
    rpc: &R,
    store: &S,
    config: &TonExactConfig,
    request: &SettleRequest,
) -> Result<SettleResponse, FacilitatorError>
where
    R: TonRpc + ?Sized,
    S: ReplayStore + ?Sized,
{
    let network = request.payment_requirements.network.to_string();

    let attempt = || async move {
        match verify_payment(
            rpc,
            store,
            config,
            &request.payment_payload,
            &request.payment_requirements,
        )
        .await
        {
            Ok(Ok(verified)) => Ok(verified),
            Ok(Err(failure)) => Err(SettleError::Failure(failure)),
            Err(internal) => Err(SettleError::Internal(internal)),
        }
    };

    let verified: VerifiedPayment =
        match config.retry.execute(attempt, SettleError::is_retryable).await {
            Ok(verified) => verified,
            Err(SettleError::Internal(internal)) => return Err(internal),
            Err(SettleError::Failure(failure)) => {
                return Ok(SettleResponse::error_with_message(
                    failure.error.reason_code(),
                    failure.error.to_string(),
                    network,
                ));
            }
        };

    let replay_key = verified.transfer.transaction_id.clone();
    if !store.try_consume(&replay_key).await? {
        return Ok(SettleResponse::error_with_message(
            "replay_detected",
            "transaction id already consumed",
            network,
        ));
    }

    tracing::info!(transaction = %replay_key, "settled ton payment");
    Ok(SettleResponse::success(verified.payer, replay_key, network))
}
