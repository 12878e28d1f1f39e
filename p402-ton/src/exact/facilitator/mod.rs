//! Facilitator-side handler for the TON exact scheme.

use std::time::Duration;

use p402::facilitator::{BoxFuture, Facilitator, FacilitatorError};
use p402::proto;
use p402::proto::ErrorReason;
use p402::replay::ReplayStore;
use p402::scheme::EXACT_SCHEME;

use crate::rpc::TonRpc;

mod config;
mod settle;
mod verify;

pub use config::TonExactConfig;

/// Ceiling applied to `maxTimeoutSeconds` when deriving the verification
/// deadline, so a hostile requirement cannot pin a worker.
const MAX_TIMEOUT_CEILING_SECS: u64 = 300;

/// Verifies and settles exact TON payments.
///
/// Post-hoc model: the handler never broadcasts; it confirms transfers the
/// client already submitted through the injected RPC backend.
#[derive(Debug)]
pub struct TonExactFacilitator<R, S> {
    rpc: R,
    replay: S,
    config: TonExactConfig,
}

impl<R: TonRpc, S: ReplayStore> TonExactFacilitator<R, S> {
    /// Creates a handler over the given RPC backend and replay store.
    pub fn new(rpc: R, replay: S, config: TonExactConfig) -> Self {
        Self {
            rpc,
            replay,
            config,
        }
    }

    fn deadline(requirements: &proto::PaymentRequirements) -> Duration {
        Duration::from_secs(
            requirements
                .max_timeout_seconds
                .clamp(1, MAX_TIMEOUT_CEILING_SECS),
        )
    }
}

impl<R: TonRpc, S: ReplayStore> Facilitator for TonExactFacilitator<R, S> {
    fn verify(
        &self,
        request: proto::VerifyRequest,
    ) -> BoxFuture<'_, Result<proto::VerifyResponse, FacilitatorError>> {
        Box::pin(async move {
            let deadline = Self::deadline(&request.payment_requirements);
            let outcome = tokio::time::timeout(
                deadline,
                verify::verify_payment(
                    &self.rpc,
                    &self.replay,
                    &self.config,
                    &request.payment_payload,
                    &request.payment_requirements,
                ),
            )
            .await;
            match outcome {
                Ok(result) => Ok(match result? {
                    Ok(verified) => proto::VerifyResponse::Valid {
                        payer: verified.payer,
                    },
                    Err(failure) => proto::VerifyResponse::Invalid {
                        reason: failure.error.reason_code().to_owned(),
                        message: Some(failure.error.to_string()),
                        payer: failure.payer,
                    },
                }),
                // Fail closed on deadline expiry rather than hang.
                Err(_) => Ok(proto::VerifyResponse::invalid_with_message(
                    ErrorReason::UnexpectedError.as_str(),
                    "verification timed out",
                )),
            }
        })
    }

    fn settle(
        &self,
        request: proto::SettleRequest,
    ) -> BoxFuture<'_, Result<proto::SettleResponse, FacilitatorError>> {
        Box::pin(async move {
            let deadline = Self::deadline(&request.payment_requirements);
            let network = request.payment_requirements.network.to_string();
            let outcome = tokio::time::timeout(
                deadline,
                settle::settle_payment(&self.rpc, &self.replay, &self.config, &request),
            )
            .await;
            match outcome {
                Ok(result) => result,
                Err(_) => Ok(proto::SettleResponse::error_with_message(
                    ErrorReason::TransactionFailed.as_str(),
                    "settlement timed out",
                    network,
                )),
            }
        })
    }

    fn supported(&self) -> BoxFuture<'_, Result<proto::SupportedResponse, FacilitatorError>> {
        Box::pin(async move {
            Ok(proto::SupportedResponse {
                kinds: vec![proto::SupportedPaymentKind {
                    x402_version: proto::X402Version2::VALUE,
                    scheme: EXACT_SCHEME.to_owned(),
                    network: self.rpc.chain_id().to_string(),
                    extra: None,
                }],
            })
        })
    }
}
