//! Facilitator-side handler for the Hedera exact scheme.

use std::time::Duration;

use p402::facilitator::{BoxFuture, Facilitator, FacilitatorError};
use p402::proto;
use p402::proto::ErrorReason;
use p402::replay::ReplayStore;
use p402::scheme::EXACT_SCHEME;

use crate::exact::types::FEE_PAYER_KEY;
use crate::provider::HederaProvider;

mod config;
mod settle;
mod verify;

pub use config::HederaExactConfig;

/// Ceiling applied to `maxTimeoutSeconds` when deriving the verification
/// deadline, so a hostile requirement cannot pin a worker.
const MAX_TIMEOUT_CEILING_SECS: u64 = 300;

/// Verifies and settles exact Hedera payments.
///
/// Holds the injected chain provider and replay store; all network access
/// goes through the provider, so the handler is fully testable with mocks.
#[derive(Debug)]
pub struct HederaExactFacilitator<P, S> {
    provider: P,
    replay: S,
    config: HederaExactConfig,
}

impl<P: HederaProvider, S: ReplayStore> HederaExactFacilitator<P, S> {
    /// Creates a handler over the given provider and replay store.
    pub fn new(provider: P, replay: S, config: HederaExactConfig) -> Self {
        Self {
            provider,
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

impl<P: HederaProvider, S: ReplayStore> Facilitator for HederaExactFacilitator<P, S> {
    fn verify(
        &self,
        request: proto::VerifyRequest,
    ) -> BoxFuture<'_, Result<proto::VerifyResponse, FacilitatorError>> {
        Box::pin(async move {
            let deadline = Self::deadline(&request.payment_requirements);
            let outcome = tokio::time::timeout(
                deadline,
                verify::verify_payment(
                    &self.provider,
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
                        payer: verified.payer.map(|account| account.to_string()),
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
                settle::settle_payment(&self.provider, &self.replay, &self.config, &request),
            )
            .await;
            match outcome {
                Ok(result) => result,
                // The replay record, if consumed, stays consumed: an
                // in-flight broadcast may still land.
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
            let kinds = self
                .provider
                .managed_signers()
                .first()
                .map(|fee_payer| proto::SupportedPaymentKind {
                    x402_version: proto::X402Version2::VALUE,
                    scheme: EXACT_SCHEME.to_owned(),
                    network: self.provider.chain_id().to_string(),
                    extra: Some(serde_json::json!({ FEE_PAYER_KEY: fee_payer.to_string() })),
                })
                .into_iter()
                .collect();
            Ok(proto::SupportedResponse { kinds })
        })
    }
}
