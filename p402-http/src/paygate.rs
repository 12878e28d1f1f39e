//! Core payment gate driving the 402 challenge-response exchange.
//!
//! The [`Paygate`] handles the full lifecycle on the resource server:
//! extracting the `Payment-Signature` header, matching the echoed terms
//! against the route's accepted options, verifying with the facilitator,
//! calling the protected service, settling, and emitting 402 challenges
//! when any step fails.
//!
//! Payment failures always map to 402 responses; 5xx is reserved for
//! internal faults such as the facilitator being unreachable.

use std::convert::Infallible;
use std::sync::Arc;

use axum_core::body::Body;
use axum_core::extract::Request;
use axum_core::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderValue, StatusCode};
use p402::facilitator::Facilitator;
use p402::proto::{
    PaymentPayload, PaymentRequired, PaymentRequirements, ResourceInfo, SettleResponse, V2,
    VerifyRequest, VerifyResponse,
};
use serde_json::json;
use tower::Service;
use url::Url;

use crate::constants::{PAYMENT_REQUIRED_HEADER, PAYMENT_RESPONSE_HEADER, PAYMENT_SIGNATURE_HEADER};
use crate::headers::{encode_payment_required, encode_payment_response};

/// The `extra` key carrying a facilitator-managed fee payer.
const FEE_PAYER_KEY: &str = "feePayer";

/// Why a presented payment was rejected before reaching the facilitator,
/// or by it.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The payment evidence header is missing.
    #[error("{0} header is required")]
    PaymentHeaderRequired(&'static str),
    /// The header is present but not decodable base64 JSON.
    #[error("invalid or malformed payment header")]
    InvalidPaymentHeader,
    /// The echoed terms match none of the route's accepted options.
    #[error("unable to find matching payment requirements")]
    NoPaymentMatching,
    /// The facilitator rejected the payment.
    #[error("verification failed: {0}")]
    VerificationFailed(String),
}

/// Everything that can interrupt the payment flow.
#[derive(Debug, thiserror::Error)]
pub enum PaygateError {
    /// The payment was rejected. Maps to 402.
    #[error(transparent)]
    Verification(#[from] VerificationError),
    /// Settlement was rejected. Maps to 402.
    #[error("settlement failed: {0}")]
    Settlement(String),
    /// An internal fault unrelated to the payment itself. Maps to 5xx.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Describes the protected resource for 402 challenge bodies.
#[derive(Debug, Clone, Default)]
pub struct ResourceInfoBuilder {
    /// Human-readable description of what the payment buys.
    pub description: Option<String>,
    /// MIME type of the protected resource.
    pub mime_type: Option<String>,
    /// Explicit resource URL; derived from the request when absent.
    pub url: Option<String>,
}

impl ResourceInfoBuilder {
    /// Resolves the resource info, deriving the URL from the request's
    /// `Host` header and URI when no explicit URL is configured.
    #[must_use]
    #[allow(clippy::unwrap_used)] // the literal fallback URL always parses
    pub fn as_resource_info(&self, base_url: Option<&Url>, req: &Request) -> ResourceInfo {
        let url = self.url.clone().unwrap_or_else(|| {
            let mut url = base_url.cloned().unwrap_or_else(|| {
                let host = req
                    .headers()
                    .get(http::header::HOST)
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or("localhost");
                Url::parse(&format!("http://{host}"))
                    .unwrap_or_else(|_| Url::parse("http://localhost").unwrap())
            });
            url.set_path(req.uri().path());
            url.set_query(req.uri().query());
            url.to_string()
        });
        ResourceInfo {
            url,
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Payment gate enforcing x402 payment on a wrapped service.
#[allow(missing_debug_implementations)]
pub struct Paygate<F> {
    /// The facilitator used for verification and settlement.
    pub facilitator: F,
    /// Settle before calling the inner service instead of after.
    pub settle_before_execution: bool,
    /// Accepted payment options for this route.
    pub accepts: Arc<Vec<PaymentRequirements>>,
    /// The protected resource, as advertised in challenges.
    pub resource: ResourceInfo,
}

impl<F> Paygate<F>
where
    F: Facilitator + Sync,
{
    /// Handles a request, enforcing payment.
    ///
    /// Payment failures become 402 responses, internal faults 5xx; the
    /// method itself never fails.
    pub async fn handle_request<S>(self, inner: S, req: Request) -> Result<Response, Infallible>
    where
        S: Service<Request, Response = Response, Error = Infallible> + Send,
        S::Future: Send,
    {
        match self.handle_request_fallible(inner, req).await {
            Ok(response) => Ok(response),
            Err(err) => Ok(self.error_into_response(&err)),
        }
    }

    /// Fills in facilitator-managed fields the route cannot know, currently
    /// the fee payer account for schemes that require one.
    pub async fn enrich_accepts(&mut self) {
        let Ok(capabilities) = self.facilitator.supported().await else {
            return;
        };
        let accepts = (*self.accepts)
            .clone()
            .into_iter()
            .map(|mut requirements| {
                let missing_fee_payer = requirements
                    .extra()
                    .and_then(|extra| extra.get(FEE_PAYER_KEY))
                    .is_none();
                if missing_fee_payer {
                    if let Some(fee_payer) = capabilities
                        .kind_for(&requirements.scheme, &requirements.network)
                        .and_then(|kind| kind.extra.as_ref())
                        .and_then(|extra| extra.get(FEE_PAYER_KEY))
                    {
                        if !requirements.extra.is_object() {
                            requirements.extra = json!({});
                        }
                        if let Some(object) = requirements.extra.as_object_mut() {
                            object.insert(FEE_PAYER_KEY.to_owned(), fee_payer.clone());
                        }
                    }
                }
                requirements
            })
            .collect();
        self.accepts = Arc::new(accepts);
    }

    /// The fallible payment flow.
    ///
    /// # Errors
    ///
    /// Returns [`PaygateError`] when payment processing fails.
    pub async fn handle_request_fallible<S>(
        &self,
        mut inner: S,
        req: Request,
    ) -> Result<Response, PaygateError>
    where
        S: Service<Request, Response = Response, Error = Infallible> + Send,
        S::Future: Send,
    {
        let header = extract_payment_header(req.headers()).ok_or(
            VerificationError::PaymentHeaderRequired(PAYMENT_SIGNATURE_HEADER),
        )?;
        let payment_payload =
            decode_payment_header(header).ok_or(VerificationError::InvalidPaymentHeader)?;

        let verify_request = self.make_verify_request(payment_payload)?;

        if self.settle_before_execution {
            tracing::debug!("settling payment before request execution");
            let settlement = self
                .facilitator
                .settle(verify_request.into())
                .await
                .map_err(|e| PaygateError::Internal(e.to_string()))?;
            let header_value = settlement_to_header(&settlement)?;

            let Ok(response) = inner.call(req).await;
            let mut response = response;
            response
                .headers_mut()
                .insert(PAYMENT_RESPONSE_HEADER, header_value);
            Ok(response)
        } else {
            let verify_response = self
                .facilitator
                .verify(verify_request.clone())
                .await
                .map_err(|e| PaygateError::Internal(e.to_string()))?;
            validate_verify_response(&verify_response)?;

            let Ok(response) = inner.call(req).await;

            // The origin refused; the payment stays uncommitted.
            if response.status().is_client_error() || response.status().is_server_error() {
                return Ok(response);
            }

            let settlement = self
                .facilitator
                .settle(verify_request.into())
                .await
                .map_err(|e| PaygateError::Internal(e.to_string()))?;
            let header_value = settlement_to_header(&settlement)?;

            let mut response = response;
            response
                .headers_mut()
                .insert(PAYMENT_RESPONSE_HEADER, header_value);
            Ok(response)
        }
    }

    /// Selects the accepted option the payload claims to satisfy.
    fn make_verify_request(
        &self,
        payment_payload: PaymentPayload,
    ) -> Result<VerifyRequest, VerificationError> {
        let selected = self
            .accepts
            .iter()
            .find(|requirements| **requirements == payment_payload.accepted)
            .ok_or(VerificationError::NoPaymentMatching)?;
        Ok(VerifyRequest {
            payment_requirements: selected.clone(),
            payment_payload,
        })
    }

    /// Builds the 402 (or 5xx) response for a failed payment flow.
    fn error_into_response(&self, err: &PaygateError) -> Response {
        let error = match err {
            PaygateError::Verification(VerificationError::PaymentHeaderRequired(_)) => None,
            PaygateError::Verification(e) => Some(e.to_string()),
            PaygateError::Settlement(detail) => Some(format!("settlement failed: {detail}")),
            PaygateError::Internal(detail) => {
                tracing::error!(error = %detail, "payment gate internal fault");
                return internal_error_response(detail);
            }
        };
        payment_required_response(error, &self.accepts, &self.resource)
    }
}

/// Builds a 402 response carrying the challenge both as a JSON body and
/// base64-encoded in the `Payment-Required` header.
pub(crate) fn payment_required_response(
    error: Option<String>,
    accepts: &[PaymentRequirements],
    resource: &ResourceInfo,
) -> Response {
    let required = PaymentRequired {
        x402_version: V2,
        error,
        resource: Some(resource.clone()),
        accepts: accepts.to_vec(),
    };
    let builder = Response::builder()
        .status(StatusCode::PAYMENT_REQUIRED)
        .header(http::header::CONTENT_TYPE, "application/json");
    let builder = match encode_payment_required(&required)
        .ok()
        .and_then(|encoded| HeaderValue::from_str(&encoded).ok())
    {
        Some(value) => builder.header(PAYMENT_REQUIRED_HEADER, value),
        None => builder,
    };
    let body = serde_json::to_vec(&required).unwrap_or_default();
    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::PAYMENT_REQUIRED.into_response())
}

fn internal_error_response(detail: &str) -> Response {
    let body = json!({ "error": "internal error", "details": detail }).to_string();
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn extract_payment_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(PAYMENT_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
}

fn decode_payment_header(header_value: &str) -> Option<PaymentPayload> {
    crate::headers::decode_payment_signature(header_value).ok()
}

/// Converts a settlement outcome into the `Payment-Response` header value,
/// rejecting failed settlements.
fn settlement_to_header(settlement: &SettleResponse) -> Result<HeaderValue, PaygateError> {
    if let SettleResponse::Error {
        reason, message, ..
    } = settlement
    {
        let detail = message.as_deref().unwrap_or(reason);
        return Err(PaygateError::Settlement(detail.to_owned()));
    }
    let encoded = encode_payment_response(settlement)
        .map_err(|e| PaygateError::Internal(e.to_string()))?;
    HeaderValue::from_str(&encoded).map_err(|e| PaygateError::Internal(e.to_string()))
}

fn validate_verify_response(response: &VerifyResponse) -> Result<(), VerificationError> {
    match response {
        VerifyResponse::Valid { .. } => Ok(()),
        VerifyResponse::Invalid { reason, .. } => {
            Err(VerificationError::VerificationFailed(reason.clone()))
        }
    }
}
