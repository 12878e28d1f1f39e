//! Axum route handlers for the facilitator service.
//!
//! The handlers are a thin JSON shell over the [`SchemeRegistry`]: payment
//! rejections come back as ordinary response bodies with status 200, while
//! infrastructure faults map to 5xx through [`ServiceError`].

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use p402::facilitator::Facilitator;
use p402::proto::{
    SettleRequest, SettleResponse, SupportedResponse, VerifyRequest, VerifyResponse,
};
use p402::scheme::SchemeRegistry;

use crate::error::ServiceError;

/// Shared application state: the scheme registry behind every endpoint.
pub type FacilitatorState = Arc<SchemeRegistry>;

/// `GET /supported` — lists the payment kinds this facilitator accepts.
///
/// # Errors
///
/// Returns 5xx when a registered handler cannot report its capabilities.
pub async fn get_supported(
    State(registry): State<FacilitatorState>,
) -> Result<Json<SupportedResponse>, ServiceError> {
    Ok(Json(registry.supported().await?))
}

/// `POST /verify` — verifies a payment without settling it.
///
/// # Errors
///
/// Returns 5xx on infrastructure faults; rejected payments are 200 with
/// an `Invalid` body.
pub async fn post_verify(
    State(registry): State<FacilitatorState>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ServiceError> {
    Ok(Json(registry.verify(body).await?))
}

/// `POST /settle` — settles a payment, committing its replay record.
///
/// # Errors
///
/// Returns 5xx on infrastructure faults; failed settlements are 200 with
/// an `Error` body.
pub async fn post_settle(
    State(registry): State<FacilitatorState>,
    Json(body): Json<SettleRequest>,
) -> Result<Json<SettleResponse>, ServiceError> {
    Ok(Json(registry.settle(body).await?))
}

/// `GET /healthz` — liveness probe.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Builds the facilitator router.
///
/// Endpoints:
/// - `GET /supported`
/// - `POST /verify`
/// - `POST /settle`
/// - `GET /healthz`
pub fn facilitator_router(state: FacilitatorState) -> axum::Router {
    axum::Router::new()
        .route("/supported", axum::routing::get(get_supported))
        .route("/verify", axum::routing::post(post_verify))
        .route("/settle", axum::routing::post(post_settle))
        .route("/healthz", axum::routing::get(healthz))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use p402::chain::ChainId;
    use p402::facilitator::{BoxFuture, FacilitatorError};
    use p402::proto::{PaymentPayload, PaymentRequirements, SupportedPaymentKind, V2};
    use tower::ServiceExt;

    use super::*;

    struct StubHandler;

    impl Facilitator for StubHandler {
        fn verify(
            &self,
            _request: VerifyRequest,
        ) -> BoxFuture<'_, Result<VerifyResponse, FacilitatorError>> {
            Box::pin(async { Ok(VerifyResponse::valid("0.0.9001")) })
        }

        fn settle(
            &self,
            _request: SettleRequest,
        ) -> BoxFuture<'_, Result<SettleResponse, FacilitatorError>> {
            Box::pin(async {
                Ok(SettleResponse::success(
                    Some("0.0.9001".into()),
                    "0.0.9001@1700000000.0",
                    "hedera:testnet",
                ))
            })
        }

        fn supported(&self) -> BoxFuture<'_, Result<SupportedResponse, FacilitatorError>> {
            Box::pin(async {
                Ok(SupportedResponse {
                    kinds: vec![SupportedPaymentKind {
                        x402_version: 2,
                        scheme: "exact".into(),
                        network: "hedera:testnet".into(),
                        extra: None,
                    }],
                })
            })
        }
    }

    fn app() -> axum::Router {
        let mut registry = SchemeRegistry::new();
        registry.register(
            ChainId::new("hedera", "testnet"),
            "exact",
            Box::new(StubHandler),
        );
        facilitator_router(Arc::new(registry))
    }

    fn verify_body(network: ChainId) -> String {
        let requirements = PaymentRequirements {
            scheme: "exact".into(),
            network,
            asset: "0.0.6001".into(),
            amount: "1000".into(),
            pay_to: "0.0.7001".into(),
            max_timeout_seconds: 300,
            extra: serde_json::json!({}),
        };
        let request = VerifyRequest {
            payment_payload: PaymentPayload {
                x402_version: V2,
                payload: serde_json::json!({}),
                accepted: requirements.clone(),
                resource: None,
            },
            payment_requirements: requirements,
        };
        serde_json::to_string(&request).unwrap()
    }

    async fn json_of(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn verify_round_trips_through_the_registry() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/verify")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(verify_body(ChainId::new("hedera", "testnet"))))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["isValid"], true);
        assert_eq!(body["payer"], "0.0.9001");
    }

    #[tokio::test]
    async fn unregistered_network_is_a_rejection_not_a_fault() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/verify")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(verify_body(ChainId::new("hedera", "mainnet"))))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["isValid"], false);
        assert_eq!(body["invalidReason"], "unsupported_network");
    }

    #[tokio::test]
    async fn supported_lists_registered_kinds() {
        let response = app()
            .oneshot(Request::builder().uri("/supported").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["kinds"][0]["network"], "hedera:testnet");
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_by_the_extractor() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/settle")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let response = app()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["status"], "ok");
    }
}
