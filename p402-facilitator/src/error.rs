//! Error types for the facilitator service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use p402::facilitator::FacilitatorError;

/// Faults surfaced by the HTTP handlers.
///
/// Payment rejections are not errors; they travel as ordinary
/// `VerifyResponse::Invalid` / `SettleResponse::Error` bodies with status
/// 200. This type covers infrastructure faults only.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A scheme handler failed on infrastructure, not on the payment.
    #[error(transparent)]
    Facilitator(#[from] FacilitatorError),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let Self::Facilitator(inner) = &self;
        let status = match inner {
            FacilitatorError::Transport(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self, "request failed");
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
