//! Header codecs for x402 protocol messages.
//!
//! All three protocol headers carry base64-encoded JSON: the payment terms
//! in `Payment-Required`, the client's evidence in `Payment-Signature`, and
//! the settlement result in `Payment-Response`.

use p402::encoding::Base64Bytes;
use p402::proto::{PaymentPayload, PaymentRequired, SettleResponse};

use crate::error::HttpError;

/// Encodes a [`PaymentPayload`] for the `Payment-Signature` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_payment_signature(payload: &PaymentPayload) -> Result<String, HttpError> {
    let json = serde_json::to_vec(payload)?;
    Ok(Base64Bytes::encode(json).to_string())
}

/// Decodes a `Payment-Signature` header value into a [`PaymentPayload`].
///
/// # Errors
///
/// Returns [`HttpError`] on base64 or JSON decode failure.
pub fn decode_payment_signature(header_value: &str) -> Result<PaymentPayload, HttpError> {
    let bytes = Base64Bytes::from(header_value.trim().as_bytes()).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encodes a [`PaymentRequired`] body for the `Payment-Required` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_payment_required(required: &PaymentRequired) -> Result<String, HttpError> {
    let json = serde_json::to_vec(required)?;
    Ok(Base64Bytes::encode(json).to_string())
}

/// Decodes a `Payment-Required` header value.
///
/// # Errors
///
/// Returns [`HttpError`] on base64 or JSON decode failure.
pub fn decode_payment_required(header_value: &str) -> Result<PaymentRequired, HttpError> {
    let bytes = Base64Bytes::from(header_value.trim().as_bytes()).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encodes a [`SettleResponse`] for the `Payment-Response` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_payment_response(response: &SettleResponse) -> Result<String, HttpError> {
    let json = serde_json::to_vec(response)?;
    Ok(Base64Bytes::encode(json).to_string())
}

/// Decodes a `Payment-Response` header value into a [`SettleResponse`].
///
/// # Errors
///
/// Returns [`HttpError`] on base64 or JSON decode failure.
pub fn decode_payment_response(header_value: &str) -> Result<SettleResponse, HttpError> {
    let bytes = Base64Bytes::from(header_value.trim().as_bytes()).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}
