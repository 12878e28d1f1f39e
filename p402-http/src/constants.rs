//! HTTP-specific constants for the x402 protocol.

/// Header carrying the client's payment evidence (client to server).
pub const PAYMENT_SIGNATURE_HEADER: &str = "Payment-Signature";

/// Header carrying the 402 payment terms (server to client).
pub const PAYMENT_REQUIRED_HEADER: &str = "Payment-Required";

/// Header carrying the settlement result (server to client).
pub const PAYMENT_RESPONSE_HEADER: &str = "Payment-Response";
