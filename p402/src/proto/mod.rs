//! Wire format types for x402 payment messages.
//!
//! Defines the JSON structures exchanged between clients, resource servers,
//! and facilitators, plus the closed reason-code taxonomy used to report
//! verification and settlement failures.
//!
//! # Key Types
//!
//! - [`PaymentRequirements`] - payment terms issued by a resource server
//! - [`PaymentPayload`] - transfer evidence constructed by a client
//! - [`PaymentRequired`] - HTTP 402 response body
//! - [`VerifyRequest`] / [`VerifyResponse`] - facilitator verification messages
//! - [`SettleRequest`] / [`SettleResponse`] - facilitator settlement messages
//! - [`SupportedResponse`] - facilitator capability discovery
//! - [`ErrorReason`] - protocol-level reason codes
//!
//! # Wire Format
//!
//! All types serialize to JSON with camelCase field names. The protocol
//! version travels in the `x402Version` field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use serde_with::{VecSkipError, serde_as};

use crate::chain::ChainId;

/// Zero-sized protocol version tag.
///
/// The version number lives in the type, not in a field, so a message type
/// pinned to `Version<2>` can only ever carry a 2 on the wire. Serializes as
/// the bare integer; deserializing any other integer is an error, which makes
/// a payload claiming the wrong protocol version fail at the parse boundary
/// instead of deep inside a verifier.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Version<const N: u8>;

impl<const N: u8> Version<N> {
    /// The numeric value of this protocol version.
    pub const VALUE: u8 = N;
}

impl<const N: u8> Serialize for Version<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(N)
    }
}

impl<'de, const N: u8> Deserialize<'de> for Version<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = u8::deserialize(deserializer)?;
        if v == N {
            Ok(Self)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected version {N}, got {v}"
            )))
        }
    }
}

/// Version marker for the current x402 protocol version.
pub type X402Version2 = Version<2>;

/// Convenience constant for constructing protocol messages.
pub const V2: X402Version2 = Version;

/// Describes the resource being accessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// The URL of the resource.
    pub url: String,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional MIME type of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Payment terms issued by a resource server for a single payment option.
///
/// Created per HTTP request and logically single-use: the resource URL and
/// amount bind it to one request. Any mismatch between this authoritative
/// copy and the payload's echoed `accepted` copy is a hard verification
/// failure.
///
/// # JSON Format
///
/// ```json
/// {
///   "scheme": "exact",
///   "network": "hedera:testnet",
///   "asset": "0.0.6001",
///   "amount": "1000",
///   "payTo": "0.0.7001",
///   "maxTimeoutSeconds": 300,
///   "extra": { "feePayer": "0.0.5001" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme identifier (e.g. `"exact"`).
    pub scheme: String,

    /// Namespaced network identifier (e.g. `"hedera:testnet"`).
    pub network: ChainId,

    /// Asset identifier (token id, jetton master, or the native asset name).
    pub asset: String,

    /// Required amount as a decimal string in the asset's atomic units.
    pub amount: String,

    /// Recipient address.
    pub pay_to: String,

    /// Maximum payment validity window in seconds.
    pub max_timeout_seconds: u64,

    /// Scheme-specific extra data (e.g. the facilitator's fee payer account).
    #[serde(default = "default_empty_object")]
    pub extra: Value,
}

impl PaymentRequirements {
    /// Returns the extra metadata, or `None` if it is null.
    #[must_use]
    pub fn extra(&self) -> Option<&Value> {
        if self.extra.is_null() { None } else { Some(&self.extra) }
    }

    /// Parses the amount field as an atomic-unit integer.
    ///
    /// Returns `None` for non-numeric, signed, or overflowing values.
    #[must_use]
    pub fn atomic_amount(&self) -> Option<u64> {
        self.amount.parse::<u64>().ok()
    }
}

/// HTTP 402 response body listing acceptable payment options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// Protocol version.
    #[serde(default)]
    pub x402_version: X402Version2,

    /// Optional error message describing why a presented payment failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Optional resource information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,

    /// List of accepted payment requirements.
    pub accepts: Vec<PaymentRequirements>,
}

/// Transfer evidence constructed by a client to satisfy a requirement.
///
/// The `payload` field carries scheme-specific evidence — a base64-encoded
/// payer-signed transaction for pre-submitted schemes, or a transaction id
/// plus memo for post-hoc schemes. It must never be trusted without
/// independent verification against the authoritative requirements held by
/// the resource server and facilitator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version.
    #[serde(default)]
    pub x402_version: X402Version2,

    /// Scheme-specific transfer evidence.
    pub payload: Value,

    /// The payment requirements the client believes it is satisfying.
    pub accepted: PaymentRequirements,

    /// Optional resource information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,
}

impl PaymentPayload {
    /// Returns the payment scheme from the accepted requirements.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.accepted.scheme
    }

    /// Returns the network from the accepted requirements.
    #[must_use]
    pub fn network(&self) -> &ChainId {
        &self.accepted.network
    }
}

/// Request to verify a payment before settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// The payment payload to verify.
    pub payment_payload: PaymentPayload,

    /// The authoritative requirements to verify against.
    pub payment_requirements: PaymentRequirements,
}

/// Request to settle a verified payment.
///
/// Structurally identical to [`VerifyRequest`] on the wire, but a distinct
/// type so the compiler can prevent passing a verify request where a settle
/// request is expected. Use `From<VerifyRequest>` to convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    /// The payment payload to settle.
    pub payment_payload: PaymentPayload,

    /// The requirements for settlement.
    pub payment_requirements: PaymentRequirements,
}

impl From<VerifyRequest> for SettleRequest {
    fn from(request: VerifyRequest) -> Self {
        Self {
            payment_payload: request.payment_payload,
            payment_requirements: request.payment_requirements,
        }
    }
}

/// Result returned by a facilitator after verifying a payment payload.
///
/// Verification failure is an ordinary response carrying a stable reason
/// code from the closed taxonomy, never an error — callers can rely on the
/// set of codes staying fixed across releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResponse {
    /// The payload matches the requirements and passes all checks.
    Valid {
        /// The inferred payer address. Best-effort: absent when no unique
        /// debited account could be identified.
        payer: Option<String>,
    },
    /// The payload failed verification.
    Invalid {
        /// Machine-readable reason code.
        reason: String,
        /// Optional human-readable description.
        message: Option<String>,
        /// The payer address, when one could be inferred.
        payer: Option<String>,
    },
}

impl VerifyResponse {
    /// Constructs a successful verification response with a known payer.
    #[must_use]
    pub fn valid(payer: impl Into<String>) -> Self {
        Self::Valid {
            payer: Some(payer.into()),
        }
    }

    /// Constructs a successful verification response without an inferred
    /// payer.
    #[must_use]
    pub const fn valid_without_payer() -> Self {
        Self::Valid { payer: None }
    }

    /// Constructs a failed verification response.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
            message: None,
            payer: None,
        }
    }

    /// Constructs a failed verification response with a message.
    #[must_use]
    pub fn invalid_with_message(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
            message: Some(message.into()),
            payer: None,
        }
    }

    /// Sets the inferred payer on an invalid response.
    #[must_use]
    pub fn with_payer(mut self, payer_address: impl Into<String>) -> Self {
        if let Self::Invalid { payer, .. } = &mut self {
            *payer = Some(payer_address.into());
        }
        self
    }

    /// Returns `true` if the verification succeeded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Returns the reason code of an invalid response.
    #[must_use]
    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason, .. } => Some(reason),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponseWire {
    is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invalid_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invalid_message: Option<String>,
}

impl Serialize for VerifyResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Valid { payer } => VerifyResponseWire {
                is_valid: true,
                payer: payer.clone(),
                invalid_reason: None,
                invalid_message: None,
            },
            Self::Invalid {
                reason,
                message,
                payer,
            } => VerifyResponseWire {
                is_valid: false,
                payer: payer.clone(),
                invalid_reason: Some(reason.clone()),
                invalid_message: message.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VerifyResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = VerifyResponseWire::deserialize(deserializer)?;
        if wire.is_valid {
            Ok(Self::Valid { payer: wire.payer })
        } else {
            let reason = wire
                .invalid_reason
                .ok_or_else(|| serde::de::Error::missing_field("invalidReason"))?;
            Ok(Self::Invalid {
                reason,
                message: wire.invalid_message,
                payer: wire.payer,
            })
        }
    }
}

/// Result returned by a facilitator after attempting settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleResponse {
    /// Settlement succeeded.
    Success {
        /// The address that paid, when one was inferred.
        payer: Option<String>,
        /// The on-chain transaction identifier.
        transaction: String,
        /// The network where settlement occurred.
        network: String,
    },
    /// Settlement failed.
    Error {
        /// Machine-readable reason code.
        reason: String,
        /// Optional human-readable description.
        message: Option<String>,
        /// The network where settlement was attempted.
        network: String,
    },
}

impl SettleResponse {
    /// Constructs a successful settlement response.
    #[must_use]
    pub fn success(
        payer: Option<String>,
        transaction: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self::Success {
            payer,
            transaction: transaction.into(),
            network: network.into(),
        }
    }

    /// Returns `true` if the settlement succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Constructs a failed settlement response.
    #[must_use]
    pub fn error(reason: impl Into<String>, network: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
            message: None,
            network: network.into(),
        }
    }

    /// Constructs a failed settlement response with a message.
    #[must_use]
    pub fn error_with_message(
        reason: impl Into<String>,
        message: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self::Error {
            reason: reason.into(),
            message: Some(message.into()),
            network: network.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettleResponseWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction: Option<String>,
    network: String,
}

impl Serialize for SettleResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Success {
                payer,
                transaction,
                network,
            } => SettleResponseWire {
                success: true,
                error_reason: None,
                error_message: None,
                payer: payer.clone(),
                transaction: Some(transaction.clone()),
                network: network.clone(),
            },
            Self::Error {
                reason,
                message,
                network,
            } => SettleResponseWire {
                success: false,
                error_reason: Some(reason.clone()),
                error_message: message.clone(),
                payer: None,
                transaction: None,
                network: network.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SettleResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = SettleResponseWire::deserialize(deserializer)?;
        if wire.success {
            let transaction = wire
                .transaction
                .ok_or_else(|| serde::de::Error::missing_field("transaction"))?;
            Ok(Self::Success {
                payer: wire.payer,
                transaction,
                network: wire.network,
            })
        } else {
            let reason = wire
                .error_reason
                .ok_or_else(|| serde::de::Error::missing_field("errorReason"))?;
            Ok(Self::Error {
                reason,
                message: wire.error_message,
                network: wire.network,
            })
        }
    }
}

/// Describes a payment method supported by a facilitator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedPaymentKind {
    /// The x402 protocol version.
    pub x402_version: u8,
    /// The payment scheme identifier (e.g. `"exact"`).
    pub scheme: String,
    /// The network identifier.
    pub network: String,
    /// Optional scheme-specific extra data (e.g. the managed fee payer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Response from a facilitator's `/supported` endpoint.
///
/// Tells clients and resource servers which payment methods the facilitator
/// can handle, including the fee payer account for schemes that need one.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    /// List of supported payment kinds.
    #[serde_as(as = "VecSkipError<_>")]
    pub kinds: Vec<SupportedPaymentKind>,
}

impl SupportedResponse {
    /// Finds the first supported kind matching the given scheme and network.
    #[must_use]
    pub fn kind_for(&self, scheme: &str, network: &ChainId) -> Option<&SupportedPaymentKind> {
        let network = network.to_string();
        self.kinds
            .iter()
            .find(|kind| kind.scheme == scheme && kind.network == network)
    }
}

/// Protocol-level reason codes shared by all schemes.
///
/// Scheme crates extend this taxonomy with their own payload-specific codes
/// (e.g. `invalid_exact_hedera_payload_amount_mismatch`); the strings here
/// cover the failures the generic dispatch layer can produce on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorReason {
    /// The payment scheme is not registered with this facilitator.
    UnsupportedScheme,
    /// The network is not registered with this facilitator.
    UnsupportedNetwork,
    /// The payload's network does not match the requirements.
    NetworkMismatch,
    /// The echoed `accepted` copy differs from the authoritative requirements.
    AcceptedPaymentRequirementsMismatch,
    /// The requirements name a malformed asset identifier.
    InvalidAsset,
    /// The requirements amount is not a positive atomic-unit integer.
    InvalidAmount,
    /// The requirements recipient is syntactically invalid.
    InvalidPayTo,
    /// The asserted fee payer is not one of the facilitator's managed signers.
    FeePayerNotManagedByFacilitator,
    /// The transaction id was already consumed (replay).
    InvalidTransactionState,
    /// Settlement-time re-verification failed.
    VerificationFailed,
    /// Broadcast or transport failure during settlement.
    TransactionFailed,
    /// An unexpected internal fault.
    UnexpectedError,
}

impl ErrorReason {
    /// Returns the stable wire string for this reason code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::UnsupportedNetwork => "unsupported_network",
            Self::NetworkMismatch => "network_mismatch",
            Self::AcceptedPaymentRequirementsMismatch => "accepted_payment_requirements_mismatch",
            Self::InvalidAsset => "invalid_asset",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidPayTo => "invalid_pay_to",
            Self::FeePayerNotManagedByFacilitator => "fee_payer_not_managed_by_facilitator",
            Self::InvalidTransactionState => "invalid_transaction_state",
            Self::VerificationFailed => "verification_failed",
            Self::TransactionFailed => "transaction_failed",
            Self::UnexpectedError => "unexpected_error",
        }
    }
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
