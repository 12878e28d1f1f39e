//! Core trait for payment verification and settlement.
//!
//! A [`Facilitator`] is the trust boundary that holds signing keys or RPC
//! credentials for one or more networks. Scheme crates implement it per
//! chain family; [`crate::scheme::SchemeRegistry`] implements it as a
//! dispatcher over registered handlers.

use std::future::Future;
use std::pin::Pin;

use crate::proto;

/// A boxed, sendable future, used for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors a facilitator can surface to its caller.
///
/// Verification and settlement *failures* are not errors — they travel as
/// `Invalid`/`Error` responses with stable reason codes. This type covers
/// the faults that make producing a response impossible at all: transport
/// breakage talking to a remote facilitator, or an unreachable replay store.
/// The HTTP layer maps these to 5xx, never 402.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FacilitatorError {
    /// Transport-level failure reaching a remote facilitator.
    #[error("facilitator transport error: {0}")]
    Transport(String),

    /// The replay store could not be consulted or updated.
    #[error("replay store unavailable: {0}")]
    ReplayStore(String),

    /// An unexpected internal fault.
    #[error("internal facilitator error: {0}")]
    Internal(String),
}

/// Verifies and settles payments for one or more `(scheme, network)` pairs.
///
/// Implementations must be side-effect free in [`Facilitator::verify`] and
/// single-effect in [`Facilitator::settle`] (at most one broadcast per
/// payload), so both are safe to run concurrently across unrelated requests.
pub trait Facilitator: Send + Sync {
    /// Verifies a payment payload against its authoritative requirements.
    ///
    /// Returns `Ok` with an `Invalid` response for every ordinary
    /// verification failure; `Err` only for internal faults.
    fn verify(
        &self,
        request: proto::VerifyRequest,
    ) -> BoxFuture<'_, Result<proto::VerifyResponse, FacilitatorError>>;

    /// Settles a verified payment.
    ///
    /// Returns `Ok` with an `Error` response for every ordinary settlement
    /// failure; `Err` only for internal faults.
    fn settle(
        &self,
        request: proto::SettleRequest,
    ) -> BoxFuture<'_, Result<proto::SettleResponse, FacilitatorError>>;

    /// Reports the payment kinds this facilitator supports.
    fn supported(&self) -> BoxFuture<'_, Result<proto::SupportedResponse, FacilitatorError>>;
}

impl<T: Facilitator + ?Sized> Facilitator for std::sync::Arc<T> {
    fn verify(
        &self,
        request: proto::VerifyRequest,
    ) -> BoxFuture<'_, Result<proto::VerifyResponse, FacilitatorError>> {
        (**self).verify(request)
    }

    fn settle(
        &self,
        request: proto::SettleRequest,
    ) -> BoxFuture<'_, Result<proto::SettleResponse, FacilitatorError>> {
        (**self).settle(request)
    }

    fn supported(&self) -> BoxFuture<'_, Result<proto::SupportedResponse, FacilitatorError>> {
        (**self).supported()
    }
}
