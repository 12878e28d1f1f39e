//! Injected TON chain capabilities.
//!
//! The post-hoc model never broadcasts; it only confirms transfers the
//! client already submitted. [`TonRpc`] is the minimal lookup surface the
//! verifier needs, expressed over a normalized [`TransferView`] so the
//! engine works the same against raw transactions and jetton transfer
//! events.

use p402::chain::ChainId;
use p402::facilitator::BoxFuture;

/// Errors surfaced by a TON RPC backend.
#[derive(Debug, thiserror::Error)]
pub enum TonRpcError {
    /// The backend was unreachable or timed out. Retryable.
    #[error("ton rpc transport error: {0}")]
    Transport(String),

    /// The backend returned a response the client could not interpret.
    #[error("ton rpc returned malformed data: {0}")]
    Malformed(String),
}

/// Jetton metadata attached to a token transfer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JettonTransferInfo {
    /// The jetton master contract address, in any textual encoding.
    pub master: String,
    /// The sub-unit precision the event declares.
    pub decimals: u32,
}

/// Normalized view of one incoming transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferView {
    /// The transaction identifier.
    pub transaction_id: String,
    /// The sending account, when the indexer reports one.
    pub source: Option<String>,
    /// The receiving account, in any textual encoding.
    pub destination: String,
    /// The transferred amount in atomic units (nanotons, or jetton units).
    pub amount: u128,
    /// The transfer comment.
    pub memo: Option<String>,
    /// Ledger time of the transaction, seconds since the Unix epoch.
    pub utime: u64,
    /// Present when this is a jetton transfer rather than a native one.
    pub jetton: Option<JettonTransferInfo>,
}

/// Lookup capabilities the TON exact scheme needs.
pub trait TonRpc: Send + Sync {
    /// The network this backend indexes.
    fn chain_id(&self) -> ChainId;

    /// Fetches a specific transaction by id.
    ///
    /// `Ok(None)` means the id is unknown to the indexer, which is a
    /// retryable condition (the transaction may not be indexed yet).
    fn transaction_by_id(
        &self,
        id: &str,
    ) -> BoxFuture<'_, Result<Option<TransferView>, TonRpcError>>;

    /// Lists recent incoming transfers to an address, newest first.
    fn incoming_transfers(
        &self,
        destination: &str,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<TransferView>, TonRpcError>>;
}

impl<T: TonRpc + ?Sized> TonRpc for std::sync::Arc<T> {
    fn chain_id(&self) -> ChainId {
        (**self).chain_id()
    }

    fn transaction_by_id(
        &self,
        id: &str,
    ) -> BoxFuture<'_, Result<Option<TransferView>, TonRpcError>> {
        (**self).transaction_by_id(id)
    }

    fn incoming_transfers(
        &self,
        destination: &str,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<TransferView>, TonRpcError>> {
        (**self).incoming_transfers(destination, limit)
    }
}
