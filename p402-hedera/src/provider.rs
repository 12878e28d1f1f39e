//! Injected Hedera chain capabilities.
//!
//! The verifier and settlement engine never talk to a Hedera node
//! directly; everything network-shaped goes through [`HederaProvider`] so
//! the engine can run against mocks. A production implementation wraps a
//! Hedera SDK client holding the managed fee-payer keys.

use p402::chain::ChainId;
use p402::facilitator::BoxFuture;

use crate::account::AccountId;

/// Errors surfaced by a chain provider.
#[derive(Debug, thiserror::Error)]
pub enum HederaProviderError {
    /// The network rejected or never acknowledged a broadcast.
    #[error("broadcast failed: {0}")]
    Broadcast(String),

    /// A query to the network failed.
    #[error("rpc failure: {0}")]
    Rpc(String),
}

/// Outcome of resolving a destination account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountResolution {
    /// The account exists as a registered, non-alias account.
    Registered,
    /// The account is an alias (derived/auto-creatable) account.
    Alias,
    /// No such account is known to the network.
    NotFound,
    /// This provider has no account-resolution capability. Destination
    /// policy degrades to format-only validation.
    Unsupported,
}

/// Receipt returned by a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReceipt {
    /// The transaction id the network acknowledged, when it reported one.
    pub transaction_id: Option<String>,
}

/// Chain capabilities the Hedera exact scheme needs.
pub trait HederaProvider: Send + Sync {
    /// The network this provider talks to.
    fn chain_id(&self) -> ChainId;

    /// The fee-payer accounts this provider holds signing keys for.
    fn managed_signers(&self) -> Vec<AccountId>;

    /// Resolves whether an account exists as a registered (non-alias)
    /// account.
    ///
    /// The default implementation reports the capability as absent.
    fn resolve_account(
        &self,
        account: AccountId,
    ) -> BoxFuture<'_, Result<AccountResolution, HederaProviderError>> {
        let _ = account;
        Box::pin(async { Ok(AccountResolution::Unsupported) })
    }

    /// Countersigns the transaction with the given fee payer's key and
    /// broadcasts it.
    fn sign_and_broadcast(
        &self,
        transaction_bytes: Vec<u8>,
        fee_payer: AccountId,
    ) -> BoxFuture<'_, Result<BroadcastReceipt, HederaProviderError>>;
}

impl<T: HederaProvider + ?Sized> HederaProvider for std::sync::Arc<T> {
    fn chain_id(&self) -> ChainId {
        (**self).chain_id()
    }

    fn managed_signers(&self) -> Vec<AccountId> {
        (**self).managed_signers()
    }

    fn resolve_account(
        &self,
        account: AccountId,
    ) -> BoxFuture<'_, Result<AccountResolution, HederaProviderError>> {
        (**self).resolve_account(account)
    }

    fn sign_and_broadcast(
        &self,
        transaction_bytes: Vec<u8>,
        fee_payer: AccountId,
    ) -> BoxFuture<'_, Result<BroadcastReceipt, HederaProviderError>> {
        (**self).sign_and_broadcast(transaction_bytes, fee_payer)
    }
}
