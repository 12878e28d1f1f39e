//! Minimal Hedera protobuf message declarations.
//!
//! Hand-declared `prost` messages covering the subset of the Hedera
//! Services protocol the transfer inspector needs: the transaction
//! envelope layers and the `CryptoTransfer` operation. Field tags match
//! the published `hashgraph/hedera-protobufs` definitions.
//!
//! Operations other than `CryptoTransfer` are deliberately not modeled as
//! typed fields; [`crate::inspect`] detects them with a wire-level field
//! scan of the body bytes, so an unknown future operation can never slip
//! past as "no operations present".

/// Wrapper carrying one or more serialized transactions.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionList {
    /// The transactions in the list.
    #[prost(message, repeated, tag = "1")]
    pub transaction_list: Vec<Transaction>,
}

/// A transaction envelope.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Transaction {
    /// Serialized [`SignedTransaction`] bytes.
    #[prost(bytes = "vec", tag = "5")]
    pub signed_transaction_bytes: Vec<u8>,
}

/// A signed transaction: body bytes plus the signature map.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SignedTransaction {
    /// Serialized [`TransactionBody`] bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,

    /// Serialized `SignatureMap` bytes. Opaque to the inspector.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub sig_map: Option<Vec<u8>>,
}

/// The common transaction body fields plus the `CryptoTransfer` operation.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionBody {
    /// The transaction id, which names the paying account.
    #[prost(message, optional, tag = "1")]
    pub transaction_id: Option<TransactionId>,

    /// The node account the transaction is submitted to.
    #[prost(message, optional, tag = "2")]
    pub node_account_id: Option<AccountId>,

    /// The maximum fee the payer is willing to pay, in tinybars.
    #[prost(uint64, tag = "3")]
    pub transaction_fee: u64,

    /// How long the transaction stays valid after its start instant.
    #[prost(message, optional, tag = "4")]
    pub transaction_valid_duration: Option<Duration>,

    /// The transaction memo.
    #[prost(string, tag = "6")]
    pub memo: String,

    /// The `CryptoTransfer` operation, when this body carries one.
    #[prost(message, optional, tag = "14")]
    pub crypto_transfer: Option<CryptoTransferTransactionBody>,
}

/// A transaction id: the paying account plus its chosen valid-start instant.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionId {
    /// The instant the transaction becomes valid.
    #[prost(message, optional, tag = "1")]
    pub transaction_valid_start: Option<Timestamp>,

    /// The account that pays the transaction fee (payer-of-record).
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
}

/// An instant in consensus time.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch.
    #[prost(int64, tag = "1")]
    pub seconds: i64,

    /// Sub-second nanoseconds.
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

/// A length of time in whole seconds.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Duration {
    /// The number of seconds.
    #[prost(int64, tag = "1")]
    pub seconds: i64,
}

/// The `CryptoTransfer` operation: hbar transfers plus token transfers.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CryptoTransferTransactionBody {
    /// Hbar balance adjustments.
    #[prost(message, optional, tag = "1")]
    pub transfers: Option<TransferList>,

    /// Per-token balance adjustments.
    #[prost(message, repeated, tag = "2")]
    pub token_transfers: Vec<TokenTransferList>,
}

/// A list of signed hbar balance adjustments.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransferList {
    /// The individual adjustments. They must sum to zero.
    #[prost(message, repeated, tag = "1")]
    pub account_amounts: Vec<AccountAmount>,
}

/// Balance adjustments for a single token.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TokenTransferList {
    /// The token being adjusted.
    #[prost(message, optional, tag = "1")]
    pub token: Option<TokenId>,

    /// Fungible adjustments for this token.
    #[prost(message, repeated, tag = "2")]
    pub transfers: Vec<AccountAmount>,

    /// NFT ownership changes. Opaque to the inspector; presence alone makes
    /// the transaction more than a fungible transfer.
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub nft_transfers: Vec<Vec<u8>>,
}

/// A single signed balance adjustment.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct AccountAmount {
    /// The account whose balance changes.
    #[prost(message, optional, tag = "1")]
    pub account_id: Option<AccountId>,

    /// The signed amount in the asset's atomic units. Negative debits,
    /// positive credits.
    #[prost(sint64, tag = "2")]
    pub amount: i64,

    /// Whether this adjustment spends from an allowance.
    #[prost(bool, tag = "3")]
    pub is_approval: bool,
}

/// A Hedera account reference: numbered or alias-addressed.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct AccountId {
    /// The shard number.
    #[prost(int64, tag = "1")]
    pub shard_num: i64,

    /// The realm number.
    #[prost(int64, tag = "2")]
    pub realm_num: i64,

    /// The account number, for numbered accounts.
    #[prost(int64, optional, tag = "3")]
    pub account_num: Option<i64>,

    /// The key or EVM-address alias, for alias-addressed accounts.
    #[prost(bytes = "vec", optional, tag = "4")]
    pub alias: Option<Vec<u8>>,
}

/// A Hedera token id.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TokenId {
    /// The shard number.
    #[prost(int64, tag = "1")]
    pub shard_num: i64,

    /// The realm number.
    #[prost(int64, tag = "2")]
    pub realm_num: i64,

    /// The token number.
    #[prost(int64, tag = "3")]
    pub token_num: i64,
}
