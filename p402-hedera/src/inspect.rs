//! Transfer inspector: decodes transaction bytes into normalized balance
//! deltas.
//!
//! Pure, no I/O. The inspector peels the envelope layers
//! (`TransactionList` → `Transaction` → `SignedTransaction` →
//! `TransactionBody`), extracts the `CryptoTransfer` deltas, and records
//! whether the body carries any other operation.
//!
//! Operation detection does not rely on typed decoding: `prost` silently
//! skips unknown fields, so a typed-only decode would miss operations this
//! crate does not model. Instead the raw body bytes are walked at the wire
//! level and every present field tag is examined.

use prost::Message;

use crate::account::{AccountId, TokenId};
use crate::pb;

/// Tag of the `cryptoTransfer` operation in `TransactionBody`.
const CRYPTO_TRANSFER_TAG: u64 = 14;

/// Lowest `TransactionBody` tag that names an operation. Tags 1-6 are the
/// common header fields (id, node, fee, duration, memo).
const FIRST_OPERATION_TAG: u64 = 7;

/// One party to a balance adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferParty {
    /// A numbered account.
    Account(AccountId),
    /// An alias-addressed account (key or EVM address bytes).
    Alias(Vec<u8>),
}

impl TransferParty {
    /// Returns the numbered account, if this party has one.
    #[must_use]
    pub fn account(&self) -> Option<AccountId> {
        match self {
            Self::Account(id) => Some(*id),
            Self::Alias(_) => None,
        }
    }
}

/// A single signed balance adjustment for one party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    /// The account being adjusted.
    pub party: TransferParty,
    /// Signed amount in atomic units. Negative debits, positive credits.
    pub amount: i64,
}

/// Normalized view of a decoded transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedTransfer {
    /// Canonical transaction id string: `payer@seconds.nanos`.
    pub transaction_id: String,
    /// The account that pays the network fee (from the transaction id).
    pub payer_of_record: AccountId,
    /// The valid-start instant as `(seconds, nanos)`.
    pub valid_start: (i64, i32),
    /// The transaction memo.
    pub memo: String,
    /// `true` if the body carries any operation other than `CryptoTransfer`,
    /// or NFT ownership changes inside one.
    pub has_non_transfer_ops: bool,
    /// Hbar balance adjustments.
    pub hbar_deltas: Vec<Delta>,
    /// Per-token balance adjustments.
    pub token_deltas: Vec<(TokenId, Vec<Delta>)>,
}

/// Errors produced while decoding transaction bytes.
///
/// All of these collapse to the same "could not be decoded" verification
/// reason; the variants exist for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    /// The bytes are not a valid protobuf message.
    #[error("malformed transaction bytes: {0}")]
    Malformed(#[from] prost::DecodeError),

    /// The envelope contained no signed transaction bytes.
    #[error("empty transaction envelope")]
    EmptyEnvelope,

    /// The transaction body field walk hit an invalid wire-format element.
    #[error("malformed transaction body")]
    MalformedBody,

    /// The body has no transaction id or the id names no numbered payer.
    #[error("transaction id missing or alias-addressed")]
    MissingTransactionId,

    /// The body carries no `CryptoTransfer` operation.
    #[error("not a crypto transfer transaction")]
    NotCryptoTransfer,

    /// A transfer entry references a negative or absent entity number.
    #[error("invalid entity id in transfer list")]
    InvalidEntityId,
}

/// Decodes raw transaction bytes into an [`InspectedTransfer`].
///
/// Accepts any of the envelope forms a client may produce: a
/// `TransactionList`, a bare `Transaction`, or naked `SignedTransaction`
/// bytes.
///
/// # Errors
///
/// Returns [`InspectError`] if the bytes are not a well-formed
/// single-operation `CryptoTransfer` transaction.
pub fn inspect_transaction(bytes: &[u8]) -> Result<InspectedTransfer, InspectError> {
    let body_bytes = unwrap_envelope(bytes)?;
    let present_tags = scan_field_tags(&body_bytes)?;

    let body = pb::TransactionBody::decode(body_bytes.as_slice())?;
    let transfer = body
        .crypto_transfer
        .as_ref()
        .ok_or(InspectError::NotCryptoTransfer)?;

    let mut has_non_transfer_ops = present_tags
        .iter()
        .any(|&tag| tag >= FIRST_OPERATION_TAG && tag != CRYPTO_TRANSFER_TAG);
    if transfer.token_transfers.iter().any(|t| !t.nft_transfers.is_empty()) {
        has_non_transfer_ops = true;
    }

    let transaction_id = body
        .transaction_id
        .as_ref()
        .ok_or(InspectError::MissingTransactionId)?;
    let payer_of_record = transaction_id
        .account_id
        .as_ref()
        .and_then(account_of)
        .ok_or(InspectError::MissingTransactionId)?;
    let valid_start = transaction_id
        .transaction_valid_start
        .as_ref()
        .map_or((0, 0), |ts| (ts.seconds, ts.nanos));

    let hbar_deltas = transfer
        .transfers
        .as_ref()
        .map(|list| deltas_of(&list.account_amounts))
        .transpose()?
        .unwrap_or_default();

    let mut token_deltas = Vec::with_capacity(transfer.token_transfers.len());
    for list in &transfer.token_transfers {
        let token = list.token.as_ref().and_then(token_of).ok_or(InspectError::InvalidEntityId)?;
        token_deltas.push((token, deltas_of(&list.transfers)?));
    }

    Ok(InspectedTransfer {
        transaction_id: format!(
            "{payer_of_record}@{}.{}",
            valid_start.0, valid_start.1
        ),
        payer_of_record,
        valid_start,
        memo: body.memo,
        has_non_transfer_ops,
        hbar_deltas,
        token_deltas,
    })
}

/// Peels the envelope layers down to `TransactionBody` bytes.
fn unwrap_envelope(bytes: &[u8]) -> Result<Vec<u8>, InspectError> {
    let signed_bytes = if let Ok(list) = pb::TransactionList::decode(bytes) {
        match list.transaction_list.into_iter().next() {
            Some(tx) if !tx.signed_transaction_bytes.is_empty() => tx.signed_transaction_bytes,
            _ => fallback_signed_bytes(bytes)?,
        }
    } else {
        fallback_signed_bytes(bytes)?
    };
    let signed = pb::SignedTransaction::decode(signed_bytes.as_slice())?;
    if signed.body_bytes.is_empty() {
        return Err(InspectError::EmptyEnvelope);
    }
    Ok(signed.body_bytes)
}

fn fallback_signed_bytes(bytes: &[u8]) -> Result<Vec<u8>, InspectError> {
    let tx = pb::Transaction::decode(bytes)?;
    if !tx.signed_transaction_bytes.is_empty() {
        return Ok(tx.signed_transaction_bytes);
    }
    // Naked SignedTransaction bytes.
    Ok(bytes.to_vec())
}

/// Walks the body bytes at the wire level and returns every field tag
/// present, regardless of whether the typed decoder models it.
fn scan_field_tags(mut bytes: &[u8]) -> Result<Vec<u64>, InspectError> {
    let mut tags = Vec::new();
    while !bytes.is_empty() {
        let (key, rest) = read_varint(bytes)?;
        let tag = key >> 3;
        let wire_type = key & 0x7;
        if tag == 0 {
            return Err(InspectError::MalformedBody);
        }
        tags.push(tag);
        bytes = match wire_type {
            0 => read_varint(rest)?.1,
            1 => rest.get(8..).ok_or(InspectError::MalformedBody)?,
            2 => {
                let (len, rest) = read_varint(rest)?;
                let len = usize::try_from(len).map_err(|_| InspectError::MalformedBody)?;
                rest.get(len..).ok_or(InspectError::MalformedBody)?
            }
            5 => rest.get(4..).ok_or(InspectError::MalformedBody)?,
            _ => return Err(InspectError::MalformedBody),
        };
    }
    Ok(tags)
}

fn read_varint(bytes: &[u8]) -> Result<(u64, &[u8]), InspectError> {
    let mut value: u64 = 0;
    for (i, byte) in bytes.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (i * 7);
        if byte & 0x80 == 0 {
            return Ok((value, &bytes[i + 1..]));
        }
    }
    Err(InspectError::MalformedBody)
}

fn account_of(id: &pb::AccountId) -> Option<AccountId> {
    if id.alias.is_some() {
        return None;
    }
    let num = id.account_num?;
    let shard = u64::try_from(id.shard_num).ok()?;
    let realm = u64::try_from(id.realm_num).ok()?;
    let num = u64::try_from(num).ok()?;
    Some(AccountId::new(shard, realm, num))
}

fn token_of(id: &pb::TokenId) -> Option<TokenId> {
    let shard = u64::try_from(id.shard_num).ok()?;
    let realm = u64::try_from(id.realm_num).ok()?;
    let num = u64::try_from(id.token_num).ok()?;
    Some(TokenId::new(shard, realm, num))
}

fn deltas_of(amounts: &[pb::AccountAmount]) -> Result<Vec<Delta>, InspectError> {
    amounts
        .iter()
        .map(|aa| {
            let id = aa.account_id.as_ref().ok_or(InspectError::InvalidEntityId)?;
            let party = if let Some(alias) = &id.alias {
                TransferParty::Alias(alias.clone())
            } else {
                TransferParty::Account(account_of(id).ok_or(InspectError::InvalidEntityId)?)
            };
            Ok(Delta {
                party,
                amount: aa.amount,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn inspects_simple_token_transfer() {
        let bytes = testing::token_transfer_bytes(
            "0.0.5001",
            "0.0.6001",
            &[("0.0.9001", -1000), ("0.0.7001", 1000)],
        );
        let inspected = inspect_transaction(&bytes).unwrap();
        assert_eq!(inspected.payer_of_record.to_string(), "0.0.5001");
        assert!(!inspected.has_non_transfer_ops);
        assert!(inspected.hbar_deltas.is_empty());
        assert_eq!(inspected.token_deltas.len(), 1);
        assert_eq!(inspected.token_deltas[0].0.to_string(), "0.0.6001");
        assert_eq!(inspected.token_deltas[0].1.len(), 2);
    }

    #[test]
    fn transaction_id_is_canonical() {
        let bytes = testing::token_transfer_bytes("0.0.5001", "0.0.6001", &[]);
        let inspected = inspect_transaction(&bytes).unwrap();
        assert_eq!(
            inspected.transaction_id,
            format!("0.0.5001@{}.{}", testing::VALID_START_SECONDS, 0)
        );
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(inspect_transaction(&[0xff, 0xff, 0xff]).is_err());
        assert!(inspect_transaction(&[]).is_err());
    }

    #[test]
    fn rejects_body_without_transfer_op() {
        let bytes = testing::non_transfer_bytes("0.0.5001");
        assert!(matches!(
            inspect_transaction(&bytes),
            Err(InspectError::NotCryptoTransfer)
        ));
    }

    #[test]
    fn flags_unmodeled_operation_fields() {
        let bytes = testing::transfer_with_extra_operation("0.0.5001", "0.0.6001");
        let inspected = inspect_transaction(&bytes).unwrap();
        assert!(inspected.has_non_transfer_ops);
    }

    #[test]
    fn flags_nft_transfers() {
        let bytes = testing::transfer_with_nft_entry("0.0.5001", "0.0.6001");
        let inspected = inspect_transaction(&bytes).unwrap();
        assert!(inspected.has_non_transfer_ops);
    }
}
