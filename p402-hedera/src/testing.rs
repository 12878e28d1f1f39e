//! Fixture builders for transfer transactions.
//!
//! Construct valid (and deliberately invalid) `CryptoTransfer` transaction
//! bytes without a network or signing key. Used by this crate's own tests
//! and useful to downstream tests exercising the verifier.

use prost::Message;

use crate::pb;

/// Valid-start instant used by the fixture builders.
pub const VALID_START_SECONDS: i64 = 1_700_000_000;

fn pb_account(id: &str) -> pb::AccountId {
    let parsed: crate::account::AccountId = id.parse().expect("fixture account id");
    pb::AccountId {
        shard_num: parsed.shard as i64,
        realm_num: parsed.realm as i64,
        account_num: Some(parsed.num as i64),
        alias: None,
    }
}

fn pb_token(id: &str) -> pb::TokenId {
    let parsed: crate::account::TokenId = id.parse().expect("fixture token id");
    pb::TokenId {
        shard_num: parsed.shard as i64,
        realm_num: parsed.realm as i64,
        token_num: parsed.num as i64,
    }
}

fn amounts(deltas: &[(&str, i64)]) -> Vec<pb::AccountAmount> {
    deltas
        .iter()
        .map(|(account, amount)| pb::AccountAmount {
            account_id: Some(pb_account(account)),
            amount: *amount,
            is_approval: false,
        })
        .collect()
}

fn body(payer: &str, transfer: Option<pb::CryptoTransferTransactionBody>) -> pb::TransactionBody {
    pb::TransactionBody {
        transaction_id: Some(pb::TransactionId {
            transaction_valid_start: Some(pb::Timestamp {
                seconds: VALID_START_SECONDS,
                nanos: 0,
            }),
            account_id: Some(pb_account(payer)),
        }),
        node_account_id: Some(pb_account("0.0.3")),
        transaction_fee: 100_000_000,
        transaction_valid_duration: Some(pb::Duration { seconds: 120 }),
        memo: String::new(),
        crypto_transfer: transfer,
    }
}

fn envelope(body: &pb::TransactionBody) -> Vec<u8> {
    let signed = pb::SignedTransaction {
        body_bytes: body.encode_to_vec(),
        sig_map: None,
    };
    let tx = pb::Transaction {
        signed_transaction_bytes: signed.encode_to_vec(),
    };
    pb::TransactionList {
        transaction_list: vec![tx],
    }
    .encode_to_vec()
}

/// Builds a token transfer paying the given deltas, fee-paid by `payer`.
#[must_use]
pub fn token_transfer_bytes(payer: &str, token: &str, deltas: &[(&str, i64)]) -> Vec<u8> {
    let transfer = pb::CryptoTransferTransactionBody {
        transfers: None,
        token_transfers: vec![pb::TokenTransferList {
            token: Some(pb_token(token)),
            transfers: amounts(deltas),
            nft_transfers: Vec::new(),
        }],
    };
    envelope(&body(payer, Some(transfer)))
}

/// Builds an hbar transfer paying the given deltas, fee-paid by `payer`.
#[must_use]
pub fn hbar_transfer_bytes(payer: &str, deltas: &[(&str, i64)]) -> Vec<u8> {
    let transfer = pb::CryptoTransferTransactionBody {
        transfers: Some(pb::TransferList {
            account_amounts: amounts(deltas),
        }),
        token_transfers: Vec::new(),
    };
    envelope(&body(payer, Some(transfer)))
}

/// Builds a transaction body with no `CryptoTransfer` operation at all.
#[must_use]
pub fn non_transfer_bytes(payer: &str) -> Vec<u8> {
    let mut body_bytes = body(payer, None).encode_to_vec();
    // Append an unmodeled operation field: tag 11 (cryptoCreateAccount),
    // wire type 2, empty message.
    body_bytes.extend_from_slice(&[(11 << 3) | 2, 0]);
    wrap_raw_body(&body_bytes)
}

/// Builds a transfer whose body also carries an unmodeled operation field.
#[must_use]
pub fn transfer_with_extra_operation(payer: &str, token: &str) -> Vec<u8> {
    let transfer = pb::CryptoTransferTransactionBody {
        transfers: None,
        token_transfers: vec![pb::TokenTransferList {
            token: Some(pb_token(token)),
            transfers: amounts(&[("0.0.9001", -1), ("0.0.7001", 1)]),
            nft_transfers: Vec::new(),
        }],
    };
    let mut body_bytes = body(payer, Some(transfer)).encode_to_vec();
    // Tag 29 (tokenCreation), wire type 2, empty message. The field key
    // (29 << 3) | 2 = 234 exceeds 0x7f, so it takes two varint bytes.
    body_bytes.extend_from_slice(&[0xea, 0x01, 0]);
    wrap_raw_body(&body_bytes)
}

/// Builds a transfer carrying an NFT ownership change.
#[must_use]
pub fn transfer_with_nft_entry(payer: &str, token: &str) -> Vec<u8> {
    let transfer = pb::CryptoTransferTransactionBody {
        transfers: None,
        token_transfers: vec![pb::TokenTransferList {
            token: Some(pb_token(token)),
            transfers: Vec::new(),
            nft_transfers: vec![vec![0x08, 0x01]],
        }],
    };
    envelope(&body(payer, Some(transfer)))
}

fn wrap_raw_body(body_bytes: &[u8]) -> Vec<u8> {
    let signed = pb::SignedTransaction {
        body_bytes: body_bytes.to_vec(),
        sig_map: None,
    };
    let tx = pb::Transaction {
        signed_transaction_bytes: signed.encode_to_vec(),
    };
    pb::TransactionList {
        transaction_list: vec![tx],
    }
    .encode_to_vec()
}
