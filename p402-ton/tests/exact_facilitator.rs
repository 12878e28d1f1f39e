//! End-to-end handler tests for the TON exact scheme, driven through a mock
//! RPC backend and an in-memory replay store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use p402::chain::ChainId;
use p402::facilitator::{BoxFuture, Facilitator};
use p402::proto::{
    PaymentPayload, PaymentRequirements, SettleRequest, SettleResponse, V2, VerifyRequest,
    VerifyResponse,
};
use p402::replay::MemoryReplayStore;

use p402_ton::address::TonAddress;
use p402_ton::exact::{TonExactConfig, TonExactFacilitator};
use p402_ton::retry::RetryPolicy;
use p402_ton::rpc::{TonRpc, TonRpcError, TransferView};

const PAY_TO: &str = "0:3333333333333333333333333333333333333333333333333333333333333333";
const SOURCE: &str = "0:9999999999999999999999999999999999999999999999999999999999999999";
const MEMO: &str = "x402:invoice-001";

#[derive(Default)]
struct MockRpc {
    transfers: Vec<TransferView>,
    /// Number of lookups that miss before the indexer "catches up".
    visible_after: usize,
    fail_transport: bool,
    lookups: AtomicUsize,
}

impl MockRpc {
    fn with_transfer(transfer: TransferView) -> Self {
        Self {
            transfers: vec![transfer],
            ..Self::default()
        }
    }

    fn indexed(&self) -> bool {
        self.lookups.fetch_add(1, Ordering::SeqCst) >= self.visible_after
    }
}

impl TonRpc for MockRpc {
    fn chain_id(&self) -> ChainId {
        ChainId::new("ton", "testnet")
    }

    fn transaction_by_id(
        &self,
        id: &str,
    ) -> BoxFuture<'_, Result<Option<TransferView>, TonRpcError>> {
        let result = if self.fail_transport {
            Err(TonRpcError::Transport("indexer unreachable".into()))
        } else if !self.indexed() {
            Ok(None)
        } else {
            Ok(self
                .transfers
                .iter()
                .find(|t| t.transaction_id == id)
                .cloned())
        };
        Box::pin(async move { result })
    }

    fn incoming_transfers(
        &self,
        destination: &str,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<TransferView>, TonRpcError>> {
        let result = if self.fail_transport {
            Err(TonRpcError::Transport("indexer unreachable".into()))
        } else if !self.indexed() {
            Ok(Vec::new())
        } else {
            let destination: TonAddress = destination.parse().unwrap();
            Ok(self
                .transfers
                .iter()
                .filter(|t| {
                    t.destination
                        .parse::<TonAddress>()
                        .is_ok_and(|d| d == destination)
                })
                .take(limit)
                .cloned()
                .collect())
        };
        Box::pin(async move { result })
    }
}

fn transfer() -> TransferView {
    TransferView {
        transaction_id: "tx-1".into(),
        source: Some(SOURCE.into()),
        destination: PAY_TO.into(),
        amount: 1_500_000_000,
        memo: Some(MEMO.into()),
        utime: 1_700_000_000,
        jetton: None,
    }
}

fn requirements() -> PaymentRequirements {
    PaymentRequirements {
        scheme: "exact".into(),
        network: ChainId::new("ton", "testnet"),
        asset: "ton".into(),
        amount: "1500000000".into(),
        pay_to: PAY_TO.into(),
        max_timeout_seconds: 300,
        extra: serde_json::Value::Null,
    }
}

fn verify_request(payload: serde_json::Value) -> VerifyRequest {
    let requirements = requirements();
    VerifyRequest {
        payment_payload: PaymentPayload {
            x402_version: V2,
            payload,
            accepted: requirements.clone(),
            resource: None,
        },
        payment_requirements: requirements,
    }
}

fn claim_by_id() -> serde_json::Value {
    serde_json::json!({ "transactionId": "tx-1", "memo": MEMO })
}

fn fast_config() -> TonExactConfig {
    TonExactConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        },
        ..TonExactConfig::default()
    }
}

fn handler(rpc: MockRpc) -> TonExactFacilitator<Arc<MockRpc>, Arc<MemoryReplayStore>> {
    TonExactFacilitator::new(Arc::new(rpc), Arc::new(MemoryReplayStore::new()), fast_config())
}

#[tokio::test]
async fn verifies_exact_native_transfer_by_id() {
    let handler = handler(MockRpc::with_transfer(transfer()));
    let response = handler.verify(verify_request(claim_by_id())).await.unwrap();
    assert_eq!(
        response,
        VerifyResponse::Valid {
            payer: Some(SOURCE.into()),
        }
    );
}

#[tokio::test]
async fn finds_transfer_by_memo_without_transaction_id() {
    let handler = handler(MockRpc::with_transfer(transfer()));
    let request = verify_request(serde_json::json!({ "memo": MEMO }));
    assert!(handler.verify(request).await.unwrap().is_valid());
}

#[tokio::test]
async fn rejects_each_perturbed_requirement_field() {
    let handler = handler(MockRpc::with_transfer(transfer()));
    let perturbations: Vec<Box<dyn Fn(&mut PaymentRequirements)>> = vec![
        Box::new(|r| r.amount = "1500000001".into()),
        Box::new(|r| r.pay_to = SOURCE.into()),
        Box::new(|r| r.asset = "0:4444444444444444444444444444444444444444444444444444444444444444".into()),
        Box::new(|r| r.max_timeout_seconds = 60),
    ];
    for perturb in perturbations {
        let mut request = verify_request(claim_by_id());
        perturb(&mut request.payment_requirements);
        let response = handler.verify(request).await.unwrap();
        assert_eq!(
            response.invalid_reason(),
            Some("accepted_payment_requirements_mismatch")
        );
    }
}

#[tokio::test]
async fn rejects_network_mismatch() {
    let handler = handler(MockRpc::with_transfer(transfer()));
    let mut request = verify_request(claim_by_id());
    request.payment_requirements.network = ChainId::new("ton", "mainnet");
    request.payment_payload.accepted.network = ChainId::new("ton", "mainnet");
    let response = handler.verify(request).await.unwrap();
    assert_eq!(response.invalid_reason(), Some("network_mismatch"));
}

#[tokio::test]
async fn expired_claim_is_rejected_even_when_the_transfer_exists() {
    let handler = handler(MockRpc::with_transfer(transfer()));
    let request = verify_request(serde_json::json!({
        "transactionId": "tx-1",
        "memo": MEMO,
        "validUntil": 1_000u64,
    }));
    let response = handler.verify(request).await.unwrap();
    assert_eq!(response.invalid_reason(), Some("expired"));
}

#[tokio::test]
async fn missing_transfer_is_not_found() {
    let handler = handler(MockRpc::default());
    let response = handler.verify(verify_request(claim_by_id())).await.unwrap();
    assert_eq!(response.invalid_reason(), Some("not_found"));
}

#[tokio::test]
async fn transport_failure_is_rpc_error() {
    let handler = handler(MockRpc {
        fail_transport: true,
        ..MockRpc::with_transfer(transfer())
    });
    let response = handler.verify(verify_request(claim_by_id())).await.unwrap();
    assert_eq!(response.invalid_reason(), Some("rpc_error"));
}

#[tokio::test]
async fn rejects_invalid_memo() {
    let handler = handler(MockRpc::with_transfer(transfer()));
    let request = verify_request(serde_json::json!({
        "transactionId": "tx-1",
        "memo": "no prefix, bad chars €",
    }));
    let response = handler.verify(request).await.unwrap();
    assert_eq!(response.invalid_reason(), Some("invalid_memo"));
}

#[tokio::test]
async fn settle_waits_out_indexing_lag() {
    let rpc = Arc::new(MockRpc {
        visible_after: 2,
        ..MockRpc::with_transfer(transfer())
    });
    let handler = TonExactFacilitator::new(
        Arc::clone(&rpc),
        Arc::new(MemoryReplayStore::new()),
        fast_config(),
    );
    let request: SettleRequest = verify_request(claim_by_id()).into();
    let response = handler.settle(request).await.unwrap();
    match response {
        SettleResponse::Success {
            payer,
            transaction,
            network,
        } => {
            assert_eq!(payer.as_deref(), Some(SOURCE));
            assert_eq!(transaction, "tx-1");
            assert_eq!(network, "ton:testnet");
        }
        SettleResponse::Error { .. } => panic!("settle should succeed: {response:?}"),
    }
    assert_eq!(rpc.lookups.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn settle_gives_up_after_the_retry_budget() {
    let rpc = Arc::new(MockRpc {
        visible_after: 10,
        ..MockRpc::with_transfer(transfer())
    });
    let handler = TonExactFacilitator::new(
        Arc::clone(&rpc),
        Arc::new(MemoryReplayStore::new()),
        fast_config(),
    );
    let request: SettleRequest = verify_request(claim_by_id()).into();
    let response = handler.settle(request).await.unwrap();
    match response {
        SettleResponse::Error { reason, .. } => assert_eq!(reason, "not_found"),
        SettleResponse::Success { .. } => panic!("settle must not succeed"),
    }
    assert_eq!(rpc.lookups.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn settles_once_then_rejects_replay() {
    let handler = handler(MockRpc::with_transfer(transfer()));
    let request: SettleRequest = verify_request(claim_by_id()).into();

    assert!(handler.settle(request.clone()).await.unwrap().is_success());

    let second = handler.settle(request).await.unwrap();
    match second {
        SettleResponse::Error { reason, .. } => assert_eq!(reason, "replay_detected"),
        SettleResponse::Success { .. } => panic!("second settle must be rejected"),
    }
}

#[tokio::test]
async fn verify_after_settlement_reports_replay() {
    let handler = handler(MockRpc::with_transfer(transfer()));
    let settle: SettleRequest = verify_request(claim_by_id()).into();
    assert!(handler.settle(settle).await.unwrap().is_success());

    let response = handler.verify(verify_request(claim_by_id())).await.unwrap();
    assert_eq!(response.invalid_reason(), Some("replay_detected"));
    // The payer is still attached for diagnostics.
    match response {
        VerifyResponse::Invalid { payer, .. } => assert_eq!(payer.as_deref(), Some(SOURCE)),
        VerifyResponse::Valid { .. } => unreachable!(),
    }
}

#[tokio::test]
async fn supported_lists_the_network() {
    let handler = handler(MockRpc::default());
    let supported = handler.supported().await.unwrap();
    assert_eq!(supported.kinds.len(), 1);
    let kind = &supported.kinds[0];
    assert_eq!(kind.scheme, "exact");
    assert_eq!(kind.network, "ton:testnet");
    assert!(kind.extra.is_none());
}
