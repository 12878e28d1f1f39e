//! End-to-end handler tests for the Hedera exact scheme, driven through a
//! mock chain provider and an in-memory replay store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use p402::chain::ChainId;
use p402::encoding::Base64Bytes;
use p402::facilitator::{BoxFuture, Facilitator};
use p402::proto::{
    PaymentPayload, PaymentRequirements, SettleRequest, SettleResponse, V2, VerifyRequest,
    VerifyResponse,
};
use p402::replay::{MemoryReplayStore, ReplayStore};

use p402_hedera::account::AccountId;
use p402_hedera::exact::{HederaExactConfig, HederaExactFacilitator};
use p402_hedera::provider::{
    AccountResolution, BroadcastReceipt, HederaProvider, HederaProviderError,
};
use p402_hedera::testing;

#[derive(Default)]
struct MockProvider {
    resolution: Option<AccountResolution>,
    fail_broadcast: bool,
    broadcasts: AtomicUsize,
}

impl HederaProvider for MockProvider {
    fn chain_id(&self) -> ChainId {
        ChainId::new("hedera", "testnet")
    }

    fn managed_signers(&self) -> Vec<AccountId> {
        vec!["0.0.5001".parse().unwrap()]
    }

    fn resolve_account(
        &self,
        _account: AccountId,
    ) -> BoxFuture<'_, Result<AccountResolution, HederaProviderError>> {
        let resolution = self.resolution.unwrap_or(AccountResolution::Unsupported);
        Box::pin(async move { Ok(resolution) })
    }

    fn sign_and_broadcast(
        &self,
        _transaction_bytes: Vec<u8>,
        _fee_payer: AccountId,
    ) -> BoxFuture<'_, Result<BroadcastReceipt, HederaProviderError>> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_broadcast;
        Box::pin(async move {
            if fail {
                Err(HederaProviderError::Broadcast("node unreachable".into()))
            } else {
                Ok(BroadcastReceipt {
                    transaction_id: None,
                })
            }
        })
    }
}

fn requirements() -> PaymentRequirements {
    PaymentRequirements {
        scheme: "exact".into(),
        network: ChainId::new("hedera", "testnet"),
        asset: "0.0.6001".into(),
        amount: "1000".into(),
        pay_to: "0.0.7001".into(),
        max_timeout_seconds: 300,
        extra: serde_json::json!({ "feePayer": "0.0.5001" }),
    }
}

fn payload_for(requirements: &PaymentRequirements, transaction_bytes: &[u8]) -> PaymentPayload {
    PaymentPayload {
        x402_version: V2,
        payload: serde_json::json!({
            "transaction": Base64Bytes::encode(transaction_bytes).to_string(),
        }),
        accepted: requirements.clone(),
        resource: None,
    }
}

fn verify_request() -> VerifyRequest {
    let requirements = requirements();
    let bytes = testing::token_transfer_bytes(
        "0.0.5001",
        "0.0.6001",
        &[("0.0.9001", -1000), ("0.0.7001", 1000)],
    );
    VerifyRequest {
        payment_payload: payload_for(&requirements, &bytes),
        payment_requirements: requirements,
    }
}

fn handler(
    provider: MockProvider,
    config: HederaExactConfig,
) -> HederaExactFacilitator<Arc<MockProvider>, Arc<MemoryReplayStore>> {
    HederaExactFacilitator::new(
        Arc::new(provider),
        Arc::new(MemoryReplayStore::new()),
        config,
    )
}

#[tokio::test]
async fn verifies_exact_token_transfer() {
    let handler = handler(MockProvider::default(), HederaExactConfig::default());
    let response = handler.verify(verify_request()).await.unwrap();
    assert_eq!(
        response,
        VerifyResponse::Valid {
            payer: Some("0.0.9001".into()),
        }
    );
}

#[tokio::test]
async fn rejects_each_perturbed_requirement_field() {
    let handler = handler(MockProvider::default(), HederaExactConfig::default());
    let perturbations: Vec<Box<dyn Fn(&mut PaymentRequirements)>> = vec![
        Box::new(|r| r.amount = "1001".into()),
        Box::new(|r| r.pay_to = "0.0.7002".into()),
        Box::new(|r| r.asset = "0.0.6002".into()),
        Box::new(|r| r.extra = serde_json::json!({ "feePayer": "0.0.5002" })),
        Box::new(|r| r.max_timeout_seconds = 60),
    ];
    for perturb in perturbations {
        let mut request = verify_request();
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
    let handler = handler(MockProvider::default(), HederaExactConfig::default());
    let mut request = verify_request();
    request.payment_requirements.network = ChainId::new("hedera", "mainnet");
    request.payment_payload.accepted.network = ChainId::new("hedera", "mainnet");
    let response = handler.verify(request).await.unwrap();
    assert_eq!(response.invalid_reason(), Some("network_mismatch"));
}

#[tokio::test]
async fn rejects_unmanaged_fee_payer() {
    let handler = handler(MockProvider::default(), HederaExactConfig::default());
    let mut requirements = requirements();
    requirements.extra = serde_json::json!({ "feePayer": "0.0.5009" });
    let bytes = testing::token_transfer_bytes(
        "0.0.5009",
        "0.0.6001",
        &[("0.0.9001", -1000), ("0.0.7001", 1000)],
    );
    let request = VerifyRequest {
        payment_payload: payload_for(&requirements, &bytes),
        payment_requirements: requirements,
    };
    let response = handler.verify(request).await.unwrap();
    assert_eq!(
        response.invalid_reason(),
        Some("fee_payer_not_managed_by_facilitator")
    );
}

#[tokio::test]
async fn rejects_undecodable_payload() {
    let handler = handler(MockProvider::default(), HederaExactConfig::default());
    let requirements = requirements();
    let mut request = verify_request();
    request.payment_payload = PaymentPayload {
        x402_version: V2,
        payload: serde_json::json!({ "transaction": "!!not-base64!!" }),
        accepted: requirements,
        resource: None,
    };
    let response = handler.verify(request).await.unwrap();
    assert_eq!(
        response.invalid_reason(),
        Some("invalid_exact_hedera_payload_transaction_could_not_be_decoded")
    );
}

#[tokio::test]
async fn replayed_transaction_id_is_invalid_regardless_of_fields() {
    let store = Arc::new(MemoryReplayStore::new());
    let handler = HederaExactFacilitator::new(
        Arc::new(MockProvider::default()),
        Arc::clone(&store),
        HederaExactConfig::default(),
    );
    let request = verify_request();

    assert!(handler.verify(request.clone()).await.unwrap().is_valid());

    store
        .mark(&format!("0.0.5001@{}.0", testing::VALID_START_SECONDS))
        .await
        .unwrap();
    let response = handler.verify(request).await.unwrap();
    assert_eq!(response.invalid_reason(), Some("invalid_transaction_state"));
    // The payer is still attached for diagnostics.
    match response {
        VerifyResponse::Invalid { payer, .. } => assert_eq!(payer.as_deref(), Some("0.0.9001")),
        VerifyResponse::Valid { .. } => unreachable!(),
    }
}

#[tokio::test]
async fn settles_once_then_rejects_replay() {
    let provider = Arc::new(MockProvider::default());
    let handler = HederaExactFacilitator::new(
        Arc::clone(&provider),
        Arc::new(MemoryReplayStore::new()),
        HederaExactConfig::default(),
    );
    let request: SettleRequest = verify_request().into();

    let first = handler.settle(request.clone()).await.unwrap();
    match &first {
        SettleResponse::Success {
            payer,
            transaction,
            network,
        } => {
            assert_eq!(payer.as_deref(), Some("0.0.9001"));
            assert_eq!(network, "hedera:testnet");
            assert_eq!(
                transaction,
                &format!("0.0.5001@{}.0", testing::VALID_START_SECONDS)
            );
        }
        SettleResponse::Error { .. } => panic!("first settle should succeed: {first:?}"),
    }

    let second = handler.settle(request).await.unwrap();
    match second {
        SettleResponse::Error { reason, .. } => {
            assert_eq!(reason, "invalid_transaction_state");
        }
        SettleResponse::Success { .. } => panic!("second settle must be rejected"),
    }
    assert_eq!(provider.broadcasts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn broadcast_failure_keeps_payment_retryable() {
    let store = Arc::new(MemoryReplayStore::new());
    let failing = Arc::new(MockProvider {
        fail_broadcast: true,
        ..MockProvider::default()
    });
    let handler = HederaExactFacilitator::new(
        Arc::clone(&failing),
        Arc::clone(&store),
        HederaExactConfig::default(),
    );
    let request: SettleRequest = verify_request().into();

    let response = handler.settle(request.clone()).await.unwrap();
    match response {
        SettleResponse::Error {
            reason, message, ..
        } => {
            assert_eq!(reason, "transaction_failed");
            assert!(message.unwrap().contains("node unreachable"));
        }
        SettleResponse::Success { .. } => panic!("broadcast failure must not settle"),
    }
    // No replay record was written.
    assert!(
        !store
            .has(&format!("0.0.5001@{}.0", testing::VALID_START_SECONDS))
            .await
            .unwrap()
    );

    // The same payload settles fine against a healthy provider.
    let healthy = HederaExactFacilitator::new(
        Arc::new(MockProvider::default()),
        store,
        HederaExactConfig::default(),
    );
    assert!(healthy.settle(request).await.unwrap().is_success());
}

#[tokio::test]
async fn alias_destination_denied_by_default() {
    let handler = handler(
        MockProvider {
            resolution: Some(AccountResolution::Alias),
            ..MockProvider::default()
        },
        HederaExactConfig::default(),
    );
    let response = handler.verify(verify_request()).await.unwrap();
    assert_eq!(
        response.invalid_reason(),
        Some("invalid_exact_hedera_payload_pay_to_alias_not_allowed")
    );
}

#[tokio::test]
async fn alias_destination_allowed_by_config() {
    let handler = handler(
        MockProvider {
            resolution: Some(AccountResolution::Alias),
            ..MockProvider::default()
        },
        HederaExactConfig {
            allow_alias_destination: true,
        },
    );
    assert!(handler.verify(verify_request()).await.unwrap().is_valid());
}

#[tokio::test]
async fn unresolvable_destination_is_invalid_pay_to() {
    let handler = handler(
        MockProvider {
            resolution: Some(AccountResolution::NotFound),
            ..MockProvider::default()
        },
        HederaExactConfig::default(),
    );
    let response = handler.verify(verify_request()).await.unwrap();
    assert_eq!(response.invalid_reason(), Some("invalid_pay_to"));
}

#[tokio::test]
async fn supported_reports_fee_payer() {
    let handler = handler(MockProvider::default(), HederaExactConfig::default());
    let supported = handler.supported().await.unwrap();
    assert_eq!(supported.kinds.len(), 1);
    let kind = &supported.kinds[0];
    assert_eq!(kind.scheme, "exact");
    assert_eq!(kind.network, "hedera:testnet");
    assert_eq!(
        kind.extra.as_ref().unwrap()["feePayer"],
        serde_json::json!("0.0.5001")
    );
}
