//! TON chain backend over a toncenter v3-style indexer.
//!
//! Native transfers come from `/transactions`, jetton transfers from
//! `/jetton/transfers`. Jetton precision is not part of the transfer
//! events, so it is fetched once per master from `/jetton/masters` and
//! cached for the life of the process.

use std::collections::HashMap;

use p402::chain::ChainId;
use p402::facilitator::BoxFuture;
use p402_ton::rpc::{JettonTransferInfo, TonRpc, TonRpcError, TransferView};
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

/// Sub-unit precision assumed when a jetton master publishes no metadata.
const DEFAULT_JETTON_DECIMALS: u32 = 9;

/// [`TonRpc`] backed by a toncenter v3-compatible indexer.
#[derive(Debug)]
pub struct TonIndexerRpc {
    chain_id: ChainId,
    api_url: Url,
    api_key: Option<String>,
    client: reqwest::Client,
    decimals_cache: RwLock<HashMap<String, u32>>,
}

#[derive(Deserialize)]
struct TransactionsPage {
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

#[derive(Deserialize)]
struct RawTransaction {
    hash: String,
    now: u64,
    in_msg: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    message_content: Option<RawMessageContent>,
}

#[derive(Deserialize)]
struct RawMessageContent {
    #[serde(default)]
    decoded: Option<RawDecodedComment>,
}

#[derive(Deserialize)]
struct RawDecodedComment {
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Deserialize)]
struct JettonTransfersPage {
    #[serde(default)]
    jetton_transfers: Vec<RawJettonTransfer>,
}

#[derive(Deserialize)]
struct RawJettonTransfer {
    transaction_hash: String,
    #[serde(default)]
    transaction_now: Option<u64>,
    #[serde(default)]
    source: Option<String>,
    destination: String,
    amount: String,
    #[serde(default)]
    comment: Option<String>,
    jetton_master: String,
}

#[derive(Deserialize)]
struct JettonMastersPage {
    #[serde(default)]
    jetton_masters: Vec<RawJettonMaster>,
}

#[derive(Deserialize)]
struct RawJettonMaster {
    #[serde(default)]
    jetton_content: Option<RawJettonContent>,
}

#[derive(Deserialize)]
struct RawJettonContent {
    #[serde(default)]
    decimals: Option<String>,
}

impl TonIndexerRpc {
    /// Creates a backend for one network.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL does not parse.
    pub fn try_new(
        chain_id: ChainId,
        api_url: &str,
        api_key: Option<String>,
    ) -> Result<Self, url::ParseError> {
        let normalized = if api_url.ends_with('/') {
            api_url.to_owned()
        } else {
            format!("{api_url}/")
        };
        Ok(Self {
            chain_id,
            api_url: Url::parse(&normalized)?,
            api_key,
            client: reqwest::Client::new(),
            decimals_cache: RwLock::new(HashMap::new()),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TonRpcError> {
        let url = self
            .api_url
            .join(path)
            .map_err(|e| TonRpcError::Transport(e.to_string()))?;
        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| TonRpcError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TonRpcError::Transport(format!(
                "indexer returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| TonRpcError::Malformed(e.to_string()))
    }

    /// Looks up a jetton's declared precision, consulting the cache first.
    async fn jetton_decimals(&self, master: &str) -> Result<u32, TonRpcError> {
        if let Some(decimals) = self.decimals_cache.read().await.get(master) {
            return Ok(*decimals);
        }
        let page: JettonMastersPage = self
            .get_json("jetton/masters", &[("address", master)])
            .await?;
        let decimals = page
            .jetton_masters
            .first()
            .and_then(|m| m.jetton_content.as_ref())
            .and_then(|c| c.decimals.as_ref())
            .and_then(|d| d.parse().ok())
            .unwrap_or(DEFAULT_JETTON_DECIMALS);
        self.decimals_cache
            .write()
            .await
            .insert(master.to_owned(), decimals);
        Ok(decimals)
    }

    /// Normalizes a raw native transaction, skipping transactions whose
    /// inbound message carries no value.
    fn native_view(raw: RawTransaction) -> Result<Option<TransferView>, TonRpcError> {
        let Some(in_msg) = raw.in_msg else {
            return Ok(None);
        };
        let Some(destination) = in_msg.destination else {
            return Ok(None);
        };
        let amount = match in_msg.value.as_deref() {
            Some(value) => value
                .parse::<u128>()
                .map_err(|_| TonRpcError::Malformed(format!("bad value: {value}")))?,
            None => return Ok(None),
        };
        if amount == 0 {
            return Ok(None);
        }
        Ok(Some(TransferView {
            transaction_id: raw.hash,
            source: in_msg.source,
            destination,
            amount,
            memo: in_msg.message_content.and_then(|c| c.decoded).and_then(|d| d.comment),
            utime: raw.now,
            jetton: None,
        }))
    }

    async fn jetton_view(
        &self,
        raw: RawJettonTransfer,
    ) -> Result<TransferView, TonRpcError> {
        let amount = raw
            .amount
            .parse::<u128>()
            .map_err(|_| TonRpcError::Malformed(format!("bad jetton amount: {}", raw.amount)))?;
        let decimals = self.jetton_decimals(&raw.jetton_master).await?;
        Ok(TransferView {
            transaction_id: raw.transaction_hash,
            source: raw.source,
            destination: raw.destination,
            amount,
            memo: raw.comment,
            utime: raw.transaction_now.unwrap_or_default(),
            jetton: Some(JettonTransferInfo {
                master: raw.jetton_master,
                decimals,
            }),
        })
    }

    async fn lookup_by_id(&self, id: &str) -> Result<Option<TransferView>, TonRpcError> {
        let page: TransactionsPage = self
            .get_json("transactions", &[("hash", id), ("limit", "1")])
            .await?;
        if let Some(raw) = page.transactions.into_iter().next() {
            if let Some(view) = Self::native_view(raw)? {
                return Ok(Some(view));
            }
        }
        // Jetton transfers surface through their own endpoint.
        let page: JettonTransfersPage = self
            .get_json("jetton/transfers", &[("transaction_hash", id), ("limit", "1")])
            .await?;
        match page.jetton_transfers.into_iter().next() {
            Some(raw) => Ok(Some(self.jetton_view(raw).await?)),
            None => Ok(None),
        }
    }

    async fn lookup_incoming(
        &self,
        destination: &str,
        limit: usize,
    ) -> Result<Vec<TransferView>, TonRpcError> {
        let limit_str = limit.to_string();
        let page: TransactionsPage = self
            .get_json(
                "transactions",
                &[("account", destination), ("limit", &limit_str), ("sort", "desc")],
            )
            .await?;
        let mut views = Vec::new();
        for raw in page.transactions {
            if let Some(view) = Self::native_view(raw)? {
                views.push(view);
            }
        }

        let page: JettonTransfersPage = self
            .get_json(
                "jetton/transfers",
                &[("address", destination), ("limit", &limit_str), ("sort", "desc")],
            )
            .await?;
        for raw in page.jetton_transfers {
            views.push(self.jetton_view(raw).await?);
        }

        views.sort_by(|a, b| b.utime.cmp(&a.utime));
        views.truncate(limit);
        Ok(views)
    }
}

impl TonRpc for TonIndexerRpc {
    fn chain_id(&self) -> ChainId {
        self.chain_id.clone()
    }

    fn transaction_by_id(
        &self,
        id: &str,
    ) -> BoxFuture<'_, Result<Option<TransferView>, TonRpcError>> {
        let id = id.to_owned();
        Box::pin(async move { self.lookup_by_id(&id).await })
    }

    fn incoming_transfers(
        &self,
        destination: &str,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<TransferView>, TonRpcError>> {
        let destination = destination.to_owned();
        Box::pin(async move { self.lookup_incoming(&destination, limit).await })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const DEST: &str = "0:3333333333333333333333333333333333333333333333333333333333333333";
    const MASTER: &str = "0:4444444444444444444444444444444444444444444444444444444444444444";

    fn rpc(server: &MockServer) -> TonIndexerRpc {
        TonIndexerRpc::try_new(ChainId::new("ton", "mainnet"), &server.uri(), None).unwrap()
    }

    fn native_page() -> serde_json::Value {
        serde_json::json!({
            "transactions": [{
                "hash": "tx-native",
                "now": 1_700_000_100,
                "in_msg": {
                    "source": "0:9999999999999999999999999999999999999999999999999999999999999999",
                    "destination": DEST,
                    "value": "1500000000",
                    "message_content": { "decoded": { "comment": "x402:invoice-001" } },
                },
            }],
        })
    }

    #[tokio::test]
    async fn maps_native_transactions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions"))
            .and(query_param("hash", "tx-native"))
            .respond_with(ResponseTemplate::new(200).set_body_json(native_page()))
            .mount(&server)
            .await;

        let view = rpc(&server)
            .transaction_by_id("tx-native")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.destination, DEST);
        assert_eq!(view.amount, 1_500_000_000);
        assert_eq!(view.memo.as_deref(), Some("x402:invoice-001"));
        assert!(view.jetton.is_none());
    }

    #[tokio::test]
    async fn merges_jetton_transfers_with_cached_precision() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"transactions": []})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jetton/transfers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jetton_transfers": [{
                    "transaction_hash": "tx-jetton",
                    "transaction_now": 1_700_000_200,
                    "destination": DEST,
                    "amount": "25000",
                    "comment": "x402:invoice-002",
                    "jetton_master": MASTER,
                }],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jetton/masters"))
            .and(query_param("address", MASTER))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jetton_masters": [{ "jetton_content": { "decimals": "6" } }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let rpc = rpc(&server);
        let views = rpc.incoming_transfers(DEST, 8).await.unwrap();
        assert_eq!(views.len(), 1);
        let jetton = views[0].jetton.as_ref().unwrap();
        assert_eq!(jetton.master, MASTER);
        assert_eq!(jetton.decimals, 6);

        // Second lookup must hit the cache, not the endpoint.
        let views = rpc.incoming_transfers(DEST, 8).await.unwrap();
        assert_eq!(views[0].jetton.as_ref().unwrap().decimals, 6);
    }

    #[tokio::test]
    async fn unknown_hash_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"transactions": []})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jetton/transfers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"jetton_transfers": []}),
            ))
            .mount(&server)
            .await;

        assert!(rpc(&server).transaction_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn indexer_failure_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = rpc(&server).transaction_by_id("tx").await.unwrap_err();
        assert!(matches!(err, TonRpcError::Transport(_)));
    }
}
