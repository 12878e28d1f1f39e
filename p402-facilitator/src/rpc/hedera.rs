//! Hedera chain backend over mirror-node REST and a signing relay.
//!
//! Account resolution reads the public mirror-node REST API. Broadcast
//! goes through a signing relay that holds the operator keys and submits
//! the countersigned transaction to consensus nodes; the relay keeps key
//! material out of this process.

use p402::chain::ChainId;
use p402::encoding::Base64Bytes;
use p402::facilitator::BoxFuture;
use p402_hedera::account::AccountId;
use p402_hedera::provider::{
    AccountResolution, BroadcastReceipt, HederaProvider, HederaProviderError,
};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

/// [`HederaProvider`] backed by mirror-node REST plus a signing relay.
#[derive(Debug, Clone)]
pub struct HederaMirrorProvider {
    chain_id: ChainId,
    mirror_url: Url,
    submit_url: Url,
    operators: Vec<AccountId>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct MirrorAccount {
    #[serde(default)]
    alias: Option<String>,
}

#[derive(Deserialize)]
struct SubmitReceipt {
    #[serde(rename = "transactionId", default)]
    transaction_id: Option<String>,
}

impl HederaMirrorProvider {
    /// Creates a provider for one network.
    ///
    /// # Errors
    ///
    /// Returns an error when either base URL does not parse.
    pub fn try_new(
        chain_id: ChainId,
        mirror_url: &str,
        submit_url: &str,
        operators: Vec<AccountId>,
    ) -> Result<Self, url::ParseError> {
        let normalized = if mirror_url.ends_with('/') {
            mirror_url.to_owned()
        } else {
            format!("{mirror_url}/")
        };
        Ok(Self {
            chain_id,
            mirror_url: Url::parse(&normalized)?,
            submit_url: Url::parse(submit_url)?,
            operators,
            client: reqwest::Client::new(),
        })
    }

    async fn fetch_account(
        &self,
        account: AccountId,
    ) -> Result<AccountResolution, HederaProviderError> {
        let url = self
            .mirror_url
            .join(&format!("api/v1/accounts/{account}"))
            .map_err(|e| HederaProviderError::Rpc(e.to_string()))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HederaProviderError::Rpc(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(AccountResolution::NotFound);
        }
        if !response.status().is_success() {
            return Err(HederaProviderError::Rpc(format!(
                "mirror node returned {}",
                response.status()
            )));
        }
        let record: MirrorAccount = response
            .json()
            .await
            .map_err(|e| HederaProviderError::Rpc(e.to_string()))?;
        if record.alias.as_deref().is_some_and(|a| !a.is_empty()) {
            Ok(AccountResolution::Alias)
        } else {
            Ok(AccountResolution::Registered)
        }
    }

    async fn submit(
        &self,
        transaction_bytes: Vec<u8>,
        fee_payer: AccountId,
    ) -> Result<BroadcastReceipt, HederaProviderError> {
        let body = serde_json::json!({
            "transactionBytes": Base64Bytes::encode(&transaction_bytes).to_string(),
            "feePayer": fee_payer.to_string(),
        });
        let response = self
            .client
            .post(self.submit_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| HederaProviderError::Broadcast(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(HederaProviderError::Broadcast(format!(
                "relay returned {status}: {detail}"
            )));
        }
        let receipt: SubmitReceipt = response
            .json()
            .await
            .map_err(|e| HederaProviderError::Broadcast(e.to_string()))?;
        Ok(BroadcastReceipt {
            transaction_id: receipt.transaction_id,
        })
    }
}

impl HederaProvider for HederaMirrorProvider {
    fn chain_id(&self) -> ChainId {
        self.chain_id.clone()
    }

    fn managed_signers(&self) -> Vec<AccountId> {
        self.operators.clone()
    }

    fn resolve_account(
        &self,
        account: AccountId,
    ) -> BoxFuture<'_, Result<AccountResolution, HederaProviderError>> {
        Box::pin(self.fetch_account(account))
    }

    fn sign_and_broadcast(
        &self,
        transaction_bytes: Vec<u8>,
        fee_payer: AccountId,
    ) -> BoxFuture<'_, Result<BroadcastReceipt, HederaProviderError>> {
        Box::pin(self.submit(transaction_bytes, fee_payer))
    }
}
