//! Solana JSON-RPC chain client
//!
//! Uses two RPC methods:
//! - `getSignaturesForAddress` (paged with `before`, newest first)
//! - `getTransaction` (`json` encoding, `maxSupportedTransactionVersion: 0`)
//!
//! Only the fields the scan needs are decoded.

use super::{resolve_account_keys, BalanceMeta, ChainClient, ChainConnector, ChainError, TransactionDetail};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use solana_pubkey::Pubkey;
use solana_transaction_status::UiTransactionEncoding;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    /// `getTransaction` and `getSignaturesForAddress` reject `processed`.
    fn at_least_confirmed(self) -> Self {
        match self {
            Commitment::Processed => Commitment::Confirmed,
            other => other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SignatureInfo {
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    slot: u64,
    block_time: Option<i64>,
    meta: Option<RpcTransactionMeta>,
    transaction: RpcTransactionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransactionMeta {
    err: Option<Value>,
    pre_balances: Vec<u64>,
    post_balances: Vec<u64>,
    #[serde(default)]
    loaded_addresses: Option<RpcLoadedAddresses>,
}

#[derive(Debug, Default, Deserialize)]
struct RpcLoadedAddresses {
    #[serde(default)]
    writable: Vec<String>,
    #[serde(default)]
    readonly: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RpcTransactionBody {
    signatures: Vec<String>,
    message: RpcMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcMessage {
    account_keys: Vec<String>,
}

impl RpcTransaction {
    fn into_detail(self, requested: &str) -> TransactionDetail {
        let loaded = self
            .meta
            .as_ref()
            .and_then(|m| m.loaded_addresses.as_ref());

        let account_keys = match loaded {
            Some(loaded) => resolve_account_keys(
                &self.transaction.message.account_keys,
                &loaded.writable,
                &loaded.readonly,
            ),
            None => self.transaction.message.account_keys.clone(),
        };

        let signature = self
            .transaction
            .signatures
            .first()
            .cloned()
            .unwrap_or_else(|| requested.to_string());

        TransactionDetail {
            signature,
            slot: self.slot,
            block_time: self.block_time,
            account_keys,
            meta: self.meta.map(|m| BalanceMeta {
                failed: m.err.as_ref().map_or(false, |e| !e.is_null()),
                pre_balances: m.pre_balances,
                post_balances: m.post_balances,
            }),
        }
    }
}

/// JSON-RPC client bound to one endpoint.
pub struct RpcChainClient {
    http: reqwest::Client,
    endpoint: String,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl RpcChainClient {
    pub fn new(endpoint: &str, commitment: Commitment, timeout: Duration) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            commitment,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self.http.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(ChainError::Status(response.status().as_u16()));
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("{}: {}", method, e)))?;

        if let Some(err) = envelope.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        Ok(envelope.result)
    }

    fn signature_page_options(&self, before: Option<&str>) -> Value {
        let mut options = json!({ "commitment": self.commitment.at_least_confirmed() });
        if let Some(before) = before {
            options["before"] = json!(before);
        }
        options
    }

    fn transaction_options(&self) -> Value {
        json!({
            "encoding": UiTransactionEncoding::Json,
            "commitment": self.commitment.at_least_confirmed(),
            "maxSupportedTransactionVersion": 0,
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn signatures_before(
        &self,
        address: &Pubkey,
        before: Option<&str>,
    ) -> Result<Vec<String>, ChainError> {
        let options = self.signature_page_options(before);

        let page: Option<Vec<SignatureInfo>> = self
            .call("getSignaturesForAddress", json!([address.to_string(), options]))
            .await?;

        let page = page.ok_or_else(|| ChainError::Decode("getSignaturesForAddress: null result".to_string()))?;

        Ok(page.into_iter().map(|info| info.signature).collect())
    }

    async fn transaction(&self, signature: &str) -> Result<Option<TransactionDetail>, ChainError> {
        let options = self.transaction_options();

        let tx: Option<RpcTransaction> = self.call("getTransaction", json!([signature, options])).await?;

        Ok(tx.map(|tx| tx.into_detail(signature)))
    }
}

/// Connects `RpcChainClient`s with shared commitment and timeout settings.
#[derive(Debug, Clone)]
pub struct RpcConnector {
    pub commitment: Commitment,
    pub timeout: Duration,
}

impl Default for RpcConnector {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ChainConnector for RpcConnector {
    type Client = RpcChainClient;

    fn connect(&self, endpoint: &str) -> Result<Self::Client, ChainError> {
        log::debug!("🔗 Connecting to RPC endpoint {}", endpoint);
        RpcChainClient::new(endpoint, self.commitment, self.timeout)
    }
}
