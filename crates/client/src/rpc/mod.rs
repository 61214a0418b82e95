//! JSON-RPC client for submitting transactions to full nodes.

mod types;

pub use types::*;

use crate::ledger::{ExecuteOptions, LedgerClient, LedgerError, ObjectInfo, Page};
use crate::signer::SignedTransaction;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tps_bench_types::{Coin, ObjectId, ObjectRef, SuiAddress, TransactionResponse, GAS_COIN_TYPE};
use tracing::trace;

/// Public full-node endpoint for a named network.
pub fn fullnode_url(network: &str) -> Option<&'static str> {
    match network {
        "mainnet" => Some("https://fullnode.mainnet.sui.io:443"),
        "testnet" => Some("https://fullnode.testnet.sui.io:443"),
        "devnet" => Some("https://fullnode.devnet.sui.io:443"),
        "localnet" => Some("http://127.0.0.1:9000"),
        _ => None,
    }
}

/// Client for reading state and executing transactions via JSON-RPC.
pub struct RpcClient {
    base_url: String,
    client: Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new(base_url: impl Into<String>) -> Result<Self, LedgerError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Get the base URL of this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        trace!(method, id = request.id, "JSON-RPC call");

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;

        let envelope: JsonRpcResponse<T> = serde_json::from_value(body).map_err(|e| {
            LedgerError::MalformedResponse(format!("{method} (HTTP {status}): {e}"))
        })?;

        if let Some(error) = envelope.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| LedgerError::MalformedResponse(format!("{method}: no result")))
    }
}

#[async_trait]
impl LedgerClient for RpcClient {
    async fn get_coins(
        &self,
        owner: &SuiAddress,
        cursor: Option<String>,
    ) -> Result<Page<Coin>, LedgerError> {
        let page: CoinPageResponse = self
            .call(
                "suix_getCoins",
                json!([owner.to_string(), GAS_COIN_TYPE, cursor, Value::Null]),
            )
            .await?;

        Ok(Page {
            data: page.data.into_iter().map(Coin::from).collect(),
            next_cursor: page.next_cursor,
            has_next_page: page.has_next_page,
        })
    }

    async fn get_balance(&self, owner: &SuiAddress) -> Result<u64, LedgerError> {
        let balance: BalanceResponse = self
            .call("suix_getBalance", json!([owner.to_string(), GAS_COIN_TYPE]))
            .await?;
        Ok(balance.total_balance)
    }

    async fn get_object(&self, id: &ObjectId) -> Result<ObjectInfo, LedgerError> {
        let response: ObjectResponse = self
            .call(
                "sui_getObject",
                json!([id.to_string(), { "showType": true }]),
            )
            .await?;

        match response.data {
            Some(data) => Ok(ObjectInfo {
                object_ref: ObjectRef::new(data.object_id, data.version, data.digest),
                object_type: data.object_type,
            }),
            None => Err(LedgerError::ObjectNotFound(*id)),
        }
    }

    async fn execute_transaction(
        &self,
        tx: SignedTransaction,
        options: ExecuteOptions,
    ) -> Result<TransactionResponse, LedgerError> {
        let response: ExecuteResponse = self
            .call(
                "sui_executeTransactionBlock",
                json!([tx.tx_bytes, tx.signatures, options, "WaitForLocalExecution"]),
            )
            .await?;

        let effects = response.effects.ok_or_else(|| {
            LedgerError::MalformedResponse(format!("{}: effects missing", response.digest))
        })?;

        // Object changes are only guaranteed when asked for.
        let object_changes = match (response.object_changes, options.show_object_changes) {
            (Some(changes), _) => changes,
            (None, false) => Vec::new(),
            (None, true) => {
                return Err(LedgerError::MalformedResponse(format!(
                    "{}: object changes missing",
                    response.digest
                )));
            }
        };

        Ok(TransactionResponse {
            digest: response.digest,
            status: effects.status,
            object_changes,
        })
    }
}
