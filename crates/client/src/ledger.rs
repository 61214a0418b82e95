//! The ledger-facing interface consumed by the harness.

use crate::signer::{SignedTransaction, SignerError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tps_bench_types::{Coin, ObjectId, ObjectRef, SuiAddress, TransactionResponse};

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Cursor to pass to fetch the next page.
    pub next_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Current state of an object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub object_ref: ObjectRef,
    pub object_type: Option<String>,
}

/// What to include in an execution response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOptions {
    pub show_effects: bool,
    pub show_object_changes: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            show_effects: true,
            show_object_changes: true,
        }
    }
}

/// Ledger errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("Signing failed: {0}")]
    Signer(#[from] SignerError),
}

impl LedgerError {
    /// Whether the request may never have reached the ledger.
    pub fn is_transport(&self) -> bool {
        matches!(self, LedgerError::Http(_) | LedgerError::Transport(_))
    }
}

/// Read and submit access to a ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// One page of fee-paying coins owned by `owner`.
    async fn get_coins(
        &self,
        owner: &SuiAddress,
        cursor: Option<String>,
    ) -> Result<Page<Coin>, LedgerError>;

    /// Total fee-coin balance of `owner`, in MIST.
    async fn get_balance(&self, owner: &SuiAddress) -> Result<u64, LedgerError>;

    /// Current reference of an object.
    async fn get_object(&self, id: &ObjectId) -> Result<ObjectInfo, LedgerError>;

    /// Execute a signed transaction and wait for its effects.
    async fn execute_transaction(
        &self,
        tx: SignedTransaction,
        options: ExecuteOptions,
    ) -> Result<TransactionResponse, LedgerError>;
}

/// Fetch every coin owned by `owner`, following pagination to the end.
pub async fn get_all_coins(
    client: &dyn LedgerClient,
    owner: &SuiAddress,
) -> Result<Vec<Coin>, LedgerError> {
    let mut coins = Vec::new();
    let mut cursor = None;
    loop {
        let page = client.get_coins(owner, cursor).await?;
        coins.extend(page.data);
        if !page.has_next_page {
            break;
        }
        cursor = match page.next_cursor {
            Some(next) => Some(next),
            None => {
                return Err(LedgerError::MalformedResponse(
                    "page reports more data but no cursor".to_string(),
                ))
            }
        };
    }
    Ok(coins)
}
