//! Wire types for JSON-RPC communication.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tps_bench_types::serde_helpers::string_u64;
use tps_bench_types::{
    Coin, ExecutionStatus, ObjectChange, ObjectDigest, ObjectId, ObjectRef, SequenceNumber,
    TransactionDigest,
};

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<JsonRpcErrorObject>,
}

/// Error object of a failed JSON-RPC call.
#[derive(Debug, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Entry of `suix_getCoins`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinResponse {
    pub coin_object_id: ObjectId,
    pub version: SequenceNumber,
    pub digest: ObjectDigest,
    #[serde(with = "string_u64")]
    pub balance: u64,
}

impl From<CoinResponse> for Coin {
    fn from(coin: CoinResponse) -> Self {
        Coin {
            object_ref: ObjectRef::new(coin.coin_object_id, coin.version, coin.digest),
            balance: coin.balance,
        }
    }
}

/// Result of `suix_getCoins`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinPageResponse {
    pub data: Vec<CoinResponse>,
    pub next_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Result of `suix_getBalance`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    #[serde(with = "string_u64")]
    pub total_balance: u64,
}

/// Result of `sui_getObject`.
#[derive(Debug, Deserialize)]
pub struct ObjectResponse {
    pub data: Option<ObjectData>,
}

/// Object payload of `sui_getObject`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: ObjectId,
    pub version: SequenceNumber,
    pub digest: ObjectDigest,
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
}

/// Result of `sui_executeTransactionBlock`.
///
/// Effects and object changes are optional on the wire because they are only
/// present when requested.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub digest: TransactionDigest,
    pub effects: Option<EffectsResponse>,
    pub object_changes: Option<Vec<ObjectChange>>,
}

/// Subset of transaction effects the harness reads.
#[derive(Debug, Deserialize)]
pub struct EffectsResponse {
    pub status: ExecutionStatus,
}
