//! Ledger access for tps-bench.
//!
//! - [`LedgerClient`] / [`Signer`]: the interfaces the harness is written against
//! - [`RpcClient`]: JSON-RPC full-node client
//! - [`RemoteSigner`]: delegates signing to an external service
//! - [`SimLedger`] / [`SimSigner`]: deterministic in-memory ledger for dry runs and tests

mod ledger;
pub mod rpc;
mod signer;
pub mod sim;

pub use ledger::{get_all_coins, ExecuteOptions, LedgerClient, LedgerError, ObjectInfo, Page};
pub use rpc::{fullnode_url, RpcClient};
pub use signer::{RemoteSigner, SignedTransaction, Signer, SignerError};
pub use sim::{SimConfig, SimFault, SimLedger, SimSigner};
