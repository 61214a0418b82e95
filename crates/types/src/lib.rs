//! Core types for tps-bench.
//!
//! This crate models the subset of an object-based ledger the benchmark
//! harness touches:
//!
//! - **Objects**: ids, versions, digests, and the `ObjectRef` triple needed to
//!   spend an owned object without reading it first
//! - **Coins**: fee-paying objects with a balance
//! - **Changes**: tagged per-object effects reported after execution
//! - **Transactions**: the composite command list and its builder

mod amount;
mod change;
mod object;
pub mod serde_helpers;
mod transaction;

pub use amount::{mist_to_sui, signed_mist_to_sui, sui_to_mist, MIST_PER_SUI};
pub use change::{ExecutionStatus, ObjectChange, TransactionResponse};
pub use object::{
    Coin, ObjectDigest, ObjectId, ObjectRef, Owner, ParseError, SequenceNumber, SuiAddress,
    TransactionDigest, ID_LENGTH,
};
pub use transaction::{
    Argument, BuildError, CallArg, Command, MoveTarget, PureArg, TransactionBuilder,
    TransactionData, MAX_COMMANDS, MAX_INPUTS,
};

/// Type tag of the native fee coin.
pub const GAS_COIN_TYPE: &str = "0x2::sui::SUI";
