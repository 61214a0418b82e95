//! Throughput harness for shared-object ledgers.
//!
//! Drives many concurrent submission channels, each pairing one fee-paying
//! coin with one shared target, and measures aggregate operations per second.
//!
//! # Components
//!
//! - [`SeededSelector`]: picks targets from a fixed pool by seeded shuffle or
//!   circular window
//! - [`ResourceForge`]: guarantees the account owns enough independent
//!   fee-paying coins, forging new ones when short
//! - [`Channel`]: submits composite transactions back to back, carrying the
//!   fee coin's reference forward from each response
//! - [`Harness`]: prepares, gates, launches, and reports a run
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tps_bench::{Harness, HarnessConfig, RunContext};
//! use tps_bench_client::{SimConfig, SimLedger, SimSigner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let owner = "0xa11ce".parse()?;
//! let ledger = Arc::new(SimLedger::new(SimConfig::default()));
//! ledger.mint_coin(owner, 1_000_000_000);
//! let counter = ledger.create_shared_object("0xabc::counter::Counter");
//!
//! let ctx = RunContext::new(ledger, Arc::new(SimSigner::new(owner)));
//! let config = HarnessConfig::new("0xabc::counter::increment".parse()?, vec![counter])
//!     .with_target_count(1)
//!     .with_iterations(5);
//!
//! let report = Harness::new(ctx, config)?.run().await?;
//! report.print_summary();
//! # Ok(())
//! # }
//! ```

mod channel;
mod config;
mod context;
mod forge;
mod orchestrator;
mod report;
mod selector;
mod start_gate;
mod targets;

pub use channel::{
    Channel, ChannelError, ChannelErrorKind, ChannelOutcome, ChannelSettings,
    DEFAULT_CHANNEL_GAS_BUDGET, DEFAULT_OPERATIONS_PER_SUBMISSION,
};
pub use config::{
    ActiveConfig, ConfigError, FeeSection, FileConfig, HarnessConfig, NetworkObjects,
    ObjectSection, SelectionKind,
};
pub use context::RunContext;
pub use forge::{
    select_ready, ForgeConfig, ForgeError, ResourceForge, MAX_FORGE_TARGETS, MAX_MERGE_SOURCES,
};
pub use orchestrator::{run_channels, Harness, HarnessError};
pub use report::{ChannelReport, ChannelStatus, RunReport};
pub use selector::{seed_from, Lcg, SeededSelector, SelectionError, SelectionMode};
pub use start_gate::{StartGate, START_TIME_FORMAT};
pub use targets::{
    create_targets, TargetError, CREATE_GAS_BUDGET, DEFAULT_CREATE_BATCH_SIZE, TARGET_TYPE_MARKER,
};
