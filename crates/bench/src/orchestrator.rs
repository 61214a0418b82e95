//! Harness orchestration.
//!
//! Prepares fee resources, pairs them with selected targets, waits for the
//! start gate, runs every channel concurrently, and aggregates the results.

use crate::channel::{Channel, ChannelError};
use crate::config::{ConfigError, HarnessConfig};
use crate::context::RunContext;
use crate::forge::{ForgeError, ResourceForge};
use crate::report::{ChannelReport, ChannelStatus, RunReport};
use crate::selector::{SeededSelector, SelectionError};
use crate::start_gate::StartGate;
use std::time::Instant;
use thiserror::Error;
use tps_bench_client::LedgerError;
use tracing::{error, info};

/// Errors that stop a run before any channel starts.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fee resource preparation failed: {0}")]
    Forge(#[from] ForgeError),

    #[error("Target selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Runs a full throughput measurement.
pub struct Harness {
    ctx: RunContext,
    config: HarnessConfig,
}

impl Harness {
    /// Create a new harness. Fails if the configuration cannot run.
    pub fn new(ctx: RunContext, config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;

        info!(
            address = %ctx.address(),
            target_count = config.target_count(),
            pool = config.target_pool.len(),
            iterations = config.channel.iterations,
            operations_per_submission = config.channel.operations_per_submission,
            "Harness created"
        );

        Ok(Self { ctx, config })
    }

    /// Ensure fee resources and pair each with a selected target.
    pub async fn prepare(&self) -> Result<Vec<Channel>, HarnessError> {
        let resources = ResourceForge::new(self.ctx.clone(), self.config.forge.clone())
            .ensure_ready_resources()
            .await?;

        let selector = SeededSelector::new(self.config.target_pool.clone());
        let caller = self.ctx.address().to_string();
        let targets = selector.select(self.config.selection, &caller, resources.len())?;

        Ok(resources
            .into_iter()
            .zip(targets)
            .enumerate()
            .map(|(index, (fee_resource, target))| {
                Channel::new(index, fee_resource, target, self.config.channel.clone())
            })
            .collect())
    }

    /// Run the full measurement.
    ///
    /// This will:
    /// 1. Record the account balance
    /// 2. Prepare one channel per fee resource
    /// 3. Wait for the start gate
    /// 4. Run all channels concurrently and wait for every one to end
    /// 5. Record the balance again and build the report
    ///
    /// Channel failures are reported, not returned.
    pub async fn run(self) -> Result<RunReport, HarnessError> {
        let address = self.ctx.address();
        let balance_before = self.ctx.ledger().get_balance(&address).await?;

        let channels = self.prepare().await?;
        StartGate::parse(&self.config.start_time).wait().await;

        info!(channels = channels.len(), "Launching channels");
        let start = Instant::now();
        let reports = run_channels(&self.ctx, channels).await;
        let elapsed = start.elapsed();

        let balance_after = self.ctx.ledger().get_balance(&address).await?;
        let report = RunReport::new(
            reports,
            self.config.channel.iterations,
            self.config.channel.operations_per_submission,
            elapsed,
            balance_before,
            balance_after,
        );

        info!(
            successful = report.successful_channels,
            failed = report.failed_channels(),
            total_operations = report.total_operations,
            elapsed_secs = elapsed.as_secs_f64(),
            throughput = report.throughput,
            "Run complete"
        );
        Ok(report)
    }
}

/// Run every channel on its own task and wait for all of them.
///
/// One channel failing never stops the others. A task that panics counts as
/// a failed channel.
pub async fn run_channels(ctx: &RunContext, channels: Vec<Channel>) -> Vec<ChannelReport> {
    let handles: Vec<_> = channels
        .into_iter()
        .map(|channel| {
            let ctx = ctx.clone();
            let ids = (channel.index, channel.fee_resource, channel.target);
            (ids, tokio::spawn(async move { channel.run(&ctx).await }))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for ((index, fee_resource, target), handle) in handles {
        let status = match handle.await {
            Ok(Ok(outcome)) => ChannelStatus::Completed {
                digest: outcome.last_digest,
            },
            Ok(Err(ChannelError {
                channel,
                iteration,
                kind,
            })) => {
                error!(channel, iteration, error = %kind, "Channel failed");
                ChannelStatus::Failed {
                    iteration,
                    error: kind.to_string(),
                }
            }
            Err(e) => {
                error!(channel = index, error = %e, "Channel task aborted");
                ChannelStatus::Failed {
                    iteration: 0,
                    error: e.to_string(),
                }
            }
        };
        reports.push(ChannelReport {
            index,
            fee_resource,
            target,
            status,
        });
    }
    reports
}
