//! Submission channels.
//!
//! A channel pairs one fee resource with one shared target and submits a
//! fixed number of composite transactions, strictly one after another. The
//! fee resource's reference is read once and then carried forward from each
//! response's object changes, so the loop never re-reads it from the ledger.

use crate::context::RunContext;
use std::time::Duration;
use thiserror::Error;
use tps_bench_client::LedgerError;
use tps_bench_types::{
    BuildError, ExecutionStatus, MoveTarget, ObjectId, ObjectRef, TransactionBuilder,
    TransactionData, TransactionDigest,
};
use tracing::{debug, info};

/// Operations packed into one submission by default.
pub const DEFAULT_OPERATIONS_PER_SUBMISSION: usize = 1023;

/// Gas budget of one submission by default, in MIST.
pub const DEFAULT_CHANNEL_GAS_BUDGET: u64 = 5_000_000;

/// Why a channel stopped.
#[derive(Debug, Error)]
pub enum ChannelErrorKind {
    #[error("fee resource {id} unavailable: {source}")]
    ResourceUnavailable {
        id: ObjectId,
        #[source]
        source: LedgerError,
    },

    #[error("response carries no mutation of fee resource {0}")]
    ResourceStateMismatch(ObjectId),

    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("transport failure: {0}")]
    Transport(#[source] LedgerError),

    #[error("ledger error: {0}")]
    Ledger(#[source] LedgerError),

    #[error("failed to build submission: {0}")]
    Build(#[from] BuildError),
}

/// A channel failure, tagged with where it happened.
///
/// `iteration` is 1-based; 0 means the failure happened before the first
/// submission.
#[derive(Debug, Error)]
#[error("channel {channel} failed at iteration {iteration}: {kind}")]
pub struct ChannelError {
    pub channel: usize,
    pub iteration: u64,
    pub kind: ChannelErrorKind,
}

/// Result of a channel that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    /// Digest of the final submission. `None` when no iterations were run.
    pub last_digest: Option<TransactionDigest>,
    /// Successful submissions.
    pub submissions: u64,
    /// Times the cached fee resource reference was replaced.
    pub cache_updates: u64,
}

/// Parameters shared by every channel of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Call applied to the shared target once per operation.
    pub call: MoveTarget,
    /// Submissions per channel.
    pub iterations: u64,
    /// Pause after each submission except the last.
    pub interval: Duration,
    pub operations_per_submission: usize,
    /// Gas budget of each submission, in MIST.
    pub gas_budget: u64,
}

impl ChannelSettings {
    pub fn new(call: MoveTarget, iterations: u64) -> Self {
        Self {
            call,
            iterations,
            interval: Duration::ZERO,
            operations_per_submission: DEFAULT_OPERATIONS_PER_SUBMISSION,
            gas_budget: DEFAULT_CHANNEL_GAS_BUDGET,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_operations_per_submission(mut self, operations: usize) -> Self {
        self.operations_per_submission = operations;
        self
    }

    pub fn with_gas_budget(mut self, budget: u64) -> Self {
        self.gas_budget = budget;
        self
    }
}

/// One fee resource driving submissions against one shared target.
#[derive(Debug, Clone)]
pub struct Channel {
    pub index: usize,
    pub fee_resource: ObjectId,
    pub target: ObjectId,
    pub settings: ChannelSettings,
}

impl Channel {
    pub fn new(
        index: usize,
        fee_resource: ObjectId,
        target: ObjectId,
        settings: ChannelSettings,
    ) -> Self {
        Self {
            index,
            fee_resource,
            target,
            settings,
        }
    }

    /// Run every iteration, stopping at the first failure.
    pub async fn run(&self, ctx: &RunContext) -> Result<ChannelOutcome, ChannelError> {
        let mut cached = ctx
            .ledger()
            .get_object(&self.fee_resource)
            .await
            .map_err(|source| {
                self.error(
                    0,
                    ChannelErrorKind::ResourceUnavailable {
                        id: self.fee_resource,
                        source,
                    },
                )
            })?
            .object_ref;

        let iterations = self.settings.iterations;
        let mut outcome = ChannelOutcome {
            last_digest: None,
            submissions: 0,
            cache_updates: 0,
        };

        for iteration in 1..=iterations {
            let data = self
                .build_submission(ctx, cached.clone())
                .map_err(|e| self.error(iteration, e.into()))?;

            let response = ctx
                .submit(data)
                .await
                .map_err(|e| self.error(iteration, classify(e)))?;
            if let ExecutionStatus::Failure { error } = response.status {
                return Err(self.error(iteration, ChannelErrorKind::SubmissionRejected(error)));
            }

            let next = response.find_mutated(&self.fee_resource).ok_or_else(|| {
                self.error(
                    iteration,
                    ChannelErrorKind::ResourceStateMismatch(self.fee_resource),
                )
            })?;
            debug!(
                channel = self.index,
                iteration,
                digest = %response.digest,
                version = %next.version,
                "Submission executed"
            );
            outcome.submissions += 1;
            outcome.last_digest = Some(response.digest);

            if iteration < iterations {
                cached = next;
                outcome.cache_updates += 1;
                if !self.settings.interval.is_zero() {
                    tokio::time::sleep(self.settings.interval).await;
                }
            }
        }

        info!(
            channel = self.index,
            submissions = outcome.submissions,
            "Channel completed"
        );
        Ok(outcome)
    }

    /// One composite transaction applying the call to the target
    /// `operations_per_submission` times, paid with `gas`.
    fn build_submission(
        &self,
        ctx: &RunContext,
        gas: ObjectRef,
    ) -> Result<TransactionData, BuildError> {
        let mut tx = TransactionBuilder::new();
        let target = tx.object(self.target);
        for _ in 0..self.settings.operations_per_submission {
            tx.move_call(self.settings.call.clone(), vec![target]);
        }
        tx.set_gas_payment(gas)
            .set_gas_budget(self.settings.gas_budget);
        tx.build(ctx.address())
    }

    fn error(&self, iteration: u64, kind: ChannelErrorKind) -> ChannelError {
        ChannelError {
            channel: self.index,
            iteration,
            kind,
        }
    }
}

fn classify(error: LedgerError) -> ChannelErrorKind {
    match error {
        e if e.is_transport() => ChannelErrorKind::Transport(e),
        LedgerError::Rpc { code, message } => {
            ChannelErrorKind::SubmissionRejected(format!("{code}: {message}"))
        }
        e => ChannelErrorKind::Ledger(e),
    }
}
