//! Fee resource preparation.
//!
//! Every channel needs its own fee-paying coin so that channels never contend
//! on an owned object. The forge checks whether the account already holds
//! enough coins above the minimum balance and, if not, consolidates its coins
//! into the largest one and splits fresh coins off it in a single composite
//! transaction. Ledger indexing lags execution, so after each forge it waits
//! for the settle delay and checks again.

use crate::context::RunContext;
use std::time::Duration;
use thiserror::Error;
use tps_bench_client::{get_all_coins, LedgerError};
use tps_bench_types::{
    sui_to_mist, Argument, BuildError, Coin, ExecutionStatus, ObjectId, TransactionBuilder,
    TransactionDigest, MAX_COMMANDS,
};
use tracing::{debug, info, warn};

/// Coins merged into the primary coin per forge transaction.
pub const MAX_MERGE_SOURCES: usize = 499;

/// Largest number of coins one forge transaction can split off.
///
/// One merge command plus a split and a transfer per coin.
pub const MAX_FORGE_TARGETS: usize = (MAX_COMMANDS - 1) / 2;

/// Errors from fee resource preparation.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("Insufficient funds: {available} MIST available, {required} MIST required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Fee resources still not ready after {attempts} forge attempts")]
    Exhausted { attempts: u32 },

    #[error("Forge transaction rejected: {0}")]
    SubmissionRejected(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to build forge transaction: {0}")]
    Build(#[from] BuildError),
}

/// Configuration for fee resource preparation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForgeConfig {
    /// Number of fee resources to provide.
    pub target_count: usize,
    /// Balance a coin needs to count as ready, in MIST.
    pub min_balance: u64,
    /// Balance of each newly forged coin, in MIST.
    pub split_amount: u64,
    /// Funds kept on top of the split total for the forge's own fee, in MIST.
    pub safety_buffer: u64,
    /// Gas budget of the forge transaction, in MIST.
    pub gas_budget: u64,
    /// Wait after a forge before rechecking.
    pub settle_delay: Duration,
    /// Forge transactions attempted before giving up.
    pub max_attempts: u32,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            target_count: 5,
            min_balance: sui_to_mist(0.04),
            split_amount: sui_to_mist(0.07),
            safety_buffer: sui_to_mist(0.05),
            gas_budget: sui_to_mist(0.05),
            settle_delay: Duration::from_secs(3),
            max_attempts: 5,
        }
    }
}

impl ForgeConfig {
    pub fn new(target_count: usize) -> Self {
        Self {
            target_count,
            ..Default::default()
        }
    }

    /// Set the minimum balance and the split amount, in MIST.
    pub fn with_amounts(mut self, min_balance: u64, split_amount: u64) -> Self {
        self.min_balance = min_balance;
        self.split_amount = split_amount;
        self
    }

    pub fn with_safety_buffer(mut self, buffer: u64) -> Self {
        self.safety_buffer = buffer;
        self
    }

    pub fn with_gas_budget(mut self, budget: u64) -> Self {
        self.gas_budget = budget;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Funds needed to forge `target_count` coins, in MIST.
    pub fn required_balance(&self) -> u64 {
        self.split_amount
            .saturating_mul(self.target_count as u64)
            .saturating_add(self.safety_buffer)
    }
}

/// Pick `target_count` coins at or above `min_balance`, richest first.
///
/// Returns `None` when there are not enough such coins.
pub fn select_ready(
    coins: &[Coin],
    target_count: usize,
    min_balance: u64,
) -> Option<Vec<ObjectId>> {
    let mut ready: Vec<&Coin> = coins.iter().filter(|c| c.balance >= min_balance).collect();
    if ready.len() < target_count {
        return None;
    }
    ready.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.id().cmp(&b.id())));
    Some(ready.into_iter().take(target_count).map(Coin::id).collect())
}

/// Guarantees the account owns enough independent fee resources.
pub struct ResourceForge {
    ctx: RunContext,
    config: ForgeConfig,
}

impl ResourceForge {
    pub fn new(ctx: RunContext, config: ForgeConfig) -> Self {
        Self { ctx, config }
    }

    /// Return exactly `target_count` distinct coins, each holding at least
    /// `min_balance`, forging new ones if needed.
    ///
    /// If the account is already ready no transaction is submitted. Transport
    /// failures are absorbed by the settle-then-recheck loop; any other
    /// failure aborts.
    pub async fn ensure_ready_resources(&self) -> Result<Vec<ObjectId>, ForgeError> {
        let owner = self.ctx.address();
        let max_attempts = self.config.max_attempts;

        for attempt in 0..=max_attempts {
            let coins = match get_all_coins(self.ctx.ledger(), &owner).await {
                Ok(coins) => coins,
                Err(e) if e.is_transport() && attempt < max_attempts => {
                    warn!(error = %e, "Coin scan failed, retrying");
                    self.settle().await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(ready) =
                select_ready(&coins, self.config.target_count, self.config.min_balance)
            {
                info!(count = ready.len(), forged = attempt, "Fee resources ready");
                return Ok(ready);
            }
            if attempt == max_attempts {
                break;
            }

            info!(
                attempt = attempt + 1,
                max_attempts,
                owned = coins.len(),
                target_count = self.config.target_count,
                "Not enough fee resources, forging"
            );
            match self.forge(coins).await {
                Ok(digest) => info!(%digest, "Forge transaction executed"),
                Err(ForgeError::Ledger(e)) if e.is_transport() => {
                    warn!(error = %e, "Forge submission lost, rechecking after settle delay");
                }
                Err(e) => return Err(e),
            }
            self.settle().await;
        }

        Err(ForgeError::Exhausted {
            attempts: max_attempts,
        })
    }

    /// Merge the richest coins into the largest one and split off
    /// `target_count` coins of `split_amount` each, returned to the owner.
    async fn forge(&self, mut coins: Vec<Coin>) -> Result<TransactionDigest, ForgeError> {
        let owner = self.ctx.address();
        let required = self.config.required_balance();

        coins.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.id().cmp(&b.id())));
        coins.truncate(MAX_MERGE_SOURCES + 1);
        // Only coins that take part in the merge count towards the available funds.
        let available = coins
            .iter()
            .map(|c| c.balance)
            .fold(0u64, u64::saturating_add);

        let Some((primary, sources)) = coins.split_first() else {
            return Err(ForgeError::InsufficientFunds {
                available: 0,
                required,
            });
        };
        if available < required {
            return Err(ForgeError::InsufficientFunds {
                available,
                required,
            });
        }

        let mut tx = TransactionBuilder::new();
        let gas = tx.gas();
        let sources: Vec<Argument> = sources.iter().map(|c| tx.object(c.id())).collect();
        debug!(primary = %primary.id(), merged = sources.len(), "Building forge transaction");
        if !sources.is_empty() {
            tx.merge_coins(gas, sources);
        }

        let recipient = tx.pure_address(owner);
        let amount = tx.pure_u64(self.config.split_amount);
        for _ in 0..self.config.target_count {
            let coin = tx.split_coins(gas, vec![amount]);
            tx.transfer_objects(vec![coin], recipient);
        }
        tx.set_gas_payment(primary.object_ref.clone())
            .set_gas_budget(self.config.gas_budget);

        let response = match self.ctx.submit(tx.build(owner)?).await {
            Ok(response) => response,
            Err(LedgerError::Rpc { code, message }) => {
                return Err(ForgeError::SubmissionRejected(format!("{code}: {message}")));
            }
            Err(e) => return Err(e.into()),
        };

        match response.status {
            ExecutionStatus::Success => Ok(response.digest),
            ExecutionStatus::Failure { error } => Err(ForgeError::SubmissionRejected(error)),
        }
    }

    async fn settle(&self) {
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
    }
}
