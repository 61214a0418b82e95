//! Creation of shared targets.

use crate::context::RunContext;
use thiserror::Error;
use tps_bench_client::{get_all_coins, LedgerError};
use tps_bench_types::{BuildError, ExecutionStatus, MoveTarget, ObjectId, TransactionBuilder};
use tracing::info;

/// Creation calls per transaction by default.
pub const DEFAULT_CREATE_BATCH_SIZE: usize = 30;

/// Gas budget of a creation transaction, in MIST.
pub const CREATE_GAS_BUDGET: u64 = 500_000_000;

/// Created objects whose type contains this are targets.
pub const TARGET_TYPE_MARKER: &str = "Counter";

/// Errors from target creation.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("Account owns no fee-paying coins")]
    NoFeeResource,

    #[error("Creation transaction rejected: {0}")]
    Rejected(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to build creation transaction: {0}")]
    Build(#[from] BuildError),
}

/// Submit one transaction of `batch_size` calls to `create`, each passing
/// `global_state`, and return the ids of the created targets.
///
/// Paid from the richest coin the account owns.
pub async fn create_targets(
    ctx: &RunContext,
    create: &MoveTarget,
    global_state: ObjectId,
    batch_size: usize,
) -> Result<Vec<ObjectId>, TargetError> {
    let owner = ctx.address();
    let coins = get_all_coins(ctx.ledger(), &owner).await?;
    let gas = coins
        .into_iter()
        .max_by_key(|c| c.balance)
        .ok_or(TargetError::NoFeeResource)?;

    let mut tx = TransactionBuilder::new();
    let state = tx.object(global_state);
    for _ in 0..batch_size {
        tx.move_call(create.clone(), vec![state]);
    }
    tx.set_gas_payment(gas.object_ref)
        .set_gas_budget(CREATE_GAS_BUDGET);

    let response = match ctx.submit(tx.build(owner)?).await {
        Ok(response) => response,
        Err(LedgerError::Rpc { code, message }) => {
            return Err(TargetError::Rejected(format!("{code}: {message}")));
        }
        Err(e) => return Err(e.into()),
    };
    if let ExecutionStatus::Failure { error } = response.status {
        return Err(TargetError::Rejected(error));
    }

    let created = response.created_of_type(TARGET_TYPE_MARKER);
    info!(digest = %response.digest, created = created.len(), "Targets created");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tps_bench_client::{SimConfig, SimLedger, SimSigner};
    use tps_bench_types::{SuiAddress, MIST_PER_SUI};

    fn owner() -> SuiAddress {
        "0x7a6".parse().unwrap()
    }

    #[tokio::test]
    async fn test_creates_batch_of_targets() {
        let ledger = Arc::new(SimLedger::new(SimConfig::default()));
        ledger.mint_coin(owner(), 100_000);
        ledger.mint_coin(owner(), MIST_PER_SUI);
        let global_state = ledger.create_shared_object("0xabc::counter::GlobalState");
        let ctx = RunContext::new(ledger.clone(), Arc::new(SimSigner::new(owner())));
        let create: MoveTarget = "0xabc::counter::create_counter".parse().unwrap();

        let targets = create_targets(&ctx, &create, global_state, 5)
            .await
            .unwrap();

        assert_eq!(targets.len(), 5);
        for id in &targets {
            assert_eq!(ledger.counter_value(id), Some(0));
        }
    }

    #[tokio::test]
    async fn test_no_coins() {
        let ledger = Arc::new(SimLedger::new(SimConfig::default()));
        let ctx = RunContext::new(ledger, Arc::new(SimSigner::new(owner())));
        let create: MoveTarget = "0xabc::counter::create_counter".parse().unwrap();

        let err = create_targets(&ctx, &create, ObjectId::new([1; 32]), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, TargetError::NoFeeResource));
    }
}
