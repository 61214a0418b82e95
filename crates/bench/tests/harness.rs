//! End-to-end tests for the harness.
//!
//! Each test drives a full run against the in-memory ledger, from fee
//! resource preparation to the final report.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tps_bench::{
    ChannelStatus, ForgeConfig, ForgeError, Harness, HarnessConfig, HarnessError, RunContext,
    SelectionMode,
};
use tps_bench_client::{SimConfig, SimFault, SimLedger, SimSigner};
use tps_bench_types::{MoveTarget, ObjectId, SuiAddress, MIST_PER_SUI};

const RUN_TIMEOUT: Duration = Duration::from_secs(10);

const COUNTER_TYPE: &str = "0xabc::counter::Counter";

fn owner() -> SuiAddress {
    "0xbe4c".parse().unwrap()
}

fn call() -> MoveTarget {
    "0xabc::counter::increment".parse().unwrap()
}

struct Fixture {
    ledger: Arc<SimLedger>,
    pool: Vec<ObjectId>,
}

impl Fixture {
    fn new(pool_size: usize) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let ledger = Arc::new(SimLedger::new(SimConfig::default()));
        let pool = (0..pool_size)
            .map(|_| ledger.create_shared_object(COUNTER_TYPE))
            .collect();
        Self { ledger, pool }
    }

    fn ctx(&self) -> RunContext {
        RunContext::new(self.ledger.clone(), Arc::new(SimSigner::new(owner())))
    }

    fn config(&self, target_count: usize, iterations: u64, operations: usize) -> HarnessConfig {
        HarnessConfig::new(call(), self.pool.clone())
            .with_target_count(target_count)
            .with_iterations(iterations)
            .with_operations_per_submission(operations)
            .with_forge(ForgeConfig::default().with_settle_delay(Duration::ZERO))
    }
}

// ============================================================================
// Successful Runs
// ============================================================================

#[tokio::test]
async fn test_full_run_forges_and_completes() {
    let fixture = Fixture::new(4);
    fixture.ledger.mint_coin(owner(), 10 * MIST_PER_SUI);

    let config = fixture.config(3, 3, 20);
    let harness = Harness::new(fixture.ctx(), config).unwrap();
    let report = timeout(RUN_TIMEOUT, harness.run()).await.unwrap().unwrap();

    assert_eq!(report.channels.len(), 3);
    assert_eq!(report.successful_channels, 3);
    assert_eq!(report.failed_channels(), 0);
    assert_eq!(report.total_operations, 3 * 3 * 20);
    // Each channel reports the digest of its own third submission.
    for channel in &report.channels {
        let expected = fixture.ledger.last_digest(&channel.fee_resource);
        assert!(expected.is_some());
        assert_eq!(
            channel.status,
            ChannelStatus::Completed { digest: expected }
        );
        assert_eq!(fixture.ledger.submissions(&channel.fee_resource), 3);
    }

    // Default window selection takes the first three targets.
    for target in &fixture.pool[..3] {
        assert_eq!(fixture.ledger.counter_value(target), Some(3 * 20));
    }
    assert_eq!(fixture.ledger.counter_value(&fixture.pool[3]), Some(0));

    // One forge of three splits and three transfers, then nine submissions
    // of twenty operations each.
    let forge_cost = 1_000_000 + 2_000 * 6;
    let submission_cost = 1_000_000 + 2_000 * 20;
    assert_eq!(
        report.balance_delta,
        (forge_cost + 9 * submission_cost) as i128
    );
    assert_eq!(report.balance_before, 10 * MIST_PER_SUI);
}

#[tokio::test]
async fn test_ready_account_skips_forge() {
    let fixture = Fixture::new(2);
    let coins: Vec<ObjectId> = (0..2)
        .map(|_| fixture.ledger.mint_coin(owner(), 100_000_000))
        .collect();

    let config = fixture.config(2, 1, 5);
    let report = Harness::new(fixture.ctx(), config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.successful_channels, 2);
    // Only the two channel submissions were executed.
    assert_eq!(fixture.ledger.executed_count(), 2);
    for coin in &coins {
        assert_eq!(fixture.ledger.submissions(coin), 1);
    }
}

#[tokio::test]
async fn test_past_start_time_runs_immediately() {
    let fixture = Fixture::new(1);
    fixture.ledger.mint_coin(owner(), MIST_PER_SUI);

    let config = fixture
        .config(1, 2, 1)
        .with_start_time("2000-01-01 00:00:00");
    let report = timeout(
        RUN_TIMEOUT,
        Harness::new(fixture.ctx(), config).unwrap().run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(report.successful_channels, 1);
}

#[tokio::test]
async fn test_shuffle_selection_is_reproducible() {
    let fixture = Fixture::new(10);
    for _ in 0..4 {
        fixture.ledger.mint_coin(owner(), 100_000_000);
    }

    let config = fixture
        .config(4, 1, 1)
        .with_selection(SelectionMode::Shuffle { seed: Some(1234) });
    let harness = Harness::new(fixture.ctx(), config).unwrap();

    let first: Vec<ObjectId> = harness
        .prepare()
        .await
        .unwrap()
        .iter()
        .map(|c| c.target)
        .collect();
    let second: Vec<ObjectId> = harness
        .prepare()
        .await
        .unwrap()
        .iter()
        .map(|c| c.target)
        .collect();

    assert_eq!(first, second);
    let mut distinct = first.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), 4);
    assert!(first.iter().all(|t| fixture.pool.contains(t)));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_channel_does_not_stop_others() {
    let fixture = Fixture::new(4);
    let coins: Vec<ObjectId> = (0..4)
        .map(|_| fixture.ledger.mint_coin(owner(), 100_000_000))
        .collect();
    fixture
        .ledger
        .inject_fault(coins[1], 2, SimFault::OmitGasChange);
    fixture
        .ledger
        .inject_fault(coins[2], 3, SimFault::Transport);

    let config = fixture.config(4, 3, 10);
    let report = timeout(
        RUN_TIMEOUT,
        Harness::new(fixture.ctx(), config).unwrap().run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(report.successful_channels, 2);
    assert_eq!(report.failed_channels(), 2);
    assert_eq!(report.total_operations, 2 * 3 * 10);

    let status_of = |coin: ObjectId| {
        report
            .channels
            .iter()
            .find(|c| c.fee_resource == coin)
            .map(|c| c.status.clone())
            .unwrap()
    };
    assert!(matches!(status_of(coins[1]), ChannelStatus::Failed { iteration: 2, .. }));
    assert!(matches!(status_of(coins[2]), ChannelStatus::Failed { iteration: 3, .. }));
    assert!(matches!(status_of(coins[0]), ChannelStatus::Completed { .. }));
    assert!(matches!(status_of(coins[3]), ChannelStatus::Completed { .. }));

    // The failing channel stopped at its second submission.
    assert_eq!(fixture.ledger.submissions(&coins[1]), 2);
    assert_eq!(fixture.ledger.submissions(&coins[0]), 3);
}

#[tokio::test]
async fn test_insufficient_funds_aborts_before_launch() {
    let fixture = Fixture::new(5);
    fixture.ledger.mint_coin(owner(), 100_000_000);

    let config = fixture.config(5, 1, 1);
    let err = Harness::new(fixture.ctx(), config)
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Forge(ForgeError::InsufficientFunds { .. })
    ));
    assert_eq!(fixture.ledger.executed_count(), 0);
    for target in &fixture.pool {
        assert_eq!(fixture.ledger.counter_value(target), Some(0));
    }
}
