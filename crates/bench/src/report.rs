//! Run report.

use serde::{Serialize, Serializer};
use std::time::Duration;
use tps_bench_types::{mist_to_sui, signed_mist_to_sui, ObjectId, TransactionDigest, MIST_PER_SUI};

/// How a channel ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ChannelStatus {
    Completed {
        digest: Option<TransactionDigest>,
    },
    Failed {
        iteration: u64,
        error: String,
    },
}

/// Outcome of a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelReport {
    pub index: usize,
    pub fee_resource: ObjectId,
    pub target: ObjectId,
    #[serde(flatten)]
    pub status: ChannelStatus,
}

impl ChannelReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, ChannelStatus::Completed { .. })
    }
}

/// Results of a harness run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub channels: Vec<ChannelReport>,
    pub iterations: u64,
    pub operations_per_submission: usize,
    pub successful_channels: usize,
    /// `successful_channels * iterations * operations_per_submission`.
    pub total_operations: u64,
    #[serde(rename = "elapsedMs", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Operations per second.
    pub throughput: f64,
    /// Account balance before fee resources were prepared, in MIST.
    pub balance_before: u64,
    /// Account balance after all channels ended, in MIST.
    pub balance_after: u64,
    /// `balance_before - balance_after`, in MIST. Positive when fees were spent.
    pub balance_delta: i128,
}

impl RunReport {
    pub fn new(
        channels: Vec<ChannelReport>,
        iterations: u64,
        operations_per_submission: usize,
        elapsed: Duration,
        balance_before: u64,
        balance_after: u64,
    ) -> Self {
        let successful_channels = channels.iter().filter(|c| c.is_completed()).count();
        let total_operations = (successful_channels as u64)
            .saturating_mul(iterations)
            .saturating_mul(operations_per_submission as u64);
        let seconds = elapsed.as_secs_f64();
        let throughput = if seconds > 0.0 {
            total_operations as f64 / seconds
        } else {
            0.0
        };

        Self {
            channels,
            iterations,
            operations_per_submission,
            successful_channels,
            total_operations,
            elapsed,
            throughput,
            balance_before,
            balance_after,
            balance_delta: i128::from(balance_before) - i128::from(balance_after),
        }
    }

    pub fn failed_channels(&self) -> usize {
        self.channels.len() - self.successful_channels
    }

    /// Average spend of one iteration, all channels together, in MIST.
    pub fn average_cost_per_iteration(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.balance_delta as f64 / self.iterations as f64
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Run Summary ===");
        println!(
            "Channels: {} ({} succeeded, {} failed)",
            self.channels.len(),
            self.successful_channels,
            self.failed_channels()
        );
        println!(
            "Iterations per channel: {}, operations per submission: {}",
            self.iterations, self.operations_per_submission
        );
        println!("Total operations: {}", self.total_operations);
        println!("Elapsed: {:.3}s", self.elapsed.as_secs_f64());
        println!("Throughput: {:.2} ops/s", self.throughput);

        println!("\n=== Balance ===");
        println!("Before: {:.9} SUI", mist_to_sui(self.balance_before));
        println!("After:  {:.9} SUI", mist_to_sui(self.balance_after));
        println!("Delta:  {:.9} SUI", signed_mist_to_sui(self.balance_delta));
        println!(
            "Average cost per iteration: {:.9} SUI",
            self.average_cost_per_iteration() / MIST_PER_SUI as f64
        );

        let failures: Vec<_> = self
            .channels
            .iter()
            .filter_map(|c| match &c.status {
                ChannelStatus::Failed { iteration, error } => Some((c, iteration, error)),
                ChannelStatus::Completed { .. } => None,
            })
            .collect();
        if !failures.is_empty() {
            println!("\n=== Failed Channels ===");
            for (channel, iteration, error) in failures {
                println!(
                    "#{} resource {} target {}: iteration {}: {}",
                    channel.index, channel.fee_resource, channel.target, iteration, error
                );
            }
        }
    }
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(index: usize, status: ChannelStatus) -> ChannelReport {
        ChannelReport {
            index,
            fee_resource: ObjectId::new([index as u8; 32]),
            target: ObjectId::new([0xff; 32]),
            status,
        }
    }

    fn completed(index: usize) -> ChannelReport {
        channel(
            index,
            ChannelStatus::Completed {
                digest: Some(TransactionDigest(format!("tx{index}"))),
            },
        )
    }

    #[test]
    fn test_totals_count_only_completed_channels() {
        let channels = vec![
            completed(0),
            channel(
                1,
                ChannelStatus::Failed {
                    iteration: 2,
                    error: "boom".to_string(),
                },
            ),
            completed(2),
        ];
        let report = RunReport::new(channels, 4, 1023, Duration::from_secs(2), 1_000, 400);

        assert_eq!(report.successful_channels, 2);
        assert_eq!(report.failed_channels(), 1);
        assert_eq!(report.total_operations, 2 * 4 * 1023);
        assert!(
            (report.throughput - (2.0 * 4.0 * 1023.0) / 2.0).abs() < 1e-9
        );
        assert_eq!(report.balance_delta, 600);
        assert!((report.average_cost_per_iteration() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_operations_saturates() {
        let report = RunReport::new(
            vec![completed(0), completed(1)],
            u64::MAX / 1000,
            1023,
            Duration::from_secs(1),
            0,
            0,
        );
        assert_eq!(report.total_operations, u64::MAX);
    }

    #[test]
    fn test_zero_elapsed_has_zero_throughput() {
        let report = RunReport::new(vec![completed(0)], 1, 1, Duration::ZERO, 0, 0);
        assert_eq!(report.throughput, 0.0);
        assert_eq!(report.average_cost_per_iteration(), 0.0);
    }

    #[test]
    fn test_serializes_to_json() {
        let report = RunReport::new(vec![completed(0)], 1, 10, Duration::from_millis(1500), 9, 5);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["elapsedMs"], 1500);
        assert_eq!(json["totalOperations"], 10);
        assert_eq!(json["channels"][0]["status"], "completed");
        assert_eq!(json["channels"][0]["digest"], "tx0");
    }
}
