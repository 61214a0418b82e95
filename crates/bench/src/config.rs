//! Configuration types for the harness.
//!
//! `HarnessConfig` is what the harness runs on. It can be assembled in code
//! with the `with_*` setters, or loaded from a JSON file laid out per network
//! (`FileConfig`), flattened to the selected network (`ActiveConfig`) and
//! converted.

use crate::channel::ChannelSettings;
use crate::forge::{ForgeConfig, MAX_FORGE_TARGETS};
use crate::selector::SelectionMode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tps_bench_client::fullnode_url;
use tps_bench_types::{sui_to_mist, MoveTarget, ObjectId, MAX_COMMANDS};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No `{section}` entry for network {network}")]
    MissingNetwork {
        section: &'static str,
        network: String,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("{field} must not be negative, got {value}")]
    NegativeValue { field: &'static str, value: i64 },

    #[error("Target count must be at least 1")]
    ZeroTargetCount,

    #[error("Iterations must be at least 1")]
    ZeroIterations,

    #[error("Target count {requested} exceeds the target pool of {available}")]
    TargetPoolTooSmall { requested: usize, available: usize },

    #[error("Target count {requested} exceeds the {max} fee resources one forge can create")]
    TooManyTargets { requested: usize, max: usize },

    #[error("Operations per submission must be between 1 and {max}, got {value}")]
    InvalidOperationsPerSubmission { value: usize, max: usize },

    #[error("Gas budget must be positive")]
    ZeroGasBudget,

    #[error("Split amount {split} MIST is below the minimum balance {min} MIST")]
    SplitBelowThreshold { split: u64, min: u64 },

    #[error("No RPC endpoint for network {network} at index {index}")]
    NoRpcEndpoint { network: String, index: usize },
}

/// Configuration for a harness run.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Fee resource preparation. `forge.target_count` is the number of channels.
    pub forge: ForgeConfig,

    /// Per-channel submission parameters.
    pub channel: ChannelSettings,

    /// Ordered pool of shared targets to select from.
    pub target_pool: Vec<ObjectId>,

    /// How targets are selected from the pool.
    pub selection: SelectionMode,

    /// `YYYY-MM-DD HH:mm:ss` local start time. Empty starts immediately.
    pub start_time: String,
}

impl HarnessConfig {
    /// Create a configuration applying `call` to targets from `target_pool`.
    pub fn new(call: MoveTarget, target_pool: Vec<ObjectId>) -> Self {
        Self {
            forge: ForgeConfig::default(),
            channel: ChannelSettings::new(call, 10),
            target_pool,
            selection: SelectionMode::default(),
            start_time: String::new(),
        }
    }

    /// Set the number of channels.
    pub fn with_target_count(mut self, count: usize) -> Self {
        self.forge.target_count = count;
        self
    }

    /// Set the submissions per channel.
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.channel.iterations = iterations;
        self
    }

    /// Set the pause between submissions of one channel.
    pub fn with_iteration_interval(mut self, interval: Duration) -> Self {
        self.channel.interval = interval;
        self
    }

    pub fn with_operations_per_submission(mut self, operations: usize) -> Self {
        self.channel.operations_per_submission = operations;
        self
    }

    /// Set the gas budget of each channel submission, in MIST.
    pub fn with_gas_budget(mut self, budget: u64) -> Self {
        self.channel.gas_budget = budget;
        self
    }

    /// Replace the forge configuration, keeping the current target count.
    pub fn with_forge(mut self, forge: ForgeConfig) -> Self {
        let target_count = self.forge.target_count;
        self.forge = ForgeConfig {
            target_count,
            ..forge
        };
        self
    }

    pub fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = start_time.into();
        self
    }

    /// Number of channels.
    pub fn target_count(&self) -> usize {
        self.forge.target_count
    }

    /// Check the configuration can run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let target_count = self.target_count();
        if target_count == 0 {
            return Err(ConfigError::ZeroTargetCount);
        }
        if target_count > self.target_pool.len() {
            return Err(ConfigError::TargetPoolTooSmall {
                requested: target_count,
                available: self.target_pool.len(),
            });
        }
        if target_count > MAX_FORGE_TARGETS {
            return Err(ConfigError::TooManyTargets {
                requested: target_count,
                max: MAX_FORGE_TARGETS,
            });
        }
        if self.channel.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        let operations = self.channel.operations_per_submission;
        if operations == 0 || operations > MAX_COMMANDS {
            return Err(ConfigError::InvalidOperationsPerSubmission {
                value: operations,
                max: MAX_COMMANDS,
            });
        }
        if self.channel.gas_budget == 0 || self.forge.gas_budget == 0 {
            return Err(ConfigError::ZeroGasBudget);
        }
        // Forged coins must themselves count as ready.
        if self.forge.split_amount < self.forge.min_balance || self.forge.split_amount == 0 {
            return Err(ConfigError::SplitBelowThreshold {
                split: self.forge.split_amount,
                min: self.forge.min_balance,
            });
        }
        Ok(())
    }
}

/// How the file selects targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    /// Consecutive targets from `startCounterIndex`.
    #[default]
    Window,
    Shuffle,
}

/// Object ids deployed on one network.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkObjects {
    pub package: String,
    #[serde(default)]
    pub global_state: Option<String>,
    #[serde(default)]
    pub upgrade_cap: Option<String>,
}

/// The deployed module and its entry points, per network.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSection {
    pub module: String,
    pub op_create_counter: String,
    pub op_operate: String,
    #[serde(flatten)]
    pub networks: BTreeMap<String, NetworkObjects>,
}

/// Fee resource thresholds, in SUI.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSection {
    pub min_sui_threshold: f64,
    pub split_amount_sui: f64,
}

/// Configuration file contents.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub network: String,
    pub target_count: i64,
    #[serde(default)]
    pub start_counter_index: i64,
    #[serde(default)]
    pub rpc_index: i64,
    pub iters: i64,
    /// Milliseconds between submissions of one channel.
    #[serde(default)]
    pub iter_interval: i64,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub selection: SelectionKind,
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
    pub object: ObjectSection,
    pub fee: BTreeMap<String, FeeSection>,
    #[serde(default)]
    pub counters: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub rpcs: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub settle_delay_ms: Option<i64>,
    #[serde(default)]
    pub max_forge_attempts: Option<i64>,
    #[serde(default)]
    pub operations_per_tx: Option<i64>,
    #[serde(default)]
    pub gas_budget: Option<i64>,
}

impl FileConfig {
    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Flatten the per-network sections for the selected network.
    pub fn active(&self) -> Result<ActiveConfig, ConfigError> {
        let network = self.network.clone();
        let missing = |section| ConfigError::MissingNetwork {
            section,
            network: network.clone(),
        };

        let objects = self
            .object
            .networks
            .get(&network)
            .ok_or_else(|| missing("object"))?;
        let fee = *self.fee.get(&network).ok_or_else(|| missing("fee"))?;

        Ok(ActiveConfig {
            network: network.clone(),
            target_count: self.target_count,
            start_counter_index: self.start_counter_index,
            rpc_index: self.rpc_index,
            iters: self.iters,
            iter_interval_ms: self.iter_interval,
            start_time: self.start_time.clone(),
            selection: self.selection,
            shuffle_seed: self.shuffle_seed,
            module: self.object.module.clone(),
            op_create_counter: self.object.op_create_counter.clone(),
            op_operate: self.object.op_operate.clone(),
            package: objects.package.clone(),
            global_state: objects.global_state.clone(),
            upgrade_cap: objects.upgrade_cap.clone(),
            fee,
            counters: self.counters.get(&network).cloned().unwrap_or_default(),
            rpcs: self.rpcs.get(&network).cloned().unwrap_or_default(),
            settle_delay_ms: self.settle_delay_ms,
            max_forge_attempts: self.max_forge_attempts,
            operations_per_tx: self.operations_per_tx,
            gas_budget: self.gas_budget,
        })
    }
}

/// Configuration for the selected network.
#[derive(Debug, Clone)]
pub struct ActiveConfig {
    pub network: String,
    pub target_count: i64,
    pub start_counter_index: i64,
    pub rpc_index: i64,
    pub iters: i64,
    pub iter_interval_ms: i64,
    pub start_time: String,
    pub selection: SelectionKind,
    pub shuffle_seed: Option<u64>,
    pub module: String,
    pub op_create_counter: String,
    pub op_operate: String,
    pub package: String,
    pub global_state: Option<String>,
    pub upgrade_cap: Option<String>,
    pub fee: FeeSection,
    pub counters: Vec<String>,
    pub rpcs: Vec<String>,
    pub settle_delay_ms: Option<i64>,
    pub max_forge_attempts: Option<i64>,
    pub operations_per_tx: Option<i64>,
    pub gas_budget: Option<i64>,
}

impl ActiveConfig {
    /// `rpcs[rpcIndex]` if configured, otherwise the network's public full node.
    pub fn rpc_url(&self) -> Result<String, ConfigError> {
        let index = non_negative("rpcIndex", self.rpc_index)? as usize;
        if let Some(url) = self.rpcs.get(index) {
            return Ok(url.clone());
        }
        fullnode_url(&self.network)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::NoRpcEndpoint {
                network: self.network.clone(),
                index,
            })
    }

    pub fn package_id(&self) -> Result<ObjectId, ConfigError> {
        parse_id("package", &self.package)
    }

    /// The call each operation applies to a target.
    pub fn operate_call(&self) -> Result<MoveTarget, ConfigError> {
        Ok(MoveTarget::new(
            self.package_id()?,
            self.module.clone(),
            self.op_operate.clone(),
        ))
    }

    /// The call that creates a target.
    pub fn create_call(&self) -> Result<MoveTarget, ConfigError> {
        Ok(MoveTarget::new(
            self.package_id()?,
            self.module.clone(),
            self.op_create_counter.clone(),
        ))
    }

    pub fn global_state(&self) -> Result<ObjectId, ConfigError> {
        match &self.global_state {
            Some(id) => parse_id("globalState", id),
            None => Err(ConfigError::InvalidField {
                field: "globalState",
                reason: format!("not configured for {}", self.network),
            }),
        }
    }

    /// The ordered target pool.
    pub fn target_pool(&self) -> Result<Vec<ObjectId>, ConfigError> {
        self.counters
            .iter()
            .map(|id| parse_id("counters", id))
            .collect()
    }

    /// Validate and convert to a `HarnessConfig`.
    pub fn to_harness_config(&self) -> Result<HarnessConfig, ConfigError> {
        let target_count = non_negative("targetCount", self.target_count)? as usize;
        let start = non_negative("startCounterIndex", self.start_counter_index)? as usize;
        let iterations = non_negative("iters", self.iters)?;
        let interval = non_negative("iterInterval", self.iter_interval_ms)?;

        let selection = match self.selection {
            SelectionKind::Window => SelectionMode::Window { start },
            SelectionKind::Shuffle => SelectionMode::Shuffle {
                seed: self.shuffle_seed,
            },
        };

        let mut forge = ForgeConfig::default().with_amounts(
            sui_amount("minSuiThreshold", self.fee.min_sui_threshold)?,
            sui_amount("splitAmountSui", self.fee.split_amount_sui)?,
        );
        if let Some(ms) = self.settle_delay_ms {
            let delay = non_negative("settleDelayMs", ms)?;
            forge = forge.with_settle_delay(Duration::from_millis(delay));
        }
        if let Some(attempts) = self.max_forge_attempts {
            let attempts = non_negative("maxForgeAttempts", attempts)?;
            forge = forge.with_max_attempts(u32::try_from(attempts).unwrap_or(u32::MAX));
        }

        let mut config = HarnessConfig::new(self.operate_call()?, self.target_pool()?)
            .with_forge(forge)
            .with_target_count(target_count)
            .with_iterations(iterations)
            .with_iteration_interval(Duration::from_millis(interval))
            .with_selection(selection)
            .with_start_time(self.start_time.clone());
        if let Some(operations) = self.operations_per_tx {
            config = config.with_operations_per_submission(
                non_negative("operationsPerTx", operations)? as usize,
            );
        }
        if let Some(budget) = self.gas_budget {
            config = config.with_gas_budget(non_negative("gasBudget", budget)?);
        }

        config.validate()?;
        Ok(config)
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_| ConfigError::NegativeValue { field, value })
}

fn sui_amount(field: &'static str, sui: f64) -> Result<u64, ConfigError> {
    if !sui.is_finite() || sui < 0.0 {
        return Err(ConfigError::InvalidField {
            field,
            reason: format!("{sui} is not a non-negative amount"),
        });
    }
    Ok(sui_to_mist(sui))
}

fn parse_id(field: &'static str, value: &str) -> Result<ObjectId, ConfigError> {
    value.parse().map_err(|e| ConfigError::InvalidField {
        field,
        reason: format!("{value}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "network": "testnet",
        "targetCount": 2,
        "startCounterIndex": 1,
        "rpcIndex": 0,
        "iters": 3,
        "iterInterval": 250,
        "startTime": "",
        "object": {
            "module": "counter",
            "opCreateCounter": "create_counter",
            "opOperate": "increment",
            "testnet": { "package": "0xabc", "globalState": "0x5", "upgradeCap": "0x6" },
            "mainnet": { "package": "0xdef" }
        },
        "fee": {
            "testnet": { "minSuiThreshold": 0.04, "splitAmountSui": 0.07 },
            "mainnet": { "minSuiThreshold": 0.1, "splitAmountSui": 0.2 }
        },
        "counters": { "testnet": ["0x11", "0x12", "0x13"] },
        "rpcs": { "testnet": ["http://10.0.0.1:9000"] },
        "settleDelayMs": 500
    }"#;

    fn active(patch: impl FnOnce(&mut serde_json::Value)) -> ActiveConfig {
        let mut value: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        patch(&mut value);
        FileConfig::from_json(&value.to_string())
            .unwrap()
            .active()
            .unwrap()
    }

    #[test]
    fn test_config_creation() {
        let call: MoveTarget = "0xabc::counter::increment".parse().unwrap();
        let config = HarnessConfig::new(call, vec![ObjectId::new([1; 32]); 4])
            .with_target_count(3)
            .with_iterations(7)
            .with_operations_per_submission(100)
            .with_selection(SelectionMode::Window { start: 2 });

        assert_eq!(config.target_count(), 3);
        assert_eq!(config.channel.iterations, 7);
        assert_eq!(config.channel.operations_per_submission, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let call: MoveTarget = "0xabc::counter::increment".parse().unwrap();
        let base = HarnessConfig::new(call, vec![ObjectId::new([1; 32]); 3]).with_target_count(2);

        assert!(matches!(
            base.clone().with_target_count(0).validate(),
            Err(ConfigError::ZeroTargetCount)
        ));
        assert!(matches!(
            base.clone().with_target_count(4).validate(),
            Err(ConfigError::TargetPoolTooSmall {
                requested: 4,
                available: 3
            })
        ));
        assert!(matches!(
            base.clone().with_iterations(0).validate(),
            Err(ConfigError::ZeroIterations)
        ));
        assert!(matches!(
            base.clone().with_operations_per_submission(1025).validate(),
            Err(ConfigError::InvalidOperationsPerSubmission { value: 1025, .. })
        ));
        assert!(matches!(
            base.clone()
                .with_forge(ForgeConfig::default().with_amounts(100, 50))
                .validate(),
            Err(ConfigError::SplitBelowThreshold {
                split: 50,
                min: 100
            })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let active = FileConfig::load(file.path()).unwrap().active().unwrap();
        assert_eq!(active.rpc_url().unwrap(), "http://10.0.0.1:9000");
        assert_eq!(active.upgrade_cap.as_deref(), Some("0x6"));

        let config = active.to_harness_config().unwrap();
        assert_eq!(config.target_count(), 2);
        assert_eq!(config.channel.iterations, 3);
        assert_eq!(config.channel.interval, Duration::from_millis(250));
        assert_eq!(
            config.channel.call,
            "0xabc::counter::increment".parse::<MoveTarget>().unwrap()
        );
        assert_eq!(config.selection, SelectionMode::Window { start: 1 });
        assert_eq!(config.target_pool.len(), 3);
        assert_eq!(config.forge.min_balance, 40_000_000);
        assert_eq!(config.forge.split_amount, 70_000_000);
        assert_eq!(config.forge.settle_delay, Duration::from_millis(500));
        assert_eq!(
            active.global_state().unwrap(),
            "0x5".parse::<ObjectId>().unwrap()
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_negative_counts_are_rejected() {
        let config = active(|v| v["targetCount"] = (-1).into());
        assert!(matches!(
            config.to_harness_config(),
            Err(ConfigError::NegativeValue {
                field: "targetCount",
                value: -1
            })
        ));

        let config = active(|v| v["startCounterIndex"] = (-3).into());
        assert!(matches!(
            config.to_harness_config(),
            Err(ConfigError::NegativeValue { field: "startCounterIndex", .. })
        ));
    }

    #[test]
    fn test_shuffle_selection() {
        let config = active(|v| {
            v["selection"] = "shuffle".into();
            v["shuffleSeed"] = 77.into();
        });
        assert_eq!(
            config.to_harness_config().unwrap().selection,
            SelectionMode::Shuffle { seed: Some(77) }
        );
    }

    #[test]
    fn test_rpc_falls_back_to_public_fullnode() {
        let config = active(|v| v["rpcIndex"] = 4.into());
        assert!(config.rpc_url().unwrap().contains("testnet"));

        let config = active(|v| {
            v["network"] = "moonnet".into();
            v["object"]["moonnet"] = serde_json::json!({ "package": "0x1" });
            v["fee"]["moonnet"] =
                serde_json::json!({ "minSuiThreshold": 0.1, "splitAmountSui": 0.2 });
        });
        assert!(matches!(config.rpc_url(), Err(ConfigError::NoRpcEndpoint { .. })));
        assert!(matches!(config.to_harness_config(), Err(ConfigError::TargetPoolTooSmall { .. })));
    }

    #[test]
    fn test_missing_network_section() {
        let mut value: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        value["network"] = "devnet".into();
        let err = FileConfig::from_json(&value.to_string())
            .unwrap()
            .active()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingNetwork { section: "object", .. }));
    }
}
