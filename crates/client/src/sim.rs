//! In-memory simulated ledger.
//!
//! Models just enough of an object ledger to exercise the harness without a
//! network: owned coins and shared counters, per-object versions and digests,
//! gas charging, and rejection of stale gas references. Behaviour is
//! deterministic for a given seed.
//!
//! Faults can be injected per gas coin, keyed by the n-th submission paying
//! with that coin, to exercise failure paths.

use crate::ledger::{ExecuteOptions, LedgerClient, LedgerError, ObjectInfo, Page};
use crate::signer::{SignedTransaction, Signer, SignerError};
use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;
use tps_bench_types::{
    Argument, CallArg, Coin, Command, ExecutionStatus, ObjectChange, ObjectDigest, ObjectId,
    ObjectRef, Owner, PureArg, SequenceNumber, SuiAddress, TransactionData, TransactionDigest,
    TransactionResponse,
};
use tracing::debug;

/// Object type of simulated fee coins.
pub const SIM_COIN_TYPE: &str = "0x2::coin::Coin<0x2::sui::SUI>";

/// JSON-RPC error code used for rejected submissions.
const REJECTED_CODE: i64 = -32002;

/// Simulated ledger parameters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Seed for ids and digests.
    pub seed: u64,
    /// Coins returned per page.
    pub page_size: usize,
    /// Fixed fee per transaction, in MIST.
    pub base_fee: u64,
    /// Additional fee per command, in MIST.
    pub per_command_fee: u64,
    /// Artificial delay applied to every call.
    pub latency: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            page_size: 50,
            base_fee: 1_000_000,
            per_command_fee: 2_000,
            latency: Duration::ZERO,
        }
    }
}

impl SimConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Fault injected into one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimFault {
    /// Reject before execution with the given message.
    Reject(String),
    /// Fail as if the connection dropped. Nothing executes.
    Transport,
    /// Execute normally but leave the gas coin out of the reported changes.
    OmitGasChange,
}

#[derive(Debug, Clone)]
enum SimObjectKind {
    Coin { balance: u64 },
    Counter { value: u64 },
}

#[derive(Debug, Clone)]
struct SimObject {
    version: SequenceNumber,
    digest: ObjectDigest,
    owner: Owner,
    object_type: String,
    kind: SimObjectKind,
}

impl SimObject {
    fn object_ref(&self, id: ObjectId) -> ObjectRef {
        ObjectRef::new(id, self.version, self.digest.clone())
    }
}

#[derive(Debug)]
struct SimState {
    objects: BTreeMap<ObjectId, SimObject>,
    rng: ChaCha8Rng,
    faults: HashMap<(ObjectId, u64), SimFault>,
    submissions: HashMap<ObjectId, u64>,
    last_digests: HashMap<ObjectId, TransactionDigest>,
    executed: u64,
}

impl SimState {
    fn random_id(&mut self) -> ObjectId {
        ObjectId(self.rng.gen())
    }

    fn random_digest(&mut self) -> String {
        hex::encode(self.rng.gen::<[u8; 16]>())
    }
}

/// Deterministic in-memory ledger.
#[derive(Debug)]
pub struct SimLedger {
    config: SimConfig,
    state: Mutex<SimState>,
}

impl SimLedger {
    pub fn new(config: SimConfig) -> Self {
        let state = SimState {
            objects: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            faults: HashMap::new(),
            submissions: HashMap::new(),
            last_digests: HashMap::new(),
            executed: 0,
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        // Execution commits in one step, so a poisoned table is still consistent.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create a coin owned by `owner`.
    pub fn mint_coin(&self, owner: SuiAddress, balance: u64) -> ObjectId {
        let mut state = self.lock();
        let id = state.random_id();
        let digest = ObjectDigest(state.random_digest());
        state.objects.insert(
            id,
            SimObject {
                version: SequenceNumber(1),
                digest,
                owner: Owner::AddressOwner(owner),
                object_type: SIM_COIN_TYPE.to_string(),
                kind: SimObjectKind::Coin { balance },
            },
        );
        id
    }

    /// Register a shared counter under a known id. Existing ids are left alone.
    pub fn register_shared_object(&self, id: ObjectId, object_type: impl Into<String>) {
        let mut state = self.lock();
        if state.objects.contains_key(&id) {
            return;
        }
        let digest = ObjectDigest(state.random_digest());
        state.objects.insert(
            id,
            SimObject {
                version: SequenceNumber(1),
                digest,
                owner: Owner::Shared {
                    initial_shared_version: SequenceNumber(1),
                },
                object_type: object_type.into(),
                kind: SimObjectKind::Counter { value: 0 },
            },
        );
    }

    /// Create a shared counter with a fresh id.
    pub fn create_shared_object(&self, object_type: impl Into<String>) -> ObjectId {
        let id = self.lock().random_id();
        self.register_shared_object(id, object_type);
        id
    }

    /// Inject a fault into the `nth` (1-based) submission paying with `gas_coin`.
    pub fn inject_fault(&self, gas_coin: ObjectId, nth: u64, fault: SimFault) {
        self.lock().faults.insert((gas_coin, nth), fault);
    }

    /// Submissions received that paid with `gas_coin`, including rejected ones.
    pub fn submissions(&self, gas_coin: &ObjectId) -> u64 {
        self.lock().submissions.get(gas_coin).copied().unwrap_or(0)
    }

    /// Digest of the latest executed transaction that paid with `gas_coin`.
    pub fn last_digest(&self, gas_coin: &ObjectId) -> Option<TransactionDigest> {
        self.lock().last_digests.get(gas_coin).cloned()
    }

    /// Transactions that reached execution (successful or failed).
    pub fn executed_count(&self) -> u64 {
        self.lock().executed
    }

    pub fn coin_balance(&self, id: &ObjectId) -> Option<u64> {
        match self.lock().objects.get(id).map(|o| &o.kind) {
            Some(SimObjectKind::Coin { balance }) => Some(*balance),
            _ => None,
        }
    }

    pub fn counter_value(&self, id: &ObjectId) -> Option<u64> {
        match self.lock().objects.get(id).map(|o| &o.kind) {
            Some(SimObjectKind::Counter { value }) => Some(*value),
            _ => None,
        }
    }

    /// Ids of coins owned by `owner`, in ledger order.
    pub fn coins_of(&self, owner: &SuiAddress) -> Vec<ObjectId> {
        self.lock()
            .objects
            .iter()
            .filter(|(_, o)| is_coin_of(o, owner))
            .map(|(id, _)| *id)
            .collect()
    }

    async fn simulate_latency(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }

    fn execute(&self, data: &TransactionData) -> Result<TransactionResponse, LedgerError> {
        let mut state = self.lock();
        let gas_id = data.gas_payment.object_id;

        let nth = {
            let count = state.submissions.entry(gas_id).or_insert(0);
            *count += 1;
            *count
        };
        let fault = state.faults.remove(&(gas_id, nth));
        match &fault {
            Some(SimFault::Reject(message)) => return Err(rejected(message.clone())),
            Some(SimFault::Transport) => {
                return Err(LedgerError::Transport("simulated connection reset".to_string()));
            }
            _ => {}
        }

        let gas = state
            .objects
            .get(&gas_id)
            .ok_or_else(|| rejected(format!("gas object {gas_id} does not exist")))?;
        if !is_coin_of(gas, &data.sender) {
            return Err(rejected(format!(
                "gas object {gas_id} is not a coin owned by {}",
                data.sender
            )));
        }
        if gas.version != data.gas_payment.version || gas.digest != data.gas_payment.digest {
            return Err(rejected(format!(
                "Object {} is not available for consumption, its current version: {}",
                data.gas_payment, gas.version
            )));
        }
        let gas_balance = coin_balance_of(gas);
        if gas_balance < data.gas_budget {
            return Err(rejected(format!(
                "gas balance {gas_balance} below budget {}",
                data.gas_budget
            )));
        }

        state.executed += 1;
        let cost = self.config.base_fee + self.config.per_command_fee * data.commands.len() as u64;

        let outcome = if cost > data.gas_budget {
            Err(format!(
                "InsufficientGas: cost {cost} exceeds budget {}",
                data.gas_budget
            ))
        } else {
            run_commands(&mut state, data)
        };

        let (status, mut working, effects) = match outcome {
            Ok((working, effects)) => (ExecutionStatus::Success, working, effects),
            Err(error) => {
                debug!(%gas_id, %error, "Simulated execution failed");
                (
                    ExecutionStatus::Failure { error },
                    state.objects.clone(),
                    Effects::default(),
                )
            }
        };

        // Failed executions still pay for gas.
        let charge = if status.is_success() {
            cost
        } else {
            data.gas_budget.min(cost)
        };
        if let Some(SimObjectKind::Coin { balance }) =
            working.get_mut(&gas_id).map(|o| &mut o.kind)
        {
            *balance = balance.saturating_sub(charge);
        }

        let mut mutated: BTreeSet<ObjectId> = effects.mutated.clone();
        mutated.insert(gas_id);

        let new_version = SequenceNumber(
            mutated
                .iter()
                .chain(effects.deleted.iter())
                .filter_map(|id| state.objects.get(id))
                .map(|o| o.version.0)
                .max()
                .unwrap_or(0)
                + 1,
        );

        let mut changes = Vec::new();
        for id in &effects.created {
            let digest = ObjectDigest(state.random_digest());
            if let Some(object) = working.get_mut(id) {
                object.version = new_version;
                object.digest = digest.clone();
                changes.push(ObjectChange::Created {
                    sender: data.sender,
                    owner: object.owner.clone(),
                    object_type: object.object_type.clone(),
                    object_id: *id,
                    version: new_version,
                    digest,
                });
            }
        }
        for id in &mutated {
            let digest = ObjectDigest(state.random_digest());
            let previous_version = state.objects.get(id).map(|o| o.version).unwrap_or_default();
            if let Some(object) = working.get_mut(id) {
                object.version = new_version;
                object.digest = digest.clone();
                if *id == gas_id && fault == Some(SimFault::OmitGasChange) {
                    continue;
                }
                changes.push(ObjectChange::Mutated {
                    sender: data.sender,
                    owner: object.owner.clone(),
                    object_type: object.object_type.clone(),
                    object_id: *id,
                    version: new_version,
                    previous_version,
                    digest,
                });
            }
        }
        for id in &effects.deleted {
            if let Some(object) = state.objects.get(id) {
                changes.push(ObjectChange::Deleted {
                    sender: data.sender,
                    object_type: object.object_type.clone(),
                    object_id: *id,
                    version: new_version,
                });
            }
        }

        state.objects = working;
        let digest = TransactionDigest(state.random_digest());
        state.last_digests.insert(gas_id, digest.clone());

        Ok(TransactionResponse {
            digest,
            status,
            object_changes: changes,
        })
    }
}

#[derive(Debug, Default)]
struct Effects {
    created: BTreeSet<ObjectId>,
    mutated: BTreeSet<ObjectId>,
    deleted: BTreeSet<ObjectId>,
}

fn rejected(message: String) -> LedgerError {
    LedgerError::Rpc {
        code: REJECTED_CODE,
        message,
    }
}

fn is_coin_of(object: &SimObject, owner: &SuiAddress) -> bool {
    matches!(object.kind, SimObjectKind::Coin { .. })
        && matches!(object.owner, Owner::AddressOwner(a) if a == *owner)
}

fn coin_balance_of(object: &SimObject) -> u64 {
    match object.kind {
        SimObjectKind::Coin { balance } => balance,
        SimObjectKind::Counter { .. } => 0,
    }
}

/// Execute all commands against a copy of the object table.
fn run_commands(
    state: &mut SimState,
    data: &TransactionData,
) -> Result<(BTreeMap<ObjectId, SimObject>, Effects), String> {
    let mut working = state.objects.clone();
    let mut effects = Effects::default();
    let mut results: Vec<Vec<ObjectId>> = Vec::with_capacity(data.commands.len());
    let gas_id = data.gas_payment.object_id;

    // The budget stays reserved on the gas coin while commands run.
    let reserved = data.gas_budget;

    let resolve_object = |arg: &Argument, results: &[Vec<ObjectId>]| -> Result<ObjectId, String> {
        match *arg {
            Argument::GasCoin => Ok(gas_id),
            Argument::Input(i) => match data.inputs.get(i as usize) {
                Some(CallArg::Object(id)) => Ok(*id),
                other => Err(format!("input {i} is not an object: {other:?}")),
            },
            Argument::Result(i) => match results.get(i as usize).map(Vec::as_slice) {
                Some([id]) => Ok(*id),
                other => Err(format!("result {i} is not a single object: {other:?}")),
            },
            Argument::NestedResult(i, j) => results
                .get(i as usize)
                .and_then(|r| r.get(j as usize))
                .copied()
                .ok_or_else(|| format!("nested result ({i}, {j}) out of range")),
        }
    };
    let resolve_pure = |arg: &Argument| -> Result<&PureArg, String> {
        match *arg {
            Argument::Input(i) => match data.inputs.get(i as usize) {
                Some(CallArg::Pure(value)) => Ok(value),
                other => Err(format!("input {i} is not a pure value: {other:?}")),
            },
            other => Err(format!("expected pure input, got {other:?}")),
        }
    };
    let resolve_objects =
        |args: &[Argument], results: &[Vec<ObjectId>]| -> Result<Vec<ObjectId>, String> {
            let mut ids = Vec::new();
            for arg in args {
                match *arg {
                    // A whole result vector expands to its elements.
                    Argument::Result(i) => ids.extend(
                        results
                            .get(i as usize)
                            .ok_or_else(|| format!("result {i} out of range"))?
                            .iter()
                            .copied(),
                    ),
                    _ => ids.push(resolve_object(arg, results)?),
                }
            }
            Ok(ids)
        };

    for command in &data.commands {
        let produced = match command {
            Command::MoveCall { target, arguments } => {
                if target.function.starts_with("create") {
                    let id = state.random_id();
                    working.insert(
                        id,
                        SimObject {
                            version: SequenceNumber::default(),
                            digest: ObjectDigest(String::new()),
                            owner: Owner::Shared {
                                initial_shared_version: SequenceNumber::default(),
                            },
                            object_type: format!("{}::{}::Counter", target.package, target.module),
                            kind: SimObjectKind::Counter { value: 0 },
                        },
                    );
                    effects.created.insert(id);
                    vec![id]
                } else {
                    for arg in arguments {
                        let id = resolve_object(arg, &results)?;
                        let object = working
                            .get_mut(&id)
                            .ok_or_else(|| format!("object {id} not found"))?;
                        match (&object.owner, &mut object.kind) {
                            (Owner::Shared { .. }, SimObjectKind::Counter { value }) => {
                                *value += 1;
                            }
                            _ => return Err(format!("object {id} is not a shared counter")),
                        }
                        if !effects.created.contains(&id) {
                            effects.mutated.insert(id);
                        }
                    }
                    Vec::new()
                }
            }
            Command::MergeCoins {
                destination,
                sources,
            } => {
                let destination = resolve_object(destination, &results)?;
                let mut total = 0u64;
                for source in resolve_objects(sources, &results)? {
                    if source == destination || source == gas_id {
                        return Err(format!("cannot merge {source} into {destination}"));
                    }
                    let object = working
                        .remove(&source)
                        .ok_or_else(|| format!("coin {source} not found"))?;
                    if !is_coin_of(&object, &data.sender) {
                        return Err(format!("{source} is not a coin owned by the sender"));
                    }
                    total += coin_balance_of(&object);
                    if effects.created.remove(&source) {
                        continue;
                    }
                    effects.mutated.remove(&source);
                    effects.deleted.insert(source);
                }
                match working.get_mut(&destination).map(|o| &mut o.kind) {
                    Some(SimObjectKind::Coin { balance }) => *balance += total,
                    _ => return Err(format!("{destination} is not a coin")),
                }
                if !effects.created.contains(&destination) {
                    effects.mutated.insert(destination);
                }
                Vec::new()
            }
            Command::SplitCoins { coin, amounts } => {
                let source = resolve_object(coin, &results)?;
                let mut new_coins = Vec::with_capacity(amounts.len());
                for amount in amounts {
                    let amount = match resolve_pure(amount)? {
                        PureArg::U64(value) => *value,
                        other => return Err(format!("split amount must be u64, got {other:?}")),
                    };
                    let available = match working.get(&source).map(|o| &o.kind) {
                        Some(SimObjectKind::Coin { balance }) if source == gas_id => {
                            balance.saturating_sub(reserved)
                        }
                        Some(SimObjectKind::Coin { balance }) => *balance,
                        _ => return Err(format!("{source} is not a coin")),
                    };
                    if available < amount {
                        return Err(format!(
                            "InsufficientCoinBalance: {source} has {available}, needs {amount}"
                        ));
                    }
                    if let Some(SimObjectKind::Coin { balance }) =
                        working.get_mut(&source).map(|o| &mut o.kind)
                    {
                        *balance -= amount;
                    }

                    let id = state.random_id();
                    working.insert(
                        id,
                        SimObject {
                            version: SequenceNumber::default(),
                            digest: ObjectDigest(String::new()),
                            owner: Owner::AddressOwner(data.sender),
                            object_type: SIM_COIN_TYPE.to_string(),
                            kind: SimObjectKind::Coin { balance: amount },
                        },
                    );
                    effects.created.insert(id);
                    new_coins.push(id);
                }
                if !effects.created.contains(&source) {
                    effects.mutated.insert(source);
                }
                new_coins
            }
            Command::TransferObjects { objects, recipient } => {
                let recipient = match recipient {
                    Argument::Input(_) => match resolve_pure(recipient)? {
                        PureArg::Address(address) => *address,
                        other => return Err(format!("recipient must be an address, got {other:?}")),
                    },
                    other => return Err(format!("recipient must be a pure input, got {other:?}")),
                };
                for id in resolve_objects(objects, &results)? {
                    if id == gas_id {
                        return Err("gas coin cannot be transferred".to_string());
                    }
                    let object = working
                        .get_mut(&id)
                        .ok_or_else(|| format!("object {id} not found"))?;
                    if !matches!(object.owner, Owner::AddressOwner(a) if a == data.sender) {
                        return Err(format!("{id} is not owned by the sender"));
                    }
                    object.owner = Owner::AddressOwner(recipient);
                    if !effects.created.contains(&id) {
                        effects.mutated.insert(id);
                    }
                }
                Vec::new()
            }
        };
        results.push(produced);
    }

    Ok((working, effects))
}

#[async_trait]
impl LedgerClient for SimLedger {
    async fn get_coins(
        &self,
        owner: &SuiAddress,
        cursor: Option<String>,
    ) -> Result<Page<Coin>, LedgerError> {
        self.simulate_latency().await;

        let after = cursor
            .map(|cursor| cursor.parse::<ObjectId>())
            .transpose()
            .map_err(|e| LedgerError::Rpc {
                code: -32602,
                message: format!("invalid cursor: {e}"),
            })?;

        let state = self.lock();
        let mut coins = state
            .objects
            .iter()
            .filter(|(id, _)| after.map_or(true, |after| **id > after))
            .filter(|(_, o)| is_coin_of(o, owner))
            .map(|(id, o)| Coin {
                object_ref: o.object_ref(*id),
                balance: coin_balance_of(o),
            });

        let data: Vec<Coin> = coins.by_ref().take(self.config.page_size).collect();
        let has_next_page = coins.next().is_some();
        let next_cursor = data.last().map(|coin| coin.id().to_string());

        Ok(Page {
            data,
            next_cursor,
            has_next_page,
        })
    }

    async fn get_balance(&self, owner: &SuiAddress) -> Result<u64, LedgerError> {
        self.simulate_latency().await;
        Ok(self
            .lock()
            .objects
            .values()
            .filter(|o| is_coin_of(o, owner))
            .map(coin_balance_of)
            .sum())
    }

    async fn get_object(&self, id: &ObjectId) -> Result<ObjectInfo, LedgerError> {
        self.simulate_latency().await;
        let state = self.lock();
        let object = state
            .objects
            .get(id)
            .ok_or(LedgerError::ObjectNotFound(*id))?;
        Ok(ObjectInfo {
            object_ref: object.object_ref(*id),
            object_type: Some(object.object_type.clone()),
        })
    }

    async fn execute_transaction(
        &self,
        tx: SignedTransaction,
        options: ExecuteOptions,
    ) -> Result<TransactionResponse, LedgerError> {
        self.simulate_latency().await;
        let mut response = self.execute(&tx.data)?;
        if !options.show_object_changes {
            response.object_changes.clear();
        }
        Ok(response)
    }
}

/// Signer accepted only by [`SimLedger`]. Produces no wire bytes or signatures.
#[derive(Debug, Clone)]
pub struct SimSigner {
    address: SuiAddress,
}

impl SimSigner {
    pub fn new(address: SuiAddress) -> Self {
        Self { address }
    }
}

#[async_trait]
impl Signer for SimSigner {
    fn address(&self) -> SuiAddress {
        self.address
    }

    async fn sign(&self, data: TransactionData) -> Result<SignedTransaction, SignerError> {
        if data.sender != self.address {
            return Err(SignerError::WrongSender {
                sender: data.sender,
                signer: self.address,
            });
        }
        Ok(SignedTransaction {
            data,
            tx_bytes: String::new(),
            signatures: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tps_bench_types::{MoveTarget, TransactionBuilder};

    fn owner() -> SuiAddress {
        "0xa11ce".parse().unwrap()
    }

    async fn submit(
        ledger: &SimLedger,
        data: TransactionData,
    ) -> Result<TransactionResponse, LedgerError> {
        let signed = SimSigner::new(data.sender).sign(data).await?;
        ledger
            .execute_transaction(signed, ExecuteOptions::default())
            .await
    }

    async fn gas_ref(ledger: &SimLedger, id: ObjectId) -> ObjectRef {
        ledger.get_object(&id).await.unwrap().object_ref
    }

    #[tokio::test]
    async fn test_pagination_covers_all_coins() {
        let ledger = SimLedger::new(SimConfig::default().with_page_size(3));
        for i in 0..8 {
            ledger.mint_coin(owner(), 100 + i);
        }
        ledger.mint_coin("0xb0b".parse().unwrap(), 5);

        let coins = crate::ledger::get_all_coins(&ledger, &owner())
            .await
            .unwrap();
        assert_eq!(coins.len(), 8);
        assert_eq!(
            ledger.get_balance(&owner()).await.unwrap(),
            (100..108).sum::<u64>()
        );
    }

    #[tokio::test]
    async fn test_move_call_bumps_gas_version() {
        let ledger = SimLedger::new(SimConfig::default());
        let gas = ledger.mint_coin(owner(), 1_000_000_000);
        let counter = ledger.create_shared_object("0xabc::counter::Counter");
        let target: MoveTarget = "0xabc::counter::increment".parse().unwrap();

        let before = gas_ref(&ledger, gas).await;
        let mut tx = TransactionBuilder::new();
        let arg = tx.object(counter);
        tx.move_call(target.clone(), vec![arg]);
        tx.move_call(target, vec![arg]);
        tx.set_gas_payment(before.clone()).set_gas_budget(5_000_000);

        let response = submit(&ledger, tx.build(owner()).unwrap()).await.unwrap();
        assert!(response.status.is_success());

        let after = response.find_mutated(&gas).expect("gas coin mutated");
        assert!(after.version > before.version);
        assert_eq!(after, gas_ref(&ledger, gas).await);
        assert_eq!(ledger.counter_value(&counter), Some(2));
        assert_eq!(ledger.coin_balance(&gas), Some(1_000_000_000 - 1_004_000));
    }

    #[tokio::test]
    async fn test_stale_gas_reference_is_rejected() {
        let ledger = SimLedger::new(SimConfig::default());
        let gas = ledger.mint_coin(owner(), 1_000_000_000);
        let counter = ledger.create_shared_object("0xabc::counter::Counter");
        let target: MoveTarget = "0xabc::counter::increment".parse().unwrap();
        let stale = gas_ref(&ledger, gas).await;

        for expect_ok in [true, false] {
            let mut tx = TransactionBuilder::new();
            let arg = tx.object(counter);
            tx.move_call(target.clone(), vec![arg]);
            tx.set_gas_payment(stale.clone()).set_gas_budget(5_000_000);
            let result = submit(&ledger, tx.build(owner()).unwrap()).await;
            assert_eq!(result.is_ok(), expect_ok);
        }
        assert_eq!(ledger.submissions(&gas), 2);
        assert_eq!(ledger.executed_count(), 1);
    }

    #[tokio::test]
    async fn test_merge_and_split() {
        let ledger = SimLedger::new(SimConfig::default());
        let primary = ledger.mint_coin(owner(), 500_000_000);
        let small = ledger.mint_coin(owner(), 200_000_000);

        let mut tx = TransactionBuilder::new();
        let gas = tx.gas();
        let source = tx.object(small);
        tx.merge_coins(gas, vec![source]);
        let me = tx.pure_address(owner());
        for _ in 0..3 {
            let amount = tx.pure_u64(100_000_000);
            let split = tx.split_coins(gas, vec![amount]);
            tx.transfer_objects(vec![split], me);
        }
        tx.set_gas_payment(gas_ref(&ledger, primary).await)
            .set_gas_budget(50_000_000);

        let response = submit(&ledger, tx.build(owner()).unwrap()).await.unwrap();
        assert!(response.status.is_success(), "{:?}", response.status);

        let created = response.created_of_type("Coin");
        assert_eq!(created.len(), 3);
        let deleted = response
            .object_changes
            .iter()
            .any(|c| matches!(c, ObjectChange::Deleted { object_id, .. } if *object_id == small));
        assert!(deleted);
        assert_eq!(ledger.coins_of(&owner()).len(), 4);

        let cost = 1_000_000 + 2_000 * 7;
        assert_eq!(
            ledger.get_balance(&owner()).await.unwrap(),
            700_000_000 - cost
        );
    }

    #[tokio::test]
    async fn test_split_cannot_spend_reserved_budget() {
        let ledger = SimLedger::new(SimConfig::default());
        let primary = ledger.mint_coin(owner(), 100_000_000);

        let mut tx = TransactionBuilder::new();
        let gas = tx.gas();
        let amount = tx.pure_u64(60_000_000);
        tx.split_coins(gas, vec![amount]);
        tx.set_gas_payment(gas_ref(&ledger, primary).await)
            .set_gas_budget(50_000_000);

        let response = submit(&ledger, tx.build(owner()).unwrap()).await.unwrap();
        assert!(!response.status.is_success());
        // Gas is charged and the coin still moves to a new version.
        assert!(response.find_mutated(&primary).is_some());
        assert!(ledger.coin_balance(&primary).unwrap() < 100_000_000);
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let ledger = SimLedger::new(SimConfig::default());
        let gas = ledger.mint_coin(owner(), 1_000_000_000);
        let counter = ledger.create_shared_object("0xabc::counter::Counter");
        let target: MoveTarget = "0xabc::counter::increment".parse().unwrap();

        ledger.inject_fault(gas, 1, SimFault::Transport);
        ledger.inject_fault(gas, 2, SimFault::OmitGasChange);

        let build = |gas_ref: ObjectRef| {
            let mut tx = TransactionBuilder::new();
            let arg = tx.object(counter);
            tx.move_call(target.clone(), vec![arg]);
            tx.set_gas_payment(gas_ref).set_gas_budget(5_000_000);
            tx.build(owner()).unwrap()
        };

        let first = submit(&ledger, build(gas_ref(&ledger, gas).await)).await;
        assert!(matches!(first, Err(ref e) if e.is_transport()));

        let second = submit(&ledger, build(gas_ref(&ledger, gas).await))
            .await
            .unwrap();
        assert!(second.status.is_success());
        assert!(second.find_mutated(&gas).is_none());
        assert_eq!(ledger.counter_value(&counter), Some(1));
    }

    #[tokio::test]
    async fn test_create_call_mints_shared_counter() {
        let ledger = SimLedger::new(SimConfig::default());
        let gas = ledger.mint_coin(owner(), 1_000_000_000);
        let registry = ledger.create_shared_object("0xabc::counter::GlobalState");
        let create: MoveTarget = "0xabc::counter::create_counter".parse().unwrap();

        let mut tx = TransactionBuilder::new();
        let arg = tx.object(registry);
        for _ in 0..4 {
            tx.move_call(create.clone(), vec![arg]);
        }
        tx.set_gas_payment(gas_ref(&ledger, gas).await)
            .set_gas_budget(500_000_000);

        let response = submit(&ledger, tx.build(owner()).unwrap()).await.unwrap();
        let counters = response.created_of_type("::Counter");
        assert_eq!(counters.len(), 4);
        assert_eq!(ledger.counter_value(&counters[0]), Some(0));
    }
}
