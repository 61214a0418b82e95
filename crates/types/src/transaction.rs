//! Composite transaction model and builder.
//!
//! A composite transaction is an ordered list of commands executed atomically.
//! Commands read their operands from transaction inputs, from the gas coin, or
//! from the results of earlier commands.

use crate::object::{ObjectId, ObjectRef, ParseError, SuiAddress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Maximum number of commands in one transaction.
pub const MAX_COMMANDS: usize = 1024;

/// Maximum number of inputs in one transaction.
pub const MAX_INPUTS: usize = 2048;

/// Fully qualified on-ledger function: `package::module::function`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveTarget {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
}

impl MoveTarget {
    pub fn new(package: ObjectId, module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            package,
            module: module.into(),
            function: function.into(),
        }
    }
}

impl fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.package, self.module, self.function)
    }
}

impl FromStr for MoveTarget {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split("::").collect();
        match parts.as_slice() {
            [package, module, function] if !module.is_empty() && !function.is_empty() => {
                Ok(Self::new(package.parse()?, *module, *function))
            }
            _ => Err(ParseError::InvalidMoveTarget(s.to_string())),
        }
    }
}

/// Pure (non-object) input value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PureArg {
    U64(u64),
    Address(SuiAddress),
}

/// Transaction input.
///
/// Objects are referenced by id only; whether they are owned or shared, and
/// at which version, is resolved by whoever serializes the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallArg {
    Object(ObjectId),
    Pure(PureArg),
}

/// Operand of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Argument {
    /// The coin paying for gas.
    GasCoin,
    /// Index into the transaction inputs.
    Input(u16),
    /// Result of an earlier command.
    Result(u16),
    /// Element of a vector result of an earlier command.
    NestedResult(u16, u16),
}

/// One step of a composite transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    MoveCall {
        target: MoveTarget,
        arguments: Vec<Argument>,
    },
    MergeCoins {
        destination: Argument,
        sources: Vec<Argument>,
    },
    SplitCoins {
        coin: Argument,
        amounts: Vec<Argument>,
    },
    TransferObjects {
        objects: Vec<Argument>,
        recipient: Argument,
    },
}

/// A complete unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub sender: SuiAddress,
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
    /// Exclusive gas payment. The referenced version must be current.
    pub gas_payment: ObjectRef,
    /// Upper bound on the fee, in MIST.
    pub gas_budget: u64,
}

/// Errors from building a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("No gas payment set")]
    MissingGasPayment,

    #[error("Gas budget must be positive")]
    ZeroGasBudget,

    #[error("Transaction has no commands")]
    Empty,

    #[error("Too many commands: {0} (max {MAX_COMMANDS})")]
    TooManyCommands(usize),

    #[error("Too many inputs: {0} (max {MAX_INPUTS})")]
    TooManyInputs(usize),
}

/// Incrementally composes a [`TransactionData`].
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    inputs: Vec<CallArg>,
    object_inputs: HashMap<ObjectId, u16>,
    commands: Vec<Command>,
    gas_payment: Option<ObjectRef>,
    gas_budget: Option<u64>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The gas coin as an operand.
    pub fn gas(&self) -> Argument {
        Argument::GasCoin
    }

    /// Add (or reuse) an object input.
    pub fn object(&mut self, id: ObjectId) -> Argument {
        if let Some(&index) = self.object_inputs.get(&id) {
            return Argument::Input(index);
        }
        let index = self.push_input(CallArg::Object(id));
        self.object_inputs.insert(id, index);
        Argument::Input(index)
    }

    pub fn pure_u64(&mut self, value: u64) -> Argument {
        Argument::Input(self.push_input(CallArg::Pure(PureArg::U64(value))))
    }

    pub fn pure_address(&mut self, address: SuiAddress) -> Argument {
        Argument::Input(self.push_input(CallArg::Pure(PureArg::Address(address))))
    }

    pub fn move_call(&mut self, target: MoveTarget, arguments: Vec<Argument>) -> Argument {
        self.push_command(Command::MoveCall { target, arguments })
    }

    pub fn merge_coins(&mut self, destination: Argument, sources: Vec<Argument>) -> Argument {
        self.push_command(Command::MergeCoins {
            destination,
            sources,
        })
    }

    /// Split `amounts` off `coin`. The result is a vector of new coins.
    pub fn split_coins(&mut self, coin: Argument, amounts: Vec<Argument>) -> Argument {
        self.push_command(Command::SplitCoins { coin, amounts })
    }

    pub fn transfer_objects(&mut self, objects: Vec<Argument>, recipient: Argument) -> Argument {
        self.push_command(Command::TransferObjects { objects, recipient })
    }

    pub fn set_gas_payment(&mut self, gas: ObjectRef) -> &mut Self {
        self.gas_payment = Some(gas);
        self
    }

    pub fn set_gas_budget(&mut self, budget: u64) -> &mut Self {
        self.gas_budget = Some(budget);
        self
    }

    /// Finish the transaction for `sender`.
    pub fn build(self, sender: SuiAddress) -> Result<TransactionData, BuildError> {
        let gas_payment = self.gas_payment.ok_or(BuildError::MissingGasPayment)?;
        let gas_budget = match self.gas_budget {
            Some(0) | None => return Err(BuildError::ZeroGasBudget),
            Some(budget) => budget,
        };
        if self.commands.is_empty() {
            return Err(BuildError::Empty);
        }
        if self.commands.len() > MAX_COMMANDS {
            return Err(BuildError::TooManyCommands(self.commands.len()));
        }
        if self.inputs.len() > MAX_INPUTS {
            return Err(BuildError::TooManyInputs(self.inputs.len()));
        }

        Ok(TransactionData {
            sender,
            inputs: self.inputs,
            commands: self.commands,
            gas_payment,
            gas_budget,
        })
    }

    // Indices saturate; anything past the limits is rejected in `build`.
    fn push_input(&mut self, arg: CallArg) -> u16 {
        let index = u16::try_from(self.inputs.len()).unwrap_or(u16::MAX);
        self.inputs.push(arg);
        index
    }

    fn push_command(&mut self, command: Command) -> Argument {
        let index = u16::try_from(self.commands.len()).unwrap_or(u16::MAX);
        self.commands.push(command);
        Argument::Result(index)
    }
}
