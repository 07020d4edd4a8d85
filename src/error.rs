use crate::{
    config::ConfigError,
    ledger::LedgerError,
    principal::{ContractId, PrincipalError},
    value::{TypeSignature, Value, ValueError},
};

/// Harness-level failures. Application failures are `(err ...)` values and
/// never surface here.
#[derive(Debug, thiserror::Error)]
pub enum SimnetError {
    #[error("unknown contract {0}")]
    UnknownContract(String),

    #[error("contract {contract} has no function {function:?}")]
    UnknownFunction {
        contract: ContractId,
        function: String,
    },

    #[error("unknown account {0:?}")]
    UnknownAccount(String),

    #[error("{contract}::{function} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        contract: ContractId,
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("{contract}::{function} argument {index} ({name}) expects {expected}, got {found}")]
    ArgumentType {
        contract: ContractId,
        function: String,
        index: usize,
        name: String,
        expected: TypeSignature,
        found: Value,
    },

    #[error("{contract}::{function} is read-only and cannot be called as a public function")]
    NotPublic {
        contract: ContractId,
        function: String,
    },

    #[error("public function {contract}::{function} returned {value}, expected a response")]
    NotAResponse {
        contract: ContractId,
        function: String,
        value: Value,
    },

    #[error("runtime error in {contract}::{function}: {source}")]
    Runtime {
        contract: ContractId,
        function: String,
        #[source]
        source: RuntimeError,
    },

    #[error("contract {0} is already deployed")]
    DuplicateContract(ContractId),

    #[error(transparent)]
    Principal(#[from] PrincipalError),

    #[error(transparent)]
    Parse(#[from] ValueError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Faults raised while contract code runs. They abort the call and leave the
/// world state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("{0} is not allowed in a read-only function")]
    WriteInReadOnly(&'static str),

    #[error("unknown fungible token {0:?}")]
    UnknownToken(String),

    #[error("undefined function {0:?}")]
    UndefinedFunction(String),

    #[error("argument {index} is not {expected}")]
    BadArgument { index: usize, expected: &'static str },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
