use std::fmt;

/// A contract that cannot be turned into a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    InvalidIdentifier(String),
    DuplicateVariable(String),
    DuplicateMode(String),
    NoInitialMode,
    /// A transition names a mode that is not declared.
    UnknownMode { transition: usize, mode: String },
    /// `at` describes where the reference occurs, e.g. `transition 3 pre`.
    UnknownVariable { name: String, at: String },
    UnknownClock { name: String, at: String },
    HistoryTooDeep {
        name: String,
        depth: usize,
        declared: usize,
        at: String,
    },
    HistoryForUnknown(String),
    UnresolvedSymbol { symbol: String, at: String },
    AmbiguousSymbol { symbol: String, at: String },
    /// Wire-format problems: bad JSON, unsupported version.
    Format(String),
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractError::InvalidIdentifier(name) => write!(f, "invalid identifier: {name:?}"),
            ContractError::DuplicateVariable(name) => write!(f, "duplicate variable: {name}"),
            ContractError::DuplicateMode(name) => write!(f, "duplicate mode: {name}"),
            ContractError::NoInitialMode => write!(f, "contract has no initial mode"),
            ContractError::UnknownMode { transition, mode } => {
                write!(f, "transition {transition} references unknown mode {mode}")
            }
            ContractError::UnknownVariable { name, at } => {
                write!(f, "{at}: unknown variable {name}")
            }
            ContractError::UnknownClock { name, at } => write!(f, "{at}: unknown clock {name}"),
            ContractError::HistoryTooDeep {
                name,
                depth,
                declared,
                at,
            } => write!(
                f,
                "{at}: history read {name}[{depth}] exceeds declared depth {declared}"
            ),
            ContractError::HistoryForUnknown(name) => {
                write!(f, "history declared for unknown name {name}")
            }
            ContractError::UnresolvedSymbol { symbol, at } => {
                write!(f, "{at}: symbol {symbol} is not an enumerator of any variable")
            }
            ContractError::AmbiguousSymbol { symbol, at } => write!(
                f,
                "{at}: symbol {symbol} names enumerators with different ordinals"
            ),
            ContractError::Format(msg) => write!(f, "malformed contract: {msg}"),
        }
    }
}

impl std::error::Error for ContractError {}

impl From<serde_json::Error> for ContractError {
    fn from(e: serde_json::Error) -> Self {
        ContractError::Format(e.to_string())
    }
}

/// A sample rejected before it touched the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    MissingVariable(String),
    MissingTime(String),
    InvalidValue { name: String, raw: String },
    /// A typed value that does not belong to the variable's type.
    OutOfRange { name: String, value: String },
    /// A line fragment that is not `key=value`.
    Malformed(String),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::MissingVariable(name) => write!(f, "sample is missing variable {name}"),
            SampleError::MissingTime(key) => write!(f, "sample is missing time delta {key}"),
            SampleError::InvalidValue { name, raw } => {
                write!(f, "cannot parse {raw:?} as a value of {name}")
            }
            SampleError::OutOfRange { name, value } => {
                write!(f, "value {value} is out of range for {name}")
            }
            SampleError::Malformed(part) => write!(f, "malformed sample entry {part:?}"),
        }
    }
}

impl std::error::Error for SampleError {}

/// Failure local to one guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalFault {
    /// History read past what has been recorded so far.
    HistoryUnderflow,
    /// Division by zero or integer overflow.
    Arithmetic,
}

impl fmt::Display for EvalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalFault::HistoryUnderflow => write!(f, "history underflow"),
            EvalFault::Arithmetic => write!(f, "arithmetic fault"),
        }
    }
}

impl std::error::Error for EvalFault {}
