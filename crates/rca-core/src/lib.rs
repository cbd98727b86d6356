//! Runtime monitor engine for timed contract automata.
//!
//! A contract is an automaton whose transitions carry an assumption
//! (precondition) and a guarantee (postcondition) over observed variables,
//! their bounded history, and clocks split into environment and system time.
//! The monitor tracks every mode consistent with the samples seen so far and
//! derives a sticky verdict blaming the environment or the system.
//!
//! Zero I/O: the engine consumes samples and returns reports.

pub mod clock;
pub mod config;
pub mod constants;
pub mod contract;
pub mod engine;
pub mod error;
pub mod expr;
pub mod guard;
pub mod history;
pub mod monitor;
pub mod sample;
pub mod signature;
pub mod snapshot;
pub mod token;
pub mod truth;
pub mod verdict;
pub mod wire;

pub use clock::{ClockKind, ClockTrace, ClockValuation, TracePolicy};
pub use config::{MonitorConfig, Semantics};
pub use constants::{TIME_ENV_KEY, TIME_SYS_KEY};
pub use contract::{Automaton, Contract, Mode, Transition};
pub use error::{ContractError, EvalFault, SampleError};
pub use expr::{ArithOp, CmpOp, Expr, Literal};
pub use guard::{Guard, UnderflowPolicy};
pub use monitor::{Monitor, Monitoring, StepReport, build_monitor};
pub use sample::{Sample, SampleFormat};
pub use signature::{Role, Signature, Value, VarType, Variable};
pub use snapshot::MonitorSnapshot;
pub use token::{Token, TokenSet};
pub use truth::{BooleanLogic, FuzzyLogic, FuzzySettings, SNorm, TNorm, TruthDomain};
pub use verdict::{FaultFlags, Verdict};
pub use wire::{CURRENT_VERSION, export_contract_json, import_contract_json};
