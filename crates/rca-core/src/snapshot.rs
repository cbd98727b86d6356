use std::fmt;

use serde::Serialize;

use crate::clock::ClockValuation;
use crate::signature::{Role, Value};
use crate::verdict::{FaultFlags, Verdict};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariableView {
    pub name: String,
    pub role: Role,
    pub value: Value,
    /// Enumerator label for enumerated variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceView {
    pub clock: String,
    pub entries: Vec<ClockValuation>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TokenView {
    pub mode: String,
    /// Present only under graded semantics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degrees: Option<(f64, f64)>,
    pub traces: Vec<TraceView>,
}

/// Read-only picture of a monitor after a step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub name: String,
    pub step: u64,
    pub values: Vec<VariableView>,
    pub tokens: Vec<TokenView>,
    pub faults: FaultFlags,
    pub verdict: Verdict,
}

fn write_entries(f: &mut fmt::Formatter<'_>, entries: &[ClockValuation]) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in entries.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{v}")?;
    }
    write!(f, "]")
}

impl fmt::Display for MonitorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}Monitor", self.name)?;
        for role in [Role::Input, Role::Output, Role::Internal] {
            let mut group = self.values.iter().filter(|v| v.role == role).peekable();
            if group.peek().is_none() {
                continue;
            }
            for v in group {
                match &v.symbol {
                    Some(symbol) => write!(f, " {} = {symbol},", v.name)?,
                    None => write!(f, " {} = {},", v.name, v.value)?,
                }
            }
            writeln!(f)?;
        }
        for token in &self.tokens {
            match token.degrees {
                Some((assume, guarantee)) => {
                    writeln!(f, "      {}    ({assume},{guarantee})", token.mode)?
                }
                None => writeln!(f, "      {}", token.mode)?,
            }
            for trace in &token.traces {
                writeln!(f, "        {}", trace.clock)?;
                write!(f, "           ")?;
                write_entries(f, &trace.entries)?;
                writeln!(f)?;
            }
        }
        if self.faults.precondition_accessed_incorrect_time {
            writeln!(f, "         (precondition accessed incorrect clock history)")?;
        }
        if self.faults.postcondition_accessed_incorrect_time {
            writeln!(f, "         (postcondition accessed incorrect clock history)")?;
        }
        match self.verdict {
            Verdict::SystemLoses => writeln!(f, "         (SYSTEM LOSES)")?,
            Verdict::EnvironmentLoses => writeln!(f, "         (ENVIRONMENT LOSES)")?,
            Verdict::Running => {}
        }
        Ok(())
    }
}
