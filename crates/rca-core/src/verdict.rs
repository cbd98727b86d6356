use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a monitored run. Both losing states are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    #[default]
    Running,
    EnvironmentLoses,
    SystemLoses,
}

impl Verdict {
    /// Verdict after one step. A settled verdict never changes; otherwise no
    /// enabled precondition blames the environment, and an empty next
    /// generation blames the system.
    pub fn judge(self, any_pre: bool, next_is_empty: bool) -> Verdict {
        match self {
            Verdict::Running if !any_pre => Verdict::EnvironmentLoses,
            Verdict::Running if next_is_empty => Verdict::SystemLoses,
            settled => settled,
        }
    }

    pub fn is_settled(&self) -> bool {
        *self != Verdict::Running
    }

    pub fn environment_loses(&self) -> bool {
        *self == Verdict::EnvironmentLoses
    }

    pub fn system_loses(&self) -> bool {
        *self == Verdict::SystemLoses
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Running => "RUNNING",
            Verdict::EnvironmentLoses => "ENVIRONMENT_LOSES",
            Verdict::SystemLoses => "SYSTEM_LOSES",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "ENVIRONMENT_LOSES" => Verdict::EnvironmentLoses,
            "SYSTEM_LOSES" => Verdict::SystemLoses,
            _ => Verdict::Running,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// History underflows seen during the current step. Cleared at each update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultFlags {
    pub precondition_accessed_incorrect_time: bool,
    pub postcondition_accessed_incorrect_time: bool,
}

impl FaultFlags {
    pub fn any(&self) -> bool {
        self.precondition_accessed_incorrect_time || self.postcondition_accessed_incorrect_time
    }

    pub fn merge(&mut self, other: FaultFlags) {
        self.precondition_accessed_incorrect_time |= other.precondition_accessed_incorrect_time;
        self.postcondition_accessed_incorrect_time |= other.postcondition_accessed_incorrect_time;
    }
}
