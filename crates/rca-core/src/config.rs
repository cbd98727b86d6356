use serde::{Deserialize, Serialize};

use crate::clock::TracePolicy;
use crate::guard::UnderflowPolicy;
use crate::truth::FuzzySettings;

/// Truth domain a monitor evaluates guards in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Semantics {
    #[default]
    Boolean,
    Fuzzy(FuzzySettings),
}

/// Runtime policies of a monitor. Every field has a default, so an empty
/// `[monitor]` table is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Collapse structurally identical tokens.
    pub deduplicate: bool,
    pub trace_policy: TracePolicy,
    pub underflow: UnderflowPolicy,
    /// Report `should_stop` once no token is left.
    pub stop_on_empty: bool,
    pub semantics: Semantics,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            deduplicate: false,
            trace_policy: TracePolicy::Bounded,
            underflow: UnderflowPolicy::Fault,
            stop_on_empty: true,
            semantics: Semantics::Boolean,
        }
    }
}
