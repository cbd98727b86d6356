//! Contract model and its validation into an indexed [`Automaton`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ContractError;
use crate::expr::Expr;
use crate::guard::{Guard, Scope};
use crate::signature::{Role, Signature, VarType};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    pub name: String,
    /// Explicit initial flag; when absent a lowercase first letter marks
    /// the mode initial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<bool>,
}

impl Mode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            initial: None,
        }
    }

    pub fn with_initial(name: &str, initial: bool) -> Self {
        Self {
            name: name.to_string(),
            initial: Some(initial),
        }
    }

    pub fn is_initial(&self) -> bool {
        self.initial.unwrap_or_else(|| {
            self.name
                .chars()
                .next()
                .is_some_and(|c| c.is_lowercase())
        })
    }
}

fn always() -> Expr {
    Expr::truth(true)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    #[serde(default = "always")]
    pub pre: Expr,
    #[serde(default = "always")]
    pub post: Expr,
    #[serde(rename = "resetClocks", default, skip_serializing_if = "Vec::is_empty")]
    pub reset_clocks: Vec<String>,
}

impl Transition {
    pub fn new(from: &str, to: &str, pre: Expr, post: Expr) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            pre,
            post,
            reset_clocks: Vec::new(),
        }
    }

    pub fn resetting(mut self, clocks: &[&str]) -> Self {
        self.reset_clocks = clocks.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// A timed contract automaton as authored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub signature: Signature,
    pub modes: Vec<Mode>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    /// Retention depth per variable or clock name.
    #[serde(default)]
    pub history: BTreeMap<String, usize>,
}

impl Contract {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn build(self) -> Result<Automaton, ContractError> {
        Automaton::new(self)
    }
}

#[derive(Clone, Debug)]
pub struct VarSlot {
    pub name: String,
    pub ty: VarType,
    pub role: Role,
    /// Deepest readable history index.
    pub depth: usize,
}

#[derive(Clone, Debug)]
pub struct ClockSlot {
    pub name: String,
    pub depth: usize,
}

#[derive(Clone, Debug)]
pub struct CompiledTransition {
    pub from: usize,
    pub to: usize,
    pub pre: Guard,
    pub post: Guard,
    pub resets: Vec<usize>,
}

/// Validated contract with every name resolved to an index.
#[derive(Clone, Debug)]
pub struct Automaton {
    pub name: String,
    pub modes: Vec<String>,
    pub initial: Vec<usize>,
    pub vars: Vec<VarSlot>,
    pub clocks: Vec<ClockSlot>,
    pub transitions: Vec<CompiledTransition>,
    by_from: Vec<Vec<usize>>,
    source: Contract,
}

impl Automaton {
    pub fn new(contract: Contract) -> Result<Self, ContractError> {
        let mut seen = HashSet::new();
        let mut vars = Vec::new();
        let mut clocks = Vec::new();
        for v in &contract.signature.variables {
            if !is_identifier(&v.name) {
                return Err(ContractError::InvalidIdentifier(v.name.clone()));
            }
            if !seen.insert(v.name.as_str()) {
                return Err(ContractError::DuplicateVariable(v.name.clone()));
            }
            let depth = contract.history.get(&v.name).copied().unwrap_or(0);
            if v.is_clock() {
                clocks.push(ClockSlot {
                    name: v.name.clone(),
                    depth,
                });
            } else {
                vars.push(VarSlot {
                    name: v.name.clone(),
                    ty: v.ty.clone(),
                    role: v.role,
                    depth,
                });
            }
        }
        if let Some(name) = contract.history.keys().find(|n| !seen.contains(n.as_str())) {
            return Err(ContractError::HistoryForUnknown(name.clone()));
        }

        let mut mode_index = HashMap::new();
        for (i, m) in contract.modes.iter().enumerate() {
            if !is_identifier(&m.name) {
                return Err(ContractError::InvalidIdentifier(m.name.clone()));
            }
            if mode_index.insert(m.name.as_str(), i).is_some() {
                return Err(ContractError::DuplicateMode(m.name.clone()));
            }
        }
        let initial: Vec<usize> = contract
            .modes
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_initial())
            .map(|(i, _)| i)
            .collect();
        if initial.is_empty() {
            return Err(ContractError::NoInitialMode);
        }

        let scope = Scope::new(&vars, &clocks);
        let mut by_from = vec![Vec::new(); contract.modes.len()];
        let mut transitions = Vec::with_capacity(contract.transitions.len());
        for (i, t) in contract.transitions.iter().enumerate() {
            let mode = |name: &String| {
                mode_index
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| ContractError::UnknownMode {
                        transition: i,
                        mode: name.clone(),
                    })
            };
            let from = mode(&t.from)?;
            let to = mode(&t.to)?;
            let pre = scope.resolve(&t.pre, &format!("transition {i} pre"))?;
            let post = scope.resolve(&t.post, &format!("transition {i} post"))?;
            let resets = t
                .reset_clocks
                .iter()
                .map(|c| {
                    scope
                        .clock(c)
                        .ok_or_else(|| ContractError::UnknownClock {
                            name: c.clone(),
                            at: format!("transition {i} reset"),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            by_from[from].push(i);
            transitions.push(CompiledTransition {
                from,
                to,
                pre,
                post,
                resets,
            });
        }

        Ok(Self {
            name: contract.name.clone(),
            modes: contract.modes.iter().map(|m| m.name.clone()).collect(),
            initial,
            vars,
            clocks,
            transitions,
            by_from,
            source: contract,
        })
    }

    /// Transitions leaving `mode`, in declaration order.
    pub fn outgoing(&self, mode: usize) -> impl Iterator<Item = &CompiledTransition> {
        self.by_from
            .get(mode)
            .into_iter()
            .flatten()
            .map(|&i| &self.transitions[i])
    }

    pub fn mode_name(&self, mode: usize) -> &str {
        self.modes.get(mode).map(String::as_str).unwrap_or("?")
    }

    pub fn clock_index(&self, name: &str) -> Option<usize> {
        self.clocks.iter().position(|c| c.name == name)
    }

    pub fn var_index(&self, name: &str) -> Option<usize> {
        self.vars.iter().position(|v| v.name == name)
    }

    /// The contract this automaton was built from.
    pub fn contract(&self) -> &Contract {
        &self.source
    }
}
