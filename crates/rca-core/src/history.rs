use std::collections::VecDeque;

use crate::contract::VarSlot;
use crate::signature::Value;

/// Committed values of every non-clock variable, newest first, each bounded
/// to its declared depth plus the current value.
#[derive(Clone, Debug)]
pub struct ValueHistory {
    rows: Vec<VecDeque<Value>>,
    defaults: Vec<Value>,
}

impl ValueHistory {
    pub fn new(vars: &[VarSlot]) -> Self {
        Self {
            rows: vars
                .iter()
                .map(|v| VecDeque::with_capacity(v.depth + 1))
                .collect(),
            defaults: vars.iter().map(|v| v.ty.default_value()).collect(),
        }
    }

    /// Current value; the type's zero before the first commit.
    pub fn current(&self, var: usize) -> Value {
        self.at_depth(var, 0)
            .or_else(|| self.defaults.get(var).copied())
            .unwrap_or(Value::Int(0))
    }

    /// Value committed `depth` samples ago, `None` when not yet recorded.
    pub fn at_depth(&self, var: usize, depth: usize) -> Option<Value> {
        self.rows.get(var)?.get(depth).copied()
    }

    pub fn default_of(&self, var: usize) -> Value {
        self.defaults.get(var).copied().unwrap_or(Value::Int(0))
    }

    /// Number of samples recorded for `var`, capped at its retention.
    pub fn recorded(&self, var: usize) -> usize {
        self.rows.get(var).map_or(0, VecDeque::len)
    }

    /// Push one full row of values (ordered like the variable slots).
    pub fn commit(&mut self, values: &[Value], slots: &[VarSlot]) {
        for ((row, value), slot) in self.rows.iter_mut().zip(values).zip(slots) {
            row.push_front(*value);
            row.truncate(slot.depth + 1);
        }
    }
}
