//! The monitor: live tokens, committed values, and the verdict.
//!
//! A step is exactly one [`Monitor::advance`] followed by one
//! [`Monitor::update`]. [`Monitor::step`] does both and validates the sample
//! first, so a rejected sample leaves the monitor untouched.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::clock::{ClockTrace, TracePolicy};
use crate::config::{MonitorConfig, Semantics};
use crate::contract::{Automaton, Contract};
use crate::engine;
use crate::error::{ContractError, SampleError};
use crate::guard::UnderflowPolicy;
use crate::history::ValueHistory;
use crate::sample::Sample;
use crate::signature::{Value, VarType};
use crate::snapshot::{MonitorSnapshot, TokenView, TraceView, VariableView};
use crate::token::{Token, TokenSet};
use crate::truth::{BooleanLogic, Degree, FuzzyLogic, TruthDomain};
use crate::verdict::{FaultFlags, Verdict};

/// Summary of one completed step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StepReport {
    /// 1-based index of the step.
    pub step: u64,
    pub any_pre: bool,
    /// Successors produced, before deduplication.
    pub fired: usize,
    /// Live tokens after the step.
    pub tokens: usize,
    pub faults: FaultFlags,
    pub verdict: Verdict,
}

pub struct Monitor<D: TruthDomain> {
    automaton: Automaton,
    domain: D,
    underflow: UnderflowPolicy,
    stop_on_empty: bool,
    values: ValueHistory,
    tokens: TokenSet<D::Degree>,
    verdict: Verdict,
    faults: FaultFlags,
    step: u64,
}

impl<D: TruthDomain> Monitor<D> {
    /// One token per initial mode, each with fresh all-zero traces.
    pub fn new(automaton: Automaton, domain: D, config: &MonitorConfig) -> Self {
        let mut tokens = TokenSet::new(config.deduplicate);
        for &mode in &automaton.initial {
            tokens.insert(Token::new(
                mode,
                fresh_traces(&automaton, config.trace_policy),
                domain.top(),
            ));
        }
        Self {
            values: ValueHistory::new(&automaton.vars),
            automaton,
            domain,
            underflow: config.underflow,
            stop_on_empty: config.stop_on_empty,
            tokens,
            verdict: Verdict::Running,
            faults: FaultFlags::default(),
            step: 0,
        }
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub fn tokens(&self) -> &TokenSet<D::Degree> {
        &self.tokens
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn faults(&self) -> FaultFlags {
        self.faults
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn current_value(&self, name: &str) -> Option<Value> {
        self.automaton
            .var_index(name)
            .map(|var| self.values.current(var))
    }

    pub fn should_stop(&self) -> bool {
        self.stop_on_empty && self.tokens.is_empty()
    }

    /// Add elapsed time to every trace of every live token.
    pub fn advance(&mut self, delta_env: u64, delta_sys: u64) {
        self.tokens.advance(delta_env, delta_sys);
    }

    /// Check that `values` covers every non-clock variable with a value of
    /// its type. Returns the row in slot order.
    fn validate(&self, values: &BTreeMap<String, Value>) -> Result<Vec<Value>, SampleError> {
        self.automaton
            .vars
            .iter()
            .map(|slot| {
                let value = *values
                    .get(&slot.name)
                    .ok_or_else(|| SampleError::MissingVariable(slot.name.clone()))?;
                // Integers stand in for booleans the way they do in guards.
                let value = match (&slot.ty, value) {
                    (VarType::Bool, Value::Int(i @ (0 | 1))) => Value::Bool(i == 1),
                    _ => value,
                };
                if slot.ty.admits(value) {
                    Ok(value)
                } else {
                    Err(SampleError::OutOfRange {
                        name: slot.name.clone(),
                        value: value.to_string(),
                    })
                }
            })
            .collect()
    }

    /// Commit `values` and run the transition engine over every live token.
    pub fn update(&mut self, values: &BTreeMap<String, Value>) -> Result<StepReport, SampleError> {
        let row = self.validate(values)?;
        Ok(self.commit(&row))
    }

    /// Validate, then advance and update as one atomic step.
    pub fn step(&mut self, sample: &Sample) -> Result<StepReport, SampleError> {
        let row = self.validate(&sample.values)?;
        self.advance(sample.delta_env, sample.delta_sys);
        Ok(self.commit(&row))
    }

    fn commit(&mut self, row: &[Value]) -> StepReport {
        self.values.commit(row, &self.automaton.vars);
        self.step += 1;
        self.faults = FaultFlags::default();

        let mut next = self.tokens.empty_like();
        let mut any_pre = false;
        let mut fired = 0;
        for token in self.tokens.iter() {
            let firing = engine::fire(
                &self.automaton,
                &self.domain,
                token,
                &self.values,
                self.underflow,
            );
            any_pre |= firing.any_pre;
            fired += firing.successors.len();
            self.faults.merge(firing.faults);
            next.extend(firing.successors);
        }
        self.tokens = next;
        self.verdict = self.verdict.judge(any_pre, self.tokens.is_empty());

        StepReport {
            step: self.step,
            any_pre,
            fired,
            tokens: self.tokens.len(),
            faults: self.faults,
            verdict: self.verdict,
        }
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let values = self
            .automaton
            .vars
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let value = self.values.current(i);
                let symbol = match &slot.ty {
                    VarType::Enum(labels) => usize::try_from(value.as_int())
                        .ok()
                        .and_then(|ordinal| labels.get(ordinal).cloned()),
                    _ => None,
                };
                VariableView {
                    name: slot.name.clone(),
                    role: slot.role,
                    value,
                    symbol,
                }
            })
            .collect();
        let graded = self.domain.is_graded();
        let tokens = self
            .tokens
            .iter()
            .map(|t| TokenView {
                mode: self.automaton.mode_name(t.mode).to_string(),
                degrees: graded.then(|| (t.assume.as_f64(), t.guarantee.as_f64())),
                traces: t
                    .traces
                    .iter()
                    .zip(&self.automaton.clocks)
                    .map(|(trace, slot)| TraceView {
                        clock: slot.name.clone(),
                        entries: trace.to_vec(),
                    })
                    .collect(),
            })
            .collect();
        MonitorSnapshot {
            name: self.automaton.name.clone(),
            step: self.step,
            values,
            tokens,
            faults: self.faults,
            verdict: self.verdict,
        }
    }
}

fn fresh_traces(automaton: &Automaton, policy: TracePolicy) -> Vec<ClockTrace> {
    automaton
        .clocks
        .iter()
        .map(|c| ClockTrace::new(c.depth, policy))
        .collect()
}

/// Object-safe view of a monitor, whatever its truth domain.
pub trait Monitoring: Send + Sync {
    fn automaton(&self) -> &Automaton;
    fn advance(&mut self, delta_env: u64, delta_sys: u64);
    fn update(&mut self, values: &BTreeMap<String, Value>) -> Result<StepReport, SampleError>;
    fn step(&mut self, sample: &Sample) -> Result<StepReport, SampleError>;
    fn verdict(&self) -> Verdict;
    fn faults(&self) -> FaultFlags;
    fn token_count(&self) -> usize;
    fn should_stop(&self) -> bool;
    fn snapshot(&self) -> MonitorSnapshot;
}

impl<D: TruthDomain> Monitoring for Monitor<D> {
    fn automaton(&self) -> &Automaton {
        Monitor::automaton(self)
    }

    fn advance(&mut self, delta_env: u64, delta_sys: u64) {
        Monitor::advance(self, delta_env, delta_sys)
    }

    fn update(&mut self, values: &BTreeMap<String, Value>) -> Result<StepReport, SampleError> {
        Monitor::update(self, values)
    }

    fn step(&mut self, sample: &Sample) -> Result<StepReport, SampleError> {
        Monitor::step(self, sample)
    }

    fn verdict(&self) -> Verdict {
        Monitor::verdict(self)
    }

    fn faults(&self) -> FaultFlags {
        Monitor::faults(self)
    }

    fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn should_stop(&self) -> bool {
        Monitor::should_stop(self)
    }

    fn snapshot(&self) -> MonitorSnapshot {
        Monitor::snapshot(self)
    }
}

/// Validate `contract` and build a monitor in the configured semantics.
pub fn build_monitor(
    contract: Contract,
    config: &MonitorConfig,
) -> Result<Box<dyn Monitoring>, ContractError> {
    let automaton = contract.build()?;
    Ok(match &config.semantics {
        Semantics::Boolean => Box::new(Monitor::new(automaton, BooleanLogic, config)),
        Semantics::Fuzzy(settings) => {
            let logic = FuzzyLogic::resolve(settings, |name| automaton.clock_index(name))
                .map_err(|name| ContractError::UnknownClock {
                    name,
                    at: "fuzzy tolerance".to_string(),
                })?;
            Box::new(Monitor::new(automaton, logic, config))
        }
    })
}
