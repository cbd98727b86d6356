//! Per-token transition firing.
//!
//! Evaluation of one token is a pure function of the token, the automaton
//! and the committed values. Faults stay inside a single (token, transition)
//! pair: they fail that guard and raise a flag, nothing more.

use crate::contract::{Automaton, CompiledTransition};
use crate::error::EvalFault;
use crate::guard::{EvalContext, Guard, UnderflowPolicy};
use crate::history::ValueHistory;
use crate::token::Token;
use crate::truth::TruthDomain;
use crate::verdict::FaultFlags;

/// Result of firing every enabled transition of one token.
#[derive(Debug)]
pub struct Firing<V> {
    pub successors: Vec<Token<V>>,
    /// Some precondition held.
    pub any_pre: bool,
    pub faults: FaultFlags,
}

/// Evaluate `guard`, mapping faults to "not satisfied". Returns whether an
/// underflow occurred.
fn guarded<D: TruthDomain>(
    guard: &Guard,
    domain: &D,
    ctx: &EvalContext<'_>,
) -> (D::Degree, bool) {
    match guard.eval(domain, ctx) {
        Ok(v) => (v, false),
        Err(EvalFault::HistoryUnderflow) => (domain.from_bool(false), true),
        Err(EvalFault::Arithmetic) => (domain.from_bool(false), false),
    }
}

fn successor<V: Copy>(token: &Token<V>, t: &CompiledTransition, assume: V, guarantee: V) -> Token<V> {
    let mut traces = token.traces.clone();
    for trace in &mut traces {
        trace.open_window();
    }
    for &clock in &t.resets {
        if let Some(trace) = traces.get_mut(clock) {
            trace.reset();
        }
    }
    Token {
        mode: t.to,
        traces,
        assume,
        guarantee,
    }
}

pub fn fire<D: TruthDomain>(
    automaton: &Automaton,
    domain: &D,
    token: &Token<D::Degree>,
    values: &ValueHistory,
    underflow: UnderflowPolicy,
) -> Firing<D::Degree> {
    let ctx = EvalContext {
        values,
        traces: &token.traces,
        underflow,
    };
    let mut firing = Firing {
        successors: Vec::new(),
        any_pre: false,
        faults: FaultFlags::default(),
    };

    for t in automaton.outgoing(token.mode) {
        let (pre, underflowed) = guarded(&t.pre, domain, &ctx);
        firing.faults.precondition_accessed_incorrect_time |= underflowed;
        let pre = domain.combine(token.assume, pre);
        if !domain.holds(pre) {
            continue;
        }
        firing.any_pre = true;

        let (post, underflowed) = guarded(&t.post, domain, &ctx);
        firing.faults.postcondition_accessed_incorrect_time |= underflowed;
        let post = domain.combine(token.guarantee, post);
        if domain.holds(post) {
            firing.successors.push(successor(token, t, pre, post));
        }
    }
    firing
}
