//! Resolved guards and their evaluation.
//!
//! A [`Guard`] is an [`Expr`] with every name replaced by a slot index. It
//! evaluates to a degree of some [`TruthDomain`]. Faults (history underflow,
//! arithmetic) are returned as [`EvalFault`] and never leave the guard.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::clock::{ClockKind, ClockTrace};
use crate::contract::{ClockSlot, VarSlot};
use crate::error::{ContractError, EvalFault};
use crate::expr::{ArithOp, CmpOp, Expr, Literal};
use crate::history::ValueHistory;
use crate::signature::{Value, VarType};
use crate::truth::TruthDomain;

/// What a clock history read past the recorded window yields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderflowPolicy {
    /// Fail the guard and raise the step's fault flag.
    #[default]
    Fault,
    /// Read zero, `false`, or the first enumerator.
    #[serde(rename = "default", alias = "zero")]
    Zero,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Guard {
    Bool(bool),
    Int(i64),
    Var(usize),
    Hist { var: usize, depth: usize },
    Clock { clock: usize, kind: ClockKind },
    ClockHist {
        clock: usize,
        kind: ClockKind,
        depth: usize,
    },
    Not(Box<Guard>),
    And(Vec<Guard>),
    Or(Vec<Guard>),
    Implies(Box<Guard>, Box<Guard>),
    Cmp(CmpOp, Box<Guard>, Box<Guard>),
    Arith(ArithOp, Box<Guard>, Box<Guard>),
    Neg(Box<Guard>),
}

/// Name tables used to resolve expressions.
pub struct Scope<'a> {
    vars: &'a [VarSlot],
    clocks: &'a [ClockSlot],
    var_index: HashMap<&'a str, usize>,
    clock_index: HashMap<&'a str, usize>,
    /// Enumerator label to ordinal; `None` when labels disagree.
    symbols: HashMap<&'a str, Option<i64>>,
}

impl<'a> Scope<'a> {
    pub fn new(vars: &'a [VarSlot], clocks: &'a [ClockSlot]) -> Self {
        let mut symbols: HashMap<&str, Option<i64>> = HashMap::new();
        for v in vars {
            if let VarType::Enum(labels) = &v.ty {
                for (ordinal, label) in labels.iter().enumerate() {
                    let ordinal = ordinal as i64;
                    symbols
                        .entry(label.as_str())
                        .and_modify(|known| {
                            if *known != Some(ordinal) {
                                *known = None;
                            }
                        })
                        .or_insert(Some(ordinal));
                }
            }
        }
        Self {
            vars,
            clocks,
            var_index: vars
                .iter()
                .enumerate()
                .map(|(i, v)| (v.name.as_str(), i))
                .collect(),
            clock_index: clocks
                .iter()
                .enumerate()
                .map(|(i, c)| (c.name.as_str(), i))
                .collect(),
            symbols,
        }
    }

    pub fn clock(&self, name: &str) -> Option<usize> {
        self.clock_index.get(name).copied()
    }

    fn clock_hist(
        &self,
        name: &str,
        kind: ClockKind,
        depth: usize,
        at: &str,
    ) -> Result<Guard, ContractError> {
        let clock = self.clock(name).ok_or_else(|| ContractError::UnknownClock {
            name: name.to_string(),
            at: at.to_string(),
        })?;
        let declared = self.clocks[clock].depth;
        if depth > declared {
            return Err(ContractError::HistoryTooDeep {
                name: name.to_string(),
                depth,
                declared,
                at: at.to_string(),
            });
        }
        Ok(if depth == 0 {
            Guard::Clock { clock, kind }
        } else {
            Guard::ClockHist { clock, kind, depth }
        })
    }

    /// Resolve `expr`; `at` labels errors with the guard's location.
    pub fn resolve(&self, expr: &Expr, at: &str) -> Result<Guard, ContractError> {
        let boxed = |e: &Expr| self.resolve(e, at).map(Box::new);
        Ok(match expr {
            Expr::Const(Literal::Bool(b)) => Guard::Bool(*b),
            Expr::Const(Literal::Int(i)) => Guard::Int(*i),
            Expr::Const(Literal::Sym(s)) => match self.symbols.get(s.as_str()) {
                Some(Some(ordinal)) => Guard::Int(*ordinal),
                Some(None) => {
                    return Err(ContractError::AmbiguousSymbol {
                        symbol: s.clone(),
                        at: at.to_string(),
                    });
                }
                None => {
                    return Err(ContractError::UnresolvedSymbol {
                        symbol: s.clone(),
                        at: at.to_string(),
                    });
                }
            },
            Expr::Var(name) => match self.var_index.get(name.as_str()) {
                Some(&var) => Guard::Var(var),
                None => self.clock_hist(name, ClockKind::Total, 0, at).map_err(|_| {
                    ContractError::UnknownVariable {
                        name: name.clone(),
                        at: at.to_string(),
                    }
                })?,
            },
            Expr::Hist { name, depth } => match self.var_index.get(name.as_str()) {
                Some(&var) => {
                    let declared = self.vars[var].depth;
                    if *depth > declared {
                        return Err(ContractError::HistoryTooDeep {
                            name: name.clone(),
                            depth: *depth,
                            declared,
                            at: at.to_string(),
                        });
                    }
                    if *depth == 0 {
                        Guard::Var(var)
                    } else {
                        Guard::Hist { var, depth: *depth }
                    }
                }
                None if self.clock(name).is_some() => {
                    self.clock_hist(name, ClockKind::Total, *depth, at)?
                }
                None => {
                    return Err(ContractError::UnknownVariable {
                        name: name.clone(),
                        at: at.to_string(),
                    });
                }
            },
            Expr::Clock { name, kind } => self.clock_hist(name, *kind, 0, at)?,
            Expr::ClockHist { name, kind, depth } => self.clock_hist(name, *kind, *depth, at)?,
            Expr::Not(arg) => Guard::Not(boxed(arg)?),
            Expr::And(args) => Guard::And(
                args.iter()
                    .map(|a| self.resolve(a, at))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Or(args) => Guard::Or(
                args.iter()
                    .map(|a| self.resolve(a, at))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Implies(lhs, rhs) => Guard::Implies(boxed(lhs)?, boxed(rhs)?),
            Expr::Cmp(op, lhs, rhs) => Guard::Cmp(*op, boxed(lhs)?, boxed(rhs)?),
            Expr::Arith(op, lhs, rhs) => Guard::Arith(*op, boxed(lhs)?, boxed(rhs)?),
            Expr::Neg(arg) => Guard::Neg(boxed(arg)?),
        })
    }
}

/// Everything a guard can read during one step.
pub struct EvalContext<'a> {
    pub values: &'a ValueHistory,
    pub traces: &'a [ClockTrace],
    pub underflow: UnderflowPolicy,
}

/// Intermediate result: a truth degree, or an integer tagged with the clocks
/// it was derived from.
enum Term<V> {
    Truth(V),
    Num(i64, Vec<usize>),
}

fn merge_tags(mut a: Vec<usize>, b: Vec<usize>) -> Vec<usize> {
    for c in b {
        if let Err(pos) = a.binary_search(&c) {
            a.insert(pos, c);
        }
    }
    a
}

impl Guard {
    pub fn eval<D: TruthDomain>(
        &self,
        domain: &D,
        ctx: &EvalContext<'_>,
    ) -> Result<D::Degree, EvalFault> {
        self.truth(domain, ctx)
    }

    fn truth<D: TruthDomain>(
        &self,
        domain: &D,
        ctx: &EvalContext<'_>,
    ) -> Result<D::Degree, EvalFault> {
        Ok(match self.term(domain, ctx)? {
            Term::Truth(v) => v,
            Term::Num(n, _) => domain.from_bool(n != 0),
        })
    }

    fn num<D: TruthDomain>(
        &self,
        domain: &D,
        ctx: &EvalContext<'_>,
    ) -> Result<(i64, Vec<usize>), EvalFault> {
        Ok(match self.term(domain, ctx)? {
            Term::Truth(v) => (domain.holds(v) as i64, Vec::new()),
            Term::Num(n, tags) => (n, tags),
        })
    }

    fn term<D: TruthDomain>(
        &self,
        domain: &D,
        ctx: &EvalContext<'_>,
    ) -> Result<Term<D::Degree>, EvalFault> {
        let value_term = |v: Value| match v {
            Value::Bool(b) => Term::Truth(domain.from_bool(b)),
            Value::Int(i) => Term::Num(i, Vec::new()),
        };
        let reading = |clock: usize,
                       kind: ClockKind,
                       depth: usize|
         -> Result<Term<D::Degree>, EvalFault> {
            let trace = ctx.traces.get(clock).ok_or(EvalFault::HistoryUnderflow)?;
            let raw = match trace.at_depth(depth) {
                Some(valuation) => valuation.reading(kind),
                None if ctx.underflow == UnderflowPolicy::Zero => 0,
                None => return Err(EvalFault::HistoryUnderflow),
            };
            let value = i64::try_from(raw).map_err(|_| EvalFault::Arithmetic)?;
            Ok(Term::Num(value, vec![clock]))
        };

        Ok(match self {
            Guard::Bool(b) => Term::Truth(domain.from_bool(*b)),
            Guard::Int(i) => Term::Num(*i, Vec::new()),
            Guard::Var(var) => value_term(ctx.values.current(*var)),
            // Unrecorded value history reads the type's zero under either policy.
            Guard::Hist { var, depth } => value_term(
                ctx.values
                    .at_depth(*var, *depth)
                    .unwrap_or_else(|| ctx.values.default_of(*var)),
            ),
            Guard::Clock { clock, kind } => reading(*clock, *kind, 0)?,
            Guard::ClockHist { clock, kind, depth } => reading(*clock, *kind, *depth)?,
            Guard::Not(arg) => Term::Truth(domain.negate(arg.truth(domain, ctx)?)),
            Guard::And(args) => {
                let mut acc = domain.top();
                for arg in args {
                    if !domain.holds(acc) {
                        break;
                    }
                    acc = domain.t_norm(acc, arg.truth(domain, ctx)?);
                }
                Term::Truth(acc)
            }
            Guard::Or(args) => {
                let top = domain.top();
                let mut acc = domain.from_bool(false);
                for arg in args {
                    if acc == top {
                        break;
                    }
                    acc = domain.s_norm(acc, arg.truth(domain, ctx)?);
                }
                Term::Truth(acc)
            }
            Guard::Implies(lhs, rhs) => {
                let premise = domain.negate(lhs.truth(domain, ctx)?);
                if premise == domain.top() {
                    Term::Truth(premise)
                } else {
                    Term::Truth(domain.s_norm(premise, rhs.truth(domain, ctx)?))
                }
            }
            Guard::Cmp(op, lhs, rhs) => {
                let (a, ta) = lhs.num(domain, ctx)?;
                let (b, tb) = rhs.num(domain, ctx)?;
                Term::Truth(compare(domain, *op, a, b, &merge_tags(ta, tb)))
            }
            Guard::Arith(op, lhs, rhs) => {
                let (a, ta) = lhs.num(domain, ctx)?;
                let (b, tb) = rhs.num(domain, ctx)?;
                let value = match op {
                    ArithOp::Add => a.checked_add(b),
                    ArithOp::Sub => a.checked_sub(b),
                    ArithOp::Mul => a.checked_mul(b),
                    ArithOp::Div => a.checked_div(b),
                    ArithOp::Mod => a.checked_rem(b),
                }
                .ok_or(EvalFault::Arithmetic)?;
                Term::Num(value, merge_tags(ta, tb))
            }
            Guard::Neg(arg) => {
                let (a, tags) = arg.num(domain, ctx)?;
                Term::Num(a.checked_neg().ok_or(EvalFault::Arithmetic)?, tags)
            }
        })
    }
}

/// Untagged operands compare exactly. Tagged operands use the domain's graded
/// relations per contributing clock, joined with the s-norm.
fn compare<D: TruthDomain>(domain: &D, op: CmpOp, a: i64, b: i64, tags: &[usize]) -> D::Degree {
    if tags.is_empty() {
        return domain.from_bool(match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        });
    }
    let join = |f: &dyn Fn(usize) -> D::Degree| {
        tags.iter()
            .fold(domain.from_bool(false), |acc, &c| domain.s_norm(acc, f(c)))
    };
    match op {
        CmpOp::Eq => join(&|c| domain.graded_eq(c, a, b)),
        CmpOp::Ne => domain.negate(join(&|c| domain.graded_eq(c, a, b))),
        CmpOp::Lt => join(&|c| domain.graded_lt(c, a, b)),
        CmpOp::Le => join(&|c| domain.s_norm(domain.graded_lt(c, a, b), domain.graded_eq(c, a, b))),
        CmpOp::Gt => join(&|c| domain.graded_lt(c, b, a)),
        CmpOp::Ge => join(&|c| domain.s_norm(domain.graded_lt(c, b, a), domain.graded_eq(c, a, b))),
    }
}
