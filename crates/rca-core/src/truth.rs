//! Truth domains: ordinary boolean logic and graded (fuzzy) degrees in [0, 1].
//!
//! The engine is generic over [`TruthDomain`]; [`BooleanLogic`] is the
//! trivial instance. Graded comparisons are keyed by clock index so a domain
//! can be lenient about some clocks and exact about others.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

use crate::constants::{FULL_DEGREE, NO_DEGREE};

/// A truth value carried by tokens and produced by guards.
pub trait Degree: Copy + Debug + Display + PartialEq + Send + Sync + 'static {
    /// Total order used for token canonicalization.
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Numeric view for rendering and archives.
    fn as_f64(&self) -> f64;
}

impl Degree for bool {
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn as_f64(&self) -> f64 {
        if *self { FULL_DEGREE } else { NO_DEGREE }
    }
}

impl Degree for f64 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(self, other)
    }

    fn as_f64(&self) -> f64 {
        *self
    }
}

pub trait TruthDomain: Clone + Debug + Send + Sync + 'static {
    type Degree: Degree;

    /// Whether degrees carry information beyond true/false.
    fn is_graded(&self) -> bool;

    fn top(&self) -> Self::Degree;
    fn from_bool(&self, b: bool) -> Self::Degree;
    fn negate(&self, v: Self::Degree) -> Self::Degree;
    fn t_norm(&self, a: Self::Degree, b: Self::Degree) -> Self::Degree;
    fn s_norm(&self, a: Self::Degree, b: Self::Degree) -> Self::Degree;
    fn holds(&self, v: Self::Degree) -> bool;

    /// Degree to which `a == b` on values derived from `clock`.
    fn graded_eq(&self, clock: usize, a: i64, b: i64) -> Self::Degree;

    /// Degree to which `a < b` on values derived from `clock`.
    fn graded_lt(&self, clock: usize, a: i64, b: i64) -> Self::Degree;

    /// Fold a token's carried degree into a freshly evaluated guard degree.
    fn combine(&self, carried: Self::Degree, fresh: Self::Degree) -> Self::Degree;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BooleanLogic;

impl TruthDomain for BooleanLogic {
    type Degree = bool;

    fn is_graded(&self) -> bool {
        false
    }

    fn top(&self) -> bool {
        true
    }

    fn from_bool(&self, b: bool) -> bool {
        b
    }

    fn negate(&self, v: bool) -> bool {
        !v
    }

    fn t_norm(&self, a: bool, b: bool) -> bool {
        a && b
    }

    fn s_norm(&self, a: bool, b: bool) -> bool {
        a || b
    }

    fn holds(&self, v: bool) -> bool {
        v
    }

    fn graded_eq(&self, _clock: usize, a: i64, b: i64) -> bool {
        a == b
    }

    fn graded_lt(&self, _clock: usize, a: i64, b: i64) -> bool {
        a < b
    }

    fn combine(&self, carried: bool, fresh: bool) -> bool {
        carried && fresh
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TNorm {
    #[default]
    Minimum,
    Product,
    Lukasiewicz,
}

impl TNorm {
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            TNorm::Minimum => a.min(b),
            TNorm::Product => a * b,
            TNorm::Lukasiewicz => (a + b - 1.0).max(NO_DEGREE),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SNorm {
    #[default]
    Maximum,
    ProbabilisticSum,
    BoundedSum,
}

impl SNorm {
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            SNorm::Maximum => a.max(b),
            SNorm::ProbabilisticSum => a + b - a * b,
            SNorm::BoundedSum => (a + b).min(FULL_DEGREE),
        }
    }
}

/// Graded-logic settings as they appear in configuration. Tolerances are
/// keyed by clock name and resolved against a contract by
/// [`FuzzyLogic::resolve`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzySettings {
    pub t_norm: TNorm,
    pub s_norm: SNorm,
    /// Combinator for carried degrees; the t-norm when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combinator: Option<TNorm>,
    pub tolerance: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuzzyLogic {
    t_norm: TNorm,
    s_norm: SNorm,
    combinator: TNorm,
    /// Indexed by clock; zero means exact.
    tolerance: Vec<u64>,
}

impl Default for FuzzyLogic {
    fn default() -> Self {
        Self::new(TNorm::default(), SNorm::default())
    }
}

impl FuzzyLogic {
    pub fn new(t_norm: TNorm, s_norm: SNorm) -> Self {
        Self {
            t_norm,
            s_norm,
            combinator: t_norm,
            tolerance: Vec::new(),
        }
    }

    pub fn with_combinator(mut self, combinator: TNorm) -> Self {
        self.combinator = combinator;
        self
    }

    pub fn with_tolerance(mut self, clock: usize, tolerance: u64) -> Self {
        if self.tolerance.len() <= clock {
            self.tolerance.resize(clock + 1, 0);
        }
        self.tolerance[clock] = tolerance;
        self
    }

    /// Build from settings, mapping tolerance names through `clock_index`.
    /// Returns the first unknown clock name on failure.
    pub fn resolve(
        settings: &FuzzySettings,
        clock_index: impl Fn(&str) -> Option<usize>,
    ) -> Result<Self, String> {
        let mut logic = Self::new(settings.t_norm, settings.s_norm)
            .with_combinator(settings.combinator.unwrap_or(settings.t_norm));
        for (name, tol) in &settings.tolerance {
            let clock = clock_index(name).ok_or_else(|| name.clone())?;
            logic = logic.with_tolerance(clock, *tol);
        }
        Ok(logic)
    }

    fn tolerance(&self, clock: usize) -> f64 {
        self.tolerance.get(clock).copied().unwrap_or(0) as f64
    }
}

fn clamp_degree(v: f64) -> f64 {
    v.clamp(NO_DEGREE, FULL_DEGREE)
}

impl TruthDomain for FuzzyLogic {
    type Degree = f64;

    fn is_graded(&self) -> bool {
        true
    }

    fn top(&self) -> f64 {
        FULL_DEGREE
    }

    fn from_bool(&self, b: bool) -> f64 {
        b.as_f64()
    }

    fn negate(&self, v: f64) -> f64 {
        FULL_DEGREE - v
    }

    fn t_norm(&self, a: f64, b: f64) -> f64 {
        self.t_norm.apply(a, b)
    }

    fn s_norm(&self, a: f64, b: f64) -> f64 {
        self.s_norm.apply(a, b)
    }

    fn holds(&self, v: f64) -> bool {
        v > NO_DEGREE
    }

    fn graded_eq(&self, clock: usize, a: i64, b: i64) -> f64 {
        let distance = (a as f64 - b as f64).abs();
        clamp_degree(FULL_DEGREE - distance / (self.tolerance(clock) + 1.0))
    }

    fn graded_lt(&self, clock: usize, a: i64, b: i64) -> f64 {
        if a < b {
            return FULL_DEGREE;
        }
        let overshoot = a as f64 - b as f64 + 1.0;
        clamp_degree(FULL_DEGREE - overshoot / (self.tolerance(clock) + 1.0))
    }

    fn combine(&self, carried: f64, fresh: f64) -> f64 {
        self.combinator.apply(carried, fresh)
    }
}
