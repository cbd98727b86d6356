use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::clock::ClockTrace;
use crate::truth::Degree;

/// One live hypothesis about the automaton's state.
#[derive(Clone, Debug)]
pub struct Token<V> {
    pub mode: usize,
    /// One trace per clock, indexed like the automaton's clock slots.
    pub traces: Vec<ClockTrace>,
    pub assume: V,
    pub guarantee: V,
}

impl<V: Degree> Token<V> {
    pub fn new(mode: usize, traces: Vec<ClockTrace>, top: V) -> Self {
        Self {
            mode,
            traces,
            assume: top,
            guarantee: top,
        }
    }

    pub fn advance(&mut self, delta_env: u64, delta_sys: u64) {
        for trace in &mut self.traces {
            trace.advance(delta_env, delta_sys);
        }
    }
}

impl<V: Degree> PartialEq for Token<V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<V: Degree> Eq for Token<V> {}

impl<V: Degree> PartialOrd for Token<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Mode, then traces, then assume and guarantee degrees.
impl<V: Degree> Ord for Token<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.mode
            .cmp(&other.mode)
            .then_with(|| self.traces.cmp(&other.traces))
            .then_with(|| self.assume.total_cmp(&other.assume))
            .then_with(|| self.guarantee.total_cmp(&other.guarantee))
    }
}

/// Live tokens of one generation.
#[derive(Clone, Debug)]
pub enum TokenSet<V: Degree> {
    /// Structurally identical tokens collapse; iteration in canonical order.
    Dedup(BTreeSet<Token<V>>),
    /// Duplicates kept, insertion order preserved.
    Plain(Vec<Token<V>>),
}

impl<V: Degree> TokenSet<V> {
    pub fn new(deduplicate: bool) -> Self {
        if deduplicate {
            TokenSet::Dedup(BTreeSet::new())
        } else {
            TokenSet::Plain(Vec::new())
        }
    }

    /// Empty set with the same policy.
    pub fn empty_like(&self) -> Self {
        Self::new(self.is_deduplicating())
    }

    pub fn is_deduplicating(&self) -> bool {
        matches!(self, TokenSet::Dedup(_))
    }

    pub fn insert(&mut self, token: Token<V>) {
        match self {
            TokenSet::Dedup(set) => {
                set.insert(token);
            }
            TokenSet::Plain(vec) => vec.push(token),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TokenSet::Dedup(set) => set.len(),
            TokenSet::Plain(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &Token<V>> + '_> {
        match self {
            TokenSet::Dedup(set) => Box::new(set.iter()),
            TokenSet::Plain(vec) => Box::new(vec.iter()),
        }
    }

    /// Add elapsed time to every trace of every token.
    pub fn advance(&mut self, delta_env: u64, delta_sys: u64) {
        match self {
            TokenSet::Dedup(set) => {
                // Keys are immutable in place. Advancing is injective, so
                // the rebuilt set has the same size.
                *set = std::mem::take(set)
                    .into_iter()
                    .map(|mut t| {
                        t.advance(delta_env, delta_sys);
                        t
                    })
                    .collect();
            }
            TokenSet::Plain(vec) => {
                for t in vec {
                    t.advance(delta_env, delta_sys);
                }
            }
        }
    }
}

impl<V: Degree> Extend<Token<V>> for TokenSet<V> {
    fn extend<I: IntoIterator<Item = Token<V>>>(&mut self, iter: I) {
        for token in iter {
            self.insert(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockValuation, TracePolicy};

    fn token(mode: usize, env: u64) -> Token<bool> {
        let mut trace = ClockTrace::new(1, TracePolicy::Bounded);
        trace.advance(env, 0);
        Token::new(mode, vec![trace], true)
    }

    #[test]
    fn test_dedup_collapses_identical() {
        let mut set = TokenSet::new(true);
        set.extend([token(0, 1), token(0, 1), token(1, 1)]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_plain_keeps_duplicates_in_order() {
        let mut set = TokenSet::new(false);
        set.extend([token(1, 0), token(0, 0), token(1, 0)]);
        let modes: Vec<usize> = set.iter().map(|t| t.mode).collect();
        assert_eq!(modes, vec![1, 0, 1]);
    }

    #[test]
    fn test_never_merges_distinct_traces() {
        let mut set = TokenSet::new(true);
        set.extend([token(0, 1), token(0, 2)]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_degrees_participate() {
        let mut a = Token::new(0, Vec::new(), 1.0f64);
        let b = a.clone();
        a.guarantee = 0.5;
        let mut set = TokenSet::new(true);
        set.extend([a, b]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_advance_preserves_dedup_size() {
        let mut set = TokenSet::new(true);
        set.extend([token(0, 1), token(0, 2), token(2, 0)]);
        set.advance(3, 4);
        assert_eq!(set.len(), 3);
        let currents: Vec<ClockValuation> = set.iter().map(|t| t.traces[0].current()).collect();
        assert!(currents.contains(&ClockValuation::new(4, 4)));
        assert!(currents.contains(&ClockValuation::new(5, 4)));
    }
}
