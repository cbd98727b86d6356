use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Elapsed time of one clock, split into the environment and system phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClockValuation {
    pub env: u64,
    pub sys: u64,
}

impl ClockValuation {
    pub const ZERO: ClockValuation = ClockValuation { env: 0, sys: 0 };

    pub fn new(env: u64, sys: u64) -> Self {
        Self { env, sys }
    }

    pub fn total(&self) -> u64 {
        self.env.saturating_add(self.sys)
    }

    pub fn reading(&self, kind: ClockKind) -> u64 {
        match kind {
            ClockKind::Env => self.env,
            ClockKind::Sys => self.sys,
            ClockKind::Total => self.total(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::ZERO;
    }

    /// Saturating: readings never go backwards.
    pub fn advance(&mut self, delta_env: u64, delta_sys: u64) {
        self.env = self.env.saturating_add(delta_env);
        self.sys = self.sys.saturating_add(delta_sys);
    }
}

impl fmt::Display for ClockValuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.env, self.sys)
    }
}

/// Which component of a clock a guard reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockKind {
    Env,
    Sys,
    Total,
}

impl ClockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockKind::Env => "env",
            ClockKind::Sys => "sys",
            ClockKind::Total => "total",
        }
    }
}

/// Retention policy shared by every clock trace of a monitor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracePolicy {
    /// Grow up to `depth + 1` entries, then drop the oldest on push.
    #[default]
    Bounded,
    /// Preallocated ring of `depth + 1` slots, oldest slot overwritten.
    Ring,
    /// Keep every window. Reads still address depth from the newest entry.
    Unbounded,
}

/// Fixed-capacity ring storage. `start` is the oldest slot.
#[derive(Clone, Debug)]
struct Ring {
    slots: Box<[ClockValuation]>,
    start: usize,
    len: usize,
}

impl Ring {
    fn with_first(capacity: usize, first: ClockValuation) -> Self {
        let mut slots = vec![ClockValuation::ZERO; capacity.max(1)].into_boxed_slice();
        slots[0] = first;
        Self {
            slots,
            start: 0,
            len: 1,
        }
    }

    fn slot(&self, idx: usize) -> usize {
        (self.start + idx) % self.slots.len()
    }

    fn get(&self, idx: usize) -> Option<&ClockValuation> {
        (idx < self.len).then(|| &self.slots[self.slot(idx)])
    }

    fn last_mut(&mut self) -> &mut ClockValuation {
        let idx = self.slot(self.len - 1);
        &mut self.slots[idx]
    }

    fn push(&mut self, value: ClockValuation) {
        let cap = self.slots.len();
        if self.len == cap {
            self.slots[self.start] = value;
            self.start = (self.start + 1) % cap;
        } else {
            let idx = self.slot(self.len);
            self.slots[idx] = value;
            self.len += 1;
        }
    }
}

#[derive(Clone, Debug)]
enum Storage {
    Deque {
        entries: VecDeque<ClockValuation>,
        capacity: Option<usize>,
    },
    Ring(Ring),
}

/// Time-ordered record of one clock's valuations, newest last.
///
/// Invariant: there is always at least one entry (the current window), and a
/// bounded trace never holds more than `depth + 1` entries.
#[derive(Clone, Debug)]
pub struct ClockTrace {
    storage: Storage,
}

impl ClockTrace {
    /// Fresh trace holding a single all-zero valuation.
    pub fn new(depth: usize, policy: TracePolicy) -> Self {
        let capacity = depth + 1;
        let storage = match policy {
            TracePolicy::Bounded => Storage::Deque {
                entries: VecDeque::from([ClockValuation::ZERO]),
                capacity: Some(capacity),
            },
            TracePolicy::Unbounded => Storage::Deque {
                entries: VecDeque::from([ClockValuation::ZERO]),
                capacity: None,
            },
            TracePolicy::Ring => Storage::Ring(Ring::with_first(capacity, ClockValuation::ZERO)),
        };
        Self { storage }
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Deque { entries, .. } => entries.len(),
            Storage::Ring(ring) => ring.len,
        }
    }

    /// Never true for a trace built by [`ClockTrace::new`].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum retained entries, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        match &self.storage {
            Storage::Deque { capacity, .. } => *capacity,
            Storage::Ring(ring) => Some(ring.slots.len()),
        }
    }

    /// Entry by chronological index (0 = oldest).
    fn get(&self, idx: usize) -> Option<&ClockValuation> {
        match &self.storage {
            Storage::Deque { entries, .. } => entries.get(idx),
            Storage::Ring(ring) => ring.get(idx),
        }
    }

    /// The current (newest) valuation.
    pub fn current(&self) -> ClockValuation {
        // Non-empty by construction.
        self.get(self.len() - 1).copied().unwrap_or_default()
    }

    fn current_mut(&mut self) -> &mut ClockValuation {
        match &mut self.storage {
            Storage::Deque { entries, .. } => {
                if entries.is_empty() {
                    entries.push_back(ClockValuation::ZERO);
                }
                let last = entries.len() - 1;
                &mut entries[last]
            }
            Storage::Ring(ring) => ring.last_mut(),
        }
    }

    /// Valuation `depth` windows back from the current one (0 = current).
    /// `None` when the trace does not reach that far.
    pub fn at_depth(&self, depth: usize) -> Option<ClockValuation> {
        let len = self.len();
        if depth < len {
            self.get(len - 1 - depth).copied()
        } else {
            None
        }
    }

    pub fn advance(&mut self, delta_env: u64, delta_sys: u64) {
        self.current_mut().advance(delta_env, delta_sys);
    }

    pub fn reset(&mut self) {
        self.current_mut().reset();
    }

    /// Append a new current valuation, evicting the oldest past capacity.
    pub fn push(&mut self, value: ClockValuation) {
        match &mut self.storage {
            Storage::Deque { entries, capacity } => {
                entries.push_back(value);
                if let Some(cap) = *capacity {
                    while entries.len() > cap {
                        entries.pop_front();
                    }
                }
            }
            Storage::Ring(ring) => ring.push(value),
        }
    }

    /// Start the next time window: duplicate the current valuation.
    pub fn open_window(&mut self) {
        let current = self.current();
        self.push(current);
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = ClockValuation> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i).copied())
    }

    pub fn to_vec(&self) -> Vec<ClockValuation> {
        self.iter().collect()
    }
}

impl PartialEq for ClockTrace {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClockTrace {}

impl PartialOrd for ClockTrace {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic by valuation, oldest first. Storage layout never
/// participates.
impl Ord for ClockTrace {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl fmt::Display for ClockTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}
