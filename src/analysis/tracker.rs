//! Immutable access-count store threaded through the dataflow walk.
//!
//! Every operation returns a new tracker; branching CFG paths each hold an
//! independent snapshot backed by the same persistent map, so confluence
//! merges never observe another path's mutations.

use im::HashMap;

use crate::ast::{Span, SymbolId};

/// Canonical identity of a storage location, as resolved by the host.
/// Textual identity is the fallback when no symbol information exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    Symbol(SymbolId),
    Text(String),
}

/// A (container, key) lookup pair. Equality and hashing consider only the
/// storage identities; the rendered texts ride along for reporting.
#[derive(Debug, Clone)]
pub struct AccessKey {
    pub container: StorageKey,
    pub key: StorageKey,
    pub container_text: String,
    pub key_text: String,
}

impl PartialEq for AccessKey {
    fn eq(&self, other: &Self) -> bool {
        self.container == other.container && self.key == other.key
    }
}

impl Eq for AccessKey {}

impl std::hash::Hash for AccessKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.container.hash(state);
        self.key.hash(state);
    }
}

/// Read-run counter. `current` is the run length on the path being walked,
/// `max` the largest run ever seen, `max_span` the source range covering
/// the reads that produced `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counter {
    pub current: u32,
    pub max: u32,
    pub max_span: Option<Span>,
}

impl Counter {
    fn incremented(self, span: Span) -> Counter {
        let current = self.current + 1;
        if current > self.max {
            let max_span = Some(match self.max_span {
                Some(existing) => existing.union(span),
                None => span,
            });
            Counter {
                current,
                max: current,
                max_span,
            }
        } else {
            Counter { current, ..self }
        }
    }

    /// A write clears the run but keeps the evidence of past redundancy.
    fn cleared(self) -> Counter {
        Counter { current: 0, ..self }
    }

    fn merged(self, other: Counter) -> Counter {
        use std::cmp::Ordering;
        let max_span = match self.max.cmp(&other.max) {
            Ordering::Greater => self.max_span,
            Ordering::Less => other.max_span,
            Ordering::Equal => widest(self.max_span, other.max_span),
        };
        Counter {
            current: self.current.max(other.current),
            max: self.max.max(other.max),
            max_span,
        }
    }
}

fn widest(a: Option<Span>, b: Option<Span>) -> Option<Span> {
    match (a, b) {
        (Some(a), Some(b)) => {
            if b.end - b.start > a.end - a.start {
                Some(b)
            } else {
                Some(a)
            }
        }
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

/// Immutable mapping from lookup pairs to counters; the dataflow "state".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessTracker {
    counts: HashMap<AccessKey, Counter>,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AccessKey) -> Option<&Counter> {
        self.counts.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccessKey, &Counter)> {
        self.counts.iter()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Records a read of `key` at `span`.
    pub fn increment(&self, key: AccessKey, span: Span) -> Self {
        let counter = self.counts.get(&key).copied().unwrap_or_default();
        Self {
            counts: self.counts.update(key, counter.incremented(span)),
        }
    }

    /// Records a write to `key`: the current run restarts, the historical
    /// maximum and its span survive.
    pub fn reset(&self, key: AccessKey) -> Self {
        let counter = self.counts.get(&key).copied().unwrap_or_default();
        Self {
            counts: self.counts.update(key, counter.cleared()),
        }
    }

    /// Resets every pair whose container or key denotes `storage`.
    pub fn reset_matching(&self, storage: &StorageKey) -> Self {
        self.reset_where(|key| key.container == *storage || key.key == *storage)
    }

    /// Resets every pair on the container denoting `storage`.
    pub fn reset_container(&self, storage: &StorageKey) -> Self {
        self.reset_where(|key| key.container == *storage)
    }

    fn reset_where(&self, pred: impl Fn(&AccessKey) -> bool) -> Self {
        let mut counts = self.counts.clone();
        for (key, counter) in self.counts.iter() {
            if pred(key) {
                counts = counts.update(key.clone(), counter.cleared());
            }
        }
        Self { counts }
    }

    /// Pessimistic confluence union: a read on either branch counts against
    /// the join, since a later read downstream would be redundant on that
    /// branch's path.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            counts: self
                .counts
                .clone()
                .union_with(other.counts.clone(), |a, b| a.merged(b)),
        }
    }
}
