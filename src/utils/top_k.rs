use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A scored id. Orders by score, and among equal scores the lower id ranks higher.
#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub id: u32,
    pub score: f64,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Bounded top-K collector
///
/// Min-heap of capacity `k + 1`: push, then pop the minimum whenever the size
/// exceeds `k`. Memory stays O(k) however many candidates are offered.
/// NaN scores are never kept.
#[derive(Debug)]
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<Scored>>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    #[inline]
    pub fn push(&mut self, id: u32, score: f64) {
        if score.is_nan() || self.k == 0 {
            return;
        }
        self.heap.push(Reverse(Scored { id, score }));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Combine two collectors of the same capacity
    ///
    /// The result keeps the same entries as a single collector offered every
    /// candidate of both, whatever the split.
    pub fn merge(mut self, other: TopK) -> TopK {
        if self.heap.len() < other.heap.len() {
            return other.merge(self);
        }
        for Reverse(s) in other.heap {
            self.push(s.id, s.score);
        }
        self
    }

    /// Kept entries sorted ascending by id
    pub fn into_sorted_by_id(self) -> Vec<Scored> {
        let mut kept: Vec<Scored> = self.heap.into_iter().map(|Reverse(s)| s).collect();
        kept.sort_unstable_by_key(|s| s.id);
        kept
    }

    /// Kept entries, best first
    pub fn into_sorted_by_score(self) -> Vec<Scored> {
        let mut kept: Vec<Scored> = self.heap.into_iter().map(|Reverse(s)| s).collect();
        kept.sort_unstable_by(|a, b| b.cmp(a));
        kept
    }
}
