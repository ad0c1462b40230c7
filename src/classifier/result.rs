use std::fmt;

use serde::{Deserialize, Serialize};

/// Probabilities closer than this are treated as equal when ranking
pub const PROB_EPSILON: f64 = 1e-20;

/// A predicted label with its probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifyResult {
    pub label: u32,
    pub prob: f64,
}

impl ClassifyResult {
    pub fn new(label: u32, prob: f64) -> Self {
        Self { label, prob }
    }
}

impl fmt::Display for ClassifyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.label, self.prob)
    }
}

/// Rank per-class probabilities, best first, keeping at most `n`
///
/// Probabilities within [`PROB_EPSILON`] of each other keep their label order.
/// An insertion sort is used since the epsilon comparison is not transitive.
pub fn rank_top_n(probs: &[f64], n: usize) -> Vec<ClassifyResult> {
    let mut ranked: Vec<ClassifyResult> = probs
        .iter()
        .enumerate()
        .map(|(label, &prob)| ClassifyResult::new(label as u32, prob))
        .collect();
    for i in 1..ranked.len() {
        let mut j = i;
        while j > 0 && ranked[j].prob - ranked[j - 1].prob >= PROB_EPSILON {
            ranked.swap(j, j - 1);
            j -= 1;
        }
    }
    ranked.truncate(n);
    ranked
}
