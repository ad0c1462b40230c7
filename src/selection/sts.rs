//! Scalable Term Selection
//!
//! Each term gets a probability ratio `pr = max_j P(t|c_j) / P(t|¬c_j)` and a
//! document frequency `freq`. For a mixing weight λ the score is
//!
//! ```text
//! 1 / (λ / ln(pr) + (1 - λ) / ln(freq))
//! ```
//!
//! λ is searched by bisection so that the average vector length of the selected
//! set, `Σ freq(selected) / N`, approaches `mean_doc_len ^ (0.085 · ln K)`.

use log::debug;
use rayon::prelude::*;

use crate::config::StsConfig;
use crate::lexicon::IdMap;
use crate::selection::{FeatureSelector, FeatureStats};
use crate::utils::top_k::TopK;

impl FeatureSelector<'_> {
    /// Probability ratio of term `id`, `+∞` when a class makes the ratio unbounded
    pub fn probability_ratio(&self, stats: &FeatureStats, id: u32) -> f64 {
        let n = stats.num_docs();
        let freq = stats.term_docs(id);
        (0..stats.num_classes())
            .map(|class| {
                let a = stats.class_term(id, class);
                let b = freq - a;
                let c = stats.class_size(class);
                let d = n - c;
                let base = b as f64 * c as f64;
                if base == 0.0 {
                    f64::INFINITY
                } else {
                    (a as f64 * d as f64) / base
                }
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Target average vector length for `k` kept features
    pub fn target_avl(stats: &FeatureStats, k: usize) -> f64 {
        stats.mean_doc_len().powf(0.085 * (k as f64).ln())
    }

    /// Keep `k` terms by the STS objective
    pub fn select_sts(&self, stats: &FeatureStats, k: usize, config: &StsConfig) -> IdMap {
        let candidates: Vec<(u32, f64, f64)> = (0..stats.vocab_size() as u32)
            .into_par_iter()
            .filter(|&id| self.is_eligible(id) && stats.term_docs(id) > 0)
            .map(|id| {
                let pr = self.probability_ratio(stats, id).ln();
                let freq = (stats.term_docs(id) as f64).ln();
                (id, pr, freq)
            })
            .collect();
        if candidates.is_empty() || stats.num_docs() == 0 {
            return IdMap::new();
        }

        let target = Self::target_avl(stats, k);
        let n = stats.num_docs() as f64;
        let mut lambda = 0.5;
        let mut low = 0.0;
        let mut high = 1.0;
        let mut kept = Vec::new();

        for iteration in 1..=config.max_iterations.max(1) {
            let mut top = TopK::new(k);
            for &(id, ln_pr, ln_freq) in &candidates {
                top.push(id, 1.0 / (lambda / ln_pr + (1.0 - lambda) / ln_freq));
            }
            kept = top.into_sorted_by_id();
            let avl = kept
                .iter()
                .map(|s| stats.term_docs(s.id) as f64)
                .sum::<f64>()
                / n;
            debug!(
                "sts iteration {}: lambda = {} avl = {} target = {}",
                iteration, lambda, avl, target
            );

            if (avl - target).abs() < config.tolerance {
                break;
            }
            if avl < target {
                high = lambda;
                lambda = (low + lambda) / 2.0;
            } else {
                low = lambda;
                lambda = (lambda + high) / 2.0;
            }
            if high - low < config.min_bracket {
                break;
            }
        }
        IdMap::dense_from_ordered(kept.into_iter().map(|s| s.id))
    }
}
