use rayon::prelude::*;

use crate::lexicon::IdMap;
use crate::selection::{id_map_from, FeatureSelector, FeatureStats};
use crate::utils::top_k::TopK;

/// Chi-square statistic of a 2×2 term/class contingency table
///
/// * `a` - class documents containing the term
/// * `b` - documents outside the class containing the term
/// * `c` - class documents without the term
/// * `d` - documents outside the class without the term
///
/// `(AD - BC)² / ((A+C)(B+D)(A+B)(C+D))`, 0 when the denominator is 0.
/// The constant factor N is left out since it is the same for every term.
#[inline]
pub fn chi_square(a: u64, b: u64, c: u64, d: u64) -> f64 {
    let (a, b, c, d) = (a as f64, b as f64, c as f64, d as f64);
    let denom = (a + c) * (b + d) * (a + b) * (c + d);
    if denom == 0.0 {
        return 0.0;
    }
    let diff = a * d - b * c;
    diff / denom * diff
}

impl FeatureSelector<'_> {
    /// max over classes of the chi-square statistic of term `id`
    pub fn chi_max(&self, stats: &FeatureStats, id: u32) -> f64 {
        let n = stats.num_docs();
        let freq = stats.term_docs(id);
        (0..stats.num_classes())
            .map(|class| {
                let a = stats.class_term(id, class);
                let b = freq - a;
                let c = stats.class_size(class) - a;
                let d = n - a - b - c;
                chi_square(a, b, c, d)
            })
            .fold(0.0, f64::max)
    }

    /// chimax of every term, `None` for terms excluded from selection
    ///
    /// Holds one entry per lexicon id. Selection itself goes through
    /// [`select_chi_square`](Self::select_chi_square).
    pub fn chi_square_scores(&self, stats: &FeatureStats) -> Vec<Option<f64>> {
        (0..stats.vocab_size() as u32)
            .into_par_iter()
            .map(|id| self.is_eligible(id).then(|| self.chi_max(stats, id)))
            .collect()
    }

    /// Keep the `k` terms with the highest chimax, ties going to the lower id
    ///
    /// Scores stream into per-thread collectors of size `k`, so memory beyond
    /// the statistics is O(k) per worker.
    pub fn select_chi_square(&self, stats: &FeatureStats, k: usize) -> IdMap {
        let top = (0..stats.vocab_size() as u32)
            .into_par_iter()
            .filter(|&id| self.is_eligible(id))
            .fold(
                || TopK::new(k),
                |mut top, id| {
                    top.push(id, self.chi_max(stats, id));
                    top
                },
            )
            .reduce(|| TopK::new(k), TopK::merge);
        id_map_from(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::testutil::ingest;

    #[test]
    fn chi_square_matches_hand_computation() {
        // A=3, B=1, C=1, D=5: (15 - 1)² / (4 * 6 * 4 * 6)
        let expected = 196.0 / 576.0;
        assert!((chi_square(3, 1, 1, 5) - expected).abs() < 1e-12);
    }

    #[test]
    fn zero_denominator_scores_zero() {
        // term in every document
        assert_eq!(chi_square(2, 3, 0, 0), 0.0);
        // term in no document
        assert_eq!(chi_square(0, 0, 2, 3), 0.0);
    }

    #[test]
    fn never_selects_hapax_terms() {
        let dir = tempfile::tempdir().unwrap();
        let (lex, cache) = ingest(
            dir.path(),
            &[(0, "cat dog cat"), (0, "cat bird"), (1, "fish fish whale")],
        );
        let stats = FeatureStats::collect(&cache, &lex, 2).unwrap();
        let selector = FeatureSelector::new(&lex, 50);
        let map = selector.select_chi_square(&stats, 10);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(lex.id_of("cat").unwrap()), Some(0));
        for (old, _) in map.iter() {
            assert_ne!(lex.word(old).unwrap().df, 1);
        }
    }

    #[test]
    fn keeps_most_discriminative_and_renumbers_by_old_id() {
        let dir = tempfile::tempdir().unwrap();
        let (lex, cache) = ingest(
            dir.path(),
            &[
                (0, "common sport ball"),
                (0, "common sport goal"),
                (0, "common ball goal"),
                (1, "common vote law"),
                (1, "common vote party"),
                (1, "common law party"),
            ],
        );
        let stats = FeatureStats::collect(&cache, &lex, 2).unwrap();
        let selector = FeatureSelector::new(&lex, 50);

        let scores = selector.chi_square_scores(&stats);
        let common = lex.id_of("common").unwrap() as usize;
        assert_eq!(scores[common], Some(0.0));

        let map = selector.select_chi_square(&stats, 4);
        assert_eq!(map.len(), 4);
        assert!(!map.contains(common as u32));
        let olds: Vec<u32> = map.iter().map(|(old, _)| old).collect();
        let news: Vec<u32> = map.iter().map(|(_, new)| new).collect();
        assert!(olds.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(news, vec![0, 1, 2, 3]);
    }

    #[test]
    fn streamed_selection_agrees_with_full_scores() {
        let dir = tempfile::tempdir().unwrap();
        let (lex, cache) = ingest(
            dir.path(),
            &[
                (0, "a b c d"),
                (0, "a b e"),
                (1, "c d e f"),
                (1, "f g a"),
                (2, "g h b"),
                (2, "h c f"),
            ],
        );
        let stats = FeatureStats::collect(&cache, &lex, 3).unwrap();
        let selector = FeatureSelector::new(&lex, 50);
        let scores = selector.chi_square_scores(&stats);
        for k in 1..=lex.len() {
            let mut ranked: Vec<(u32, f64)> = scores
                .iter()
                .enumerate()
                .filter_map(|(id, s)| s.map(|s| (id as u32, s)))
                .collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            let mut expected: Vec<u32> = ranked.iter().take(k).map(|&(id, _)| id).collect();
            expected.sort_unstable();

            let map = selector.select_chi_square(&stats, k);
            let kept: Vec<u32> = map.iter().map(|(old, _)| old).collect();
            assert_eq!(kept, expected, "k = {k}");
        }
    }

    #[test]
    fn k_larger_than_vocabulary_returns_all_eligible() {
        let dir = tempfile::tempdir().unwrap();
        let (lex, cache) = ingest(dir.path(), &[(0, "a b c"), (1, "a b"), (1, "c d")]);
        let stats = FeatureStats::collect(&cache, &lex, 2).unwrap();
        let selector = FeatureSelector::new(&lex, 50);
        let map = selector.select_chi_square(&stats, 100);
        // d occurs once
        assert_eq!(map.len(), 3);
        assert!(!map.contains(lex.id_of("d").unwrap()));
    }
}
