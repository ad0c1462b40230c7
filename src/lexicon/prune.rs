use std::collections::HashSet;

use crate::lexicon::Lexicon;

/// Vocabulary reduction
/// Each method returns a new, unlocked lexicon renumbered to dense ids.
/// Surviving words keep their relative id order unless stated otherwise.
impl Lexicon {
    /// Keep words occurring in at least `min_df` documents
    pub fn remove_low_df_words(&self, min_df: u64) -> Lexicon {
        self.rebuild(self.iter().filter(|w| w.df >= min_df).map(|w| w.id).collect::<Vec<_>>())
    }

    /// Keep words covering at least `coverage` (in `[0, 1]`) of all documents
    pub fn remove_low_coverage_words(&self, coverage: f64) -> Lexicon {
        let min_df = (self.num_docs as f64 * coverage).floor() as u64;
        self.remove_low_df_words(min_df)
    }

    /// Keep words occurring at least `min_tf` times in total
    pub fn remove_low_freq_words(&self, min_tf: u64) -> Lexicon {
        self.rebuild(self.iter().filter(|w| w.tf >= min_tf).map(|w| w.id).collect::<Vec<_>>())
    }

    pub fn remove_stopwords<S>(&self, stopwords: &HashSet<S>) -> Lexicon
    where
        S: std::borrow::Borrow<str> + std::hash::Hash + Eq,
    {
        self.rebuild(
            self.iter()
                .filter(|w| !stopwords.contains(w.name))
                .map(|w| w.id)
                .collect::<Vec<_>>(),
        )
    }

    /// Renumber words by descending tf, ties broken by the old id
    pub fn reorder_words_by_freq(&self) -> Lexicon {
        let mut order: Vec<(u64, u32)> = self.iter().map(|w| (w.tf, w.id)).collect();
        order.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        self.rebuild(order.into_iter().map(|(_, id)| id))
    }

    /// Tokens present in the lexicon, in input order
    pub fn remove_oov<'t, T>(&self, tokens: &'t [T]) -> Vec<&'t str>
    where
        T: AsRef<str>,
    {
        tokens
            .iter()
            .map(AsRef::as_ref)
            .filter(|t| self.id_of(t).is_some())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Lexicon {
        let mut lex = Lexicon::new();
        lex.add_document(&["the", "cat", "sat"]);
        lex.add_document(&["the", "dog", "dog", "dog"]);
        lex.add_document(&["the", "cat"]);
        lex.add_document(&["a", "bird"]);
        lex
    }

    fn names(lex: &Lexicon) -> Vec<&str> {
        lex.iter().map(|w| w.name).collect()
    }

    #[test]
    fn low_df_and_coverage_pruning() {
        let lex = corpus();
        let pruned = lex.remove_low_df_words(2);
        assert_eq!(names(&pruned), vec!["the", "cat"]);
        assert_eq!(pruned.num_docs(), 4);

        // floor(4 * 0.5) = 2
        let covered = lex.remove_low_coverage_words(0.5);
        assert_eq!(names(&covered), names(&pruned));
    }

    #[test]
    fn low_freq_pruning_uses_tf() {
        let pruned = corpus().remove_low_freq_words(3);
        assert_eq!(names(&pruned), vec!["the", "dog"]);
    }

    #[test]
    fn stopwords_are_removed() {
        let stop: HashSet<&str> = ["the", "a"].into_iter().collect();
        let pruned = corpus().remove_stopwords(&stop);
        assert_eq!(names(&pruned), vec!["cat", "sat", "dog", "bird"]);
        assert_eq!(pruned.id_of("dog"), Some(2));
    }

    #[test]
    fn reorder_by_freq_breaks_ties_by_id() {
        let reordered = corpus().reorder_words_by_freq();
        assert_eq!(names(&reordered), vec!["the", "dog", "cat", "sat", "a", "bird"]);
        assert_eq!(reordered.word(0).unwrap().tf, 3);
    }

    #[test]
    fn remove_oov_keeps_known_tokens() {
        let lex = corpus();
        let kept = lex.remove_oov(&["cat", "zebra", "the"]);
        assert_eq!(kept, vec!["cat", "the"]);
    }
}
