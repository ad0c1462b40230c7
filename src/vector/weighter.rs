use crate::lexicon::Lexicon;

/// Term weighting strategy
/// `(term id, raw count in the document, document length) -> weight`
pub trait TermWeighter {
    fn weight(&self, id: u32, tf: f64, doc_len: usize) -> f64;
}

/// Raw count weighting
/// Used while spilling to the training cache, so the cache stays independent of
/// the final weighting.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfOnlyWeighter;

impl TermWeighter for TfOnlyWeighter {
    #[inline]
    fn weight(&self, _id: u32, tf: f64, _doc_len: usize) -> f64 {
        tf
    }
}

/// TF-IDF weighting over the statistics of a lexicon
///
/// `log10(tf + 1) * log10(num_docs / df + 1)`
///
/// It borrows the lexicon, so a remapped lexicon always needs a new weighter.
/// Ids unknown to the lexicon weigh 0.
#[derive(Debug, Clone, Copy)]
pub struct TfIdfWeighter<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> TfIdfWeighter<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }
}

impl TermWeighter for TfIdfWeighter<'_> {
    #[inline]
    fn weight(&self, id: u32, tf: f64, _doc_len: usize) -> f64 {
        let df = self.lexicon.df(id);
        if df == 0 {
            return 0.0;
        }
        let n = self.lexicon.num_docs() as f64;
        (tf + 1.0).log10() * (n / df as f64 + 1.0).log10()
    }
}

/// Weighting applied to cached raw counts when the training problem is built
///
/// `ln(tf + 1) * ln((num_docs + 1) / df)`
#[derive(Debug, Clone, Copy)]
pub struct TrainingWeighter<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> TrainingWeighter<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }
}

impl TermWeighter for TrainingWeighter<'_> {
    #[inline]
    fn weight(&self, id: u32, tf: f64, _doc_len: usize) -> f64 {
        let df = self.lexicon.df(id);
        if df == 0 {
            return 0.0;
        }
        let n = self.lexicon.num_docs() as f64;
        (tf + 1.0).ln() * ((n + 1.0) / df as f64).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tf_only_is_identity() {
        assert_eq!(TfOnlyWeighter.weight(3, 7.0, 100), 7.0);
    }

    #[test]
    fn tf_idf_reads_current_statistics() {
        let mut lex = Lexicon::new();
        lex.add_document(&["a", "b"]);
        lex.add_document(&["a"]);
        lex.add_document(&["c"]);
        lex.add_document(&["c"]);
        let w = TfIdfWeighter::new(&lex);
        // a: df = 2, n = 4
        let expected = 2f64.log10() * 3f64.log10();
        assert!((w.weight(0, 1.0, 2) - expected).abs() < 1e-12);
        assert_eq!(w.weight(99, 1.0, 2), 0.0);
    }

    #[test]
    fn training_weighting_uses_natural_logs() {
        let mut lex = Lexicon::new();
        lex.add_document(&["a"]);
        lex.add_document(&["a", "b"]);
        lex.add_document(&["b"]);
        let w = TrainingWeighter::new(&lex);
        let expected = 3f64.ln() * 2f64.ln();
        assert!((w.weight(0, 2.0, 1) - expected).abs() < 1e-12);
    }
}
