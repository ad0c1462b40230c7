pub mod chi_square;
pub mod sts;

use log::info;

use crate::cache::TrainingCache;
use crate::config::{SelectionMethod, StsConfig};
use crate::error::{Error, Result};
use crate::lexicon::{IdMap, Lexicon};
use crate::utils::top_k::TopK;

/// Class-conditional document counts gathered in one pass over the cache
///
/// Memory is O(vocabulary × classes) and independent of the corpus size.
#[derive(Debug, Clone)]
pub struct FeatureStats {
    num_classes: usize,
    /// documents of class j containing term i, at `i * num_classes + j`
    class_term: Vec<u32>,
    /// documents containing term i
    term_docs: Vec<u32>,
    /// documents per class
    class_size: Vec<u64>,
    num_docs: u64,
    /// summed document lengths, terms with lexicon df == 1 excluded
    length_sum: u64,
}

impl FeatureStats {
    /// Scan `cache` once
    ///
    /// A record whose label or term id is out of range aborts the scan with
    /// [`Error::CorruptCache`]; partial statistics are never returned.
    pub fn collect(cache: &TrainingCache, lexicon: &Lexicon, num_classes: usize) -> Result<Self> {
        let vocab = lexicon.len();
        let mut stats = Self {
            num_classes,
            class_term: vec![0; vocab * num_classes],
            term_docs: vec![0; vocab],
            class_size: vec![0; num_classes],
            num_docs: 0,
            length_sum: 0,
        };

        let mut reader = cache.scan()?;
        while let Some(record) = reader.next_record()? {
            let label = record.label as usize;
            if label >= num_classes {
                return Err(Error::CorruptCache {
                    record: stats.num_docs,
                    reason: format!("label {label} outside [0, {num_classes})"),
                });
            }
            stats.class_size[label] += 1;
            stats.num_docs += 1;
            for term in record.terms {
                let id = term.id as usize;
                if id >= vocab {
                    return Err(Error::CorruptCache {
                        record: stats.num_docs - 1,
                        reason: format!("term id {id} outside lexicon of {vocab} words"),
                    });
                }
                stats.class_term[id * num_classes + label] += 1;
                stats.term_docs[id] += 1;
                if lexicon.df(term.id) != 1 {
                    stats.length_sum += 1;
                }
            }
        }
        Ok(stats)
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    #[inline]
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.term_docs.len()
    }

    /// Documents of class `class` containing term `id`
    #[inline]
    pub fn class_term(&self, id: u32, class: usize) -> u64 {
        self.class_term[id as usize * self.num_classes + class] as u64
    }

    /// Documents containing term `id`
    #[inline]
    pub fn term_docs(&self, id: u32) -> u64 {
        self.term_docs[id as usize] as u64
    }

    #[inline]
    pub fn class_size(&self, class: usize) -> u64 {
        self.class_size[class]
    }

    /// Mean document length, df == 1 terms not counted
    pub fn mean_doc_len(&self) -> f64 {
        if self.num_docs == 0 {
            return 0.0;
        }
        self.length_sum as f64 / self.num_docs as f64
    }
}

/// FeatureSelector
/// Scores every lexicon id from [`FeatureStats`] and keeps the best K.
///
/// Terms with document frequency exactly 1, or whose name is longer than
/// `max_term_len` characters, are never scored and thus never selected.
///
/// The result maps old lexicon ids to new ids `0..K'-1` (K' ≤ K) assigned in
/// ascending old-id order, so id-sorted vectors stay id-sorted after remapping.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSelector<'a> {
    lexicon: &'a Lexicon,
    max_term_len: usize,
}

impl<'a> FeatureSelector<'a> {
    pub fn new(lexicon: &'a Lexicon, max_term_len: usize) -> Self {
        Self {
            lexicon,
            max_term_len,
        }
    }

    /// Whether `id` may be scored at all
    #[inline]
    pub fn is_eligible(&self, id: u32) -> bool {
        match self.lexicon.word(id) {
            Some(w) => w.df != 1 && w.name.chars().count() <= self.max_term_len,
            None => false,
        }
    }

    /// Select up to `k` features with `method`
    pub fn select(
        &self,
        method: SelectionMethod,
        stats: &FeatureStats,
        k: usize,
        sts: &StsConfig,
    ) -> Result<IdMap> {
        let map = match method {
            SelectionMethod::ChiSquare => self.select_chi_square(stats, k),
            SelectionMethod::ScalableTermSelection => self.select_sts(stats, k, sts),
        };
        if map.is_empty() {
            return Err(Error::FeatureSelectionFailure(format!(
                "no eligible feature among {} terms",
                stats.vocab_size()
            )));
        }
        info!(
            "{:?} kept {} of {} terms (max {})",
            method,
            map.len(),
            stats.vocab_size(),
            k
        );
        Ok(map)
    }
}

/// Old-id -> new-id map of the kept entries, new ids in ascending old-id order
pub(crate) fn id_map_from(top: TopK) -> IdMap {
    IdMap::dense_from_ordered(top.into_sorted_by_id().into_iter().map(|s| s.id))
}


#[cfg(test)]
mod tests {
    use super::testutil::ingest;
    use super::*;

    #[test]
    fn collect_counts_documents_not_occurrences() {
        let dir = tempfile::tempdir().unwrap();
        let (lex, cache) = ingest(
            dir.path(),
            &[(0, "cat dog cat"), (0, "cat bird"), (1, "fish fish whale")],
        );
        let stats = FeatureStats::collect(&cache, &lex, 2).unwrap();
        let cat = lex.id_of("cat").unwrap();
        let fish = lex.id_of("fish").unwrap();
        assert_eq!(stats.num_docs(), 3);
        assert_eq!(stats.class_size(0), 2);
        assert_eq!(stats.class_term(cat, 0), 2);
        assert_eq!(stats.class_term(cat, 1), 0);
        assert_eq!(stats.term_docs(fish), 1);
        // only "cat" has df != 1
        assert_eq!(stats.mean_doc_len(), 2.0 / 3.0);
    }

    #[test]
    fn collect_rejects_labels_beyond_class_count() {
        let dir = tempfile::tempdir().unwrap();
        let (lex, cache) = ingest(dir.path(), &[(0, "a b"), (3, "a c")]);
        let err = FeatureStats::collect(&cache, &lex, 2).unwrap_err();
        assert!(matches!(err, Error::CorruptCache { record: 1, .. }));
    }

    #[test]
    fn collect_rejects_a_term_counted_twice_in_one_document() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let (lex, cache) = ingest(dir.path(), &[(0, "a b"), (1, "a b")]);
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(cache.path())
            .unwrap();
        file.write_all(&0i32.to_be_bytes()).unwrap();
        file.write_all(&2i32.to_be_bytes()).unwrap();
        for _ in 0..2 {
            file.write_all(&0i32.to_be_bytes()).unwrap();
            file.write_all(&1.0f64.to_be_bytes()).unwrap();
        }
        drop(file);

        let err = FeatureStats::collect(&cache, &lex, 2).unwrap_err();
        assert!(matches!(err, Error::CorruptCache { record: 2, .. }), "{err}");
    }

    #[test]
    fn eligibility_excludes_hapax_and_long_names() {
        let mut lex = Lexicon::new();
        let long = "x".repeat(51);
        lex.add_document(&["once", "twice", long.as_str()]);
        lex.add_document(&["twice", long.as_str()]);
        let selector = FeatureSelector::new(&lex, 50);
        assert!(!selector.is_eligible(lex.id_of("once").unwrap()));
        assert!(selector.is_eligible(lex.id_of("twice").unwrap()));
        assert!(!selector.is_eligible(lex.id_of(&long).unwrap()));
        assert!(!selector.is_eligible(99));
    }

    #[test]
    fn select_fails_when_nothing_is_eligible() {
        let dir = tempfile::tempdir().unwrap();
        let (lex, cache) = ingest(dir.path(), &[(0, "a"), (1, "b")]);
        let stats = FeatureStats::collect(&cache, &lex, 2).unwrap();
        let selector = FeatureSelector::new(&lex, 50);
        for method in [SelectionMethod::ChiSquare, SelectionMethod::ScalableTermSelection] {
            let res = selector.select(method, &stats, 10, &StsConfig::default());
            assert!(matches!(res, Err(Error::FeatureSelectionFailure(_))));
        }
    }
}
