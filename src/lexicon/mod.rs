pub mod id_map;
pub mod io;
pub mod prune;

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{Error, Result};

pub use id_map::IdMap;

/// Corpus statistics of one vocabulary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Counts {
    /// global term frequency
    pub(crate) tf: u64,
    /// global document frequency
    pub(crate) df: u64,
}

/// A vocabulary entry as seen through the lexicon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<'a> {
    pub id: u32,
    pub name: &'a str,
    pub tf: u64,
    pub df: u64,
}

/// Lexicon
/// Vocabulary store mapping token names to dense ids `0..len-1`, with the
/// global term frequency and document frequency of every token.
///
/// The id of a word is its position in an insertion-ordered map, so the
/// id -> word and name -> word views can never disagree.
///
/// While unlocked, `add_document` and `convert_document` grow the vocabulary.
/// Once locked, unseen tokens are dropped instead.
///
/// # Examples
/// ```
/// use text_classifier::Lexicon;
/// let mut lexicon = Lexicon::new();
/// lexicon.add_document(&["cat", "dog", "cat"]);
/// let cat = lexicon.word_by_name("cat").unwrap();
/// assert_eq!((cat.id, cat.tf, cat.df), (0, 2, 1));
/// lexicon.set_lock(true);
/// assert_eq!(lexicon.convert_document(&["cat", "whale"]), vec![0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    words: IndexMap<Box<str>, Counts>,
    locked: bool,
    num_docs: u64,
    /// ids already counted for df in the current `add_document` call
    seen: HashSet<u32>,
}

impl Lexicon {
    /// Create an empty, unlocked lexicon
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_lock(&mut self, locked: bool) {
        self.locked = locked;
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Number of words
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of documents counted into the statistics
    #[inline]
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// Get a word by id
    pub fn word(&self, id: u32) -> Option<Word<'_>> {
        self.words
            .get_index(id as usize)
            .map(|(name, counts)| Word {
                id,
                name,
                tf: counts.tf,
                df: counts.df,
            })
    }

    /// Get a word by name
    pub fn word_by_name(&self, name: &str) -> Option<Word<'_>> {
        self.words
            .get_full(name)
            .map(|(idx, name, counts)| Word {
                id: idx as u32,
                name,
                tf: counts.tf,
                df: counts.df,
            })
    }

    #[inline]
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.words.get_index_of(name).map(|idx| idx as u32)
    }

    /// Document frequency of `id`, 0 when unknown
    #[inline]
    pub fn df(&self, id: u32) -> u64 {
        self.words.get_index(id as usize).map_or(0, |(_, c)| c.df)
    }

    /// All words in id order
    pub fn iter(&self) -> impl Iterator<Item = Word<'_>> {
        self.words.iter().enumerate().map(|(idx, (name, counts))| Word {
            id: idx as u32,
            name,
            tf: counts.tf,
            df: counts.df,
        })
    }

    /// Look a token up, creating it with zero counts when the lexicon is unlocked
    fn lookup_or_create(&mut self, token: &str) -> Option<(u32, bool)> {
        if let Some(idx) = self.words.get_index_of(token) {
            return Some((idx as u32, false));
        }
        if self.locked {
            return None;
        }
        let (idx, _) = self.words.insert_full(token.into(), Counts::default());
        Some((idx as u32, true))
    }

    /// Count one document into the statistics
    ///
    /// tf grows by one per occurrence, df by one per document no matter how often
    /// the token repeats. Unseen tokens are dropped when locked.
    pub fn add_document<T>(&mut self, tokens: &[T])
    where
        T: AsRef<str>,
    {
        self.seen.clear();
        for token in tokens {
            let Some((id, _)) = self.lookup_or_create(token.as_ref()) else {
                continue;
            };
            let first = self.seen.insert(id);
            if let Some((_, counts)) = self.words.get_index_mut(id as usize) {
                counts.tf += 1;
                if first {
                    counts.df += 1;
                }
            }
        }
        self.num_docs += 1;
    }

    /// Resolve tokens to word ids, keeping token order and repeats
    ///
    /// When unlocked, unseen tokens are created with `tf = df = 1`.
    /// When locked, they are dropped.
    pub fn convert_document<T>(&mut self, tokens: &[T]) -> Vec<u32>
    where
        T: AsRef<str>,
    {
        let mut ids = Vec::with_capacity(tokens.len());
        for token in tokens {
            let Some((id, created)) = self.lookup_or_create(token.as_ref()) else {
                continue;
            };
            if created {
                if let Some((_, counts)) = self.words.get_index_mut(id as usize) {
                    *counts = Counts { tf: 1, df: 1 };
                }
            }
            ids.push(id);
        }
        ids
    }

    /// Read-only `convert_document`: unseen tokens are always dropped
    pub fn resolve<T>(&self, tokens: &[T]) -> Vec<u32>
    where
        T: AsRef<str>,
    {
        tokens
            .iter()
            .filter_map(|token| self.id_of(token.as_ref()))
            .collect()
    }

    /// Build a new lexicon holding the words whose ids are keys of `translation`,
    /// renumbered to the mapped ids. `num_docs` is carried over, the result is unlocked.
    ///
    /// The mapped ids must be exactly `0..translation.len()`.
    pub fn map(&self, translation: &IdMap) -> Result<Lexicon> {
        let mut order: Vec<(u32, u32)> = Vec::with_capacity(translation.len());
        for (old, new) in translation.iter() {
            if old as usize >= self.words.len() {
                return Err(Error::NonDenseIds(format!("unknown source id {old}")));
            }
            order.push((new, old));
        }
        order.sort_unstable();
        for (expected, &(new, _)) in order.iter().enumerate() {
            if new as usize != expected {
                return Err(Error::NonDenseIds(format!(
                    "expected target id {expected}, found {new}"
                )));
            }
        }
        Ok(self.rebuild(order.into_iter().map(|(_, old)| old)))
    }

    /// New lexicon made of `old_ids`, numbered in iteration order
    pub(crate) fn rebuild<I>(&self, old_ids: I) -> Lexicon
    where
        I: IntoIterator<Item = u32>,
    {
        let iter = old_ids.into_iter();
        let mut words = IndexMap::with_capacity(iter.size_hint().0);
        for old in iter {
            if let Some((name, counts)) = self.words.get_index(old as usize) {
                words.insert(name.clone(), *counts);
            }
        }
        Lexicon {
            words,
            locked: false,
            num_docs: self.num_docs,
            seen: HashSet::new(),
        }
    }

    /// Union by name: names new to `self` get fresh ids, tf/df and `num_docs` are summed
    pub fn merge_from(&mut self, other: &Lexicon) {
        for (name, counts) in other.words.iter() {
            let local = self.words.entry(name.clone()).or_default();
            local.tf += counts.tf;
            local.df += counts.df;
        }
        self.num_docs += other.num_docs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_words() -> Lexicon {
        let mut lex = Lexicon::new();
        let tokens: Vec<String> = (0..10).map(|i| format!("w{i}")).collect();
        lex.add_document(&tokens);
        lex
    }

    #[test]
    fn add_document_counts_tf_per_occurrence_and_df_per_document() {
        let mut lex = Lexicon::new();
        lex.add_document(&["a", "b", "a", "a"]);
        lex.add_document(&["a", "c"]);

        let a = lex.word_by_name("a").unwrap();
        assert_eq!((a.id, a.tf, a.df), (0, 4, 2));
        let b = lex.word_by_name("b").unwrap();
        assert_eq!((b.id, b.tf, b.df), (1, 1, 1));
        assert_eq!(lex.word(2).unwrap().name, "c");
        assert_eq!(lex.num_docs(), 2);
        assert_eq!(lex.len(), 3);
    }

    #[test]
    fn add_then_convert_preserves_occurrence_totals() {
        let docs: Vec<Vec<&str>> = vec![
            vec!["x", "y", "x"],
            vec!["y", "y", "z"],
            vec!["x"],
        ];
        let mut lex = Lexicon::new();
        let mut total = 0;
        for doc in &docs {
            lex.add_document(doc);
            total += doc.len() as u64;
        }
        let mut distinct = HashSet::new();
        for doc in &docs {
            let ids = lex.convert_document(doc);
            assert_eq!(ids.len(), doc.len());
            distinct.extend(ids);
        }
        let tf_sum: u64 = distinct.iter().map(|&id| lex.word(id).unwrap().tf).sum();
        assert_eq!(tf_sum, total);
        for word in lex.iter() {
            let containing = docs.iter().filter(|d| d.contains(&word.name)).count() as u64;
            assert!(word.df <= containing);
            assert!(word.tf >= word.df);
        }
    }

    #[test]
    fn locked_lexicon_drops_unseen_tokens() {
        let mut lex = Lexicon::new();
        lex.add_document(&["known"]);
        lex.set_lock(true);
        lex.add_document(&["known", "unknown"]);
        assert_eq!(lex.len(), 1);
        assert_eq!(lex.word(0).unwrap().tf, 2);
        assert_eq!(lex.num_docs(), 2);
        assert_eq!(lex.convert_document(&["unknown", "known"]), vec![0]);
        assert!(lex.id_of("unknown").is_none());
    }

    #[test]
    fn unlocked_convert_creates_words_once() {
        let mut lex = Lexicon::new();
        let ids = lex.convert_document(&["new", "new", "other"]);
        assert_eq!(ids, vec![0, 0, 1]);
        let w = lex.word(0).unwrap();
        assert_eq!((w.tf, w.df), (1, 1));
        assert_eq!(lex.num_docs(), 0);
    }

    #[test]
    fn resolve_never_grows() {
        let mut lex = Lexicon::new();
        lex.add_document(&["a"]);
        assert_eq!(lex.resolve(&["b", "a", "a"]), vec![0, 0]);
        assert_eq!(lex.len(), 1);
    }

    #[test]
    fn map_even_ids_keeps_original_order() {
        let lex = ten_words();
        let translation: IdMap = (0..5u32).map(|i| (i * 2, i)).collect();
        let mapped = lex.map(&translation).unwrap();
        assert_eq!(mapped.len(), 5);
        assert_eq!(mapped.num_docs(), lex.num_docs());
        for i in 0..5u32 {
            let w = mapped.word(i).unwrap();
            assert_eq!(w.name, format!("w{}", i * 2));
            assert_eq!(mapped.id_of(w.name), Some(i));
        }
        assert!(mapped.word_by_name("w1").is_none());
        assert!(!mapped.is_locked());
    }

    #[test]
    fn map_rejects_gaps_and_unknown_ids() {
        let lex = ten_words();
        let gap: IdMap = [(0, 0), (1, 2)].into_iter().collect();
        assert!(matches!(lex.map(&gap), Err(Error::NonDenseIds(_))));
        let unknown: IdMap = [(42, 0)].into_iter().collect();
        assert!(matches!(lex.map(&unknown), Err(Error::NonDenseIds(_))));
    }

    #[test]
    fn map_can_permute() {
        let mut lex = Lexicon::new();
        lex.add_document(&["a", "b", "c"]);
        let reversed: IdMap = [(0, 2), (1, 1), (2, 0)].into_iter().collect();
        let mapped = lex.map(&reversed).unwrap();
        assert_eq!(mapped.id_of("a"), Some(2));
        assert_eq!(mapped.id_of("c"), Some(0));
    }

    #[test]
    fn merge_sums_shared_and_appends_novel() {
        let mut left = Lexicon::new();
        left.add_document(&["a", "b"]);
        let mut right = Lexicon::new();
        right.add_document(&["b", "c", "c"]);
        right.add_document(&["c"]);

        left.merge_from(&right);
        assert_eq!(left.num_docs(), 3);
        assert_eq!(left.len(), 3);
        let b = left.word_by_name("b").unwrap();
        assert_eq!((b.id, b.tf, b.df), (1, 2, 2));
        let c = left.word_by_name("c").unwrap();
        assert_eq!((c.id, c.tf, c.df), (2, 3, 2));
    }
}
