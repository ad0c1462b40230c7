pub mod weighter;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::vector::weighter::TermWeighter;

/// One nonzero entry of a sparse document vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Term {
    pub id: u32,
    pub weight: f64,
}

impl Term {
    #[inline]
    pub fn new(id: u32, weight: f64) -> Self {
        Self { id, weight }
    }
}

/// SparseVector
/// A document vector as terms sorted strictly ascending by id.
///
/// Every constructor of this crate keeps that order, which is what lets
/// [`dot_product`] run as a linear merge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseVector {
    terms: Vec<Term>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Build from terms already sorted strictly ascending by id
    pub fn from_sorted(terms: Vec<Term>) -> Self {
        debug_assert!(
            terms.windows(2).all(|w| w[0].id < w[1].id),
            "terms must be sorted strictly ascending by id"
        );
        Self { terms }
    }

    #[inline]
    pub fn as_slice(&self) -> &[Term] {
        &self.terms
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.terms.iter()
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.terms.iter().map(|t| t.weight * t.weight).sum::<f64>().sqrt()
    }

    /// Divide every weight by the norm; a zero vector becomes all zeros
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for t in &mut self.terms {
                t.weight /= norm;
            }
        } else {
            for t in &mut self.terms {
                t.weight = 0.0;
            }
        }
    }

    #[inline]
    pub fn dot(&self, other: &SparseVector) -> f64 {
        dot_product(&self.terms, &other.terms)
    }

    pub fn into_inner(self) -> Vec<Term> {
        self.terms
    }
}

impl<'a> IntoIterator for &'a SparseVector {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

/// Dot product of two id-sorted term slices
/// d(a, b) = Σ(a_i * b_i), two-pointer merge in O(|a| + |b|)
pub fn dot_product(a: &[Term], b: &[Term]) -> f64 {
    let mut ia = 0;
    let mut ib = 0;
    let mut dot = 0_f64;
    while ia < a.len() && ib < b.len() {
        match a[ia].id.cmp(&b[ib].id) {
            Ordering::Less => ia += 1,
            Ordering::Greater => ib += 1,
            Ordering::Equal => {
                dot += a[ia].weight * b[ib].weight;
                ia += 1;
                ib += 1;
            }
        }
    }
    dot
}

/// DocumentVector
/// Turns the resolved word ids of a document into a weighted sparse vector.
///
/// # Examples
/// ```
/// use text_classifier::{DocumentVector, TfOnlyWeighter};
/// let builder = DocumentVector::new(TfOnlyWeighter);
/// let v = builder.build(&[3, 1, 3], false);
/// let ids: Vec<u32> = v.iter().map(|t| t.id).collect();
/// assert_eq!(ids, vec![1, 3]);
/// assert_eq!(v.as_slice()[1].weight, 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct DocumentVector<W: TermWeighter> {
    weighter: W,
}

impl<W: TermWeighter> DocumentVector<W> {
    pub fn new(weighter: W) -> Self {
        Self { weighter }
    }

    pub fn weighter(&self) -> &W {
        &self.weighter
    }

    /// Count ids, weight each distinct id, optionally L2-normalize
    ///
    /// # Arguments
    /// * `ids` - word ids of the document, in any order, repeats allowed
    /// * `normalize` - divide by the Euclidean norm of the weighted vector
    pub fn build(&self, ids: &[u32], normalize: bool) -> SparseVector {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        let doc_len = ids.len();

        let mut terms: Vec<Term> = Vec::new();
        let mut iter = sorted.into_iter().peekable();
        while let Some(id) = iter.next() {
            let mut count = 1u32;
            while iter.next_if_eq(&id).is_some() {
                count += 1;
            }
            terms.push(Term::new(id, self.weighter.weight(id, count as f64, doc_len)));
        }

        let mut vec = SparseVector::from_sorted(terms);
        if normalize {
            vec.normalize();
        }
        vec
    }
}
