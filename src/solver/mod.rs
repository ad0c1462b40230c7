pub mod linear;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::vector::{SparseVector, Term};

/// Training set handed to a [`Solver`]
///
/// Row `i` has label `labels[i]`; every term id is below `num_features` and
/// every label below `num_classes`.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    pub labels: Vec<u32>,
    pub rows: Vec<SparseVector>,
    pub num_features: usize,
    pub num_classes: usize,
}

impl Problem {
    pub fn new(num_features: usize, num_classes: usize) -> Self {
        Self {
            labels: Vec::new(),
            rows: Vec::new(),
            num_features,
            num_classes,
        }
    }

    pub fn push(&mut self, label: u32, row: SparseVector) {
        self.labels.push(label);
        self.rows.push(row);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check the shape of the problem
    ///
    /// Any violation is reported as [`Error::SolverRejected`].
    pub fn validate(&self) -> Result<()> {
        if self.labels.len() != self.rows.len() {
            return Err(Error::SolverRejected(format!(
                "{} labels for {} rows",
                self.labels.len(),
                self.rows.len()
            )));
        }
        if self.rows.is_empty() {
            return Err(Error::SolverRejected("problem has no rows".into()));
        }
        if self.num_features == 0 {
            return Err(Error::SolverRejected("problem has no features".into()));
        }
        if self.num_classes == 0 {
            return Err(Error::SolverRejected("problem has no classes".into()));
        }
        for (i, (&label, row)) in self.labels.iter().zip(&self.rows).enumerate() {
            if label as usize >= self.num_classes {
                return Err(Error::SolverRejected(format!(
                    "row {i}: label {label} outside [0, {})",
                    self.num_classes
                )));
            }
            if let Some(t) = row.iter().find(|t| t.id as usize >= self.num_features) {
                return Err(Error::SolverRejected(format!(
                    "row {i}: feature {} outside [0, {})",
                    t.id, self.num_features
                )));
            }
        }
        Ok(())
    }
}

/// Solver
/// A training and prediction backend.
///
/// The classifier only ever talks to this trait, so feature selection, caching
/// and vectorization are shared by every backend. A model must be serializable;
/// the provided `save_model` / `load_model` / `model_to_bytes` / `model_from_bytes`
/// store it as CBOR, and a backend may override them with its own format.
pub trait Solver {
    type Model: Serialize + DeserializeOwned;

    /// Fit a model on `problem`
    fn train(&self, problem: &Problem) -> Result<Self::Model>;

    /// Per-class probabilities of a feature vector, indexed `0..num_classes`
    fn predict_probabilities(&self, model: &Self::Model, features: &[Term]) -> Vec<f64>;

    /// Number of classes the model scores
    fn num_classes(&self, model: &Self::Model) -> usize;

    fn model_to_bytes(&self, model: &Self::Model) -> Result<Vec<u8>> {
        Ok(serde_cbor::to_vec(model)?)
    }

    fn model_from_bytes(&self, bytes: &[u8]) -> Result<Self::Model> {
        Ok(serde_cbor::from_slice(bytes)?)
    }

    fn save_model(&self, model: &Self::Model, path: &Path) -> Result<()> {
        let bytes = self.model_to_bytes(model)?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    fn load_model(&self, path: &Path) -> Result<Self::Model> {
        let mut bytes = Vec::new();
        BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
        self.model_from_bytes(&bytes)
    }
}
