use std::io;

use thiserror::Error;

/// Errors reported by every fallible operation of this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// label outside `[0, num_classes)`
    #[error("label {label} is outside of [0, {num_classes})")]
    InvalidLabel { label: i64, num_classes: usize },

    /// cache or model file create / write / read failure
    #[error("i/o failure: {0}")]
    IoFailure(#[from] io::Error),

    /// malformed record framing in the training cache
    #[error("corrupt training cache at record {record}: {reason}")]
    CorruptCache { record: u64, reason: String },

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("feature selection failed: {0}")]
    FeatureSelectionFailure(String),

    /// backend parameter / problem validation failure
    #[error("solver rejected the problem: {0}")]
    SolverRejected(String),

    #[error("no model is trained or loaded")]
    ModelNotLoaded,

    /// operation not allowed in the current classifier state
    #[error("invalid classifier state: {0}")]
    InvalidState(&'static str),

    #[error("lexicon format error at line {line}: {reason}")]
    LexiconFormat { line: usize, reason: String },

    /// id translation does not yield dense ids `0..n-1`
    #[error("id translation is not dense: {0}")]
    NonDenseIds(String),

    #[error("model format error: {0}")]
    ModelFormat(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_cbor::Error> for Error {
    fn from(e: serde_cbor::Error) -> Self {
        Error::ModelFormat(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::ModelFormat(e.to_string())
    }
}
