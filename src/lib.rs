/// This crate is a disk-backed text classifier with chi-square / STS feature
/// selection over sparse TF-IDF vectors.
pub mod cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod selection;
pub mod solver;
pub mod tokenizer;
pub mod utils;
pub mod vector;

/// Text Classifier
/// The top-level struct of this crate.
/// It ingests labeled texts, selects features, trains a backend and classifies
/// new texts.
///
/// Internally, it holds:
/// - The lexicon (vocabulary with tf / df statistics)
/// - The training cache while ingesting
/// - The tokenizer
/// - The backend solver and, once trained or loaded, its model
///
/// `TextClassifier<S, T>` has the following generic parameters:
/// - `S`: backend solver (default `LogisticRegression`)
/// - `T`: tokenizer (default `WhitespaceTokenizer`)
///
/// # Lifecycle
/// `Empty -> Ingesting -> Trained`, or `Empty -> Loaded`.
/// Classification is only available in the last two states.
///
/// # Persistence
/// A model is saved as a directory holding `lexicon` and `model`, or as a
/// single base64 string.
pub use classifier::TextClassifier;

/// Classification result
/// A label with its probability. Displays as `label<TAB>prob`.
pub use classifier::result::ClassifyResult;

/// Evaluation of a classifier
/// Per-class precision / recall / F-measure, macro averages and accuracy of a
/// labeled sample set.
pub use classifier::evaluate::{ClassScores, Evaluation};

/// Configuration
/// Every knob of ingestion, selection and the built-in backend.
/// Loadable from TOML, every field has a default.
pub use config::{ClassifierConfig, LinearParams, SelectionMethod, StsConfig};

/// Error type and result alias shared by every fallible operation
pub use error::{Error, Result};

/// Lexicon
/// The id-assigned vocabulary with per-term corpus statistics.
/// It manages:
/// - Dense ids `0..len-1`, one per distinct name
/// - Global term frequency and document frequency per word
/// - The number of documents counted
/// - A lock flag that stops vocabulary growth
///
/// `IdMap` is the old id -> new id translation consumed by `Lexicon::map`.
pub use lexicon::{IdMap, Lexicon, Word};

/// Sparse vectors
/// `Term` is one `(id, weight)` entry, `SparseVector` an id-sorted list of
/// them. `DocumentVector` builds one from the word ids of a document with a
/// pluggable `TermWeighter`.
pub use vector::weighter::{TermWeighter, TfIdfWeighter, TfOnlyWeighter, TrainingWeighter};
pub use vector::{dot_product, DocumentVector, SparseVector, Term};

/// Training cache
/// Append-only spill file of `(label, sparse vector)` records.
/// `CacheWriter::finish` closes it into a `TrainingCache` that can be scanned
/// any number of times.
pub use cache::{CacheReader, CacheWriter, Record, TrainingCache};

/// Feature selection
/// `FeatureStats` gathers class-conditional document counts in one cache scan,
/// `FeatureSelector` keeps the best K terms by chi-square or by Scalable Term
/// Selection.
pub use selection::{FeatureSelector, FeatureStats};

/// Backend solver
/// `Solver` is the training / prediction capability the classifier delegates
/// to. `LogisticRegression` is the built-in one-vs-rest backend.
pub use solver::linear::{LinearModel, LogisticRegression};
pub use solver::{Problem, Solver};

/// Tokenizers
/// `WhitespaceTokenizer` splits on whitespace, `BigramTokenizer` emits
/// overlapping character bigrams over CJK runs.
pub use tokenizer::{BigramTokenizer, Tokenizer, WhitespaceTokenizer};
