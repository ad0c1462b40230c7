pub mod evaluate;
pub mod persist;
pub mod result;

use std::collections::BTreeSet;
use std::fmt;

use log::{info, warn};

use crate::cache::{CacheWriter, TrainingCache};
use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::lexicon::{IdMap, Lexicon};
use crate::selection::{FeatureSelector, FeatureStats};
use crate::solver::linear::LogisticRegression;
use crate::solver::{Problem, Solver};
use crate::tokenizer::{normalize_text, Tokenizer, WhitespaceTokenizer};
use crate::vector::weighter::{TermWeighter, TfIdfWeighter, TfOnlyWeighter, TrainingWeighter};
use crate::vector::{DocumentVector, SparseVector, Term};

use evaluate::Evaluation;
use result::{rank_top_n, ClassifyResult};

/// Lifecycle of a classifier
///
/// `Empty -> Ingesting -> Trained`, or `Empty -> Loaded`.
enum State<M> {
    Empty,
    Ingesting(CacheWriter),
    Trained(M),
    Loaded(M),
}

impl<M> State<M> {
    fn name(&self) -> &'static str {
        match self {
            State::Empty => "empty",
            State::Ingesting(_) => "ingesting",
            State::Trained(_) => "trained",
            State::Loaded(_) => "loaded",
        }
    }

    fn model(&self) -> Option<&M> {
        match self {
            State::Trained(model) | State::Loaded(model) => Some(model),
            _ => None,
        }
    }
}

/// TextClassifier
/// Disk-backed text classifier with feature selection and a pluggable backend.
///
/// Training texts are tokenized, counted into the lexicon and spilled to a
/// training cache as raw counts. `train` then
/// 1. selects features from the cache statistics,
/// 2. remaps and locks the lexicon,
/// 3. rebuilds the weighted training problem from a second cache scan,
/// 4. hands it to the [`Solver`].
///
/// A trained or loaded classifier answers `classify` / `classify_top_n` without
/// mutating anything, so repeated calls give identical results.
///
/// # Examples
/// ```
/// use text_classifier::{ClassifierConfig, TextClassifier};
///
/// let mut config = ClassifierConfig::new(2);
/// config.cache_dir = Some(std::env::temp_dir());
/// let mut classifier = TextClassifier::new(config).unwrap();
/// classifier.add_training_text("cat dog cat", 0).unwrap();
/// classifier.add_training_text("cat bird", 0).unwrap();
/// classifier.add_training_text("fish fish whale", 1).unwrap();
/// classifier.train().unwrap();
///
/// let best = classifier.classify("cat cat").unwrap();
/// assert_eq!(best.label, 0);
/// ```
pub struct TextClassifier<S: Solver = LogisticRegression, T: Tokenizer = WhitespaceTokenizer> {
    config: ClassifierConfig,
    lexicon: Lexicon,
    tokenizer: T,
    solver: S,
    state: State<S::Model>,
    labels_seen: BTreeSet<u32>,
}

impl TextClassifier {
    /// Classifier with the whitespace tokenizer and the logistic regression backend
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let solver = LogisticRegression::new(config.solver.clone());
        Self::with_parts(config, solver, WhitespaceTokenizer)
    }
}

impl<S: Solver, T: Tokenizer> TextClassifier<S, T> {
    /// Classifier with an explicit backend and tokenizer
    pub fn with_parts(config: ClassifierConfig, solver: S, tokenizer: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            lexicon: Lexicon::new(),
            tokenizer,
            solver,
            state: State::Empty,
            labels_seen: BTreeSet::new(),
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    /// K used by the next `train`
    pub fn max_features(&self) -> usize {
        self.config.max_features
    }

    pub fn set_max_features(&mut self, k: usize) {
        self.config.max_features = k;
    }

    /// Ingestion lexicon before `train`, the selected feature space after it
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// Distinct labels given to `add_training_text`, ascending
    pub fn labels_seen(&self) -> &BTreeSet<u32> {
        &self.labels_seen
    }

    /// Documents ingested since the last reset
    pub fn num_documents(&self) -> u64 {
        match &self.state {
            State::Ingesting(writer) => writer.num_docs(),
            _ => 0,
        }
    }

    /// Whether `classify` can be called
    pub fn is_ready(&self) -> bool {
        self.state.model().is_some()
    }

    /// Normalize and segment `text`
    fn tokens(&self, text: &str) -> Vec<String> {
        self.tokenizer.segment(&normalize_text(text))
    }

    /// Add one labeled document
    ///
    /// The first call opens the training cache. Fails with
    /// [`Error::InvalidLabel`] when `label` is outside `[0, num_classes)` and
    /// with [`Error::InvalidState`] once a model is trained or loaded.
    /// If the cache write fails, the cache and every document ingested so far
    /// are discarded and the classifier is empty again.
    ///
    /// # Arguments
    /// * `text` - raw document text
    /// * `label` - class of the document
    pub fn add_training_text(&mut self, text: &str, label: i64) -> Result<()> {
        if let State::Trained(_) | State::Loaded(_) = self.state {
            return Err(Error::InvalidState(
                "cannot add training text to a trained or loaded model",
            ));
        }
        let num_classes = self.config.num_classes;
        if label < 0 || label as u64 >= num_classes as u64 {
            return Err(Error::InvalidLabel { label, num_classes });
        }
        let label = label as u32;

        if let State::Empty = self.state {
            let writer = CacheWriter::create_in(self.config.cache_dir())?;
            self.state = State::Ingesting(writer);
        }

        let tokens = self.tokens(text);
        self.lexicon.add_document(&tokens);
        let ids = self.lexicon.convert_document(&tokens);
        let vector = DocumentVector::new(TfOnlyWeighter).build(&ids, false);
        if let State::Ingesting(writer) = &mut self.state {
            if let Err(e) = writer.append(label, vector.as_slice()) {
                // the file may hold a torn record and the lexicon already counts it
                warn!("training cache write failed, discarding ingested documents: {}", e);
                self.reset();
                return Err(e);
            }
        }
        self.labels_seen.insert(label);
        Ok(())
    }

    /// Drop the cache and every ingested document
    fn reset(&mut self) {
        self.state = State::Empty;
        self.lexicon = Lexicon::new();
        self.labels_seen.clear();
    }

    /// Select features, build the training problem and fit the backend
    ///
    /// The cache is deleted whether training succeeds or not. On failure the
    /// classifier is reset to the empty state, ingested documents included.
    pub fn train(&mut self) -> Result<()> {
        let writer = match std::mem::replace(&mut self.state, State::Empty) {
            State::Ingesting(writer) => writer,
            State::Empty => return Err(Error::EmptyTrainingSet),
            done => {
                self.state = done;
                return Err(Error::InvalidState("model is already trained or loaded"));
            }
        };

        let outcome = writer.finish().and_then(|cache| {
            let outcome = self.train_from_cache(&cache);
            if let Err(e) = cache.delete() {
                warn!("training cache left behind: {}", e);
            }
            outcome
        });

        match outcome {
            Ok((lexicon, model)) => {
                self.lexicon = lexicon;
                self.state = State::Trained(model);
                Ok(())
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    fn train_from_cache(&self, cache: &TrainingCache) -> Result<(Lexicon, S::Model)> {
        if cache.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }
        let num_classes = self.config.num_classes;

        let stats = FeatureStats::collect(cache, &self.lexicon, num_classes)?;
        let selector = FeatureSelector::new(&self.lexicon, self.config.max_term_len);
        let map = selector.select(
            self.config.selection,
            &stats,
            self.config.max_features,
            &self.config.sts,
        )?;

        let mut lexicon = self.lexicon.map(&map)?;
        lexicon.set_lock(true);

        let problem = build_problem(cache, &map, &lexicon, num_classes)?;
        info!(
            "training problem built: {} documents, {} features",
            problem.len(),
            problem.num_features
        );

        let model = self.solver.train(&problem).map_err(|e| match e {
            Error::SolverRejected(_) => e,
            other => Error::SolverRejected(other.to_string()),
        })?;
        Ok((lexicon, model))
    }

    /// TF-IDF vector of `text` over the locked lexicon
    pub fn vectorize(&self, text: &str) -> SparseVector {
        let ids = self.lexicon.resolve(&self.tokens(text));
        DocumentVector::new(TfIdfWeighter::new(&self.lexicon)).build(&ids, true)
    }

    /// Probability of every class, indexed by label
    pub fn predict_probabilities(&self, text: &str) -> Result<Vec<f64>> {
        let model = self.state.model().ok_or(Error::ModelNotLoaded)?;
        let vector = self.vectorize(text);
        Ok(self.solver.predict_probabilities(model, vector.as_slice()))
    }

    /// Most probable class of `text`
    pub fn classify(&self, text: &str) -> Result<ClassifyResult> {
        self.classify_top_n(text, 1)?
            .into_iter()
            .next()
            .ok_or(Error::ModelNotLoaded)
    }

    /// Up to `n` classes of `text`, most probable first
    ///
    /// Probabilities within `1e-20` of each other keep ascending label order.
    pub fn classify_top_n(&self, text: &str, n: usize) -> Result<Vec<ClassifyResult>> {
        let probs = self.predict_probabilities(text)?;
        Ok(rank_top_n(&probs, n))
    }

    /// Classify labeled samples and score the predictions
    pub fn evaluate<I, D>(&self, samples: I) -> Result<Evaluation>
    where
        I: IntoIterator<Item = (D, u32)>,
        D: AsRef<str>,
    {
        let mut pairs = Vec::new();
        for (text, actual) in samples {
            let predicted = self.classify(text.as_ref())?;
            pairs.push((actual, predicted.label));
        }
        Ok(Evaluation::from_pairs(self.config.num_classes, pairs))
    }
}

impl<S: Solver, T: Tokenizer> fmt::Debug for TextClassifier<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextClassifier")
            .field("state", &self.state.name())
            .field("num_classes", &self.config.num_classes)
            .field("max_features", &self.config.max_features)
            .field("lexicon_len", &self.lexicon.len())
            .field("labels_seen", &self.labels_seen)
            .finish()
    }
}

/// Second cache scan: remap ids, reweight with the selected lexicon, L2-normalize
fn build_problem(
    cache: &TrainingCache,
    map: &IdMap,
    lexicon: &Lexicon,
    num_classes: usize,
) -> Result<Problem> {
    let weighter = TrainingWeighter::new(lexicon);
    let mut problem = Problem::new(lexicon.len(), num_classes);
    let mut reader = cache.scan()?;
    while let Some(record) = reader.next_record()? {
        let doc_len = record.terms.len();
        let terms: Vec<Term> = record
            .terms
            .iter()
            .filter_map(|t| {
                map.get(t.id)
                    .map(|new| Term::new(new, weighter.weight(new, t.weight, doc_len)))
            })
            .collect();
        let mut row = SparseVector::from_sorted(terms);
        row.normalize();
        problem.push(record.label, row);
    }
    Ok(problem)
}
