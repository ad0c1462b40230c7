//! Model persistence
//!
//! A model is the selected lexicon plus the backend model. On disk they are two
//! files in one directory:
//!
//! ```text
//! <dir>/lexicon   lexicon text format
//! <dir>/model     backend serialization
//! ```
//!
//! As a string they are one base64 (standard alphabet, padded) blob of
//!
//! ```text
//! u64 len(lexicon) | lexicon bytes | u64 len(model) | model bytes
//! ```
//!
//! with big-endian lengths.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::info;

use crate::classifier::{State, TextClassifier};
use crate::error::{Error, Result};
use crate::lexicon::Lexicon;
use crate::solver::Solver;
use crate::tokenizer::Tokenizer;

pub const LEXICON_FILE: &str = "lexicon";
pub const MODEL_FILE: &str = "model";

impl<S: Solver, T: Tokenizer> TextClassifier<S, T> {
    /// Write `<dir>/lexicon` and `<dir>/model`, creating `dir` if needed
    pub fn save_model(&self, dir: impl AsRef<Path>) -> Result<()> {
        let model = self.state.model().ok_or(Error::ModelNotLoaded)?;
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.lexicon.save_to_file(dir.join(LEXICON_FILE))?;
        self.solver.save_model(model, &dir.join(MODEL_FILE))?;
        info!("model saved to {}", dir.display());
        Ok(())
    }

    /// Restore a model written by [`save_model`](Self::save_model)
    pub fn load_model(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        self.check_loadable()?;
        let dir = dir.as_ref();
        let lexicon = Lexicon::from_file(dir.join(LEXICON_FILE))?;
        let model = self.solver.load_model(&dir.join(MODEL_FILE))?;
        self.install(lexicon, model)?;
        info!("model loaded from {}", dir.display());
        Ok(())
    }

    /// Encode the lexicon and the backend model as one base64 string
    pub fn save_to_string(&self) -> Result<String> {
        let model = self.state.model().ok_or(Error::ModelNotLoaded)?;
        let lexicon = self.lexicon.to_bytes()?;
        let model = self.solver.model_to_bytes(model)?;

        let mut buf = Vec::with_capacity(16 + lexicon.len() + model.len());
        for part in [&lexicon, &model] {
            buf.extend_from_slice(&(part.len() as u64).to_be_bytes());
            buf.extend_from_slice(part);
        }
        Ok(STANDARD.encode(buf))
    }

    /// Restore a model encoded by [`save_to_string`](Self::save_to_string)
    pub fn load_from_string(&mut self, encoded: &str) -> Result<()> {
        self.check_loadable()?;
        let bytes = STANDARD.decode(encoded.trim())?;
        let mut rest = bytes.as_slice();
        let lexicon_bytes = take_part(&mut rest, "lexicon")?;
        let model_bytes = take_part(&mut rest, "model")?;
        if !rest.is_empty() {
            return Err(Error::ModelFormat(format!(
                "{} trailing bytes after the model",
                rest.len()
            )));
        }

        let lexicon = Lexicon::from_bytes(lexicon_bytes)?;
        let model = self.solver.model_from_bytes(model_bytes)?;
        self.install(lexicon, model)
    }

    fn check_loadable(&self) -> Result<()> {
        match self.state {
            State::Empty | State::Loaded(_) => Ok(()),
            State::Ingesting(_) | State::Trained(_) => Err(Error::InvalidState(
                "a model can only be loaded into an empty classifier",
            )),
        }
    }

    fn install(&mut self, mut lexicon: Lexicon, model: S::Model) -> Result<()> {
        let classes = self.solver.num_classes(&model);
        if classes != self.config.num_classes {
            return Err(Error::ModelFormat(format!(
                "model has {} classes, classifier is configured for {}",
                classes, self.config.num_classes
            )));
        }
        lexicon.set_lock(true);
        self.lexicon = lexicon;
        self.state = State::Loaded(model);
        Ok(())
    }
}

/// Split one length-prefixed part off the front of `rest`
fn take_part<'a>(rest: &mut &'a [u8], what: &str) -> Result<&'a [u8]> {
    let bytes: &'a [u8] = *rest;
    let Some((len, tail)) = bytes.split_first_chunk::<8>() else {
        return Err(Error::ModelFormat(format!("missing {what} length")));
    };
    let len = u64::from_be_bytes(*len);
    if len > tail.len() as u64 {
        return Err(Error::ModelFormat(format!(
            "{what} length {len} exceeds the {} bytes left",
            tail.len()
        )));
    }
    let (part, tail) = tail.split_at(len as usize);
    *rest = tail;
    Ok(part)
}
