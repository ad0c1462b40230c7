//! Lexicon text format
//!
//! ```text
//! <num_docs>
//! <id>:<name>:<tf>:<df>
//! ...
//! ```
//! `:` inside a name is written as [`COLON_REPLACER`].

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::lexicon::{Counts, Lexicon};

pub const COLON_REPLACER: &str = "~CLN~";

impl Lexicon {
    /// Write the lexicon, one word per line in id order
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", self.num_docs)?;
        for word in self.iter() {
            writeln!(
                writer,
                "{}:{}:{}:{}",
                word.id,
                word.name.replace(':', COLON_REPLACER),
                word.tf,
                word.df
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Replace the content of this lexicon with the listing read from `reader`
    ///
    /// On error the lexicon is left in an unspecified state and must not be used.
    /// The lock flag is not part of the format and stays as it was.
    pub fn load_from_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        self.words.clear();
        self.seen.clear();
        self.num_docs = 0;

        let mut lines = reader.lines();
        let first = lines.next().ok_or(Error::LexiconFormat {
            line: 1,
            reason: "missing document count".into(),
        })??;
        self.num_docs = first.trim().parse().map_err(|e| Error::LexiconFormat {
            line: 1,
            reason: format!("bad document count: {e}"),
        })?;

        let mut entries: Vec<(u32, Box<str>, Counts)> = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            let line_no = idx + 2;
            if line.is_empty() {
                continue;
            }
            entries.push(parse_word(&line, line_no)?);
        }

        entries.sort_unstable_by_key(|(id, _, _)| *id);
        let mut words = IndexMap::with_capacity(entries.len());
        for (expected, (id, name, counts)) in entries.into_iter().enumerate() {
            if id as usize != expected {
                return Err(Error::LexiconFormat {
                    line: 0,
                    reason: format!("ids are not dense: expected {expected}, found {id}"),
                });
            }
            if words.insert(name, counts).is_some() {
                return Err(Error::LexiconFormat {
                    line: 0,
                    reason: format!("duplicate name for id {id}"),
                });
            }
        }
        self.words = words;
        Ok(())
    }

    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        self.load_from_reader(BufReader::new(file))
    }

    /// Load a new (unlocked) lexicon from `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Lexicon> {
        let mut lexicon = Lexicon::new();
        lexicon.load_from_file(path)?;
        Ok(lexicon)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Lexicon> {
        let mut lexicon = Lexicon::new();
        lexicon.load_from_reader(bytes)?;
        Ok(lexicon)
    }
}

fn parse_word(line: &str, line_no: usize) -> Result<(u32, Box<str>, Counts)> {
    let bad = |reason: String| Error::LexiconFormat {
        line: line_no,
        reason,
    };
    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() != 4 {
        return Err(bad(format!("expected 4 fields, found {}", parts.len())));
    }
    let id: u32 = parts[0].parse().map_err(|e| bad(format!("bad id: {e}")))?;
    let tf: u64 = parts[2].parse().map_err(|e| bad(format!("bad tf: {e}")))?;
    let df: u64 = parts[3].parse().map_err(|e| bad(format!("bad df: {e}")))?;
    let name = parts[1].replace(COLON_REPLACER, ":").into_boxed_str();
    Ok((id, name, Counts { tf, df }))
}
