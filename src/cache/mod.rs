//! Training cache
//!
//! Append-only spill file of `(label, sparse vector)` records written during
//! ingestion and scanned (at least twice) by `train`. Layout of one record,
//! all big-endian:
//!
//! ```text
//! i32 label
//! i32 term_count
//! (i32 id, f64 weight) * term_count
//! ```
//!
//! The write side and the read side are separate types: a [`CacheWriter`] must be
//! [`finish`](CacheWriter::finish)ed into a [`TrainingCache`] before any
//! [`CacheReader`] can be opened, so no reader ever sees a partially written file.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use log::{debug, info, warn};
use tempfile::TempPath;

use crate::error::{Error, Result};
use crate::vector::Term;

const FILE_PREFIX: &str = "tctscache";
const FILE_SUFFIX: &str = ".data";
const PROGRESS_EVERY: u64 = 10_000;

/// Write side of the training cache
#[derive(Debug)]
pub struct CacheWriter {
    writer: BufWriter<File>,
    path: TempPath,
    longest_doc: usize,
    num_docs: u64,
}

impl CacheWriter {
    /// Create a fresh cache file inside `dir`
    pub fn create_in(dir: impl AsRef<Path>) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .tempfile_in(dir)?;
        let (file, path) = file.into_parts();
        debug!("training cache created at {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            longest_doc: 0,
            num_docs: 0,
        })
    }

    /// Append one record
    ///
    /// Every field is checked before anything is written, so a rejected record
    /// leaves the file untouched.
    ///
    /// # Arguments
    /// * `label` - class label of the document
    /// * `terms` - terms of the document, ids strictly ascending
    pub fn append(&mut self, label: u32, terms: &[Term]) -> Result<()> {
        let label = i32::try_from(label).map_err(|_| invalid_input("label does not fit in i32"))?;
        let count =
            i32::try_from(terms.len()).map_err(|_| invalid_input("document too long for cache"))?;
        if terms.windows(2).any(|w| w[0].id >= w[1].id) {
            return Err(invalid_input("term ids are not strictly ascending"));
        }
        if terms.last().is_some_and(|t| t.id > i32::MAX as u32) {
            return Err(invalid_input("term id does not fit in i32"));
        }

        self.writer.write_all(&label.to_be_bytes())?;
        self.writer.write_all(&count.to_be_bytes())?;
        for term in terms {
            self.writer.write_all(&(term.id as i32).to_be_bytes())?;
            self.writer.write_all(&term.weight.to_be_bytes())?;
        }
        self.longest_doc = self.longest_doc.max(terms.len());
        self.num_docs += 1;
        Ok(())
    }

    /// Largest term count written so far
    #[inline]
    pub fn longest_doc(&self) -> usize {
        self.longest_doc
    }

    #[inline]
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// Writer over a read-only handle, every write fails
    #[cfg(test)]
    pub(crate) fn read_only_in(dir: impl AsRef<Path>) -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .tempfile_in(dir)?
            .into_temp_path();
        let file = File::open(&path)?;
        Ok(Self {
            writer: BufWriter::with_capacity(0, file),
            path,
            longest_doc: 0,
            num_docs: 0,
        })
    }

    /// Flush and close the file, handing it over to the read side
    pub fn finish(self) -> Result<TrainingCache> {
        let Self {
            writer,
            path,
            longest_doc,
            num_docs,
        } = self;
        let file = writer.into_inner().map_err(|e| Error::IoFailure(e.into_error()))?;
        file.sync_all()?;
        drop(file);
        info!(
            "training cache closed: {} documents, longest document {} terms",
            num_docs, longest_doc
        );
        Ok(TrainingCache {
            path,
            longest_doc,
            num_docs,
        })
    }
}

/// Closed training cache, ready for any number of full scans
///
/// The file is removed by [`delete`](TrainingCache::delete), or at the latest when
/// the value is dropped.
#[derive(Debug)]
pub struct TrainingCache {
    path: TempPath,
    longest_doc: usize,
    num_docs: u64,
}

impl TrainingCache {
    /// Largest term count of any record, final once the writer is closed
    #[inline]
    pub fn longest_doc(&self) -> usize {
        self.longest_doc
    }

    #[inline]
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_docs == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new sequential reader from the first record
    pub fn scan(&self) -> Result<CacheReader> {
        let file = File::open(&self.path)?;
        Ok(CacheReader {
            reader: BufReader::new(file),
            buf: Vec::with_capacity(self.longest_doc + 1),
            longest_doc: self.longest_doc,
            expected: self.num_docs,
            record: 0,
        })
    }

    /// Remove the cache file
    pub fn delete(self) -> Result<()> {
        let display = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => {
                debug!("training cache {} deleted", display);
                Ok(())
            }
            Err(e) => {
                warn!("failed to delete training cache {}: {}", display, e);
                Err(e.into())
            }
        }
    }
}

/// One record borrowed from the reader's scratch buffer
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub label: u32,
    pub terms: &'a [Term],
}

/// Sequential reader over a closed cache
#[derive(Debug)]
pub struct CacheReader {
    reader: BufReader<File>,
    /// scratch buffer reused by every record, sized by `longest_doc`
    buf: Vec<Term>,
    longest_doc: usize,
    expected: u64,
    record: u64,
}

impl CacheReader {
    /// Read the next record
    ///
    /// `Ok(None)` at a clean end of file. A record cut short, a negative field,
    /// a term count above the cache's longest document, term ids out of
    /// ascending order or a missing record is reported as [`Error::CorruptCache`].
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        let mut head = [0u8; 4];
        let got = fill(&mut self.reader, &mut head)?;
        if got == 0 {
            if self.record != self.expected {
                return Err(self.corrupt(format!(
                    "file ends after {} of {} records",
                    self.record, self.expected
                )));
            }
            return Ok(None);
        }
        if got < head.len() {
            return Err(self.corrupt("truncated record header".into()));
        }
        let label = i32::from_be_bytes(head);
        let count = self.read_i32()?;
        if label < 0 {
            return Err(self.corrupt(format!("negative label {label}")));
        }
        if count < 0 || count as usize > self.longest_doc {
            return Err(self.corrupt(format!(
                "term count {count} outside [0, {}]",
                self.longest_doc
            )));
        }

        self.buf.clear();
        let mut prev: Option<i32> = None;
        for _ in 0..count {
            let id = self.read_i32()?;
            if id < 0 {
                return Err(self.corrupt(format!("negative term id {id}")));
            }
            if let Some(prev) = prev.filter(|&p| p >= id) {
                return Err(self.corrupt(format!("term id {id} follows {prev}")));
            }
            prev = Some(id);
            let weight = self.read_f64()?;
            self.buf.push(Term::new(id as u32, weight));
        }

        self.record += 1;
        if self.record % PROGRESS_EVERY == 0 {
            debug!("scanned {} records", self.record);
        }
        Ok(Some(Record {
            label: label as u32,
            terms: &self.buf,
        }))
    }

    /// Records read so far
    #[inline]
    pub fn records_read(&self) -> u64 {
        self.record
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut b = [0u8; 4];
        self.read_field(&mut b)?;
        Ok(i32::from_be_bytes(b))
    }

    fn read_f64(&mut self) -> Result<f64> {
        let mut b = [0u8; 8];
        self.read_field(&mut b)?;
        Ok(f64::from_be_bytes(b))
    }

    fn read_field(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(self.corrupt("truncated record body".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn corrupt(&self, reason: String) -> Error {
        Error::CorruptCache {
            record: self.record,
            reason,
        }
    }
}

fn invalid_input(msg: &'static str) -> Error {
    Error::IoFailure(io::Error::new(ErrorKind::InvalidInput, msg))
}

/// Read until `buf` is full or EOF, returning the number of bytes read
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut n = 0;
    while n < buf.len() {
        match reader.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(k) => n += k,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;

    fn terms(pairs: &[(u32, f64)]) -> Vec<Term> {
        pairs.iter().map(|&(id, w)| Term::new(id, w)).collect()
    }

    fn read_all(cache: &TrainingCache) -> Result<Vec<(u32, Vec<Term>)>> {
        let mut reader = cache.scan()?;
        let mut out = Vec::new();
        while let Some(rec) = reader.next_record()? {
            out.push((rec.label, rec.terms.to_vec()));
        }
        Ok(out)
    }

    fn sample_cache(dir: &Path) -> TrainingCache {
        let mut writer = CacheWriter::create_in(dir).unwrap();
        writer.append(0, &terms(&[(0, 2.0), (3, 1.0)])).unwrap();
        writer.append(2, &[]).unwrap();
        writer.append(1, &terms(&[(1, 1.0), (2, 4.0), (5, 1.0)])).unwrap();
        assert_eq!(writer.longest_doc(), 3);
        writer.finish().unwrap()
    }

    #[test]
    fn records_survive_repeated_scans() {
        let dir = tempfile::tempdir().unwrap();
        let cache = sample_cache(dir.path());
        assert_eq!(cache.num_docs(), 3);
        assert_eq!(cache.longest_doc(), 3);

        let first = read_all(&cache).unwrap();
        let second = read_all(&cache).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], (0, terms(&[(0, 2.0), (3, 1.0)])));
        assert_eq!(first[1], (2, vec![]));
        assert_eq!(first[2].1[1], Term::new(2, 4.0));
    }

    #[test]
    fn truncated_body_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = sample_cache(dir.path());
        let len = std::fs::metadata(cache.path()).unwrap().len();
        let file = OpenOptions::new().write(true).open(cache.path()).unwrap();
        file.set_len(len - 3).unwrap();
        drop(file);

        let err = read_all(&cache).unwrap_err();
        assert!(matches!(err, Error::CorruptCache { record: 2, .. }), "{err}");
    }

    #[test]
    fn missing_trailing_record_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = sample_cache(dir.path());
        // last record: 8 byte header + 3 * 12 byte terms
        let len = std::fs::metadata(cache.path()).unwrap().len();
        let file = OpenOptions::new().write(true).open(cache.path()).unwrap();
        file.set_len(len - 44).unwrap();
        drop(file);

        let err = read_all(&cache).unwrap_err();
        assert!(matches!(err, Error::CorruptCache { record: 2, .. }), "{err}");
    }

    #[test]
    fn oversized_term_count_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = sample_cache(dir.path());
        let mut file = OpenOptions::new().append(true).open(cache.path()).unwrap();
        file.write_all(&0i32.to_be_bytes()).unwrap();
        file.write_all(&100i32.to_be_bytes()).unwrap();
        drop(file);

        let err = read_all(&cache).unwrap_err();
        assert!(matches!(err, Error::CorruptCache { record: 3, .. }), "{err}");
    }

    #[test]
    fn unsorted_terms_are_refused_by_the_writer() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CacheWriter::create_in(dir.path()).unwrap();
        writer.append(0, &terms(&[(0, 1.0), (2, 1.0)])).unwrap();
        for bad in [&[(1, 1.0), (0, 1.0)][..], &[(0, 1.0), (0, 1.0)][..]] {
            let err = writer.append(1, &terms(bad)).unwrap_err();
            assert!(matches!(err, Error::IoFailure(_)), "{err}");
        }
        assert_eq!(writer.num_docs(), 1);

        let cache = writer.finish().unwrap();
        let records = read_all(&cache).unwrap();
        assert_eq!(records, vec![(0, terms(&[(0, 1.0), (2, 1.0)]))]);
    }

    #[test]
    fn repeated_or_descending_ids_are_corrupt() {
        for ids in [[1i32, 1], [2, 1]] {
            let dir = tempfile::tempdir().unwrap();
            let cache = sample_cache(dir.path());
            let mut file = OpenOptions::new().append(true).open(cache.path()).unwrap();
            file.write_all(&0i32.to_be_bytes()).unwrap();
            file.write_all(&2i32.to_be_bytes()).unwrap();
            for id in ids {
                file.write_all(&id.to_be_bytes()).unwrap();
                file.write_all(&1.0f64.to_be_bytes()).unwrap();
            }
            drop(file);

            let err = read_all(&cache).unwrap_err();
            assert!(matches!(err, Error::CorruptCache { record: 3, .. }), "{err}");
        }
    }

    #[test]
    fn read_only_writer_fails_to_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CacheWriter::read_only_in(dir.path()).unwrap();
        assert!(matches!(
            writer.append(0, &terms(&[(0, 1.0)])),
            Err(Error::IoFailure(_))
        ));
        assert_eq!(writer.num_docs(), 0);
    }

    #[test]
    fn delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = sample_cache(dir.path());
        let path = cache.path().to_path_buf();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with(FILE_PREFIX));
        cache.delete().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn empty_cache_scans_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheWriter::create_in(dir.path()).unwrap().finish().unwrap();
        assert!(cache.is_empty());
        assert!(cache.scan().unwrap().next_record().unwrap().is_none());
    }
}
