//! The suggester surface shared by both engines: build input, lookup
//! results, errors and the persistence contract.

mod input;
#[cfg(test)]
mod tests;

pub use input::{Entry, FileDictionary, InputEntries, InputIterator};

use std::io::{self, Read, Write};

use crate::settings::SettingsError;
use crate::sort::SortError;

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("sort error: {0}")]
    Sort(#[from] SortError),

    #[error("automaton error: {0}")]
    Automaton(#[from] fst::Error),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected {0})")]
    InvalidMagic(&'static str),

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("stored automaton has outputs tag {0}, expected {1}")]
    OutputsMismatch(u8, u8),
}

/// One suggestion. `value` is the bucket for the bucketed engine and the
/// decoded weight for the exact engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupResult {
    pub key: String,
    pub value: i64,
}

impl LookupResult {
    pub fn new(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A weighted prefix suggester.
///
/// `build` replaces any previous contents; on error the previous state is
/// kept. Lookups take `&self` and may run concurrently once built.
pub trait Lookup: Send + Sync {
    fn build(&mut self, input: &mut dyn InputIterator) -> Result<(), SuggestError>;

    fn lookup(
        &self,
        key: &str,
        contexts: Option<&[Vec<u8>]>,
        only_more_popular: bool,
        num: usize,
    ) -> Result<Vec<LookupResult>, SuggestError>;

    /// Value stored for an exact key, if any.
    fn get(&self, key: &str) -> Option<i64>;

    /// Serialize to `out`. Returns `false`, writing nothing, when there is
    /// nothing built.
    fn store(&self, out: &mut dyn Write) -> Result<bool, SuggestError>;

    /// Replace the contents with data produced by `store`.
    fn load(&mut self, input: &mut dyn Read) -> Result<bool, SuggestError>;

    /// Number of entries the last build or load produced.
    fn count(&self) -> u64;

    fn size_in_bytes(&self) -> usize;
}

/// Largest weight either engine can represent.
pub const MAX_WEIGHT: i64 = i32::MAX as i64;

/// Validate a weight against `0..=MAX_WEIGHT` and narrow it.
pub fn encode_weight(weight: i64) -> Result<u32, SuggestError> {
    if !(0..=MAX_WEIGHT).contains(&weight) {
        return Err(SuggestError::Unsupported(format!(
            "cannot encode weight {weight}: must be in 0..={MAX_WEIGHT}"
        )));
    }
    Ok(weight as u32)
}

/// Both engines accept plain (term, weight) input only.
pub(crate) fn reject_extensions(input: &dyn InputIterator) -> Result<(), SuggestError> {
    if input.has_payloads() {
        return Err(SuggestError::Unsupported(
            "this suggester doesn't support payloads".to_string(),
        ));
    }
    if input.has_contexts() {
        return Err(SuggestError::Unsupported(
            "this suggester doesn't support contexts".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_entry(entry: &Entry) -> Result<(), SuggestError> {
    if entry.payload.is_some() {
        return Err(SuggestError::Unsupported(
            "this suggester doesn't support payloads".to_string(),
        ));
    }
    if !entry.contexts.is_empty() {
        return Err(SuggestError::Unsupported(
            "this suggester doesn't support contexts".to_string(),
        ));
    }
    if entry.term.is_empty() {
        return Err(SuggestError::InvalidArgument("term must not be empty".to_string()));
    }
    Ok(())
}

pub(crate) fn reject_contexts(contexts: Option<&[Vec<u8>]>) -> Result<(), SuggestError> {
    match contexts {
        Some(_) => Err(SuggestError::Unsupported(
            "this suggester doesn't support contexts".to_string(),
        )),
        None => Ok(()),
    }
}
