//! Build input for the suggesters.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::iter::Peekable;
use std::path::Path;

use super::SuggestError;

/// One build record: a term, its weight and the optional extensions the
/// bundled engines reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub term: Vec<u8>,
    pub weight: i64,
    pub payload: Option<Vec<u8>>,
    pub contexts: Vec<Vec<u8>>,
}

impl Entry {
    pub fn new(term: impl Into<Vec<u8>>, weight: i64) -> Self {
        Self {
            term: term.into(),
            weight,
            payload: None,
            contexts: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_contexts(mut self, contexts: Vec<Vec<u8>>) -> Self {
        self.contexts = contexts;
        self
    }
}

/// A stream of build records with capability flags.
pub trait InputIterator: Iterator<Item = Result<Entry, SuggestError>> {
    fn has_payloads(&self) -> bool;
    fn has_contexts(&self) -> bool;
}

/// In-memory input. Capability flags reflect the entries given.
pub struct InputEntries {
    entries: std::vec::IntoIter<Entry>,
    has_payloads: bool,
    has_contexts: bool,
}

impl InputEntries {
    pub fn new(entries: impl IntoIterator<Item = Entry>) -> Self {
        let entries: Vec<Entry> = entries.into_iter().collect();
        let has_payloads = entries.iter().any(|e| e.payload.is_some());
        let has_contexts = entries.iter().any(|e| !e.contexts.is_empty());
        Self {
            entries: entries.into_iter(),
            has_payloads,
            has_contexts,
        }
    }
}

impl<T: Into<Vec<u8>>> FromIterator<(T, i64)> for InputEntries {
    fn from_iter<I: IntoIterator<Item = (T, i64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(term, weight)| Entry::new(term, weight)))
    }
}

impl Iterator for InputEntries {
    type Item = Result<Entry, SuggestError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl InputIterator for InputEntries {
    fn has_payloads(&self) -> bool {
        self.has_payloads
    }

    fn has_contexts(&self) -> bool {
        self.has_contexts
    }
}

/// Tab-separated dictionary file: `term[\tweight[\tpayload]]` per line.
///
/// A missing weight defaults to 1. Whether the dictionary carries payloads
/// is decided by its first line; every later line must agree. Empty lines
/// are skipped.
pub struct FileDictionary<R: BufRead> {
    lines: Peekable<io::Lines<R>>,
    line_no: usize,
    has_payloads: bool,
}

impl FileDictionary<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SuggestError> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: BufRead> FileDictionary<R> {
    pub fn new(reader: R) -> Result<Self, SuggestError> {
        let mut lines = reader.lines().peekable();
        let mut skipped = 0;
        let has_payloads = loop {
            match lines.peek() {
                Some(Ok(line)) if line.is_empty() => {
                    lines.next();
                    skipped += 1;
                }
                Some(Ok(line)) => break line.split('\t').count() >= 3,
                // Read errors surface from the first `next()`.
                Some(Err(_)) | None => break false,
            }
        };
        Ok(Self {
            lines,
            line_no: skipped,
            has_payloads,
        })
    }

    fn parse_line(&self, line: &str) -> Result<Entry, SuggestError> {
        let mut fields = line.split('\t');
        let term = fields.next().unwrap_or_default();
        let weight = match fields.next() {
            Some(w) => w.trim().parse::<i64>().map_err(|e| {
                SuggestError::Parse(format!("line {}: invalid weight {w:?}: {e}", self.line_no))
            })?,
            None => 1,
        };
        let payload = fields.next();
        if fields.next().is_some() {
            return Err(SuggestError::Parse(format!(
                "line {}: more than 3 fields",
                self.line_no
            )));
        }
        let entry = Entry::new(term, weight);
        match (payload, self.has_payloads) {
            (Some(p), true) => Ok(entry.with_payload(p)),
            (None, false) => Ok(entry),
            (None, true) => Err(SuggestError::Parse(format!(
                "line {}: missing payload",
                self.line_no
            ))),
            (Some(_), false) => Err(SuggestError::Parse(format!(
                "line {}: unexpected payload",
                self.line_no
            ))),
        }
    }
}

impl<R: BufRead> Iterator for FileDictionary<R> {
    type Item = Result<Entry, SuggestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.is_empty() {
                continue;
            }
            return Some(self.parse_line(&line));
        }
    }
}

impl<R: BufRead> InputIterator for FileDictionary<R> {
    fn has_payloads(&self) -> bool {
        self.has_payloads
    }

    fn has_contexts(&self) -> bool {
        false
    }
}
