//! Byte-sequence sorting, in memory or spilled to disk.
//!
//! `ByteSequenceSorter` buffers opaque entries and hands them back in
//! ascending byte-lexicographic order through a forward-only cursor.
//! `InMemorySorter` collects and sorts a `Vec`; `ExternalSorter` spills
//! entries to a temporary file and runs `OfflineSorter`, an out-of-core
//! merge sort bounded by a RAM budget. Spill files are `NamedTempFile`s,
//! so every exit path (success, early drop, error) removes them.

mod external;
mod in_memory;
mod offline;
mod sequences;

pub use external::ExternalSorter;
pub use in_memory::InMemorySorter;
pub use offline::{
    BufferSize, OfflineSorter, SortInfo, SortOptions, ABSOLUTE_MIN_SORT_BUFFER_SIZE,
    DEFAULT_BUFFER_SIZE_MB, MAX_TEMP_FILES, MB,
};
pub use sequences::{ByteSequencesReader, ByteSequencesWriter, MAX_ENTRY_LEN};

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("entry of {0} bytes exceeds the {max}-byte record limit", max = MAX_ENTRY_LEN)]
    EntryTooLong(usize),

    #[error("sort buffer of {0} bytes is below the 0.5 MiB minimum")]
    BufferTooSmall(usize),

    #[error("invalid sort configuration: {0}")]
    InvalidConfig(String),
}

/// Collects byte sequences and returns them sorted.
///
/// Calls are serial: `add` must not be interleaved with a live cursor, and
/// once `sorted` has been called further `add`s fail with `InvalidState`.
pub trait ByteSequenceSorter {
    fn add(&mut self, entry: &[u8]) -> Result<(), SortError>;

    /// Finalize input and return a single-pass cursor in ascending byte order.
    fn sorted(&mut self) -> Result<Box<dyn SortedEntries + '_>, SortError>;
}

/// Forward-only cursor over sorted entries. The returned slice is valid
/// until the next call.
pub trait SortedEntries {
    fn next_entry(&mut self) -> Result<Option<&[u8]>, SortError>;
}
