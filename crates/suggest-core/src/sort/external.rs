use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::mem;

use tempfile::NamedTempFile;
use tracing::debug;

use super::offline::{OfflineSorter, SortOptions};
use super::sequences::{ByteSequencesReader, ByteSequencesWriter};
use super::{ByteSequenceSorter, SortError, SortedEntries};

/// Disk-backed sorter: entries are appended to a spill file and sorted
/// with `OfflineSorter` on the first call to `sorted`.
///
/// The sorted file is deleted once the cursor is exhausted. Dropping the
/// sorter at any point removes whatever spill files remain.
pub struct ExternalSorter {
    sorter: OfflineSorter,
    state: State,
    entries: usize,
}

enum State {
    Collecting {
        input: NamedTempFile,
        writer: ByteSequencesWriter<BufWriter<File>>,
    },
    Sorted {
        file: NamedTempFile,
    },
    Consumed,
}

impl ExternalSorter {
    pub fn new(sorter: OfflineSorter) -> Result<Self, SortError> {
        let input = sorter.temp_file("input")?;
        let writer = ByteSequencesWriter::new(BufWriter::new(input.reopen()?));
        Ok(Self {
            sorter,
            state: State::Collecting { input, writer },
            entries: 0,
        })
    }

    pub fn with_options(options: SortOptions) -> Result<Self, SortError> {
        Self::new(OfflineSorter::new(options)?)
    }

    /// Entries added so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    fn sort_input(&mut self) -> Result<(), SortError> {
        match mem::replace(&mut self.state, State::Consumed) {
            State::Collecting { input, writer } => {
                writer.finish()?;
                let output = self.sorter.temp_file("sorted")?;
                let info = self.sorter.sort(input.path(), output.path())?;
                debug!(%info, "external sort finished");
                self.state = State::Sorted { file: output };
            }
            other => self.state = other,
        }
        Ok(())
    }
}

impl ByteSequenceSorter for ExternalSorter {
    fn add(&mut self, entry: &[u8]) -> Result<(), SortError> {
        match &mut self.state {
            State::Collecting { writer, .. } => {
                writer.write(entry)?;
                self.entries += 1;
                Ok(())
            }
            _ => Err(SortError::InvalidState(
                "add called after sorted entries were requested",
            )),
        }
    }

    fn sorted(&mut self) -> Result<Box<dyn SortedEntries + '_>, SortError> {
        self.sort_input()?;
        let State::Sorted { file } = &self.state else {
            return Err(SortError::InvalidState("sorted entries were already consumed"));
        };
        // The sorted partition may have been renamed over the temp path, so
        // open by path rather than through the original handle.
        let reader = ByteSequencesReader::new(BufReader::new(File::open(file.path())?));
        Ok(Box::new(ExternalEntries {
            owner: self,
            reader: Some(reader),
            buf: Vec::new(),
        }))
    }
}

struct ExternalEntries<'a> {
    owner: &'a mut ExternalSorter,
    reader: Option<ByteSequencesReader<BufReader<File>>>,
    buf: Vec<u8>,
}

impl SortedEntries for ExternalEntries<'_> {
    fn next_entry(&mut self) -> Result<Option<&[u8]>, SortError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        if reader.read_into(&mut self.buf)? {
            return Ok(Some(&self.buf));
        }
        // Exhausted: close the reader and delete the sorted file.
        self.reader = None;
        self.owner.state = State::Consumed;
        Ok(None)
    }
}
