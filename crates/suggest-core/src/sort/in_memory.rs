use super::{ByteSequenceSorter, SortError, SortedEntries};

/// Collect-then-sort variant for inputs that fit in memory.
#[derive(Default)]
pub struct InMemorySorter {
    entries: Vec<Vec<u8>>,
    closed: bool,
}

impl InMemorySorter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ByteSequenceSorter for InMemorySorter {
    fn add(&mut self, entry: &[u8]) -> Result<(), SortError> {
        if self.closed {
            return Err(SortError::InvalidState(
                "add called after sorted entries were requested",
            ));
        }
        self.entries.push(entry.to_vec());
        Ok(())
    }

    fn sorted(&mut self) -> Result<Box<dyn SortedEntries + '_>, SortError> {
        if !self.closed {
            self.closed = true;
            self.entries.sort_unstable();
        }
        Ok(Box::new(InMemoryEntries {
            entries: &self.entries,
            pos: 0,
        }))
    }
}

struct InMemoryEntries<'a> {
    entries: &'a [Vec<u8>],
    pos: usize,
}

impl SortedEntries for InMemoryEntries<'_> {
    fn next_entry(&mut self) -> Result<Option<&[u8]>, SortError> {
        let entry = self.entries.get(self.pos);
        if entry.is_some() {
            self.pos += 1;
        }
        Ok(entry.map(Vec::as_slice))
    }
}
