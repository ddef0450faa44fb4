use tracing::{debug, debug_span};

use super::Completion;
use crate::automaton::{AutomatonBuilder, Outputs};
use crate::lookup::SuggestError;
use crate::sort::{ByteSequenceSorter, ExternalSorter, SortOptions};

pub const DEFAULT_BUCKETS: usize = 10;

/// Collects `(term, bucket)` pairs and compiles them into a `Completion`.
///
/// Each pair is sorted as `[bucket] ++ term`, so the automaton groups terms
/// by bucket first and alphabetically within a bucket. Identical pairs
/// collapse.
pub struct CompletionBuilder<S = ExternalSorter> {
    buckets: usize,
    sorter: S,
    scratch: Vec<u8>,
}

impl CompletionBuilder<ExternalSorter> {
    /// Builder spilling to disk with the given sort options.
    pub fn with_sort_options(buckets: usize, options: SortOptions) -> Result<Self, SuggestError> {
        Self::new(buckets, ExternalSorter::with_options(options)?)
    }
}

impl<S: ByteSequenceSorter> CompletionBuilder<S> {
    pub fn new(buckets: usize, sorter: S) -> Result<Self, SuggestError> {
        if !(1..=255).contains(&buckets) {
            return Err(SuggestError::InvalidArgument(format!(
                "bucket count {buckets} must be in 1..=255"
            )));
        }
        Ok(Self {
            buckets,
            sorter,
            scratch: Vec::new(),
        })
    }

    pub fn buckets(&self) -> usize {
        self.buckets
    }

    pub fn add(&mut self, term: &[u8], bucket: usize) -> Result<(), SuggestError> {
        if term.is_empty() {
            return Err(SuggestError::InvalidArgument("term must not be empty".to_string()));
        }
        if bucket >= self.buckets {
            return Err(SuggestError::InvalidArgument(format!(
                "bucket {bucket} outside 0..{}",
                self.buckets
            )));
        }
        self.scratch.clear();
        self.scratch.push(bucket as u8);
        self.scratch.extend_from_slice(term);
        self.sorter.add(&self.scratch)?;
        Ok(())
    }

    /// Compile everything added so far. The result orders by weight and
    /// promotes exact matches; derive other views with `Completion::with_mode`.
    pub fn build(mut self) -> Result<Completion, SuggestError> {
        let _span = debug_span!("build_completion", buckets = self.buckets).entered();
        let mut builder = AutomatonBuilder::new(Outputs::NoOutput);
        // Records are never empty, so an empty `previous` matches nothing.
        let mut previous = Vec::new();
        let mut entries = self.sorter.sorted()?;
        while let Some(entry) = entries.next_entry()? {
            if entry == previous.as_slice() {
                continue;
            }
            builder.add(entry, 0)?;
            previous.clear();
            previous.extend_from_slice(entry);
        }
        drop(entries);

        debug!(keys = builder.count(), "completion automaton built");
        Ok(Completion::new(builder.finish()?, true, true))
    }
}
