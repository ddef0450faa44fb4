use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, debug_span, info};

use super::{Completion, CompletionBuilder, Suggestion};
use crate::automaton::{Automaton, Outputs};
use crate::lookup::{
    check_entry, encode_weight, reject_contexts, reject_extensions, InputIterator, Lookup,
    LookupResult, SuggestError,
};
use crate::settings::settings;
use crate::sort::{
    ByteSequencesReader, ByteSequencesWriter, ExternalSorter, OfflineSorter, SortOptions,
};
use crate::store::{self, DataInput, DataOutput};

pub const MAGIC: &[u8; 4] = b"SGBK";
pub const VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketedOptions {
    /// Number of weight buckets, 1..=255.
    pub buckets: usize,
    pub exact_first: bool,
    pub sort: SortOptions,
}

impl Default for BucketedOptions {
    /// Values from the `[bucketed]` and `[sort]` settings sections.
    fn default() -> Self {
        let s = &settings().bucketed;
        Self {
            buckets: s.buckets,
            exact_first: s.exact_first,
            sort: SortOptions::default(),
        }
    }
}

/// Bucketed suggester: weights are ranked, split into equal-sized buckets
/// and served through two views of one automaton.
///
/// The higher-weights-first view answers `only_more_popular` lookups; the
/// normal view sorts candidates alphabetically when more than one bucket
/// is present.
pub struct BucketedLookup {
    options: BucketedOptions,
    higher_weights: Completion,
    normal: Completion,
    count: u64,
}

impl BucketedLookup {
    pub fn new() -> Result<Self, SuggestError> {
        Self::with_options(BucketedOptions::default())
    }

    pub fn with_options(options: BucketedOptions) -> Result<Self, SuggestError> {
        if !(1..=255).contains(&options.buckets) {
            return Err(SuggestError::InvalidArgument(format!(
                "bucket count {} must be in 1..=255",
                options.buckets
            )));
        }
        // Validate sort options up front rather than at first build.
        OfflineSorter::new(options.sort.clone())?;
        Ok(Self {
            higher_weights: Completion::new(None, true, options.exact_first),
            normal: Completion::new(None, false, options.exact_first),
            options,
            count: 0,
        })
    }

    pub fn options(&self) -> &BucketedOptions {
        &self.options
    }

    /// The view lookups with `higher_weights_first` go through.
    pub fn completion(&self, higher_weights_first: bool) -> &Completion {
        if higher_weights_first {
            &self.higher_weights
        } else {
            &self.normal
        }
    }

    pub fn do_lookup(&self, key: &str, higher_weights_first: bool, num: usize) -> Vec<Suggestion> {
        let _span = debug_span!("bucketed_lookup", key, num, higher_weights_first).entered();
        self.completion(higher_weights_first).lookup(key, num)
    }

    fn install(&mut self, automaton: Option<Arc<Automaton>>, count: u64) {
        let exact_first = self.options.exact_first;
        self.higher_weights = Completion::from_shared(automaton, true, exact_first);
        self.normal = self.higher_weights.with_mode(false, exact_first);
        self.count = count;
    }

    /// Save to `path` atomically. Returns `false` if nothing is built.
    pub fn save(&self, path: &Path) -> Result<bool, SuggestError> {
        let mut buf = Vec::new();
        if !self.store(&mut buf)? {
            return Ok(false);
        }
        store::write_atomic(path, &buf)?;
        Ok(true)
    }

    /// Open a file written by `save`, mapping the automaton in place.
    pub fn open(path: &Path, options: BucketedOptions) -> Result<Self, SuggestError> {
        let map = store::map_file(path)?;
        let mut cursor = Cursor::new(&map[..]);
        store::check_header(&mut cursor, MAGIC, VERSION)?;
        let count = cursor.read_vlong()?;
        let offset = cursor.position() as usize;
        let automaton = Automaton::from_mapped(map, offset, Outputs::NoOutput)?;

        let mut lookup = Self::with_options(options)?;
        lookup.install(Some(Arc::new(automaton)), count);
        info!(path = %path.display(), entries = count, "bucketed suggester opened");
        Ok(lookup)
    }
}

impl Lookup for BucketedLookup {
    fn build(&mut self, input: &mut dyn InputIterator) -> Result<(), SuggestError> {
        let _span = debug_span!("bucketed_build", buckets = self.options.buckets).entered();
        reject_extensions(input)?;

        // Pass 1: spill (weight, term) records, weight big-endian so byte
        // order is numeric order.
        let sorter = OfflineSorter::new(self.options.sort.clone())?;
        let spill = sorter.temp_file("weights")?;
        let mut writer = ByteSequencesWriter::new(BufWriter::new(spill.reopen()?));
        let mut record = Vec::new();
        for entry in input {
            let entry = entry?;
            check_entry(&entry)?;
            let weight = encode_weight(entry.weight)?;
            record.clear();
            record.extend_from_slice(&weight.to_be_bytes());
            record.extend_from_slice(&entry.term);
            writer.write(&record)?;
        }
        writer.finish()?;

        let sorted = sorter.temp_file("weights-sorted")?;
        let info = sorter.sort(spill.path(), sorted.path())?;
        drop(spill);
        debug!(%info, "weights sorted");

        // Pass 2: rank into buckets; equal weights share the bucket of the
        // record before them.
        let buckets = self.options.buckets as u64;
        let total = info.lines as u64;
        let mut builder = CompletionBuilder::new(self.options.buckets, ExternalSorter::new(sorter)?)?;
        let mut reader = ByteSequencesReader::new(BufReader::new(File::open(sorted.path())?));
        let mut line = 0u64;
        let mut previous_weight = [0u8; 4];
        let mut previous_bucket = 0usize;
        while reader.read_into(&mut record)? {
            if record.len() < 4 {
                return Err(SuggestError::Parse("truncated weight record".to_string()));
            }
            let (weight, term) = record.split_at(4);
            let bucket = if line > 0 && weight == &previous_weight[..] {
                previous_bucket
            } else {
                (line * buckets / total) as usize
            };
            builder.add(term, bucket)?;
            previous_weight.copy_from_slice(weight);
            previous_bucket = bucket;
            line += 1;
        }
        drop(reader);
        drop(sorted);

        let completion = builder.build()?;
        self.install(completion.automaton().cloned(), line);
        info!(entries = line, buckets = self.normal.bucket_count(), "bucketed suggester built");
        Ok(())
    }

    fn lookup(
        &self,
        key: &str,
        contexts: Option<&[Vec<u8>]>,
        only_more_popular: bool,
        num: usize,
    ) -> Result<Vec<LookupResult>, SuggestError> {
        reject_contexts(contexts)?;
        Ok(self
            .do_lookup(key, only_more_popular, num)
            .into_iter()
            .map(|s| LookupResult::new(s.term_str(), i64::from(s.bucket)))
            .collect())
    }

    fn get(&self, key: &str) -> Option<i64> {
        self.normal.get_bucket(key).map(i64::from)
    }

    fn store(&self, out: &mut dyn Write) -> Result<bool, SuggestError> {
        let Some(automaton) = self.normal.automaton() else {
            return Ok(false);
        };
        store::write_header(out, MAGIC, VERSION)?;
        out.write_vlong(self.count)?;
        automaton.write_to(out)?;
        Ok(true)
    }

    fn load(&mut self, input: &mut dyn Read) -> Result<bool, SuggestError> {
        store::check_header(input, MAGIC, VERSION)?;
        let count = input.read_vlong()?;
        let automaton = Automaton::read_from(input, Outputs::NoOutput)?;
        self.install(Some(Arc::new(automaton)), count);
        debug!(entries = count, "bucketed suggester loaded");
        Ok(true)
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn size_in_bytes(&self) -> usize {
        self.normal.automaton().map_or(0, |a| a.size_in_bytes())
    }
}
