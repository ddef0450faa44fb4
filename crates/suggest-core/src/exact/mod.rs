//! Exact-weight suggester.
//!
//! Each term's weight is stored as the automaton output `MAX_WEIGHT - weight`,
//! so cheapest paths are heaviest terms and a shortest-path search below the
//! prefix node yields the exact top-N.

mod search;
mod sort_key;
#[cfg(test)]
mod tests;

use std::io::{Cursor, Read, Write};
use std::path::Path;

use tracing::{debug, debug_span, info};

use crate::automaton::{Automaton, AutomatonBuilder, Outputs};
use crate::lookup::{
    check_entry, encode_weight, reject_contexts, reject_extensions, InputIterator, Lookup,
    LookupResult, SuggestError, MAX_WEIGHT,
};
use crate::settings::settings;
use crate::sort::{ByteSequenceSorter, ExternalSorter, SortOptions};
use crate::store::{self, DataInput, DataOutput};

pub const MAGIC: &[u8; 4] = b"SGEX";
pub const VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactOptions {
    /// Put an exact match of the key first regardless of its weight.
    pub exact_first: bool,
    pub sort: SortOptions,
}

impl Default for ExactOptions {
    /// Values from the `[exact]` and `[sort]` settings sections.
    fn default() -> Self {
        Self {
            exact_first: settings().exact.exact_first,
            sort: SortOptions::default(),
        }
    }
}

fn cost_of(weight: i64) -> Result<u32, SuggestError> {
    Ok(MAX_WEIGHT as u32 - encode_weight(weight)?)
}

fn weight_of(cost: u64) -> i64 {
    MAX_WEIGHT - cost as i64
}

pub struct WeightedExactLookup {
    options: ExactOptions,
    automaton: Option<Automaton>,
    count: u64,
}

impl WeightedExactLookup {
    pub fn new() -> Self {
        Self::with_options(ExactOptions::default())
    }

    pub fn with_options(options: ExactOptions) -> Self {
        Self {
            options,
            automaton: None,
            count: 0,
        }
    }

    pub fn options(&self) -> &ExactOptions {
        &self.options
    }

    pub fn automaton(&self) -> Option<&Automaton> {
        self.automaton.as_ref()
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
    pub fn open(path: &Path, options: ExactOptions) -> Result<Self, SuggestError> {
        let map = store::map_file(path)?;
        let mut cursor = Cursor::new(&map[..]);
        store::check_header(&mut cursor, MAGIC, VERSION)?;
        let count = cursor.read_vlong()?;
        let offset = cursor.position() as usize;
        let automaton = Automaton::from_mapped(map, offset, Outputs::PositiveInt)?;
        info!(path = %path.display(), entries = count, "exact suggester opened");
        Ok(Self {
            options,
            automaton: Some(automaton),
            count,
        })
    }
}

impl Default for WeightedExactLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl Lookup for WeightedExactLookup {
    fn build(&mut self, input: &mut dyn InputIterator) -> Result<(), SuggestError> {
        let _span = debug_span!("exact_build").entered();
        reject_extensions(input)?;

        let mut sorter = ExternalSorter::with_options(self.options.sort.clone())?;
        let mut record = Vec::new();
        for (seq, entry) in (0u64..).zip(input) {
            let entry = entry?;
            check_entry(&entry)?;
            sort_key::encode(&entry.term, seq, cost_of(entry.weight)?, &mut record);
            sorter.add(&record)?;
        }

        // Records arrive grouped by term in input order; the first occurrence
        // wins and later duplicates are dropped whatever their weight.
        let mut builder = AutomatonBuilder::new(Outputs::PositiveInt);
        let mut term = Vec::new();
        let mut previous = Vec::new();
        let mut duplicates = 0usize;
        let mut sorted = sorter.sorted()?;
        while let Some(record) = sorted.next_entry()? {
            let cost = sort_key::decode(record, &mut term)?;
            if builder.count() > 0 && term == previous {
                duplicates += 1;
                continue;
            }
            builder.add(&term, u64::from(cost))?;
            std::mem::swap(&mut previous, &mut term);
        }
        drop(sorted);

        let count = builder.count() as u64;
        self.automaton = builder.finish()?;
        self.count = count;
        info!(entries = count, duplicates, "exact suggester built");
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
        if only_more_popular {
            return Err(SuggestError::Unsupported(
                "this suggester only works with only_more_popular=false".to_string(),
            ));
        }
        let Some(automaton) = &self.automaton else {
            return Ok(Vec::new());
        };
        if key.is_empty() || num == 0 {
            return Ok(Vec::new());
        }
        let _span = debug_span!("exact_lookup", key, num).entered();

        let prefix = key.as_bytes();
        let Some((node, prefix_cost)) = automaton.descend(automaton.root(), prefix) else {
            return Ok(Vec::new());
        };

        let mut results = Vec::with_capacity(num.min(64));
        let mut remaining = num;
        let exact_first = self.options.exact_first;
        if exact_first && automaton.is_final(node) {
            let cost = prefix_cost + automaton.final_output(node);
            results.push(LookupResult::new(key, weight_of(cost)));
            remaining -= 1;
        }

        let paths = search::top_n(automaton, node, prefix_cost, remaining, !exact_first);
        debug!(found = paths.len(), "top paths collected");
        let mut term = prefix.to_vec();
        for path in paths {
            term.truncate(prefix.len());
            term.extend_from_slice(&path.suffix);
            results.push(LookupResult::new(
                String::from_utf8_lossy(&term),
                weight_of(path.cost),
            ));
        }
        Ok(results)
    }

    fn get(&self, key: &str) -> Option<i64> {
        if key.is_empty() {
            return None;
        }
        self.automaton.as_ref()?.get(key.as_bytes()).map(weight_of)
    }

    fn store(&self, out: &mut dyn Write) -> Result<bool, SuggestError> {
        let Some(automaton) = &self.automaton else {
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
        self.automaton = Some(Automaton::read_from(input, Outputs::PositiveInt)?);
        self.count = count;
        debug!(entries = count, "exact suggester loaded");
        Ok(true)
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn size_in_bytes(&self) -> usize {
        self.automaton.as_ref().map_or(0, Automaton::size_in_bytes)
    }
}
