//! Weighted prefix suggestions over finite state automata.
//!
//! Two engines share one surface, the [`Lookup`] trait:
//!
//! - [`BucketedLookup`] discretizes weights into a small number of buckets
//!   and answers with a depth-first walk per bucket.
//! - [`WeightedExactLookup`] stores weights as path costs and ranks with a
//!   shortest-path search.
//!
//! Both are built from an [`InputIterator`], spill to disk through an
//! external sort while building, and persist with `store`/`load` or
//! `save`/`open`.

mod trace_init;

pub use suggest_core::{automaton, bucketed, exact, lookup, settings, sort, store};

pub use suggest_core::bucketed::{BucketedLookup, BucketedOptions, Completion, CompletionBuilder};
pub use suggest_core::exact::{ExactOptions, WeightedExactLookup};
pub use suggest_core::lookup::{
    Entry, FileDictionary, InputEntries, InputIterator, Lookup, LookupResult, SuggestError,
};
pub use trace_init::init_tracing;
