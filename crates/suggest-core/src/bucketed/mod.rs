//! Bucketed suggester.
//!
//! Weights are discretized into at most 255 buckets; every term is stored
//! in the automaton behind a leading bucket byte, so the root fans out per
//! bucket and lookups walk buckets from the highest down, collecting
//! completions in byte order until `num` are found.

mod builder;
mod completion;
mod lookup;

pub use builder::{CompletionBuilder, DEFAULT_BUCKETS};
pub use completion::{Completion, Suggestion};
pub use lookup::{BucketedLookup, BucketedOptions};
