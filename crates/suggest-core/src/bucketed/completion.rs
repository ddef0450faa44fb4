use std::borrow::Cow;
use std::sync::Arc;

use fst::raw::CompiledAddr;

use crate::automaton::{Automaton, Edge};

/// A completion and the bucket it was found in.
///
/// Ordering is by term bytes, then bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Suggestion {
    pub term: Vec<u8>,
    pub bucket: u8,
}

impl Suggestion {
    pub fn term_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.term)
    }
}

/// Read-only lookup view over a bucketed automaton.
///
/// Views are cheap to clone; the automaton and the root arc cache are
/// shared between every view derived from one build.
#[derive(Debug, Clone)]
pub struct Completion {
    automaton: Option<Arc<Automaton>>,
    /// Root arcs, highest bucket first.
    root_arcs: Arc<[Edge]>,
    higher_weights_first: bool,
    exact_first: bool,
}

impl Default for Completion {
    fn default() -> Self {
        Self::new(None, true, true)
    }
}

impl Completion {
    pub fn new(automaton: Option<Automaton>, higher_weights_first: bool, exact_first: bool) -> Self {
        Self::from_shared(automaton.map(Arc::new), higher_weights_first, exact_first)
    }

    pub fn from_shared(
        automaton: Option<Arc<Automaton>>,
        higher_weights_first: bool,
        exact_first: bool,
    ) -> Self {
        let root_arcs: Arc<[Edge]> = match automaton.as_deref() {
            Some(a) => {
                let mut arcs: Vec<Edge> = a.edges(a.root()).collect();
                arcs.reverse();
                arcs.into()
            }
            None => Vec::new().into(),
        };
        Self {
            automaton,
            root_arcs,
            higher_weights_first,
            exact_first,
        }
    }

    /// Another view over the same automaton.
    pub fn with_mode(&self, higher_weights_first: bool, exact_first: bool) -> Self {
        Self {
            automaton: self.automaton.clone(),
            root_arcs: Arc::clone(&self.root_arcs),
            higher_weights_first,
            exact_first,
        }
    }

    pub fn automaton(&self) -> Option<&Arc<Automaton>> {
        self.automaton.as_ref()
    }

    /// Number of distinct buckets present.
    pub fn bucket_count(&self) -> usize {
        self.root_arcs.len()
    }

    pub fn higher_weights_first(&self) -> bool {
        self.higher_weights_first
    }

    pub fn exact_first(&self) -> bool {
        self.exact_first
    }

    /// Bucket of `key` if it is stored exactly. The highest bucket wins when
    /// a term was added more than once.
    pub fn get_bucket(&self, key: &str) -> Option<u8> {
        let automaton = self.automaton.as_deref()?;
        if key.is_empty() {
            return None;
        }
        self.exact_match_bucket(automaton, 0, key.as_bytes())
    }

    /// Up to `num` completions of `key`, highest bucket first and
    /// alphabetical within a bucket. In alphabetical mode the candidates are
    /// re-sorted by term instead.
    pub fn lookup(&self, key: &str, num: usize) -> Vec<Suggestion> {
        let Some(automaton) = self.automaton.as_deref() else {
            return Vec::new();
        };
        if key.is_empty() || num == 0 {
            return Vec::new();
        }
        let key = key.as_bytes();
        if !self.higher_weights_first && self.root_arcs.len() > 1 {
            self.lookup_sorted_alphabetically(automaton, key, num)
        } else {
            self.lookup_sorted_by_weight(automaton, key, num, false)
        }
    }

    /// Gathers up to `num` completions from every bucket, then sorts by
    /// term. A bucket holding more than `num` matches contributes only its
    /// first `num` in byte order, which are also its alphabetical best, so
    /// the merged head is the true alphabetical head.
    fn lookup_sorted_alphabetically(&self, automaton: &Automaton, key: &[u8], num: usize) -> Vec<Suggestion> {
        let mut res = self.lookup_sorted_by_weight(automaton, key, num, true);
        res.sort();
        res.truncate(num);
        res
    }

    fn lookup_sorted_by_weight(
        &self,
        automaton: &Automaton,
        key: &[u8],
        num: usize,
        collect_all: bool,
    ) -> Vec<Suggestion> {
        let mut res = Vec::with_capacity(num.min(16));
        let mut output = Vec::with_capacity(key.len() + 16);
        for (i, root) in self.root_arcs.iter().enumerate() {
            let Some((node, _)) = automaton.descend(root.target, key) else {
                continue;
            };
            output.clear();
            output.extend_from_slice(key);
            let full = if collect_all {
                let mut bucket = Vec::new();
                collect(automaton, &mut bucket, num, root.label, &mut output, node);
                res.append(&mut bucket);
                false
            } else {
                collect(automaton, &mut res, num, root.label, &mut output, node)
            };
            if full {
                if self.exact_first && !promote_existing(&mut res, key) {
                    // The exact key may sit in a lower bucket that was never reached.
                    if let Some(bucket) = self.exact_match_bucket(automaton, i, key) {
                        res.truncate(num - 1);
                        res.insert(
                            0,
                            Suggestion {
                                term: key.to_vec(),
                                bucket,
                            },
                        );
                    }
                }
                return res;
            }
        }
        if self.exact_first && !collect_all {
            promote_existing(&mut res, key);
        }
        res
    }

    fn exact_match_bucket(&self, automaton: &Automaton, from: usize, key: &[u8]) -> Option<u8> {
        self.root_arcs.get(from..)?.iter().find_map(|root| {
            let (node, _) = automaton.descend(root.target, key)?;
            automaton.is_final(node).then_some(root.label)
        })
    }
}

/// Depth-first walk of `node`'s subtree in byte order, appending finals to
/// `res`. Returns true once `res` holds `num` entries.
fn collect(
    automaton: &Automaton,
    res: &mut Vec<Suggestion>,
    num: usize,
    bucket: u8,
    output: &mut Vec<u8>,
    node: CompiledAddr,
) -> bool {
    if automaton.is_final(node) {
        res.push(Suggestion {
            term: output.clone(),
            bucket,
        });
        if res.len() >= num {
            return true;
        }
    }
    for edge in automaton.edges(node) {
        output.push(edge.label);
        let full = collect(automaton, res, num, bucket, output, edge.target);
        output.pop();
        if full {
            return true;
        }
    }
    false
}

/// Move an existing exact match of `key` to the front.
fn promote_existing(res: &mut Vec<Suggestion>, key: &[u8]) -> bool {
    match res.iter().position(|s| s.term == key) {
        Some(i) => {
            let exact = res.remove(i);
            res.insert(0, exact);
            true
        }
        None => false,
    }
}
