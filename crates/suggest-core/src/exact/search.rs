//! Top-N cheapest completions below a node.
//!
//! Best-first search over partial paths ordered by `(cost, input)`. Below the
//! root every node has a zero-cost continuation (see `automaton`), so the
//! cost of a queued partial path is exactly the cost of its cheapest
//! completion. That makes the queue order the result order, and lets the
//! queue be cut down to the candidates that can still place.

use std::collections::BTreeSet;

use fst::raw::CompiledAddr;

use crate::automaton::Automaton;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TopPath {
    /// Bytes below the start node.
    pub suffix: Vec<u8>,
    pub cost: u64,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    cost: u64,
    input: Vec<u8>,
    step: Step,
}

/// `Complete` sorts first so an accepted path is emitted before its own
/// extensions at equal cost.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Step {
    Complete,
    Expand(CompiledAddr),
}

/// The `n` cheapest completions from `start`, whose incoming paths cost
/// `start_cost`. Ties break on suffix bytes. The empty suffix is only a
/// candidate when `allow_empty` is set.
pub(crate) fn top_n(
    automaton: &Automaton,
    start: CompiledAddr,
    start_cost: u64,
    n: usize,
    allow_empty: bool,
) -> Vec<TopPath> {
    let outputs = automaton.outputs();
    let mut results = Vec::with_capacity(n.min(64));
    if n == 0 {
        return results;
    }

    let mut queue = BTreeSet::new();
    queue.insert(Candidate {
        cost: start_cost,
        input: Vec::new(),
        step: Step::Expand(start),
    });

    while let Some(candidate) = queue.pop_first() {
        match candidate.step {
            Step::Complete => {
                results.push(TopPath {
                    suffix: candidate.input,
                    cost: candidate.cost,
                });
                if results.len() == n {
                    break;
                }
            }
            Step::Expand(node) => {
                if automaton.is_final(node) && (allow_empty || !candidate.input.is_empty()) {
                    queue.insert(Candidate {
                        cost: outputs.combine(candidate.cost, automaton.final_output(node)),
                        input: candidate.input.clone(),
                        step: Step::Complete,
                    });
                }
                for edge in automaton.edges(node) {
                    let mut input = Vec::with_capacity(candidate.input.len() + 1);
                    input.extend_from_slice(&candidate.input);
                    input.push(edge.label);
                    queue.insert(Candidate {
                        cost: outputs.combine(candidate.cost, edge.output),
                        input,
                        step: Step::Expand(edge.target),
                    });
                }
                prune(&mut queue, n - results.len());
            }
        }
    }
    results
}

/// Every queued candidate yields at least one distinct completion at its own
/// cost, so anything costlier than the `remaining`-th candidate cannot place.
fn prune(queue: &mut BTreeSet<Candidate>, remaining: usize) {
    if queue.len() <= remaining {
        return;
    }
    let Some(bound) = queue.iter().nth(remaining - 1).map(|c| c.cost) else {
        return;
    };
    while queue.last().is_some_and(|c| c.cost > bound) {
        queue.pop_last();
    }
}
