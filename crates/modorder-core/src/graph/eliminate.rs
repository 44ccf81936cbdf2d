//! Node removal with indegree repair.
//!
//! Removing a module drops it and every edge touching it. Each former
//! dependent loses one incoming edge per removed edge; any dependent left
//! with no incoming edges gets a fresh `ROOT → dependent` edge, which makes
//! it immediately loadable in the final sort.
//!
//! Removal is used for pre-resident modules (provided by another boot
//! partition) and for every module absorbed into the early stage.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use tracing::{debug, trace};

use crate::graph::ModuleGraph;

/// Remove `node` from `graph`.
///
/// Returns the dependents promoted to ROOT, in the order `node` listed them.
/// Removing ROOT or an already-dead node is a no-op.
pub fn remove_node(graph: &mut ModuleGraph, node: NodeIndex) -> Vec<NodeIndex> {
    if node == graph.root() || !graph.is_live(node) {
        return Vec::new();
    }

    let dependents = graph.dependents(node);
    graph.drop_node(node);

    let root = graph.root();
    let mut seen = HashSet::new();
    let mut promoted = Vec::new();

    for dependent in dependents {
        if !seen.insert(dependent) {
            continue;
        }
        if graph.indegree(dependent) == Some(0) {
            // ROOT has no incoming edges, so this cannot close a cycle.
            graph.add_raw_edge(root, dependent);
            trace!(module = %graph.modules().label(dependent), "promoted to ROOT");
            promoted.push(dependent);
        }
    }

    debug!(
        module = %graph.modules().label(node),
        promoted = promoted.len(),
        "module removed from graph"
    );
    promoted
}
