//! Final load order over what remains of the graph.
//!
//! Kahn's algorithm seeded with ROOT. Indegrees are snapshotted so the
//! graph itself is not mutated. Nodes that reach indegree zero at the same
//! time are emitted in FIFO discovery order, following each node's
//! dependents in edge insertion order; the resulting list is therefore
//! identical across runs on identical input.

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use tracing::{instrument, warn};

use crate::graph::ModuleGraph;

/// Result of sorting the live graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadOrder {
    /// Live modules in load order (ROOT excluded).
    pub order: Vec<NodeIndex>,
    /// Live modules the sort never reached, in index order.
    pub unplaced: Vec<NodeIndex>,
}

/// Topologically sort the live graph starting at ROOT.
#[must_use]
#[instrument(skip(graph))]
pub fn topological_order(graph: &ModuleGraph) -> LoadOrder {
    let root = graph.root();
    let bound = graph.modules().len() + 1;

    let mut indegree: Vec<Option<usize>> = (0..bound)
        .map(|i| graph.indegree(NodeIndex::new(i)))
        .collect();
    let mut emitted = vec![false; bound];
    let mut order = Vec::new();
    let mut queue: VecDeque<NodeIndex> = VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        if node != root {
            order.push(node);
        }
        emitted[node.index()] = true;

        for dependent in graph.dependents(node) {
            let Some(Some(count)) = indegree.get_mut(dependent.index()) else {
                continue;
            };
            *count -= 1;
            if *count == 0 {
                queue.push_back(dependent);
            }
        }
    }

    let unplaced: Vec<NodeIndex> = graph
        .live_modules()
        .filter(|idx| !emitted[idx.index()])
        .collect();

    for idx in &unplaced {
        warn!(
            module = %graph.modules().label(*idx),
            "module is not reachable from ROOT and was left out of the load order"
        );
    }

    LoadOrder { order, unplaced }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::eliminate::remove_node;

    fn names(graph: &ModuleGraph, nodes: &[NodeIndex]) -> Vec<String> {
        nodes.iter().map(|idx| graph.modules().label(*idx)).collect()
    }

    #[test]
    fn chain_sorts_in_dependency_order() {
        let graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko: a.ko\nc.ko: b.ko\n").expect("build");
        let result = topological_order(&graph);
        assert_eq!(names(&graph, &result.order), vec!["a", "b", "c"]);
        assert!(result.unplaced.is_empty());
    }

    #[test]
    fn ties_follow_fifo_discovery_order() {
        let graph = ModuleGraph::from_dep_listing("c.ko:\na.ko:\nb.ko: c.ko\nd.ko: a.ko\n")
            .expect("build");
        let result = topological_order(&graph);
        assert_eq!(names(&graph, &result.order), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn waits_for_all_dependencies() {
        let graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko:\nc.ko: a.ko b.ko\n").expect("build");
        let result = topological_order(&graph);
        assert_eq!(names(&graph, &result.order), vec!["a", "b", "c"]);
    }

    #[test]
    fn removed_modules_are_skipped_and_dependents_promoted() {
        let mut graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko: a.ko\n").expect("build");
        let a = graph.modules().by_name("a").expect("a");
        remove_node(&mut graph, a);
        let result = topological_order(&graph);
        assert_eq!(names(&graph, &result.order), vec!["b"]);
    }

    #[test]
    fn module_with_only_unknown_dependencies_is_still_placed() {
        let graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko: ghost.ko\n").expect("build");
        let result = topological_order(&graph);
        assert_eq!(names(&graph, &result.order), vec!["a", "b"]);
        assert!(result.unplaced.is_empty());
    }

    #[test]
    fn unreachable_modules_are_reported_unplaced() {
        // Built without ROOT anchors, so nothing reaches either module.
        let mut graph = ModuleGraph::with_modules(["a.ko", "b.ko"]);
        let (a, b) = (NodeIndex::new(1), NodeIndex::new(2));
        assert!(graph.insert_edge_or_warn(a, b));
        let result = topological_order(&graph);
        assert!(result.order.is_empty());
        assert_eq!(names(&graph, &result.unplaced), vec!["a", "b"]);
    }

    #[test]
    fn sorting_does_not_mutate_graph() {
        let graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko: a.ko\n").expect("build");
        let edges = graph.edge_count();
        let first = topological_order(&graph);
        let second = topological_order(&graph);
        assert_eq!(first, second);
        assert_eq!(graph.edge_count(), edges);
    }

    #[test]
    fn empty_graph_yields_empty_order() {
        let graph = ModuleGraph::from_dep_listing("").expect("build");
        assert_eq!(topological_order(&graph), LoadOrder::default());
    }
}
