//! Dependency closure extraction.
//!
//! [`ancestors`] collects every direct and transitive dependency of a
//! module by walking the graph backwards, then orders that set so each
//! module comes before every module it depends on (dependents-first).
//! [`load_sequence`] is the reverse: dependencies first, target last, ready
//! to be loaded in order.
//!
//! # Algorithm
//!
//! 1. Breadth-first discovery over reverse edges from the target, skipping
//!    ROOT and marking each node once, so diamonds don't loop.
//! 2. Kahn's algorithm over the reversed subgraph induced by the discovered
//!    set: a dependency is emitted only once every dependent inside the set
//!    has been emitted. A module reachable through several paths therefore
//!    lands after the last of its dependents.
//!
//! Ties are broken by discovery order (FIFO), with each node's dependencies
//! visited in edge insertion order.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::NodeIndex;

use crate::graph::ModuleGraph;

/// All modules `target` transitively depends on, plus `target` itself,
/// ordered dependents-first (so `target` is always first).
///
/// Returns an empty vector for ROOT or a removed node.
#[must_use]
pub fn ancestors(graph: &ModuleGraph, target: NodeIndex) -> Vec<NodeIndex> {
    if target == graph.root() || !graph.is_live(target) {
        return Vec::new();
    }

    let root = graph.root();
    let deps_of = |idx: NodeIndex| -> Vec<NodeIndex> {
        let mut seen = HashSet::new();
        graph
            .dependencies(idx)
            .into_iter()
            .filter(|dep| *dep != root && seen.insert(*dep))
            .collect()
    };

    // Discovery.
    let mut discovered: Vec<NodeIndex> = vec![target];
    let mut members: HashSet<NodeIndex> = HashSet::from([target]);
    let mut queue: VecDeque<NodeIndex> = VecDeque::from([target]);
    let mut edges: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();

    while let Some(node) = queue.pop_front() {
        let deps = deps_of(node);
        for dep in &deps {
            if members.insert(*dep) {
                discovered.push(*dep);
                queue.push_back(*dep);
            }
        }
        edges.insert(node, deps);
    }

    // Pending dependents per member.
    let mut pending: HashMap<NodeIndex, usize> = HashMap::new();
    for deps in edges.values() {
        for dep in deps {
            *pending.entry(*dep).or_insert(0) += 1;
        }
    }

    // Dependents-first ordering.
    let mut order: Vec<NodeIndex> = Vec::with_capacity(discovered.len());
    let mut ready: VecDeque<NodeIndex> = VecDeque::from([target]);

    while let Some(node) = ready.pop_front() {
        order.push(node);
        for dep in edges.get(&node).map(Vec::as_slice).unwrap_or_default() {
            if let Some(count) = pending.get_mut(dep) {
                *count -= 1;
                if *count == 0 {
                    ready.push_back(*dep);
                }
            }
        }
    }

    debug_assert_eq!(
        order.len(),
        discovered.len(),
        "closure of an acyclic graph must order every discovered module"
    );
    order
}

/// The dependencies-first sequence needed to load `target`, ending with
/// `target` itself.
#[must_use]
pub fn load_sequence(graph: &ModuleGraph, target: NodeIndex) -> Vec<NodeIndex> {
    let mut order = ancestors(graph, target);
    order.reverse();
    order
}
