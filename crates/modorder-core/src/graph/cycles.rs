//! Full-graph and incremental cycle detection helpers.
//!
//! # Edge Direction
//!
//! The module graph uses edge direction `dependency → dependent`. Adding a
//! new edge `from → to` closes a cycle exactly when `from` is reachable from
//! `to` through existing edges.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::{Control, DfsEvent, depth_first_search};

/// Check whether the live graph contains any cycle.
///
/// Depth-first search with three-coloring (undiscovered, on the stack,
/// finished), started at `root` and then at every node not yet discovered,
/// so components unreachable from ROOT are checked too. Any edge back to a
/// node still on the stack is a cycle, including self-loops.
#[must_use]
pub fn has_cycle<N, E>(graph: &StableDiGraph<N, E>, root: NodeIndex) -> bool {
    let starts = std::iter::once(root)
        .filter(|idx| graph.contains_node(*idx))
        .chain(graph.node_indices());

    let result = depth_first_search(graph, starts, |event| match event {
        DfsEvent::BackEdge(_, _) => Control::Break(()),
        _ => Control::Continue,
    });

    matches!(result, Control::Break(()))
}

/// Concrete loop closed by the edge `from → to`, if any.
///
/// Returns the node sequence `from -> to -> ... -> from`. A self-loop is
/// reported as `[from, from]`. Returns an empty vector when `from` is not
/// reachable from `to`.
#[must_use]
pub fn cycle_path<N, E>(graph: &StableDiGraph<N, E>, from: NodeIndex, to: NodeIndex) -> Vec<NodeIndex> {
    if from == to {
        return vec![from, from];
    }

    // BFS from `to` looking for `from`.
    let mut queue: VecDeque<NodeIndex> = VecDeque::from([to]);
    let mut visited: HashSet<NodeIndex> = HashSet::from([to]);
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();

    while let Some(current) = queue.pop_front() {
        if current == from {
            return reconstruct_cycle_path(from, to, &parent);
        }

        for next in graph.neighbors(current) {
            if visited.insert(next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    Vec::new()
}

fn reconstruct_cycle_path(
    from: NodeIndex,
    to: NodeIndex,
    parent: &HashMap<NodeIndex, NodeIndex>,
) -> Vec<NodeIndex> {
    // Parent links trace to -> ... -> from; walk them backwards.
    let mut to_to_from: Vec<NodeIndex> = vec![from];
    let mut cursor = from;

    while cursor != to {
        let Some(next) = parent.get(&cursor) else {
            break;
        };
        cursor = *next;
        to_to_from.push(cursor);
    }

    to_to_from.reverse();

    let mut cycle = Vec::with_capacity(to_to_from.len() + 1);
    cycle.push(from);
    cycle.extend(to_to_from);
    cycle
}
