//! Graph construction from a `modules.dep` listing.
//!
//! # Overview
//!
//! Each listing line has the form `modulePath:dep1 dep2 ...`. Modules are
//! numbered from 1 in file order (ROOT is 0), then edges are inserted line
//! by line:
//!
//! - a module with no dependencies gets `ROOT → module`;
//! - otherwise every listed dependency `d` gets `d → module`.
//!
//! Every insertion goes through [`ModuleGraph::insert_edge`], which re-checks
//! the whole live graph for cycles and atomically reverts an edge that would
//! close one. Rejections are warnings, not failures: the offending pair is
//! logged and kept in [`ModuleGraph::rejected_edges`].

#![allow(clippy::module_name_repetitions)]

use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::ParseError;
use crate::graph::cycles;
use crate::module::ModuleTable;

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Why an edge insertion was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EdgeRejected {
    /// The edge would close a cycle; `cycle` is the closed loop by name,
    /// starting and ending at `from`.
    #[error("module cycle detected ({from} --> {to})")]
    Cycle {
        from: String,
        to: String,
        cycle: Vec<String>,
    },
    /// One endpoint was already removed from the graph.
    #[error("module {0} is no longer in the graph")]
    DeadEndpoint(String),
}

/// A cycle-closing edge that was rolled back during construction or
/// augmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEdge {
    pub from: String,
    pub to: String,
    pub cycle: Vec<String>,
}

// ---------------------------------------------------------------------------
// ModuleGraph
// ---------------------------------------------------------------------------

/// The module dependency graph.
///
/// Node weights are module install paths; edge weights are insertion
/// sequence numbers. The indegree of a live node is always the number of
/// edges pointing at it, so forward adjacency, reverse adjacency and
/// indegree cannot drift apart.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    graph: StableDiGraph<String, u64>,
    modules: ModuleTable,
    root: NodeIndex,
    next_seq: u64,
    rejected: Vec<RejectedEdge>,
}

/// One parsed `modules.dep` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEntry {
    pub path: String,
    pub deps: Vec<String>,
}

/// Parse a `modules.dep` listing.
///
/// Lines are trimmed and blank lines skipped.
///
/// # Errors
///
/// Returns [`ParseError::MissingColon`] for a non-blank line without `:`.
pub fn parse_dep_listing(text: &str) -> Result<Vec<DepEntry>, ParseError> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line_no, line)| {
            let (path, deps) = line.split_once(':').ok_or_else(|| ParseError::MissingColon {
                line: line_no,
                content: line.to_string(),
            })?;
            Ok(DepEntry {
                path: path.trim().to_string(),
                deps: deps.split_whitespace().map(str::to_string).collect(),
            })
        })
        .collect()
}

impl ModuleGraph {
    /// Create a graph containing ROOT and one isolated node per path.
    #[must_use]
    pub fn with_modules<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut graph = StableDiGraph::new();
        let mut modules = ModuleTable::new();
        let root = graph.add_node(crate::module::ROOT.to_string());

        for path in paths {
            let idx = graph.add_node(path.to_string());
            let registered = modules.register(path);
            debug_assert_eq!(idx, registered, "graph and module table must agree on indices");
        }

        Self {
            graph,
            modules,
            root,
            next_seq: 0,
            rejected: Vec::new(),
        }
    }

    /// Build the graph from `modules.dep` text.
    ///
    /// Dependencies that name no module in the listing are warned about and
    /// skipped. A module left without any dependency edge hangs off ROOT.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the listing is malformed.
    #[instrument(skip(text))]
    pub fn from_dep_listing(text: &str) -> Result<Self, ParseError> {
        let entries = parse_dep_listing(text)?;
        Ok(Self::from_entries(&entries))
    }

    /// Build the graph from already-parsed listing entries.
    #[must_use]
    pub fn from_entries(entries: &[DepEntry]) -> Self {
        let mut graph = Self::with_modules(entries.iter().map(|e| e.path.as_str()));

        for entry in entries {
            let Some(module) = graph.modules.by_path(&entry.path) else {
                continue;
            };

            let mut inserted = 0;
            for dep in &entry.deps {
                match graph.modules.by_path(dep) {
                    Some(dep_idx) => {
                        if graph.insert_edge_or_warn(dep_idx, module) {
                            inserted += 1;
                        }
                    }
                    None => warn!(
                        module = %entry.path,
                        dependency = %dep,
                        "dependency is not listed in modules.dep, skipping edge"
                    ),
                }
            }

            // No surviving dependency edge: anchor to ROOT so the module is
            // still placed.
            if inserted == 0 {
                graph.insert_edge_or_warn(graph.root, module);
            }
        }

        debug!(
            modules = graph.modules.len(),
            edges = graph.edge_count(),
            rejected = graph.rejected.len(),
            "module graph built"
        );
        graph
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert `from → to` ("`from` must load before `to`").
    ///
    /// After adding the edge the full live graph is scanned for cycles. If
    /// one is found the edge is removed again and the graph is left exactly
    /// as it was before the call.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeRejected::Cycle`] when the edge would close a cycle and
    /// [`EdgeRejected::DeadEndpoint`] when either endpoint has been removed.
    pub fn insert_edge(&mut self, from: NodeIndex, to: NodeIndex) -> Result<(), EdgeRejected> {
        for endpoint in [from, to] {
            if !self.is_live(endpoint) {
                return Err(EdgeRejected::DeadEndpoint(self.modules.label(endpoint)));
            }
        }

        let edge = self.add_raw_edge(from, to);
        if !cycles::has_cycle(&self.graph, self.root) {
            return Ok(());
        }

        let cycle = cycles::cycle_path(&self.graph, from, to)
            .into_iter()
            .map(|idx| self.modules.label(idx))
            .collect();
        self.graph.remove_edge(edge);

        Err(EdgeRejected::Cycle {
            from: self.modules.label(from),
            to: self.modules.label(to),
            cycle,
        })
    }

    /// [`insert_edge`](Self::insert_edge), logging and recording rejections.
    ///
    /// Returns `true` if the edge was added.
    pub fn insert_edge_or_warn(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        match self.insert_edge(from, to) {
            Ok(()) => true,
            Err(EdgeRejected::Cycle { from, to, cycle }) => {
                warn!(
                    from = %from,
                    to = %to,
                    cycle = %cycle.join(" -> "),
                    "Module cycle was detected. ({from} --> {to})"
                );
                self.rejected.push(RejectedEdge { from, to, cycle });
                false
            }
            Err(err @ EdgeRejected::DeadEndpoint(_)) => {
                warn!(reason = %err, "edge not inserted");
                false
            }
        }
    }

    /// Add an edge without the cycle check.
    ///
    /// Only for edges that cannot close a cycle, such as `ROOT → n` (ROOT
    /// has no incoming edges).
    pub(crate) fn add_raw_edge(&mut self, from: NodeIndex, to: NodeIndex) -> EdgeIndex {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.graph.add_edge(from, to, seq)
    }

    /// Drop a node and every edge touching it. Returns `false` if it was
    /// already gone.
    pub(crate) fn drop_node(&mut self, idx: NodeIndex) -> bool {
        self.graph.remove_node(idx).is_some()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The synthetic ROOT node.
    #[must_use]
    pub const fn root(&self) -> NodeIndex {
        self.root
    }

    /// Path/name/index lookups for every module ever registered.
    #[must_use]
    pub const fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    /// Whether `idx` is still in the graph (not removed).
    #[must_use]
    pub fn is_live(&self, idx: NodeIndex) -> bool {
        self.graph.contains_node(idx)
    }

    /// Number of edges pointing at `idx`, or `None` for a dead node.
    #[must_use]
    pub fn indegree(&self, idx: NodeIndex) -> Option<usize> {
        self.is_live(idx)
            .then(|| self.graph.edges_directed(idx, Direction::Incoming).count())
    }

    /// Nodes that must load after `idx`, in edge insertion order.
    ///
    /// A neighbor appears once per parallel edge.
    #[must_use]
    pub fn dependents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_in_order(idx, Direction::Outgoing)
    }

    /// Nodes that must load before `idx`, in edge insertion order.
    #[must_use]
    pub fn dependencies(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_in_order(idx, Direction::Incoming)
    }

    #[must_use]
    pub fn contains_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.graph.contains_edge(from, to)
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Live modules (ROOT excluded) in index order.
    pub fn live_modules(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.modules.indices().filter(|idx| self.is_live(*idx))
    }

    /// Cycle-closing edges rejected so far.
    #[must_use]
    pub fn rejected_edges(&self) -> &[RejectedEdge] {
        &self.rejected
    }

    /// Install path of `idx`.
    #[must_use]
    pub fn path(&self, idx: NodeIndex) -> Option<&str> {
        self.modules.path(idx)
    }

    /// Short name of `idx`.
    #[must_use]
    pub fn name(&self, idx: NodeIndex) -> Option<&str> {
        self.modules.name(idx)
    }

    /// Borrow the underlying petgraph storage.
    #[must_use]
    pub const fn inner(&self) -> &StableDiGraph<String, u64> {
        &self.graph
    }

    fn neighbors_in_order(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        if !self.is_live(idx) {
            return Vec::new();
        }

        let mut edges: Vec<(u64, NodeIndex)> = self
            .graph
            .edges_directed(idx, dir)
            .map(|edge| {
                let other = if edge.source() == idx {
                    edge.target()
                } else {
                    edge.source()
                };
                (*edge.weight(), other)
            })
            .collect();
        edges.sort_unstable_by_key(|(seq, _)| *seq);
        edges.into_iter().map(|(_, other)| other).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(graph: &ModuleGraph, name: &str) -> NodeIndex {
        graph
            .modules()
            .by_name(name)
            .unwrap_or_else(|| panic!("module {name} must exist"))
    }

    #[test]
    fn parse_dep_listing_splits_path_and_deps() {
        let entries = parse_dep_listing("kernel/b.ko: kernel/a.ko  kernel/c.ko\n\nkernel/a.ko:\n")
            .expect("parse");
        assert_eq!(
            entries,
            vec![
                DepEntry {
                    path: "kernel/b.ko".to_string(),
                    deps: vec!["kernel/a.ko".to_string(), "kernel/c.ko".to_string()],
                },
                DepEntry {
                    path: "kernel/a.ko".to_string(),
                    deps: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn parse_dep_listing_rejects_line_without_colon() {
        let err = parse_dep_listing("a.ko:\nnot a dep line\n").expect_err("must fail");
        assert_eq!(
            err,
            ParseError::MissingColon {
                line: 2,
                content: "not a dep line".to_string(),
            }
        );
    }

    #[test]
    fn modules_without_deps_hang_off_root() {
        let graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko:\n").expect("build");
        let a = idx(&graph, "a");
        let b = idx(&graph, "b");
        assert_eq!(graph.dependents(graph.root()), vec![a, b]);
        assert_eq!(graph.indegree(a), Some(1));
        assert_eq!(graph.dependencies(b), vec![graph.root()]);
    }

    #[test]
    fn dependency_edges_point_from_dependency_to_module() {
        let graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko: a.ko\nc.ko: b.ko a.ko\n")
            .expect("build");
        let (a, b, c) = (idx(&graph, "a"), idx(&graph, "b"), idx(&graph, "c"));
        assert!(graph.contains_edge(a, b));
        assert!(graph.contains_edge(b, c));
        assert!(graph.contains_edge(a, c));
        assert!(!graph.contains_edge(b, a));
        assert_eq!(graph.indegree(c), Some(2));
        assert_eq!(graph.dependencies(c), vec![b, a]);
        assert_eq!(graph.dependents(a), vec![b, c]);
    }

    #[test]
    fn unknown_dependency_is_skipped_and_module_anchored_to_root() {
        let graph = ModuleGraph::from_dep_listing("b.ko: ghost.ko\n").expect("build");
        let b = idx(&graph, "b");
        assert_eq!(graph.indegree(b), Some(1));
        assert!(graph.contains_edge(graph.root(), b));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn partially_unknown_dependencies_keep_known_edges_only() {
        let graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko: ghost.ko a.ko\n").expect("build");
        let (a, b) = (idx(&graph, "a"), idx(&graph, "b"));
        assert!(graph.contains_edge(a, b));
        assert!(!graph.contains_edge(graph.root(), b));
        assert_eq!(graph.indegree(b), Some(1));
    }

    #[test]
    fn cycle_closing_edge_is_rejected_and_recorded() {
        let mut graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko: a.ko\n").expect("build");
        let (a, b) = (idx(&graph, "a"), idx(&graph, "b"));

        let err = graph.insert_edge(b, a).expect_err("b -> a closes a cycle");
        match err {
            EdgeRejected::Cycle { from, to, cycle } => {
                assert_eq!(from, "b");
                assert_eq!(to, "a");
                assert_eq!(cycle, vec!["b", "a", "b"]);
            }
            other @ EdgeRejected::DeadEndpoint(_) => panic!("unexpected {other:?}"),
        }
        assert!(graph.contains_edge(a, b));
        assert!(!graph.contains_edge(b, a));
        assert_eq!(graph.indegree(a), Some(1));
        assert_eq!(graph.dependents(b), Vec::<NodeIndex>::new());

        assert!(!graph.insert_edge_or_warn(b, a));
        assert_eq!(graph.rejected_edges().len(), 1);
        assert_eq!(graph.rejected_edges()[0].from, "b");
    }

    #[test]
    fn cycle_in_listing_is_rejected_during_build() {
        let graph =
            ModuleGraph::from_dep_listing("a.ko:\nb.ko: a.ko c.ko\nc.ko: b.ko\n").expect("build");
        let (b, c) = (idx(&graph, "b"), idx(&graph, "c"));
        // c -> b was inserted first; b -> c would close the loop.
        assert!(graph.contains_edge(c, b));
        assert!(!graph.contains_edge(b, c));
        assert_eq!(graph.rejected_edges().len(), 1);
        assert!(!cycles::has_cycle(graph.inner(), graph.root()));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let graph = ModuleGraph::from_dep_listing("a.ko: a.ko\n").expect("build");
        let a = idx(&graph, "a");
        assert_eq!(graph.rejected_edges().len(), 1);
        assert_eq!(graph.dependencies(a), vec![graph.root()]);
    }

    #[test]
    fn insert_edge_refuses_dead_endpoint() {
        let mut graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko:\n").expect("build");
        let (a, b) = (idx(&graph, "a"), idx(&graph, "b"));
        assert!(graph.drop_node(a));
        assert_eq!(
            graph.insert_edge(a, b),
            Err(EdgeRejected::DeadEndpoint("a".to_string()))
        );
        assert_eq!(graph.indegree(a), None);
    }

    #[test]
    fn duplicate_dependency_creates_parallel_edges() {
        let graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko: a.ko a.ko\n").expect("build");
        let (a, b) = (idx(&graph, "a"), idx(&graph, "b"));
        assert_eq!(graph.indegree(b), Some(2));
        assert_eq!(graph.dependents(a), vec![b, b]);
    }

    #[test]
    fn live_modules_skips_root_and_dead_nodes() {
        let mut graph = ModuleGraph::from_dep_listing("a.ko:\nb.ko:\nc.ko:\n").expect("build");
        let b = idx(&graph, "b");
        graph.drop_node(b);
        let names: Vec<&str> = graph.live_modules().filter_map(|i| graph.name(i)).collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
