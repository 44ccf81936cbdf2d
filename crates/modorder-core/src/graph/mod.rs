//! Module dependency graph engine.
//!
//! # Overview
//!
//! [`ModuleGraph`] owns the node set (one node per module plus a synthetic
//! ROOT at index 0) and the directed edges between them. An edge `A → B`
//! means "A must load before B", i.e. B depends on A. A module without
//! dependencies hangs off ROOT, so every placeable module is reachable from
//! ROOT.
//!
//! The graph is acyclic at every observable point: [`ModuleGraph::insert_edge`]
//! either keeps the graph acyclic with the new edge present, or rolls the
//! edge back and reports the offending pair.
//!
//! ## Pipeline
//!
//! ```text
//! modules.dep text
//!        ↓  build::ModuleGraph::from_dep_listing()
//! ModuleGraph
//!        ↓  crate::devlink::augment()          extra supplier → consumer edges
//!        ↓  eliminate::remove_node()           drop pre-resident / placed modules
//!        ↓  closure::ancestors()               early-stage dependency closures
//!        ↓  order::topological_order()         final load sequence
//! ```
//!
//! ## Node lifetime
//!
//! Nodes live in a [`petgraph::stable_graph::StableDiGraph`], so removing a
//! module leaves a tombstone and never shifts or reuses another module's
//! index. A removed node is dead for the rest of the run.
//!
//! ## Neighbor order
//!
//! Each edge carries its insertion sequence number. Neighbor lists are
//! returned in insertion order, which keeps FIFO tie-breaking in the final
//! sort stable across runs.

pub mod build;
pub mod closure;
pub mod cycles;
pub mod eliminate;
pub mod order;

// Re-export primary types at module level for convenience.
pub use build::{EdgeRejected, ModuleGraph, RejectedEdge};
pub use closure::{ancestors, load_sequence};
pub use cycles::{cycle_path, has_cycle};
pub use eliminate::remove_node;
pub use order::{LoadOrder, topological_order};
