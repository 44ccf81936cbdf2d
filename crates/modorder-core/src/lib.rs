#![forbid(unsafe_code)]
//! modorder-core library.
//!
//! Computes a dependency-correct load order for kernel modules split across
//! an early boot stage and a later general stage.
//!
//! ## Pipeline
//!
//! ```text
//! modules.dep text
//!        ↓  graph::ModuleGraph::from_dep_listing()
//! ModuleGraph (acyclic, ROOT-anchored)
//!        ↓  devlink::augment()            (optional, skipped on bad input)
//! ModuleGraph + device-link edges
//!        ↓  plan::plan_stages()
//!   ├─ remove pre-resident modules     (graph::eliminate)
//!   ├─ peel early-stage closures       (graph::closure + graph::eliminate)
//!   └─ sort what remains               (graph::order)
//! StagePlan { early, remaining }
//!        ↓  emit::render_manifest()
//! two manifest fragments
//! ```
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per concern; `anyhow::Result` at I/O edges.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod devlink;
pub mod emit;
pub mod error;
pub mod graph;
pub mod module;
pub mod plan;

pub use error::{ErrorCode, ParseError, PlanError};
pub use graph::ModuleGraph;
pub use plan::{StagePlan, plan_stages};
