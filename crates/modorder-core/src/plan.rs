//! Two-stage load planning.
//!
//! # Overview
//!
//! Given a built (and optionally augmented) [`ModuleGraph`]:
//!
//! 1. **Pre-resident removal** — modules already provided by another boot
//!    partition are removed, promoting their dependents.
//! 2. **Early stage** — for each designated early module, in list order,
//!    its dependency closure is emitted dependencies-first and removed from
//!    the graph. Any closure member that is not itself designated early is a
//!    missing requirement; the first target with missing requirements aborts
//!    planning with [`PlanError::MissingRequirements`].
//! 3. **Remaining stage** — everything still live is sorted from ROOT.
//!
//! Module lists are matched by short name (final path segment without its
//! extension). Names that match no module are warned about and skipped.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::PlanError;
use crate::graph::{ModuleGraph, closure, eliminate, order};
use crate::module::module_name;

/// The computed load order for both stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StagePlan {
    /// Early-stage module paths, in load order.
    pub early: Vec<String>,
    /// Remaining module paths, in load order.
    pub remaining: Vec<String>,
    /// Live modules the final sort could not reach.
    pub unplaced: Vec<String>,
    /// Pre-resident modules removed before planning.
    pub resident_removed: usize,
    /// List entries that matched no module.
    pub unknown: Vec<String>,
}

/// Reduce a module list (one path per line) to module names.
#[must_use]
pub fn parse_module_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| module_name(line).to_string())
        .collect()
}

fn lookup(
    graph: &ModuleGraph,
    name: &str,
    list: &str,
    unknown: &mut Vec<String>,
) -> Option<NodeIndex> {
    let found = graph.modules().by_name(name);
    if found.is_none() {
        warn!(module = %name, list, "module is not in modules.dep, skipping");
        unknown.push(name.to_string());
    }
    found
}

/// Remove every pre-resident module from the graph.
///
/// Returns how many live modules were removed.
pub fn remove_resident(
    graph: &mut ModuleGraph,
    names: &[String],
    unknown: &mut Vec<String>,
) -> usize {
    let mut removed = 0;
    for name in names {
        let Some(idx) = lookup(graph, name, "resident", unknown) else {
            continue;
        };
        if graph.is_live(idx) {
            eliminate::remove_node(graph, idx);
            removed += 1;
        }
    }
    removed
}

/// Peel the early stage off the graph.
///
/// Returns the early-stage modules in load order. Every emitted module is
/// removed from the graph.
///
/// # Errors
///
/// Returns [`PlanError::MissingRequirements`] for the first target whose
/// closure contains modules not designated early.
pub fn resolve_early_stage(
    graph: &mut ModuleGraph,
    names: &[String],
    unknown: &mut Vec<String>,
) -> Result<Vec<NodeIndex>, PlanError> {
    let designated: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut early = Vec::new();

    for name in names {
        let Some(target) = lookup(graph, name, "early", unknown) else {
            continue;
        };

        let sequence = closure::load_sequence(graph, target);
        if sequence.is_empty() {
            debug!(module = %name, "already placed by an earlier closure");
            continue;
        }

        let mut missing = Vec::new();
        for idx in sequence {
            let member = graph.modules().label(idx);
            if !designated.contains(member.as_str()) {
                missing.push(member);
            }
            early.push(idx);
            eliminate::remove_node(graph, idx);
        }

        if !missing.is_empty() {
            return Err(PlanError::MissingRequirements {
                target: name.clone(),
                missing,
            });
        }
    }

    Ok(early)
}

fn paths(graph: &ModuleGraph, nodes: &[NodeIndex]) -> Vec<String> {
    nodes
        .iter()
        .filter_map(|idx| graph.path(*idx))
        .map(str::to_string)
        .collect()
}

/// Compute both stages, consuming the graph's live modules.
///
/// # Errors
///
/// Returns [`PlanError::MissingRequirements`] when an early-stage module
/// depends on a module outside the early stage.
#[instrument(skip_all, fields(early = early.len(), resident = resident.len()))]
pub fn plan_stages(
    graph: &mut ModuleGraph,
    early: &[String],
    resident: &[String],
) -> Result<StagePlan, PlanError> {
    let mut unknown = Vec::new();

    let resident_removed = remove_resident(graph, resident, &mut unknown);
    let early_nodes = resolve_early_stage(graph, early, &mut unknown)?;
    let sorted = order::topological_order(graph);

    let plan = StagePlan {
        early: paths(graph, &early_nodes),
        remaining: paths(graph, &sorted.order),
        unplaced: paths(graph, &sorted.unplaced),
        resident_removed,
        unknown,
    };

    info!(
        early = plan.early.len(),
        remaining = plan.remaining.len(),
        unplaced = plan.unplaced.len(),
        resident_removed,
        "stage plan computed"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parse_module_list_reduces_paths_to_names() {
        let list = parse_module_list("kernel/drivers/a.ko\n\n  b.ko  \nc\n");
        assert_eq!(list, vec!["a", "b", "c"]);
    }

    #[test]
    fn no_stages_sorts_everything() {
        let mut graph = ModuleGraph::from_dep_listing("a:\nb:a\nc:b\n").expect("build");
        let plan = plan_stages(&mut graph, &[], &[]).expect("plan");
        assert!(plan.early.is_empty());
        assert_eq!(plan.remaining, vec!["a", "b", "c"]);
    }

    #[test]
    fn early_closure_is_emitted_dependencies_first() {
        let mut graph =
            ModuleGraph::from_dep_listing("k/a.ko:\nk/b.ko: k/a.ko\nk/c.ko: k/b.ko\nk/d.ko:\n")
                .expect("build");
        let plan = plan_stages(&mut graph, &names(&["b", "a"]), &[]).expect("plan");
        assert_eq!(plan.early, vec!["k/a.ko", "k/b.ko"]);
        assert_eq!(plan.remaining, vec!["k/d.ko", "k/c.ko"]);
    }

    #[test]
    fn missing_early_requirement_is_fatal() {
        let mut graph = ModuleGraph::from_dep_listing("a:\nb:a\n").expect("build");
        let err = plan_stages(&mut graph, &names(&["b"]), &[]).expect_err("must fail");
        assert_eq!(
            err,
            PlanError::MissingRequirements {
                target: "b".to_string(),
                missing: vec!["a".to_string()],
            }
        );
    }

    #[test]
    fn resident_module_promotes_its_dependents() {
        let mut graph = ModuleGraph::from_dep_listing("a:\nb:a\n").expect("build");
        let b = graph.modules().by_name("b").expect("b");

        let mut unknown = Vec::new();
        assert_eq!(remove_resident(&mut graph, &names(&["a"]), &mut unknown), 1);
        assert_eq!(graph.indegree(b), Some(1));
        assert!(graph.contains_edge(graph.root(), b));

        let plan = plan_stages(&mut graph, &[], &[]).expect("plan");
        assert_eq!(plan.remaining, vec!["b"]);
    }

    #[test]
    fn resident_dependency_satisfies_early_module() {
        let mut graph = ModuleGraph::from_dep_listing("a:\nb:a\nc:\n").expect("build");
        let plan = plan_stages(&mut graph, &names(&["b"]), &names(&["a"])).expect("plan");
        assert_eq!(plan.early, vec!["b"]);
        assert_eq!(plan.remaining, vec!["c"]);
        assert_eq!(plan.resident_removed, 1);
    }

    #[test]
    fn target_absorbed_by_earlier_closure_is_skipped() {
        let mut graph = ModuleGraph::from_dep_listing("a:\nb:a\n").expect("build");
        let plan = plan_stages(&mut graph, &names(&["b", "a"]), &[]).expect("plan");
        assert_eq!(plan.early, vec!["a", "b"]);
        assert!(plan.remaining.is_empty());
    }

    #[test]
    fn unknown_names_are_reported_not_fatal() {
        let mut graph = ModuleGraph::from_dep_listing("a:\n").expect("build");
        let plan = plan_stages(&mut graph, &names(&["ghost"]), &names(&["phantom"])).expect("plan");
        assert_eq!(plan.unknown, vec!["phantom", "ghost"]);
        assert_eq!(plan.remaining, vec!["a"]);
    }

    #[test]
    fn early_modules_never_reappear_in_remaining() {
        let mut graph =
            ModuleGraph::from_dep_listing("a:\nb:a\nc:a\nd:b c\n").expect("build");
        let plan = plan_stages(&mut graph, &names(&["a", "b"]), &[]).expect("plan");
        assert_eq!(plan.early, vec!["a", "b"]);
        assert_eq!(plan.remaining, vec!["c", "d"]);
    }
}
