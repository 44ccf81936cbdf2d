//! Device-link augmentation.
//!
//! # Overview
//!
//! Firmware device links (`supplier --> consumer`) describe probe-time
//! ordering between devices. When both devices are claimed by loadable
//! modules, the supplier's module must load before the consumer's, so each
//! such link becomes an extra graph edge.
//!
//! ## Steps
//!
//! 1. [`parse_device_links`]: split each line at ` --> ` and strip any
//!    `(null)` prefix segment from both sides.
//! 2. [`resolve_links`]: map each identifier to its module via the
//!    [`AliasTable`]; pairs touching a builtin driver are dropped.
//! 3. [`augment`]: resolve alias names (`_`) to module names (possibly `-`)
//!    and insert `supplier → consumer` unless it already exists. Cycle
//!    rejection is the same as for listing edges.
//!
//! The whole step is optional: missing or unparsable inputs skip it with a
//! warning ([`augment_from_sources`]).

pub mod alias;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

pub use alias::{AliasTable, AliasTarget};

use crate::error::ParseError;
use crate::graph::ModuleGraph;

const ARROW: &str = " --> ";
const NULL_SEGMENT: &str = "(null)";

/// One `supplier --> consumer` hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceLink {
    pub supplier: String,
    pub consumer: String,
}

/// A device link resolved to the pair of module names it constrains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleLink {
    pub supplier: String,
    pub consumer: String,
}

/// Counters describing one augmentation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AugmentReport {
    /// Module pairs considered.
    pub links: usize,
    /// New edges inserted.
    pub added: usize,
    /// Pairs whose edge already existed.
    pub duplicate: usize,
    /// Pairs rolled back because they would close a cycle.
    pub rejected: usize,
    /// Pairs naming a module absent from the listing.
    pub unknown: usize,
}

/// Drop everything up to and including the first `(null)` segment.
fn strip_null_segment(identifier: &str) -> &str {
    identifier
        .split_once(NULL_SEGMENT)
        .map_or(identifier, |(_, rest)| rest)
        .trim()
}

/// Parse device-link text.
///
/// # Errors
///
/// Returns [`ParseError::MissingArrow`] for a non-blank line without ` --> `.
pub fn parse_device_links(text: &str) -> Result<Vec<DeviceLink>, ParseError> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line_no, line)| {
            let (supplier, consumer) =
                line.split_once(ARROW).ok_or_else(|| ParseError::MissingArrow {
                    line: line_no,
                    content: line.to_string(),
                })?;
            Ok(DeviceLink {
                supplier: strip_null_segment(supplier).to_string(),
                consumer: strip_null_segment(consumer).to_string(),
            })
        })
        .collect()
}

/// Map device links to module pairs, dropping any link with a builtin side.
#[must_use]
pub fn resolve_links(links: &[DeviceLink], aliases: &AliasTable) -> Vec<ModuleLink> {
    links
        .iter()
        .filter_map(|link| {
            match (aliases.resolve(&link.supplier), aliases.resolve(&link.consumer)) {
                (AliasTarget::Module(supplier), AliasTarget::Module(consumer)) => {
                    Some(ModuleLink { supplier, consumer })
                }
                _ => {
                    debug!(
                        supplier = %link.supplier,
                        consumer = %link.consumer,
                        "device link involves a builtin driver, skipping"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Insert one edge per module link.
#[instrument(skip_all, fields(links = links.len()))]
pub fn augment(graph: &mut ModuleGraph, links: &[ModuleLink]) -> AugmentReport {
    let mut report = AugmentReport {
        links: links.len(),
        ..AugmentReport::default()
    };

    for link in links {
        let supplier = graph.modules().resolve_name(&link.supplier);
        let consumer = graph.modules().resolve_name(&link.consumer);

        let (Some(supplier), Some(consumer)) = (supplier, consumer) else {
            warn!(
                supplier = %link.supplier,
                consumer = %link.consumer,
                "device link names a module missing from modules.dep, skipping"
            );
            report.unknown += 1;
            continue;
        };

        if graph.contains_edge(supplier, consumer) {
            report.duplicate += 1;
        } else if graph.insert_edge_or_warn(supplier, consumer) {
            report.added += 1;
        } else {
            report.rejected += 1;
        }
    }

    info!(
        added = report.added,
        duplicate = report.duplicate,
        rejected = report.rejected,
        unknown = report.unknown,
        "device links applied"
    );
    report
}

/// Run the whole augmentation from raw file contents.
///
/// Returns `None` (after a warning) when either input is missing, the link
/// text is unparsable, or no link survives alias resolution; the graph is
/// then untouched.
pub fn augment_from_sources(
    graph: &mut ModuleGraph,
    device_links: Option<&str>,
    aliases: Option<&str>,
) -> Option<AugmentReport> {
    let (Some(device_links), Some(aliases)) = (device_links, aliases) else {
        warn!("device-link or alias file not available, skipping device-link augmentation");
        return None;
    };

    let links = match parse_device_links(device_links) {
        Ok(links) => links,
        Err(err) => {
            warn!(error = %err, "can't parse device links, skipping device-link augmentation");
            return None;
        }
    };

    let table = AliasTable::parse(aliases);
    let pairs = resolve_links(&links, &table);
    if pairs.is_empty() {
        warn!("there is nothing in the device-link list, skipping device-link augmentation");
        return None;
    }

    Some(augment(graph, &pairs))
}
