use anyhow::{Context, Result};
use clap::Args;
use modorder_core::config::{PlanConfig, load_config};
use modorder_core::devlink::{AugmentReport, augment_from_sources};
use modorder_core::emit::render_manifest;
use modorder_core::graph::RejectedEdge;
use modorder_core::plan::parse_module_list;
use modorder_core::{ErrorCode, ModuleGraph, StagePlan, plan_stages};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::cmd::{read_optional, read_required};
use crate::output::{OutputMode, coded, pretty_kv, pretty_rule, render_mode};

/// Arguments for `modorder order`.
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// The `modules.dep` dependency listing.
    #[arg(long, value_name = "FILE")]
    pub modules_dep: PathBuf,

    /// The `modules.alias` table used to resolve device-link identifiers.
    #[arg(long, value_name = "FILE")]
    pub modules_alias: Option<PathBuf>,

    /// Device-link hints, one `supplier --> consumer` pair per line.
    #[arg(long, value_name = "FILE")]
    pub fw_devlink: Option<PathBuf>,

    /// Modules that must load in the early boot stage.
    #[arg(long, visible_alias = "vendor-boot-modules", value_name = "FILE")]
    pub early_modules: Option<PathBuf>,

    /// Modules already provided by another boot partition.
    #[arg(long, visible_alias = "system-dlkm-modules", value_name = "FILE")]
    pub resident_modules: Option<PathBuf>,

    /// Destination for the early-stage manifest.
    #[arg(long, visible_alias = "out-vendor-boot-modules-list", value_name = "FILE")]
    pub out_early: PathBuf,

    /// Destination for the remaining-stage manifest.
    #[arg(long, visible_alias = "out-vendor-dlkm-modules-list", value_name = "FILE")]
    pub out_remaining: PathBuf,

    /// Planner config (TOML).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct OrderSummary<'a> {
    early: usize,
    remaining: usize,
    resident_removed: usize,
    rejected_edges: &'a [RejectedEdge],
    #[serde(skip_serializing_if = "Option::is_none")]
    devlink: Option<AugmentReport>,
    unplaced: &'a [String],
    unknown: &'a [String],
    out_early: String,
    out_remaining: String,
}

/// Build the graph from the dependency listing and apply device links when
/// enabled.
pub fn build_graph(
    modules_dep: &Path,
    fw_devlink: Option<&Path>,
    modules_alias: Option<&Path>,
    config: &PlanConfig,
) -> Result<(ModuleGraph, Option<AugmentReport>)> {
    let listing = read_required(modules_dep, "module dependencies")?;
    let mut graph = ModuleGraph::from_dep_listing(&listing).map_err(|err| {
        let code = err.code();
        coded(code)(anyhow::Error::new(err).context(format!(
            "Failed to parse {}",
            modules_dep.display()
        )))
    })?;

    let report = if config.devlink.enabled && (fw_devlink.is_some() || modules_alias.is_some()) {
        let links = read_optional(fw_devlink, "device links");
        let aliases = read_optional(modules_alias, "module aliases");
        augment_from_sources(&mut graph, links.as_deref(), aliases.as_deref())
    } else {
        None
    };

    Ok((graph, report))
}

/// A module list is optional, but once named it must be readable.
fn read_list(path: Option<&Path>, what: &str) -> Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    read_required(path, what).map(|text| parse_module_list(&text))
}

fn write_manifest(path: &Path, paths: &[String], config: &PlanConfig) -> Result<()> {
    std::fs::write(path, render_manifest(paths, &config.output))
        .with_context(|| format!("Failed to write {}", path.display()))
        .map_err(coded(ErrorCode::OutputWriteFailed))
}

fn write_summary_text(summary: &OrderSummary<'_>, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "early={}", summary.early)?;
    writeln!(w, "remaining={}", summary.remaining)?;
    writeln!(w, "resident_removed={}", summary.resident_removed)?;
    writeln!(w, "rejected_edges={}", summary.rejected_edges.len())?;
    if let Some(report) = summary.devlink {
        writeln!(w, "devlink_added={}", report.added)?;
    }
    writeln!(w, "unplaced={}", summary.unplaced.len())?;
    writeln!(w, "unknown={}", summary.unknown.len())?;
    Ok(())
}

fn write_summary_pretty(summary: &OrderSummary<'_>, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "Load plan")?;
    pretty_rule(w)?;
    pretty_kv(w, "Early stage", format!("{} -> {}", summary.early, summary.out_early))?;
    pretty_kv(
        w,
        "Remaining",
        format!("{} -> {}", summary.remaining, summary.out_remaining),
    )?;
    pretty_kv(w, "Resident removed", summary.resident_removed.to_string())?;
    if let Some(report) = summary.devlink {
        pretty_kv(
            w,
            "Device links",
            format!(
                "{} resolved, {} added, {} duplicate, {} rejected, {} unknown",
                report.links, report.added, report.duplicate, report.rejected, report.unknown
            ),
        )?;
    }

    if !summary.rejected_edges.is_empty() {
        writeln!(w)?;
        writeln!(w, "Rejected edges (would close a cycle)")?;
        for edge in summary.rejected_edges {
            writeln!(w, "  {} --> {}", edge.from, edge.to)?;
        }
    }
    if !summary.unplaced.is_empty() {
        writeln!(w)?;
        writeln!(w, "Unplaced modules")?;
        for path in summary.unplaced {
            writeln!(w, "  {path}")?;
        }
    }
    if !summary.unknown.is_empty() {
        writeln!(w)?;
        writeln!(w, "Unknown list entries")?;
        for name in summary.unknown {
            writeln!(w, "  {name}")?;
        }
    }
    Ok(())
}

/// Execute `modorder order`.
///
/// # Errors
///
/// Returns an error if a required input cannot be read or parsed, if an
/// output cannot be written, or if the early stage is incomplete. No output
/// file is written in the last case.
#[instrument(skip_all, fields(modules_dep = %args.modules_dep.display()))]
pub fn run_order(args: &OrderArgs, output: OutputMode, quiet: bool) -> Result<()> {
    let config =
        load_config(args.config.as_deref()).map_err(coded(ErrorCode::ConfigParseError))?;
    let (mut graph, devlink) = build_graph(
        &args.modules_dep,
        args.fw_devlink.as_deref(),
        args.modules_alias.as_deref(),
        &config,
    )?;

    let early = read_list(args.early_modules.as_deref(), "early-stage module list")?;
    let resident = read_list(args.resident_modules.as_deref(), "resident module list")?;

    let plan: StagePlan = plan_stages(&mut graph, &early, &resident)?;

    write_manifest(&args.out_early, &plan.early, &config)?;
    write_manifest(&args.out_remaining, &plan.remaining, &config)?;
    info!(
        early = plan.early.len(),
        remaining = plan.remaining.len(),
        "manifests written"
    );

    if quiet {
        return Ok(());
    }

    let summary = OrderSummary {
        early: plan.early.len(),
        remaining: plan.remaining.len(),
        resident_removed: plan.resident_removed,
        rejected_edges: graph.rejected_edges(),
        devlink,
        unplaced: &plan.unplaced,
        unknown: &plan.unknown,
        out_early: args.out_early.display().to_string(),
        out_remaining: args.out_remaining.display().to_string(),
    };
    render_mode(output, &summary, write_summary_text, write_summary_pretty)
}
