use anyhow::{Result, bail};
use clap::Args;
use modorder_core::config::load_config;
use modorder_core::graph::load_sequence;
use modorder_core::ErrorCode;
use modorder_core::module::module_name;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cmd::order::build_graph;
use crate::output::{OutputMode, coded, pretty_rule, render_mode};

/// Arguments for `modorder closure`.
#[derive(Args, Debug)]
pub struct ClosureArgs {
    /// Module name or path to resolve.
    pub module: String,

    /// The `modules.dep` dependency listing.
    #[arg(long, value_name = "FILE")]
    pub modules_dep: PathBuf,

    /// The `modules.alias` table used to resolve device-link identifiers.
    #[arg(long, value_name = "FILE")]
    pub modules_alias: Option<PathBuf>,

    /// Device-link hints, one `supplier --> consumer` pair per line.
    #[arg(long, value_name = "FILE")]
    pub fw_devlink: Option<PathBuf>,

    /// Planner config (TOML).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ClosureOutput {
    module: String,
    load_order: Vec<String>,
}

fn write_text(out: &ClosureOutput, w: &mut dyn Write) -> io::Result<()> {
    for path in &out.load_order {
        writeln!(w, "{path}")?;
    }
    Ok(())
}

fn write_pretty(out: &ClosureOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{} needs {} module(s), load in this order:",
        out.module,
        out.load_order.len()
    )?;
    pretty_rule(w)?;
    for (i, path) in out.load_order.iter().enumerate() {
        writeln!(w, "{:>3}. {path}", i + 1)?;
    }
    Ok(())
}

/// Execute `modorder closure`.
///
/// # Errors
///
/// Returns an error if an input cannot be read or parsed, or if the module
/// is not in the dependency listing.
pub fn run_closure(args: &ClosureArgs, output: OutputMode) -> Result<()> {
    let config =
        load_config(args.config.as_deref()).map_err(coded(ErrorCode::ConfigParseError))?;
    let (graph, _) = build_graph(
        &args.modules_dep,
        args.fw_devlink.as_deref(),
        args.modules_alias.as_deref(),
        &config,
    )?;

    let name = module_name(&args.module);
    let Some(target) = graph.modules().resolve_name(name) else {
        bail!("module '{name}' is not in {}", args.modules_dep.display());
    };

    let load_order = load_sequence(&graph, target)
        .into_iter()
        .filter_map(|idx| graph.path(idx))
        .map(str::to_string)
        .collect();

    let out = ClosureOutput {
        module: name.to_string(),
        load_order,
    };
    render_mode(output, &out, write_text, write_pretty)
}
