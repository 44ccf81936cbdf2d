#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::process;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "modorder: two-stage kernel module load-order planner",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (pretty, text, json).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags, `FORMAT`, and the terminal.
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Planning",
        about = "Compute early-stage and remaining load lists",
        long_about = "Build the dependency graph from modules.dep, optionally add device-link \
                      edges, remove pre-resident modules, then write the early-stage and \
                      remaining module manifests.",
        after_help = "EXAMPLES:\n    # Plan both stages\n    modorder order --modules-dep modules.dep \\\n        --early-modules early.load --out-early early.txt --out-remaining rest.txt\n\n    # Include device links\n    modorder order --modules-dep modules.dep --modules-alias modules.alias \\\n        --fw-devlink devlinks.txt --out-early early.txt --out-remaining rest.txt\n\n    # Emit machine-readable summary\n    modorder order --modules-dep modules.dep --out-early e.txt --out-remaining r.txt --json"
    )]
    Order(cmd::order::OrderArgs),

    #[command(
        next_help_heading = "Planning",
        about = "Show the load sequence needed by one module",
        long_about = "Print every module that must be loaded before (and including) the \
                      given module, dependencies first.",
        after_help = "EXAMPLES:\n    # Show what touch_drv pulls in\n    modorder closure --modules-dep modules.dep touch_drv\n\n    # Emit machine-readable output\n    modorder closure --modules-dep modules.dep touch_drv --json"
    )]
    Closure(cmd::closure::ClosureArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    modorder completions bash\n\n    # Generate zsh completions\n    modorder completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("MODORDER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "modorder=debug,modorder_core=debug,info"
        } else {
            "modorder=info,modorder_core=info,warn"
        })
    });

    let format = env::var("MODORDER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    debug!(?output, "output mode resolved");

    let command_result = match cli.command {
        Commands::Order(ref args) => cmd::order::run_order(args, output, cli.quiet),
        Commands::Closure(ref args) => cmd::closure::run_closure(args, output),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    };

    // Failures are rendered here once; returning them would print them again.
    if let Err(err) = command_result {
        output::render_failure(output, &err)?;
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn order_parses_required_and_optional_inputs() {
        let cli = Cli::parse_from([
            "modorder",
            "order",
            "--modules-dep",
            "modules.dep",
            "--early-modules",
            "early.load",
            "--out-early",
            "early.txt",
            "--out-remaining",
            "rest.txt",
        ]);
        let Commands::Order(args) = cli.command else {
            panic!("expected order");
        };
        assert_eq!(args.modules_dep, PathBuf::from("modules.dep"));
        assert_eq!(args.early_modules, Some(PathBuf::from("early.load")));
        assert!(args.modules_alias.is_none());
        assert!(args.fw_devlink.is_none());
        assert!(args.resident_modules.is_none());
    }

    #[test]
    fn order_accepts_partition_named_aliases() {
        let cli = Cli::parse_from([
            "modorder",
            "order",
            "--modules-dep",
            "modules.dep",
            "--vendor-boot-modules",
            "vb.load",
            "--system-dlkm-modules",
            "sd.load",
            "--out-vendor-boot-modules-list",
            "vb.txt",
            "--out-vendor-dlkm-modules-list",
            "vd.txt",
        ]);
        let Commands::Order(args) = cli.command else {
            panic!("expected order");
        };
        assert_eq!(args.early_modules, Some(PathBuf::from("vb.load")));
        assert_eq!(args.resident_modules, Some(PathBuf::from("sd.load")));
        assert_eq!(args.out_early, PathBuf::from("vb.txt"));
        assert_eq!(args.out_remaining, PathBuf::from("vd.txt"));
    }

    #[test]
    fn order_requires_modules_dep() {
        let result = Cli::try_parse_from([
            "modorder",
            "order",
            "--out-early",
            "e.txt",
            "--out-remaining",
            "r.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["modorder", "closure", "--modules-dep", "m.dep", "a", "--json"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_parses_value() {
        let cli = Cli::parse_from([
            "modorder",
            "--format",
            "text",
            "closure",
            "--modules-dep",
            "m.dep",
            "a",
        ]);
        assert_eq!(cli.format, Some(OutputMode::Text));
        assert_eq!(cli.output_mode(), OutputMode::Text);
    }

    #[test]
    fn quiet_flag_is_global() {
        let cli = Cli::parse_from([
            "modorder",
            "order",
            "--modules-dep",
            "m.dep",
            "--out-early",
            "e.txt",
            "--out-remaining",
            "r.txt",
            "-q",
        ]);
        assert!(cli.quiet);
    }
}
