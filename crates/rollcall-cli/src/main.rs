mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::scan::ScanFlags;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rollcall",
    about = "Find TODO markers across a codebase and estimate which are already done",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .rollcall/ or .git/)
    #[arg(long, global = true, env = "ROLLCALL_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .rollcall/config.yaml
    Init,

    /// List TODO markers in code comments and markdown
    Scan {
        #[command(flatten)]
        flags: ScanFlags,

        /// Save the result to .rollcall/state.json for later --new-only runs
        #[arg(long)]
        save_state: bool,

        /// Only show markers that were not in the saved state
        #[arg(long)]
        new_only: bool,
    },

    /// Score each marker for how likely it is already done
    Analyze {
        #[command(flatten)]
        flags: ScanFlags,

        /// Drop markers scoring below this (0-100)
        #[arg(long)]
        min_confidence: Option<u32>,

        /// Use the last commit touching each file as evidence
        #[arg(long)]
        git: bool,

        /// Print a markdown report
        #[arg(long)]
        markdown: bool,
    },

    /// Check planning-document features against the code
    Detect {
        /// Planning document to check (repeatable; default: discover by config)
        #[arg(long = "plan")]
        plans: Vec<PathBuf>,

        /// Print a markdown report
        #[arg(long)]
        markdown: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    tracing::debug!(root = %root.display(), "resolved project root");

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Scan {
            flags,
            save_state,
            new_only,
        } => cmd::scan::run(&root, &flags, save_state, new_only, cli.json),
        Commands::Analyze {
            flags,
            min_confidence,
            git,
            markdown,
        } => cmd::analyze::run(&root, &flags, min_confidence, git, markdown, cli.json),
        Commands::Detect { plans, markdown } => {
            cmd::detect::run(&root, &plans, markdown, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
