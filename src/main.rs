//! # ugit
//!
//! **ugit** is a universal multi-repository git manager.
//!
//! Features:
//! - `ugit pull` recursively finds every git working copy under a
//!   directory and pulls each one, optionally summarizing the new
//!   commits with a local Ollama model
//! - `ugit clone` clones a repository, or every repository of a hosting
//!   service user
//! - `ugit branches` / `ugit switch` inspect and change branches
//! - `ugit log` saves a repository's commit log to a file
//! - `ugit home` prints the ugit home directory
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use ugit::{PullOptions, cmd_branches, cmd_clone, cmd_log, cmd_pull, cmd_switch, ugit_home};

/// Command-line interface definition.
///
/// Parsed using `clap` derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "ugit",
    version,
    about = "ugit - universal multi-repository git manager",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Pull every repository found under a directory
    Pull {
        /// Root directory to scan
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Also update submodules (--recurse-submodules)
        #[arg(long)]
        submodules: bool,
        /// Preview pending commits without pulling
        #[arg(long)]
        dry_run: bool,
        /// File the run's commit summaries are prepended to
        #[arg(long, default_value = "git_summaries.txt")]
        summary_file: PathBuf,
    },
    /// Clone a repository, or every repository of a hosting-service user
    Clone {
        /// Repository URL, or a user/organization URL
        url: String,
        /// Clone with submodules (--recurse-submodules)
        #[arg(long)]
        submodules: bool,
    },
    /// List local and remote branches of a repository
    Branches {
        /// Path to the repository
        repo: PathBuf,
    },
    /// Check out a branch in a repository
    Switch {
        /// Path to the repository
        repo: PathBuf,
        /// Branch to check out
        branch: String,
    },
    /// Save a repository's commit log to a file
    Log {
        /// Path to the repository
        repo: PathBuf,
        /// Destination file (default: <repo-name>_commit_log.txt)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the ugit home directory
    Home,
}

/// CLI entry point.
fn main() -> Result<()> {
    // Diagnostics go to stderr so command output stays clean; RUST_LOG
    // controls the level, defaulting to warnings only.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Pull {
            root,
            submodules,
            dry_run,
            summary_file,
        } => cmd_pull(PullOptions {
            root,
            submodules,
            dry_run,
            summary_file,
        }),
        Cmd::Clone { url, submodules } => cmd_clone(&url, submodules),
        Cmd::Branches { repo } => cmd_branches(&repo),
        Cmd::Switch { repo, branch } => cmd_switch(&repo, &branch),
        Cmd::Log { repo, output } => cmd_log(&repo, output),
        Cmd::Home => {
            println!("{}", ugit_home()?.display());
            Ok(())
        }
    }
}
