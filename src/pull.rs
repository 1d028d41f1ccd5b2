//! The `ugit pull` command: batched updates across a tree.
//!
//! Thin glue over [`crate::engine`]: builds the real gateway and summary
//! backend from the loaded configuration, renders per-repository
//! progress with spinners while the engine runs, and persists the run's
//! summaries to the ledger file afterwards.

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar};
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::{Observer, UpdateEngine, UpdateOutcome};
use crate::ledger;
use crate::progress::{err_style, ok_style, spinner_style};
use crate::scan::{RepoRef, ScanWarning};
use crate::settings;
use crate::summarize::Ollama;
use crate::vcs::{Branch, GitCli};

/// Options of one `ugit pull` invocation.
pub struct PullOptions {
    /// Directory scanned for repositories.
    pub root: PathBuf,
    /// Pass `--recurse-submodules` to every pull.
    pub submodules: bool,
    /// Force dry-run regardless of the config file.
    pub dry_run: bool,
    /// Ledger file the run's summaries are prepended to.
    pub summary_file: PathBuf,
}

struct SpinnerObserver {
    mp: MultiProgress,
    current: Option<ProgressBar>,
}

impl SpinnerObserver {
    fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
            current: None,
        }
    }
}

impl Observer for SpinnerObserver {
    fn repo_started(&mut self, repo: &RepoRef) {
        let pb = self.mp.add(ProgressBar::new_spinner());
        pb.set_style(spinner_style());
        pb.set_message(format!("pulling {}", repo.path.display()));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.current = Some(pb);
    }

    fn summary_started(&mut self, repo: &RepoRef) {
        if let Some(pb) = &self.current {
            pb.set_message(format!("summarizing {}", repo.path.display()));
        }
    }

    fn repo_finished(&mut self, repo: &RepoRef, _branch: Option<&Branch>, outcome: &UpdateOutcome) {
        let Some(pb) = self.current.take() else {
            return;
        };
        let shown = repo.path.display();
        match outcome {
            UpdateOutcome::NoChange => {
                pb.set_style(ok_style());
                pb.finish_with_message(format!("no changes in {shown}"));
            }
            UpdateOutcome::Updated { commits, .. } => {
                pb.set_style(ok_style());
                pb.finish_with_message(format!("updated {shown} ({} new commits)", commits.len()));
            }
            UpdateOutcome::WouldUpdate { commits } => {
                pb.set_style(ok_style());
                pb.finish_with_message(format!(
                    "[dry run] would pull {} commits into {shown}",
                    commits.len()
                ));
                for line in commits {
                    let _ = self.mp.println(format!("    {line}"));
                }
            }
            UpdateOutcome::Forbidden => {
                pb.set_style(err_style());
                pb.finish_with_message(format!(
                    "{shown} {}",
                    "is forbidden, skipping".yellow()
                ));
            }
            UpdateOutcome::Failed(detail) => {
                pb.set_style(err_style());
                pb.finish_with_message(format!("{shown} ({})", detail.red()));
            }
        }
    }

    fn summaries_disabled(&mut self) {
        let _ = self.mp.println(
            "multiple summary failures detected, disabling summaries for this run"
                .yellow()
                .to_string(),
        );
    }

    fn scan_warning(&mut self, warning: &ScanWarning) {
        let _ = self.mp.println(format!(
            "{} skipping {}: {}",
            "warning:".yellow(),
            warning.path.display(),
            warning.detail
        ));
    }
}

/// Discover and pull every repository under `opts.root`.
///
/// # Errors
/// Returns an error when the configuration cannot be loaded or the
/// ledger cannot be written. Per-repository failures are reported inline
/// and never abort the run.
pub fn cmd_pull(opts: PullOptions) -> Result<()> {
    let mut cfg = settings::load_or_init()?;
    if opts.dry_run {
        cfg.dry_run = true;
    }
    let dry_run = cfg.dry_run;
    let summaries_enabled = cfg.enable_summary;

    let git = GitCli::new();
    let ollama = Ollama::new(
        cfg.model.clone(),
        cfg.max_retries,
        Duration::from_secs(cfg.summary_timeout),
    );
    let engine = UpdateEngine::new(&git, &ollama, cfg);

    let mut observer = SpinnerObserver::new();
    let report = engine.run(&opts.root, opts.submodules, &mut observer);

    if report.repos.is_empty() {
        println!("no repositories found under {}", opts.root.display());
        return Ok(());
    }

    if summaries_enabled && !dry_run && report.summaries.iter().any(|r| r.succeeded) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        ledger::persist(&report.summaries, &opts.summary_file, &stamp)?;
        println!("Summaries saved to {}", opts.summary_file.display());
    }

    let failed = report
        .repos
        .iter()
        .filter(|r| matches!(r.outcome, UpdateOutcome::Failed(_)))
        .count();
    if failed > 0 {
        println!("{failed} of {} repositories failed", report.repos.len());
    }

    Ok(())
}
