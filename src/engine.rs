//! Batched update engine.
//!
//! Walks every repository under a root directory and pulls it, detecting
//! whether the tip revision changed and, when enabled, asking the summary
//! backend to describe the new commits. One repository's failure never
//! aborts the run: every discovered repository ends with exactly one
//! [`UpdateOutcome`], and the caller receives the full set at the end.
//!
//! The engine itself never prints. User-facing progress flows through the
//! [`Observer`] callbacks; persistence of the collected summaries is the
//! caller's decision (see [`crate::ledger`]).

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::scan::{RepoRef, ScanWarning, find_repositories};
use crate::settings::Config;
use crate::summarize::{Summarizer, SummaryOutcome};
use crate::vcs::{Branch, GatewayError, Revision, Vcs};

/// Once more than this many summary generations have failed in a run,
/// summarization is switched off for the rest of the run.
const MAX_GENERATION_FAILURES: u32 = 3;

/// Terminal state of one repository within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Pull succeeded but the tip revision did not move.
    NoChange,
    /// Pull moved the tip; `commits` holds the one-line log for
    /// `old..new`, newest first.
    Updated {
        old: Revision,
        new: Revision,
        commits: Vec<String>,
    },
    /// Dry-run preview: these commits would be pulled.
    WouldUpdate { commits: Vec<String> },
    /// The remote refused access; the repository was skipped.
    Forbidden,
    /// Any other failure; the repository was skipped.
    Failed(String),
}

/// One repository's result.
#[derive(Debug, Clone)]
pub struct RepoReport {
    pub repo: RepoRef,
    /// Branch at the time of the snapshot; `None` when even the initial
    /// inspection failed.
    pub branch: Option<Branch>,
    pub outcome: UpdateOutcome,
}

/// Outcome of one summary generation, kept in discovery order.
///
/// Failed records stay in the run report for diagnostics but are never
/// persisted to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub repository: PathBuf,
    pub branch: String,
    pub summary: String,
    pub succeeded: bool,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunReport {
    pub repos: Vec<RepoReport>,
    pub summaries: Vec<SummaryRecord>,
    pub warnings: Vec<ScanWarning>,
}

/// Progress callbacks for a run. All methods default to no-ops so
/// implementors only write the hooks they care about.
pub trait Observer {
    fn repo_started(&mut self, _repo: &RepoRef) {}
    fn repo_finished(&mut self, _repo: &RepoRef, _branch: Option<&Branch>, _outcome: &UpdateOutcome) {
    }
    fn summary_started(&mut self, _repo: &RepoRef) {}
    fn summaries_disabled(&mut self) {}
    fn scan_warning(&mut self, _warning: &ScanWarning) {}
}

/// Observer that ignores everything.
pub struct NoOpObserver;

impl Observer for NoOpObserver {}

/// Mutable state scoped to a single run. The summary kill-switch lives
/// here, not in any global: once tripped it stays tripped until the run
/// ends.
struct RunState {
    summaries_enabled: bool,
    generation_failures: u32,
}

/// Orchestrates scan → pull → compare → summarize across a tree of
/// repositories.
pub struct UpdateEngine<'a, V: Vcs, S: Summarizer> {
    vcs: &'a V,
    summarizer: &'a S,
    cfg: Config,
}

impl<'a, V: Vcs, S: Summarizer> UpdateEngine<'a, V, S> {
    pub fn new(vcs: &'a V, summarizer: &'a S, cfg: Config) -> Self {
        Self {
            vcs,
            summarizer,
            cfg,
        }
    }

    /// Process every repository under `root`, in discovery order.
    pub fn run(&self, root: &Path, pull_submodules: bool, observer: &mut dyn Observer) -> RunReport {
        let (repos, warnings) = find_repositories(root);
        for w in &warnings {
            observer.scan_warning(w);
        }

        let mut state = RunState {
            summaries_enabled: self.cfg.enable_summary,
            generation_failures: 0,
        };
        let mut report = RunReport {
            repos: Vec::with_capacity(repos.len()),
            summaries: Vec::new(),
            warnings,
        };

        for repo in repos {
            observer.repo_started(&repo);
            let (branch, outcome) =
                self.process_repo(&repo, pull_submodules, &mut state, &mut report.summaries, observer);
            observer.repo_finished(&repo, branch.as_ref(), &outcome);
            report.repos.push(RepoReport {
                repo,
                branch,
                outcome,
            });
        }

        report
    }

    fn process_repo(
        &self,
        repo: &RepoRef,
        submodules: bool,
        state: &mut RunState,
        records: &mut Vec<SummaryRecord>,
        observer: &mut dyn Observer,
    ) -> (Option<Branch>, UpdateOutcome) {
        let path = repo.path.as_path();

        // Snapshot before mutating anything.
        let old = match self.vcs.current_revision(path) {
            Ok(rev) => rev,
            Err(e) => return (None, UpdateOutcome::Failed(e.to_string())),
        };
        let branch = match self.vcs.current_branch(path) {
            Ok(b) => b,
            Err(e) => return (None, UpdateOutcome::Failed(e.to_string())),
        };

        if self.cfg.dry_run {
            let outcome = self.preview(path, &old, &branch);
            return (Some(branch), outcome);
        }

        debug!(repo = %path.display(), "pulling updates");
        if let Err(e) = self.vcs.pull(path, submodules) {
            return match e {
                GatewayError::Forbidden(detail) => {
                    warn!(repo = %path.display(), detail = %detail, "repository is forbidden, skipping");
                    (Some(branch), UpdateOutcome::Forbidden)
                }
                other => (Some(branch), UpdateOutcome::Failed(other.to_string())),
            };
        }

        let new = match self.vcs.current_revision(path) {
            Ok(rev) => rev,
            Err(e) => return (Some(branch), UpdateOutcome::Failed(e.to_string())),
        };
        if old == new {
            debug!(repo = %path.display(), "no changes");
            return (Some(branch), UpdateOutcome::NoChange);
        }

        let commits = match self.vcs.commits_between(path, old.as_str(), new.as_str()) {
            Ok(commits) => commits,
            Err(e) => return (Some(branch), UpdateOutcome::Failed(e.to_string())),
        };

        if state.summaries_enabled && !commits.is_empty() {
            if state.generation_failures > MAX_GENERATION_FAILURES {
                warn!("multiple summary failures detected, disabling summaries for this run");
                state.summaries_enabled = false;
                observer.summaries_disabled();
            } else {
                info!(
                    repo = %path.display(),
                    branch = %branch,
                    count = commits.len(),
                    "summarizing new commits"
                );
                observer.summary_started(repo);
                let (summary, succeeded) = match self.summarizer.summarize(&commits.join("\n")) {
                    SummaryOutcome::Success(text) => (text, true),
                    SummaryOutcome::Failure(err) => {
                        state.generation_failures += 1;
                        (err.to_string(), false)
                    }
                };
                records.push(SummaryRecord {
                    repository: path.to_path_buf(),
                    branch: branch.name().to_string(),
                    summary,
                    succeeded,
                });
            }
        }

        (
            Some(branch),
            UpdateOutcome::Updated { old, new, commits },
        )
    }

    /// Dry-run path: fetch, then report what `old..origin/<branch>` holds
    /// without touching the working copy.
    fn preview(&self, path: &Path, old: &Revision, branch: &Branch) -> UpdateOutcome {
        if let Err(e) = self.vcs.fetch(path) {
            return UpdateOutcome::Failed(e.to_string());
        }
        let upstream = format!("origin/{}", branch.name());
        match self.vcs.commits_between(path, old.as_str(), &upstream) {
            Ok(commits) if commits.is_empty() => UpdateOutcome::NoChange,
            Ok(commits) => {
                info!(repo = %path.display(), branch = %branch, "would pull {} commits", commits.len());
                UpdateOutcome::WouldUpdate { commits }
            }
            Err(e) => UpdateOutcome::Failed(e.to_string()),
        }
    }
}
