//! Version-control integration layer.
//!
//! This module wraps the external `git` executable behind a small typed
//! surface. The [`Vcs`] trait carries exactly the operations the update
//! engine needs, so tests can substitute a scripted double; [`GitCli`] is
//! the real backend that shells out with the working directory set to the
//! repository being operated on.

mod git_cli;

use std::fmt;
use std::path::Path;
use thiserror::Error;

pub use git_cli::{DENIAL_PATTERNS, GitCli, is_access_denied, parse_branches};

/// Opaque commit identifier. Comparable for equality only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(pub String);

impl Revision {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The checked-out branch of a working copy.
///
/// `git rev-parse --abbrev-ref HEAD` prints the literal `HEAD` when the
/// repository is in detached state; that case is carried as its own
/// variant instead of a magic string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    Named(String),
    Detached,
}

impl Branch {
    /// The name git itself would report: the branch name, or `HEAD` when
    /// detached.
    pub fn name(&self) -> &str {
        match self {
            Branch::Named(n) => n,
            Branch::Detached => "HEAD",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry from `git branch -a`, after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchEntry {
    pub name: String,
    pub is_current: bool,
}

/// Failure of a single git invocation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("not a git repository: {0}")]
    NotARepository(String),
    #[error("git executable not found on PATH")]
    ExecutableMissing,
    #[error("remote access forbidden: {0}")]
    Forbidden(String),
    #[error("git: {0}")]
    Other(String),
}

/// Operations the update engine performs against a working copy.
pub trait Vcs {
    fn current_revision(&self, repo: &Path) -> Result<Revision, GatewayError>;
    fn current_branch(&self, repo: &Path) -> Result<Branch, GatewayError>;
    fn fetch(&self, repo: &Path) -> Result<(), GatewayError>;
    fn pull(&self, repo: &Path, submodules: bool) -> Result<(), GatewayError>;
    /// One-line commit subjects for `from..to`, in the order git emits
    /// them (newest first).
    fn commits_between(&self, repo: &Path, from: &str, to: &str)
    -> Result<Vec<String>, GatewayError>;
}
