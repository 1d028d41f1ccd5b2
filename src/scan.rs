//! Repository discovery.
//!
//! Walks a directory tree and collects every git working copy found under
//! it, in depth-first order. The walk is driven by an explicit worklist
//! rather than recursion so the exclusion rules are applied in one place:
//!
//! - A directory containing a `.git` subdirectory is reported as a
//!   repository. Only the `.git` directory itself is pruned, so
//!   repositories nested inside another working copy are still found.
//! - Hidden directories (name starting with `.`) are never entered.
//! - Directory symlinks are never followed, so a link pointing back up the
//!   tree cannot produce a cycle.
//! - Unreadable directories are reported as warnings and skipped; their
//!   siblings are still scanned.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A directory known to contain a git working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub path: PathBuf,
}

/// A directory the scan could not enter.
#[derive(Debug, Clone)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub detail: String,
}

/// Collect every git repository under `root`, depth-first.
///
/// Entries within a directory are visited in name order so the discovery
/// order is stable. Returns the repositories together with any warnings
/// produced for unreadable subtrees.
pub fn find_repositories(root: &Path) -> (Vec<RepoRef>, Vec<ScanWarning>) {
    let mut repos = Vec::new();
    let mut warnings = Vec::new();
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        if dir.join(".git").is_dir() {
            debug!(repo = %dir.display(), "found git repository");
            repos.push(RepoRef { path: dir.clone() });
        }

        let rd = match fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                warn!(path = %dir.display(), "permission denied");
                warnings.push(ScanWarning {
                    path: dir,
                    detail: "permission denied".to_string(),
                });
                continue;
            }
            Err(e) => {
                warnings.push(ScanWarning {
                    path: dir,
                    detail: e.to_string(),
                });
                continue;
            }
        };

        let mut children: Vec<PathBuf> = Vec::new();
        for ent in rd {
            let ent = match ent {
                Ok(e) => e,
                Err(_) => continue,
            };
            let ft = match ent.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };
            // Symlinks are skipped outright; following them could loop.
            if !ft.is_dir() {
                continue;
            }
            let name = ent.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            children.push(ent.path());
        }

        children.sort();
        // Reverse push so the stack pops children in name order.
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }

    (repos, warnings)
}
