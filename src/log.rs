//! The `ugit log` command: save a repository's commit log to a file.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::vcs::GitCli;

const PREVIEW_LINES: usize = 10;

/// Write the full `git log` of the repository to `output` (default:
/// `<repo-name>_commit_log.txt` in the current directory) and print the
/// first few lines as a preview.
pub fn cmd_log(repo: &Path, output: Option<PathBuf>) -> Result<()> {
    let git = GitCli::new();
    let text = git
        .full_log(repo)
        .with_context(|| format!("failed to read log of {}", repo.display()))?;

    let name = repo
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repository".to_string());
    let dest = output.unwrap_or_else(|| PathBuf::from(format!("{name}_commit_log.txt")));

    fs::write(&dest, &text)
        .with_context(|| format!("failed to write commit log: {}", dest.display()))?;
    println!("commit log saved to '{}'", dest.display());

    for line in text.lines().take(PREVIEW_LINES) {
        println!("{line}");
    }
    Ok(())
}
