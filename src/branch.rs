//! The `ugit branches` and `ugit switch` commands.

use anyhow::{Context, Result};
use std::path::Path;

use crate::vcs::GitCli;

/// Print every local and remote-tracking branch of the repository, with
/// a marker on the current one.
pub fn cmd_branches(repo: &Path) -> Result<()> {
    let git = GitCli::new();
    let branches = git
        .list_branches(repo)
        .with_context(|| format!("failed to list branches in {}", repo.display()))?;
    if branches.is_empty() {
        println!("no branches found");
        return Ok(());
    }
    for b in &branches {
        let marker = if b.is_current { " (current)" } else { "" };
        println!("- {}{marker}", b.name);
    }
    Ok(())
}

/// Check out `branch` in the repository.
pub fn cmd_switch(repo: &Path, branch: &str) -> Result<()> {
    let git = GitCli::new();
    let branches = git
        .list_branches(repo)
        .with_context(|| format!("failed to list branches in {}", repo.display()))?;
    if branches.iter().any(|b| b.is_current && b.name == branch) {
        println!("already on '{branch}'");
        return Ok(());
    }
    git.checkout(repo, branch)
        .with_context(|| format!("failed to switch to '{branch}'"))?;
    println!("switched to '{branch}'");
    Ok(())
}
