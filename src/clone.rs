//! The `ugit clone` command: clone one repository, or a whole account.
//!
//! A plain repository URL is cloned into a directory named after the
//! repository. A hosting-service *user* URL (e.g. `https://github.com/u`)
//! fans out: the account's repositories are listed through the service
//! API and each one is cloned under `<username>/`, skipping those that
//! already exist and treating access-denied clones as skips.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::hosts::{self, HostKind};
use crate::progress::{err_style, ok_style, spinner_style};
use crate::vcs::{GatewayError, GitCli};

pub fn cmd_clone(url: &str, submodules: bool) -> Result<()> {
    match hosts::classify_user_url(url) {
        Some((kind, username)) => clone_account(kind, &username, submodules),
        None => clone_single(url, submodules),
    }
}

fn clone_single(url: &str, submodules: bool) -> Result<()> {
    let name = hosts::extract_repo_name(url);
    let dest = PathBuf::from(&name);
    if dest.exists() {
        bail!("destination '{}' already exists", name);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(format!("cloning {url}"));
    pb.enable_steady_tick(Duration::from_millis(80));

    let git = GitCli::new();
    match git.clone_repo(url, &dest, submodules) {
        Ok(()) => {
            pb.set_style(ok_style());
            pb.finish_with_message(format!("cloned into '{name}'"));
            Ok(())
        }
        Err(e) => {
            pb.set_style(err_style());
            pb.finish_with_message(format!("cloning {url} failed"));
            Err(e).with_context(|| format!("failed to clone {url}"))
        }
    }
}

fn clone_account(kind: HostKind, username: &str, submodules: bool) -> Result<()> {
    let api_base = match kind {
        HostKind::GitHub => hosts::GITHUB_API,
        HostKind::GitLab => hosts::GITLAB_API,
        HostKind::Bitbucket => hosts::BITBUCKET_API,
        other => bail!("automatic repository listing is not supported for {other:?}"),
    };

    println!("fetching repositories for {username}...");
    let client = hosts::api_client()?;
    let repos = hosts::list_user_repos(&client, kind, username, api_base)?;
    if repos.is_empty() {
        println!("no repositories found for {username}");
        return Ok(());
    }
    println!("found {} repositories", repos.len());

    let user_dir = Path::new(username);
    fs::create_dir_all(user_dir)
        .with_context(|| format!("failed to create directory '{username}'"))?;

    let git = GitCli::new();
    for url in &repos {
        let name = hosts::extract_repo_name(url);
        let dest = user_dir.join(&name);
        if dest.exists() {
            println!("{name} already exists, skipping");
            continue;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(spinner_style());
        pb.set_message(format!("cloning {name}"));
        pb.enable_steady_tick(Duration::from_millis(80));

        match git.clone_repo(url, &dest, submodules) {
            Ok(()) => {
                pb.set_style(ok_style());
                pb.finish_with_message(format!("cloned {name}"));
            }
            Err(GatewayError::Forbidden(_)) => {
                pb.set_style(err_style());
                pb.finish_with_message(format!(
                    "{name} {}",
                    "is forbidden, skipping".yellow()
                ));
            }
            Err(e) => {
                warn!(repo = %name, "clone failed: {e}");
                pb.set_style(err_style());
                pb.finish_with_message(format!("cloning {name} failed ({e})"));
            }
        }
    }

    println!("done cloning repositories for {username}");
    Ok(())
}
