use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use super::{Branch, BranchEntry, GatewayError, Revision, Vcs};

/// Substrings that mark a remote error as an access denial.
///
/// Matched case-insensitively against the raw stderr of the failed
/// command. The underlying tool does not expose structured error codes,
/// so text matching is the only reliable classification.
pub const DENIAL_PATTERNS: &[&str] = &["403", "forbidden", "permission denied"];

/// Whether `text` looks like an access-denial error.
pub fn is_access_denied(text: &str) -> bool {
    let lowered = text.to_lowercase();
    DENIAL_PATTERNS.iter().any(|p| lowered.contains(p))
}

fn classify_failure(stderr: String) -> GatewayError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("not a git repository") {
        GatewayError::NotARepository(stderr)
    } else if is_access_denied(&stderr) {
        GatewayError::Forbidden(stderr)
    } else {
        GatewayError::Other(stderr)
    }
}

/// Parse the output of `git branch -a`.
///
/// - The `* ` marker flags the current branch.
/// - The symbolic `remotes/<remote>/HEAD -> ...` pointer is dropped.
/// - Remote-tracking entries lose their `remotes/<remote>/` prefix, and a
///   remote name already present as a local branch is not repeated
///   (local wins).
pub fn parse_branches(raw: &str) -> Vec<BranchEntry> {
    let mut out: Vec<BranchEntry> = Vec::new();
    for line in raw.lines() {
        let entry = line.trim();
        if entry.is_empty() {
            continue;
        }
        if let Some(name) = entry.strip_prefix("* ") {
            out.push(BranchEntry {
                name: name.to_string(),
                is_current: true,
            });
        } else if let Some(rest) = entry.strip_prefix("remotes/") {
            if rest.contains("HEAD ->") {
                continue;
            }
            let name = rest.splitn(2, '/').nth(1).unwrap_or(rest);
            if !out.iter().any(|b| b.name == name) {
                out.push(BranchEntry {
                    name: name.to_string(),
                    is_current: false,
                });
            }
        } else {
            out.push(BranchEntry {
                name: entry.to_string(),
                is_current: false,
            });
        }
    }
    out
}

/// Backend that invokes the `git` executable as a subprocess.
///
/// Every operation runs with the working directory set to the repository
/// path and captures stdout/stderr; a nonzero exit is classified into a
/// [`GatewayError`] from the raw stderr text. Git operations carry no
/// timeout of their own.
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    /// Use an alternative executable. Intended for tests.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String, GatewayError> {
        debug!(cwd = %cwd.display(), ?args, "running git");
        let output = Command::new(&self.program)
            .current_dir(cwd)
            .args(args)
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    GatewayError::ExecutableMissing
                } else {
                    GatewayError::Other(e.to_string())
                }
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// All branches of the repository with a current marker.
    pub fn list_branches(&self, repo: &Path) -> Result<Vec<BranchEntry>, GatewayError> {
        let raw = self.run(repo, &["branch", "-a"])?;
        Ok(parse_branches(&raw))
    }

    /// Check out a branch, tag, or revision.
    pub fn checkout(&self, repo: &Path, rev: &str) -> Result<(), GatewayError> {
        self.run(repo, &["checkout", rev]).map(|_| ())
    }

    /// Clone `url` into `dest`. Runs in the current directory rather than
    /// inside an existing working copy.
    pub fn clone_repo(&self, url: &str, dest: &Path, submodules: bool) -> Result<(), GatewayError> {
        let dest = dest.to_string_lossy().into_owned();
        let mut args = vec!["clone"];
        if submodules {
            args.push("--recurse-submodules");
        }
        args.push(url);
        args.push(&dest);
        self.run(Path::new("."), &args).map(|_| ())
    }

    /// Full `git log` output for the repository.
    pub fn full_log(&self, repo: &Path) -> Result<String, GatewayError> {
        self.run(repo, &["log"])
    }
}

impl Vcs for GitCli {
    fn current_revision(&self, repo: &Path) -> Result<Revision, GatewayError> {
        let out = self.run(repo, &["rev-parse", "HEAD"])?;
        Ok(Revision(out.trim().to_string()))
    }

    fn current_branch(&self, repo: &Path) -> Result<Branch, GatewayError> {
        let out = self.run(repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim();
        if name == "HEAD" {
            Ok(Branch::Detached)
        } else {
            Ok(Branch::Named(name.to_string()))
        }
    }

    fn fetch(&self, repo: &Path) -> Result<(), GatewayError> {
        self.run(repo, &["fetch"]).map(|_| ())
    }

    fn pull(&self, repo: &Path, submodules: bool) -> Result<(), GatewayError> {
        let mut args = vec!["pull"];
        if submodules {
            args.push("--recurse-submodules");
        }
        self.run(repo, &args).map(|_| ())
    }

    fn commits_between(
        &self,
        repo: &Path,
        from: &str,
        to: &str,
    ) -> Result<Vec<String>, GatewayError> {
        let range = format!("{from}..{to}");
        let out = self.run(repo, &["log", &range, "--oneline"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_patterns_match_case_insensitively() {
        assert!(is_access_denied("The requested URL returned error: 403"));
        assert!(is_access_denied("remote: FORBIDDEN"));
        assert!(is_access_denied("git@host: Permission denied (publickey)."));
        assert!(!is_access_denied("fatal: could not read from remote"));
    }

    #[test]
    fn failures_are_classified_from_stderr() {
        match classify_failure("fatal: not a git repository (or any parent)".into()) {
            GatewayError::NotARepository(_) => {}
            other => panic!("unexpected: {other:?}"),
        }
        match classify_failure("remote: HTTP 403".into()) {
            GatewayError::Forbidden(_) => {}
            other => panic!("unexpected: {other:?}"),
        }
        match classify_failure("fatal: unable to access host".into()) {
            GatewayError::Other(_) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn branch_parse_handles_current_remote_and_head_pointer() {
        let raw = "\
  develop
* main
  remotes/origin/HEAD -> origin/main
  remotes/origin/develop
  remotes/origin/feature/login
";
        let got = parse_branches(raw);
        assert_eq!(
            got,
            vec![
                BranchEntry {
                    name: "develop".into(),
                    is_current: false
                },
                BranchEntry {
                    name: "main".into(),
                    is_current: true
                },
                BranchEntry {
                    name: "feature/login".into(),
                    is_current: false
                },
            ]
        );
    }

    #[cfg(unix)]
    mod fake_git {
        use super::super::*;
        use std::fs;

        /// Drop a `git` stand-in script into a temp dir.
        fn script(body: &str) -> (tempfile::TempDir, GitCli) {
            use std::os::unix::fs::PermissionsExt;
            let td = tempfile::tempdir().unwrap();
            let path = td.path().join("fake-git");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            let git = GitCli::with_program(&path);
            (td, git)
        }

        #[test]
        fn revision_and_branch_are_trimmed() {
            let (td, git) = script(
                r#"if [ "$2" = "--abbrev-ref" ]; then echo "main"; else echo "abc123"; fi"#,
            );
            let rev = git.current_revision(td.path()).unwrap();
            assert_eq!(rev.as_str(), "abc123");
            let branch = git.current_branch(td.path()).unwrap();
            assert_eq!(branch, Branch::Named("main".into()));
        }

        #[test]
        fn detached_head_is_its_own_variant() {
            let (td, git) = script(r#"echo "HEAD""#);
            let branch = git.current_branch(td.path()).unwrap();
            assert_eq!(branch, Branch::Detached);
            assert_eq!(branch.name(), "HEAD");
        }

        #[test]
        fn forbidden_pull_is_classified() {
            let (td, git) = script(r#"echo "remote: HTTP 403 Forbidden" >&2; exit 1"#);
            match git.pull(td.path(), false) {
                Err(GatewayError::Forbidden(_)) => {}
                other => panic!("unexpected: {other:?}"),
            }
        }

        #[test]
        fn commit_log_lines_keep_git_ordering() {
            let (td, git) = script("printf 'c3 third change\\nc2 second change\\n'");
            let commits = git.commits_between(td.path(), "a", "c").unwrap();
            assert_eq!(commits, vec!["c3 third change", "c2 second change"]);
        }

        #[test]
        fn missing_executable_maps_to_executable_missing() {
            let td = tempfile::tempdir().unwrap();
            let git = GitCli::with_program(td.path().join("no-such-binary"));
            match git.fetch(td.path()) {
                Err(GatewayError::ExecutableMissing) => {}
                other => panic!("unexpected: {other:?}"),
            }
        }
    }
}
