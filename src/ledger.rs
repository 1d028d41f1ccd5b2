//! Summary ledger persistence.
//!
//! The ledger is a plain UTF-8 text file holding the summaries of past
//! runs, newest run first. Each persist call rewrites the whole file:
//! the new run's block goes on top and whatever was there before is
//! reattached underneath a separator line, so history is preserved by
//! prepending rather than appending. The rewrite goes through a named
//! temp file in the destination directory and a rename, so a crash never
//! leaves a half-written ledger behind.

use anyhow::{Context, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::engine::SummaryRecord;

const SEPARATOR_WIDTH: usize = 50;

/// Prepend the run's successful summaries to the ledger at `dest`.
///
/// `stamp` is the run timestamp written into the block header. Records
/// with `succeeded == false` are skipped; if none succeeded the file is
/// left untouched.
///
/// # Errors
/// Returns an error if the existing file cannot be read or the rewrite
/// fails.
pub fn persist(records: &[SummaryRecord], dest: &Path, stamp: &str) -> Result<()> {
    let valid: Vec<&SummaryRecord> = records.iter().filter(|r| r.succeeded).collect();
    if valid.is_empty() {
        warn!("no valid summaries to save");
        return Ok(());
    }

    let existing = match fs::read_to_string(dest) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read ledger: {}", dest.display()));
        }
    };

    let mut content = String::new();
    content.push_str(&format!("Date: {stamp}\n\n"));
    for rec in &valid {
        content.push_str(&format!("Directory: {}\n", rec.repository.display()));
        content.push_str(&format!("Branch: {}\n", rec.branch));
        content.push_str(&format!("{}\n\n", rec.summary));
    }
    if !existing.is_empty() {
        content.push_str(&"-".repeat(SEPARATOR_WIDTH));
        content.push_str("\n\n");
        content.push_str(&existing);
    }

    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).context("failed to create temp ledger file")?;
    tmp.write_all(content.as_bytes())
        .context("failed to write ledger")?;
    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace ledger: {}", dest.display()))?;

    info!(count = valid.len(), dest = %dest.display(), "saved summaries");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(dir: &str, branch: &str, summary: &str, succeeded: bool) -> SummaryRecord {
        SummaryRecord {
            repository: PathBuf::from(dir),
            branch: branch.to_string(),
            summary: summary.to_string(),
            succeeded,
        }
    }

    #[test]
    fn fresh_ledger_holds_only_the_new_run() {
        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("summaries.txt");
        let records = vec![
            record("/w/alpha", "main", "Fixed the widget.", true),
            record("/w/beta", "dev", "Added a knob.", true),
        ];

        persist(&records, &dest, "2026-08-06 10:00:00").unwrap();

        let got = fs::read_to_string(&dest).unwrap();
        let want = "Date: 2026-08-06 10:00:00\n\n\
            Directory: /w/alpha\nBranch: main\nFixed the widget.\n\n\
            Directory: /w/beta\nBranch: dev\nAdded a knob.\n\n";
        assert_eq!(got, want);
    }

    #[test]
    fn existing_content_is_reattached_below_a_separator() {
        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("summaries.txt");
        fs::write(&dest, "old content\n").unwrap();

        let records = vec![record("/w/alpha", "main", "New stuff.", true)];
        persist(&records, &dest, "2026-08-06 11:00:00").unwrap();

        let got = fs::read_to_string(&dest).unwrap();
        let want = format!(
            "Date: 2026-08-06 11:00:00\n\n\
             Directory: /w/alpha\nBranch: main\nNew stuff.\n\n\
             {}\n\nold content\n",
            "-".repeat(50)
        );
        assert_eq!(got, want);
    }

    #[test]
    fn newest_run_always_ends_up_on_top() {
        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("summaries.txt");

        persist(
            &[record("/w/a", "main", "First run.", true)],
            &dest,
            "2026-08-05 09:00:00",
        )
        .unwrap();
        persist(
            &[record("/w/b", "main", "Second run.", true)],
            &dest,
            "2026-08-06 09:00:00",
        )
        .unwrap();

        let got = fs::read_to_string(&dest).unwrap();
        let second = got.find("Second run.").unwrap();
        let first = got.find("First run.").unwrap();
        assert!(second < first);
        assert!(got.starts_with("Date: 2026-08-06 09:00:00\n"));
    }

    #[test]
    fn empty_record_set_leaves_file_untouched() {
        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("summaries.txt");
        fs::write(&dest, "keep me\n").unwrap();

        persist(&[], &dest, "2026-08-06 12:00:00").unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "keep me\n");
    }

    #[test]
    fn all_failed_records_leave_file_untouched() {
        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("summaries.txt");

        let records = vec![record("/w/a", "main", "timed out", false)];
        persist(&records, &dest, "2026-08-06 12:00:00").unwrap();

        assert!(!dest.exists());
    }

    #[test]
    fn failed_records_are_filtered_out_of_mixed_sets() {
        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("summaries.txt");

        let records = vec![
            record("/w/bad", "main", "timed out", false),
            record("/w/good", "main", "Useful summary.", true),
        ];
        persist(&records, &dest, "2026-08-06 12:00:00").unwrap();

        let got = fs::read_to_string(&dest).unwrap();
        assert!(got.contains("/w/good"));
        assert!(!got.contains("/w/bad"));
    }
}
