//! Commit-summary generation.
//!
//! The [`Summarizer`] trait is the seam the update engine talks to; the
//! shipped implementation ([`Ollama`]) drives a local Ollama install as a
//! subprocess. Failures are values, not panics: callers receive a
//! [`SummaryOutcome`] and decide what to do with it.

mod ollama;

use thiserror::Error;

pub use ollama::Ollama;

/// Fixed text returned when there is nothing to summarize. Counts as a
/// success, not a failure.
pub const EMPTY_INPUT_SUMMARY: &str = "No commit messages to summarize.";

/// Terminal failure of a summary generation call, after retries.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service is not installed")]
    ServiceMissing,
    #[error("summary generation timed out")]
    Timeout,
    #[error("summary generation produced insufficient results")]
    InsufficientOutput,
    #[error("generation command failed: {0}")]
    CommandFailed(String),
    #[error("unexpected generation failure: {0}")]
    Unexpected(String),
}

/// Result of one summarization request.
#[derive(Debug)]
pub enum SummaryOutcome {
    Success(String),
    Failure(GenerationError),
}

impl SummaryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SummaryOutcome::Success(_))
    }
}

/// Produce a natural-language summary for a block of commit messages.
pub trait Summarizer {
    fn summarize(&self, commit_text: &str) -> SummaryOutcome;
}
