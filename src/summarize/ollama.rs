use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use super::{EMPTY_INPUT_SUMMARY, GenerationError, SummaryOutcome, Summarizer};

/// Fixed timeout for the liveness probe (`ollama list`).
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause between generation attempts.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Anything shorter than this is treated as a failed generation.
const MIN_SUMMARY_CHARS: usize = 10;
/// Summaries longer than this are cut down and marked with an ellipsis.
const MAX_SUMMARY_CHARS: usize = 1000;

const PROMPT_PREAMBLE: &str = "Summarize these git commits:";
const PROMPT_CLOSING: &str = "Provide a concise summary of the changes.";

/// Summary backend driving `ollama run <model>` with the prompt on stdin.
///
/// Each attempt first probes the service with `ollama list`; a missing or
/// unreachable install fails the whole call immediately, while a timeout
/// or nonzero exit of the generation run is retried up to `max_retries`
/// times with a short pause in between.
pub struct Ollama {
    program: PathBuf,
    model: String,
    max_retries: u32,
    run_timeout: Duration,
    retry_delay: Duration,
}

impl Ollama {
    pub fn new(model: impl Into<String>, max_retries: u32, run_timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("ollama"),
            model: model.into(),
            max_retries,
            run_timeout,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Use an alternative executable. Intended for tests.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Override the pause between attempts. Intended for tests.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn probe(&self) -> Result<(), GenerationError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("list")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match run_with_timeout(cmd, None, PROBE_TIMEOUT) {
            Ok(Wait::Completed { status, .. }) if status.success() => Ok(()),
            Ok(_) => Err(GenerationError::ServiceMissing),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(GenerationError::ServiceMissing),
            Err(e) => Err(GenerationError::Unexpected(e.to_string())),
        }
    }

    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        match run_with_timeout(cmd, Some(prompt), self.run_timeout) {
            Ok(Wait::Completed { status, stdout, stderr }) => {
                if status.success() {
                    Ok(stdout.trim().to_string())
                } else {
                    Err(GenerationError::CommandFailed(stderr.trim().to_string()))
                }
            }
            Ok(Wait::TimedOut) => Err(GenerationError::Timeout),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(GenerationError::ServiceMissing),
            Err(e) => Err(GenerationError::Unexpected(e.to_string())),
        }
    }
}

impl Summarizer for Ollama {
    fn summarize(&self, commit_text: &str) -> SummaryOutcome {
        if commit_text.trim().is_empty() {
            return SummaryOutcome::Success(EMPTY_INPUT_SUMMARY.to_string());
        }

        let prompt = format!("{PROMPT_PREAMBLE}\n{commit_text}\n{PROMPT_CLOSING}");
        debug!(chars = prompt.len(), "sending prompt to ollama");

        let mut attempt: u32 = 0;
        loop {
            if let Err(e) = self.probe() {
                // A missing service will not come back between retries.
                error!("ollama is not reachable: {e}");
                return SummaryOutcome::Failure(e);
            }

            let failure = match self.generate(&prompt) {
                Ok(summary) => {
                    let len = summary.chars().count();
                    if len < MIN_SUMMARY_CHARS {
                        warn!(len, "ollama returned an unusually short summary");
                        GenerationError::InsufficientOutput
                    } else if len > MAX_SUMMARY_CHARS {
                        warn!(len, "truncating long summary");
                        let mut cut: String = summary.chars().take(MAX_SUMMARY_CHARS - 3).collect();
                        cut.push_str("...");
                        return SummaryOutcome::Success(cut);
                    } else {
                        return SummaryOutcome::Success(summary);
                    }
                }
                Err(e @ GenerationError::ServiceMissing) => {
                    error!("ollama is not installed");
                    return SummaryOutcome::Failure(e);
                }
                Err(e) => {
                    error!(attempt, "ollama generation failed: {e}");
                    e
                }
            };

            if attempt < self.max_retries {
                attempt += 1;
                debug!(attempt, max = self.max_retries, "retrying summary generation");
                thread::sleep(self.retry_delay);
            } else {
                return SummaryOutcome::Failure(failure);
            }
        }
    }
}

enum Wait {
    Completed {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

/// Run a command to completion or until `timeout` elapses, feeding
/// `input` to stdin and draining stdout/stderr on reader threads so a
/// chatty child cannot block on a full pipe. A timed-out child is killed.
fn run_with_timeout(
    mut cmd: Command,
    input: Option<&str>,
    timeout: Duration,
) -> std::io::Result<Wait> {
    let mut child = cmd.spawn()?;

    if let (Some(text), Some(mut stdin)) = (input, child.stdin.take()) {
        let text = text.to_string();
        thread::spawn(move || {
            let _ = stdin.write_all(text.as_bytes());
        });
    }

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_reader = thread::spawn(move || drain(stdout));
    let err_reader = thread::spawn(move || drain_err(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(Wait::TimedOut);
            }
            None => thread::sleep(Duration::from_millis(50)),
        }
    };

    let stdout = out_reader.join().unwrap_or_default();
    let stderr = err_reader.join().unwrap_or_default();
    Ok(Wait::Completed {
        status,
        stdout,
        stderr,
    })
}

fn drain(stream: Option<ChildStdout>) -> String {
    let mut buf = Vec::new();
    if let Some(mut s) = stream {
        let _ = s.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn drain_err(stream: Option<ChildStderr>) -> String {
    let mut buf = Vec::new();
    if let Some(mut s) = stream {
        let _ = s.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
