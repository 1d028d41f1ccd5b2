//! Crate entry point for **ugit**.
//!
//! This library provides the internal implementation for the `ugit` CLI.
//! Each submodule encapsulates one responsibility: repository discovery
//! (`scan`), the git subprocess gateway (`vcs`), commit summarization
//! (`summarize`), the batched update engine (`engine`), summary
//! persistence (`ledger`), hosting-service APIs (`hosts`), and the
//! command glue on top.
//!
//! The `pub use` re-exports make the commands and the main engine types
//! accessible directly from the crate root.

pub mod engine;
pub mod hosts;
pub mod ledger;
pub mod paths;
pub mod scan;
pub mod settings;
pub mod summarize;
pub mod vcs;

mod branch;
mod clone;
mod log;
mod progress;
mod pull;

/// Re-export commonly used types and commands so they can be accessed
/// from `ugit::*`.
pub use branch::{cmd_branches, cmd_switch};
pub use clone::cmd_clone;
pub use engine::{NoOpObserver, Observer, RunReport, UpdateEngine, UpdateOutcome};
pub use log::cmd_log;
pub use paths::ugit_home;
pub use pull::{PullOptions, cmd_pull};
pub use settings::Config;
