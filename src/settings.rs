use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::paths::config_path;

/// Top-level configuration structure loaded from `config.toml`.
///
/// Every key is optional in the file; missing keys fall back to the
/// defaults below, and unknown keys are ignored.
///
/// Example TOML:
/// ```toml
/// enable_summary  = true
/// dry_run         = false
/// model           = "llama3.2"
/// max_retries     = 2
/// summary_timeout = 30
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generate a natural-language summary for each updated repository.
    #[serde(default)]
    pub enable_summary: bool,
    /// Preview pending commits without mutating any working copy.
    #[serde(default)]
    pub dry_run: bool,
    /// Model name handed to the generation service.
    #[serde(default = "default_model")]
    pub model: String,
    /// Additional summary attempts after the first one fails.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Seconds a single summary generation may run before being killed.
    #[serde(default = "default_summary_timeout")]
    pub summary_timeout: u64,
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_summary_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_summary: false,
            dry_run: false,
            model: default_model(),
            max_retries: default_max_retries(),
            summary_timeout: default_summary_timeout(),
        }
    }
}

/// Load `config.toml` from the ugit home, writing the defaults first if the
/// file does not exist yet.
///
/// # Errors
/// - Returns an error if the file exists but cannot be read or parsed.
/// - Returns an error if the default file cannot be written.
pub fn load_or_init() -> Result<Config> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Same as [`load_or_init`], but against an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let txt = toml::to_string_pretty(&cfg).context("failed to serialize default config")?;
        fs::write(path, txt)
            .with_context(|| format!("failed to write default config: {}", path.display()))?;
        debug!(path = %path.display(), "wrote default config");
        return Ok(cfg);
    }

    let txt = fs::read_to_string(path)
        .with_context(|| format!("config not found: {}", path.display()))?;
    let cfg: Config = toml::from_str(&txt).context("failed to parse config.toml")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert!(!cfg.enable_summary);
        assert!(!cfg.dry_run);
        assert_eq!(cfg.model, "llama3.2");
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.summary_timeout, 30);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: Config = toml::from_str("enable_summary = true\nmodel = \"mistral\"").unwrap();
        assert!(cfg.enable_summary);
        assert_eq!(cfg.model, "mistral");
        assert_eq!(cfg.max_retries, 2);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let cfg: Config = toml::from_str("log_level = \"INFO\"").unwrap();
        assert_eq!(cfg.model, "llama3.2");
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert!(!cfg.enable_summary);
        assert!(path.is_file());

        // A second load reads the file it just wrote.
        let again = load_or_init_at(&path).unwrap();
        assert_eq!(again.model, cfg.model);
    }

    #[test]
    fn existing_file_is_parsed() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("config.toml");
        fs::write(&path, "dry_run = true\nsummary_timeout = 5").unwrap();
        let cfg = load_or_init_at(&path).unwrap();
        assert!(cfg.dry_run);
        assert_eq!(cfg.summary_timeout, 5);
    }
}
