use anyhow::Result;
use std::{env, path::PathBuf};

pub fn ugit_home() -> Result<PathBuf> {
    let xdg = env::var_os("XDG_CONFIG_HOME");
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    Ok(base.join(".ugit"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ugit_home()?.join("config.toml"))
}
