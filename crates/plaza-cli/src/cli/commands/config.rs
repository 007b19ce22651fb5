//! Config command handlers.

use anyhow::{Context, Result};
use plaza_core::config::{BASE_URL_ENV, Config, paths};

pub fn path() {
    println!("{}", paths::config_path().display());
}

pub fn init() -> Result<()> {
    let path = paths::config_path();
    Config::init(&path).with_context(|| format!("init config at {}", path.display()))?;
    println!("Created config at {}", path.display());
    println!("Set base_url there (or {BASE_URL_ENV}) to point at your server.");
    Ok(())
}
