//! Config command handlers.

use anyhow::{Context, Result};
use codeai_core::config;

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn set_model(model: &str) -> Result<()> {
    let model = model.trim();
    if model.is_empty() {
        anyhow::bail!("Model name must not be empty");
    }
    config::Config::save_model(model).context("save model")?;
    println!("Model set to {model}");
    Ok(())
}
