//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use shelf_core::{CodecKind, Config};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "busy_timeout_ms": config.busy_timeout_ms,
                    "codec": config.codec,
                    "log_level": config.log_level,
                    "catalog": config.catalog_path(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:        {}", config.data_dir.display());
            println!("  busy_timeout_ms: {}", config.busy_timeout_ms);
            println!("  codec:           {}", config.codec);
            println!(
                "  log_level:       {}",
                config.log_level.as_deref().unwrap_or("(not set)")
            );
            println!();
            println!("Catalog:     {}", config.catalog_path().display());
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value and write the config file
pub fn set(config_path: Option<&PathBuf>, key: String, value: String, output: &Output) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = PathBuf::from(value);
        }
        "busy_timeout_ms" => {
            config.busy_timeout_ms = value
                .parse()
                .with_context(|| format!("Invalid busy_timeout_ms: {}", value))?;
        }
        "codec" => {
            config.codec = value.parse::<CodecKind>()?;
        }
        "log_level" => {
            config.log_level = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        _ => bail!(
            "Unknown config key: {}. Valid keys: data_dir, busy_timeout_ms, codec, log_level",
            key
        ),
    }
    Ok(())
}
