//! `chatgate config`: print the effective configuration.

use std::path::Path;

use anyhow::Result;
use console::style;

use chatgate_infra::config::render_config;
use chatgate_infra::filesystem::config_path;
use chatgate_types::config::GatewayConfig;

const MASK: &str = "********";

/// The config with the API key replaced by a mask, safe to print.
pub fn masked(config: &GatewayConfig) -> GatewayConfig {
    GatewayConfig {
        api_key: config.api_key.as_ref().map(|_| MASK.to_string()),
        ..config.clone()
    }
}

pub fn show_config(config: &GatewayConfig, data_dir: &Path, json: bool) -> Result<()> {
    let config = masked(config);

    if json {
        let out = serde_json::json!({
            "data_dir": data_dir.display().to_string(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let path = config_path(data_dir);
    let source = if path.exists() { "" } else { " (not found, defaults)" };
    println!();
    println!(
        "  {} {}{}",
        style("#").dim(),
        style(path.display()).cyan(),
        style(source).dim()
    );
    println!();
    for line in render_config(&config)?.lines() {
        println!("  {line}");
    }
    println!();
    Ok(())
}
