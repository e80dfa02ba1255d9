//! Offline session commands: `chatgate status` and `chatgate logout`.
//!
//! Both work on the credential store directly and never contact the bridge.

use std::path::Path;

use anyhow::Result;
use console::style;

use chatgate_core::credential::CredentialStore;
use chatgate_infra::credentials::FileCredentialStore;
use chatgate_infra::filesystem::session_dir;
use chatgate_types::config::GatewayConfig;

/// Show whether credentials are stored for the configured session.
pub async fn status(config: &GatewayConfig, data_dir: &Path, json: bool) -> Result<()> {
    let store = FileCredentialStore::new(data_dir.to_path_buf());
    let stored = store.load(&config.session_id).await?;
    let entries = stored.as_ref().map_or(0, |set| set.len());

    if json {
        let out = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": data_dir.display().to_string(),
            "session_id": config.session_id,
            "has_credentials": stored.is_some(),
            "credential_entries": entries,
            "bridge_url": config.bridge.base_url,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} chatgate v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("  Session      {}", style(&config.session_id).cyan());
    println!(
        "  Credentials  {}",
        if stored.is_some() {
            style(format!("{entries} entries (resumes without login)")).green()
        } else {
            style("none (QR or pairing code required)".to_string()).yellow()
        }
    );
    println!(
        "  Location     {}",
        style(session_dir(data_dir, &config.session_id).display()).dim()
    );
    println!("  Bridge       {}", config.bridge.base_url);
    println!();
    Ok(())
}

/// Remove the stored credentials for the configured session.
pub async fn logout(config: &GatewayConfig, data_dir: &Path, json: bool) -> Result<()> {
    let store = FileCredentialStore::new(data_dir.to_path_buf());
    let had_credentials = store.load(&config.session_id).await?.is_some();
    store.clear(&config.session_id).await?;

    if json {
        let out = serde_json::json!({
            "session_id": config.session_id,
            "had_credentials": had_credentials,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if had_credentials {
        println!(
            "  {} Stored credentials for '{}' removed.",
            style("✓").green(),
            config.session_id
        );
    } else {
        println!(
            "  {} No stored credentials for '{}'.",
            style("i").blue().bold(),
            config.session_id
        );
    }
    Ok(())
}
