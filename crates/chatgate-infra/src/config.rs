//! Gateway configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.chatgate/` in production)
//! and deserializes it into [`GatewayConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::Path;

use chatgate_types::config::GatewayConfig;

/// Environment variables consulted for the listen port, in priority order.
pub const PORT_ENV_VARS: [&str; 2] = ["PORT", "CHATGATE_PORT"];

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`GatewayConfig::default()`].
/// - Unreadable or unparsable file: a warning, then the default.
pub async fn load_gateway_config(data_dir: &Path) -> GatewayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
    };

    match toml::from_str::<GatewayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GatewayConfig::default()
        }
    }
}

/// Resolve the listen port.
///
/// Priority: CLI flag, then `PORT`, then `CHATGATE_PORT`, then the config
/// file value. Non-numeric environment values are ignored with a warning.
pub fn resolve_port(
    config: &GatewayConfig,
    cli_port: Option<u16>,
    env: impl Fn(&str) -> Option<String>,
) -> u16 {
    if let Some(port) = cli_port {
        return port;
    }
    for var in PORT_ENV_VARS {
        if let Some(value) = env(var) {
            match value.trim().parse::<u16>() {
                Ok(port) => return port,
                Err(_) => tracing::warn!("Ignoring non-numeric {var}={value}"),
            }
        }
    }
    config.port
}

/// Serialize a config back to TOML (used by `chatgate config`).
pub fn render_config(config: &GatewayConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}
