//! Gateway configuration types.
//!
//! `GatewayConfig` represents the top-level `config.toml`. Every policy value
//! the session and dispatch layers use is an explicit field here; all fields
//! have defaults so an empty file (or no file) is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP listener port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP listener host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Key under which credentials are stored.
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Domain appended to bare phone-number targets.
    #[serde(default = "default_network_suffix")]
    pub network_suffix: String,

    /// Currency applied to catalog and invoice items that name none.
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Optional API key required on every `/api` route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub reconnect: ReconnectPolicy,

    #[serde(default)]
    pub dispatch: DispatchPolicy,

    #[serde(default)]
    pub bridge: BridgeConfig,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_session_id() -> String {
    "default".to_string()
}

fn default_network_suffix() -> String {
    "s.whatsapp.net".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            session_id: default_session_id(),
            network_suffix: default_network_suffix(),
            default_currency: default_currency(),
            api_key: None,
            reconnect: ReconnectPolicy::default(),
            dispatch: DispatchPolicy::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

/// Exponential backoff policy for transient disconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the reconnect that follows `attempt` prior attempts:
    /// `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Pacing and size limits for multi-item dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPolicy {
    #[serde(default = "default_bulk_interval_ms")]
    pub bulk_interval_ms: u64,
    #[serde(default = "default_album_interval_ms")]
    pub album_interval_ms: u64,
    #[serde(default = "default_album_max_items")]
    pub album_max_items: usize,
}

fn default_bulk_interval_ms() -> u64 {
    1_500
}

fn default_album_interval_ms() -> u64 {
    1_000
}

fn default_album_max_items() -> usize {
    10
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            bulk_interval_ms: default_bulk_interval_ms(),
            album_interval_ms: default_album_interval_ms(),
            album_max_items: default_album_max_items(),
        }
    }
}

/// Where the protocol bridge sidecar listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:8085".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
