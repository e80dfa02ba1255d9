//! Application state wiring the session manager and messaging service.
//!
//! The core services are generic over transport/store/submitter traits;
//! AppState pins them to the bridge transport and file credential store.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use chatgate_core::composer::MessageComposer;
use chatgate_core::dispatch::DispatchQueue;
use chatgate_core::service::MessagingService;
use chatgate_core::session::{SessionManager, SessionSettings};
use chatgate_infra::bridge::BridgeConnector;
use chatgate_infra::credentials::FileCredentialStore;
use chatgate_types::config::GatewayConfig;

use crate::http::extractors::auth::hash_api_key;

/// Environment variable overriding `api_key` from the config file.
pub const API_KEY_ENV: &str = "CHATGATE_API_KEY";

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteSession = SessionManager<BridgeConnector, FileCredentialStore>;

pub type ConcreteMessagingService = MessagingService<ConcreteSession>;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub session: ConcreteSession,
    pub messaging: Arc<ConcreteMessagingService>,
    /// SHA-256 hex digest of the API key; `None` disables authentication.
    pub api_key_hash: Option<Arc<str>>,
}

impl AppState {
    /// Wire services for `config`. Must be called inside a Tokio runtime;
    /// the session starts Uninitialized.
    pub fn new(
        config: GatewayConfig,
        data_dir: PathBuf,
        api_key: Option<SecretString>,
    ) -> anyhow::Result<Self> {
        let connector = BridgeConnector::new(&config.bridge)?;
        let store = FileCredentialStore::new(data_dir);
        let session = SessionManager::spawn(
            connector,
            store,
            SessionSettings::new(config.session_id.clone(), config.reconnect.clone()),
        );

        let messaging = MessagingService::new(
            session.clone(),
            MessageComposer::new(config.network_suffix.clone())
                .with_default_currency(config.default_currency.clone()),
            DispatchQueue::new(config.dispatch.clone()),
        );

        let api_key_hash = api_key.map(|key| Arc::from(hash_api_key(key.expose_secret())));

        Ok(Self {
            session,
            messaging: Arc::new(messaging),
            api_key_hash,
        })
    }
}

/// The API key in effect: `CHATGATE_API_KEY` wins over the config file.
/// Blank values count as unset.
pub fn resolve_api_key(
    config: &GatewayConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    env(API_KEY_ENV)
        .or_else(|| config.api_key.clone())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .map(SecretString::from)
}
