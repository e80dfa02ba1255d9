//! CredentialStore trait for persisting opaque session credentials.
//!
//! The `FileCredentialStore` adapter lives in chatgate-infra.

use std::future::Future;

use chatgate_types::credential::CredentialSet;
use chatgate_types::error::CredentialError;

/// Persistence for the credential set of a session.
///
/// The session manager is the only caller: it loads at startup, saves on
/// every credential update, and clears on logout.
pub trait CredentialStore: Send + Sync + 'static {
    /// Load the stored set, or `None` when nothing is stored.
    fn load(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<CredentialSet>, CredentialError>> + Send;

    /// Replace the stored set.
    fn save(
        &self,
        session_id: &str,
        credentials: &CredentialSet,
    ) -> impl Future<Output = Result<(), CredentialError>> + Send;

    /// Remove everything stored for the session. Succeeds when nothing is stored.
    fn clear(&self, session_id: &str) -> impl Future<Output = Result<(), CredentialError>> + Send;
}
