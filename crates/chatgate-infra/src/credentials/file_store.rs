//! Filesystem-backed credential store.
//!
//! Each credential blob is one file under `{data_dir}/sessions/{id}/`.
//! Writes go to a dot-prefixed temp file and are renamed into place, so a
//! crash mid-save never leaves a truncated blob behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chatgate_core::credential::CredentialStore;
use chatgate_types::credential::CredentialSet;
use chatgate_types::error::CredentialError;

use crate::filesystem::session_dir;

pub struct FileCredentialStore {
    data_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn dir(&self, session_id: &str) -> Result<PathBuf, CredentialError> {
        validate_name(session_id)?;
        Ok(session_dir(&self.data_dir, session_id))
    }
}

/// Names become file names: no separators, no traversal, no leading dot.
fn validate_name(name: &str) -> Result<(), CredentialError> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.len() > 255;
    if bad {
        return Err(CredentialError::InvalidName(name.to_string()));
    }
    Ok(())
}

async fn write_atomic(dir: &Path, name: &str, data: &[u8]) -> Result<(), CredentialError> {
    let tmp = dir.join(format!(".{name}.tmp"));
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, dir.join(name)).await?;
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    async fn load(&self, session_id: &str) -> Result<Option<CredentialSet>, CredentialError> {
        let dir = self.dir(session_id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut set = CredentialSet::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let data = tokio::fs::read(entry.path()).await?;
            set.insert(name, data);
        }

        tracing::debug!(session_id, entries = set.len(), "loaded stored credentials");
        Ok((!set.is_empty()).then_some(set))
    }

    async fn save(&self, session_id: &str, credentials: &CredentialSet) -> Result<(), CredentialError> {
        let dir = self.dir(session_id)?;
        for (name, _) in credentials.iter() {
            validate_name(name)?;
        }
        tokio::fs::create_dir_all(&dir).await?;

        for (name, data) in credentials.iter() {
            write_atomic(&dir, name, data).await?;
        }

        // Drop blobs that are no longer part of the set.
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let stale = match file_name.to_str() {
                Some(name) => credentials.get(name).is_none(),
                None => true,
            };
            if stale && entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), CredentialError> {
        let dir = self.dir(session_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::info!(session_id, "cleared stored credentials");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn set(pairs: &[(&str, &[u8])]) -> CredentialSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn load_missing_session_returns_none() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        assert!(store.load("default").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_set() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let creds = set(&[("creds.json", b"{\"me\":1}"), ("pre-key-1", &[0, 1, 2, 255])]);

        store.save("default", &creds).await.unwrap();

        assert_eq!(store.load("default").await.unwrap(), Some(creds));
        assert!(dir.path().join("sessions/default/creds.json").exists());
    }

    #[tokio::test]
    async fn save_replaces_previous_set() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        store
            .save("default", &set(&[("a", b"1"), ("b", b"2")]))
            .await
            .unwrap();

        store.save("default", &set(&[("b", b"3")])).await.unwrap();

        let loaded = store.load("default").await.unwrap().unwrap();
        assert_eq!(loaded, set(&[("b", b"3")]));
        assert!(!dir.path().join("sessions/default/a").exists());
    }

    #[tokio::test]
    async fn leftover_temp_files_are_ignored() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        store.save("default", &set(&[("a", b"1")])).await.unwrap();
        tokio::fs::write(dir.path().join("sessions/default/.b.tmp"), b"partial")
            .await
            .unwrap();

        let loaded = store.load("default").await.unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        store.save("default", &set(&[("a", b"1")])).await.unwrap();

        store.clear("default").await.unwrap();
        store.clear("default").await.unwrap();

        assert!(store.load("default").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());

        assert!(matches!(
            store.load("../etc").await,
            Err(CredentialError::InvalidName(_))
        ));
        assert!(matches!(
            store.save("default", &set(&[("../x", b"1")])).await,
            Err(CredentialError::InvalidName(_))
        ));
        assert!(matches!(
            store.save("default", &set(&[(".hidden", b"1")])).await,
            Err(CredentialError::InvalidName(_))
        ));
    }
}
