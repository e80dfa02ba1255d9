//! Opaque credential material for the chat session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A set of named, opaque credential blobs.
///
/// The gateway never interprets the bytes; it only merges partial updates
/// reported by the transport and hands the whole set back on reconnect.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    entries: BTreeMap<String, Vec<u8>>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(name.into(), data);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Overlay `update` onto this set; entries in `update` win.
    pub fn merge(&mut self, update: CredentialSet) {
        self.entries.extend(update.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl FromIterator<(String, Vec<u8>)> for CredentialSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// Credential bytes never appear in logs.
impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
