//! Authorized-contact store.
//!
//! The in-memory set is authoritative for the running process. Every mutation
//! rewrites the whole record (temp file + rename), so a crash loses at most the
//! last mutation. Persistence failures are logged and never roll back memory.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use crate::{domain::ContactId, Result};

#[derive(Debug)]
pub struct ContactStore {
    path: PathBuf,
    contacts: BTreeSet<ContactId>,
}

impl ContactStore {
    /// Load the persisted record.
    ///
    /// - missing record: seed `defaults` and persist them
    /// - unreadable/corrupt record: use `defaults` in memory, leave the file alone
    pub fn load(path: impl Into<PathBuf>, defaults: &[String]) -> Self {
        let path = path.into();
        let seed: BTreeSet<ContactId> = defaults
            .iter()
            .filter_map(|raw| ContactId::normalize(raw))
            .collect();

        if !path.exists() {
            let store = Self {
                path,
                contacts: seed,
            };
            if let Err(e) = store.persist() {
                tracing::warn!(path = %store.path.display(), "failed to persist seeded contacts: {e}");
            }
            tracing::info!(count = store.contacts.len(), "seeded authorized contacts");
            return store;
        }

        match read_record(&path) {
            Ok(contacts) => {
                tracing::info!(count = contacts.len(), "loaded authorized contacts");
                Self { path, contacts }
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    "failed to load contacts, falling back to defaults: {e}"
                );
                Self {
                    path,
                    contacts: seed,
                }
            }
        }
    }

    pub fn is_authorized(&self, raw: &str) -> bool {
        ContactId::normalize(raw)
            .map(|id| self.contacts.contains(&id))
            .unwrap_or(false)
    }

    /// Insert (idempotent) and persist. `None` only when `raw` has no digits.
    pub fn authorize(&mut self, raw: &str) -> Option<ContactId> {
        let id = ContactId::normalize(raw)?;
        self.contacts.insert(id.clone());
        self.persist_logged();
        Some(id)
    }

    /// Delete and persist. `None` when the identifier was not a member.
    pub fn remove(&mut self, raw: &str) -> Option<ContactId> {
        let id = ContactId::normalize(raw)?;
        if !self.contacts.remove(&id) {
            return None;
        }
        self.persist_logged();
        Some(id)
    }

    pub fn list(&self) -> Vec<ContactId> {
        self.contacts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            tracing::warn!(path = %self.path.display(), "failed to persist contacts: {e}");
        }
    }

    fn persist(&self) -> Result<()> {
        let ids: Vec<&str> = self.contacts.iter().map(|c| c.as_str()).collect();
        let txt = serde_json::to_string_pretty(&ids)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, txt)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn read_record(path: &Path) -> Result<BTreeSet<ContactId>> {
    let txt = fs::read_to_string(path)?;
    let raw: Vec<String> = serde_json::from_str(&txt)?;
    Ok(raw.iter().filter_map(|s| ContactId::normalize(s)).collect())
}
