//! The keyed record store certificates are persisted to.
//!
//! The crate only ever needs two operations from the store: read a record by
//! name, and create a record that must not already exist. There is no update,
//! so two actors racing to bootstrap the same cluster cannot overwrite each
//! other's material; the loser sees [`StoreError::AlreadyExists`].

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::secret::Secret;

/// Namespaced name of a record, or of the cluster owning a set of records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("secret {name} not found")]
    NotFound { name: String },

    #[error("secret {name} already exists")]
    AlreadyExists { name: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

/// Get / create-only access to secret records.
pub trait SecretStore {
    /// Reads the record at `key`, failing with [`StoreError::NotFound`] if absent.
    fn get(&self, key: &ObjectKey) -> Result<Secret, StoreError>;

    /// Creates `secret`, failing with [`StoreError::AlreadyExists`] rather than
    /// overwriting a record of the same name.
    fn create(&self, secret: &Secret) -> Result<(), StoreError>;
}

impl<T: SecretStore + ?Sized> SecretStore for &T {
    fn get(&self, key: &ObjectKey) -> Result<Secret, StoreError> {
        (**self).get(key)
    }

    fn create(&self, secret: &Secret) -> Result<(), StoreError> {
        (**self).create(secret)
    }
}

/// An in-process [`SecretStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    secrets: Mutex<BTreeMap<ObjectKey, Secret>>,
    creates: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `secret` without counting it as a create.
    pub fn insert(&self, secret: Secret) -> Result<(), StoreError> {
        let key = secret.key();
        self.lock()?.insert(key, secret);
        Ok(())
    }

    /// Number of successful [`SecretStore::create`] calls.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|secrets| secrets.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<ObjectKey, Secret>>, StoreError> {
        self.secrets
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, key: &ObjectKey) -> Result<Secret, StoreError> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                name: key.name.clone(),
            })
    }

    fn create(&self, secret: &Secret) -> Result<(), StoreError> {
        let key = secret.key();
        let mut secrets = self.lock()?;
        if secrets.contains_key(&key) {
            return Err(StoreError::AlreadyExists { name: key.name });
        }
        secrets.insert(key, secret.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
