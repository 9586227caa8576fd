//! Key-value persistence for recipes, notes and cross-reload preferences.
//! Collections are stored as whole JSON blobs and rewritten atomically.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

// Storage keys, namespaced to the brewing core
pub const KEY_CUSTOM_METHODS: &str = "brew:customMethods";
pub const KEY_NOTES: &str = "brew:notes";
pub const KEY_SELECTED_EQUIPMENT: &str = "brew:selectedEquipment";

/// External key-value persistence boundary. The engine behind it (IndexedDB,
/// disk, memory) is a collaborator, not part of this core.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory storage, used in tests and as a fallback when no engine is wired.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

/// Typed wrapper over the raw key-value engine. Owns the serialization policy
/// (JSON blobs per collection) and the preference keys.
pub struct SessionStorage {
    inner: Box<dyn Storage>,
}

impl SessionStorage {
    pub fn new(inner: Box<dyn Storage>) -> Self {
        Self { inner }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Load a JSON collection. A missing key yields the type's default; a
    /// corrupt blob is logged and also degrades to the default rather than
    /// blocking the flow.
    pub fn load_json<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.inner.get(key) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Corrupt blob at {}: {} - using default", key, e);
                    T::default()
                }
            },
            None => T::default(),
        }
    }

    /// Rewrite a whole JSON collection.
    pub fn save_json<T>(&mut self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let raw = serde_json::to_string(value).with_context(|| format!("serializing {}", key))?;
        self.inner.set(key, &raw);
        debug!("💾 Saved {} ({} bytes)", key, raw.len());
        Ok(())
    }

    /// Cross-reload equipment preference, stored as a plain id string.
    /// Last-write-wins; the one piece of state that outlives a session reset.
    pub fn cached_equipment(&self) -> Option<String> {
        self.inner.get(KEY_SELECTED_EQUIPMENT).filter(|id| !id.is_empty())
    }

    pub fn cache_equipment(&mut self, id: &str) {
        self.inner.set(KEY_SELECTED_EQUIPMENT, id);
        debug!("💾 Cached equipment preference: {}", id);
    }
}
