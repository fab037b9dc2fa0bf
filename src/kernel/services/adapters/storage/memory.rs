//! 内存存储后端
//!
//! Synchronous backend: every future is ready on first poll. An optional byte
//! quota mimics browser storage limits.

use crate::kernel::services::ports::storage::{LocalStore, StorageError, StoreFuture};
use rustc_hash::FxHashMap;
use std::future::ready;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<FxHashMap<String, String>>>,
    quota: Option<u64>,
}

fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: u64) -> Self {
        Self {
            entries: Arc::default(),
            quota: Some(quota),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_sync(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_sync(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        if let Some(quota) = self.quota {
            let used: u64 = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| entry_size(k, v))
                .sum();
            let needed = entry_size(key, &value);
            if used + needed > quota {
                return Err(StorageError::QuotaExceeded {
                    needed,
                    available: quota.saturating_sub(used),
                });
            }
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_sync(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn keys_sync(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn clear_sync(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.clear();
        Ok(())
    }
}

impl LocalStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(ready(self.get_sync(key)))
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
        Box::pin(ready(self.set_sync(key, value)))
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(ready(self.remove_sync(key)))
    }

    fn keys(&self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(ready(self.keys_sync()))
    }

    fn clear(&self) -> StoreFuture<'_, ()> {
        Box::pin(ready(self.clear_sync()))
    }

    fn capacity(&self) -> Option<u64> {
        self.quota
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/storage/memory.rs"]
mod tests;
