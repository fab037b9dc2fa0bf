//! Local key/value persistence contract.
//!
//! Backends only move strings around; the typed layout lives in
//! `adapters::storage::Storage`.

use super::runtime::BoxFuture;

pub type Result<T> = std::result::Result<T, StorageError>;
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T>>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("unsupported record schema {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },
}

pub trait LocalStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

    /// Removing a missing key is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;

    fn keys(&self) -> StoreFuture<'_, Vec<String>>;

    fn clear(&self) -> StoreFuture<'_, ()>;

    /// Hard byte limit of the backend, if it has one.
    fn capacity(&self) -> Option<u64> {
        None
    }
}
