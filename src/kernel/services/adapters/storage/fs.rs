//! 文件系统存储后端
//!
//! One file per key under a root directory. Keys are percent-encoded into
//! file names; writes go to a temp file first and are renamed into place.

use crate::kernel::services::ports::storage::{LocalStore, StorageError, StoreFuture};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const KEY_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');
const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(utf8_percent_encode(key, KEY_SET).to_string())
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.entry_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: String) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.entry_path(key);
        let mut tmp = path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, value.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            // Encoded keys never contain '.', so this skips temp files too.
            if name.contains('.') {
                continue;
            }
            match percent_decode_str(name).decode_utf8() {
                Ok(key) => keys.push(key.into_owned()),
                Err(e) => tracing::warn!(file = name, error = %e, "skipping undecodable entry"),
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        for key in self.list().await? {
            self.delete(&key).await?;
        }
        Ok(())
    }
}

impl LocalStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(self.read(key))
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
        Box::pin(self.write(key, value))
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(self.delete(key))
    }

    fn keys(&self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(self.list())
    }

    fn clear(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.clear_all())
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/storage/fs.rs"]
mod tests;
