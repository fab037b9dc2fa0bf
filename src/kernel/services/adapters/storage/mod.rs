//! 本地持久化
//!
//! `Storage` maps the workspace's records onto a [`LocalStore`]. It enforces
//! no invariants; callers hand it consistent data.
//!
//! Key layout (all under `codecanvas/v1/`):
//! - `projects`: known project ids
//! - `project/<id>`: versioned project envelope
//! - `current_project`, `recent_projects`, `last_sync`
//! - `tabs/<id>`, `current_file/<id>`, `unsaved/<id>`: editor session per project
//! - `pending/index` plus `pending/<project>/<file>`: queued content pushes
//! - `pending_projects`: projects waiting for a full sync

mod fs;
mod memory;

pub use fs::FileStore;
pub use memory::MemoryStore;

use crate::kernel::editor::FileTab;
use crate::kernel::services::ports::storage::{LocalStore, Result, StorageError};
use crate::models::{FileId, Project, ProjectId, ProjectSummary};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SCHEMA_VERSION: u32 = 1;
const PREFIX: &str = "codecanvas/v1/";

const PROJECTS_KEY: &str = "projects";
const CURRENT_PROJECT_KEY: &str = "current_project";
const RECENT_PROJECTS_KEY: &str = "recent_projects";
const LAST_SYNC_KEY: &str = "last_sync";
const PENDING_INDEX_KEY: &str = "pending/index";
const PENDING_PROJECTS_KEY: &str = "pending_projects";

fn key(suffix: &str) -> String {
    format!("{PREFIX}{suffix}")
}

fn project_key(id: &ProjectId) -> String {
    key(&format!("project/{id}"))
}

fn tabs_key(id: &ProjectId) -> String {
    key(&format!("tabs/{id}"))
}

fn current_file_key(id: &ProjectId) -> String {
    key(&format!("current_file/{id}"))
}

fn unsaved_key(id: &ProjectId) -> String {
    key(&format!("unsaved/{id}"))
}

fn pending_key(entry: &PendingKey) -> String {
    key(&format!("pending/{}/{}", entry.project_id, entry.file_id))
}

#[derive(Serialize, Deserialize)]
struct ProjectEnvelope {
    schema: u32,
    project: Project,
}

#[derive(Deserialize)]
struct SchemaProbe {
    schema: u32,
}

/// Composite key of a queued content push.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingKey {
    pub project_id: ProjectId,
    pub file_id: FileId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub project_id: ProjectId,
    pub file_id: FileId,
    pub content: String,
    pub queued_at: DateTime<Utc>,
}

impl PendingChange {
    pub fn key(&self) -> PendingKey {
        PendingKey {
            project_id: self.project_id.clone(),
            file_id: self.file_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub used: u64,
    pub capacity: u64,
}

impl StorageUsage {
    pub fn percent(&self) -> f64 {
        if self.capacity == 0 {
            return 100.0;
        }
        self.used as f64 * 100.0 / self.capacity as f64
    }
}

#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn LocalStore>,
    capacity: u64,
}

impl Storage {
    /// `capacity` is reported when the backend has no quota of its own.
    pub fn new(store: Arc<dyn LocalStore>, capacity: u64) -> Self {
        Self { store, capacity }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }

    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(self.read(key).await?.unwrap_or_default())
    }

    // ---- projects ----

    pub async fn save_project(&self, project: &Project) -> Result<()> {
        let envelope = ProjectEnvelope {
            schema: SCHEMA_VERSION,
            project: project.clone(),
        };
        self.write(&project_key(&project.id), &envelope).await?;

        let mut ids = self.get_project_ids().await?;
        if !ids.contains(&project.id) {
            ids.push(project.id.clone());
            self.write(&key(PROJECTS_KEY), &ids).await?;
        }
        Ok(())
    }

    pub async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let Some(raw) = self.store.get(&project_key(id)).await? else {
            return Ok(None);
        };
        let probe: SchemaProbe = serde_json::from_str(&raw)?;
        if probe.schema != SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchema {
                found: probe.schema,
                expected: SCHEMA_VERSION,
            });
        }
        let envelope: ProjectEnvelope = serde_json::from_str(&raw)?;
        Ok(Some(envelope.project))
    }

    /// Removes the project record and everything stored for it.
    pub async fn delete_project(&self, id: &ProjectId) -> Result<()> {
        self.store.remove(&project_key(id)).await?;
        self.store.remove(&tabs_key(id)).await?;
        self.store.remove(&current_file_key(id)).await?;
        self.store.remove(&unsaved_key(id)).await?;

        let mut ids = self.get_project_ids().await?;
        let before = ids.len();
        ids.retain(|known| known != id);
        if ids.len() != before {
            self.write(&key(PROJECTS_KEY), &ids).await?;
        }

        for entry in self.pending_index().await? {
            if &entry.project_id == id {
                self.remove_pending_change(&entry).await?;
            }
        }
        self.remove_pending_project(id).await?;

        if self.get_current_project_id().await?.as_ref() == Some(id) {
            self.save_current_project_id(None).await?;
        }
        Ok(())
    }

    pub async fn get_project_ids(&self) -> Result<Vec<ProjectId>> {
        self.read_list(&key(PROJECTS_KEY)).await
    }

    pub async fn save_current_project_id(&self, id: Option<&ProjectId>) -> Result<()> {
        match id {
            Some(id) => self.write(&key(CURRENT_PROJECT_KEY), id).await,
            None => self.store.remove(&key(CURRENT_PROJECT_KEY)).await,
        }
    }

    pub async fn get_current_project_id(&self) -> Result<Option<ProjectId>> {
        self.read(&key(CURRENT_PROJECT_KEY)).await
    }

    pub async fn save_recent_projects(&self, recent: &[ProjectSummary]) -> Result<()> {
        self.write(&key(RECENT_PROJECTS_KEY), recent).await
    }

    pub async fn load_recent_projects(&self) -> Result<Vec<ProjectSummary>> {
        self.read_list(&key(RECENT_PROJECTS_KEY)).await
    }

    // ---- editor session ----

    pub async fn save_open_tabs(&self, project: &ProjectId, tabs: &[FileTab]) -> Result<()> {
        self.write(&tabs_key(project), tabs).await
    }

    pub async fn load_open_tabs(&self, project: &ProjectId) -> Result<Vec<FileTab>> {
        self.read_list(&tabs_key(project)).await
    }

    pub async fn save_current_file_id(
        &self,
        project: &ProjectId,
        file: Option<&FileId>,
    ) -> Result<()> {
        match file {
            Some(file) => self.write(&current_file_key(project), file).await,
            None => self.store.remove(&current_file_key(project)).await,
        }
    }

    pub async fn get_current_file_id(&self, project: &ProjectId) -> Result<Option<FileId>> {
        self.read(&current_file_key(project)).await
    }

    pub async fn save_unsaved_files(&self, project: &ProjectId, files: &[FileId]) -> Result<()> {
        self.write(&unsaved_key(project), files).await
    }

    pub async fn load_unsaved_files(&self, project: &ProjectId) -> Result<Vec<FileId>> {
        self.read_list(&unsaved_key(project)).await
    }

    // ---- sync queue ----

    async fn pending_index(&self) -> Result<Vec<PendingKey>> {
        self.read_list(&key(PENDING_INDEX_KEY)).await
    }

    /// Queues a content push, replacing any older entry for the same file.
    pub async fn add_pending_change(&self, change: &PendingChange) -> Result<()> {
        let entry = change.key();
        self.write(&pending_key(&entry), change).await?;
        let mut index = self.pending_index().await?;
        if !index.contains(&entry) {
            index.push(entry);
            self.write(&key(PENDING_INDEX_KEY), &index).await?;
        }
        Ok(())
    }

    pub async fn remove_pending_change(&self, entry: &PendingKey) -> Result<()> {
        self.store.remove(&pending_key(entry)).await?;
        let mut index = self.pending_index().await?;
        let before = index.len();
        index.retain(|known| known != entry);
        if index.len() != before {
            self.write(&key(PENDING_INDEX_KEY), &index).await?;
        }
        Ok(())
    }

    /// Queued pushes in enqueue order. Index entries without a record are
    /// skipped.
    pub async fn get_pending_changes(&self) -> Result<Vec<PendingChange>> {
        let mut changes = Vec::new();
        for entry in self.pending_index().await? {
            match self.read::<PendingChange>(&pending_key(&entry)).await? {
                Some(change) => changes.push(change),
                None => tracing::warn!(
                    project = %entry.project_id,
                    file = %entry.file_id,
                    "pending index entry has no record"
                ),
            }
        }
        Ok(changes)
    }

    pub async fn add_pending_project(&self, id: &ProjectId) -> Result<()> {
        let mut ids = self.get_pending_projects().await?;
        if !ids.contains(id) {
            ids.push(id.clone());
            self.write(&key(PENDING_PROJECTS_KEY), &ids).await?;
        }
        Ok(())
    }

    pub async fn remove_pending_project(&self, id: &ProjectId) -> Result<()> {
        let mut ids = self.get_pending_projects().await?;
        let before = ids.len();
        ids.retain(|known| known != id);
        if ids.len() != before {
            self.write(&key(PENDING_PROJECTS_KEY), &ids).await?;
        }
        Ok(())
    }

    pub async fn get_pending_projects(&self) -> Result<Vec<ProjectId>> {
        self.read_list(&key(PENDING_PROJECTS_KEY)).await
    }

    pub async fn save_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        self.write(&key(LAST_SYNC_KEY), &at).await
    }

    pub async fn get_last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        self.read(&key(LAST_SYNC_KEY)).await
    }

    // ---- housekeeping ----

    /// Bytes used by this application's keys against the capacity.
    pub async fn usage(&self) -> Result<StorageUsage> {
        let mut used = 0u64;
        for k in self.store.keys().await? {
            if !k.starts_with(PREFIX) {
                continue;
            }
            if let Some(value) = self.store.get(&k).await? {
                used += (k.len() + value.len()) as u64;
            }
        }
        Ok(StorageUsage {
            used,
            capacity: self.store.capacity().unwrap_or(self.capacity),
        })
    }

    /// Removes every key this application owns.
    pub async fn clear_all(&self) -> Result<()> {
        for k in self.store.keys().await? {
            if k.starts_with(PREFIX) {
                self.store.remove(&k).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/storage/mod.rs"]
mod tests;
