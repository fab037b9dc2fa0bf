//! Remote project service contract.

use super::runtime::BoxFuture;
use crate::models::{File, FileId, FileKind, Project, ProjectId, ProjectPatch, UserId};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub type RemoteFuture<'a, T> = BoxFuture<'a, Result<T, RemoteError>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote service unavailable")]
    Unavailable,
    #[error("remote service rejected the request: {0}")]
    Rejected(String),
    #[error("{0} not found on the server")]
    NotFound(String),
}

/// One file on the wire. Hierarchy travels as `parent_id` instead of child
/// lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFile {
    pub id: FileId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FileId>,
}

/// Full project snapshot posted by `sync_project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub id: ProjectId,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub files: Vec<SyncFile>,
}

impl SyncPayload {
    /// `project.files` must be in pre-order with directory child lists filled
    /// in, which is what `FileTree::records` produces.
    pub fn from_project(project: &Project) -> Self {
        let mut parents: FxHashMap<&FileId, &FileId> = FxHashMap::default();
        for dir in project.files.iter().filter(|f| f.is_dir()) {
            for child in dir.child_ids() {
                parents.insert(child, &dir.id);
            }
        }
        let files = project
            .files
            .iter()
            .map(|file| SyncFile {
                id: file.id.clone(),
                name: file.name.clone(),
                kind: file.kind,
                path: file.path.clone(),
                content: file.content.clone(),
                parent_id: parents.get(&file.id).map(|&p| p.clone()),
            })
            .collect();
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            path: project.path.clone(),
            description: project.description.clone(),
            is_public: project.is_public,
            user_id: project.user_id.clone(),
            created_at: project.created_at,
            files,
        }
    }

    /// Rebuilds flat records, restoring directory child lists from
    /// `parent_id` in payload order.
    pub fn into_project(self) -> Project {
        let mut children: FxHashMap<FileId, Vec<FileId>> = FxHashMap::default();
        for file in &self.files {
            if let Some(parent) = &file.parent_id {
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(file.id.clone());
            }
        }
        let files = self
            .files
            .into_iter()
            .map(|file| {
                let (content, kids) = match file.kind {
                    FileKind::File => (Some(file.content.unwrap_or_default()), None),
                    FileKind::Directory => {
                        (None, Some(children.remove(&file.id).unwrap_or_default()))
                    }
                };
                File {
                    id: file.id,
                    name: file.name,
                    kind: file.kind,
                    path: file.path,
                    content,
                    children: kids,
                }
            })
            .collect();
        Project {
            id: self.id,
            name: self.name,
            path: self.path,
            files,
            created_at: self.created_at,
            user_id: self.user_id,
            is_public: self.is_public,
            description: self.description,
        }
    }
}

pub trait RemoteProjectService: Send + Sync {
    fn get_user_projects<'a>(&'a self, user: &'a UserId) -> RemoteFuture<'a, Vec<Project>>;

    fn create_project<'a>(&'a self, user: &'a UserId, name: &'a str) -> RemoteFuture<'a, Project>;

    /// Two-way sync: posts the full snapshot and returns the canonical one.
    fn sync_project(&self, payload: SyncPayload) -> RemoteFuture<'_, Project>;

    fn update_project<'a>(
        &'a self,
        id: &'a ProjectId,
        patch: ProjectPatch,
    ) -> RemoteFuture<'a, ()>;

    fn delete_project<'a>(&'a self, id: &'a ProjectId) -> RemoteFuture<'a, ()>;

    fn update_file<'a>(
        &'a self,
        project: &'a ProjectId,
        file: &'a FileId,
        content: &'a str,
    ) -> RemoteFuture<'a, ()>;
}
