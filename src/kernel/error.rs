use crate::kernel::services::ports::{RemoteError, StorageError};
use crate::models::{FileId, FileTreeError, ProjectId};
use std::fmt;

pub type Result<T> = std::result::Result<T, WorkspaceError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    File(FileId),
    Project(ProjectId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::File(id) => write!(f, "file {id}"),
            Entity::Project(id) => write!(f, "project {id}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("a file already exists at {0}")]
    DuplicatePath(String),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("tab order must list every open tab exactly once")]
    InvalidTabOrder,
    #[error("no project is open")]
    NoActiveProject,
    #[error("cannot sync while offline")]
    Offline,
    #[error("sync already in progress")]
    SyncInProgress,
    #[error("project {project_id} is corrupt: {reason}")]
    CorruptProject {
        project_id: ProjectId,
        reason: String,
    },
    #[error("sync failed: {0}")]
    SyncFailure(#[from] RemoteError),
    #[error("local storage failed: {0}")]
    PersistenceFailure(#[from] StorageError),
}

impl WorkspaceError {
    /// Structural errors abort an operation before anything is mutated.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            WorkspaceError::SyncFailure(_) | WorkspaceError::PersistenceFailure(_)
        )
    }

    pub(crate) fn corrupt(project_id: &ProjectId, err: FileTreeError) -> Self {
        WorkspaceError::CorruptProject {
            project_id: project_id.clone(),
            reason: err.to_string(),
        }
    }
}

impl From<FileTreeError> for WorkspaceError {
    fn from(err: FileTreeError) -> Self {
        match err {
            FileTreeError::UnknownId(id) => WorkspaceError::NotFound(Entity::File(id)),
            FileTreeError::PathExists(path) => WorkspaceError::DuplicatePath(path),
            FileTreeError::NotDirectory(path) => {
                WorkspaceError::InvalidTarget(format!("{path} is not a directory"))
            }
            FileTreeError::NotFile(path) => {
                WorkspaceError::InvalidTarget(format!("{path} is a directory"))
            }
            FileTreeError::MoveIntoDescendant(path) => {
                WorkspaceError::InvalidTarget(format!("cannot move {path} into itself"))
            }
            FileTreeError::InvalidName(name) => WorkspaceError::InvalidName(name),
            FileTreeError::DuplicateId(id) => {
                WorkspaceError::InvalidTarget(format!("file id {id} is already in use"))
            }
            FileTreeError::Inconsistent(reason) => WorkspaceError::InvalidTarget(reason),
        }
    }
}
