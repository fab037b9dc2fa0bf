use crate::kernel::services::ports::RemoteError;
use crate::models::{FileId, ProjectId, ProjectPatch};

/// Side effects requested by a kernel mutation. Project-wide effects refer to
/// the project that is current when they run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    PersistProject,
    /// Open tabs, current file and unsaved markers.
    PersistSession,
    PersistCurrentProject,
    PushFile {
        project: ProjectId,
        file: FileId,
        content: String,
    },
    SyncProject,
    UpdateProject {
        project: ProjectId,
        patch: ProjectPatch,
    },
    DropPending {
        project: ProjectId,
        files: Vec<FileId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalStatus {
    /// Nothing needed writing.
    Unchanged,
    Persisted,
    /// The in-memory change stands but was not written.
    Failed(String),
}

impl LocalStatus {
    pub fn merge(self, other: LocalStatus) -> LocalStatus {
        match (self, other) {
            (LocalStatus::Failed(e), _) | (_, LocalStatus::Failed(e)) => LocalStatus::Failed(e),
            (LocalStatus::Persisted, _) | (_, LocalStatus::Persisted) => LocalStatus::Persisted,
            _ => LocalStatus::Unchanged,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LocalStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    /// Local-only project, or nothing to send.
    NotRequired,
    Acknowledged,
    /// Offline: kept for the next drain.
    Queued,
    /// The call failed. Content pushes and project syncs are also queued.
    Failed(RemoteError),
    /// The change needed a retry entry but writing it failed, so it will not
    /// be retried.
    Unqueued(String),
}

impl RemoteStatus {
    fn rank(&self) -> u8 {
        match self {
            RemoteStatus::NotRequired => 0,
            RemoteStatus::Acknowledged => 1,
            RemoteStatus::Queued => 2,
            RemoteStatus::Failed(_) => 3,
            RemoteStatus::Unqueued(_) => 4,
        }
    }

    /// Keeps the worse of the two.
    pub fn merge(self, other: RemoteStatus) -> RemoteStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// True when the change is neither acknowledged nor waiting for a retry.
    pub fn is_failed(&self) -> bool {
        matches!(self, RemoteStatus::Failed(_) | RemoteStatus::Unqueued(_))
    }
}

/// Result of a workspace operation: the value plus what happened to the
/// change locally and remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: T,
    pub local: LocalStatus,
    pub remote: RemoteStatus,
}

impl<T> Outcome<T> {
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            local: LocalStatus::Unchanged,
            remote: RemoteStatus::NotRequired,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            local: self.local,
            remote: self.remote,
        }
    }
}
