//! 同步协调器
//!
//! Owns the offline and syncing flags and the durable retry queue. Content
//! pushes and project syncs that cannot reach the server are queued in
//! [`Storage`] and replayed by [`SyncCoordinator::drain`]: project syncs first,
//! then content pushes. One failed entry never blocks the others.

use super::storage::{PendingChange, PendingKey, Storage};
use crate::kernel::services::ports::storage::Result as StorageResult;
use crate::kernel::effect::RemoteStatus;
use crate::kernel::error::{Result, WorkspaceError};
use crate::kernel::services::ports::{
    RemoteError, RemoteProjectService, SyncPayload, SyncSettings,
};
use crate::models::{FileId, Project, ProjectId, ProjectPatch};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type Listener = Box<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What a drain did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pushed: usize,
    pub failed: usize,
    /// Canonical snapshots returned by replayed project syncs. Already
    /// written to storage.
    pub projects: Vec<Project>,
}

pub struct SyncCoordinator {
    storage: Storage,
    remote: Arc<dyn RemoteProjectService>,
    offline: bool,
    syncing: bool,
    auto_sync: bool,
    interval: Duration,
    last_auto: Option<Instant>,
    offline_listeners: Vec<(ListenerId, Listener)>,
    syncing_listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl SyncCoordinator {
    pub fn new(
        storage: Storage,
        remote: Arc<dyn RemoteProjectService>,
        settings: &SyncSettings,
    ) -> Self {
        Self {
            storage,
            remote,
            offline: false,
            syncing: false,
            auto_sync: settings.auto_sync,
            interval: Duration::from_secs(settings.auto_sync_interval_secs.max(1)),
            last_auto: None,
            offline_listeners: Vec::new(),
            syncing_listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    /// Returns `true` on an offline-to-online transition, after which the
    /// caller should drain.
    pub fn set_offline(&mut self, offline: bool) -> bool {
        if self.offline == offline {
            return false;
        }
        self.offline = offline;
        tracing::info!(offline, "connectivity changed");
        for (_, listener) in &self.offline_listeners {
            listener(offline);
        }
        !offline
    }

    pub fn network_changed(&mut self, online: bool) -> bool {
        self.set_offline(!online)
    }

    fn set_syncing(&mut self, syncing: bool) {
        if self.syncing == syncing {
            return;
        }
        self.syncing = syncing;
        for (_, listener) in &self.syncing_listeners {
            listener(syncing);
        }
    }

    fn next_id(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }

    pub fn on_offline_change(&mut self, listener: Listener) -> ListenerId {
        let id = self.next_id();
        self.offline_listeners.push((id, listener));
        id
    }

    pub fn on_syncing_change(&mut self, listener: Listener) -> ListenerId {
        let id = self.next_id();
        self.syncing_listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.offline_listeners.len() + self.syncing_listeners.len();
        self.offline_listeners.retain(|(known, _)| *known != id);
        self.syncing_listeners.retain(|(known, _)| *known != id);
        before != self.offline_listeners.len() + self.syncing_listeners.len()
    }

    async fn enqueue_change(
        &self,
        project: &ProjectId,
        file: &FileId,
        content: &str,
    ) -> StorageResult<()> {
        let change = PendingChange {
            project_id: project.clone(),
            file_id: file.clone(),
            content: content.to_string(),
            queued_at: Utc::now(),
        };
        self.storage.add_pending_change(&change).await.inspect_err(|e| {
            tracing::warn!(project = %project, file = %file, error = %e, "failed to queue change");
        })
    }

    async fn enqueue_project(&self, project: &ProjectId) -> StorageResult<()> {
        self.storage.add_pending_project(project).await.inspect_err(|e| {
            tracing::warn!(project = %project, error = %e, "failed to queue project sync");
        })
    }

    /// Queues a full sync. `cause` is the remote error that made it
    /// necessary, `None` when offline.
    async fn queue_project_status(
        &self,
        project: &ProjectId,
        cause: Option<RemoteError>,
    ) -> RemoteStatus {
        match (self.enqueue_project(project).await, cause) {
            (Err(e), _) => RemoteStatus::Unqueued(e.to_string()),
            (Ok(()), Some(cause)) => RemoteStatus::Failed(cause),
            (Ok(()), None) => RemoteStatus::Queued,
        }
    }

    /// Pushes one file's committed content, or queues it.
    pub async fn push_file(
        &mut self,
        project: &ProjectId,
        file: &FileId,
        content: &str,
    ) -> RemoteStatus {
        if self.offline {
            return match self.enqueue_change(project, file, content).await {
                Ok(()) => RemoteStatus::Queued,
                Err(e) => RemoteStatus::Unqueued(e.to_string()),
            };
        }
        match self.remote.update_file(project, file, content).await {
            Ok(()) => {
                let entry = PendingKey {
                    project_id: project.clone(),
                    file_id: file.clone(),
                };
                if let Err(e) = self.storage.remove_pending_change(&entry).await {
                    tracing::warn!(project = %project, file = %file, error = %e, "failed to clear pending change");
                }
                tracing::debug!(project = %project, file = %file, "file pushed");
                RemoteStatus::Acknowledged
            }
            Err(e) => {
                tracing::warn!(project = %project, file = %file, error = %e, "file push failed");
                let mut queued = self.enqueue_change(project, file, content).await;
                if queued.is_ok() && matches!(e, RemoteError::NotFound(_)) {
                    queued = self.enqueue_project(project).await;
                }
                match queued {
                    Ok(()) => RemoteStatus::Failed(e),
                    Err(queue_err) => RemoteStatus::Unqueued(queue_err.to_string()),
                }
            }
        }
    }

    /// Full two-way sync. Returns the canonical snapshot when the server
    /// answered.
    pub async fn sync_project(&mut self, project: &Project) -> (RemoteStatus, Option<Project>) {
        if self.offline {
            return (self.queue_project_status(&project.id, None).await, None);
        }
        match self
            .remote
            .sync_project(SyncPayload::from_project(project))
            .await
        {
            Ok(canonical) => {
                if let Err(e) = self.storage.remove_pending_project(&project.id).await {
                    tracing::warn!(project = %project.id, error = %e, "failed to clear pending sync");
                }
                tracing::debug!(project = %project.id, "project synced");
                (RemoteStatus::Acknowledged, Some(canonical))
            }
            Err(e) => {
                tracing::warn!(project = %project.id, error = %e, "project sync failed");
                (self.queue_project_status(&project.id, Some(e)).await, None)
            }
        }
    }

    /// Metadata update. Offline or failed updates fall back to a queued full
    /// sync, which carries the same fields.
    pub async fn update_project(&mut self, project: &ProjectId, patch: ProjectPatch) -> RemoteStatus {
        if self.offline {
            return self.queue_project_status(project, None).await;
        }
        match self.remote.update_project(project, patch).await {
            Ok(()) => RemoteStatus::Acknowledged,
            Err(e) => {
                tracing::warn!(project = %project, error = %e, "project update failed");
                self.queue_project_status(project, Some(e)).await
            }
        }
    }

    /// Not retried.
    pub async fn delete_project(&mut self, project: &ProjectId) -> RemoteStatus {
        if self.offline {
            tracing::warn!(project = %project, "offline, remote copy left in place");
            return RemoteStatus::NotRequired;
        }
        match self.remote.delete_project(project).await {
            Ok(()) => RemoteStatus::Acknowledged,
            Err(e) => {
                tracing::warn!(project = %project, error = %e, "remote delete failed");
                RemoteStatus::Failed(e)
            }
        }
    }

    pub async fn drop_pending(&self, project: &ProjectId, files: &[FileId]) -> Result<()> {
        for file in files {
            self.storage
                .remove_pending_change(&PendingKey {
                    project_id: project.clone(),
                    file_id: file.clone(),
                })
                .await?;
        }
        Ok(())
    }

    pub async fn pending_changes(&self) -> Result<Vec<PendingChange>> {
        Ok(self.storage.get_pending_changes().await?)
    }

    pub async fn pending_projects(&self) -> Result<Vec<ProjectId>> {
        Ok(self.storage.get_pending_projects().await?)
    }

    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.storage.get_last_sync().await?)
    }

    /// Manual "sync now". See [`SyncCoordinator::drain`] for `live`.
    pub async fn sync_now(&mut self, live: Option<&Project>) -> Result<SyncReport> {
        if self.offline {
            return Err(WorkspaceError::Offline);
        }
        self.drain(live).await
    }

    /// Periodic auto-sync; drains when the interval has elapsed since the
    /// previous run. The first call only arms the timer.
    pub async fn tick(
        &mut self,
        now: Instant,
        live: Option<&Project>,
    ) -> Option<Result<SyncReport>> {
        if !self.auto_sync || self.offline || self.syncing {
            return None;
        }
        let Some(last) = self.last_auto else {
            self.last_auto = Some(now);
            return None;
        };
        if now.saturating_duration_since(last) < self.interval {
            return None;
        }
        self.last_auto = Some(now);
        Some(self.drain(live).await)
    }

    /// Replays the queue. Entries that succeed are removed; failed ones stay.
    ///
    /// `live` is the project open in memory. It may be newer than its stored
    /// record when a local write failed, so its queued sync sends `live`
    /// instead of the record and its queued pushes send the live content.
    pub async fn drain(&mut self, live: Option<&Project>) -> Result<SyncReport> {
        if self.syncing {
            return Err(WorkspaceError::SyncInProgress);
        }
        if self.offline {
            return Err(WorkspaceError::Offline);
        }
        self.set_syncing(true);
        let result = self.drain_queue(live).await;
        self.set_syncing(false);
        result
    }

    async fn queued_snapshot(
        &self,
        id: &ProjectId,
        live: Option<&Project>,
    ) -> Result<Option<Project>> {
        if let Some(live) = live.filter(|p| &p.id == id) {
            return Ok(Some(live.clone()));
        }
        Ok(self.storage.get_project(id).await?)
    }

    async fn drain_queue(&mut self, live: Option<&Project>) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        for id in self.storage.get_pending_projects().await? {
            let Some(project) = self.queued_snapshot(&id, live).await? else {
                tracing::warn!(project = %id, "queued project no longer stored");
                self.storage.remove_pending_project(&id).await?;
                continue;
            };
            match self
                .remote
                .sync_project(SyncPayload::from_project(&project))
                .await
            {
                Ok(canonical) => {
                    if let Err(e) = self.storage.save_project(&canonical).await {
                        tracing::warn!(project = %id, error = %e, "failed to store synced project");
                    }
                    self.storage.remove_pending_project(&id).await?;
                    report.pushed += 1;
                    report.projects.push(canonical);
                }
                Err(e) => {
                    tracing::warn!(project = %id, error = %e, "queued project sync failed");
                    report.failed += 1;
                }
            }
        }

        for change in self.storage.get_pending_changes().await? {
            let content = match live.filter(|p| p.id == change.project_id) {
                Some(live) => match live.files.iter().find(|f| f.id == change.file_id) {
                    Some(file) => file.content_str().to_string(),
                    None => {
                        tracing::debug!(file = %change.file_id, "queued file no longer exists");
                        self.storage.remove_pending_change(&change.key()).await?;
                        continue;
                    }
                },
                None => change.content.clone(),
            };
            match self
                .remote
                .update_file(&change.project_id, &change.file_id, &content)
                .await
            {
                Ok(()) => {
                    self.storage.remove_pending_change(&change.key()).await?;
                    report.pushed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        project = %change.project_id,
                        file = %change.file_id,
                        error = %e,
                        "queued push failed"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.failed == 0 {
            if let Err(e) = self.storage.save_last_sync(Utc::now()).await {
                tracing::warn!(error = %e, "failed to record last sync");
            }
        }
        tracing::info!(pushed = report.pushed, failed = report.failed, "sync drained");
        Ok(report)
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/sync.rs"]
mod tests;
