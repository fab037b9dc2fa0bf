//! 工作区
//!
//! `Workspace` is the public surface of the crate. Each mutation is applied
//! to the kernel [`Store`] first; the effects it reports are then run in two
//! passes, local persistence and then the remote service. Local failures and
//! remote failures never undo the in-memory change; they only show up in the
//! returned [`Outcome`].

use crate::kernel::editor::{EditorSession, FileTab};
use crate::kernel::error::{Entity, Result, WorkspaceError};
use crate::kernel::search::{FileSearchResult, SearchOptions};
use crate::kernel::services::adapters::{Storage, StorageUsage, SyncCoordinator, SyncReport};
use crate::kernel::services::ports::{LocalStore, RemoteProjectService, Settings, StorageError};
use crate::kernel::{
    DispatchResult, Effect, LocalStatus, OpenProject, Outcome, ProjectTemplate, RemoteStatus,
    Store,
};
use crate::models::{
    File, FileId, FileTree, NodeSnapshot, Project, ProjectId, ProjectSummary, UserId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

fn local_status(result: std::result::Result<(), StorageError>, what: &str) -> LocalStatus {
    match result {
        Ok(()) => LocalStatus::Persisted,
        Err(e) => {
            tracing::warn!(error = %e, what, "local persistence failed");
            LocalStatus::Failed(e.to_string())
        }
    }
}

fn report_status(report: &SyncReport) -> RemoteStatus {
    if report.failed > 0 {
        RemoteStatus::Queued
    } else if report.pushed > 0 {
        RemoteStatus::Acknowledged
    } else {
        RemoteStatus::NotRequired
    }
}

pub struct Workspace {
    store: Store,
    storage: Storage,
    remote: Arc<dyn RemoteProjectService>,
    sync: SyncCoordinator,
    settings: Settings,
    projects: Vec<Project>,
    recent: Vec<ProjectSummary>,
    user: Option<UserId>,
}

impl Workspace {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteProjectService>,
        settings: Settings,
    ) -> Self {
        let storage = Storage::new(store, settings.storage.capacity_bytes);
        let sync = SyncCoordinator::new(storage.clone(), remote.clone(), &settings.sync);
        Self {
            store: Store::new(),
            storage,
            remote,
            sync,
            settings,
            projects: Vec::new(),
            recent: Vec::new(),
            user: None,
        }
    }

    // ---- read access ----

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Only projects carrying a user id are remote-backed.
    pub fn set_user(&mut self, user: Option<UserId>) {
        tracing::info!(signed_in = user.is_some(), "user changed");
        self.user = user;
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn recent_projects(&self) -> &[ProjectSummary] {
        &self.recent
    }

    pub fn current_project_id(&self) -> Option<&ProjectId> {
        self.store.project().map(OpenProject::id)
    }

    pub fn current_project(&self) -> Option<Project> {
        self.store.project().map(OpenProject::snapshot)
    }

    pub fn tree(&self) -> Option<&FileTree> {
        self.store.project().map(|open| &open.tree)
    }

    pub fn open_tabs(&self) -> &[FileTab] {
        self.store
            .project()
            .map(|open| open.session.tabs())
            .unwrap_or(&[])
    }

    pub fn current_file(&self) -> Option<&FileTab> {
        self.store.project()?.session.current()
    }

    pub fn find_file_by_id(&self, id: &FileId) -> Option<File> {
        self.store.find_file(id)
    }

    pub fn has_unsaved_changes(&self, id: &FileId) -> bool {
        self.store.has_unsaved_changes(id)
    }

    pub fn clipboard(&self) -> Option<&NodeSnapshot> {
        self.store.clipboard()
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    /// For listener registration.
    pub fn sync_mut(&mut self) -> &mut SyncCoordinator {
        &mut self.sync
    }

    pub fn is_offline(&self) -> bool {
        self.sync.is_offline()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    // ---- effect execution ----

    async fn finish<T>(&mut self, result: DispatchResult<T>) -> Outcome<T> {
        let (local, remote) = self.run_effects(result.effects).await;
        Outcome {
            value: result.value,
            local,
            remote,
        }
    }

    async fn run_effects(&mut self, effects: Vec<Effect>) -> (LocalStatus, RemoteStatus) {
        let local = self.run_local(&effects).await;
        let mut remote = RemoteStatus::NotRequired;
        let mut local_after = LocalStatus::Unchanged;
        for effect in effects {
            match effect {
                Effect::PushFile {
                    project,
                    file,
                    content,
                } => {
                    let status = self.sync.push_file(&project, &file, &content).await;
                    remote = remote.merge(status);
                }
                Effect::SyncProject => {
                    let Some(snapshot) = self.current_project() else {
                        continue;
                    };
                    let (status, canonical) = self.sync.sync_project(&snapshot).await;
                    remote = remote.merge(status);
                    if let Some(canonical) = canonical {
                        local_after = local_after.merge(self.absorb_canonical(canonical).await);
                    }
                }
                Effect::UpdateProject { project, patch } => {
                    let status = self.sync.update_project(&project, patch).await;
                    remote = remote.merge(status);
                }
                _ => {}
            }
        }
        (local.merge(local_after), remote)
    }

    async fn run_local(&mut self, effects: &[Effect]) -> LocalStatus {
        let mut local = LocalStatus::Unchanged;
        for effect in effects {
            tracing::debug!(?effect, "running effect");
            let status = match effect {
                Effect::PersistProject => self.persist_project().await,
                Effect::PersistSession => self.persist_session().await,
                Effect::PersistCurrentProject => {
                    let id = self.current_project_id().cloned();
                    local_status(
                        self.storage.save_current_project_id(id.as_ref()).await,
                        "current project",
                    )
                }
                Effect::DropPending { project, files } => {
                    match self.sync.drop_pending(project, files).await {
                        Ok(()) => LocalStatus::Persisted,
                        Err(e) => {
                            tracing::warn!(project = %project, error = %e, "failed to drop pending changes");
                            LocalStatus::Failed(e.to_string())
                        }
                    }
                }
                _ => continue,
            };
            local = local.merge(status);
        }
        local
    }

    fn upsert_project(&mut self, project: Project) {
        match self.projects.iter_mut().find(|p| p.id == project.id) {
            Some(known) => *known = project,
            None => self.projects.push(project),
        }
    }

    async fn persist_project(&mut self) -> LocalStatus {
        let Some(snapshot) = self.current_project() else {
            return LocalStatus::Unchanged;
        };
        let status = local_status(self.storage.save_project(&snapshot).await, "project");
        self.upsert_project(snapshot);
        status
    }

    async fn persist_session(&mut self) -> LocalStatus {
        let Some(open) = self.store.project() else {
            return LocalStatus::Unchanged;
        };
        let id = open.id().clone();
        let tabs = open.session.tabs().to_vec();
        let current = open.session.current_id().cloned();
        let unsaved = open.session.unsaved_ids();

        let tabs_status = local_status(self.storage.save_open_tabs(&id, &tabs).await, "tabs");
        let current_status = local_status(
            self.storage
                .save_current_file_id(&id, current.as_ref())
                .await,
            "current file",
        );
        let unsaved_status = local_status(
            self.storage.save_unsaved_files(&id, &unsaved).await,
            "unsaved files",
        );
        tabs_status.merge(current_status).merge(unsaved_status)
    }

    /// Adopts a canonical snapshot from the server. The current project is
    /// rebuilt in place; any other project only has its record replaced.
    async fn absorb_canonical(&mut self, canonical: Project) -> LocalStatus {
        if self.current_project_id() == Some(&canonical.id) {
            if self.current_project().as_ref() == Some(&canonical) {
                return LocalStatus::Unchanged;
            }
            return match self.store.replace_project(canonical) {
                Ok(result) => self.run_local(&result.effects).await,
                Err(e) => {
                    tracing::warn!(error = %e, "rejecting canonical snapshot");
                    LocalStatus::Unchanged
                }
            };
        }
        let status = local_status(self.storage.save_project(&canonical).await, "project");
        self.upsert_project(canonical);
        status
    }

    async fn absorb_report(&mut self, report: &SyncReport) -> LocalStatus {
        let mut local = LocalStatus::Unchanged;
        for project in &report.projects {
            local = local.merge(self.absorb_canonical(project.clone()).await);
        }
        local
    }

    async fn load_session(&self, id: &ProjectId) -> EditorSession {
        let tabs = self.storage.load_open_tabs(id).await.unwrap_or_else(|e| {
            tracing::warn!(project = %id, error = %e, "failed to load tabs");
            Vec::new()
        });
        let current = self.storage.get_current_file_id(id).await.unwrap_or_else(|e| {
            tracing::warn!(project = %id, error = %e, "failed to load current file");
            None
        });
        let unsaved = self.storage.load_unsaved_files(id).await.unwrap_or_else(|e| {
            tracing::warn!(project = %id, error = %e, "failed to load unsaved markers");
            Vec::new()
        });
        EditorSession::restore(tabs, current, unsaved)
    }

    async fn touch_recent(&mut self, summary: ProjectSummary) -> LocalStatus {
        self.recent.retain(|r| r.id != summary.id);
        self.recent.insert(0, summary);
        self.recent.truncate(self.settings.recent_projects_limit.max(1));
        local_status(
            self.storage.save_recent_projects(&self.recent).await,
            "recent projects",
        )
    }

    // ---- projects ----

    /// Loads everything persisted and reopens the last current project.
    /// Unreadable projects are skipped.
    pub async fn restore(&mut self) -> Outcome<Option<ProjectId>> {
        let mut local = LocalStatus::Unchanged;
        let ids = match self.storage.get_project_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read project list");
                return Outcome {
                    value: None,
                    local: LocalStatus::Failed(e.to_string()),
                    remote: RemoteStatus::NotRequired,
                };
            }
        };

        self.projects.clear();
        for id in ids {
            match self.storage.get_project(&id).await {
                Ok(Some(project)) => self.projects.push(project),
                Ok(None) => tracing::warn!(project = %id, "listed project has no record"),
                Err(e) => {
                    tracing::warn!(project = %id, error = %e, "skipping unreadable project");
                    local = local.merge(LocalStatus::Failed(e.to_string()));
                }
            }
        }
        self.recent = self.storage.load_recent_projects().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load recent projects");
            Vec::new()
        });

        let current = self.storage.get_current_project_id().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load current project id");
            None
        });
        let Some(project) = current
            .and_then(|id| self.projects.iter().find(|p| p.id == id))
            .cloned()
        else {
            return Outcome {
                value: None,
                local,
                remote: RemoteStatus::NotRequired,
            };
        };

        let id = project.id.clone();
        let session = self.load_session(&id).await;
        match self.store.open_project(project, session) {
            Ok(result) => {
                local = local.merge(self.run_local(&result.effects).await);
                tracing::info!(project = %id, projects = self.projects.len(), "workspace restored");
                Outcome {
                    value: Some(id),
                    local,
                    remote: RemoteStatus::NotRequired,
                }
            }
            Err(e) => {
                tracing::warn!(project = %id, error = %e, "failed to reopen project");
                Outcome {
                    value: None,
                    local,
                    remote: RemoteStatus::NotRequired,
                }
            }
        }
    }

    fn local_project(name: &str, template: ProjectTemplate) -> Result<Project> {
        let id = ProjectId::generate();
        let tree = template
            .build()
            .map_err(|e| WorkspaceError::corrupt(&id, e))?;
        Ok(Project {
            id,
            name: name.to_string(),
            path: format!("/{name}"),
            files: tree.records(),
            created_at: Utc::now(),
            user_id: None,
            is_public: false,
            description: String::new(),
        })
    }

    /// Creates a project and opens it. Signed in and online, the server
    /// creates it; otherwise, or when the server fails, it is local-only.
    pub async fn create_new_project(
        &mut self,
        name: &str,
        template: ProjectTemplate,
    ) -> Result<Outcome<ProjectId>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::InvalidName(name.to_string()));
        }

        let mut remote = RemoteStatus::NotRequired;
        let user = self.user.clone();
        let project = match user {
            Some(user) if !self.sync.is_offline() => {
                match self.remote.create_project(&user, name).await {
                    Ok(project) => {
                        remote = RemoteStatus::Acknowledged;
                        project
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "remote create failed, creating locally");
                        remote = RemoteStatus::Failed(e);
                        Self::local_project(name, template)?
                    }
                }
            }
            _ => Self::local_project(name, template)?,
        };

        let id = project.id.clone();
        tracing::info!(project = %id, remote = project.is_remote(), "project created");
        let saved = local_status(self.storage.save_project(&project).await, "project");
        self.upsert_project(project.clone());
        let opened = self.activate(project).await?;
        Ok(Outcome {
            value: id,
            local: saved.merge(opened.local),
            remote,
        })
    }

    async fn activate(&mut self, project: Project) -> Result<Outcome<()>> {
        let session = self.load_session(&project.id).await;
        let summary = project.summary();
        let result = self.store.open_project(project, session)?;
        let local = self.run_local(&result.effects).await;
        let recent = self.touch_recent(summary).await;
        Ok(Outcome {
            value: (),
            local: local.merge(recent),
            remote: RemoteStatus::NotRequired,
        })
    }

    async fn lookup_project(&mut self, id: &ProjectId) -> Result<Project> {
        if let Some(project) = self.projects.iter().find(|p| &p.id == id) {
            return Ok(project.clone());
        }
        match self.storage.get_project(id).await? {
            Some(project) => {
                self.upsert_project(project.clone());
                Ok(project)
            }
            None => Err(WorkspaceError::NotFound(Entity::Project(id.clone()))),
        }
    }

    /// Opens a known project with its persisted tabs.
    pub async fn open_project(&mut self, id: &ProjectId) -> Result<Outcome<()>> {
        let project = self.lookup_project(id).await?;
        self.activate(project).await
    }

    /// Like `open_project`, but an unknown id closes the current project.
    /// Returns whether a project is open afterwards.
    pub async fn select_project(&mut self, id: &ProjectId) -> Result<Outcome<bool>> {
        match self.open_project(id).await {
            Ok(outcome) => Ok(outcome.map(|()| true)),
            Err(WorkspaceError::NotFound(_)) => Ok(self.close_project().await.map(|_| false)),
            Err(e) => Err(e),
        }
    }

    pub async fn close_project(&mut self) -> Outcome<bool> {
        let result = self.store.close_project();
        self.finish(result).await
    }

    /// Removes the project locally and, when remote-backed and online, on the
    /// server. A failed remote delete is reported, not retried.
    pub async fn delete_project(&mut self, id: &ProjectId) -> Result<Outcome<()>> {
        let project = self.lookup_project(id).await?;
        if self.current_project_id() == Some(id) {
            self.store.close_project();
        }
        self.projects.retain(|p| &p.id != id);
        let recent_before = self.recent.len();
        self.recent.retain(|r| &r.id != id);

        let mut local = local_status(self.storage.delete_project(id).await, "delete project");
        if self.recent.len() != recent_before {
            local = local.merge(local_status(
                self.storage.save_recent_projects(&self.recent).await,
                "recent projects",
            ));
        }
        let remote = if project.is_remote() {
            self.sync.delete_project(id).await
        } else {
            RemoteStatus::NotRequired
        };
        tracing::info!(project = %id, "project deleted");
        Ok(Outcome {
            value: (),
            local,
            remote,
        })
    }

    /// Replaces the signed-in user's remote projects with the server's list.
    /// Local-only projects and the current project's local state are kept.
    /// Returns the number of projects the server reported.
    pub async fn refresh_projects(&mut self) -> Result<Outcome<usize>> {
        let Some(user) = self.user.clone() else {
            return Ok(Outcome::unchanged(0));
        };
        if self.sync.is_offline() {
            return Err(WorkspaceError::Offline);
        }
        let fetched = match self.remote.get_user_projects(&user).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch projects");
                return Ok(Outcome {
                    value: 0,
                    local: LocalStatus::Unchanged,
                    remote: RemoteStatus::Failed(e),
                });
            }
        };

        let current = self.current_project_id().cloned();
        self.projects.retain(|p| {
            p.user_id.as_ref() != Some(&user) || current.as_ref() == Some(&p.id)
        });
        let count = fetched.len();
        let mut local = LocalStatus::Unchanged;
        for project in fetched {
            if current.as_ref() == Some(&project.id) {
                continue;
            }
            local = local.merge(local_status(
                self.storage.save_project(&project).await,
                "project",
            ));
            self.upsert_project(project);
        }
        Ok(Outcome {
            value: count,
            local,
            remote: RemoteStatus::Acknowledged,
        })
    }

    /// Full two-way sync of the current project. The server's snapshot
    /// replaces local state; dirty working copies survive.
    pub async fn sync_with_server(&mut self) -> Result<Outcome<()>> {
        let open = self.store.project().ok_or(WorkspaceError::NoActiveProject)?;
        if !open.is_remote() {
            return Ok(Outcome::unchanged(()));
        }
        let snapshot = open.snapshot();
        let (remote, canonical) = self.sync.sync_project(&snapshot).await;
        let local = match canonical {
            Some(canonical) => self.absorb_canonical(canonical).await,
            None => LocalStatus::Unchanged,
        };
        Ok(Outcome {
            value: (),
            local,
            remote,
        })
    }

    /// Returns the new `is_public` value.
    pub async fn toggle_public(&mut self) -> Result<Outcome<bool>> {
        let result = self.store.toggle_public()?;
        Ok(self.finish(result).await)
    }

    /// Pretty JSON snapshot of the current project.
    pub fn export_project(&self) -> Result<String> {
        let project = self
            .current_project()
            .ok_or(WorkspaceError::NoActiveProject)?;
        serde_json::to_string_pretty(&project).map_err(|e| StorageError::from(e).into())
    }

    pub fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<FileSearchResult>> {
        self.store.search(query, options)
    }

    // ---- file system ----

    pub async fn create_new_file(
        &mut self,
        name: &str,
        parent: Option<&FileId>,
    ) -> Result<Outcome<File>> {
        let result = self.store.create_file(name, parent)?;
        Ok(self.finish(result).await)
    }

    pub async fn create_new_folder(
        &mut self,
        name: &str,
        parent: Option<&FileId>,
    ) -> Result<Outcome<File>> {
        let result = self.store.create_folder(name, parent)?;
        Ok(self.finish(result).await)
    }

    pub async fn delete_file(&mut self, id: &FileId) -> Result<Outcome<Vec<FileId>>> {
        let result = self.store.delete_file(id)?;
        Ok(self.finish(result).await)
    }

    pub async fn rename_file(&mut self, id: &FileId, new_name: &str) -> Result<Outcome<File>> {
        let result = self.store.rename_file(id, new_name)?;
        Ok(self.finish(result).await)
    }

    /// `None` moves to the project root.
    pub async fn move_file(
        &mut self,
        id: &FileId,
        target: Option<&FileId>,
    ) -> Result<Outcome<File>> {
        let result = self.store.move_file(id, target)?;
        Ok(self.finish(result).await)
    }

    pub fn copy_file(&mut self, id: &FileId) -> Result<()> {
        self.store.copy_file(id)
    }

    pub async fn paste_file(&mut self, target: Option<&FileId>) -> Result<Outcome<Vec<FileId>>> {
        let result = self.store.paste_file(target)?;
        Ok(self.finish(result).await)
    }

    /// Copies the entry next to itself under a free name. The clipboard is
    /// left untouched, so a later paste still inserts what was copied.
    pub async fn duplicate_file(&mut self, id: &FileId) -> Result<Outcome<Vec<FileId>>> {
        let result = self.store.duplicate_file(id)?;
        Ok(self.finish(result).await)
    }

    // ---- editor session ----

    pub async fn open_file(&mut self, id: &FileId) -> Result<Outcome<bool>> {
        let result = self.store.open_file(id)?;
        Ok(self.finish(result).await)
    }

    pub async fn close_file(&mut self, id: &FileId) -> Result<Outcome<bool>> {
        let result = self.store.close_file(id)?;
        Ok(self.finish(result).await)
    }

    pub async fn set_current_file(&mut self, id: &FileId) -> Result<Outcome<bool>> {
        let result = self.store.set_current_file(id)?;
        Ok(self.finish(result).await)
    }

    pub async fn reorder_tabs(&mut self, order: &[FileId]) -> Result<Outcome<()>> {
        let result = self.store.reorder_tabs(order)?;
        Ok(self.finish(result).await)
    }

    pub async fn update_file_content(&mut self, id: &FileId, content: &str) -> Result<Outcome<()>> {
        let result = self.store.update_file_content(id, content)?;
        Ok(self.finish(result).await)
    }

    /// Returns whether the committed content changed.
    pub async fn save_file(&mut self, id: &FileId, content: &str) -> Result<Outcome<bool>> {
        let result = self.store.save_file(id, content)?;
        Ok(self.finish(result).await)
    }

    // ---- connectivity ----

    async fn after_connectivity(&mut self, back_online: bool) -> Outcome<Option<SyncReport>> {
        if !back_online {
            return Outcome::unchanged(None);
        }
        let live = self.current_project();
        match self.sync.drain(live.as_ref()).await {
            Ok(report) => {
                let local = self.absorb_report(&report).await;
                Outcome {
                    remote: report_status(&report),
                    value: Some(report),
                    local,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "drain after reconnect failed");
                Outcome::unchanged(None)
            }
        }
    }

    /// Network event. Coming back online drains the queue.
    pub async fn network_changed(&mut self, online: bool) -> Outcome<Option<SyncReport>> {
        let back_online = self.sync.network_changed(online);
        self.after_connectivity(back_online).await
    }

    /// Manual offline override.
    pub async fn set_offline(&mut self, offline: bool) -> Outcome<Option<SyncReport>> {
        let back_online = self.sync.set_offline(offline);
        self.after_connectivity(back_online).await
    }

    /// Fails with `Offline` while offline.
    pub async fn sync_now(&mut self) -> Result<Outcome<SyncReport>> {
        let live = self.current_project();
        let report = self.sync.sync_now(live.as_ref()).await?;
        let local = self.absorb_report(&report).await;
        Ok(Outcome {
            remote: report_status(&report),
            value: report,
            local,
        })
    }

    /// Drives the periodic auto-sync. Call it from the host's timer.
    pub async fn tick(&mut self, now: Instant) -> Option<Outcome<SyncReport>> {
        let live = self.current_project();
        match self.sync.tick(now, live.as_ref()).await? {
            Ok(report) => {
                let local = self.absorb_report(&report).await;
                Some(Outcome {
                    remote: report_status(&report),
                    value: report,
                    local,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "auto sync failed");
                None
            }
        }
    }

    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        self.sync.last_sync().await
    }

    pub async fn storage_usage(&self) -> Result<StorageUsage> {
        Ok(self.storage.usage().await?)
    }
}
