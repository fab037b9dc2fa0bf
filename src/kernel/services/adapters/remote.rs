//! 进程内远程服务
//!
//! `MemoryRemote` stands in for the hosted backend: it keeps projects in a
//! map, can be switched off to simulate an outage and can fail a number of
//! upcoming calls on demand.

use crate::kernel::services::ports::remote::{
    RemoteError, RemoteFuture, RemoteProjectService, SyncPayload,
};
use crate::kernel::template::ProjectTemplate;
use crate::models::{FileId, Project, ProjectId, ProjectPatch, UserId};
use chrono::Utc;
use rustc_hash::FxHashMap;
use std::future::ready;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    GetUserProjects,
    CreateProject,
    SyncProject,
    UpdateProject,
    DeleteProject,
    UpdateFile,
}

#[derive(Default)]
struct Inner {
    projects: FxHashMap<ProjectId, Project>,
    calls: FxHashMap<RemoteCall, usize>,
    failures: FxHashMap<RemoteCall, usize>,
}

#[derive(Clone)]
pub struct MemoryRemote {
    inner: Arc<Mutex<Inner>>,
    available: Arc<AtomicBool>,
    generation: Arc<AtomicUsize>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
            generation: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// The next `count` calls of `call` fail with `Unavailable`.
    pub fn fail_next(&self, call: RemoteCall, count: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            *inner.failures.entry(call).or_default() += count;
        }
    }

    pub fn call_count(&self, call: RemoteCall) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.calls.get(&call).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Bumped by every successful mutation.
    pub fn generation(&self) -> usize {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn project(&self, id: &ProjectId) -> Option<Project> {
        self.inner.lock().ok()?.projects.get(id).cloned()
    }

    pub fn insert_project(&self, project: Project) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.projects.insert(project.id.clone(), project);
        }
    }

    /// Counts the call and runs `f` unless the service is down or a failure
    /// is scheduled for this call.
    fn call<T>(
        &self,
        call: RemoteCall,
        f: impl FnOnce(&mut Inner) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| RemoteError::Rejected("remote state poisoned".to_string()))?;
        *inner.calls.entry(call).or_default() += 1;
        if !self.available.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable);
        }
        if let Some(left) = inner.failures.get_mut(&call) {
            if *left > 0 {
                *left -= 1;
                return Err(RemoteError::Unavailable);
            }
        }
        f(&mut inner)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl RemoteProjectService for MemoryRemote {
    fn get_user_projects<'a>(&'a self, user: &'a UserId) -> RemoteFuture<'a, Vec<Project>> {
        let result = self.call(RemoteCall::GetUserProjects, |inner| {
            let mut projects: Vec<Project> = inner
                .projects
                .values()
                .filter(|p| p.user_id.as_ref() == Some(user))
                .cloned()
                .collect();
            projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(projects)
        });
        Box::pin(ready(result))
    }

    fn create_project<'a>(&'a self, user: &'a UserId, name: &'a str) -> RemoteFuture<'a, Project> {
        let result = self.call(RemoteCall::CreateProject, |inner| {
            let tree = ProjectTemplate::Starter
                .build()
                .map_err(|e| RemoteError::Rejected(e.to_string()))?;
            let project = Project {
                id: ProjectId::generate(),
                name: name.to_string(),
                path: format!("/{name}"),
                files: tree.records(),
                created_at: Utc::now(),
                user_id: Some(user.clone()),
                is_public: false,
                description: String::new(),
            };
            inner.projects.insert(project.id.clone(), project.clone());
            Ok(project)
        });
        if result.is_ok() {
            self.bump();
        }
        Box::pin(ready(result))
    }

    fn sync_project(&self, payload: SyncPayload) -> RemoteFuture<'_, Project> {
        let result = self.call(RemoteCall::SyncProject, |inner| {
            let project = payload.into_project();
            inner.projects.insert(project.id.clone(), project.clone());
            Ok(project)
        });
        if result.is_ok() {
            self.bump();
        }
        Box::pin(ready(result))
    }

    fn update_project<'a>(
        &'a self,
        id: &'a ProjectId,
        patch: ProjectPatch,
    ) -> RemoteFuture<'a, ()> {
        let result = self.call(RemoteCall::UpdateProject, |inner| {
            let project = inner
                .projects
                .get_mut(id)
                .ok_or_else(|| RemoteError::NotFound(format!("project {id}")))?;
            patch.apply(project);
            Ok(())
        });
        if result.is_ok() {
            self.bump();
        }
        Box::pin(ready(result))
    }

    fn delete_project<'a>(&'a self, id: &'a ProjectId) -> RemoteFuture<'a, ()> {
        let result = self.call(RemoteCall::DeleteProject, |inner| {
            inner
                .projects
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| RemoteError::NotFound(format!("project {id}")))
        });
        if result.is_ok() {
            self.bump();
        }
        Box::pin(ready(result))
    }

    fn update_file<'a>(
        &'a self,
        project: &'a ProjectId,
        file: &'a FileId,
        content: &'a str,
    ) -> RemoteFuture<'a, ()> {
        let result = self.call(RemoteCall::UpdateFile, |inner| {
            let record = inner
                .projects
                .get_mut(project)
                .ok_or_else(|| RemoteError::NotFound(format!("project {project}")))?
                .files
                .iter_mut()
                .find(|f| &f.id == file)
                .ok_or_else(|| RemoteError::NotFound(format!("file {file}")))?;
            record.content = Some(content.to_string());
            Ok(())
        });
        if result.is_ok() {
            self.bump();
        }
        Box::pin(ready(result))
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/remote.rs"]
mod tests;
