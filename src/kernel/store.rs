use super::editor::EditorSession;
use super::error::{Entity, Result, WorkspaceError};
use super::search::{search_tree, FileSearchResult, SearchOptions};
use super::state::OpenProject;
use super::Effect;
use crate::models::{File, FileId, FileKind, NodeSnapshot, Project, ProjectPatch};

/// Value of a mutation plus the side effects the caller must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult<T> {
    pub value: T,
    pub effects: Vec<Effect>,
}

impl<T> DispatchResult<T> {
    fn new(value: T, effects: Vec<Effect>) -> Self {
        Self { value, effects }
    }

    fn pure(value: T) -> Self {
        Self {
            value,
            effects: Vec::new(),
        }
    }
}

/// Pure project state: the current project and the clipboard.
///
/// Every mutator validates first and mutates second, so an `Err` leaves the
/// state untouched.
#[derive(Debug, Default)]
pub struct Store {
    project: Option<OpenProject>,
    clipboard: Option<NodeSnapshot>,
}

fn structural_effects(project: &OpenProject, session_changed: bool) -> Vec<Effect> {
    let mut effects = vec![Effect::PersistProject];
    if session_changed {
        effects.push(Effect::PersistSession);
    }
    if project.is_remote() {
        effects.push(Effect::SyncProject);
    }
    effects
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(&self) -> Option<&OpenProject> {
        self.project.as_ref()
    }

    fn active(&self) -> Result<&OpenProject> {
        self.project.as_ref().ok_or(WorkspaceError::NoActiveProject)
    }

    fn active_mut(&mut self) -> Result<&mut OpenProject> {
        self.project.as_mut().ok_or(WorkspaceError::NoActiveProject)
    }

    pub fn clipboard(&self) -> Option<&NodeSnapshot> {
        self.clipboard.as_ref()
    }

    // ---- project lifecycle ----

    pub fn open_project(
        &mut self,
        project: Project,
        session: EditorSession,
    ) -> Result<DispatchResult<()>> {
        let open = OpenProject::load(project, session)?;
        tracing::info!(project = %open.id(), files = open.tree.len(), "project opened");
        self.project = Some(open);
        Ok(DispatchResult::new(
            (),
            vec![Effect::PersistCurrentProject, Effect::PersistSession],
        ))
    }

    pub fn close_project(&mut self) -> DispatchResult<bool> {
        match self.project.take() {
            Some(open) => {
                tracing::info!(project = %open.id(), "project closed");
                DispatchResult::new(true, vec![Effect::PersistCurrentProject])
            }
            None => DispatchResult::pure(false),
        }
    }

    /// Swaps in a canonical snapshot of the current project, keeping open
    /// tabs whose files survive and their dirty working copies.
    pub fn replace_project(&mut self, canonical: Project) -> Result<DispatchResult<()>> {
        let open = self.active()?;
        if open.id() != &canonical.id {
            return Err(WorkspaceError::NotFound(Entity::Project(canonical.id)));
        }
        let replaced = OpenProject::load(canonical, open.session.clone())?;
        self.project = Some(replaced);
        Ok(DispatchResult::new(
            (),
            vec![Effect::PersistProject, Effect::PersistSession],
        ))
    }

    // ---- file system ----

    pub fn find_file(&self, id: &FileId) -> Option<File> {
        self.project.as_ref()?.tree.get(id)
    }

    fn create(
        &mut self,
        name: &str,
        parent: Option<&FileId>,
        kind: FileKind,
    ) -> Result<DispatchResult<File>> {
        let open = self.active_mut()?;
        let id = FileId::generate();
        open.tree
            .insert(parent, id.clone(), name, kind, String::new())?;
        let file = open
            .tree
            .get(&id)
            .ok_or_else(|| WorkspaceError::NotFound(Entity::File(id.clone())))?;
        let opened = open.session.open(&file);
        tracing::debug!(project = %open.id(), path = %file.path, "created");
        let effects = structural_effects(open, opened);
        Ok(DispatchResult::new(file, effects))
    }

    /// Creates an empty file and opens it.
    pub fn create_file(
        &mut self,
        name: &str,
        parent: Option<&FileId>,
    ) -> Result<DispatchResult<File>> {
        self.create(name, parent, FileKind::File)
    }

    pub fn create_folder(
        &mut self,
        name: &str,
        parent: Option<&FileId>,
    ) -> Result<DispatchResult<File>> {
        self.create(name, parent, FileKind::Directory)
    }

    /// Removes the entry and its whole subtree and closes their tabs. Returns
    /// the removed ids.
    pub fn delete_file(&mut self, id: &FileId) -> Result<DispatchResult<Vec<FileId>>> {
        let open = self.active_mut()?;
        let removed = open.tree.remove(id)?;
        let closed = open.session.retain_existing(&open.tree);
        tracing::debug!(project = %open.id(), removed = removed.len(), "deleted");

        let mut effects = structural_effects(open, !closed.is_empty());
        if open.is_remote() {
            effects.push(Effect::DropPending {
                project: open.id().clone(),
                files: removed.clone(),
            });
        }
        Ok(DispatchResult::new(removed, effects))
    }

    pub fn rename_file(&mut self, id: &FileId, new_name: &str) -> Result<DispatchResult<File>> {
        let open = self.active_mut()?;
        open.tree.rename(id, new_name)?;
        let tabs_changed = open.session.refresh_from(&open.tree);
        let file = open
            .tree
            .get(id)
            .ok_or_else(|| WorkspaceError::NotFound(Entity::File(id.clone())))?;
        let effects = structural_effects(open, tabs_changed);
        Ok(DispatchResult::new(file, effects))
    }

    /// Moves into `target`, or to the project root when `target` is `None`.
    pub fn move_file(
        &mut self,
        id: &FileId,
        target: Option<&FileId>,
    ) -> Result<DispatchResult<File>> {
        let open = self.active_mut()?;
        open.tree.move_to(id, target)?;
        let tabs_changed = open.session.refresh_from(&open.tree);
        let file = open
            .tree
            .get(id)
            .ok_or_else(|| WorkspaceError::NotFound(Entity::File(id.clone())))?;
        let effects = structural_effects(open, tabs_changed);
        Ok(DispatchResult::new(file, effects))
    }

    /// Snapshots the entry (and subtree) into the clipboard.
    pub fn copy_file(&mut self, id: &FileId) -> Result<()> {
        let open = self.active()?;
        let snapshot = open
            .tree
            .snapshot(id)
            .ok_or_else(|| WorkspaceError::NotFound(Entity::File(id.clone())))?;
        self.clipboard = Some(snapshot);
        Ok(())
    }

    fn graft_copy(
        open: &mut OpenProject,
        target: Option<&FileId>,
        snapshot: &NodeSnapshot,
    ) -> Result<Vec<FileId>> {
        let name = open
            .tree
            .unique_child_name(target, &snapshot.name, snapshot.kind)?;
        Ok(open.tree.graft(target, &name, snapshot)?)
    }

    /// Deep-copies the clipboard under `target` (root when `None`). Returns
    /// the new ids, top-level copy first; empty when the clipboard is empty.
    pub fn paste_file(&mut self, target: Option<&FileId>) -> Result<DispatchResult<Vec<FileId>>> {
        let Some(snapshot) = self.clipboard.clone() else {
            self.active()?;
            return Ok(DispatchResult::pure(Vec::new()));
        };
        let open = self.active_mut()?;
        let created = Self::graft_copy(open, target, &snapshot)?;
        let effects = structural_effects(open, false);
        Ok(DispatchResult::new(created, effects))
    }

    /// Copies the entry next to itself. The clipboard is left alone.
    pub fn duplicate_file(&mut self, id: &FileId) -> Result<DispatchResult<Vec<FileId>>> {
        let open = self.active_mut()?;
        let snapshot = open
            .tree
            .snapshot(id)
            .ok_or_else(|| WorkspaceError::NotFound(Entity::File(id.clone())))?;
        let parent = open.tree.parent(id);
        let created = Self::graft_copy(open, parent.as_ref(), &snapshot)?;
        let effects = structural_effects(open, false);
        Ok(DispatchResult::new(created, effects))
    }

    // ---- editor session ----

    fn existing_file(open: &OpenProject, id: &FileId) -> Result<File> {
        open.tree
            .get(id)
            .ok_or_else(|| WorkspaceError::NotFound(Entity::File(id.clone())))
    }

    fn session_effects(changed: bool) -> Vec<Effect> {
        if changed {
            vec![Effect::PersistSession]
        } else {
            Vec::new()
        }
    }

    /// Opens or activates a tab. Directories are ignored.
    pub fn open_file(&mut self, id: &FileId) -> Result<DispatchResult<bool>> {
        let open = self.active_mut()?;
        let file = Self::existing_file(open, id)?;
        let changed = open.session.open(&file);
        Ok(DispatchResult::new(changed, Self::session_effects(changed)))
    }

    /// Discards the tab and its working copy. Closing a file that is not open
    /// does nothing.
    pub fn close_file(&mut self, id: &FileId) -> Result<DispatchResult<bool>> {
        let open = self.active_mut()?;
        let changed = open.session.close(id);
        Ok(DispatchResult::new(changed, Self::session_effects(changed)))
    }

    pub fn set_current_file(&mut self, id: &FileId) -> Result<DispatchResult<bool>> {
        let open = self.active_mut()?;
        if !open.session.is_open(id) {
            return Err(WorkspaceError::NotFound(Entity::File(id.clone())));
        }
        let changed = open.session.set_current(id);
        Ok(DispatchResult::new(changed, Self::session_effects(changed)))
    }

    pub fn reorder_tabs(&mut self, order: &[FileId]) -> Result<DispatchResult<()>> {
        let open = self.active_mut()?;
        if !open.session.reorder(order) {
            return Err(WorkspaceError::InvalidTabOrder);
        }
        Ok(DispatchResult::new((), vec![Effect::PersistSession]))
    }

    /// Edits the working copy, opening the tab first if needed. The committed
    /// file is untouched.
    pub fn update_file_content(&mut self, id: &FileId, content: &str) -> Result<DispatchResult<()>> {
        let open = self.active_mut()?;
        let file = Self::existing_file(open, id)?;
        if file.is_dir() {
            return Err(WorkspaceError::InvalidTarget(format!(
                "{} is a directory",
                file.path
            )));
        }
        if !open.session.is_open(id) {
            open.session.open(&file);
        }
        open.session.update_content(id, content);
        Ok(DispatchResult::new((), vec![Effect::PersistSession]))
    }

    /// Commits `content` and clears the unsaved marker. Returns whether the
    /// committed content changed; only then is a push requested.
    pub fn save_file(&mut self, id: &FileId, content: &str) -> Result<DispatchResult<bool>> {
        let open = self.active_mut()?;
        let changed = open.tree.set_content(id, content)?;
        let was_dirty = open.session.has_unsaved(id);
        let tab_differs = open
            .session
            .tab(id)
            .is_some_and(|tab| tab.content != content);
        open.session.mark_saved(id, content);

        let mut effects = Vec::new();
        if changed {
            effects.push(Effect::PersistProject);
        }
        if was_dirty || tab_differs {
            effects.push(Effect::PersistSession);
        }
        if changed && open.is_remote() {
            effects.push(Effect::PushFile {
                project: open.id().clone(),
                file: id.clone(),
                content: content.to_string(),
            });
        }
        Ok(DispatchResult::new(changed, effects))
    }

    pub fn has_unsaved_changes(&self, id: &FileId) -> bool {
        self.project
            .as_ref()
            .is_some_and(|open| open.session.has_unsaved(id))
    }

    // ---- project metadata ----

    /// Flips `is_public`, returning the new value.
    pub fn toggle_public(&mut self) -> Result<DispatchResult<bool>> {
        let open = self.active_mut()?;
        open.meta.is_public = !open.meta.is_public;
        let is_public = open.meta.is_public;
        let mut effects = vec![Effect::PersistProject];
        if open.is_remote() {
            effects.push(Effect::UpdateProject {
                project: open.id().clone(),
                patch: ProjectPatch {
                    is_public: Some(is_public),
                    ..ProjectPatch::default()
                },
            });
        }
        Ok(DispatchResult::new(is_public, effects))
    }

    pub fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<FileSearchResult>> {
        let open = self.active()?;
        Ok(search_tree(&open.tree, query, options))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/store.rs"]
mod tests;
