use crate::kernel::language::detect_language;
use crate::models::{File, FileId, FileKind, FileTree};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Open-editor projection of a file. `content` is the working copy and may
/// diverge from the committed file until saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTab {
    pub id: FileId,
    pub name: String,
    pub path: String,
    pub language: String,
    pub content: String,
}

impl FileTab {
    pub fn from_file(file: &File) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            path: file.path.clone(),
            language: detect_language(&file.name).to_string(),
            content: file.content_str().to_string(),
        }
    }
}

/// Open tabs, the active tab and the set of dirty working copies for one
/// project.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    tabs: Vec<FileTab>,
    current: Option<FileId>,
    unsaved: FxHashSet<FileId>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a session from persisted parts, dropping markers that point
    /// at tabs which are no longer open.
    pub fn restore(tabs: Vec<FileTab>, current: Option<FileId>, unsaved: Vec<FileId>) -> Self {
        let mut session = Self {
            tabs,
            current: None,
            unsaved: FxHashSet::default(),
        };
        session.current = current.filter(|id| session.is_open(id));
        session.unsaved = unsaved
            .into_iter()
            .filter(|id| session.is_open(id))
            .collect();
        session
    }

    pub fn tabs(&self) -> &[FileTab] {
        &self.tabs
    }

    pub fn tab(&self, id: &FileId) -> Option<&FileTab> {
        self.tabs.iter().find(|t| &t.id == id)
    }

    fn position(&self, id: &FileId) -> Option<usize> {
        self.tabs.iter().position(|t| &t.id == id)
    }

    pub fn is_open(&self, id: &FileId) -> bool {
        self.position(id).is_some()
    }

    pub fn current_id(&self) -> Option<&FileId> {
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&FileTab> {
        self.current.as_ref().and_then(|id| self.tab(id))
    }

    /// Dirty ids in tab order.
    pub fn unsaved_ids(&self) -> Vec<FileId> {
        self.tabs
            .iter()
            .filter(|t| self.unsaved.contains(&t.id))
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn has_unsaved(&self, id: &FileId) -> bool {
        self.unsaved.contains(id)
    }

    /// Opens `file` (or activates its tab). Directories are ignored.
    pub fn open(&mut self, file: &File) -> bool {
        if file.kind == FileKind::Directory {
            return false;
        }
        if self.is_open(&file.id) {
            return self.set_current(&file.id);
        }
        self.tabs.push(FileTab::from_file(file));
        self.current = Some(file.id.clone());
        true
    }

    /// Closes a tab without saving. When the active tab closes, the tab just
    /// before it becomes active.
    pub fn close(&mut self, id: &FileId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.tabs.remove(index);
        self.unsaved.remove(id);
        if self.current.as_ref() == Some(id) {
            self.current = if self.tabs.is_empty() {
                None
            } else {
                let next = index.saturating_sub(1).min(self.tabs.len() - 1);
                Some(self.tabs[next].id.clone())
            };
        }
        true
    }

    /// Returns `false` when the id has no open tab or is already active.
    pub fn set_current(&mut self, id: &FileId) -> bool {
        if !self.is_open(id) || self.current.as_ref() == Some(id) {
            return false;
        }
        self.current = Some(id.clone());
        true
    }

    /// Applies a new tab order. `order` must be a permutation of the open tab
    /// ids; anything else leaves the session untouched.
    pub fn reorder(&mut self, order: &[FileId]) -> bool {
        if order.len() != self.tabs.len() {
            return false;
        }
        let mut seen = FxHashSet::default();
        if !order.iter().all(|id| seen.insert(id) && self.is_open(id)) {
            return false;
        }
        let mut tabs = std::mem::take(&mut self.tabs);
        let mut reordered = Vec::with_capacity(tabs.len());
        for id in order {
            if let Some(pos) = tabs.iter().position(|t| &t.id == id) {
                reordered.push(tabs.swap_remove(pos));
            }
        }
        self.tabs = reordered;
        true
    }

    /// Edits the working copy and marks it dirty. `false` if not open.
    pub fn update_content(&mut self, id: &FileId, content: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.tabs[index].content = content.to_string();
        self.unsaved.insert(id.clone());
        true
    }

    pub fn mark_saved(&mut self, id: &FileId, content: &str) {
        if let Some(index) = self.position(id) {
            self.tabs[index].content = content.to_string();
        }
        self.unsaved.remove(id);
    }

    /// Closes every tab whose file no longer exists in `tree`. Returns the
    /// closed ids.
    pub fn retain_existing(&mut self, tree: &FileTree) -> Vec<FileId> {
        let gone: Vec<FileId> = self
            .tabs
            .iter()
            .filter(|t| !tree.contains(&t.id))
            .map(|t| t.id.clone())
            .collect();
        for id in &gone {
            self.close(id);
        }
        gone
    }

    /// Re-reads name, path and language of every tab from `tree`. Clean tabs
    /// also pick up the committed content; dirty working copies are kept.
    pub fn refresh_from(&mut self, tree: &FileTree) -> bool {
        let mut changed = false;
        for tab in &mut self.tabs {
            let (Some(name), Some(path)) = (tree.name(&tab.id), tree.path(&tab.id)) else {
                continue;
            };
            if tab.name != name || tab.path != path {
                tab.name = name.to_string();
                tab.path = path;
                tab.language = detect_language(&tab.name).to_string();
                changed = true;
            }
            if !self.unsaved.contains(&tab.id) {
                if let Some(content) = tree.content(&tab.id) {
                    if tab.content != content {
                        tab.content = content.to_string();
                        changed = true;
                    }
                }
            }
        }
        changed
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/editor/state.rs"]
mod tests;
