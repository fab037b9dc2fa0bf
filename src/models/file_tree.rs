//! 文件树数据模型
//!
//! Nodes live in a slotmap arena. Every node owns its ordered child list and
//! keeps a back-reference to its parent; paths are derived by walking parent
//! links, so renaming or moving a directory never rewrites descendants.
//! A hidden root node stands for the project root.

use super::project::{File, FileId, FileKind};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};

new_key_type! { struct NodeId; }

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileTreeError {
    #[error("unknown file id {0}")]
    UnknownId(FileId),
    #[error("path already exists: {0}")]
    PathExists(String),
    #[error("{0} is not a directory")]
    NotDirectory(String),
    #[error("{0} is a directory")]
    NotFile(String),
    #[error("cannot move {0} into itself or its own subtree")]
    MoveIntoDescendant(String),
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("duplicate file id {0}")]
    DuplicateId(FileId),
    #[error("inconsistent file records: {0}")]
    Inconsistent(String),
}

type Result<T> = std::result::Result<T, FileTreeError>;

#[derive(Debug, Clone)]
struct Node {
    id: FileId,
    kind: FileKind,
    name: String,
    parent: Option<NodeId>,
    children: Option<Vec<NodeId>>,
    content: String,
}

impl Node {
    fn new(id: FileId, name: String, kind: FileKind, content: String) -> Self {
        let children = match kind {
            FileKind::Directory => Some(Vec::new()),
            FileKind::File => None,
        };
        Self {
            id,
            kind,
            name,
            parent: None,
            children,
            content,
        }
    }
}

/// Owned copy of a subtree, detached from any arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub name: String,
    pub kind: FileKind,
    pub content: String,
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(NodeSnapshot::node_count)
            .sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub struct FileTree {
    arena: SlotMap<NodeId, Node>,
    root: NodeId,
    index: FxHashMap<FileId, NodeId>,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FileTreeError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn join_path(parent: &str, name: &str) -> String {
    format!("{parent}/{name}")
}

/// Splits `name` into stem and extension (dot included). Dotfiles have no
/// extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(pos) => name.split_at(pos),
    }
}

impl FileTree {
    pub fn new() -> Self {
        let mut arena = SlotMap::with_key();
        let root = arena.insert(Node::new(
            FileId::new(String::new()),
            String::new(),
            FileKind::Directory,
            String::new(),
        ));
        Self {
            arena,
            root,
            index: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.index.contains_key(id)
    }

    fn key(&self, id: &FileId) -> Result<NodeId> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| FileTreeError::UnknownId(id.clone()))
    }

    fn dir_key(&self, dir: Option<&FileId>) -> Result<NodeId> {
        let Some(id) = dir else {
            return Ok(self.root);
        };
        let key = self.key(id)?;
        if self.arena[key].kind != FileKind::Directory {
            return Err(FileTreeError::NotDirectory(self.path_of(key)));
        }
        Ok(key)
    }

    fn path_of(&self, key: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = key;
        while let Some(node) = self.arena.get(current) {
            let Some(parent) = node.parent else {
                break;
            };
            names.push(node.name.as_str());
            current = parent;
        }
        if names.is_empty() {
            return "/".to_string();
        }
        let mut path = String::new();
        for name in names.iter().rev() {
            path.push('/');
            path.push_str(name);
        }
        path
    }

    fn child_path(&self, parent: NodeId, name: &str) -> String {
        if parent == self.root {
            join_path("", name)
        } else {
            join_path(&self.path_of(parent), name)
        }
    }

    fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.arena[parent]
            .children
            .as_ref()?
            .iter()
            .copied()
            .find(|&child| self.arena[child].name == name)
    }

    fn is_ancestor_key(&self, ancestor: NodeId, mut descendant: NodeId) -> bool {
        while let Some(parent) = self.arena.get(descendant).and_then(|n| n.parent) {
            if parent == ancestor {
                return true;
            }
            descendant = parent;
        }
        false
    }

    pub fn kind(&self, id: &FileId) -> Option<FileKind> {
        self.index.get(id).map(|&key| self.arena[key].kind)
    }

    pub fn is_dir(&self, id: &FileId) -> bool {
        self.kind(id) == Some(FileKind::Directory)
    }

    pub fn name(&self, id: &FileId) -> Option<&str> {
        self.index.get(id).map(|&key| self.arena[key].name.as_str())
    }

    pub fn content(&self, id: &FileId) -> Option<&str> {
        self.index.get(id).map(|&key| self.arena[key].content.as_str())
    }

    pub fn path(&self, id: &FileId) -> Option<String> {
        self.index.get(id).map(|&key| self.path_of(key))
    }

    /// Parent directory id, `None` for root-level entries and unknown ids.
    pub fn parent(&self, id: &FileId) -> Option<FileId> {
        let key = *self.index.get(id)?;
        let parent = self.arena[key].parent?;
        (parent != self.root).then(|| self.arena[parent].id.clone())
    }

    pub fn children(&self, dir: Option<&FileId>) -> Result<Vec<FileId>> {
        let key = self.dir_key(dir)?;
        Ok(self.arena[key]
            .children
            .iter()
            .flatten()
            .map(|&child| self.arena[child].id.clone())
            .collect())
    }

    pub fn is_ancestor(&self, ancestor: &FileId, descendant: &FileId) -> bool {
        match (self.index.get(ancestor), self.index.get(descendant)) {
            (Some(&a), Some(&d)) => self.is_ancestor_key(a, d),
            _ => false,
        }
    }

    fn record(&self, key: NodeId) -> File {
        let node = &self.arena[key];
        let (content, children) = match node.kind {
            FileKind::File => (Some(node.content.clone()), None),
            FileKind::Directory => (
                None,
                Some(
                    node.children
                        .iter()
                        .flatten()
                        .map(|&child| self.arena[child].id.clone())
                        .collect(),
                ),
            ),
        };
        File {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            path: self.path_of(key),
            content,
            children,
        }
    }

    pub fn get(&self, id: &FileId) -> Option<File> {
        self.index.get(id).map(|&key| self.record(key))
    }

    pub fn find_by_path(&self, path: &str) -> Option<FileId> {
        let mut current = self.root;
        let mut matched = false;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            current = self.child_named(current, component)?;
            matched = true;
        }
        matched.then(|| self.arena[current].id.clone())
    }

    /// The id itself followed by every descendant, pre-order.
    pub fn subtree_ids(&self, id: &FileId) -> Vec<FileId> {
        let Some(&key) = self.index.get(id) else {
            return Vec::new();
        };
        self.collect_subtree(key)
            .into_iter()
            .map(|k| self.arena[k].id.clone())
            .collect()
    }

    fn collect_subtree(&self, key: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(children) = &self.arena[current].children {
                stack.extend(children.iter().rev().copied());
            }
        }
        out
    }

    pub fn insert(
        &mut self,
        parent: Option<&FileId>,
        id: FileId,
        name: &str,
        kind: FileKind,
        content: String,
    ) -> Result<()> {
        validate_name(name)?;
        let parent_key = self.dir_key(parent)?;
        if self.index.contains_key(&id) {
            return Err(FileTreeError::DuplicateId(id));
        }
        if self.child_named(parent_key, name).is_some() {
            return Err(FileTreeError::PathExists(self.child_path(parent_key, name)));
        }

        let mut node = Node::new(id.clone(), name.to_string(), kind, content);
        node.parent = Some(parent_key);
        let key = self.arena.insert(node);
        if let Some(children) = self.arena[parent_key].children.as_mut() {
            children.push(key);
        }
        self.index.insert(id, key);
        Ok(())
    }

    /// Returns whether the stored content changed.
    pub fn set_content(&mut self, id: &FileId, content: &str) -> Result<bool> {
        let key = self.key(id)?;
        if self.arena[key].kind != FileKind::File {
            return Err(FileTreeError::NotFile(self.path_of(key)));
        }
        let node = &mut self.arena[key];
        if node.content == content {
            return Ok(false);
        }
        node.content = content.to_string();
        Ok(true)
    }

    pub fn rename(&mut self, id: &FileId, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let key = self.key(id)?;
        if self.arena[key].name == new_name {
            return Ok(());
        }
        let parent = self.arena[key].parent.unwrap_or(self.root);
        if self.child_named(parent, new_name).is_some() {
            return Err(FileTreeError::PathExists(self.child_path(parent, new_name)));
        }
        self.arena[key].name = new_name.to_string();
        Ok(())
    }

    pub fn move_to(&mut self, id: &FileId, target: Option<&FileId>) -> Result<()> {
        let key = self.key(id)?;
        let target_key = self.dir_key(target)?;
        if target_key == key || self.is_ancestor_key(key, target_key) {
            return Err(FileTreeError::MoveIntoDescendant(self.path_of(key)));
        }

        let old_parent = self.arena[key].parent.unwrap_or(self.root);
        if old_parent == target_key {
            return Ok(());
        }
        let name = self.arena[key].name.clone();
        if self.child_named(target_key, &name).is_some() {
            return Err(FileTreeError::PathExists(self.child_path(target_key, &name)));
        }

        if let Some(children) = self.arena[old_parent].children.as_mut() {
            children.retain(|&child| child != key);
        }
        if let Some(children) = self.arena[target_key].children.as_mut() {
            children.push(key);
        }
        self.arena[key].parent = Some(target_key);
        Ok(())
    }

    /// Removes the node and its whole subtree, returning the removed ids in
    /// pre-order.
    pub fn remove(&mut self, id: &FileId) -> Result<Vec<FileId>> {
        let key = self.key(id)?;
        let parent = self.arena[key].parent.unwrap_or(self.root);
        if let Some(children) = self.arena[parent].children.as_mut() {
            children.retain(|&child| child != key);
        }

        let mut removed = Vec::new();
        for k in self.collect_subtree(key) {
            if let Some(node) = self.arena.remove(k) {
                self.index.remove(&node.id);
                removed.push(node.id);
            }
        }
        Ok(removed)
    }

    pub fn snapshot(&self, id: &FileId) -> Option<NodeSnapshot> {
        self.index.get(id).map(|&key| self.snapshot_key(key))
    }

    fn snapshot_key(&self, key: NodeId) -> NodeSnapshot {
        let node = &self.arena[key];
        NodeSnapshot {
            name: node.name.clone(),
            kind: node.kind,
            content: node.content.clone(),
            children: node
                .children
                .iter()
                .flatten()
                .map(|&child| self.snapshot_key(child))
                .collect(),
        }
    }

    /// Deep-copies `snapshot` under `parent` as `name`, giving every copy a
    /// fresh id. Returns the new ids, top-level copy first.
    pub fn graft(
        &mut self,
        parent: Option<&FileId>,
        name: &str,
        snapshot: &NodeSnapshot,
    ) -> Result<Vec<FileId>> {
        validate_name(name)?;
        let parent_key = self.dir_key(parent)?;
        if self.child_named(parent_key, name).is_some() {
            return Err(FileTreeError::PathExists(self.child_path(parent_key, name)));
        }

        let mut created = Vec::with_capacity(snapshot.node_count());
        let mut stack = vec![(parent_key, name.to_string(), snapshot)];
        while let Some((parent_key, name, snap)) = stack.pop() {
            let id = FileId::generate();
            let mut node = Node::new(id.clone(), name, snap.kind, snap.content.clone());
            node.parent = Some(parent_key);
            let key = self.arena.insert(node);
            if let Some(children) = self.arena[parent_key].children.as_mut() {
                children.push(key);
            }
            self.index.insert(id.clone(), key);
            created.push(id);
            for child in snap.children.iter().rev() {
                stack.push((key, child.name.clone(), child));
            }
        }
        Ok(created)
    }

    /// First free name for `name` directly under `dir`: the name itself, then
    /// `stem (1).ext`, `stem (2).ext`, ... Directories keep no extension.
    pub fn unique_child_name(
        &self,
        dir: Option<&FileId>,
        name: &str,
        kind: FileKind,
    ) -> Result<String> {
        let key = self.dir_key(dir)?;
        let taken: FxHashSet<&str> = self.arena[key]
            .children
            .iter()
            .flatten()
            .map(|&child| self.arena[child].name.as_str())
            .collect();
        if !taken.contains(name) {
            return Ok(name.to_string());
        }
        let (stem, ext) = match kind {
            FileKind::File => split_extension(name),
            FileKind::Directory => (name, ""),
        };
        let mut counter = 1usize;
        loop {
            let candidate = format!("{stem} ({counter}){ext}");
            if !taken.contains(candidate.as_str()) {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// Flat records in pre-order: every directory precedes its children.
    pub fn records(&self) -> Vec<File> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.arena[self.root]
            .children
            .iter()
            .flatten()
            .rev()
            .copied()
            .collect();
        while let Some(key) = stack.pop() {
            out.push(self.record(key));
            if let Some(children) = &self.arena[key].children {
                stack.extend(children.iter().rev().copied());
            }
        }
        out
    }

    /// Rebuilds a tree from flat records.
    ///
    /// `children` lists are authoritative. A record no directory claims is
    /// attached to the directory whose path equals its parent path, or to the
    /// root. Dangling child ids are skipped.
    pub fn from_records(records: &[File]) -> Result<Self> {
        let mut tree = Self::new();
        for record in records {
            validate_name(&record.name)?;
            if tree.index.contains_key(&record.id) {
                return Err(FileTreeError::DuplicateId(record.id.clone()));
            }
            let content = match record.kind {
                FileKind::File => record.content_str().to_string(),
                FileKind::Directory => String::new(),
            };
            let key = tree.arena.insert(Node::new(
                record.id.clone(),
                record.name.clone(),
                record.kind,
                content,
            ));
            tree.index.insert(record.id.clone(), key);
        }

        for record in records.iter().filter(|r| r.is_dir()) {
            let parent_key = tree.index[&record.id];
            for child_id in record.child_ids() {
                let Some(&child_key) = tree.index.get(child_id) else {
                    tracing::warn!(dir = %record.path, child = %child_id, "dropping dangling child id");
                    continue;
                };
                if child_key == parent_key {
                    return Err(FileTreeError::Inconsistent(format!(
                        "{} lists itself as a child",
                        record.path
                    )));
                }
                if tree.arena[child_key].parent.is_some() {
                    return Err(FileTreeError::Inconsistent(format!(
                        "{child_id} is claimed by more than one directory"
                    )));
                }
                tree.arena[child_key].parent = Some(parent_key);
                if let Some(children) = tree.arena[parent_key].children.as_mut() {
                    children.push(child_key);
                }
            }
        }

        let mut dirs_by_path: FxHashMap<&str, NodeId> = FxHashMap::default();
        for record in records.iter().filter(|r| r.is_dir()) {
            dirs_by_path
                .entry(record.path.as_str())
                .or_insert(tree.index[&record.id]);
        }
        for record in records {
            let key = tree.index[&record.id];
            if tree.arena[key].parent.is_some() {
                continue;
            }
            let parent_key = record
                .path
                .rsplit_once('/')
                .map(|(parent, _)| parent)
                .filter(|parent| !parent.is_empty())
                .and_then(|parent| dirs_by_path.get(parent).copied())
                .filter(|&parent| parent != key)
                .unwrap_or(tree.root);
            tree.arena[key].parent = Some(parent_key);
            if let Some(children) = tree.arena[parent_key].children.as_mut() {
                children.push(key);
            }
        }

        let reachable = tree.collect_subtree(tree.root).len() - 1;
        if reachable != tree.index.len() {
            return Err(FileTreeError::Inconsistent(
                "directory cycle detected".to_string(),
            ));
        }

        for (key, node) in tree.arena.iter() {
            let Some(children) = &node.children else {
                continue;
            };
            let mut seen = FxHashSet::default();
            for &child in children {
                let name = tree.arena[child].name.as_str();
                if !seen.insert(name) {
                    return Err(FileTreeError::PathExists(tree.child_path(key, name)));
                }
            }
        }

        Ok(tree)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/file_tree.rs"]
mod tests;
