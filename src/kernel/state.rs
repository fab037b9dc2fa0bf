use crate::kernel::editor::EditorSession;
use crate::kernel::error::{Result, WorkspaceError};
use crate::models::{FileTree, Project, ProjectId, UserId};
use chrono::{DateTime, Utc};

/// Project fields other than the file collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMeta {
    pub id: ProjectId,
    pub name: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<UserId>,
    pub is_public: bool,
    pub description: String,
}

/// The current project: metadata, live file tree and editor session.
#[derive(Debug, Clone)]
pub struct OpenProject {
    pub meta: ProjectMeta,
    pub tree: FileTree,
    pub session: EditorSession,
}

impl OpenProject {
    /// Builds the live tree from the flat records. Tabs whose file is gone are
    /// dropped and clean tabs pick up the committed content.
    pub fn load(project: Project, mut session: EditorSession) -> Result<Self> {
        let tree = FileTree::from_records(&project.files)
            .map_err(|e| WorkspaceError::corrupt(&project.id, e))?;
        session.retain_existing(&tree);
        session.refresh_from(&tree);
        Ok(Self {
            meta: ProjectMeta {
                id: project.id,
                name: project.name,
                path: project.path,
                created_at: project.created_at,
                user_id: project.user_id,
                is_public: project.is_public,
                description: project.description,
            },
            tree,
            session,
        })
    }

    pub fn id(&self) -> &ProjectId {
        &self.meta.id
    }

    /// Owned by a user, so it has a remote counterpart.
    pub fn is_remote(&self) -> bool {
        self.meta.user_id.is_some()
    }

    pub fn snapshot(&self) -> Project {
        Project {
            id: self.meta.id.clone(),
            name: self.meta.name.clone(),
            path: self.meta.path.clone(),
            files: self.tree.records(),
            created_at: self.meta.created_at,
            user_id: self.meta.user_id.clone(),
            is_public: self.meta.is_public,
            description: self.meta.description.clone(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/state.rs"]
mod tests;
