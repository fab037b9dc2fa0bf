//! 数据模型层

pub mod file_tree;
pub mod project;

pub use file_tree::{validate_name, FileTree, FileTreeError, NodeSnapshot};
pub use project::{
    File, FileId, FileKind, Project, ProjectId, ProjectPatch, ProjectSummary, UserId,
};
