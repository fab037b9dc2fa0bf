//! 应用层：对外的工作区门面

mod workspace;

pub use workspace::Workspace;
