//! codecanvas - 浏览器代码编辑器的项目核心
//!
//! 模块结构：
//! - models: 数据模型（Project, File, FileTree）
//! - kernel: 纯状态与副作用（Store, EditorSession, Effect），以及 services 端口/适配器
//! - app: 工作区门面（Workspace），执行副作用并汇报本地/远程状态
//! - logging: tracing 初始化

pub mod app;
pub mod kernel;
pub mod logging;
pub mod models;

pub use app::Workspace;
pub use kernel::{LocalStatus, Outcome, RemoteStatus, WorkspaceError};
