//! Headless project core (state/effect).
//!
//! `Store` mutates state synchronously and reports the side effects it needs;
//! `app::Workspace` runs them against storage and the remote service.

pub mod editor;
pub mod effect;
pub mod error;
pub mod language;
pub mod search;
pub mod services;
pub mod state;
pub mod store;
pub mod template;

pub use editor::{EditorSession, FileTab};
pub use effect::{Effect, LocalStatus, Outcome, RemoteStatus};
pub use error::{Entity, Result, WorkspaceError};
pub use language::detect_language;
pub use search::{FileSearchResult, SearchMatch, SearchOptions};
pub use state::{OpenProject, ProjectMeta};
pub use store::{DispatchResult, Store};
pub use template::ProjectTemplate;
