//! Editor domain: open tabs, active tab and dirty working copies.

mod state;

pub use state::{EditorSession, FileTab};
