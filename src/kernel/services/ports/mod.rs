//! Service ports: traits + data contracts.

pub mod remote;
pub mod runtime;
pub mod settings;
pub mod storage;

pub use remote::{RemoteError, RemoteFuture, RemoteProjectService, SyncFile, SyncPayload};
pub use runtime::BoxFuture;
pub use settings::{LogSettings, Settings, StorageSettings, SyncSettings};
pub use storage::{LocalStore, StorageError, StoreFuture};
