//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod paths;
pub mod remote;
pub mod settings;
pub mod storage;
pub mod sync;

pub use paths::{ensure_data_dir, ensure_log_dir, get_data_dir, get_log_dir};
pub use remote::{MemoryRemote, RemoteCall};
pub use settings::{ensure_settings_file, get_settings_path, load_settings, load_settings_from};
pub use storage::{
    FileStore, MemoryStore, PendingChange, PendingKey, Storage, StorageUsage, SCHEMA_VERSION,
};
pub use sync::{Listener, ListenerId, SyncCoordinator, SyncReport};
