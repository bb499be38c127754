//! Remote push engine for CraftSync.
//!
//! Connects to a remote host over SSH, pushes a selected file set (through a
//! bounded scp worker pool or a single SFTP session), maintains the version
//! manifest the remote container reads, and drives the container lifecycle.

pub mod keys;
pub mod progress;
pub mod scp;
pub mod session;
pub mod sync;
pub mod tasks;
pub mod workers;

pub use progress::{ProgressCallback, SyncProgress, SyncResult};
pub use session::SshSession;
pub use sync::{test_connection, RemoteSyncService};
pub use tasks::{FileUploadTask, SyncTask};
