//! Profile engine: content-addressed snapshots of a server directory.
//!
//! A profile is a ZIP archive of the files a [`BackupMode`] admits, plus a
//! checksum map of those files at capture time. Profiles live in a
//! per-server directory indexed by `profiles.json`; the active profile is
//! the reference point for change detection.

pub mod archive;
pub mod changes;
pub mod hashing;
pub mod policy;
pub mod profile;
pub mod store;

pub use changes::ChangeDetectionResult;
pub use policy::BackupMode;
pub use profile::{ProfileContents, ServerProfile, ServerProfileIndex, INDEX_FILENAME, INDEX_VERSION};
pub use store::ProfileStore;
