//! The on-disk profile store.
//!
//! One directory per server (keyed by its safe name) holds the ZIP archives
//! plus a `profiles.json` index. The index is the unit of consistency: it is
//! only rewritten after an archive is fully on disk, and every rewrite goes
//! through a temp file and rename.

use crate::archive;
use crate::changes::scan_included_files;
use crate::hashing::sha256_file;
use crate::policy::BackupMode;
use crate::profile::{ProfileContents, ServerProfile, ServerProfileIndex, INDEX_FILENAME};
use craftsync_core::utils::{epoch_millis, sanitize_filename};
use craftsync_core::{Error, Result, Server};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Maximum accepted profile name length.
const MAX_NAME_LEN: usize = 100;

/// Manages profile snapshots for servers under a base directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    base_dir: PathBuf,
}

impl ProfileStore {
    /// Creates a store rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Creates a store at the platform default location.
    pub fn default_location() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("craftsync")
            .join("server-profiles");
        Self::new(base)
    }

    /// Directory holding this server's archives and index.
    pub fn server_profile_dir(&self, server: &Server) -> PathBuf {
        self.base_dir.join(server.safe_name())
    }

    /// Path to this server's index file.
    pub fn index_path(&self, server: &Server) -> PathBuf {
        self.server_profile_dir(server).join(INDEX_FILENAME)
    }

    /// Loads the index for a server, creating an empty one if none exists
    /// or the existing file is unreadable.
    pub fn load_index(&self, server: &Server) -> ServerProfileIndex {
        let path = self.index_path(server);
        if !path.exists() {
            return ServerProfileIndex::create(server.safe_name());
        }

        match std::fs::read_to_string(&path)
            .map_err(Error::from)
            .and_then(|data| serde_json::from_str::<ServerProfileIndex>(&data).map_err(Error::from))
        {
            Ok(index) => {
                if index.server_safe_name != server.safe_name() {
                    warn!(
                        "Profile index at {} belongs to '{}', expected '{}'; ignoring it",
                        path.display(),
                        index.server_safe_name,
                        server.safe_name()
                    );
                    return ServerProfileIndex::create(server.safe_name());
                }
                index
            }
            Err(e) => {
                warn!("Failed to load profile index {}: {}", path.display(), e);
                ServerProfileIndex::create(server.safe_name())
            }
        }
    }

    /// Persists the index atomically (write to temp file, rename over).
    pub fn save_index(&self, server: &Server, index: &ServerProfileIndex) -> Result<()> {
        let dir = self.server_profile_dir(server);
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(serde_json::to_string_pretty(index)?.as_bytes())?;
        tmp.persist(self.index_path(server))
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// All profiles for a server, oldest first.
    pub fn list(&self, server: &Server) -> Vec<ServerProfile> {
        self.load_index(server).profiles
    }

    /// The active profile, if any.
    pub fn active(&self, server: &Server) -> Option<ServerProfile> {
        self.load_index(server).active_profile().cloned()
    }

    /// Captures a new snapshot of the server under the given mode.
    ///
    /// The index is only touched once the archive is fully written and
    /// hashed, so a failure part-way leaves no dangling entry.
    pub fn save(
        &self,
        server: &Server,
        name: &str,
        description: Option<String>,
        mode: BackupMode,
    ) -> Result<ServerProfile> {
        let name = name.trim();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidProfileName {
                message: format!("Name must be 1-{} characters", MAX_NAME_LEN),
            });
        }

        let mut index = self.load_index(server);
        if index.profile_by_name(name).is_some() {
            return Err(Error::DuplicateProfileName {
                name: name.to_string(),
            });
        }

        info!("Creating profile '{}' for server {}", name, server.name);

        let mut profile = ServerProfile::create(name, description, mode);
        profile.archive_filename =
            format!("{}-{}.zip", sanitize_filename(name), epoch_millis());

        let dir = self.server_profile_dir(server);
        std::fs::create_dir_all(&dir)?;
        let archive_path = dir.join(&profile.archive_filename);

        // Checksums and contents metadata come from the same walk order the
        // archive writer uses, so a fresh save diffs clean.
        let mut contents = ProfileContents::default();
        let checksums = scan_included_files(server.root(), mode, |relative_path| {
            contents.record(relative_path);
        })?;
        profile.file_checksums = checksums;
        profile.contents = contents;

        debug!("Creating archive at {}", archive_path.display());
        archive::create_zip(server.root(), &archive_path, mode)?;

        profile.archive_size_bytes = std::fs::metadata(&archive_path)?.len();
        profile.archive_hash = sha256_file(&archive_path)?;

        let id = profile.id;
        index.add_profile(profile.clone());
        index.set_active_profile(id);
        self.save_index(server, &index)?;

        info!(
            "Profile '{}' created successfully ({})",
            name,
            profile.formatted_size()
        );
        Ok(profile)
    }

    /// Restores a profile's archive into the server root.
    ///
    /// Extraction is an overlay: files captured in the archive are written
    /// back, files created since the snapshot are left in place.
    pub fn restore(&self, server: &Server, profile_id: Uuid) -> Result<()> {
        let mut index = self.load_index(server);
        let profile = index
            .profile_by_id(profile_id)
            .ok_or_else(|| Error::ProfileNotFound {
                id: profile_id.to_string(),
            })?
            .clone();

        let archive_path = self.server_profile_dir(server).join(&profile.archive_filename);
        if !archive_path.exists() {
            return Err(Error::ArchiveMissing {
                path: archive_path.display().to_string(),
            });
        }

        info!(
            "Restoring profile '{}' to server {}",
            profile.name, server.name
        );
        archive::extract_zip(&archive_path, server.root(), profile.backup_mode)?;

        index.set_active_profile(profile_id);
        self.save_index(server, &index)?;

        info!("Profile '{}' restored successfully", profile.name);
        Ok(())
    }

    /// Deletes a profile and its archive.
    ///
    /// Archive removal is best-effort; the index entry goes away regardless.
    pub fn delete(&self, server: &Server, profile_id: Uuid) -> Result<()> {
        let mut index = self.load_index(server);
        let profile = index
            .profile_by_id(profile_id)
            .ok_or_else(|| Error::ProfileNotFound {
                id: profile_id.to_string(),
            })?
            .clone();

        let archive_path = self.server_profile_dir(server).join(&profile.archive_filename);
        if archive_path.exists() {
            if let Err(e) = std::fs::remove_file(&archive_path) {
                warn!(
                    "Failed to remove profile archive {}: {}",
                    archive_path.display(),
                    e
                );
            }
        }

        index.remove_profile(profile_id);
        self.save_index(server, &index)?;

        info!("Profile '{}' deleted", profile.name);
        Ok(())
    }

    /// Resolves a profile by name (case-insensitive) or id string.
    pub fn find(&self, server: &Server, name_or_id: &str) -> Option<ServerProfile> {
        let index = self.load_index(server);
        if let Ok(id) = name_or_id.parse::<Uuid>() {
            if let Some(profile) = index.profile_by_id(id) {
                return Some(profile.clone());
            }
        }
        index.profile_by_name(name_or_id).cloned()
    }

    /// The store's root directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Server, ProfileStore) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("server");
        fs::create_dir_all(root.join("mods")).unwrap();
        fs::create_dir_all(root.join("world/region")).unwrap();
        fs::write(root.join("server.properties"), b"motd=hello").unwrap();
        fs::write(root.join("mods/a.jar"), vec![7u8; 128]).unwrap();
        fs::write(root.join("world/region/x.mca"), vec![0u8; 1024]).unwrap();

        let server = Server::new("Test Server", root, "1.21.1");
        let store = ProfileStore::new(dir.path().join("profiles"));
        (dir, server, store)
    }

    #[test]
    fn test_save_populates_profile_and_index() {
        let (_dir, server, store) = fixture();

        let profile = store
            .save(&server, "v1", Some("first".to_string()), BackupMode::NormalPlusMods)
            .unwrap();

        assert_eq!(profile.contents.total_file_count, 2);
        assert!(profile.contents.has_mods);
        assert!(!profile.contents.has_world);
        assert_eq!(profile.file_checksums.len(), 2);
        assert!(profile.archive_size_bytes > 0);
        assert_eq!(profile.archive_hash.len(), 64);
        assert!(profile.archive_filename.starts_with("v1-"));
        assert!(profile.archive_filename.ends_with(".zip"));

        let archive = store.server_profile_dir(&server).join(&profile.archive_filename);
        assert!(archive.exists());

        let index = store.load_index(&server);
        assert_eq!(index.profiles.len(), 1);
        assert_eq!(index.active_profile_id, Some(profile.id));
    }

    #[test]
    fn test_save_rejects_duplicate_name_case_insensitively() {
        let (_dir, server, store) = fixture();
        store.save(&server, "Stable", None, BackupMode::Normal).unwrap();

        let err = store
            .save(&server, "stable", None, BackupMode::Normal)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateProfileName { .. }));

        // No side effects from the failed save
        assert_eq!(store.list(&server).len(), 1);
    }

    #[test]
    fn test_save_rejects_invalid_names() {
        let (_dir, server, store) = fixture();
        assert!(matches!(
            store.save(&server, "", None, BackupMode::Normal),
            Err(Error::InvalidProfileName { .. })
        ));
        assert!(matches!(
            store.save(&server, &"x".repeat(101), None, BackupMode::Normal),
            Err(Error::InvalidProfileName { .. })
        ));
    }

    #[test]
    fn test_restore_is_an_overlay() {
        let (_dir, server, store) = fixture();
        let profile = store
            .save(&server, "v1", None, BackupMode::NormalPlusMods)
            .unwrap();

        // Post-save drift: one new mod, one mutated file
        fs::write(server.root().join("mods/b.jar"), vec![9u8; 64]).unwrap();
        fs::write(server.root().join("mods/a.jar"), vec![1u8; 128]).unwrap();

        store.restore(&server, profile.id).unwrap();

        assert_eq!(
            fs::read(server.root().join("mods/a.jar")).unwrap(),
            vec![7u8; 128]
        );
        // Files outside the archive's set survive
        assert!(server.root().join("mods/b.jar").exists());
        assert_eq!(store.load_index(&server).active_profile_id, Some(profile.id));
    }

    #[test]
    fn test_restore_missing_profile_and_archive() {
        let (_dir, server, store) = fixture();
        let err = store.restore(&server, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::ProfileNotFound { .. }));

        let profile = store.save(&server, "v1", None, BackupMode::Normal).unwrap();
        let archive = store.server_profile_dir(&server).join(&profile.archive_filename);
        fs::remove_file(archive).unwrap();

        let err = store.restore(&server, profile.id).unwrap_err();
        assert!(matches!(err, Error::ArchiveMissing { .. }));
    }

    #[test]
    fn test_delete_removes_archive_and_clears_active() {
        let (_dir, server, store) = fixture();
        let profile = store.save(&server, "v1", None, BackupMode::Normal).unwrap();
        let archive = store.server_profile_dir(&server).join(&profile.archive_filename);
        assert!(archive.exists());

        store.delete(&server, profile.id).unwrap();

        assert!(!archive.exists());
        let index = store.load_index(&server);
        assert!(index.profiles.is_empty());
        assert_eq!(index.active_profile_id, None);
    }

    #[test]
    fn test_delete_unknown_profile() {
        let (_dir, server, store) = fixture();
        assert!(matches!(
            store.delete(&server, Uuid::new_v4()),
            Err(Error::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn test_find_by_name_or_id() {
        let (_dir, server, store) = fixture();
        let profile = store.save(&server, "Release 1", None, BackupMode::Normal).unwrap();

        assert_eq!(store.find(&server, "release 1").unwrap().id, profile.id);
        assert_eq!(
            store.find(&server, &profile.id.to_string()).unwrap().id,
            profile.id
        );
        assert!(store.find(&server, "missing").is_none());
    }

    #[test]
    fn test_index_from_another_server_is_ignored() {
        let (_dir, server, store) = fixture();
        store.save(&server, "v1", None, BackupMode::Normal).unwrap();

        let other = Server::new("Other Server", server.root.clone(), "1.21.1");
        let dir = store.server_profile_dir(&other);
        fs::create_dir_all(&dir).unwrap();
        fs::copy(store.index_path(&server), store.index_path(&other)).unwrap();

        // The copied index names the wrong server and is discarded
        assert!(store.list(&other).is_empty());
    }

    #[test]
    fn test_failed_archive_leaves_index_untouched() {
        let (_dir, server, store) = fixture();
        store.save(&server, "good", None, BackupMode::Normal).unwrap();

        let missing_root = Server::new("Test Server", "/nonexistent/root", "1.21.1");
        assert!(store
            .save(&missing_root, "bad", None, BackupMode::Normal)
            .is_err());

        let index = store.load_index(&server);
        assert_eq!(index.profiles.len(), 1);
        assert_eq!(index.profiles[0].name, "good");
    }
}
