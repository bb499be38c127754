//! Change detection against the active profile.
//!
//! Both entry points walk the server tree in the same stable order the
//! archive writer uses, so a freshly saved profile always diffs clean.

use crate::hashing::sha256_file;
use crate::policy::BackupMode;
use crate::store::ProfileStore;
use craftsync_core::{Result, Server};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;
use walkdir::WalkDir;

/// Result of comparing the current server state against a saved profile.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetectionResult {
    /// Whether any changes were detected
    pub has_changes: bool,

    /// Id of the profile compared against, if one was available
    pub compared_to_profile_id: Option<Uuid>,

    /// Name of the profile compared against
    pub compared_to_profile_name: Option<String>,

    /// Paths present now but absent from the saved set
    pub added_files: Vec<String>,

    /// Paths present in both with differing hashes
    pub modified_files: Vec<String>,

    /// Paths in the saved set that no longer exist
    pub deleted_files: Vec<String>,
}

impl ChangeDetectionResult {
    /// Total number of changed paths.
    pub fn total_changes(&self) -> usize {
        self.added_files.len() + self.modified_files.len() + self.deleted_files.len()
    }

    /// Human-readable summary, e.g. "Compared to 'v1': 2 added, 1 modified".
    pub fn summary(&self) -> String {
        if !self.has_changes {
            return "No changes detected".to_string();
        }

        let mut parts = Vec::new();
        if !self.added_files.is_empty() {
            parts.push(format!("{} added", self.added_files.len()));
        }
        if !self.modified_files.is_empty() {
            parts.push(format!("{} modified", self.modified_files.len()));
        }
        if !self.deleted_files.is_empty() {
            parts.push(format!("{} deleted", self.deleted_files.len()));
        }

        match &self.compared_to_profile_name {
            Some(name) if !parts.is_empty() => {
                format!("Compared to '{}': {}", name, parts.join(", "))
            }
            Some(name) => format!("Compared to '{}': changed", name),
            None => parts.join(", "),
        }
    }

    /// Sentinel for "no profile to compare against": every file is
    /// untracked, so the tree counts as changed.
    pub fn no_profile_available() -> Self {
        Self {
            has_changes: true,
            compared_to_profile_name: Some("(no profile selected)".to_string()),
            ..Default::default()
        }
    }
}

/// Walks `root` in sorted order, hashing every file the mode admits.
/// `on_file` fires once per admitted relative path.
pub(crate) fn scan_included_files(
    root: &Path,
    mode: BackupMode,
    mut on_file: impl FnMut(&str),
) -> Result<BTreeMap<String, String>> {
    let mut checksums = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            craftsync_core::Error::archive(format!("Failed to walk directory: {}", e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative.to_string_lossy().replace('\\', "/");
        if !mode.includes(&name) {
            continue;
        }

        let hash = sha256_file(entry.path())?;
        on_file(&name);
        checksums.insert(name, hash);
    }

    Ok(checksums)
}

impl ProfileStore {
    /// Compares the current tree to the active profile's checksum set.
    ///
    /// Walk or hash failures are conservative: the result reports changes so
    /// that a pre-flight gate errs toward warning the operator.
    pub fn detect_changes(&self, server: &Server) -> ChangeDetectionResult {
        let index = self.load_index(server);
        let Some(profile) = index.active_profile() else {
            return ChangeDetectionResult::no_profile_available();
        };

        let mut result = ChangeDetectionResult {
            compared_to_profile_id: Some(profile.id),
            compared_to_profile_name: Some(profile.name.clone()),
            ..Default::default()
        };

        let saved = &profile.file_checksums;
        let current = match scan_included_files(server.root(), profile.backup_mode, |_| {}) {
            Ok(current) => current,
            Err(e) => {
                warn!("Error detecting changes: {}", e);
                result.has_changes = true;
                return result;
            }
        };

        for (path, hash) in &current {
            match saved.get(path) {
                None => result.added_files.push(path.clone()),
                Some(saved_hash) if saved_hash != hash => {
                    result.modified_files.push(path.clone())
                }
                Some(_) => {}
            }
        }

        for path in saved.keys() {
            if !current.contains_key(path) {
                result.deleted_files.push(path.clone());
            }
        }

        result.has_changes = result.total_changes() > 0;
        result
    }

    /// Short-circuiting dirty probe: true as soon as one added or modified
    /// file is found, with a final count comparison catching deletions.
    ///
    /// "No active profile" and walk failures both count as dirty.
    pub fn has_unsaved_changes(&self, server: &Server) -> bool {
        let index = self.load_index(server);
        let Some(profile) = index.active_profile() else {
            return true;
        };

        let saved = &profile.file_checksums;
        if saved.is_empty() {
            return true;
        }

        let mut matched_count = 0usize;
        for entry in WalkDir::new(server.root())
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error checking for unsaved changes: {}", e);
                    return true;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(server.root()) else {
                continue;
            };
            let name = relative.to_string_lossy().replace('\\', "/");
            if !profile.backup_mode.includes(&name) {
                continue;
            }

            matched_count += 1;

            let Some(saved_hash) = saved.get(&name) else {
                return true; // new file
            };
            match sha256_file(entry.path()) {
                Ok(hash) if &hash == saved_hash => {}
                Ok(_) => return true, // modified file
                Err(e) => {
                    warn!("Error checking for unsaved changes: {}", e);
                    return true;
                }
            }
        }

        // Fewer matched files now than at save time means something was deleted
        matched_count < saved.len()
    }
}
