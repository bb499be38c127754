//! Profile snapshot descriptors and the per-server index.

use crate::policy::BackupMode;
use chrono::{DateTime, Utc};
use craftsync_core::utils::format_bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Current schema version of the on-disk index.
pub const INDEX_VERSION: u32 = 1;

/// Name of the index file inside a server's profile directory.
pub const INDEX_FILENAME: &str = "profiles.json";

/// A saved server configuration snapshot.
///
/// Once persisted, `id`, `created_at`, `file_checksums` and `archive_hash`
/// are frozen; the archive named by `archive_filename` must stay on disk for
/// as long as the profile is referenced from the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProfile {
    /// Unique identifier
    pub id: Uuid,

    /// Human-readable name, unique per server (case-insensitive)
    pub name: String,

    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When this profile was captured
    pub created_at: DateTime<Utc>,

    /// What the snapshot includes
    pub backup_mode: BackupMode,

    /// Archive filename, relative to the server's profile directory
    pub archive_filename: String,

    /// Archive size in bytes
    pub archive_size_bytes: u64,

    /// SHA-256 of the archive for integrity verification
    pub archive_hash: String,

    /// SHA-256 per included relative path at capture time
    pub file_checksums: BTreeMap<String, String>,

    /// Counts and presence flags for display
    pub contents: ProfileContents,
}

impl ServerProfile {
    /// Creates a new profile shell with a fresh id and timestamp.
    /// Archive fields are filled in by the store once the archive exists.
    pub fn create(name: impl Into<String>, description: Option<String>, backup_mode: BackupMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            created_at: Utc::now(),
            backup_mode,
            archive_filename: String::new(),
            archive_size_bytes: 0,
            archive_hash: String::new(),
            file_checksums: BTreeMap::new(),
            contents: ProfileContents::default(),
        }
    }

    /// Formatted archive size, e.g. "45.2 MB".
    pub fn formatted_size(&self) -> String {
        format_bytes(self.archive_size_bytes)
    }
}

/// Metadata about what a profile archive contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileContents {
    pub has_server_properties: bool,
    pub has_mods: bool,
    pub has_configs: bool,
    pub has_plugins: bool,
    pub has_world: bool,

    pub mod_count: usize,
    pub config_file_count: usize,
    pub plugin_count: usize,
    pub total_file_count: usize,
}

impl ProfileContents {
    /// Records one included file under its classified subtree.
    pub fn record(&mut self, relative_path: &str) {
        self.total_file_count += 1;
        if relative_path == "server.properties" {
            self.has_server_properties = true;
        } else if relative_path.starts_with("mods/") {
            self.has_mods = true;
            self.mod_count += 1;
        } else if relative_path.starts_with("config/") {
            self.has_configs = true;
            self.config_file_count += 1;
        } else if relative_path.starts_with("plugins/") {
            self.has_plugins = true;
            self.plugin_count += 1;
        } else if relative_path.starts_with("world") {
            self.has_world = true;
        }
    }

    /// Human-readable summary, e.g. "server.properties, 12 mods, 48 configs".
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.has_server_properties {
            parts.push("server.properties".to_string());
        }
        if self.has_mods {
            parts.push(format!("{} mods", self.mod_count));
        }
        if self.has_configs {
            parts.push(format!("{} configs", self.config_file_count));
        }
        if self.has_plugins {
            parts.push(format!("{} plugins", self.plugin_count));
        }
        if self.has_world {
            parts.push("world data".to_string());
        }

        if parts.is_empty() {
            "empty".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Index of all saved profiles for one server.
///
/// Insertion order is preserved; `active_profile_id` points at the profile
/// most recently saved or restored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProfileIndex {
    /// Safe name of the owning server, validated on load
    pub server_safe_name: String,

    /// All saved profiles, oldest first
    pub profiles: Vec<ServerProfile>,

    /// The reference point for change detection, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile_id: Option<Uuid>,

    /// Schema version for future migrations
    pub version: u32,
}

impl ServerProfileIndex {
    /// Creates an empty index for the given server.
    pub fn create(server_safe_name: impl Into<String>) -> Self {
        Self {
            server_safe_name: server_safe_name.into(),
            profiles: Vec::new(),
            active_profile_id: None,
            version: INDEX_VERSION,
        }
    }

    /// Finds a profile by id.
    pub fn profile_by_id(&self, id: Uuid) -> Option<&ServerProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Finds a profile by name, case-insensitively.
    pub fn profile_by_name(&self, name: &str) -> Option<&ServerProfile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Appends a profile.
    pub fn add_profile(&mut self, profile: ServerProfile) {
        self.profiles.push(profile);
    }

    /// Removes a profile by id, clearing the active pointer if it matched.
    /// Returns true if a profile was removed.
    pub fn remove_profile(&mut self, id: Uuid) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        let removed = self.profiles.len() != before;

        if removed && self.active_profile_id == Some(id) {
            self.active_profile_id = None;
        }
        removed
    }

    /// The currently active profile, if the pointer is set and resolvable.
    pub fn active_profile(&self) -> Option<&ServerProfile> {
        self.active_profile_id.and_then(|id| self.profile_by_id(id))
    }

    /// Marks a profile as active.
    pub fn set_active_profile(&mut self, id: Uuid) {
        self.active_profile_id = Some(id);
    }
}
