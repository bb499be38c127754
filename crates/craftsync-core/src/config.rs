//! Remote sync connection and policy configuration.
//!
//! The config is persisted as JSON; the password and key passphrase are
//! runtime-only and never written to disk.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Authentication method for the SSH connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Key,
    Password,
}

/// What the sync is allowed to do on the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Full SSH control: lifecycle commands plus file transfer
    Commands,
    /// File transfer only
    Transfer,
}

/// Configuration for the remote server sync connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteSyncConfig {
    /// Remote hostname or IP address
    pub host: String,

    /// SSH port
    pub port: u16,

    /// SSH username
    pub username: String,

    /// Authentication method
    pub auth_method: AuthMethod,

    /// Password for password authentication. Runtime-only.
    #[serde(skip)]
    pub password: Option<String>,

    /// Path to the SSH private key file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,

    /// Passphrase for the private key, if encrypted. Runtime-only.
    #[serde(skip)]
    pub key_passphrase: Option<String>,

    /// Remote path to the Minecraft server directory
    pub remote_path: String,

    /// Sync mode
    pub sync_mode: SyncMode,

    /// Whether to sync server.properties
    pub sync_server_properties: bool,

    /// Whether to sync the mods folder
    pub sync_mods: bool,

    /// Whether to sync the config folder
    pub sync_configs: bool,

    /// Whether to sync the plugins folder
    pub sync_plugins: bool,

    /// Whether to sync the world folder (can be very large)
    pub sync_world: bool,

    /// Whether to write the version manifest to the remote
    pub sync_version: bool,

    /// Whether to clean remote mods/config/plugins directories before syncing
    pub clean_before_sync: bool,

    /// Whether to stop the container before and start it after syncing
    pub restart_after_sync: bool,

    /// Whether to use native scp instead of in-process SFTP for directories
    pub use_fast_transfer: bool,

    /// Number of parallel transfer workers (1-64)
    pub parallel_transfer_count: usize,

    /// Command that prints the container status
    pub status_command: String,

    /// Command that starts the container
    pub start_command: String,

    /// Command that stops the container
    pub stop_command: String,

    /// Connection timeout in milliseconds
    pub connection_timeout_ms: u32,
}

impl Default for RemoteSyncConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: String::new(),
            auth_method: AuthMethod::Key,
            password: None,
            private_key_path: None,
            key_passphrase: None,
            remote_path: "/srv/docker/minecraft".to_string(),
            sync_mode: SyncMode::Commands,
            sync_server_properties: true,
            sync_mods: true,
            sync_configs: true,
            sync_plugins: false,
            sync_world: false,
            sync_version: true,
            clean_before_sync: true,
            restart_after_sync: true,
            use_fast_transfer: true,
            parallel_transfer_count: 3,
            status_command: "docker ps -f name=minecraft --format '{{.Status}}'".to_string(),
            start_command: "docker start minecraft".to_string(),
            stop_command: "docker stop minecraft".to_string(),
            connection_timeout_ms: 30_000,
        }
    }
}

impl RemoteSyncConfig {
    /// Creates a config with the given connection details and default policy.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            remote_path: remote_path.into(),
            ..Default::default()
        }
    }

    /// Path to the default SSH key (`~/.ssh/id_rsa`).
    pub fn default_key_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ssh")
            .join("id_rsa")
    }

    /// The private key path to use, falling back to the platform default.
    pub fn effective_key_path(&self) -> PathBuf {
        match &self.private_key_path {
            Some(p) if !p.as_os_str().is_empty() => p.clone(),
            _ => Self::default_key_path(),
        }
    }

    /// Validates the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::validation("Host is required"));
        }
        if self.port == 0 {
            return Err(Error::validation("Port must be between 1 and 65535"));
        }
        if self.username.trim().is_empty() {
            return Err(Error::validation("Username is required"));
        }
        if self.remote_path.trim().is_empty() {
            return Err(Error::validation("Remote path is required"));
        }
        if self.auth_method == AuthMethod::Password
            && self.password.as_deref().unwrap_or("").is_empty()
        {
            return Err(Error::validation(
                "Password is required for password authentication",
            ));
        }
        if self.parallel_transfer_count < 1 || self.parallel_transfer_count > 64 {
            return Err(Error::validation(
                "Parallel transfer count must be between 1 and 64",
            ));
        }
        Ok(())
    }

    /// Loads a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Saves the config as JSON. Secrets are not serialized.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Default on-disk location for the config file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("craftsync")
            .join("remote.json")
    }
}

impl fmt::Display for RemoteSyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{} -> {}",
            self.username, self.host, self.port, self.remote_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> RemoteSyncConfig {
        RemoteSyncConfig::new("mc.example.com", 22, "mc", "/srv/docker/minecraft")
    }

    #[test]
    fn test_defaults() {
        let config = RemoteSyncConfig::default();
        assert_eq!(config.port, 22);
        assert_eq!(config.auth_method, AuthMethod::Key);
        assert_eq!(config.parallel_transfer_count, 3);
        assert!(config.sync_server_properties);
        assert!(config.sync_mods);
        assert!(config.sync_configs);
        assert!(!config.sync_plugins);
        assert!(!config.sync_world);
        assert!(config.clean_before_sync);
        assert!(config.restart_after_sync);
        assert_eq!(config.connection_timeout_ms, 30_000);
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let mut config = valid_config();
        config.host = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Host is required");
    }

    #[test]
    fn test_validate_rejects_missing_username() {
        let mut config = valid_config();
        config.username = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_remote_path() {
        let mut config = valid_config();
        config.remote_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_password_for_password_auth() {
        let mut config = valid_config();
        config.auth_method = AuthMethod::Password;
        assert!(config.validate().is_err());

        config.password = Some("hunter2".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_parallel_count_bounds() {
        let mut config = valid_config();
        config.parallel_transfer_count = 0;
        assert!(config.validate().is_err());

        config.parallel_transfer_count = 64;
        assert!(config.validate().is_ok());

        config.parallel_transfer_count = 65;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_password_never_serialized() {
        let mut config = valid_config();
        config.password = Some("hunter2".to_string());
        config.key_passphrase = Some("secret".to_string());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_effective_key_path_fallback() {
        let mut config = valid_config();
        assert_eq!(config.effective_key_path(), RemoteSyncConfig::default_key_path());

        config.private_key_path = Some(PathBuf::from("/keys/mc_ed25519"));
        assert_eq!(config.effective_key_path(), PathBuf::from("/keys/mc_ed25519"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.json");

        let mut config = valid_config();
        config.password = Some("hunter2".to_string());
        config.sync_world = true;
        config.save(&path).unwrap();

        let loaded = RemoteSyncConfig::load(&path).unwrap();
        assert_eq!(loaded.host, "mc.example.com");
        assert!(loaded.sync_world);
        // Secrets do not survive the round trip
        assert_eq!(loaded.password, None);
    }
}
