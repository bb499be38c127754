//! Error types for craftsync-core

use thiserror::Error;

/// Result type alias using craftsync-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for CraftSync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration failed validation
    #[error("{message}")]
    Validation { message: String },

    /// SSH authentication was rejected by the remote host
    #[error("Authentication failed for {user}@{host}: {message}")]
    AuthFailed {
        user: String,
        host: String,
        message: String,
    },

    /// SSH connection could not be established (non-auth failure)
    #[error("Connection to {host}:{port} failed: {message}")]
    ConnectFailed {
        host: String,
        port: u16,
        message: String,
    },

    /// The configured remote path does not exist on the host
    #[error("Remote path does not exist: {path}")]
    RemotePathMissing { path: String },

    /// SSH protocol error outside of connect/auth
    #[error("SSH error: {message}")]
    Ssh { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// File hashing failed
    #[error("Failed to hash {path}: {message}")]
    HashFailed { path: String, message: String },

    /// A profile with this name already exists for the server
    #[error("A profile named '{name}' already exists")]
    DuplicateProfileName { name: String },

    /// Profile name failed validation
    #[error("Invalid profile name: {message}")]
    InvalidProfileName { message: String },

    /// Profile not found in the index
    #[error("Profile not found: {id}")]
    ProfileNotFound { id: String },

    /// Profile archive file is missing from disk
    #[error("Profile archive not found: {path}")]
    ArchiveMissing { path: String },

    /// Archive creation or extraction failed
    #[error("Archive error: {message}")]
    Archive { message: String },

    /// No subtrees selected for sync
    #[error("No files selected for sync")]
    NothingSelected,

    /// The upload phase exceeded its wall-clock ceiling
    #[error("Sync timed out")]
    Timeout,

    /// The operation was cancelled by the user
    #[error("Sync cancelled")]
    Cancelled,

    /// Password auth is required but no password was supplied
    #[error("Password authentication required to install SSH key")]
    PasswordRequired,

    /// The auto-generated public key is missing
    #[error("Public key does not exist: {path}")]
    NoPublicKey { path: String },

    /// The remote rejected the authorized_keys installation
    #[error("Failed to install SSH key on remote: {output}")]
    RemoteInstallFailed { output: String },

    /// SSH key generation failed
    #[error("Failed to generate SSH key pair: {message}")]
    KeyGeneration { message: String },
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an auth failure error
    pub fn auth_failed(
        user: impl Into<String>,
        host: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::AuthFailed {
            user: user.into(),
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a connect failure error
    pub fn connect_failed(host: impl Into<String>, port: u16, message: impl Into<String>) -> Self {
        Self::ConnectFailed {
            host: host.into(),
            port,
            message: message.into(),
        }
    }

    /// Create a generic SSH error
    pub fn ssh(message: impl Into<String>) -> Self {
        Self::Ssh {
            message: message.into(),
        }
    }

    /// Create a hash failure error
    pub fn hash_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HashFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an archive error
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    /// Returns true if this error is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_bare() {
        let err = Error::validation("Host is required");
        assert_eq!(err.to_string(), "Host is required");
    }

    #[test]
    fn test_auth_failed_display() {
        let err = Error::auth_failed("mc", "example.com", "all methods exhausted");
        assert!(err.to_string().contains("mc@example.com"));
        assert!(err.to_string().contains("all methods exhausted"));
    }

    #[test]
    fn test_duplicate_profile_name_display() {
        let err = Error::DuplicateProfileName {
            name: "v1".to_string(),
        };
        assert_eq!(err.to_string(), "A profile named 'v1' already exists");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Timeout.is_cancelled());
    }
}
