//! Auto-generated SSH key lifecycle.
//!
//! A dedicated 4096-bit RSA key pair lives at `~/.ssh/atlauncher_id_rsa`
//! (the path is part of the deployment contract with the remote side).
//! Generation shells out to `ssh-keygen`; installation pushes the public key
//! into the remote `authorized_keys` over a password-authenticated session.

use crate::session::SshSession;
use craftsync_core::{AuthMethod, Error, RemoteSyncConfig, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Filename of the dedicated key inside `~/.ssh`.
const AUTO_KEY_FILENAME: &str = "atlauncher_id_rsa";

/// Comment embedded in the generated public key.
const KEY_COMMENT: &str = "craftsync-auto-generated";

/// Marker the remote install command must echo on success.
const INSTALL_SUCCESS_MARKER: &str = "successfully";

/// Path of the auto-generated private key.
pub fn auto_key_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ssh")
        .join(AUTO_KEY_FILENAME)
}

/// Path of the matching public key.
pub fn auto_public_key_path() -> PathBuf {
    let mut path = auto_key_path().into_os_string();
    path.push(".pub");
    PathBuf::from(path)
}

/// Returns true if the auto-generated key exists locally.
pub fn has_auto_key() -> bool {
    auto_key_path().exists()
}

/// Generates the key pair if it does not exist yet.
///
/// Returns the private key path. Uses `ssh-keygen -t rsa -b 4096` with an
/// empty passphrase; the OpenSSH tool family is already a hard dependency of
/// the scp fast path.
pub fn generate_key_pair() -> Result<PathBuf> {
    let key_path = auto_key_path();
    if key_path.exists() {
        debug!("Using existing SSH key: {}", key_path.display());
        return Ok(key_path);
    }

    if let Some(parent) = key_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!("Generating new SSH key pair at {}", key_path.display());
    let output = Command::new("ssh-keygen")
        .arg("-q")
        .arg("-t")
        .arg("rsa")
        .arg("-b")
        .arg("4096")
        .arg("-N")
        .arg("")
        .arg("-C")
        .arg(KEY_COMMENT)
        .arg("-f")
        .arg(&key_path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::KeyGeneration {
            message: format!("Failed to launch ssh-keygen: {}", e),
        })?;

    if !output.status.success() {
        return Err(Error::KeyGeneration {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    info!("Generated new SSH key pair: {}", key_path.display());
    Ok(key_path)
}

/// Installs the auto-generated public key into the remote `authorized_keys`.
///
/// The session must authenticate with a password: the key being installed is
/// not accepted yet. Success is confirmed by the marker string the install
/// command echoes.
pub fn install_auto_key(config: &RemoteSyncConfig) -> Result<()> {
    let pub_key_path = auto_public_key_path();
    if !pub_key_path.exists() {
        return Err(Error::NoPublicKey {
            path: pub_key_path.display().to_string(),
        });
    }

    if config.auth_method != AuthMethod::Password
        || config.password.as_deref().unwrap_or("").is_empty()
    {
        return Err(Error::PasswordRequired);
    }

    let public_key = std::fs::read_to_string(&pub_key_path)?.trim().to_string();

    info!("Installing SSH public key on {}", config.host);
    let mut session = SshSession::connect_with_password(config)?;

    let install_cmd = format!(
        "mkdir -p ~/.ssh && chmod 700 ~/.ssh && \
         echo '{}' >> ~/.ssh/authorized_keys && \
         chmod 600 ~/.ssh/authorized_keys && \
         echo 'SSH key installed successfully'",
        public_key
    );

    let result = session.exec(&install_cmd)?;
    session.close();

    if result.contains(INSTALL_SUCCESS_MARKER) {
        info!("SSH key installed on remote server");
        Ok(())
    } else {
        Err(Error::RemoteInstallFailed { output: result })
    }
}

/// Ensures the key pair exists and installs it on the remote.
pub fn setup_auto_key(config: &RemoteSyncConfig) -> Result<()> {
    generate_key_pair()?;
    install_auto_key(config)
}
