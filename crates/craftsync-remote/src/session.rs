//! Blocking SSH/SFTP session over libssh2.
//!
//! One caller owns one session for one lifecycle. Host key verification is
//! deliberately relaxed (operator-trust model); a deployment wanting
//! known_hosts semantics should layer its own trust store.

use crate::keys::{auto_key_path, has_auto_key};
use crate::scp;
use craftsync_core::{AuthMethod, Error, RemoteSyncConfig, Result};
use ssh2::Session;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Keepalive interval in seconds; keeps long transfers from idling out.
const KEEPALIVE_INTERVAL_SECS: u32 = 30;

/// An authenticated SSH session to the configured host.
pub struct SshSession {
    config: RemoteSyncConfig,
    session: Option<Session>,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("config", &self.config)
            .field("session", &self.session.is_some())
            .finish()
    }
}

impl SshSession {
    /// Connects and authenticates according to the config.
    ///
    /// With password auth configured and an auto-generated key present, the
    /// key is tried first (it negotiates much faster); on rejection a fresh
    /// session is built for the password attempt. A half-authenticated
    /// session is never reused across credential types.
    pub fn connect(config: &RemoteSyncConfig) -> Result<Self> {
        Self::establish(config, false)
    }

    /// Connects with password authentication only, even when a key exists.
    /// Required while installing a key the remote does not yet accept.
    pub fn connect_with_password(config: &RemoteSyncConfig) -> Result<Self> {
        Self::establish(config, true)
    }

    fn establish(config: &RemoteSyncConfig, force_password: bool) -> Result<Self> {
        debug!(
            "Connecting to {}@{}:{}",
            config.username, config.host, config.port
        );

        match config.auth_method {
            AuthMethod::Key => {
                let session = Self::raw_connect(config)?;
                Self::authenticate_with_key(config, &session)?;
                debug!("Connected successfully");
                Ok(Self {
                    config: config.clone(),
                    session: Some(session),
                })
            }
            AuthMethod::Password => {
                if !force_password && has_auto_key() {
                    let key = auto_key_path();
                    debug!("Trying auto-generated SSH key first: {}", key.display());
                    let session = Self::raw_connect(config)?;
                    match session.userauth_pubkey_file(&config.username, None, &key, None) {
                        Ok(()) => {
                            debug!("Connected successfully");
                            return Ok(Self {
                                config: config.clone(),
                                session: Some(session),
                            });
                        }
                        Err(e) => {
                            debug!("Key auth failed, retrying with password: {}", e);
                        }
                    }
                    // The rejected session is dropped; password auth gets a
                    // fresh one.
                }

                let session = Self::raw_connect(config)?;
                let password = config.password.as_deref().unwrap_or("");
                session
                    .userauth_password(&config.username, password)
                    .map_err(|e| {
                        Error::auth_failed(&config.username, &config.host, e.to_string())
                    })?;
                debug!("Connected successfully");
                Ok(Self {
                    config: config.clone(),
                    session: Some(session),
                })
            }
        }
    }

    /// TCP connect + SSH handshake, no authentication.
    fn raw_connect(config: &RemoteSyncConfig) -> Result<Session> {
        let address = format!("{}:{}", config.host, config.port);
        let socket_addr = address
            .to_socket_addrs()
            .map_err(|e| Error::connect_failed(&config.host, config.port, e.to_string()))?
            .next()
            .ok_or_else(|| {
                Error::connect_failed(&config.host, config.port, "no address resolved")
            })?;

        let timeout = Duration::from_millis(u64::from(config.connection_timeout_ms));
        let tcp = TcpStream::connect_timeout(&socket_addr, timeout)
            .map_err(|e| Error::connect_failed(&config.host, config.port, e.to_string()))?;

        let mut session = Session::new()
            .map_err(|e| Error::ssh(format!("Failed to create session: {}", e)))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(config.connection_timeout_ms);
        session
            .handshake()
            .map_err(|e| Error::connect_failed(&config.host, config.port, e.to_string()))?;
        session.set_keepalive(true, KEEPALIVE_INTERVAL_SECS);

        Ok(session)
    }

    /// Key authentication, preferring the auto-generated key when the
    /// configured path is unset, default, or missing.
    fn authenticate_with_key(config: &RemoteSyncConfig, session: &Session) -> Result<()> {
        let configured = config.effective_key_path();
        let use_auto = has_auto_key()
            && (config.private_key_path.is_none()
                || configured == RemoteSyncConfig::default_key_path()
                || !configured.exists());

        let key_path = if use_auto {
            let path = auto_key_path();
            debug!("Using auto-generated SSH key: {}", path.display());
            path
        } else {
            debug!("Using SSH key: {}", configured.display());
            configured
        };

        session
            .userauth_pubkey_file(
                &config.username,
                None,
                &key_path,
                config.key_passphrase.as_deref(),
            )
            .map_err(|e| Error::auth_failed(&config.username, &config.host, e.to_string()))
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| Error::ssh("Not connected"))
    }

    /// Returns true while the session is open.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Executes a command, returning trimmed stdout.
    ///
    /// Stderr is logged line by line. A nonzero exit status is logged but
    /// not raised: commands are operator-supplied shell strings whose
    /// semantics this layer cannot judge.
    pub fn exec(&mut self, command: &str) -> Result<String> {
        let session = self.session()?;
        debug!("Executing: {}", command);

        let mut channel = session
            .channel_session()
            .map_err(|e| Error::ssh(format!("Failed to open exec channel: {}", e)))?;
        channel
            .exec(command)
            .map_err(|e| Error::ssh(format!("Failed to exec command: {}", e)))?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|e| Error::ssh(format!("Failed to read command output: {}", e)))?;
        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr).ok();

        for line in stdout.lines() {
            debug!("  > {}", line);
        }
        for line in stderr.lines() {
            debug!("  [ERR] {}", line);
        }

        channel.wait_close().ok();
        let exit_status = channel.exit_status().unwrap_or(0);
        if exit_status != 0 {
            debug!("Command exited with status {}", exit_status);
        }

        Ok(stdout.trim().to_string())
    }

    /// Uploads a single file over SFTP, overwriting unconditionally.
    pub fn sftp_put(&mut self, local_path: &Path, remote_path: &str) -> Result<()> {
        let session = self.session()?;
        debug!("Uploading: {} -> {}", local_path.display(), remote_path);

        let sftp = session
            .sftp()
            .map_err(|e| Error::ssh(format!("Failed to open SFTP channel: {}", e)))?;
        let mut remote_file = sftp
            .create(Path::new(remote_path))
            .map_err(|e| Error::ssh(format!("Failed to create {}: {}", remote_path, e)))?;
        let mut local_file = std::fs::File::open(local_path)?;

        std::io::copy(&mut local_file, &mut remote_file)
            .map_err(|e| Error::ssh(format!("Failed to upload {}: {}", remote_path, e)))?;
        Ok(())
    }

    /// Creates a remote directory and every missing prefix, ignoring
    /// already-exists failures.
    pub fn mkdirp(&mut self, remote_path: &str) -> Result<()> {
        let session = self.session()?;
        let sftp = session
            .sftp()
            .map_err(|e| Error::ssh(format!("Failed to open SFTP channel: {}", e)))?;

        let mut current = String::new();
        for part in remote_path.split('/') {
            if part.is_empty() {
                continue;
            }
            current.push('/');
            current.push_str(part);
            if sftp.stat(Path::new(&current)).is_err() {
                sftp.mkdir(Path::new(&current), 0o755).ok();
            }
        }
        Ok(())
    }

    /// Checks whether a remote path exists. Any failure maps to false.
    pub fn exists(&mut self, remote_path: &str) -> bool {
        let Ok(session) = self.session() else {
            return false;
        };
        let Ok(sftp) = session.sftp() else {
            return false;
        };
        sftp.stat(Path::new(remote_path)).is_ok()
    }

    /// Uploads a directory tree file by file over SFTP.
    ///
    /// Per-file failures are logged and counted, never fatal. Returns
    /// (uploaded, failed).
    pub fn upload_directory(&mut self, local_dir: &Path, remote_dir: &str) -> Result<(usize, usize)> {
        debug!(
            "Uploading directory: {} -> {}",
            local_dir.display(),
            remote_dir
        );
        self.mkdirp(remote_dir)?;

        let mut uploaded = 0usize;
        let mut failed = 0usize;

        for entry in WalkDir::new(local_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let Ok(relative) = entry.path().strip_prefix(local_dir) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            let remote_path = format!(
                "{}/{}",
                remote_dir,
                relative.to_string_lossy().replace('\\', "/")
            );

            if entry.file_type().is_dir() {
                self.mkdirp(&remote_path)?;
            } else if entry.file_type().is_file() {
                match self.sftp_put(entry.path(), &remote_path) {
                    Ok(()) => uploaded += 1,
                    Err(e) => {
                        failed += 1;
                        warn!("Failed to upload {}: {}", remote_path, e);
                    }
                }
            }
        }

        debug!(
            "Directory upload complete: {} files uploaded{}",
            uploaded,
            if failed > 0 {
                format!(", {} failed", failed)
            } else {
                String::new()
            }
        );
        Ok((uploaded, failed))
    }

    /// Uploads a directory with `scp -r` when a usable key exists, falling
    /// back to per-file SFTP when the subprocess is unavailable or fails.
    pub fn upload_directory_fast(&mut self, local_dir: &Path, remote_dir: &str) -> Result<(usize, usize)> {
        let key_path = if has_auto_key() {
            Some(auto_key_path())
        } else if self.config.auth_method == AuthMethod::Key {
            Some(self.config.effective_key_path())
        } else {
            None
        };

        let Some(key_path) = key_path else {
            debug!("No usable key for scp, falling back to SFTP");
            return self.upload_directory(local_dir, remote_dir);
        };

        debug!(
            "Fast upload using scp: {} -> {}",
            local_dir.display(),
            remote_dir
        );
        match scp::scp_upload(&self.config, &key_path, local_dir, remote_dir, true) {
            Ok(()) => {
                let total = WalkDir::new(local_dir)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .count();
                debug!("Fast upload complete: {} files uploaded", total);
                Ok((total, 0))
            }
            Err(e) => {
                warn!("scp failed, falling back to SFTP: {}", e);
                self.upload_directory(local_dir, remote_dir)
            }
        }
    }

    /// Closes the session. Idempotent.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            let start = Instant::now();
            session.disconnect(None, "closing", None).ok();
            debug!("Session disconnected in {:?}", start.elapsed());
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_to_unreachable_host_fails_fast() {
        let mut config = RemoteSyncConfig::new("127.0.0.1", 1, "nobody", "/srv/mc");
        config.connection_timeout_ms = 500;

        let err = SshSession::connect(&config).unwrap_err();
        assert!(matches!(err, Error::ConnectFailed { .. }));
    }

    #[test]
    fn test_connect_to_unresolvable_host_is_connect_failure() {
        let mut config =
            RemoteSyncConfig::new("no-such-host.invalid", 22, "nobody", "/srv/mc");
        config.connection_timeout_ms = 500;

        let err = SshSession::connect(&config).unwrap_err();
        assert!(matches!(err, Error::ConnectFailed { .. }));
    }
}
