//! Native `scp`/`ssh` subprocess invocation.
//!
//! The fast transfer path and the parallel worker pool both shell out to
//! `scp` with key authentication: every invocation is its own TCP/SSH
//! connection, so workers never share session state.

use craftsync_core::{Error, RemoteSyncConfig, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Builds the `user@host:path` target string for scp.
fn scp_target(config: &RemoteSyncConfig, remote_path: &str) -> String {
    format!("{}@{}:{}", config.username, config.host, remote_path)
}

/// Uploads a file (or, with `recursive`, a directory) via `scp`.
///
/// `StrictHostKeyChecking=no` matches the session layer's relaxed host key
/// policy; `BatchMode=yes` keeps a missing key from degrading into an
/// interactive prompt.
pub fn scp_upload(
    config: &RemoteSyncConfig,
    key_path: &Path,
    local_path: &Path,
    remote_path: &str,
    recursive: bool,
) -> Result<()> {
    let mut command = Command::new("scp");
    if recursive {
        command.arg("-r");
    }
    command
        .arg("-o")
        .arg("StrictHostKeyChecking=no")
        .arg("-o")
        .arg("BatchMode=yes")
        .arg("-P")
        .arg(config.port.to_string())
        .arg("-i")
        .arg(key_path)
        .arg(local_path)
        .arg(scp_target(config, remote_path))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(
        "Running: scp {}{} -> {}",
        if recursive { "-r " } else { "" },
        local_path.display(),
        remote_path
    );

    let mut child = command
        .spawn()
        .map_err(|e| Error::ssh(format!("Failed to launch scp: {}", e)))?;

    // Drain stdout so a chatty transfer can't block on a full pipe
    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
            debug!("scp: {}", line);
        }
    }
    let mut stderr_output = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        stderr.read_to_string(&mut stderr_output).ok();
    }

    let status = child
        .wait()
        .map_err(|e| Error::ssh(format!("Failed to wait for scp: {}", e)))?;

    if status.success() {
        Ok(())
    } else {
        let detail = stderr_output.trim();
        Err(Error::ssh(format!(
            "scp failed with exit code {}{}",
            status.code().unwrap_or(-1),
            if detail.is_empty() {
                String::new()
            } else {
                format!(": {}", detail)
            }
        )))
    }
}

/// Probes the connection with the native `ssh` binary and the given key.
///
/// Cheaper and closer to what the scp workers will experience than an
/// in-process session. Returns false on any failure.
pub fn ssh_probe(config: &RemoteSyncConfig, key_path: &Path) -> bool {
    let output = Command::new("ssh")
        .arg("-i")
        .arg(key_path)
        .arg("-o")
        .arg("StrictHostKeyChecking=no")
        .arg("-o")
        .arg("BatchMode=yes")
        .arg("-o")
        .arg("ConnectTimeout=10")
        .arg("-p")
        .arg(config.port.to_string())
        .arg(format!("{}@{}", config.username, config.host))
        .arg("echo 'Connection test successful'")
        .stdin(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).contains("successful")
        }
        Ok(output) => {
            debug!(
                "Native ssh probe failed (exit {:?}): {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            false
        }
        Err(e) => {
            warn!("Native ssh unavailable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scp_target_format() {
        let config = RemoteSyncConfig::new("mc.example.com", 2222, "mc", "/srv/mc");
        assert_eq!(
            scp_target(&config, "/srv/mc/mods/a.jar"),
            "mc@mc.example.com:/srv/mc/mods/a.jar"
        );
    }

    #[test]
    fn test_scp_upload_fails_cleanly_for_unreachable_host() {
        let mut config = RemoteSyncConfig::new("127.0.0.1", 1, "nobody", "/tmp");
        config.connection_timeout_ms = 1000;
        let key = Path::new("/nonexistent/key");

        // Either scp is missing (launch error) or it exits nonzero; both are
        // reported as an ssh error, never a panic.
        let result = scp_upload(&config, key, Path::new("/etc/hostname"), "/tmp/x", false);
        assert!(result.is_err());
    }
}
