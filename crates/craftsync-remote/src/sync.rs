//! The remote sync orchestrator.
//!
//! `sync()` runs a fixed phase pipeline: advisory pre-stop, version
//! manifest, remote clean, enumeration, upload (parallel scp pool or
//! sequential SFTP), post-start. Any phase failure after pre-stop aborts the
//! pipeline with that phase's reason; per-file upload failures accumulate
//! instead.

use crate::keys::{auto_key_path, has_auto_key};
use crate::progress::{ProgressCallback, SyncProgress, SyncResult};
use crate::scp;
use crate::session::SshSession;
use crate::tasks::{build_sync_tasks, flatten_tasks, remote_directories, SyncTask};
use crate::workers::run_upload_pool;
use craftsync_core::{Error, RemoteSyncConfig, Result, Server, SyncMode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Wall-clock ceiling for the parallel upload phase.
const UPLOAD_CEILING: Duration = Duration::from_secs(60 * 60);

/// Settle delay between issuing the start command and querying status.
const START_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Name of the version manifest file under the remote path.
const VERSION_MANIFEST_FILENAME: &str = ".atlauncher.env";

/// Heredoc sentinel for writing the manifest; stable so arbitrary manifest
/// content cannot terminate the document early.
const MANIFEST_HEREDOC_TAG: &str = "CSENV";

/// Remote subtrees eligible for pre-sync cleaning. World data is never
/// auto-cleaned.
const CLEANABLE_DIRS: &[(&str, fn(&RemoteSyncConfig) -> bool)] = &[
    ("mods", |c| c.sync_mods),
    ("config", |c| c.sync_configs),
    ("plugins", |c| c.sync_plugins),
];

/// Pushes a local server state to the configured remote host.
pub struct RemoteSyncService {
    server: Server,
    config: RemoteSyncConfig,
    cancelled: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
}

impl RemoteSyncService {
    pub fn new(server: Server, config: RemoteSyncConfig) -> Self {
        Self {
            server,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Registers a progress callback. Parallel workers call it from their
    /// own threads.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    /// Requests cancellation. Observed between sequential tasks and between
    /// per-file dequeues; in-flight transfers run to completion, so the
    /// remote may hold truncated files from the cancelled transfer.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        info!("Sync cancelled by user");
    }

    /// A handle other threads can use to cancel a running sync.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn emit_progress(&self, task: &str, completed: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(SyncProgress::new(task, completed, total));
        }
    }

    /// Queries the remote container's status.
    pub fn server_status(&self) -> SyncResult {
        info!("Checking remote server status...");
        match self.exec_single(&self.config.status_command) {
            Ok(output) if output.is_empty() => SyncResult::ok("Server is not running"),
            Ok(output) => SyncResult::ok(format!("Server status: {}", output)),
            Err(e) => SyncResult::failure(format!("Failed to check status: {}", e)),
        }
    }

    /// Starts the remote container, waits briefly, and reports its status.
    pub fn start_server(&self) -> SyncResult {
        info!("Starting remote server...");

        let run = || -> Result<String> {
            let mut session = SshSession::connect(&self.config)?;
            let result = session.exec(&self.config.start_command)?;
            debug!("Start command result: {}", result);

            info!("Waiting for container to start...");
            thread::sleep(START_SETTLE_DELAY);
            let status = session.exec(&self.config.status_command)?;
            session.close();
            Ok(status)
        };

        match run() {
            Ok(status) => {
                if status.is_empty() {
                    warn!("Container may not have started properly");
                } else {
                    info!("Container is running: {}", status);
                }
                SyncResult::ok(format!("Server started. Status: {}", status))
            }
            Err(e) => SyncResult::failure(format!("Failed to start server: {}", e)),
        }
    }

    /// Stops the remote container.
    pub fn stop_server(&self) -> SyncResult {
        info!("Stopping remote server...");
        match self.exec_single(&self.config.stop_command) {
            Ok(result) => {
                debug!("Stop command result: {}", result);
                SyncResult::ok("Server stopped")
            }
            Err(e) => SyncResult::failure(format!("Failed to stop server: {}", e)),
        }
    }

    /// Removes the contents of each selected cleanable subtree on the
    /// remote.
    pub fn clean_directories(&self) -> SyncResult {
        info!("Cleaning remote directories...");

        let run = || -> Result<()> {
            let mut session = SshSession::connect(&self.config)?;
            for (name, selected) in CLEANABLE_DIRS {
                if selected(&self.config) {
                    info!("Cleaning {}/...", name);
                    session.exec(&format!("rm -rf {}/{}/*", self.config.remote_path, name))?;
                }
            }
            session.close();
            Ok(())
        };

        match run() {
            Ok(()) => {
                info!("Remote directories cleaned");
                SyncResult::ok("Directories cleaned")
            }
            Err(e) => SyncResult::failure(format!("Failed to clean directories: {}", e)),
        }
    }

    /// Builds the version manifest content for the server's loader.
    fn version_manifest_content(&self) -> String {
        let container_type = self.server.container_type();
        let mut content = String::from("# Auto-generated by CraftSync\n");
        content.push_str(&format!("MC_VERSION={}\n", self.server.minecraft_version));
        content.push_str(&format!("MC_TYPE={}\n", container_type));

        if let (Some(var), Some(version)) = (
            container_type.loader_version_var(),
            self.server.loader_version(),
        ) {
            content.push_str(&format!("{}={}\n", var, version));
        }
        content
    }

    /// Writes the version manifest to `<remotePath>/.atlauncher.env`.
    ///
    /// The container composition on the remote reads it as an env file to
    /// pick the Minecraft version and loader at next start.
    pub fn write_version_manifest(&self) -> SyncResult {
        let container_type = self.server.container_type();
        info!("Updating remote server version...");
        info!("  Minecraft version: {}", self.server.minecraft_version);
        info!("  Server type: {}", container_type);
        if let Some(version) = self.server.loader_version() {
            info!("  Loader version: {}", version);
        }

        let manifest_path = format!("{}/{}", self.config.remote_path, VERSION_MANIFEST_FILENAME);
        let command = format!(
            "cat > {} << '{}'\n{}{}",
            manifest_path,
            MANIFEST_HEREDOC_TAG,
            self.version_manifest_content(),
            MANIFEST_HEREDOC_TAG
        );

        match self.exec_single(&command) {
            Ok(_) => {
                info!("Created {}", manifest_path);
                SyncResult::ok(format!(
                    "Version updated: {} ({})",
                    self.server.minecraft_version, container_type
                ))
            }
            Err(e) => SyncResult::failure(format!("Failed to update version: {}", e)),
        }
    }

    /// Runs the full sync pipeline.
    pub fn sync(&self) -> SyncResult {
        self.cancelled.store(false, Ordering::SeqCst);
        info!("=== Starting sync to {} ===", self.config.host);
        info!("Local server: {}", self.server.name);
        info!("Remote path: {}", self.config.remote_path);
        info!("Minecraft version: {}", self.server.minecraft_version);
        info!("Server type: {}", self.server.container_type());

        // Transfer mode is files-only: the lifecycle phases (pre-stop,
        // version manifest, clean, post-start) require exec and are skipped.
        let lifecycle = self.config.sync_mode == SyncMode::Commands;
        if !lifecycle {
            info!("Transfer mode: skipping lifecycle phases");
        }

        // Pre-stop is advisory: the container may simply not be running.
        if lifecycle && self.config.restart_after_sync {
            info!("Stopping remote server before sync...");
            let stop = self.stop_server();
            if !stop.success {
                warn!("Could not stop server (may not be running): {}", stop.message);
            }
        }

        if lifecycle && self.config.sync_version {
            let version = self.write_version_manifest();
            if !version.success {
                return version;
            }
        }

        if lifecycle && self.config.clean_before_sync {
            let clean = self.clean_directories();
            if !clean.success {
                return clean;
            }
        }

        let tasks = build_sync_tasks(&self.server, &self.config);
        if tasks.is_empty() {
            warn!("No files selected for sync");
            return SyncResult::failure(Error::NothingSelected.to_string());
        }
        info!("Sync tasks: {}", tasks.len());

        let parallel_count = self.config.parallel_transfer_count.max(1);
        let upload = if parallel_count > 1 && has_auto_key() {
            self.upload_parallel(&tasks, parallel_count)
        } else {
            if parallel_count > 1 {
                warn!("No auto-generated SSH key found; falling back to sequential SFTP");
            }
            self.upload_sequential(&tasks)
        };
        let upload = match upload {
            Ok(result) => result,
            Err(e) => return SyncResult::failure(e.to_string()),
        };

        if lifecycle && self.config.restart_after_sync {
            info!("Starting remote server after sync...");
            let start = self.start_server();
            if !start.success {
                return SyncResult::failure(format!(
                    "Sync completed but failed to start server: {}",
                    start.message
                ));
            }
        }

        info!("=== Sync complete ===");
        SyncResult::ok(upload.message)
    }

    /// Parallel upload: pre-create all remote directories from one setup
    /// session, then drain a flat file queue through the scp worker pool.
    fn upload_parallel(&self, tasks: &[SyncTask], worker_count: usize) -> Result<SyncResult> {
        let key_path = auto_key_path();
        info!(
            "Using parallel native scp with {} workers (shared file queue)...",
            worker_count
        );
        info!("Using SSH key: {}", key_path.display());

        let mut setup = SshSession::connect(&self.config)?;
        for task in tasks {
            for dir in remote_directories(task) {
                setup.exec(&format!("mkdir -p {}", dir))?;
            }
        }
        setup.close();
        info!("Remote directories created");

        let files = flatten_tasks(tasks)?;
        let total = files.len();
        info!("Total files to transfer: {}", total);
        if total == 0 {
            return Ok(SyncResult::ok("No files to sync"));
        }

        let outcome = run_upload_pool(
            &self.config,
            &key_path,
            files,
            worker_count,
            Arc::clone(&self.cancelled),
            self.progress.clone(),
            UPLOAD_CEILING,
        );

        if outcome.timed_out {
            return Err(Error::Timeout);
        }
        if outcome.cancelled {
            return Err(Error::Cancelled);
        }

        if outcome.completed == outcome.total {
            self.emit_progress("Complete", outcome.total, outcome.total);
        }
        info!("=== File sync complete (parallel scp) ===");
        Ok(SyncResult::ok(format!(
            "Sync completed: {}/{} files{}",
            outcome.completed,
            outcome.total,
            if outcome.failed > 0 {
                format!(" ({} failed)", outcome.failed)
            } else {
                String::new()
            }
        )))
    }

    /// Sequential upload over a single session, preserving enumeration
    /// order. Per-task failures are logged and accumulated.
    fn upload_sequential(&self, tasks: &[SyncTask]) -> Result<SyncResult> {
        let mut session = SshSession::connect(&self.config)?;
        let mut completed = 0usize;
        let mut failed_files = 0usize;

        for task in tasks {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(Error::Cancelled);
            }

            self.emit_progress(&task.description, completed, tasks.len());
            info!("Syncing: {}", task.description);

            let result = if task.is_directory {
                if self.config.use_fast_transfer {
                    session.upload_directory_fast(&task.local_path, &task.remote_path)
                } else {
                    session.upload_directory(&task.local_path, &task.remote_path)
                }
            } else {
                session
                    .sftp_put(&task.local_path, &task.remote_path)
                    .map(|()| (1, 0))
            };

            match result {
                Ok((_, failed)) => failed_files += failed,
                Err(e) => {
                    failed_files += 1;
                    warn!("  ERROR: {}", e);
                }
            }
            completed += 1;
        }

        session.close();
        self.emit_progress("Complete", tasks.len(), tasks.len());
        info!("=== File sync complete ===");
        Ok(SyncResult::ok(if failed_files > 0 {
            format!("Sync completed ({} files failed)", failed_files)
        } else {
            "Sync completed successfully".to_string()
        }))
    }

    /// Connects, runs one command, and closes.
    fn exec_single(&self, command: &str) -> Result<String> {
        let mut session = SshSession::connect(&self.config)?;
        let output = session.exec(command)?;
        session.close();
        Ok(output)
    }
}

/// Tests the connection and verifies the remote path exists.
///
/// Prefers a native `ssh` probe when the auto-key exists (closest to what
/// the scp workers will experience), then falls back to an in-process
/// session probe. Either way the remote path check runs over a session.
pub fn test_connection(config: &RemoteSyncConfig) -> SyncResult {
    info!("Testing connection to {}...", config.host);

    if has_auto_key() && scp::ssh_probe(config, &auto_key_path()) {
        debug!("Native ssh probe succeeded");
    }

    let mut session = match SshSession::connect(config) {
        Ok(session) => session,
        Err(e) => return SyncResult::failure(format!("Connection failed: {}", e)),
    };

    match session.exec("echo 'connection test' && uname -a") {
        Ok(output) => debug!("Remote system: {}", output),
        Err(e) => return SyncResult::failure(format!("Connection failed: {}", e)),
    }

    if !session.exists(&config.remote_path) {
        return SyncResult::failure(
            Error::RemotePathMissing {
                path: config.remote_path.clone(),
            }
            .to_string(),
        );
    }

    session.close();
    info!("Connection test successful");
    SyncResult::ok("Connection successful")
}

#[cfg(test)]
mod tests {
    use super::*;
    use craftsync_core::{Loader, LoaderVersion};

    fn service_for(server: Server) -> RemoteSyncService {
        let config = RemoteSyncConfig::new("mc.example.com", 22, "mc", "/srv/docker/minecraft");
        RemoteSyncService::new(server, config)
    }

    #[test]
    fn test_manifest_content_for_forge() {
        let server = Server::new("forge", "/tmp/srv", "1.21.1")
            .with_loader(LoaderVersion::new(Loader::Forge, "50.0.1"));
        let service = service_for(server);

        let content = service.version_manifest_content();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# Auto-generated by CraftSync",
                "MC_VERSION=1.21.1",
                "MC_TYPE=FORGE",
                "FORGE_VERSION=50.0.1",
            ]
        );
    }

    #[test]
    fn test_manifest_content_for_vanilla_has_no_loader_line() {
        let server = Server::new("plain", "/tmp/srv", "1.20.4");
        let service = service_for(server);

        let content = service.version_manifest_content();
        assert!(content.contains("MC_TYPE=VANILLA"));
        assert!(!content.contains("FORGE"));
        assert!(!content.contains("FABRIC"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_manifest_content_for_paper_has_no_loader_line() {
        let server = Server::new("paper", "/tmp/srv", "1.21.1")
            .with_loader(LoaderVersion::new(Loader::Paper, "123"));
        let service = service_for(server);

        let content = service.version_manifest_content();
        assert!(content.contains("MC_TYPE=PAPER"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_cancel_sets_flag() {
        let service = service_for(Server::new("s", "/tmp/srv", "1.21.1"));
        assert!(!service.cancel_flag().load(Ordering::SeqCst));
        service.cancel();
        assert!(service.cancel_flag().load(Ordering::SeqCst));
    }

    #[test]
    fn test_cleanable_dirs_never_include_world() {
        assert!(CLEANABLE_DIRS.iter().all(|(name, _)| *name != "world"));
    }
}
