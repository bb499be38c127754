//! Parallel upload worker pool.
//!
//! Workers share nothing but the file queue and two counters; every file
//! transfer is its own `scp` subprocess, so each worker gets an independent
//! TCP/SSH connection and no session is multiplexed across threads.

use crate::progress::{ProgressCallback, SyncProgress};
use crate::scp;
use crate::tasks::FileUploadTask;
use craftsync_core::RemoteSyncConfig;
use crossbeam_channel::TryRecvError;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of a pool run.
#[derive(Debug, Clone)]
pub struct UploadPoolOutcome {
    /// Files processed (successes and failures)
    pub completed: usize,

    /// Files whose transfer failed
    pub failed: usize,

    /// Total files enqueued
    pub total: usize,

    /// Whether the wall-clock ceiling was hit
    pub timed_out: bool,

    /// Whether cancellation was observed
    pub cancelled: bool,
}

impl UploadPoolOutcome {
    /// True when every file was processed and none failed.
    pub fn is_complete_success(&self) -> bool {
        !self.timed_out && !self.cancelled && self.completed == self.total && self.failed == 0
    }
}

/// Drains `files` through `worker_count` scp workers.
///
/// Cancellation is observed between dequeues: in-flight subprocesses run to
/// completion, then their worker exits. Hitting `ceiling` sets the shared
/// cancel flag so workers wind down, and the outcome reports a timeout.
pub fn run_upload_pool(
    config: &RemoteSyncConfig,
    key_path: &Path,
    files: Vec<FileUploadTask>,
    worker_count: usize,
    cancelled: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
    ceiling: Duration,
) -> UploadPoolOutcome {
    let total = files.len();
    let completed = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let (tx, rx) = crossbeam_channel::bounded::<FileUploadTask>(total.max(1));
    for file in files {
        // The channel is sized to hold the whole queue
        tx.send(file).ok();
    }
    drop(tx);

    let start = Instant::now();
    let mut handles = Vec::with_capacity(worker_count);
    for worker_num in 1..=worker_count {
        let rx = rx.clone();
        let config = config.clone();
        let key_path = key_path.to_path_buf();
        let cancelled = Arc::clone(&cancelled);
        let completed = Arc::clone(&completed);
        let failed = Arc::clone(&failed);
        let progress = progress.clone();

        handles.push(thread::spawn(move || {
            let worker_name = format!("W{}", worker_num);
            debug!("[{}] Started", worker_name);

            loop {
                if cancelled.load(Ordering::SeqCst) {
                    break;
                }
                let task = match rx.try_recv() {
                    Ok(task) => task,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                };

                let result = scp::scp_upload(
                    &config,
                    &key_path,
                    &task.local_path,
                    &task.remote_path,
                    false,
                );
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

                match result {
                    Ok(()) => {
                        let pct = if total > 0 { done * 100 / total } else { 100 };
                        debug!(
                            "[{}] [{}%] {} ({}/{})",
                            worker_name, pct, task.display_name, done, total
                        );
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::SeqCst);
                        warn!("[{}] FAILED: {} - {}", worker_name, task.display_name, e);
                    }
                }

                if let Some(progress) = &progress {
                    progress(SyncProgress::new(
                        format!("[{}] {}", worker_name, task.display_name),
                        done,
                        total,
                    ));
                }
            }

            debug!("[{}] Done - no more files in queue", worker_name);
        }));
    }

    // Wait for the pool, enforcing the wall-clock ceiling. On ceiling hit
    // the cancel flag stops further dequeues; current transfers finish.
    let mut timed_out = false;
    loop {
        if !timed_out && start.elapsed() > ceiling {
            warn!("Upload ceiling reached after {:?}, cancelling workers", ceiling);
            cancelled.store(true, Ordering::SeqCst);
            timed_out = true;
        }
        if handles.iter().all(|h| h.is_finished()) {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }
    for handle in handles {
        handle.join().ok();
    }

    let outcome = UploadPoolOutcome {
        completed: completed.load(Ordering::SeqCst),
        failed: failed.load(Ordering::SeqCst),
        total,
        timed_out,
        cancelled: cancelled.load(Ordering::SeqCst) && !timed_out,
    };
    info!(
        "Parallel sync complete: {}/{} files{}",
        outcome.completed,
        outcome.total,
        if outcome.failed > 0 {
            format!(" ({} failed)", outcome.failed)
        } else {
            String::new()
        }
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn make_files(dir: &Path, count: usize) -> Vec<FileUploadTask> {
        (0..count)
            .map(|i| {
                let local = dir.join(format!("f{}.bin", i));
                fs::write(&local, vec![i as u8; 16]).unwrap();
                FileUploadTask {
                    local_path: local,
                    remote_path: format!("/srv/mc/f{}.bin", i),
                    display_name: format!("f{}.bin", i),
                }
            })
            .collect()
    }

    fn unreachable_config() -> RemoteSyncConfig {
        // Port 1 on localhost: the scp subprocess fails immediately, which
        // exercises the counting paths without a live remote.
        let mut config = RemoteSyncConfig::new("127.0.0.1", 1, "nobody", "/srv/mc");
        config.connection_timeout_ms = 1000;
        config
    }

    #[test]
    fn test_pool_processes_every_file() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 8);
        let cancelled = Arc::new(AtomicBool::new(false));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let progress: ProgressCallback =
            Arc::new(move |p| seen_cb.lock().unwrap().push(p.completed_tasks));

        let outcome = run_upload_pool(
            &unreachable_config(),
            Path::new("/nonexistent/key"),
            files,
            3,
            cancelled,
            Some(progress),
            Duration::from_secs(300),
        );

        // Every file was attempted exactly once; all failed against the
        // unreachable remote.
        assert_eq!(outcome.completed, 8);
        assert_eq!(outcome.failed, 8);
        assert_eq!(outcome.total, 8);
        assert!(!outcome.timed_out);
        assert!(!outcome.cancelled);
        assert!(!outcome.is_complete_success());

        // Progress fired once per file with monotonically increasing counts
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 8);
        assert_eq!(*seen.iter().max().unwrap(), 8);
    }

    #[test]
    fn test_pre_set_cancel_drains_nothing() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 50);
        let cancelled = Arc::new(AtomicBool::new(true));

        let outcome = run_upload_pool(
            &unreachable_config(),
            Path::new("/nonexistent/key"),
            files,
            2,
            cancelled,
            None,
            Duration::from_secs(300),
        );

        assert!(outcome.cancelled);
        assert_eq!(outcome.completed, 0);
        assert!(outcome.completed < outcome.total);
    }

    #[test]
    fn test_empty_queue_is_trivially_complete() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let outcome = run_upload_pool(
            &unreachable_config(),
            Path::new("/nonexistent/key"),
            Vec::new(),
            4,
            cancelled,
            None,
            Duration::from_secs(300),
        );

        assert_eq!(outcome.total, 0);
        assert_eq!(outcome.completed, 0);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.is_complete_success());
    }
}
