//! Sync task enumeration.
//!
//! A [`SyncTask`] is a subtree-level unit selected by config flags; the
//! parallel upload path flattens tasks into per-file [`FileUploadTask`]s for
//! the worker queue.

use craftsync_core::{RemoteSyncConfig, Result, Server};
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

/// One selected subtree or file to push.
#[derive(Debug, Clone)]
pub struct SyncTask {
    /// Display label, e.g. "mods/"
    pub description: String,

    /// Local file or directory
    pub local_path: PathBuf,

    /// Absolute remote destination
    pub remote_path: String,

    /// Whether this task is a directory upload
    pub is_directory: bool,
}

/// One file in the shared upload queue.
#[derive(Debug, Clone)]
pub struct FileUploadTask {
    /// Local file
    pub local_path: PathBuf,

    /// Absolute remote file path
    pub remote_path: String,

    /// Label shown in progress output, e.g. "mods/create.jar"
    pub display_name: String,
}

/// Builds the task list from the config's subtree selection.
///
/// Subtrees missing on disk are silently skipped; an empty result means
/// nothing was selected or nothing selected exists.
pub fn build_sync_tasks(server: &Server, config: &RemoteSyncConfig) -> Vec<SyncTask> {
    let mut tasks = Vec::new();
    let root = server.root();

    if config.sync_server_properties {
        let props = root.join("server.properties");
        if props.is_file() {
            tasks.push(SyncTask {
                description: "server.properties".to_string(),
                local_path: props,
                remote_path: format!("{}/server.properties", config.remote_path),
                is_directory: false,
            });
        }
    }

    let dir_selections = [
        (config.sync_mods, "mods"),
        (config.sync_configs, "config"),
        (config.sync_plugins, "plugins"),
        (config.sync_world, "world"),
    ];
    for (selected, name) in dir_selections {
        if !selected {
            continue;
        }
        let dir = root.join(name);
        if dir.is_dir() {
            tasks.push(SyncTask {
                description: format!("{}/", name),
                local_path: dir,
                remote_path: format!("{}/{}", config.remote_path, name),
                is_directory: true,
            });
        } else {
            debug!("Skipping {} (not found under {})", name, root.display());
        }
    }

    tasks
}

/// Flattens directory tasks into individual file uploads, preserving
/// enumeration order.
pub fn flatten_tasks(tasks: &[SyncTask]) -> Result<Vec<FileUploadTask>> {
    let mut files = Vec::new();

    for task in tasks {
        if !task.is_directory {
            files.push(FileUploadTask {
                local_path: task.local_path.clone(),
                remote_path: task.remote_path.clone(),
                display_name: task.description.clone(),
            });
            continue;
        }

        for entry in WalkDir::new(&task.local_path)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                craftsync_core::Error::archive(format!("Failed to walk directory: {}", e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&task.local_path) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            files.push(FileUploadTask {
                local_path: entry.path().to_path_buf(),
                remote_path: format!("{}/{}", task.remote_path, relative),
                display_name: format!("{}{}", task.description, relative),
            });
        }
    }

    Ok(files)
}

/// Every remote directory a directory task needs, base first.
/// Pre-creating these from one session keeps the workers out of mkdir races.
pub fn remote_directories(task: &SyncTask) -> Vec<String> {
    let mut dirs = Vec::new();
    if !task.is_directory || !task.local_path.exists() {
        return dirs;
    }

    dirs.push(task.remote_path.clone());
    for entry in WalkDir::new(&task.local_path)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&task.local_path) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let relative = relative.to_string_lossy().replace('\\', "/");
        dirs.push(format!("{}/{}", task.remote_path, relative));
    }

    dirs
}
