//! Sync command

use anyhow::Result;
use camino::Utf8Path;
use craftsync_profiles::ProfileStore;
use craftsync_remote::{ProgressCallback, RemoteSyncService, SyncProgress};
use std::sync::Arc;

use crate::cli::SyncArgs;
use crate::commands::{load_remote_config, load_server};
use crate::output;

pub async fn run(
    args: SyncArgs,
    server_arg: Option<&Utf8Path>,
    config_arg: Option<&Utf8Path>,
) -> Result<()> {
    let server = load_server(server_arg)?;
    let config = load_remote_config(config_arg, args.password.as_deref())?;

    output::header(&format!("Sync {} -> {}", server.name, config));
    output::kv("Minecraft version", &server.minecraft_version);
    output::kv("Server type", &server.container_type().to_string());
    output::kv(
        "Subtrees",
        &selected_subtrees(&config).join(", "),
    );
    if config.clean_before_sync {
        output::kv("Clean before sync", "yes");
    }
    if config.restart_after_sync {
        output::kv("Restart after sync", "yes");
    }

    if args.dry_run {
        let tasks = craftsync_remote::tasks::build_sync_tasks(&server, &config);
        if tasks.is_empty() {
            output::warning("Nothing selected for sync");
            return Ok(());
        }
        output::info("Would sync:");
        for task in &tasks {
            output::item(&format!("{} -> {}", task.description, task.remote_path));
        }
        return Ok(());
    }

    // Pre-flight advisory: pushing a state that is not snapshotted
    let store = ProfileStore::default_location();
    if store.has_unsaved_changes(&server) {
        output::warning("The server has changes not saved to any profile");
    }

    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Proceed with sync?")
            .default(true)
            .interact()?;
        if !confirmed {
            output::info("Sync cancelled");
            return Ok(());
        }
    }

    let mut service = RemoteSyncService::new(server, config);

    // Per-file progress from the workers feeds one shared bar
    let bar = output::progress_bar(0, "syncing");
    let bar_for_updates = bar.clone();
    let progress: ProgressCallback = Arc::new(move |progress: SyncProgress| {
        if bar_for_updates.length().unwrap_or(0) != progress.total_tasks as u64 {
            bar_for_updates.set_length(progress.total_tasks as u64);
        }
        bar_for_updates.set_position(progress.completed_tasks as u64);
        bar_for_updates.set_message(progress.current_task.clone());
    });
    service.set_progress_callback(progress);

    let service = Arc::new(service);
    let service_for_cancel = Arc::clone(&service);
    let sync_task = tokio::task::spawn_blocking(move || service.sync());

    // Ctrl-C requests cancellation; the running sync observes the flag
    // between transfers and returns a cancelled result.
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            output::warning("Cancelling sync (in-flight transfers will finish)...");
            service_for_cancel.cancel();
        }
    });

    let result = sync_task.await?;
    ctrl_c.abort();
    bar.finish_and_clear();

    if result.success {
        output::success(&result.message);
        Ok(())
    } else {
        output::error(&result.message);
        anyhow::bail!("{}", result.message)
    }
}

fn selected_subtrees(config: &craftsync_core::RemoteSyncConfig) -> Vec<&'static str> {
    let mut selected = Vec::new();
    if config.sync_server_properties {
        selected.push("server.properties");
    }
    if config.sync_mods {
        selected.push("mods/");
    }
    if config.sync_configs {
        selected.push("config/");
    }
    if config.sync_plugins {
        selected.push("plugins/");
    }
    if config.sync_world {
        selected.push("world/");
    }
    selected
}
