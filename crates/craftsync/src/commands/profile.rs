//! Profile commands: save, list, restore, delete, diff

use anyhow::Result;
use camino::Utf8Path;
use craftsync_profiles::{BackupMode, ProfileStore};

use crate::cli::{
    ProfileCommands, ProfileDeleteArgs, ProfileDiffArgs, ProfileListArgs, ProfileRestoreArgs,
    ProfileSaveArgs,
};
use crate::commands::load_server;
use crate::output;

pub async fn run(command: ProfileCommands, server_arg: Option<&Utf8Path>) -> Result<()> {
    match command {
        ProfileCommands::Save(args) => save(args, server_arg).await,
        ProfileCommands::List(args) => list(args, server_arg),
        ProfileCommands::Restore(args) => restore(args, server_arg).await,
        ProfileCommands::Delete(args) => delete(args, server_arg),
        ProfileCommands::Diff(args) => diff(args, server_arg).await,
    }
}

async fn save(args: ProfileSaveArgs, server_arg: Option<&Utf8Path>) -> Result<()> {
    let server = load_server(server_arg)?;
    let store = ProfileStore::default_location();
    let mode: BackupMode = args.mode.into();

    output::header(&format!("Saving profile '{}'", args.name));
    output::kv("Server", &server.name);
    output::kv("Mode", mode.describe());

    let spinner = output::spinner("Scanning and archiving...");
    let profile = tokio::task::spawn_blocking(move || {
        store.save(&server, &args.name, args.description, mode)
    })
    .await??;
    spinner.finish_and_clear();

    output::success(&format!(
        "Profile '{}' saved ({})",
        profile.name,
        profile.formatted_size()
    ));
    output::kv("Contents", &profile.contents.summary());
    output::kv("Archive", &profile.archive_filename);
    Ok(())
}

fn list(args: ProfileListArgs, server_arg: Option<&Utf8Path>) -> Result<()> {
    let server = load_server(server_arg)?;
    let store = ProfileStore::default_location();
    let index = store.load_index(&server);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }

    output::header(&format!("Profiles for {}", server.name));
    if index.profiles.is_empty() {
        output::info("No profiles saved yet");
        return Ok(());
    }

    for profile in &index.profiles {
        let active = index.active_profile_id == Some(profile.id);
        let marker = if active { " (active)" } else { "" };
        output::item(&format!(
            "{}{} - {} - {} - {}",
            profile.name,
            marker,
            profile.backup_mode.short_label(),
            profile.formatted_size(),
            profile.created_at.format("%Y-%m-%d %H:%M UTC"),
        ));
        if let Some(description) = &profile.description {
            output::kv("description", description);
        }
        output::kv("contents", &profile.contents.summary());
    }
    Ok(())
}

async fn restore(args: ProfileRestoreArgs, server_arg: Option<&Utf8Path>) -> Result<()> {
    let server = load_server(server_arg)?;
    let store = ProfileStore::default_location();

    let Some(profile) = store.find(&server, &args.profile) else {
        anyhow::bail!("Profile not found: {}", args.profile);
    };

    if store.has_unsaved_changes(&server) {
        output::warning("The server has unsaved changes; restoring will overwrite them");
    }
    output::info("Restore overlays the snapshot: files created since the save are kept");

    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Restore profile '{}'?", profile.name))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Restore cancelled");
            return Ok(());
        }
    }

    let spinner = output::spinner("Extracting archive...");
    let name = profile.name.clone();
    let result =
        tokio::task::spawn_blocking(move || store.restore(&server, profile.id)).await?;
    spinner.finish_and_clear();
    result?;

    output::success(&format!("Profile '{}' restored", name));
    Ok(())
}

fn delete(args: ProfileDeleteArgs, server_arg: Option<&Utf8Path>) -> Result<()> {
    let server = load_server(server_arg)?;
    let store = ProfileStore::default_location();

    let Some(profile) = store.find(&server, &args.profile) else {
        anyhow::bail!("Profile not found: {}", args.profile);
    };

    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Delete profile '{}' ({})?",
                profile.name,
                profile.formatted_size()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Delete cancelled");
            return Ok(());
        }
    }

    store.delete(&server, profile.id)?;
    output::success(&format!("Profile '{}' deleted", profile.name));
    Ok(())
}

async fn diff(args: ProfileDiffArgs, server_arg: Option<&Utf8Path>) -> Result<()> {
    let server = load_server(server_arg)?;
    let store = ProfileStore::default_location();

    let spinner = output::spinner("Comparing against active profile...");
    let result = tokio::task::spawn_blocking(move || store.detect_changes(&server)).await?;
    spinner.finish_and_clear();

    if !result.has_changes {
        output::success(&result.summary());
        return Ok(());
    }

    output::warning(&result.summary());
    if args.full {
        for path in &result.added_files {
            output::item(&format!("added:    {}", path));
        }
        for path in &result.modified_files {
            output::item(&format!("modified: {}", path));
        }
        for path in &result.deleted_files {
            output::item(&format!("deleted:  {}", path));
        }
    }
    Ok(())
}
