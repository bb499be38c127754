//! Command implementations and shared loading helpers.

pub mod config;
pub mod connect;
pub mod profile;
pub mod start;
pub mod status;
pub mod stop;
pub mod sync;

use anyhow::{Context, Result};
use camino::Utf8Path;
use craftsync_core::{AuthMethod, RemoteSyncConfig, Server};
use std::path::PathBuf;

/// Resolves the server root from the `--server` flag or the current
/// directory and loads its descriptor.
pub fn load_server(server_arg: Option<&Utf8Path>) -> Result<Server> {
    let root = match server_arg {
        Some(path) => PathBuf::from(path.as_std_path()),
        None => std::env::current_dir()?,
    };
    Server::load(&root)
        .with_context(|| format!("Failed to load server from {}", root.display()))
}

/// Resolved config file location.
pub fn config_path(config_arg: Option<&Utf8Path>) -> PathBuf {
    match config_arg {
        Some(path) => PathBuf::from(path.as_std_path()),
        None => RemoteSyncConfig::default_path(),
    }
}

/// Loads the remote config, supplying the password (from a flag or an
/// interactive prompt) when password auth is configured.
pub fn load_remote_config(
    config_arg: Option<&Utf8Path>,
    password_arg: Option<&str>,
) -> Result<RemoteSyncConfig> {
    let path = config_path(config_arg);
    let mut config = RemoteSyncConfig::load(&path)
        .with_context(|| format!("Failed to load remote config from {} (run 'craftsync config init' first)", path.display()))?;

    if config.auth_method == AuthMethod::Password {
        let password = match password_arg {
            Some(password) => password.to_string(),
            None => dialoguer::Password::new()
                .with_prompt(format!("Password for {}@{}", config.username, config.host))
                .interact()?,
        };
        config.password = Some(password);
    }

    config.validate()?;
    Ok(config)
}
