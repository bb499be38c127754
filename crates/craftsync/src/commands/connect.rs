//! Connect command: connection test and key setup

use anyhow::Result;
use camino::Utf8Path;
use craftsync_core::AuthMethod;
use craftsync_remote::keys;

use crate::cli::ConnectArgs;
use crate::commands::load_remote_config;
use crate::output;

pub async fn run(args: ConnectArgs, config_arg: Option<&Utf8Path>) -> Result<()> {
    if args.setup_key {
        setup_key(args, config_arg).await
    } else {
        test(args, config_arg).await
    }
}

async fn test(args: ConnectArgs, config_arg: Option<&Utf8Path>) -> Result<()> {
    let config = load_remote_config(config_arg, args.password.as_deref())?;

    output::header(&format!("Testing connection to {}", config));

    let spinner = output::spinner("Connecting...");
    let result =
        tokio::task::spawn_blocking(move || craftsync_remote::test_connection(&config)).await?;
    spinner.finish_and_clear();

    if result.success {
        output::success(&result.message);
        Ok(())
    } else {
        output::error(&result.message);
        anyhow::bail!("{}", result.message)
    }
}

async fn setup_key(args: ConnectArgs, config_arg: Option<&Utf8Path>) -> Result<()> {
    let mut config = load_remote_config(config_arg, args.password.as_deref())?;

    output::header(&format!("Setting up key authentication for {}", config));
    output::kv("Key", &keys::auto_key_path().display().to_string());

    // Installation authenticates with a password; the key being installed
    // is not accepted by the remote yet.
    if config.password.is_none() {
        let password = dialoguer::Password::new()
            .with_prompt(format!("Password for {}@{}", config.username, config.host))
            .interact()?;
        config.password = Some(password);
    }
    config.auth_method = AuthMethod::Password;

    let spinner = output::spinner("Generating and installing key...");
    let result = tokio::task::spawn_blocking(move || keys::setup_auto_key(&config)).await?;
    spinner.finish_and_clear();
    result?;

    output::success("SSH key installed on remote server");
    output::info("Future connections and parallel transfers will use key authentication");
    Ok(())
}
