//! Start command

use anyhow::Result;
use camino::Utf8Path;
use craftsync_remote::RemoteSyncService;

use crate::cli::StartArgs;
use crate::commands::{load_remote_config, load_server};
use crate::output;

pub async fn run(
    args: StartArgs,
    server_arg: Option<&Utf8Path>,
    config_arg: Option<&Utf8Path>,
) -> Result<()> {
    let server = load_server(server_arg)?;
    let config = load_remote_config(config_arg, args.password.as_deref())?;

    output::header(&format!("Starting {}", config));

    let service = RemoteSyncService::new(server, config);
    let spinner = output::spinner("Starting remote container...");
    let result = tokio::task::spawn_blocking(move || service.start_server()).await?;
    spinner.finish_and_clear();

    if result.success {
        output::success(&result.message);
        Ok(())
    } else {
        output::error(&result.message);
        anyhow::bail!("{}", result.message)
    }
}
