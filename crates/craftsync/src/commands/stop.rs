//! Stop command

use anyhow::Result;
use camino::Utf8Path;
use craftsync_remote::RemoteSyncService;

use crate::cli::StopArgs;
use crate::commands::{load_remote_config, load_server};
use crate::output;

pub async fn run(
    args: StopArgs,
    server_arg: Option<&Utf8Path>,
    config_arg: Option<&Utf8Path>,
) -> Result<()> {
    let server = load_server(server_arg)?;
    let config = load_remote_config(config_arg, args.password.as_deref())?;

    output::header(&format!("Stopping {}", config));

    let service = RemoteSyncService::new(server, config);
    let spinner = output::spinner("Stopping remote container...");
    let result = tokio::task::spawn_blocking(move || service.stop_server()).await?;
    spinner.finish_and_clear();

    if result.success {
        output::success(&result.message);
        Ok(())
    } else {
        output::error(&result.message);
        anyhow::bail!("{}", result.message)
    }
}
