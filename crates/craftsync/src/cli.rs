//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// CraftSync - remote sync and snapshots for Minecraft servers
#[derive(Parser, Debug)]
#[command(name = "craftsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the remote sync config file (default: platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Server root directory (default: current directory)
    #[arg(short, long, global = true)]
    pub server: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Profile snapshots: save, list, restore, delete, diff
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Push the server state to the remote host
    Sync(SyncArgs),

    /// Show the remote container status
    Status(StatusArgs),

    /// Start the remote container
    Start(StartArgs),

    /// Stop the remote container
    Stop(StopArgs),

    /// Test the connection or set up key authentication
    Connect(ConnectArgs),

    /// Remote sync configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

// Profile commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Save a new profile snapshot
    Save(ProfileSaveArgs),

    /// List saved profiles
    List(ProfileListArgs),

    /// Restore a profile into the server directory
    Restore(ProfileRestoreArgs),

    /// Delete a profile and its archive
    Delete(ProfileDeleteArgs),

    /// Show changes since the active profile
    Diff(ProfileDiffArgs),
}

/// Backup mode selection on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackupModeArg {
    /// Configuration only (server.properties, config/, whitelist, bans)
    Normal,

    /// Configuration plus mods/, plugins/, coremods/, jarmods/
    Mods,

    /// Everything, including world data
    Full,
}

impl From<BackupModeArg> for craftsync_profiles::BackupMode {
    fn from(arg: BackupModeArg) -> Self {
        match arg {
            BackupModeArg::Normal => craftsync_profiles::BackupMode::Normal,
            BackupModeArg::Mods => craftsync_profiles::BackupMode::NormalPlusMods,
            BackupModeArg::Full => craftsync_profiles::BackupMode::Full,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProfileSaveArgs {
    /// Profile name (unique per server)
    pub name: String,

    /// Optional description
    #[arg(short, long)]
    pub description: Option<String>,

    /// What to include
    #[arg(short, long, default_value = "mods", value_enum)]
    pub mode: BackupModeArg,
}

#[derive(Args, Debug)]
pub struct ProfileListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ProfileRestoreArgs {
    /// Profile name or id
    pub profile: String,

    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct ProfileDeleteArgs {
    /// Profile name or id
    pub profile: String,

    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct ProfileDiffArgs {
    /// List every changed path instead of a summary
    #[arg(long)]
    pub full: bool,
}

// Sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Show what would be synced without transferring
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Password for password authentication (prompted if omitted)
    #[arg(long)]
    pub password: Option<String>,
}

// Status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Password for password authentication (prompted if omitted)
    #[arg(long)]
    pub password: Option<String>,
}

// Start command
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Password for password authentication (prompted if omitted)
    #[arg(long)]
    pub password: Option<String>,
}

// Stop command
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Password for password authentication (prompted if omitted)
    #[arg(long)]
    pub password: Option<String>,
}

// Connect command
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Generate the dedicated key pair and install it on the remote
    #[arg(long)]
    pub setup_key: bool,

    /// Password for the key installation (prompted if omitted)
    #[arg(long)]
    pub password: Option<String>,
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a new remote sync config
    Init(ConfigInitArgs),

    /// Show the resolved configuration
    Show(ConfigShowArgs),

    /// Validate the configuration
    Validate(ConfigValidateArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Remote hostname or IP
    #[arg(long)]
    pub host: String,

    /// SSH port
    #[arg(long, default_value = "22")]
    pub port: u16,

    /// SSH username
    #[arg(long)]
    pub username: String,

    /// Remote server directory
    #[arg(long, default_value = "/srv/docker/minecraft")]
    pub remote_path: String,

    /// Overwrite an existing config
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigValidateArgs {}
