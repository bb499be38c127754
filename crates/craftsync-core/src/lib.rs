//! Core types shared across the CraftSync workspace.
//!
//! This crate carries the pieces every other crate consumes: the workspace
//! error type, the `Server` entity with its loader taxonomy, and the
//! `RemoteSyncConfig` connection/policy model.

pub mod config;
pub mod error;
pub mod server;
pub mod utils;

pub use config::{AuthMethod, RemoteSyncConfig, SyncMode};
pub use error::{Error, Result};
pub use server::{ContainerType, Loader, LoaderVersion, Server};
