//! The local server a sync or snapshot operation works on.
//!
//! CraftSync does not own server installation or launch; it only reads the
//! fields below. The loader taxonomy maps onto the `TYPE` tag understood by
//! the itzg/minecraft-server container image.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the descriptor file inside a server root.
pub const SERVER_DESCRIPTOR: &str = "server.json";

/// A Minecraft server directory as seen by the sync and profile engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /// Display name of the server
    pub name: String,

    /// Root directory containing the server's files.
    /// Derived from the descriptor's location, never serialized.
    #[serde(skip, default)]
    pub root: PathBuf,

    /// Minecraft version (e.g. "1.21.1")
    pub minecraft_version: String,

    /// Mod loader, if any (vanilla servers have none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderVersion>,
}

impl Server {
    /// Creates a server descriptor rooted at the given directory.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, minecraft_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            minecraft_version: minecraft_version.into(),
            loader: None,
        }
    }

    /// Sets the loader for this server.
    pub fn with_loader(mut self, loader: LoaderVersion) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Loads a server from the `server.json` descriptor inside `root`.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let descriptor = root.join(SERVER_DESCRIPTOR);
        if !descriptor.exists() {
            return Err(Error::validation(format!(
                "No {} found in {}",
                SERVER_DESCRIPTOR,
                root.display()
            )));
        }

        let data = std::fs::read_to_string(&descriptor)?;
        let mut server: Server = serde_json::from_str(&data)?;
        server.root = root;
        Ok(server)
    }

    /// Filesystem-safe name used for per-server directories.
    /// Strips every character outside `[A-Za-z0-9]`.
    pub fn safe_name(&self) -> String {
        self.name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
    }

    /// The server's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Container `TYPE` tag for this server's loader.
    pub fn container_type(&self) -> ContainerType {
        self.loader
            .as_ref()
            .map(|l| l.loader.container_type())
            .unwrap_or(ContainerType::Vanilla)
    }

    /// Loader version string, if the server has a loader.
    pub fn loader_version(&self) -> Option<&str> {
        self.loader.as_ref().map(|l| l.version.as_str())
    }
}

/// A loader plus its version, as installed on a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderVersion {
    /// The modding platform
    pub loader: Loader,

    /// Platform version string (e.g. "50.0.1")
    pub version: String,
}

impl LoaderVersion {
    pub fn new(loader: Loader, version: impl Into<String>) -> Self {
        Self {
            loader,
            version: version.into(),
        }
    }
}

/// The modding platform a server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Forge,
    NeoForge,
    Fabric,
    Quilt,
    Paper,
    Purpur,
}

impl Loader {
    /// Maps the loader onto the container image's `TYPE` tag.
    pub fn container_type(&self) -> ContainerType {
        match self {
            Loader::Forge => ContainerType::Forge,
            Loader::NeoForge => ContainerType::NeoForge,
            Loader::Fabric => ContainerType::Fabric,
            Loader::Quilt => ContainerType::Quilt,
            Loader::Paper => ContainerType::Paper,
            Loader::Purpur => ContainerType::Purpur,
        }
    }
}

/// The `TYPE` value written into the remote version manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContainerType {
    Vanilla,
    Forge,
    NeoForge,
    Fabric,
    Quilt,
    Paper,
    Purpur,
}

impl ContainerType {
    /// Environment variable carrying the loader version for this type,
    /// or None where the container derives it from the Minecraft version.
    pub fn loader_version_var(&self) -> Option<&'static str> {
        match self {
            ContainerType::Forge => Some("FORGE_VERSION"),
            ContainerType::NeoForge => Some("NEOFORGE_VERSION"),
            ContainerType::Fabric => Some("FABRIC_LOADER_VERSION"),
            ContainerType::Quilt => Some("QUILT_LOADER_VERSION"),
            ContainerType::Vanilla | ContainerType::Paper | ContainerType::Purpur => None,
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ContainerType::Vanilla => "VANILLA",
            ContainerType::Forge => "FORGE",
            ContainerType::NeoForge => "NEOFORGE",
            ContainerType::Fabric => "FABRIC",
            ContainerType::Quilt => "QUILT",
            ContainerType::Paper => "PAPER",
            ContainerType::Purpur => "PURPUR",
        };
        write!(f, "{}", tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name_strips_special_characters() {
        let server = Server::new("My Server (SMP)!", "/tmp/srv", "1.21.1");
        assert_eq!(server.safe_name(), "MyServerSMP");
    }

    #[test]
    fn test_container_type_defaults_to_vanilla() {
        let server = Server::new("plain", "/tmp/srv", "1.21.1");
        assert_eq!(server.container_type(), ContainerType::Vanilla);
        assert_eq!(server.loader_version(), None);
    }

    #[test]
    fn test_container_type_from_loader() {
        let server = Server::new("modded", "/tmp/srv", "1.21.1")
            .with_loader(LoaderVersion::new(Loader::Forge, "50.0.1"));
        assert_eq!(server.container_type(), ContainerType::Forge);
        assert_eq!(server.loader_version(), Some("50.0.1"));
    }

    #[test]
    fn test_loader_version_vars() {
        assert_eq!(
            ContainerType::Forge.loader_version_var(),
            Some("FORGE_VERSION")
        );
        assert_eq!(
            ContainerType::NeoForge.loader_version_var(),
            Some("NEOFORGE_VERSION")
        );
        assert_eq!(
            ContainerType::Fabric.loader_version_var(),
            Some("FABRIC_LOADER_VERSION")
        );
        assert_eq!(
            ContainerType::Quilt.loader_version_var(),
            Some("QUILT_LOADER_VERSION")
        );
        assert_eq!(ContainerType::Paper.loader_version_var(), None);
        assert_eq!(ContainerType::Purpur.loader_version_var(), None);
        assert_eq!(ContainerType::Vanilla.loader_version_var(), None);
    }

    #[test]
    fn test_load_descriptor_sets_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SERVER_DESCRIPTOR),
            r#"{"name":"SMP","minecraftVersion":"1.21.1","loader":{"loader":"fabric","version":"0.16.5"}}"#,
        )
        .unwrap();

        let server = Server::load(dir.path()).unwrap();
        assert_eq!(server.name, "SMP");
        assert_eq!(server.root, dir.path());
        assert_eq!(server.container_type(), ContainerType::Fabric);
    }

    #[test]
    fn test_load_missing_descriptor_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Server::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("server.json"));
    }

    #[test]
    fn test_container_type_display() {
        assert_eq!(ContainerType::Vanilla.to_string(), "VANILLA");
        assert_eq!(ContainerType::NeoForge.to_string(), "NEOFORGE");
        assert_eq!(ContainerType::Purpur.to_string(), "PURPUR");
    }
}
