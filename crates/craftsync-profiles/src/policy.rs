//! Backup modes and the inclusion policy they select.
//!
//! The policy is a pure predicate over forward-slash relative paths inside a
//! server root. It drives both archive creation and change detection, so the
//! two always agree on what a snapshot covers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server configuration files matched exactly in `Normal` mode.
const NORMAL_FILES: &[&str] = &[
    "server.properties",
    "ops.json",
    "whitelist.json",
    "banned-players.json",
    "banned-ips.json",
    "bukkit.yml",
    "spigot.yml",
    "paper.yml",
    "paper-global.yml",
    "paper-world-defaults.yml",
    "eula.txt",
    "server.json",
];

/// Directories added on top of `Normal` by `NormalPlusMods`.
const MOD_DIRS: &[&str] = &["mods", "plugins", "coremods", "jarmods"];

/// Selects which files a profile snapshot admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupMode {
    /// Configuration only: server.properties, config/, whitelist, bans
    Normal,

    /// Configuration plus mods/, plugins/, coremods/, jarmods/
    NormalPlusMods,

    /// Everything in the server directory, including world data
    Full,
}

impl BackupMode {
    /// Returns true if `path` belongs to a snapshot taken in this mode.
    ///
    /// Backslashes are normalized to forward slashes before matching, so
    /// Windows-produced paths match the same table.
    pub fn includes(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        match self {
            BackupMode::Normal => {
                NORMAL_FILES.contains(&normalized.as_str())
                    || normalized == "config"
                    || normalized.starts_with("config/")
            }
            BackupMode::NormalPlusMods => {
                BackupMode::Normal.includes(&normalized)
                    || MOD_DIRS.iter().any(|dir| {
                        normalized == *dir || normalized.starts_with(&format!("{}/", dir))
                    })
            }
            BackupMode::Full => true,
        }
    }

    /// Human description of what this mode covers.
    pub fn describe(&self) -> &'static str {
        match self {
            BackupMode::Normal => {
                "Configuration only (server.properties, config/, whitelist, bans)"
            }
            BackupMode::NormalPlusMods => "Configuration + Mods (adds mods/, plugins/)",
            BackupMode::Full => "Full backup (everything including world data)",
        }
    }

    /// Short label used in listings.
    pub fn short_label(&self) -> &'static str {
        match self {
            BackupMode::Normal => "Config Only",
            BackupMode::NormalPlusMods => "Config + Mods",
            BackupMode::Full => "Full Backup",
        }
    }

    /// Returns all modes, narrowest first.
    pub fn all() -> [BackupMode; 3] {
        [
            BackupMode::Normal,
            BackupMode::NormalPlusMods,
            BackupMode::Full,
        ]
    }
}

impl fmt::Display for BackupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            BackupMode::Normal => "normal",
            BackupMode::NormalPlusMods => "normal+mods",
            BackupMode::Full => "full",
        };
        write!(f, "{}", tag)
    }
}

impl FromStr for BackupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(BackupMode::Normal),
            "normal+mods" | "normal-plus-mods" | "mods" => Ok(BackupMode::NormalPlusMods),
            "full" => Ok(BackupMode::Full),
            other => Err(format!("Unknown backup mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_matches_config_files() {
        assert!(BackupMode::Normal.includes("server.properties"));
        assert!(BackupMode::Normal.includes("eula.txt"));
        assert!(BackupMode::Normal.includes("config"));
        assert!(BackupMode::Normal.includes("config/mymod/settings.toml"));

        assert!(!BackupMode::Normal.includes("mods/a.jar"));
        assert!(!BackupMode::Normal.includes("world/region/r.0.0.mca"));
        assert!(!BackupMode::Normal.includes("server.jar"));
        // Prefix rules match directories, not name prefixes
        assert!(!BackupMode::Normal.includes("configuration.txt"));
    }

    #[test]
    fn test_normal_plus_mods_adds_mod_dirs() {
        assert!(BackupMode::NormalPlusMods.includes("server.properties"));
        assert!(BackupMode::NormalPlusMods.includes("mods"));
        assert!(BackupMode::NormalPlusMods.includes("mods/a.jar"));
        assert!(BackupMode::NormalPlusMods.includes("plugins/worldedit.jar"));
        assert!(BackupMode::NormalPlusMods.includes("coremods/legacy.jar"));
        assert!(BackupMode::NormalPlusMods.includes("jarmods/patch.jar"));

        assert!(!BackupMode::NormalPlusMods.includes("world/level.dat"));
        assert!(!BackupMode::NormalPlusMods.includes("modsummary.txt"));
    }

    #[test]
    fn test_full_includes_everything() {
        assert!(BackupMode::Full.includes("world/region/r.0.0.mca"));
        assert!(BackupMode::Full.includes("logs/latest.log"));
        assert!(BackupMode::Full.includes("anything/at/all"));
    }

    #[test]
    fn test_modes_are_monotonic() {
        let paths = [
            "server.properties",
            "config/a.toml",
            "mods/a.jar",
            "plugins/b.jar",
            "world/level.dat",
            "logs/latest.log",
            "random.bin",
        ];
        for path in paths {
            if BackupMode::Normal.includes(path) {
                assert!(
                    BackupMode::NormalPlusMods.includes(path),
                    "{} in normal but not normal+mods",
                    path
                );
            }
            if BackupMode::NormalPlusMods.includes(path) {
                assert!(
                    BackupMode::Full.includes(path),
                    "{} in normal+mods but not full",
                    path
                );
            }
        }
    }

    #[test]
    fn test_backslash_normalization() {
        assert!(BackupMode::Normal.includes("config\\foo.yml"));
        assert!(BackupMode::NormalPlusMods.includes("mods\\a.jar"));
    }

    #[test]
    fn test_serde_tags() {
        assert_eq!(
            serde_json::to_string(&BackupMode::NormalPlusMods).unwrap(),
            "\"NORMAL_PLUS_MODS\""
        );
        let mode: BackupMode = serde_json::from_str("\"NORMAL\"").unwrap();
        assert_eq!(mode, BackupMode::Normal);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("normal".parse::<BackupMode>().unwrap(), BackupMode::Normal);
        assert_eq!(
            "normal+mods".parse::<BackupMode>().unwrap(),
            BackupMode::NormalPlusMods
        );
        assert_eq!("FULL".parse::<BackupMode>().unwrap(), BackupMode::Full);
        assert!("everything".parse::<BackupMode>().is_err());
    }
}
