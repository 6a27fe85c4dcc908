//! TOML-based configuration for the sidebar engine and its demo binary.
//!
//! The file is optional: a missing file yields [`SidebarConfig::default`].
//! Example:
//!
//! ```toml
//! [logging]
//! log_level = "debug"
//!
//! [refresh]
//! title_frame_interval_ms = 50
//! board_refresh_interval_ms = 1000
//! pager_switch_interval_ms = 0
//!
//! [protocol]
//! default_version = 765
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, so a partial file only overrides
//! what it names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sidebar_core::ProtocolVersion;
use thiserror::Error;

use crate::application::registry::BoardSettings;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SidebarConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshConfig {
    /// Delay between animated title frames.
    #[serde(default = "default_title_frame_interval_ms")]
    pub title_frame_interval_ms: u64,
    /// Period of the demo board's whole-board refresh; `0` disables it.
    #[serde(default = "default_board_refresh_interval_ms")]
    pub board_refresh_interval_ms: u64,
    /// Automatic page switching period; `0` disables it.
    #[serde(default)]
    pub pager_switch_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolConfig {
    /// Version assumed for demo viewers.
    #[serde(default = "default_protocol_version")]
    pub default_version: i32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_title_frame_interval_ms() -> u64 {
    50
}
fn default_board_refresh_interval_ms() -> u64 {
    1000
}
fn default_protocol_version() -> i32 {
    ProtocolVersion::MINECRAFT_1_20_3.0
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            title_frame_interval_ms: default_title_frame_interval_ms(),
            board_refresh_interval_ms: default_board_refresh_interval_ms(),
            pager_switch_interval_ms: 0,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            default_version: default_protocol_version(),
        }
    }
}

impl RefreshConfig {
    pub fn board_refresh_interval(&self) -> Option<Duration> {
        (self.board_refresh_interval_ms > 0).then(|| Duration::from_millis(self.board_refresh_interval_ms))
    }

    pub fn pager_switch_interval(&self) -> Option<Duration> {
        (self.pager_switch_interval_ms > 0).then(|| Duration::from_millis(self.pager_switch_interval_ms))
    }
}

impl ProtocolConfig {
    pub fn version(&self) -> ProtocolVersion {
        ProtocolVersion(self.default_version)
    }
}

impl From<&RefreshConfig> for BoardSettings {
    fn from(refresh: &RefreshConfig) -> Self {
        BoardSettings {
            // A zero interval would panic in the timer.
            title_frame_interval: Duration::from_millis(refresh.title_frame_interval_ms.max(1)),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `SidebarConfig` from `path`, returning the default if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<SidebarConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SidebarConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &SidebarConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        // Arrange / Act
        let cfg = SidebarConfig::default();

        // Assert
        assert_eq!(cfg.logging.log_level, "info");
        assert_eq!(cfg.refresh.title_frame_interval_ms, 50);
        assert_eq!(cfg.refresh.board_refresh_interval(), Some(Duration::from_secs(1)));
        assert_eq!(cfg.refresh.pager_switch_interval(), None);
        assert_eq!(cfg.protocol.version(), ProtocolVersion::MINECRAFT_1_20_3);
    }

    #[test]
    fn test_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = SidebarConfig::default();
        cfg.refresh.title_frame_interval_ms = 100;
        cfg.protocol.default_version = 47;

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: SidebarConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: SidebarConfig = toml::from_str("").expect("deserialize");
        assert_eq!(cfg, SidebarConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_named_fields() {
        let cfg: SidebarConfig = toml::from_str(
            r#"
            [refresh]
            pager_switch_interval_ms = 5000
            "#,
        )
        .expect("deserialize");

        assert_eq!(cfg.refresh.pager_switch_interval(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.refresh.title_frame_interval_ms, 50);
        assert_eq!(cfg.logging.log_level, "info");
    }

    #[test]
    fn test_zero_board_refresh_interval_disables_refresh() {
        let cfg: SidebarConfig = toml::from_str(
            r#"
            [refresh]
            board_refresh_interval_ms = 0
            "#,
        )
        .expect("deserialize");

        assert_eq!(cfg.refresh.board_refresh_interval(), None);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result: Result<SidebarConfig, _> = toml::from_str("[refresh\ntitle = ");
        assert!(result.is_err());
    }

    #[test]
    fn test_board_settings_from_refresh_config() {
        let mut refresh = RefreshConfig::default();
        refresh.title_frame_interval_ms = 0;

        let settings = BoardSettings::from(&refresh);

        assert_eq!(settings.title_frame_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_save_then_load_round_trips_through_disk() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("sidebar-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("sidebar.toml");
        let mut cfg = SidebarConfig::default();
        cfg.logging.log_level = "debug".to_string();

        // Act
        save_config(&path, &cfg).expect("save");
        let loaded = load_config(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join(format!("absent-{}.toml", uuid::Uuid::new_v4()));
        assert_eq!(load_config(&path).expect("load"), SidebarConfig::default());
    }
}
