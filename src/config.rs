//! Runtime configuration, loaded from TOML.
//!
//! ```toml
//! [ice]
//! role = "controlling"
//! max_pairs = 100
//!
//! [transport]
//! mode = "loopback"      # or "none"
//! connect_delay_ms = 0
//!
//! [media]
//! enabled_kinds = ["audio", "video"]
//!
//! [logging]
//! level = "info"
//!
//! [signaling]
//! wait_timeout_ms = 30000
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ice::{IceRole, MAX_PAIR_LIMIT},
    log::LogLevel,
    track::TrackKind,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration of a peer connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtcConfiguration {
    pub ice: IceConfig,
    pub transport: TransportConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
    pub signaling: SignalingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IceConfig {
    /// Role used for pair priorities.
    pub role: IceRole,
    /// Upper bound on candidate pairs per connection.
    pub max_pairs: usize,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            role: IceRole::Controlling,
            max_pairs: MAX_PAIR_LIMIT,
        }
    }
}

/// Which transport implementation backs connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// In-process transport.
    #[default]
    Loopback,
    /// No transport present: nothing is gathered and every attempt fails.
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub mode: TransportMode,
    /// Artificial latency of each connectivity attempt, in milliseconds.
    pub connect_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Track kinds the codec factory accepts.
    pub enabled_kinds: Vec<TrackKind>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            enabled_kinds: vec![TrackKind::Audio, TrackKind::Video],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info.as_str().to_owned(),
        }
    }
}

/// Settings of the in-process signaling relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// How long a `wait` with nothing queued hangs before answering with
    /// the peer list, in milliseconds.
    pub wait_timeout_ms: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 30_000,
        }
    }
}

impl LoggingConfig {
    /// # Errors
    /// `ConfigError::Invalid` for an unknown level name.
    pub fn level(&self) -> Result<LogLevel, ConfigError> {
        self.level.parse().map_err(ConfigError::Invalid)
    }
}

impl RtcConfiguration {
    /// Loads and validates a TOML file.
    ///
    /// # Errors
    /// `Read` if the file cannot be read, `Parse` for invalid TOML, `Invalid`
    /// when [`validate`](Self::validate) fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// # Errors
    /// `Parse` for invalid TOML, `Invalid` when validation fails.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `ConfigError::Invalid` naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ice.max_pairs == 0 {
            return Err(ConfigError::Invalid("ice.max_pairs must be at least 1".into()));
        }
        if self.ice.max_pairs > MAX_PAIR_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "ice.max_pairs must not exceed {MAX_PAIR_LIMIT}"
            )));
        }
        if self.media.enabled_kinds.is_empty() {
            return Err(ConfigError::Invalid(
                "media.enabled_kinds must name at least one kind".into(),
            ));
        }
        if self.signaling.wait_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "signaling.wait_timeout_ms must be at least 1".into(),
            ));
        }
        self.logging.level()?;
        Ok(())
    }

    /// # Errors
    /// `ConfigError::Invalid` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_is_valid_loopback_config() {
        let cfg = RtcConfiguration::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.transport.mode, TransportMode::Loopback);
        assert_eq!(cfg.ice.max_pairs, MAX_PAIR_LIMIT);
        assert_eq!(cfg.logging.level().unwrap(), LogLevel::Info);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let cfg = RtcConfiguration::from_toml_str(
            "[transport]\nmode = \"none\"\n\n[ice]\nrole = \"controlled\"\n",
        )
        .unwrap();
        assert_eq!(cfg.transport.mode, TransportMode::None);
        assert_eq!(cfg.transport.connect_delay_ms, 0);
        assert_eq!(cfg.ice.role, IceRole::Controlled);
        assert_eq!(cfg.ice.max_pairs, MAX_PAIR_LIMIT);
        assert_eq!(cfg.media, MediaConfig::default());
        assert_eq!(cfg.signaling.wait_timeout_ms, 30_000);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[media]\nenabled_kinds = [\"audio\"]\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let cfg = RtcConfiguration::load(file.path()).unwrap();
        assert_eq!(cfg.media.enabled_kinds, vec![TrackKind::Audio]);
        assert_eq!(cfg.logging.level().unwrap(), LogLevel::Debug);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RtcConfiguration::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            RtcConfiguration::from_toml_str("[ice]\nmax_pairs = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RtcConfiguration::from_toml_str("[media]\nenabled_kinds = []\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RtcConfiguration::from_toml_str("[logging]\nlevel = \"loud\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RtcConfiguration::from_toml_str("[signaling]\nwait_timeout_ms = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RtcConfiguration::from_toml_str("[transport]\nmode = \"carrier-pigeon\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let cfg = RtcConfiguration::default();
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(RtcConfiguration::from_toml_str(&text).unwrap(), cfg);
    }
}
