//! TOML configuration file for the client.
//!
//! The file is optional.  A missing file, a missing section or a missing
//! field all fall back to the defaults below, so the client runs out of the
//! box against the public relay:
//!
//! ```toml
//! log_level = "info"
//!
//! [keyer]
//! wpm = 25
//! iambic_mode = "b"      # "a" or "b"
//! active_low = false     # true for contacts wired to ground (pull-up)
//!
//! [audio]
//! tx_tone_hz = 600
//! rx_tone_hz = 700
//!
//! [receiver]
//! jitter_buffer_ms = 4000
//!
//! [relay]
//! host = "vail.woozle.org"
//! port = 80
//! channel = "Example"
//! subprotocol = "binary.vail.woozle.org"
//! ```
//!
//! # Serde default values (for beginners)
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file.  Sections
//! annotated with plain `#[serde(default)]` fall back to their `Default`
//! implementation when the whole `[section]` is missing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vail_core::{KeyerTiming, Polarity};

use crate::application::keyer::IambicMode;

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

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub keyer: KeyerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Paddle and keying speed settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyerConfig {
    /// Keying speed in words per minute (PARIS).
    #[serde(default = "default_wpm")]
    pub wpm: u16,
    #[serde(default)]
    pub iambic_mode: IambicMode,
    /// Contacts pull the pin low when pressed.
    #[serde(default)]
    pub active_low: bool,
}

/// Tone pitches.  Both tones share one driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioConfig {
    /// Local sidetone.
    #[serde(default = "default_tx_tone_hz")]
    pub tx_tone_hz: u32,
    /// Playback of remote stations.
    #[serde(default = "default_rx_tone_hz")]
    pub rx_tone_hz: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Delay added to every remote timestamp before playback.
    #[serde(default = "default_jitter_buffer_ms")]
    pub jitter_buffer_ms: u64,
}

/// Where the relay lives and which channel to join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Relay channel ("repeater") name.
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_subprotocol")]
    pub subprotocol: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_wpm() -> u16 {
    25
}
fn default_tx_tone_hz() -> u32 {
    600
}
fn default_rx_tone_hz() -> u32 {
    700
}
fn default_jitter_buffer_ms() -> u64 {
    4000
}
fn default_host() -> String {
    "vail.woozle.org".to_string()
}
fn default_port() -> u16 {
    80
}
fn default_channel() -> String {
    "Example".to_string()
}
fn default_subprotocol() -> String {
    "binary.vail.woozle.org".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            keyer: KeyerConfig::default(),
            audio: AudioConfig::default(),
            receiver: ReceiverConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl Default for KeyerConfig {
    fn default() -> Self {
        Self {
            wpm: default_wpm(),
            iambic_mode: IambicMode::default(),
            active_low: false,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            tx_tone_hz: default_tx_tone_hz(),
            rx_tone_hz: default_rx_tone_hz(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            jitter_buffer_ms: default_jitter_buffer_ms(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            channel: default_channel(),
            subprotocol: default_subprotocol(),
        }
    }
}

impl KeyerConfig {
    pub fn timing(&self) -> KeyerTiming {
        KeyerTiming::from_wpm(self.wpm)
    }

    pub fn polarity(&self) -> Polarity {
        if self.active_low {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        }
    }
}

impl RelayConfig {
    /// Request path that joins `channel` on the relay.
    pub fn path(&self) -> String {
        format!("/chat?repeater={}", self.channel)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Renders `config` as TOML, e.g. to seed a new config file.
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] if serialization fails.
pub fn to_toml(config: &AppConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
