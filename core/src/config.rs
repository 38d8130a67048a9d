//! TOML Configuration File Support
//!
//! Session-level tunables loaded from a TOML file at
//! `~/.config/weft/session.toml` (XDG Base Directory compliant), with
//! defaults for everything so a missing file is never an error for the
//! caller who uses [`SessionConfig::default`].
//!
//! # Example Configuration
//!
//! ```toml
//! channel_capacity = 64
//! mouse_policy = "broadcast"
//!
//! [border_glyphs]
//! top_left = "+"
//! top_right = "+"
//! bottom_left = "+"
//! bottom_right = "+"
//! vertical = "|"
//! horizontal = "-"
//! left_t = "+"
//! right_t = "+"
//! top_t = "+"
//! bottom_t = "+"
//! cross = "+"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::BorderGlyphs;
use crate::router::MousePolicy;
use crate::style::Attribute;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Session-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of every fabric and raw-input channel.
    pub channel_capacity: usize,
    /// Overlapping clickable-region delivery policy.
    pub mouse_policy: MousePolicy,
    /// Box-drawing characters for window borders.
    pub border_glyphs: BorderGlyphs,
    /// Root window foreground.
    pub root_fg: Attribute,
    /// Root window background.
    pub root_bg: Attribute,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            mouse_policy: MousePolicy::default(),
            border_glyphs: BorderGlyphs::default(),
            root_fg: Attribute::BLUE,
            root_bg: Attribute::BLACK,
        }
    }
}

/// The XDG-compliant default configuration path, when a config
/// directory can be determined.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("weft").join("session.toml"))
}

/// Load configuration from the default path. A missing file yields the
/// defaults.
///
/// # Errors
///
/// [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<SessionConfig, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Ok(SessionConfig::default()),
    }
}

/// Load configuration from an explicit path.
///
/// # Errors
///
/// [`ConfigError`] if the file cannot be read or parsed.
pub fn load_config_from_path(path: &Path) -> Result<SessionConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}
