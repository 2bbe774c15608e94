// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Mapper configuration.
//!
//! Every option has a default, so an empty TOML document (or a partial one)
//! yields a usable configuration:
//!
//! ```toml
//! allow_part_spreading = true
//! map_to_preset_feeders = false
//! leave_associated_untouched = false
//! restrict_to_enabled = false
//! feed_set_name_max_distance = 3
//! value_whitespace_replacement = "_"
//! ignore_project_status = false
//! ```

use reelmap_model::{
    grouping::FEED_SET_NAME_MAX_DISTANCE, partmap::DEFAULT_VALUE_WHITESPACE_REPLACEMENT,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Errors raised while loading a [`MapperConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Options steering a mapping run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Split a part over several sets when no single set can hold it.
    pub allow_part_spreading: bool,
    /// Reuse slots the host already has configured with the part.
    pub map_to_preset_feeders: bool,
    /// Protect slots that already hold a part on the host (fiducials and
    /// homing targets excepted).
    pub leave_associated_untouched: bool,
    /// Only seed reservations at slots that are enabled on the host.
    pub restrict_to_enabled: bool,
    /// Maximum name distance for two slots to share a feed set.
    pub feed_set_name_max_distance: usize,
    /// Replacement for spaces in BOM values when building catalog ids;
    /// `None` leaves values untouched.
    pub value_whitespace_replacement: Option<String>,
    /// Map even when too little of the BOM matched the catalog.
    pub ignore_project_status: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            allow_part_spreading: true,
            map_to_preset_feeders: false,
            leave_associated_untouched: false,
            restrict_to_enabled: false,
            feed_set_name_max_distance: FEED_SET_NAME_MAX_DISTANCE,
            value_whitespace_replacement: Some(DEFAULT_VALUE_WHITESPACE_REPLACEMENT.to_owned()),
            ignore_project_status: false,
        }
    }
}

impl MapperConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.as_ref().display(), ?config, "loaded mapper config");
        Ok(config)
    }

    #[inline]
    pub fn whitespace_replacement(&self) -> Option<&str> {
        self.value_whitespace_replacement.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = MapperConfig::from_toml_str("").unwrap();
        assert_eq!(config, MapperConfig::default());
        assert!(config.allow_part_spreading);
        assert_eq!(config.feed_set_name_max_distance, 3);
        assert_eq!(config.whitespace_replacement(), Some("_"));
    }

    #[test]
    fn test_partial_document_overrides() {
        let config = MapperConfig::from_toml_str(
            "allow_part_spreading = false\nmap_to_preset_feeders = true\nvalue_whitespace_replacement = \"-\"\n",
        )
        .unwrap();
        assert!(!config.allow_part_spreading);
        assert!(config.map_to_preset_feeders);
        assert!(!config.leave_associated_untouched);
        assert_eq!(config.whitespace_replacement(), Some("-"));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = MapperConfig {
            restrict_to_enabled: true,
            feed_set_name_max_distance: 5,
            ..MapperConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(MapperConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = MapperConfig::from_toml_str("allow_part_spreading = maybe").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = MapperConfig::from_path("/nonexistent/reelmap.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
