// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Writer settings, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Buffer size at which emitted bytes are handed to the sink.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Wire format of the payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    /// JSON with `odata.*` annotations.
    #[default]
    Json,
    /// Atom XML.
    Atom,
}

/// Per-writer configuration. The sync/async discipline is not a setting; it
/// is fixed by the constructor used.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSettings {
    /// Output format.
    pub format: PayloadFormat,
    /// True when writing a request payload, false for a response.
    pub is_request: bool,
    /// Pretty-print the payload.
    pub indent: bool,
    /// Bytes buffered before a write reaches the sink.
    pub buffer_capacity: usize,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            format: PayloadFormat::Json,
            is_request: false,
            indent: false,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Error type for loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// I/O error while reading the settings file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed settings document.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl WriterSettings {
    /// Response settings for `format`.
    pub fn response(format: PayloadFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Request settings for `format`.
    pub fn request(format: PayloadFormat) -> Self {
        Self {
            format,
            is_request: true,
            ..Self::default()
        }
    }

    /// Parses settings from a JSON document. Missing fields take defaults.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, SettingsError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Reads and parses a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let bytes = std::fs::read(path)?;
        Self::from_json_slice(&bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = WriterSettings::from_json_slice(br#"{"format":"atom"}"#).unwrap();
        assert_eq!(settings, WriterSettings::response(PayloadFormat::Atom));
        assert_eq!(settings.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = WriterSettings::from_json_slice(br#"{"format":"csv"}"#).unwrap_err();
        assert!(matches!(err, SettingsError::Serde(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = WriterSettings::load("/nonexistent/odata-writer/settings.json").unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
    }
}
