//! Config documents in TOML, JSON or YAML, picked by file extension.
//!
//! The owning crates read their own tables out of a shared project file
//! through [`load`] and [`load_or_default`].

use std::fmt;

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, NormalizedPath, Result, io};

/// Serialization format of a config document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    /// `.yaml` or `.yml`
    Yaml,
}

impl Format {
    /// Format implied by the extension of `path`, compared case-insensitively.
    pub fn from_path(path: &NormalizedPath) -> Result<Self> {
        let extension = path.extension().unwrap_or_default();
        match extension.to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    fn decode<T: DeserializeOwned>(self, content: &str) -> std::result::Result<T, String> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    fn encode<T: Serialize>(self, value: &T) -> std::result::Result<String, String> {
        match self {
            Self::Toml => toml::to_string_pretty(value).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        })
    }
}

/// Read and decode the document at `path`.
///
/// # Errors
///
/// [`Error::UnsupportedFormat`] for an unknown extension, [`Error::Io`] if
/// the file cannot be read and [`Error::ConfigParse`] if it does not decode
/// into `T`.
pub fn load<T: DeserializeOwned>(path: &NormalizedPath) -> Result<T> {
    let format = Format::from_path(path)?;
    let content = io::read_text(path)?;
    format.decode(&content).map_err(|message| Error::ConfigParse {
        path: path.to_native(),
        format: format.to_string(),
        message,
    })
}

/// Like [`load`], but a missing file yields `T::default()`.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &NormalizedPath) -> Result<T> {
    match load(path) {
        Err(e) if e.is_not_found() => {
            tracing::debug!(path = %path, "config file missing, using defaults");
            Ok(T::default())
        }
        other => other,
    }
}

/// Encode `value` in the format implied by `path` and write it atomically.
pub fn save<T: Serialize>(path: &NormalizedPath, value: &T) -> Result<()> {
    let format = Format::from_path(path)?;
    let content = format.encode(value).map_err(|message| Error::ConfigSerialize {
        path: path.to_native(),
        format: format.to_string(),
        message,
    })?;
    io::write_text(path, &content)
}
