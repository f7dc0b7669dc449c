//! Filesystem abstraction for envkit
//!
//! Provides forward-slash path handling, content checksums, atomic writes
//! and config documents in TOML, JSON or YAML.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::Format as ConfigFormat;
pub use error::{Error, Result};
pub use path::NormalizedPath;
