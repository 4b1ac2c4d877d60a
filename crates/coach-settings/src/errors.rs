//! Why a settings file was rejected.

use std::path::PathBuf;

use thiserror::Error;

/// A settings file that exists but cannot be used.
///
/// A missing file is not an error; it means compiled defaults.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file is there but could not be read.
    #[error("cannot read settings file {}: {source}", path.display())]
    Read {
        /// Settings file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not JSON, or its values do not fit the settings shape.
    #[error("invalid settings in {}: {source}", path.display())]
    Invalid {
        /// Settings file.
        path: PathBuf,
        /// Parse or shape error.
        #[source]
        source: serde_json::Error,
    },
    /// Compiled defaults could not be turned into JSON for merging.
    #[error("cannot encode default settings: {0}")]
    Defaults(#[from] serde_json::Error),
}

impl SettingsError {
    /// The offending settings file, if one was involved.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Read { path, .. } | Self::Invalid { path, .. } => Some(path),
            Self::Defaults(_) => None,
        }
    }
}

/// Result of loading settings.
pub type Result<T> = std::result::Result<T, SettingsError>;
