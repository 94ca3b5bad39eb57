// Core types shared by the capture, diff and storage layers

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Category subdirectory an artifact is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactCategory {
    /// Raw page screenshots
    Screenshot,
    /// Rendered visual diffs
    Diff,
}

impl ArtifactCategory {
    /// Name of the subdirectory under the output root
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactCategory::Screenshot => "screenshots",
            ArtifactCategory::Diff => "diffs",
        }
    }
}

/// Reference to a persisted, content-addressed artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Hex digest of the stored bytes
    pub digest: String,

    /// File the bytes were written to
    pub path: PathBuf,
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Error types for snapshot operations
#[derive(Debug)]
pub enum SnapshotError {
    /// Error reported by the browser driver
    Driver(String),

    /// Error while decoding, diffing or encoding images
    Image(String),

    /// I/O error
    Io(std::io::Error),

    /// Serialization error
    Serialization(serde_json::Error),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Driver(msg) => write!(f, "Driver error: {}", msg),
            SnapshotError::Image(msg) => write!(f, "Image error: {}", msg),
            SnapshotError::Io(err) => write!(f, "I/O error: {}", err),
            SnapshotError::Serialization(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Driver(_) | SnapshotError::Image(_) => None,
            SnapshotError::Io(err) => Some(err),
            SnapshotError::Serialization(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serialization(err)
    }
}

impl From<image::ImageError> for SnapshotError {
    fn from(err: image::ImageError) -> Self {
        SnapshotError::Image(err.to_string())
    }
}

impl From<ureq::Error> for SnapshotError {
    fn from(err: ureq::Error) -> Self {
        SnapshotError::Driver(err.to_string())
    }
}
