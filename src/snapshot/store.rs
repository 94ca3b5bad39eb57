//! Content-addressed artifact storage.
//!
//! Every artifact is written to `<root>/<category>/<digest>.png`, where the
//! digest is the SHA-256 of the bytes. Identical content always lands on the
//! same file, so visually identical pages share one screenshot.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::types::{ArtifactCategory, ArtifactRef, SnapshotResult};

/// Extension of every stored artifact
const ARTIFACT_EXTENSION: &str = "png";

/// Deduplicating artifact store rooted at the run output directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating the category directories if needed.
    ///
    /// Existing directories and their content are left untouched.
    pub fn open(root: impl Into<PathBuf>) -> SnapshotResult<Self> {
        let root = root.into();
        for category in [ArtifactCategory::Screenshot, ArtifactCategory::Diff] {
            fs::create_dir_all(root.join(category.dir_name()))?;
        }
        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist bytes and return their content-derived reference.
    ///
    /// The file is only written when it is missing or its length does not
    /// match the content, as left behind by an interrupted write. Writes go
    /// through a temporary file in the same directory and are renamed into place.
    pub fn put(&self, category: ArtifactCategory, bytes: &[u8]) -> SnapshotResult<ArtifactRef> {
        let digest = content_digest(bytes);
        let path = self.path_for(category, &digest);

        match fs::metadata(&path) {
            Ok(meta) if meta.len() == bytes.len() as u64 => {
                debug!(path = %path.display(), "artifact already stored");
            }
            existing => {
                if existing.is_ok() {
                    warn!(path = %path.display(), "replacing incomplete artifact");
                }
                write_atomically(&path, bytes)?;
                debug!(path = %path.display(), bytes = bytes.len(), "stored artifact");
            }
        }

        Ok(ArtifactRef { digest, path })
    }

    /// Path an artifact with the given digest is stored at
    pub fn path_for(&self, category: ArtifactCategory, digest: &str) -> PathBuf {
        self.root
            .join(category.dir_name())
            .join(format!("{}.{}", digest, ARTIFACT_EXTENSION))
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> SnapshotResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Hex-encoded SHA-256 of the given bytes
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
