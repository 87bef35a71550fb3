//! Screenshot evidence attached to test results

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// A screenshot the browser wrote to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotArtifact {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,

    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

impl ScreenshotArtifact {
    /// Check the file exists and is a readable image, then fingerprint it
    pub fn inspect(path: &Path) -> E2eResult<Self> {
        if !path.is_file() {
            return Err(E2eError::ScreenshotMissing(path.display().to_string()));
        }

        let (width, height) = image::image_dimensions(path)?;
        let contents = std::fs::read(path)?;
        let sha256 = hex::encode(Sha256::digest(&contents));

        debug!("{}: {}x{} sha256={}", path.display(), width, height, sha256);

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            bytes: contents.len() as u64,
            sha256,
        })
    }
}
