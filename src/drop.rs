//! Dispatch of files dropped onto the window.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DropError {
    #[error("unsupported file type: {0}")]
    UnsupportedExtension(PathBuf),
    #[error("file name is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

/// What a dropped file should replace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDrop {
    Scene(PathBuf),
    Environment(PathBuf),
}

impl FileDrop {
    /// Classifies `path` by its (case-insensitive) extension
    pub fn classify(path: &Path) -> Result<Self, DropError> {
        let name = path
            .file_name()
            .map(|name| name.to_str().ok_or_else(|| DropError::NonUtf8Path(path.to_path_buf())))
            .transpose()?;
        let extension = name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, extension)| extension.to_ascii_lowercase());

        match extension.as_deref() {
            Some("glb" | "gltf") => Ok(FileDrop::Scene(path.to_path_buf())),
            Some("hdr" | "exr") => Ok(FileDrop::Environment(path.to_path_buf())),
            _ => Err(DropError::UnsupportedExtension(path.to_path_buf())),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FileDrop::Scene(path) | FileDrop::Environment(path) => path,
        }
    }
}
