use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{Result, ValidationError};

/// A file as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename; only its final path component is used.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Reduce a client filename to its base name and check its length.
pub fn validate_file_name(name: &str, max_len: usize) -> std::result::Result<String, ValidationError> {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    if base.is_empty() {
        return Err(ValidationError::Required);
    }

    let len = base.chars().count();
    if len > max_len {
        return Err(ValidationError::FilenameTooLong { max: max_len, len });
    }

    Ok(base.to_string())
}

/// An upload written to disk for the duration of one request.
///
/// The file keeps its uploaded base name inside a private directory, so
/// concurrent uploads with the same name never collide. Dropping the guard
/// removes the directory and the file.
#[derive(Debug)]
pub struct TempUpload {
    dir: TempDir,
    path: PathBuf,
}

impl TempUpload {
    pub fn create(parent: &Path, file_name: &str, bytes: &[u8]) -> Result<Self> {
        fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new().prefix("upload-").tempdir_in(parent)?;
        let path = dir.path().join(file_name);
        fs::write(&path, bytes)?;
        log::debug!("Stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}
