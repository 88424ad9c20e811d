//! File handles for signing runs.
//!
//! [`File`] wraps a path and opens the sequential handles the streaming
//! engine works with. Every open failure is reported as
//! [`SignError::FileOpen`] naming the path.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::config::SIGNATURE_EXTENSION;
use crate::error::{Result, SignError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Current length of the file in bytes.
    ///
    /// # Errors
    ///
    /// [`SignError::FileOpen`] if the file is missing, unreadable or a directory.
    pub fn size(&self) -> Result<u64> {
        let meta = fs::metadata(&self.path).map_err(|e| SignError::open(&self.path, e))?;
        if meta.is_dir() {
            return Err(SignError::open(&self.path, std::io::Error::other("path is a directory")));
        }

        Ok(meta.len())
    }

    /// Default signature path: the full input name with `.signature` appended.
    pub fn signature_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(SIGNATURE_EXTENSION);
        PathBuf::from(name)
    }

    /// Whether `other` resolves to this same file, through symlinks, hard
    /// links or `..` components. A path that does not exist yet never does.
    ///
    /// # Errors
    ///
    /// [`SignError::FileOpen`] if this file's metadata cannot be read.
    pub fn is_same_file(&self, other: &Path) -> Result<bool> {
        if !other.exists() {
            return Ok(false);
        }

        same_identity(&self.path, other).map_err(|e| SignError::open(&self.path, e))
    }

    pub fn reader(&self) -> Result<BufReader<fs::File>> {
        let file = fs::File::open(&self.path).map_err(|e| SignError::open(&self.path, e))?;

        Ok(BufReader::new(file))
    }

    pub fn writer(&self) -> Result<BufWriter<fs::File>> {
        let file = Self::create(&self.path)?;

        Ok(BufWriter::new(file))
    }

    /// Creates (or truncates) the file for reading and writing.
    pub(crate) fn create(path: &Path) -> Result<fs::File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SignError::open(parent, e))?;
        }

        fs::OpenOptions::new().read(true).write(true).create(true).truncate(true).open(path).map_err(|e| SignError::open(path, e))
    }
}

#[cfg(unix)]
fn same_identity(a: &Path, b: &Path) -> std::io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let (a, b) = (fs::metadata(a)?, fs::metadata(b)?);
    Ok(a.dev() == b.dev() && a.ino() == b.ino())
}

#[cfg(not(unix))]
fn same_identity(a: &Path, b: &Path) -> std::io::Result<bool> {
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}
