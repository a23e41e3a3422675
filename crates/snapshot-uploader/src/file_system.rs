//! Stores for uploaded backup files.
//!

use std::{
    fs::{self, OpenOptions},
    io::{self, ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ParsedBackupDescriptor;

/// A store that durably keeps backup files.
///
/// A call either stores the whole content or fails, implementors may retry
/// transient errors internally.
pub trait BackupFileSystem: Send + Sync {
    /// Upload the content read from `reader` under the descriptor's remote path.
    fn upload(
        &self,
        descriptor: &ParsedBackupDescriptor,
        reader: &mut dyn Read,
    ) -> Result<(), UploadError>;
}

impl<T: BackupFileSystem + ?Sized> BackupFileSystem for &T {
    fn upload(
        &self,
        descriptor: &ParsedBackupDescriptor,
        reader: &mut dyn Read,
    ) -> Result<(), UploadError> {
        (**self).upload(descriptor, reader)
    }
}

/// Stores backups below a root directory, for mounted network storage.
///
/// Existing files at the same remote path are overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalBackupFileSystem {
    /// The directory remote paths are resolved against.
    pub root: PathBuf,
}

impl LocalBackupFileSystem {
    /// Create a new local backup file system.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The local path a remote path is stored at.
    pub fn resolve(&self, remote_path: &str) -> PathBuf {
        remote_path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl BackupFileSystem for LocalBackupFileSystem {
    fn upload(
        &self,
        descriptor: &ParsedBackupDescriptor,
        reader: &mut dyn Read,
    ) -> Result<(), UploadError> {
        let target = self.resolve(descriptor.remote_path());
        let Some(directory) = target.parent() else {
            return Err(UploadError::Transport(format!(
                "remote path '{}' has no parent",
                descriptor.remote_path()
            )));
        };

        // Ensure the target directory exists
        match fs::metadata(directory) {
            Ok(metadata) => {
                if !metadata.is_dir() {
                    return Err(UploadError::Transport(format!(
                        "{directory:?} is not a directory"
                    )));
                }
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(directory)
                    .map_err(|e| UploadError::Io(e, "create target directory"))?;
            }
            Err(error) => return Err(UploadError::Io(error, "check target directory")),
        }

        // Write to a partial file so an interrupted upload never looks complete
        let mut partial_name = target.file_name().unwrap_or_default().to_os_string();
        partial_name.push(".partial");
        let partial = target.with_file_name(partial_name);

        let written = write_partial(reader, &partial, &target).inspect_err(|_| {
            if let Err(error) = fs::remove_file(&partial) {
                if error.kind() != ErrorKind::NotFound {
                    warn!("Could not remove partial file {partial:?}: {error}");
                }
            }
        })?;

        debug!("Stored {written} bytes at {target:?}");

        Ok(())
    }
}

/// Stream into `partial`, sync it, then move it to `target`.
fn write_partial(reader: &mut dyn Read, partial: &Path, target: &Path) -> Result<u64, UploadError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(partial)
        .map_err(|e| UploadError::Io(e, "create partial file"))?;

    let written = io::copy(reader, &mut file).map_err(|e| UploadError::Io(e, "write partial file"))?;

    file.flush()
        .map_err(|e| UploadError::Io(e, "flush partial file"))?;
    file.sync_all()
        .map_err(|e| UploadError::Io(e, "sync partial file"))?;
    drop(file);

    fs::rename(partial, target).map_err(|e| UploadError::Io(e, "rename partial file"))?;

    Ok(written)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Failed to {1}: {0}")]
    Io(#[source] io::Error, &'static str),
}
