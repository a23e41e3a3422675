//! The parsed form of a local backup file.
//!

use core::fmt;
use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::BackupFileType;

/// A classified local file, ready to be or confirmed as uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBackupDescriptor {
    remote_path: String,
    keyspace: String,
    column_family: String,
    file_name: String,
    file_type: BackupFileType,
    local_path: PathBuf,
    modified: DateTime<Utc>,
}

impl ParsedBackupDescriptor {
    /// Create a new descriptor.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        remote_path: String,
        keyspace: String,
        column_family: String,
        file_name: String,
        file_type: BackupFileType,
        local_path: PathBuf,
        modified: DateTime<Utc>,
    ) -> Self {
        Self {
            remote_path,
            keyspace,
            column_family,
            file_name,
            file_type,
            local_path,
            modified,
        }
    }

    /// The `/` separated key of the file in the backup store.
    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    /// The keyspace the file belongs to, empty for files outside a keyspace.
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// The column family derived from the file name.
    pub fn column_family(&self) -> &str {
        &self.column_family
    }

    /// The original file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The file type assigned by the caller.
    pub fn file_type(&self) -> BackupFileType {
        self.file_type
    }

    /// The path of the local file.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// When the local file was last modified.
    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Open the local file for reading.
    pub fn open_local(&self) -> io::Result<File> {
        OpenOptions::new().read(true).open(&self.local_path)
    }
}

impl fmt::Display for ParsedBackupDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.remote_path)
    }
}
