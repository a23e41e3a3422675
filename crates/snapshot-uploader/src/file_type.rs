//! The role a backup file plays.
//!

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The type of a backup file, assigned by the caller per directory.
#[derive(Hash, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackupFileType {
    /// A file from a named snapshot, `<keyspace>/snapshots/<tag>/<file>`.
    Snapshot,

    /// An incrementally backed up SSTable, `<keyspace>/backups/<file>`.
    Sst,

    /// A snapshot marker or metadata file.
    Meta,

    /// A commit log segment.
    CommitLog,
}

impl BackupFileType {
    /// The segment used for this type in a remote path.
    pub fn as_segment(&self) -> &'static str {
        match self {
            Self::Snapshot => "SNAP",
            Self::Sst => "SST",
            Self::Meta => "META",
            Self::CommitLog => "CL",
        }
    }

    /// If files of this type belong to a keyspace and column family.
    pub fn is_keyspace_scoped(&self) -> bool {
        matches!(self, Self::Snapshot | Self::Sst)
    }
}

impl fmt::Display for BackupFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_segment())
    }
}

impl FromStr for BackupFileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Snapshot" | "SNAP" => Ok(Self::Snapshot),
            "Sst" | "SST" => Ok(Self::Sst),
            "Meta" | "META" => Ok(Self::Meta),
            "CommitLog" | "CL" => Ok(Self::CommitLog),
            _ => Err(format!("invalid backup file type '{s}'")),
        }
    }
}
