//! Classify local files into backup descriptors.
//!

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BackupFileType, ParsedBackupDescriptor};

/// Turns a local file into a descriptor for the backup store.
pub trait BackupFileClassifier {
    /// Parse a local file of the given type.
    fn parse(
        &self,
        local_file: &Path,
        file_type: BackupFileType,
    ) -> Result<ParsedBackupDescriptor, ParseError>;
}

impl<T: BackupFileClassifier + ?Sized> BackupFileClassifier for &T {
    fn parse(
        &self,
        local_file: &Path,
        file_type: BackupFileType,
    ) -> Result<ParsedBackupDescriptor, ParseError> {
        (**self).parse(local_file, file_type)
    }
}

/// Classifies files laid out the way the data node stores them.
///
/// Remote paths take the form
/// `<prefix>/<node>/<yyyyMMddHHmm>/<keyspace>/<column family>/<TYPE>/<file>`,
/// files outside a keyspace drop the keyspace and column family segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotClassifier {
    /// The first segment of every remote path.
    pub prefix: String,

    /// The name of the node the files are from.
    pub node_name: String,
}

impl SnapshotClassifier {
    /// Create a new classifier.
    pub fn new(prefix: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            node_name: node_name.into(),
        }
    }

    fn keyspace<'a>(
        local_file: &'a Path,
        file_name: &str,
        file_type: BackupFileType,
    ) -> Result<&'a str, ParseError> {
        let layout_error = |expected| ParseError::UnexpectedLayout {
            path: local_file.to_path_buf(),
            expected,
        };
        let name_error = |expected| ParseError::UnexpectedName {
            path: local_file.to_path_buf(),
            expected,
        };

        match file_type {
            BackupFileType::Snapshot => {
                let snapshots = local_file.parent().and_then(Path::parent);
                if component_name(snapshots) != Some("snapshots") {
                    return Err(layout_error("<keyspace>/snapshots/<tag>/<file>"));
                }
                component_name(snapshots.and_then(Path::parent))
                    .ok_or_else(|| layout_error("<keyspace>/snapshots/<tag>/<file>"))
            }

            BackupFileType::Sst => {
                let backups = local_file.parent();
                if component_name(backups) != Some("backups") {
                    return Err(layout_error("<keyspace>/backups/<file>"));
                }
                component_name(backups.and_then(Path::parent))
                    .ok_or_else(|| layout_error("<keyspace>/backups/<file>"))
            }

            BackupFileType::Meta => {
                if file_name.ends_with(".json") {
                    Ok("")
                } else {
                    Err(name_error("*.json"))
                }
            }

            BackupFileType::CommitLog => {
                if file_name.ends_with(".log") {
                    Ok("")
                } else {
                    Err(name_error("*.log"))
                }
            }
        }
    }
}

impl BackupFileClassifier for SnapshotClassifier {
    fn parse(
        &self,
        local_file: &Path,
        file_type: BackupFileType,
    ) -> Result<ParsedBackupDescriptor, ParseError> {
        let metadata = fs::metadata(local_file)
            .map_err(|e| ParseError::Io(e, "read file metadata", local_file.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(ParseError::NotFile(local_file.to_path_buf()));
        }

        let file_name = match local_file.file_name().and_then(|name| name.to_str()) {
            Some(file_name) => file_name,
            None => return Err(ParseError::NotUnicode(local_file.to_path_buf())),
        };

        let keyspace = Self::keyspace(local_file, file_name, file_type)?;

        let column_family = if file_type.is_keyspace_scoped() {
            column_family_of(file_name)
        } else {
            ""
        };

        let modified: DateTime<Utc> = metadata
            .modified()
            .map_err(|e| ParseError::Io(e, "read modified time", local_file.to_path_buf()))?
            .into();

        let timestamp = modified.format("%Y%m%d%H%M").to_string();
        let remote_path = [
            self.prefix.as_str(),
            self.node_name.as_str(),
            timestamp.as_str(),
            keyspace,
            column_family,
            file_type.as_segment(),
            file_name,
        ]
        .iter()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

        Ok(ParsedBackupDescriptor::new(
            remote_path,
            keyspace.to_string(),
            column_family.to_string(),
            file_name.to_string(),
            file_type,
            local_file.to_path_buf(),
            modified,
        ))
    }
}

/// The column family a data file belongs to, the name before the first `-` or
/// the file stem.
fn column_family_of(file_name: &str) -> &str {
    match file_name.split_once('-') {
        Some((column_family, _)) => column_family,
        None => file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem),
    }
}

fn component_name(path: Option<&Path>) -> Option<&str> {
    path.and_then(Path::file_name).and_then(|name| name.to_str())
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to {1} for {2:?}: {0}")]
    Io(#[source] io::Error, &'static str, PathBuf),

    #[error("{0:?} is not a regular file")]
    NotFile(PathBuf),

    #[error("{0:?} has a file name that is not valid unicode")]
    NotUnicode(PathBuf),

    #[error("{path:?} is not laid out as {expected}")]
    UnexpectedLayout {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("{path:?} does not match the name {expected}")]
    UnexpectedName {
        path: PathBuf,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::column_family_of;

    #[test]
    fn column_family_from_name() {
        assert_eq!(column_family_of("Standard1-g-12-Data.db"), "Standard1");
        assert_eq!(column_family_of("manifest.json"), "manifest");
        assert_eq!(column_family_of("noextension"), "noextension");
    }
}
