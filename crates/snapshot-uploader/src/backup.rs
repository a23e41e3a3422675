//! Single passes over a data directory.
//!

use std::{
    fs,
    path::{Path, PathBuf},
};

use shared::Failure;
use tracing::{error, info};

use crate::{
    BackupFileClassifier, BackupFileSystem, BackupFileType, DirectoryError, DirectoryUploader,
    ParsedBackupDescriptor,
};

/// The outcome of a pass over a data directory.
#[derive(Debug, Default)]
pub struct BackupSummary {
    /// The files that were uploaded and removed.
    pub uploaded: Vec<ParsedBackupDescriptor>,

    /// Keyspaces that were excluded or had no candidate directory.
    pub skipped_directories: usize,

    /// Keyspaces whose candidate directory could not be read.
    pub failed_directories: usize,
}

/// Upload the incremental backups of every keyspace, `<keyspace>/backups`.
pub fn incremental_backup<C: BackupFileClassifier, F: BackupFileSystem>(
    uploader: &DirectoryUploader<C, F>,
    data_directory: &Path,
) -> Result<BackupSummary, DirectoryError> {
    backup_keyspaces(uploader, data_directory, BackupFileType::Sst, |keyspace| {
        keyspace.join("backups")
    })
}

/// Upload the named snapshot of every keyspace, `<keyspace>/snapshots/<tag>`.
pub fn snapshot_backup<C: BackupFileClassifier, F: BackupFileSystem>(
    uploader: &DirectoryUploader<C, F>,
    data_directory: &Path,
    tag: &str,
) -> Result<BackupSummary, DirectoryError> {
    backup_keyspaces(
        uploader,
        data_directory,
        BackupFileType::Snapshot,
        |keyspace| keyspace.join("snapshots").join(tag),
    )
}

fn backup_keyspaces<C, F, Candidate>(
    uploader: &DirectoryUploader<C, F>,
    data_directory: &Path,
    file_type: BackupFileType,
    candidate: Candidate,
) -> Result<BackupSummary, DirectoryError>
where
    C: BackupFileClassifier,
    F: BackupFileSystem,
    Candidate: Fn(&Path) -> PathBuf,
{
    let entries = fs::read_dir(data_directory)
        .map_err(|e| DirectoryError::Read(e, data_directory.to_path_buf()))?;

    let mut keyspaces: Vec<PathBuf> = entries
        .filter_map(|entry| entry.or_log_warning("Could not read data directory entry"))
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    keyspaces.sort();

    let mut summary = BackupSummary::default();
    for keyspace in &keyspaces {
        let candidate = candidate(keyspace);
        if !uploader.is_valid_backup_dir(keyspace, &candidate) {
            summary.skipped_directories += 1;
            continue;
        }

        match uploader.upload_directory(&candidate, file_type) {
            Ok(uploaded) => summary.uploaded.extend(uploaded),
            Err(error) => {
                error!("Failed to upload {candidate:?}: {error}");
                summary.failed_directories += 1;
            }
        }
    }

    info!(
        "{file_type} pass over {data_directory:?} uploaded {} files, skipped {} and failed {} keyspaces",
        summary.uploaded.len(),
        summary.skipped_directories,
        summary.failed_directories
    );

    Ok(summary)
}
