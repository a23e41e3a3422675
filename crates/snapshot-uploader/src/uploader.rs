//! Upload a directory of candidate files.
//!

use core::time::Duration;
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    BackupFileClassifier, BackupFileSystem, BackupFileType, Context, KeyspaceColumnFamilyFilter,
    ParseError, ParsedBackupDescriptor, RetryPolicy, UploadError, blocking_sleep,
};

/// Uploads the files of a directory and removes them once stored.
///
/// Files are processed one at a time. A file that fails every attempt is
/// logged and left on disk, the rest of the directory is still uploaded.
pub struct DirectoryUploader<C, F> {
    classifier: C,
    file_system: F,
    filter: KeyspaceColumnFamilyFilter,
    retry: RetryPolicy,
    sleep: Box<dyn Fn(Duration) + Send + Sync>,
}

impl<C: BackupFileClassifier, F: BackupFileSystem> DirectoryUploader<C, F> {
    /// Create an uploader with the default retry policy.
    pub fn new(classifier: C, file_system: F, filter: KeyspaceColumnFamilyFilter) -> Self {
        Self {
            classifier,
            file_system,
            filter,
            retry: RetryPolicy::default(),
            sleep: Box::new(blocking_sleep),
        }
    }

    /// Replace the retry policy applied to each file.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace how the uploader waits between attempts.
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// The classifier used to parse each file.
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// The store files are uploaded to.
    pub fn file_system(&self) -> &F {
        &self.file_system
    }

    /// The filter used to skip excluded files.
    pub fn filter(&self) -> &KeyspaceColumnFamilyFilter {
        &self.filter
    }

    /// The retry policy applied to each file.
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// If a candidate directory of a keyspace should be uploaded.
    pub fn is_valid_backup_dir(&self, keyspace_directory: &Path, candidate_directory: &Path) -> bool {
        let keyspace_name = keyspace_directory
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        self.filter
            .is_eligible_directory(&keyspace_name, candidate_directory)
    }

    /// Upload every file in `directory` as `file_type`.
    ///
    /// Returns a descriptor for each file that was uploaded and removed. Only
    /// fails if the directory itself can't be read.
    pub fn upload_directory(
        &self,
        directory: &Path,
        file_type: BackupFileType,
    ) -> Result<Vec<ParsedBackupDescriptor>, DirectoryError> {
        let mut context = Context::new(directory, file_type);

        context.current_context = "List Directory";
        let files = list_files(&context, directory)?;
        debug!("{context}Found {} candidate files", files.len());

        context.current_context = "Upload File";
        let mut uploaded = Vec::with_capacity(files.len());
        for file in &files {
            match self.upload_file(&context.for_file(file), file, file_type) {
                Ok(Some(descriptor)) => uploaded.push(descriptor),
                Ok(None) => {}
                Err(error) => error!(
                    "{context}Failed to upload local file {file:?}, ignoring to continue with rest of backup: {error}"
                ),
            }
        }

        context.current_context = "Finish";
        info!("{context}Uploaded {}/{} files", uploaded.len(), files.len());

        Ok(uploaded)
    }

    /// Classify, upload and remove a single file under the retry policy.
    ///
    /// Returns `None` if the file is excluded.
    fn upload_file(
        &self,
        context: &Context,
        file: &Path,
        file_type: BackupFileType,
    ) -> Result<Option<ParsedBackupDescriptor>, FileUploadError> {
        // Holds a stored file whose local copy is yet to be removed.
        let mut stored: Option<ParsedBackupDescriptor> = None;

        let result = self.retry.call_with_sleep(
            context,
            |delay| (self.sleep)(delay),
            |_attempt| -> Result<Option<ParsedBackupDescriptor>, FileUploadError> {
                let descriptor = match stored.take() {
                    Some(descriptor) => descriptor,
                    None => {
                        let descriptor = self.classifier.parse(file, file_type)?;
                        if !self.filter.is_eligible(&descriptor) {
                            debug!("{context}Skipping excluded file");
                            return Ok(None);
                        }

                        let mut reader = descriptor.open_local().map_err(FileUploadError::Open)?;
                        self.file_system.upload(&descriptor, &mut reader)?;
                        drop(reader);

                        info!("{context}Uploaded to {descriptor}");
                        descriptor
                    }
                };

                match fs::remove_file(descriptor.local_path()) {
                    Ok(()) => Ok(Some(descriptor)),
                    Err(error) if error.kind() == ErrorKind::NotFound => Ok(Some(descriptor)),
                    Err(error) => {
                        stored = Some(descriptor);
                        Err(FileUploadError::Delete(error))
                    }
                }
            },
        );

        if let (Err(_), Some(descriptor)) = (&result, &stored) {
            warn!("{context}Local file remains after being stored at {descriptor}");
        }

        result
    }
}

/// The regular files in a directory, sorted by path.
fn list_files(context: &Context, directory: &Path) -> Result<Vec<PathBuf>, DirectoryError> {
    let entries = fs::read_dir(directory)
        .map_err(|e| DirectoryError::Read(e, directory.to_path_buf()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!("{context}Could not read entry: {error}");
                    return None;
                }
            };
            let path = entry.path();

            if !path.is_file() {
                debug!("{context}Skipping {path:?}, not a file");
                return None;
            }

            Some(path)
        })
        .collect();

    files.sort();

    Ok(files)
}

/// Failure of a single file's upload attempt.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum FileUploadError {
    #[error("Failed to parse file: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to open file: {0}")]
    Open(#[source] io::Error),

    #[error("Failed to upload file: {0}")]
    Upload(#[from] UploadError),

    #[error("Failed to delete uploaded file: {0}")]
    Delete(#[source] io::Error),
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to read directory {1:?}: {0}")]
    Read(#[source] io::Error, PathBuf),
}
