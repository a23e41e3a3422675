//! # common
//!

#![allow(dead_code)]

use core::{num::NonZeroU32, time::Duration};
use std::{
    collections::HashMap,
    fs,
    io::Read,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

use snapshot_uploader::{
    BackupFileSystem, DirectoryUploader, KeyspaceColumnFamilyFilter, ParsedBackupDescriptor,
    RetryPolicy, SnapshotClassifier, UploadError,
};

/// Records uploads and fails a file name a set number of times first.
#[derive(Default)]
pub struct RecordingFileSystem {
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
    pub attempts: Mutex<HashMap<String, u32>>,
    pub failures: Mutex<HashMap<String, u32>>,
}

impl RecordingFileSystem {
    pub fn failing(file_name: &str, times: u32) -> Self {
        let file_system = Self::default();
        file_system
            .failures
            .lock()
            .unwrap()
            .insert(file_name.to_string(), times);
        file_system
    }

    pub fn attempts(&self, file_name: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(file_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn uploaded_paths(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl BackupFileSystem for RecordingFileSystem {
    fn upload(
        &self,
        descriptor: &ParsedBackupDescriptor,
        reader: &mut dyn Read,
    ) -> Result<(), UploadError> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(descriptor.file_name().to_string())
            .or_default() += 1;

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(descriptor.file_name()) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(UploadError::Transport("connection reset".to_string()));
            }
        }

        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(|e| UploadError::Io(e, "read local file"))?;

        self.uploads
            .lock()
            .unwrap()
            .push((descriptor.remote_path().to_string(), contents));

        Ok(())
    }
}

/// Counts uploads without reading the content.
#[derive(Default)]
pub struct CountingFileSystem {
    pub uploads: AtomicU32,
}

impl CountingFileSystem {
    pub fn uploads(&self) -> u32 {
        self.uploads.load(Ordering::SeqCst)
    }
}

impl BackupFileSystem for CountingFileSystem {
    fn upload(
        &self,
        _descriptor: &ParsedBackupDescriptor,
        _reader: &mut dyn Read,
    ) -> Result<(), UploadError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Stores the upload then removes the local file, as a concurrent cleanup would.
#[derive(Default)]
pub struct RemovingFileSystem {
    pub inner: RecordingFileSystem,
}

impl BackupFileSystem for RemovingFileSystem {
    fn upload(
        &self,
        descriptor: &ParsedBackupDescriptor,
        reader: &mut dyn Read,
    ) -> Result<(), UploadError> {
        self.inner.upload(descriptor, reader)?;
        fs::remove_file(descriptor.local_path())
            .map_err(|e| UploadError::Io(e, "remove local file"))
    }
}

/// A retry policy that doesn't sleep.
pub fn no_delay(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(NonZeroU32::new(attempts).unwrap(), Duration::ZERO)
}

/// An uploader over a file system with the default exclusions.
pub fn uploader<F: BackupFileSystem>(file_system: F) -> DirectoryUploader<SnapshotClassifier, F> {
    DirectoryUploader::new(
        SnapshotClassifier::new("backups", "node-1"),
        file_system,
        KeyspaceColumnFamilyFilter::default(),
    )
    .with_retry(no_delay(3))
}

/// Create `<data>/<keyspace>/snapshots/<tag>` and return it.
pub fn snapshot_directory(data: &Path, keyspace: &str, tag: &str) -> PathBuf {
    let directory = data.join(keyspace).join("snapshots").join(tag);
    fs::create_dir_all(&directory).unwrap();
    directory
}

/// Create `<data>/<keyspace>/backups` and return it.
pub fn incremental_directory(data: &Path, keyspace: &str) -> PathBuf {
    let directory = data.join(keyspace).join("backups");
    fs::create_dir_all(&directory).unwrap();
    directory
}

/// Write a file with its name as the contents.
pub fn write_file(directory: &Path, file_name: &str) -> PathBuf {
    let path = directory.join(file_name);
    fs::write(&path, file_name).unwrap();
    path
}
