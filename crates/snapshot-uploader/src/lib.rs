//! # snapshot-uploader
//! Uploads the files of data node snapshot directories to a backup store,
//! removing each local file once it is stored.
//!

mod classifier;
mod context;
mod descriptor;
mod file_system;
mod file_type;
mod filter;
mod retry;
mod uploader;

pub mod backup;
pub mod config;

pub use classifier::{BackupFileClassifier, ParseError, SnapshotClassifier};
pub use context::Context;
pub use descriptor::ParsedBackupDescriptor;
pub use file_system::{BackupFileSystem, LocalBackupFileSystem, UploadError};
pub use file_type::BackupFileType;
pub use filter::{ExclusionSets, KeyspaceColumnFamilyFilter};
pub use retry::{Backoff, RetryPolicy, blocking_sleep};
pub use uploader::{DirectoryError, DirectoryUploader, FileUploadError};
