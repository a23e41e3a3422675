//! Snapshot uploader config
//!

use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use shared::LogConfig;
use thiserror::Error;

use crate::{
    DirectoryUploader, ExclusionSets, KeyspaceColumnFamilyFilter, LocalBackupFileSystem,
    RetryPolicy, SnapshotClassifier,
};

/// The uploader's config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The data directory holding one directory per keyspace.
    pub data_directory: PathBuf,

    /// The directory backups are stored below.
    pub backup_root: PathBuf,

    /// The first segment of every remote path.
    pub prefix: String,

    /// The name of this node in remote paths.
    pub node_name: String,

    /// Where to log.
    #[serde(default)]
    pub logging: LogConfig,

    /// The retry policy for each file.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// The keyspaces and column families to never back up.
    #[serde(default)]
    pub exclusions: ExclusionSets,
}

impl Config {
    /// Tries to load a config from a toml file.
    pub fn load_toml(file_path: PathBuf) -> Result<Self, LoadConfigError> {
        if !file_path.exists() {
            return Err(LoadConfigError::NoFile);
        }

        let contents = fs::read_to_string(file_path).map_err(LoadConfigError::Read)?;
        let config = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Build the uploader described by this config.
    pub fn uploader(&self) -> DirectoryUploader<SnapshotClassifier, LocalBackupFileSystem> {
        DirectoryUploader::new(
            SnapshotClassifier::new(&self.prefix, &self.node_name),
            LocalBackupFileSystem::new(&self.backup_root),
            KeyspaceColumnFamilyFilter::new(self.exclusions.clone()),
        )
        .with_retry(self.retry)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("/var/lib/cassandra/data"),
            backup_root: PathBuf::from("/mnt/backups"),
            prefix: "backups".to_string(),
            node_name: "node-1".to_string(),
            logging: LogConfig::default(),
            retry: RetryPolicy::default(),
            exclusions: ExclusionSets::default(),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("The file does not exist.")]
    NoFile,

    #[error("Failed to read the file:\n{0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to deserialize the file:\n{0}")]
    Deserialize(#[from] toml::de::Error),
}
