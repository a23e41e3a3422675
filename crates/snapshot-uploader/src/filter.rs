//! Keyspaces and column families that are never backed up.
//!

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::ParsedBackupDescriptor;

/// The names excluded from backups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSets {
    /// Keyspace names that are never backed up.
    pub keyspaces: HashSet<String>,

    /// Column family names, matched against the file name prefix.
    pub column_families: HashSet<String>,
}

impl Default for ExclusionSets {
    fn default() -> Self {
        Self {
            keyspaces: HashSet::from(["OpsCenter".to_string()]),
            column_families: HashSet::from(["LocationInfo".to_string()]),
        }
    }
}

/// Decides which directories and files are eligible for backup.
#[derive(Debug, Clone, Default)]
pub struct KeyspaceColumnFamilyFilter {
    exclusions: ExclusionSets,
}

impl KeyspaceColumnFamilyFilter {
    /// Create a filter over the given exclusions.
    pub fn new(exclusions: ExclusionSets) -> Self {
        Self { exclusions }
    }

    /// The exclusions this filter checks against.
    pub fn exclusions(&self) -> &ExclusionSets {
        &self.exclusions
    }

    /// If a directory of the named keyspace should be walked for backups.
    pub fn is_eligible_directory(&self, keyspace_name: &str, directory: &Path) -> bool {
        directory.is_dir() && !self.exclusions.keyspaces.contains(keyspace_name)
    }

    /// The column family prefix of a file name.
    ///
    /// This is the text before the first `-`, there is no prefix unless
    /// something other than `-` follows it.
    pub fn column_family_prefix(file_name: &str) -> Option<&str> {
        let (prefix, rest) = file_name.split_once('-')?;
        rest.chars().any(|c| c != '-').then_some(prefix)
    }

    /// If a file name is not excluded by its column family prefix.
    pub fn is_eligible_file(&self, file_name: &str) -> bool {
        match Self::column_family_prefix(file_name) {
            Some(prefix) => !self.exclusions.column_families.contains(prefix),
            None => true,
        }
    }

    /// If a classified file should be uploaded.
    pub fn is_eligible(&self, descriptor: &ParsedBackupDescriptor) -> bool {
        !self.exclusions.keyspaces.contains(descriptor.keyspace())
            && self.is_eligible_file(descriptor.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::{ExclusionSets, KeyspaceColumnFamilyFilter};

    #[test]
    fn prefix_needs_a_separator() {
        assert_eq!(
            KeyspaceColumnFamilyFilter::column_family_prefix("LocationInfo-data.db"),
            Some("LocationInfo")
        );
        assert_eq!(KeyspaceColumnFamilyFilter::column_family_prefix("LocationInfo.db"), None);
        assert_eq!(KeyspaceColumnFamilyFilter::column_family_prefix("LocationInfo--"), None);
    }

    #[test]
    fn excluded_column_family() {
        let filter = KeyspaceColumnFamilyFilter::default();
        assert!(!filter.is_eligible_file("LocationInfo-data.db"));
        assert!(filter.is_eligible_file("LocationInfo.db"));
        assert!(filter.is_eligible_file("Keyspace1-cf1-snapshot.db"));
    }

    #[test]
    fn custom_exclusions() {
        let mut exclusions = ExclusionSets::default();
        exclusions.column_families.insert("Hints".to_string());
        let filter = KeyspaceColumnFamilyFilter::new(exclusions);

        assert!(!filter.is_eligible_file("Hints-g-1-Data.db"));
        assert!(!filter.is_eligible_file("LocationInfo-g-1-Data.db"));
    }
}
