//! Context for the current upload, used for prefixing logs.
//!

use core::fmt;
use std::path::Path;

use crate::BackupFileType;

/// Holds the context for the directory being uploaded.
#[derive(Debug, Clone)]
pub struct Context {
    /// The directory being uploaded.
    pub directory: String,

    /// The type assigned to the directory's files.
    pub file_type: BackupFileType,

    /// The file currently being uploaded.
    pub file: Option<String>,

    /// The current stage.
    pub current_context: &'static str,
}

impl Context {
    /// Create the context for a directory.
    pub fn new(directory: &Path, file_type: BackupFileType) -> Self {
        Self {
            directory: directory.display().to_string(),
            file_type,
            file: None,
            current_context: "Start",
        }
    }

    /// The context for one file of this directory.
    pub fn for_file(&self, file: &Path) -> Self {
        let file = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        Self {
            file,
            ..self.clone()
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] ", self.directory, self.file_type)?;

        if let Some(file) = &self.file {
            write!(f, "[{file}] ")?;
        }

        write!(f, "[{}] ", self.current_context)?;

        Ok(())
    }
}
