use std::fmt;
use std::path::PathBuf;

use crate::adapter::SourceCapabilities;

#[derive(Debug, thiserror::Error)]
pub enum DocumentReadError {
    #[error("Failed to read document at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Document unavailable: {0}")]
    Unavailable(String),
}

/// Identity of the document whose views are being paired
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What the surrounding application provides to the controller
pub trait SyncHost {
    /// Full current text of the document. Must not have side effects.
    fn read_document(&self, document: &DocumentId) -> Result<String, DocumentReadError>;

    /// Whatever native capabilities the active source view exposes, if there is one
    fn active_source(&mut self) -> Option<SourceCapabilities>;
}
