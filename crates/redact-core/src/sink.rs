//! Delivery of exported documents

use crate::error::DeliveryError;
use std::fmt;
use std::path::{Path, PathBuf};

/// A finished document ready to be handed to the user.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ExportArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportArtifact")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Something that can put an artifact in the user's hands: a browser
/// download, a file on disk, a buffer in a test.
pub trait DownloadSink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<(), DeliveryError>;
}

/// Writes artifacts into a directory, one file per artifact name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    last_written: Option<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_written: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn last_written(&self) -> Option<&Path> {
        self.last_written.as_deref()
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<(), DeliveryError> {
        // Only the final path component, so a name can't escape the directory.
        let name = Path::new(&artifact.file_name)
            .file_name()
            .ok_or_else(|| DeliveryError::Host(format!("invalid file name: {}", artifact.file_name)))?;
        let path = self.dir.join(name);
        std::fs::write(&path, &artifact.bytes)?;
        tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), "wrote export");
        self.last_written = Some(path);
        Ok(())
    }
}

/// Keeps delivered artifacts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub delivered: Vec<ExportArtifact>,
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<(), DeliveryError> {
        self.delivered.push(artifact.clone());
        Ok(())
    }
}
