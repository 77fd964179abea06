//! Document source loading
//!
//! A load is split in two halves so the host can read the file
//! asynchronously: [`DocumentLoader::begin`] validates the selection and
//! hands out a [`LoadTicket`]; [`DocumentLoader::complete`] turns the bytes
//! into a [`DocumentHandle`]. Every ticket carries a generation number and
//! only the newest one may complete, so a slow read that finishes after a
//! newer selection can never overwrite it.

use crate::error::LoadError;
use base64::Engine as _;
use std::fmt;
use std::rc::Rc;

/// Media type of the only accepted container format.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// What the host knows about a file before reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
        }
    }
}

/// Permission to complete one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    name: String,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Immutable loaded document. Cloning shares the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    bytes: Rc<[u8]>,
    name: String,
    media_type: String,
    generation: u64,
}

impl DocumentHandle {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Media type the document was accepted as.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:` URL suitable for handing to a renderer.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("generation", &self.generation)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Issues load tickets and validates their completion.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    accepted_media_type: String,
    latest: u64,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(PDF_MEDIA_TYPE)
    }
}

impl DocumentLoader {
    pub fn new(accepted_media_type: impl Into<String>) -> Self {
        Self {
            accepted_media_type: accepted_media_type.into(),
            latest: 0,
        }
    }

    /// Generation of the most recently accepted selection (0 = none yet).
    pub fn latest_generation(&self) -> u64 {
        self.latest
    }

    /// Accept a selection if its media type matches. Rejections leave the
    /// loader untouched, so an in-flight load stays valid.
    pub fn begin(&mut self, file: &SelectedFile) -> Result<LoadTicket, LoadError> {
        if !file
            .media_type
            .trim()
            .eq_ignore_ascii_case(&self.accepted_media_type)
        {
            tracing::warn!(
                name = %file.name,
                media_type = %file.media_type,
                "rejected file with unsupported type"
            );
            return Err(LoadError::InvalidInputType {
                media_type: file.media_type.clone(),
                expected: self.accepted_media_type.clone(),
            });
        }

        self.latest += 1;
        tracing::debug!(name = %file.name, generation = self.latest, "load started");
        Ok(LoadTicket {
            generation: self.latest,
            name: file.name.clone(),
        })
    }

    /// Void every outstanding ticket, e.g. when the view is cleared while a
    /// read is still in flight.
    pub fn invalidate(&mut self) {
        self.latest += 1;
        tracing::debug!(generation = self.latest, "outstanding loads invalidated");
    }

    /// Finish a load. Only the latest ticket may complete.
    pub fn complete(&self, ticket: LoadTicket, bytes: Vec<u8>) -> Result<DocumentHandle, LoadError> {
        if ticket.generation != self.latest {
            tracing::warn!(
                generation = ticket.generation,
                latest = self.latest,
                "discarding superseded load"
            );
            return Err(LoadError::Superseded {
                generation: ticket.generation,
                latest: self.latest,
            });
        }
        if bytes.is_empty() {
            return Err(LoadError::EmptyDocument);
        }

        Ok(DocumentHandle {
            bytes: bytes.into(),
            name: ticket.name,
            media_type: self.accepted_media_type.clone(),
            generation: ticket.generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_file(name: &str) -> SelectedFile {
        SelectedFile::new(name, PDF_MEDIA_TYPE)
    }

    #[test]
    fn test_rejects_wrong_media_type() {
        let mut loader = DocumentLoader::default();
        let err = loader
            .begin(&SelectedFile::new("photo.png", "image/png"))
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidInputType { .. }));
        assert_eq!(loader.latest_generation(), 0);
    }

    #[test]
    fn test_media_type_match_is_case_insensitive() {
        let mut loader = DocumentLoader::default();
        assert!(loader
            .begin(&SelectedFile::new("a.pdf", "Application/PDF"))
            .is_ok());
    }

    #[test]
    fn test_complete_produces_handle() {
        let mut loader = DocumentLoader::default();
        let ticket = loader.begin(&pdf_file("a.pdf")).unwrap();
        let handle = loader.complete(ticket, b"%PDF-1.7".to_vec()).unwrap();
        assert_eq!(handle.name(), "a.pdf");
        assert_eq!(handle.bytes(), b"%PDF-1.7");
        assert_eq!(handle.generation(), 1);
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut loader = DocumentLoader::default();
        let slow = loader.begin(&pdf_file("slow.pdf")).unwrap();
        let fast = loader.begin(&pdf_file("fast.pdf")).unwrap();

        assert!(loader.complete(fast, b"%PDF-fast".to_vec()).is_ok());
        let err = loader.complete(slow, b"%PDF-slow".to_vec()).unwrap_err();
        assert_eq!(
            err,
            LoadError::Superseded {
                generation: 1,
                latest: 2
            }
        );
    }

    #[test]
    fn test_rejected_selection_does_not_supersede_inflight_load() {
        let mut loader = DocumentLoader::default();
        let ticket = loader.begin(&pdf_file("a.pdf")).unwrap();
        let _ = loader.begin(&SelectedFile::new("notes.txt", "text/plain"));
        assert!(loader.complete(ticket, b"%PDF".to_vec()).is_ok());
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let mut loader = DocumentLoader::default();
        let ticket = loader.begin(&pdf_file("a.pdf")).unwrap();
        assert_eq!(
            loader.complete(ticket, Vec::new()).unwrap_err(),
            LoadError::EmptyDocument
        );
    }

    #[test]
    fn test_data_url_is_base64_pdf() {
        let mut loader = DocumentLoader::default();
        let ticket = loader.begin(&pdf_file("a.pdf")).unwrap();
        let handle = loader.complete(ticket, b"%PDF".to_vec()).unwrap();
        assert_eq!(handle.data_url(), "data:application/pdf;base64,JVBERg==");
    }

    #[test]
    fn test_data_url_uses_accepted_media_type() {
        let mut loader = DocumentLoader::new("application/x-pdf");
        let ticket = loader
            .begin(&SelectedFile::new("a.pdf", "application/x-pdf"))
            .unwrap();
        let handle = loader.complete(ticket, b"%PDF".to_vec()).unwrap();
        assert_eq!(handle.media_type(), "application/x-pdf");
        assert_eq!(handle.data_url(), "data:application/x-pdf;base64,JVBERg==");
    }

    #[test]
    fn test_invalidate_voids_outstanding_tickets() {
        let mut loader = DocumentLoader::default();
        let ticket = loader.begin(&pdf_file("a.pdf")).unwrap();
        loader.invalidate();

        let err = loader.complete(ticket, b"%PDF".to_vec()).unwrap_err();
        assert_eq!(
            err,
            LoadError::Superseded {
                generation: 1,
                latest: 2
            }
        );

        let next = loader.begin(&pdf_file("b.pdf")).unwrap();
        assert!(loader.complete(next, b"%PDF".to_vec()).is_ok());
    }
}
