use thiserror::Error;

/// Failures while accepting a user-selected document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Unsupported file type: {media_type} (expected {expected})")]
    InvalidInputType { media_type: String, expected: String },

    #[error("Load {generation} was superseded by load {latest}")]
    Superseded { generation: u64, latest: u64 },

    #[error("Document is empty")]
    EmptyDocument,
}

/// Failures reported by a document codec
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Page {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("Invalid raster image: {0}")]
    InvalidImage(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Failures while painting the overlay into a pixmap
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("Cannot rasterize an empty surface ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Unusable font: {0}")]
    Font(String),
}

/// Failure reported by the host viewport (DOM region, test double, ...)
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Viewport error: {0}")]
pub struct ViewportError(pub String);

/// Failures while handing the exported artifact to the user
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download failed: {0}")]
    Host(String),
}

/// Outcome taxonomy of a single flatten-and-export run
#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("No document loaded")]
    NoDocumentLoaded,

    #[error("No overlay surface")]
    NoSurface,

    #[error("Failed to parse original document: {0}")]
    DocumentParse(#[source] CodecError),

    #[error("Page index {index} out of range (document has {page_count} pages)")]
    PageIndexOutOfRange { index: usize, page_count: usize },

    #[error("Save failed: {0}")]
    SaveFailed(String),
}

impl FlattenError {
    /// Whether a plain retry (clicking save again) can succeed without
    /// reloading the document.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlattenError::SaveFailed(_))
    }
}

/// Errors surfaced by editor tool calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("No overlay surface (load a document first)")]
    NoSurface,

    #[error("Page {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),
}
