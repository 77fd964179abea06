//! PDF overlay annotation and flattening
//!
//! This crate lets a host draw redaction blocks and text labels on a
//! transparent overlay above a rendered PDF page, then burn that overlay into
//! the page of a fresh copy of the document.
//!
//! The browser specific pieces (page renderer, DOM viewport, download) stay
//! behind the [`PageRenderer`], [`Viewport`] and [`DownloadSink`] traits so
//! the whole pipeline runs natively in tests.

pub mod annotations;
pub mod codec;
pub mod config;
pub mod error;
pub mod flatten;
pub mod interaction;
pub mod loader;
pub mod pager;
pub mod raster;
pub mod session;
pub mod sink;
pub mod surface;

pub use annotations::{
    AnnotationObject, Color, Interactive, ObjectId, Rectangle, RectangleOptions, RectangleStyle,
    TextLabel, TextOptions, TextStyle,
};
pub use codec::{DocumentCodec, LopdfCodec, PageSize, ParsedDocument};
pub use config::EditorConfig;
pub use error::{
    CodecError, DeliveryError, EditorError, FlattenError, LoadError, RasterError, ViewportError,
};
pub use flatten::{flatten, flatten_and_export, FlattenRequest, DEFAULT_EXPORT_FILE_NAME};
pub use loader::{DocumentHandle, DocumentLoader, LoadTicket, SelectedFile, PDF_MEDIA_TYPE};
pub use pager::{PageNavigator, PageRenderer};
pub use raster::{RenderMode, TextRenderer};
pub use session::{EditorSession, SaveOutcome};
pub use sink::{DirectorySink, DownloadSink, ExportArtifact, MemorySink};
pub use surface::{OverlayManager, OverlaySurface, Viewport, ViewportBox};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<usize, CodecError> {
    LopdfCodec.parse(bytes).map(|doc| doc.page_count())
}
