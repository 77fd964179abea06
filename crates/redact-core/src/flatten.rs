//! Flatten & export
//!
//! Burns the overlay into one page of a fresh copy of the loaded document
//! and hands the result to a [`DownloadSink`]. Each run is independent and
//! reads the surface without modifying it; the loaded bytes are never
//! touched.

use crate::codec::{DocumentCodec, ParsedDocument};
use crate::error::FlattenError;
use crate::loader::{DocumentHandle, PDF_MEDIA_TYPE};
use crate::raster;
use crate::sink::{DownloadSink, ExportArtifact};
use crate::surface::{OverlayManager, Viewport};

/// Default name of the exported file.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "annotated.pdf";

/// Inputs of one flatten run.
#[derive(Debug, Clone, Copy)]
pub struct FlattenRequest<'a> {
    pub document: Option<&'a DocumentHandle>,
    pub page_index: usize,
    pub file_name: &'a str,
}

/// Produce the flattened document without delivering it.
pub fn flatten<C, V>(
    request: FlattenRequest<'_>,
    overlay: &mut OverlayManager<V>,
    codec: &C,
) -> Result<ExportArtifact, FlattenError>
where
    C: DocumentCodec,
    V: Viewport,
{
    let document = request.document.ok_or(FlattenError::NoDocumentLoaded)?;
    if !overlay.has_surface() {
        return Err(FlattenError::NoSurface);
    }

    let mut parsed = codec
        .parse(document.bytes())
        .map_err(FlattenError::DocumentParse)?;

    let page_count = parsed.page_count();
    if request.page_index >= page_count {
        return Err(FlattenError::PageIndexOutOfRange {
            index: request.page_index,
            page_count,
        });
    }

    // Bring the on-screen layer up to date before taking the snapshot.
    overlay
        .render()
        .map_err(|e| FlattenError::SaveFailed(e.to_string()))?;
    let pixmap = overlay
        .snapshot()
        .ok_or(FlattenError::NoSurface)?
        .map_err(|e| FlattenError::SaveFailed(e.to_string()))?;
    let png = raster::encode_png(&pixmap).map_err(|e| FlattenError::SaveFailed(e.to_string()))?;

    let page = parsed
        .page_size(request.page_index)
        .map_err(|e| FlattenError::SaveFailed(e.to_string()))?;
    let image = parsed
        .embed_raster_image(&png)
        .map_err(|e| FlattenError::SaveFailed(e.to_string()))?;
    parsed
        .draw_image(request.page_index, &image, 0.0, 0.0, page.width, page.height)
        .map_err(|e| FlattenError::SaveFailed(e.to_string()))?;

    let bytes = parsed
        .serialize()
        .map_err(|e| FlattenError::SaveFailed(e.to_string()))?;

    tracing::debug!(
        page = request.page_index,
        surface_width = pixmap.width(),
        surface_height = pixmap.height(),
        page_width = page.width,
        page_height = page.height,
        "flattened overlay"
    );

    Ok(ExportArtifact {
        file_name: request.file_name.to_string(),
        media_type: PDF_MEDIA_TYPE.to_string(),
        bytes,
    })
}

/// Flatten, then deliver through `sink`.
pub fn flatten_and_export<C, V, S>(
    request: FlattenRequest<'_>,
    overlay: &mut OverlayManager<V>,
    codec: &C,
    sink: &mut S,
) -> Result<ExportArtifact, FlattenError>
where
    C: DocumentCodec,
    V: Viewport,
    S: DownloadSink,
{
    let artifact = flatten(request, overlay, codec)?;
    sink.deliver(&artifact)
        .map_err(|e| FlattenError::SaveFailed(e.to_string()))?;
    tracing::info!(
        file_name = %artifact.file_name,
        bytes = artifact.bytes.len(),
        "export delivered"
    );
    Ok(artifact)
}
