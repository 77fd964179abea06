//! Overlay surface lifecycle
//!
//! The [`OverlayManager`] owns at most one [`OverlaySurface`] stacked over
//! the page-display region of a [`Viewport`]. The surface's pixel size always
//! mirrors the viewport's rendered box: it is read on `create` and re-read on
//! every `resize`. Object coordinates are never rescaled.

use crate::annotations::{AnnotationObject, Interactive, ObjectId};
use crate::error::{RasterError, ViewportError};
use crate::raster::{self, RenderMode, TextRenderer};
use tiny_skia::Pixmap;

/// Rendered pixel box of the page-display region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportBox {
    pub width: u32,
    pub height: u32,
}

impl ViewportBox {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Host region the overlay is stacked on.
///
/// Implementations own the actual drawing layer (a canvas element in the
/// browser). The layer sits at the region's top-left corner, above the page
/// renderer in paint order, and captures pointer input itself.
pub trait Viewport {
    /// Current rendered box, read live from the host.
    fn rendered_box(&self) -> ViewportBox;

    /// Insert the drawing layer as the region's topmost child.
    fn mount_layer(&mut self, size: ViewportBox) -> Result<(), ViewportError>;

    fn resize_layer(&mut self, size: ViewportBox) -> Result<(), ViewportError>;

    /// Show a freshly rendered frame on the layer.
    fn present(&mut self, frame: &Pixmap) -> Result<(), ViewportError>;

    /// Remove the layer and release its rendering context. Must tolerate
    /// being called when nothing is mounted.
    fn unmount_layer(&mut self);
}

/// Drawing region holding annotation objects in z-order.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySurface {
    width: u32,
    height: u32,
    objects: Vec<AnnotationObject>,
    selection: Option<ObjectId>,
    next_id: u64,
    dirty: bool,
    frames: u64,
}

impl OverlaySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            objects: Vec::new(),
            selection: None,
            next_id: 0,
            dirty: true,
            frames: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> ViewportBox {
        ViewportBox::new(self.width, self.height)
    }

    pub(crate) fn set_size(&mut self, size: ViewportBox) {
        self.width = size.width;
        self.height = size.height;
        self.dirty = true;
    }

    /// Objects in paint order (first is bottom-most).
    pub fn objects(&self) -> &[AnnotationObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, id: ObjectId) -> Option<&AnnotationObject> {
        self.objects.iter().find(|obj| obj.id() == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut AnnotationObject> {
        self.dirty = true;
        self.objects.iter_mut().find(|obj| obj.id() == id)
    }

    pub(crate) fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn push(&mut self, object: AnnotationObject) {
        self.objects.push(object);
        self.dirty = true;
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    /// Select an object. Unknown or non-selectable ids clear the selection.
    pub fn select(&mut self, id: Option<ObjectId>) {
        let next = id.filter(|id| {
            self.object(*id)
                .map(|obj| obj.is_selectable())
                .unwrap_or(false)
        });
        if next != self.selection {
            self.selection = next;
            self.dirty = true;
        }
    }

    /// Topmost selectable object under the point.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .filter(|obj| obj.is_selectable())
            .find(|obj| obj.bounds().contains(x, y))
            .map(|obj| obj.id())
    }

    /// Re-measure every text label with `text` so its bounds cover exactly
    /// the lines that will be painted.
    pub fn relayout_text(&mut self, text: &TextRenderer) {
        for object in &mut self.objects {
            if let AnnotationObject::Text(label) = object {
                let height = text.label_height(label);
                if height != label.height {
                    label.height = height;
                    self.dirty = true;
                }
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Number of frames rendered since creation.
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    fn mark_rendered(&mut self) {
        self.dirty = false;
        self.frames += 1;
    }
}

/// Owns the single overlay surface of a viewport region.
pub struct OverlayManager<V: Viewport> {
    viewport: V,
    surface: Option<OverlaySurface>,
    text: TextRenderer,
}

impl<V: Viewport> OverlayManager<V> {
    /// Manager drawing labels with [`TextRenderer::preferred`].
    pub fn new(viewport: V) -> Self {
        Self::with_text_renderer(viewport, TextRenderer::preferred())
    }

    pub fn with_text_renderer(viewport: V, text: TextRenderer) -> Self {
        Self {
            viewport,
            surface: None,
            text,
        }
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    pub fn text_renderer(&self) -> &TextRenderer {
        &self.text
    }

    pub fn set_text_renderer(&mut self, text: TextRenderer) {
        self.text = text;
        if let Some(surface) = self.surface.as_mut() {
            surface.relayout_text(&self.text);
            surface.invalidate();
        }
    }

    pub fn surface(&self) -> Option<&OverlaySurface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut OverlaySurface> {
        self.surface.as_mut()
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Allocate a fresh surface sized to the viewport, tearing down any
    /// previous one first.
    pub fn create(&mut self) -> Result<&mut OverlaySurface, ViewportError> {
        self.destroy();

        let size = self.viewport.rendered_box();
        self.viewport.mount_layer(size)?;
        tracing::debug!(width = size.width, height = size.height, "overlay surface created");

        Ok(self.surface.insert(OverlaySurface::new(size.width, size.height)))
    }

    /// Match the surface to the viewport's current box. Objects keep their
    /// absolute pixel coordinates. Does nothing without a surface.
    pub fn resize(&mut self) -> Result<(), ViewportError> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };

        let size = self.viewport.rendered_box();
        surface.set_size(size);
        self.viewport.resize_layer(size)?;
        tracing::debug!(width = size.width, height = size.height, "overlay surface resized");
        Ok(())
    }

    /// Release the surface and its layer. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.surface.take().is_some() {
            self.viewport.unmount_layer();
            tracing::debug!("overlay surface destroyed");
        }
    }

    /// Force a full re-render and present it. Returns `false` when there is
    /// nothing to draw on (no surface, or a zero-sized one).
    pub fn render(&mut self) -> Result<bool, ViewportError> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(false);
        };
        surface.relayout_text(&self.text);
        if surface.size().is_empty() {
            return Ok(false);
        }

        let frame = raster::rasterize(surface, &self.text, RenderMode::Live)
            .map_err(|e| ViewportError(e.to_string()))?;
        self.viewport.present(&frame)?;
        surface.mark_rendered();
        Ok(true)
    }

    /// Export-quality snapshot of the current surface: every object, no
    /// selection chrome, 1:1 pixels. The surface itself is not changed.
    pub fn snapshot(&self) -> Option<Result<Pixmap, RasterError>> {
        self.surface
            .as_ref()
            .map(|surface| raster::rasterize(surface, &self.text, RenderMode::Export))
    }
}

impl<V: Viewport> Drop for OverlayManager<V> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Observable state of a [`FakeViewport`], shared with the test.
    #[derive(Debug, Default)]
    pub struct FakeViewportState {
        pub rendered: ViewportBox,
        pub mounted_layers: usize,
        pub layer_size: Option<ViewportBox>,
        pub frames: Vec<ViewportBox>,
        pub fail_mount: bool,
    }

    /// In-memory viewport for tests.
    #[derive(Debug, Clone, Default)]
    pub struct FakeViewport {
        pub state: Rc<RefCell<FakeViewportState>>,
    }

    impl FakeViewport {
        pub fn new(width: u32, height: u32) -> Self {
            let viewport = Self::default();
            viewport.state.borrow_mut().rendered = ViewportBox::new(width, height);
            viewport
        }

        pub fn set_rendered(&self, width: u32, height: u32) {
            self.state.borrow_mut().rendered = ViewportBox::new(width, height);
        }
    }

    impl Viewport for FakeViewport {
        fn rendered_box(&self) -> ViewportBox {
            self.state.borrow().rendered
        }

        fn mount_layer(&mut self, size: ViewportBox) -> Result<(), ViewportError> {
            let mut state = self.state.borrow_mut();
            if state.fail_mount {
                return Err(ViewportError("region detached".to_string()));
            }
            state.mounted_layers += 1;
            state.layer_size = Some(size);
            Ok(())
        }

        fn resize_layer(&mut self, size: ViewportBox) -> Result<(), ViewportError> {
            self.state.borrow_mut().layer_size = Some(size);
            Ok(())
        }

        fn present(&mut self, frame: &Pixmap) -> Result<(), ViewportError> {
            self.state
                .borrow_mut()
                .frames
                .push(ViewportBox::new(frame.width(), frame.height()));
            Ok(())
        }

        fn unmount_layer(&mut self) {
            let mut state = self.state.borrow_mut();
            state.mounted_layers = state.mounted_layers.saturating_sub(1);
            state.layer_size = None;
        }
    }
}
