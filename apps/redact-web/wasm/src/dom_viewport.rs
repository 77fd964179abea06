//! DOM-backed overlay layer
//!
//! The overlay is a `<canvas>` appended as the last child of the page
//! region, absolutely positioned over its top-left corner so it paints above
//! the rendered page and receives pointer input first.

use redact_core::{Viewport, ViewportBox, ViewportError};
use tiny_skia::Pixmap;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, ImageData};

/// Class applied to the overlay canvas so hosts can style or find it.
pub const OVERLAY_CLASS: &str = "redact-overlay";

/// Paint order of the overlay relative to the page layers.
const OVERLAY_Z_INDEX: &str = "10";

pub struct DomViewport {
    region: HtmlElement,
    canvas: Option<HtmlCanvasElement>,
}

impl DomViewport {
    pub fn new(region: HtmlElement) -> Self {
        Self {
            region,
            canvas: None,
        }
    }

    pub fn canvas(&self) -> Option<&HtmlCanvasElement> {
        self.canvas.as_ref()
    }

    fn create_canvas(&self, size: ViewportBox) -> Result<HtmlCanvasElement, JsValue> {
        let document = self
            .region
            .owner_document()
            .ok_or_else(|| JsValue::from_str("Region is not attached to a document"))?;
        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        canvas.set_class_name(OVERLAY_CLASS);

        let style = canvas.style();
        style.set_property("position", "absolute")?;
        style.set_property("top", "0")?;
        style.set_property("left", "0")?;
        style.set_property("z-index", OVERLAY_Z_INDEX)?;
        style.set_property("pointer-events", "auto")?;

        // Absolute children are placed against the nearest positioned ancestor.
        if needs_positioning(&self.computed_position()?) {
            self.region.style().set_property("position", "relative")?;
        }

        apply_size(&canvas, size)?;
        self.region.append_child(&canvas)?;
        Ok(canvas)
    }

    /// Resolved `position` of the region, including stylesheet rules.
    fn computed_position(&self) -> Result<String, JsValue> {
        let computed = match web_sys::window() {
            Some(window) => window.get_computed_style(&self.region)?,
            None => None,
        };
        match computed {
            Some(style) => style.get_property_value("position"),
            None => self.region.style().get_property_value("position"),
        }
    }
}

/// Whether a region with this resolved `position` must be made a
/// containing block for the overlay.
pub(crate) fn needs_positioning(position: &str) -> bool {
    matches!(position.trim(), "" | "static")
}

impl Viewport for DomViewport {
    fn rendered_box(&self) -> ViewportBox {
        ViewportBox::new(
            self.region.offset_width().max(0) as u32,
            self.region.offset_height().max(0) as u32,
        )
    }

    fn mount_layer(&mut self, size: ViewportBox) -> Result<(), ViewportError> {
        self.unmount_layer();
        let canvas = self.create_canvas(size).map_err(js_error)?;
        self.canvas = Some(canvas);
        Ok(())
    }

    fn resize_layer(&mut self, size: ViewportBox) -> Result<(), ViewportError> {
        match &self.canvas {
            Some(canvas) => apply_size(canvas, size).map_err(js_error),
            None => Ok(()),
        }
    }

    fn present(&mut self, frame: &Pixmap) -> Result<(), ViewportError> {
        let Some(canvas) = &self.canvas else {
            return Ok(());
        };
        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(js_error)?
            .ok_or_else(|| ViewportError("2d context unavailable".to_string()))?
            .dyn_into()
            .map_err(|_| ViewportError("unexpected context type".to_string()))?;

        let rgba = straight_rgba(frame);
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(rgba.as_slice()),
            frame.width(),
            frame.height(),
        )
        .map_err(js_error)?;
        context.put_image_data(&image, 0.0, 0.0).map_err(js_error)
    }

    fn unmount_layer(&mut self) {
        if let Some(canvas) = self.canvas.take() {
            canvas.remove();
        }
    }
}

impl Drop for DomViewport {
    fn drop(&mut self) {
        self.unmount_layer();
    }
}

fn apply_size(canvas: &HtmlCanvasElement, size: ViewportBox) -> Result<(), JsValue> {
    canvas.set_width(size.width);
    canvas.set_height(size.height);
    let style = canvas.style();
    style.set_property("width", &format!("{}px", size.width))?;
    style.set_property("height", &format!("{}px", size.height))?;
    Ok(())
}

fn js_error(err: JsValue) -> ViewportError {
    ViewportError(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

/// Canvas `ImageData` wants straight alpha; tiny-skia stores premultiplied.
pub(crate) fn straight_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    data
}


#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn region(width: u32, height: u32) -> HtmlElement {
        let document = web_sys::window().unwrap().document().unwrap();
        let region: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
        let style = region.style();
        style.set_property("width", &format!("{}px", width)).unwrap();
        style.set_property("height", &format!("{}px", height)).unwrap();
        document.body().unwrap().append_child(&region).unwrap();
        region
    }

    #[wasm_bindgen_test]
    fn test_mount_places_canvas_over_region() {
        let region = region(300, 200);
        let mut viewport = DomViewport::new(region.clone());
        let size = viewport.rendered_box();
        assert_eq!(size, ViewportBox::new(300, 200));

        viewport.mount_layer(size).unwrap();
        let canvas = viewport.canvas().unwrap();
        assert_eq!((canvas.width(), canvas.height()), (300, 200));
        assert_eq!(canvas.style().get_property_value("z-index").unwrap(), "10");
        assert_eq!(region.child_element_count(), 1);
    }

    #[wasm_bindgen_test]
    fn test_stylesheet_position_is_respected() {
        let document = web_sys::window().unwrap().document().unwrap();
        let sheet = document.create_element("style").unwrap();
        sheet.set_text_content(Some(".pinned-region { position: absolute; }"));
        document.head().unwrap().append_child(&sheet).unwrap();

        let region = region(120, 80);
        region.set_class_name("pinned-region");
        let mut viewport = DomViewport::new(region.clone());
        viewport.mount_layer(ViewportBox::new(120, 80)).unwrap();

        assert_eq!(region.style().get_property_value("position").unwrap(), "");
        let computed = web_sys::window()
            .unwrap()
            .get_computed_style(&region)
            .unwrap()
            .unwrap();
        assert_eq!(computed.get_property_value("position").unwrap(), "absolute");
    }

    #[wasm_bindgen_test]
    fn test_static_region_becomes_relative() {
        let region = region(50, 50);
        let mut viewport = DomViewport::new(region.clone());
        viewport.mount_layer(ViewportBox::new(50, 50)).unwrap();
        assert_eq!(
            region.style().get_property_value("position").unwrap(),
            "relative"
        );
    }

    #[wasm_bindgen_test]
    fn test_remount_replaces_canvas() {
        let region = region(100, 100);
        let mut viewport = DomViewport::new(region.clone());
        viewport.mount_layer(ViewportBox::new(100, 100)).unwrap();
        viewport.mount_layer(ViewportBox::new(100, 100)).unwrap();
        assert_eq!(region.child_element_count(), 1);

        viewport.unmount_layer();
        assert_eq!(region.child_element_count(), 0);
    }
}
