//! Bridge to the JavaScript page renderer (pdf.js viewer)
//!
//! The renderer lives in JS. Rust asks it to render a document or jump to a
//! page through two callbacks; the renderer reports back through
//! `RedactEditor.onDocumentLoaded` / `onPageChanged`.

use redact_core::{DocumentHandle, PageRenderer};
use wasm_bindgen::JsValue;

pub struct JsPageRenderer {
    on_render: js_sys::Function,
    on_jump: js_sys::Function,
}

impl JsPageRenderer {
    /// `on_render(dataUrl, name)` and `on_jump(pageIndex)`
    pub fn new(on_render: js_sys::Function, on_jump: js_sys::Function) -> Self {
        Self { on_render, on_jump }
    }
}

impl PageRenderer for JsPageRenderer {
    fn render(&mut self, document: &DocumentHandle) {
        let this = JsValue::null();
        if let Err(err) = self.on_render.call2(
            &this,
            &JsValue::from_str(&document.data_url()),
            &JsValue::from_str(document.name()),
        ) {
            tracing::warn!(error = ?err, "render callback threw");
        }
    }

    fn jump_to_page(&mut self, index: usize) {
        let this = JsValue::null();
        if let Err(err) = self.on_jump.call1(&this, &JsValue::from(index as u32)) {
            tracing::warn!(error = ?err, index, "jump callback threw");
        }
    }
}
