//! Redaction editor exposed to JavaScript
//!
//! All state lives in Rust. JavaScript only forwards DOM events, file bytes
//! and pdf.js viewer events.
//!
//! ```javascript
//! const editor = new RedactEditor(pageRegion, renderPdf, jumpToPage);
//! editor.setFont(new Uint8Array(await (await fetch("/fonts/sans.ttf")).arrayBuffer()));
//! const ticket = editor.beginLoad(file.name, file.type);
//! editor.finishLoad(ticket, new Uint8Array(await file.arrayBuffer()));
//! viewer.onDocumentLoad = (e) => editor.onDocumentLoaded(e.numPages);
//! viewer.onPageChange = (e) => editor.onPageChanged(e.currentPage);
//! editor.addRectangle();
//! editor.addText("Confidential", JSON.stringify({ x: 40, y: 60 }));
//! editor.save();
//! ```

use crate::dom_viewport::DomViewport;
use crate::download::BlobDownloadSink;
use crate::pager_bridge::JsPageRenderer;
use crate::resize::ResizeListener;
use redact_core::{
    EditorConfig, EditorSession, LoadTicket, LopdfCodec, RectangleOptions, SaveOutcome,
    SelectedFile, TextOptions, TextRenderer,
};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

type Session = EditorSession<DomViewport, JsPageRenderer>;

#[wasm_bindgen]
pub struct RedactEditor {
    session: Rc<RefCell<Session>>,
    pending: Vec<LoadTicket>,
    resize: Option<ResizeListener>,
}

#[wasm_bindgen]
impl RedactEditor {
    /// Create an editor over `region`, the element that hosts the rendered
    /// page. `config_json` may override any default (see `EditorConfig`).
    #[wasm_bindgen(constructor)]
    pub fn new(
        region: HtmlElement,
        on_render: js_sys::Function,
        on_jump: js_sys::Function,
        config_json: Option<String>,
    ) -> Result<RedactEditor, JsValue> {
        let config = match config_json {
            Some(json) => EditorConfig::from_json(&json).map_err(to_js)?,
            None => EditorConfig::default(),
        };
        let session = EditorSession::new(
            config,
            DomViewport::new(region),
            JsPageRenderer::new(on_render, on_jump),
        );
        Ok(RedactEditor {
            session: Rc::new(RefCell::new(session)),
            pending: Vec::new(),
            resize: None,
        })
    }

    /// Validate a selected file. Returns a ticket for `finishLoad`.
    #[wasm_bindgen(js_name = beginLoad)]
    pub fn begin_load(&mut self, name: &str, media_type: &str) -> Result<f64, JsValue> {
        let ticket = self
            .session_mut()?
            .select_file(&SelectedFile::new(name, media_type))
            .map_err(to_js)?;
        let generation = ticket.generation();
        self.pending.push(ticket);
        Ok(generation as f64)
    }

    /// Install the bytes read for `ticket`. Returns `false` when the bytes
    /// were discarded because a newer file was selected or the view was
    /// unloaded.
    #[wasm_bindgen(js_name = finishLoad)]
    pub fn finish_load(&mut self, ticket: f64, bytes: &[u8]) -> Result<bool, JsValue> {
        let generation = ticket as u64;
        let Some(index) = self
            .pending
            .iter()
            .position(|t| t.generation() == generation)
        else {
            tracing::warn!(generation, "discarding load voided by unload");
            return Ok(false);
        };
        let ticket = self.pending.swap_remove(index);

        let result = self.session_mut()?.finish_load(ticket, bytes.to_vec()).map(|_| ());
        self.pending.retain(|t| t.generation() > generation);

        match result {
            Ok(()) => {
                self.sync_resize_binding()?;
                Ok(true)
            }
            Err(redact_core::LoadError::Superseded { .. }) => Ok(false),
            Err(err) => Err(to_js(err)),
        }
    }

    /// Drop the current document and its overlay. Reads still in flight
    /// will be discarded by `finishLoad`.
    pub fn unload(&mut self) -> Result<(), JsValue> {
        self.pending.clear();
        self.session_mut()?.unload();
        self.sync_resize_binding()
    }

    /// Draw text labels with the given TrueType/OpenType font instead of
    /// block glyphs. `index` selects a face inside a collection.
    #[wasm_bindgen(js_name = setFont)]
    pub fn set_font(&mut self, bytes: Vec<u8>, index: Option<u32>) -> Result<(), JsValue> {
        let renderer = TextRenderer::from_font_data(bytes, index.unwrap_or(0)).map_err(to_js)?;
        self.session_mut()?.set_text_renderer(renderer);
        Ok(())
    }

    /// Release the overlay and listeners. Also happens on `free()`.
    pub fn teardown(&mut self) -> Result<(), JsValue> {
        self.resize = None;
        self.pending.clear();
        self.session_mut()?.teardown();
        Ok(())
    }

    #[wasm_bindgen(js_name = onDocumentLoaded)]
    pub fn on_document_loaded(&mut self, page_count: u32) -> Result<(), JsValue> {
        self.session_mut()?.on_document_loaded(page_count as usize);
        Ok(())
    }

    /// Returns `false` when the index was ignored.
    #[wasm_bindgen(js_name = onPageChanged)]
    pub fn on_page_changed(&mut self, index: i32) -> Result<bool, JsValue> {
        let Ok(index) = usize::try_from(index) else {
            tracing::warn!(index, "ignoring negative page index");
            return Ok(false);
        };
        Ok(self.session_mut()?.on_page_changed(index))
    }

    #[wasm_bindgen(js_name = jumpToPage)]
    pub fn jump_to_page(&mut self, index: u32) -> Result<(), JsValue> {
        self.session_mut()?
            .jump_to_page(index as usize)
            .map_err(to_js)
    }

    /// Add a rectangle; `options_json` overrides defaults. Returns its id.
    #[wasm_bindgen(js_name = addRectangle)]
    pub fn add_rectangle(&mut self, options_json: Option<String>) -> Result<f64, JsValue> {
        let opts: RectangleOptions = parse_options(options_json)?;
        let rect = self.session_mut()?.add_rectangle(opts).map_err(to_js)?;
        Ok(rect.id.0 as f64)
    }

    /// Add a text label; `options_json` overrides defaults. Returns its id.
    #[wasm_bindgen(js_name = addText)]
    pub fn add_text(
        &mut self,
        content: Option<String>,
        options_json: Option<String>,
    ) -> Result<f64, JsValue> {
        let opts: TextOptions = parse_options(options_json)?;
        let label = self
            .session_mut()?
            .add_text(content.as_deref(), opts)
            .map_err(to_js)?;
        Ok(label.id.0 as f64)
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f32, y: f32) -> Result<bool, JsValue> {
        Ok(self.session_mut()?.pointer_down(x, y))
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f32, y: f32) -> Result<bool, JsValue> {
        Ok(self.session_mut()?.pointer_move(x, y))
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) -> Result<(), JsValue> {
        self.session_mut()?.pointer_up();
        Ok(())
    }

    /// Flatten the overlay into the current page and download the result.
    /// Never throws for pipeline failures; returns whether a download was
    /// triggered and logs the reason otherwise.
    pub fn save(&mut self) -> Result<bool, JsValue> {
        let outcome = self
            .session_mut()?
            .save(&LopdfCodec, &mut BlobDownloadSink);
        Ok(matches!(outcome, SaveOutcome::Delivered { .. }))
    }

    #[wasm_bindgen(getter, js_name = hasDocument)]
    pub fn has_document(&self) -> bool {
        self.session
            .try_borrow()
            .map(|s| s.document().is_some())
            .unwrap_or(false)
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.session
            .try_borrow()
            .map(|s| s.page_count() as u32)
            .unwrap_or(0)
    }

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.session
            .try_borrow()
            .map(|s| s.current_page() as u32)
            .unwrap_or(0)
    }

    /// Current annotation objects, bottom to top.
    #[wasm_bindgen(js_name = getObjects)]
    pub fn get_objects(&self) -> Result<JsValue, JsValue> {
        let session = self
            .session
            .try_borrow()
            .map_err(|_| JsValue::from_str("Editor is busy"))?;
        match session.surface() {
            Some(surface) => serde_wasm_bindgen::to_value(surface.objects())
                .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e))),
            None => Ok(js_sys::Array::new().into()),
        }
    }
}

impl RedactEditor {
    fn session_mut(&self) -> Result<std::cell::RefMut<'_, Session>, JsValue> {
        self.session
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Editor is busy"))
    }

    /// Hold a window resize listener exactly while the session wants one.
    fn sync_resize_binding(&mut self) -> Result<(), JsValue> {
        let bound = self.session_mut()?.is_resize_bound();
        if bound && self.resize.is_none() {
            let session: Weak<RefCell<Session>> = Rc::downgrade(&self.session);
            self.resize = Some(ResizeListener::attach(move || {
                let Some(session) = session.upgrade() else {
                    return;
                };
                let Ok(mut session) = session.try_borrow_mut() else {
                    return;
                };
                if let Err(err) = session.on_window_resize() {
                    tracing::warn!(error = %err, "overlay resize failed");
                }
            })?);
        } else if !bound {
            self.resize = None;
        }
        Ok(())
    }
}

impl Drop for RedactEditor {
    fn drop(&mut self) {
        self.resize = None;
        if let Ok(mut session) = self.session.try_borrow_mut() {
            session.teardown();
        }
    }
}

fn parse_options<T>(json: Option<String>) -> Result<T, JsValue>
where
    T: serde::de::DeserializeOwned + Default,
{
    match json {
        Some(json) if !json.trim().is_empty() => serde_json::from_str(&json)
            .map_err(|e| JsValue::from_str(&format!("Invalid options JSON: {}", e))),
        _ => Ok(T::default()),
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}


#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn editor() -> RedactEditor {
        let document = web_sys::window().unwrap().document().unwrap();
        let region: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
        document.body().unwrap().append_child(&region).unwrap();
        let noop = js_sys::Function::new_no_args("");
        RedactEditor::new(region, noop.clone(), noop, None).unwrap()
    }

    #[wasm_bindgen_test]
    fn test_unload_discards_pending_read() {
        let mut editor = editor();
        let ticket = editor.begin_load("late.pdf", "application/pdf").unwrap();
        editor.unload().unwrap();

        assert!(!editor.finish_load(ticket, b"%PDF-1.7").unwrap());
        assert!(!editor.has_document());
    }

    #[wasm_bindgen_test]
    fn test_set_font_rejects_garbage() {
        let mut editor = editor();
        assert!(editor.set_font(vec![0, 1, 2, 3], None).is_err());
    }
}
