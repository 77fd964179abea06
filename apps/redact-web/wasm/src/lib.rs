//! WASM bindings for the PDF redaction editor
//!
//! The editor state machine lives in `redact-core`; this crate supplies the
//! browser pieces behind its traits:
//! - `DomViewport`: the overlay `<canvas>` stacked over the page region
//! - `JsPageRenderer`: callbacks into the pdf.js viewer
//! - `BlobDownloadSink`: client-side download of the flattened PDF
//! - `ResizeListener`: window resize subscription scoped to a loaded document
//!
//! JavaScript only handles DOM events, file I/O and the page viewer.

pub mod dom_viewport;
pub mod download;
pub mod editor;
pub mod logging;
pub mod pager_bridge;
pub mod resize;
pub mod validation;

use wasm_bindgen::prelude::*;

// Re-export main types for JavaScript
pub use editor::RedactEditor;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Quick validation check for a PDF file
/// Returns Ok(()) if valid, Err with message if not
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    validation::quick_validate(bytes).map_err(|e| JsValue::from_str(&e))
}

/// Get page count from PDF bytes (convenience function)
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    redact_core::get_page_count(bytes)
        .map(|count| count as u32)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
