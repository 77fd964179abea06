//! Browser download of exported documents

use redact_core::{DeliveryError, DownloadSink, ExportArtifact};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

/// Triggers a client-side save: Blob, object URL, synthetic anchor click.
#[derive(Debug, Default)]
pub struct BlobDownloadSink;

impl BlobDownloadSink {
    fn trigger(artifact: &ExportArtifact) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document object available"))?;

        let array = js_sys::Uint8Array::new_with_length(artifact.bytes.len() as u32);
        array.copy_from(&artifact.bytes);
        let parts = js_sys::Array::of1(&array);

        let options = BlobPropertyBag::new();
        options.set_type(&artifact.media_type);
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
        let url = Url::create_object_url_with_blob(&blob)?;

        let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
        anchor.set_href(&url);
        anchor.set_download(&artifact.file_name);
        anchor.click();

        Url::revoke_object_url(&url)?;
        Ok(())
    }
}

impl DownloadSink for BlobDownloadSink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<(), DeliveryError> {
        Self::trigger(artifact).map_err(|e| {
            DeliveryError::Host(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
        })
    }
}
