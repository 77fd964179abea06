//! Shared fixtures for integration tests

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use redact_core::codec::ImageRef;
use redact_core::{
    CodecError, DocumentCodec, DocumentHandle, DocumentLoader, LopdfCodec, PageRenderer,
    PageSize, ParsedDocument, SelectedFile, Viewport, ViewportBox, ViewportError,
    PDF_MEDIA_TYPE,
};
use std::cell::RefCell;
use std::rc::Rc;
use tiny_skia::Pixmap;

/// Build an N-page Letter-sized PDF whose pages carry distinct text.
pub fn create_test_pdf(num_pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for i in 0..num_pages {
        let content = format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => num_pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn load_handle(bytes: Vec<u8>) -> DocumentHandle {
    let mut loader = DocumentLoader::default();
    let ticket = loader
        .begin(&SelectedFile::new("fixture.pdf", PDF_MEDIA_TYPE))
        .unwrap();
    loader.complete(ticket, bytes).unwrap()
}

#[derive(Debug, Default)]
pub struct ViewportState {
    pub rendered: ViewportBox,
    pub live_layers: usize,
    pub max_live_layers: usize,
    pub frames: usize,
}

/// Viewport double whose rendered box the test controls.
#[derive(Debug, Clone, Default)]
pub struct TestViewport {
    pub state: Rc<RefCell<ViewportState>>,
}

impl TestViewport {
    pub fn new(width: u32, height: u32) -> Self {
        let viewport = Self::default();
        viewport.resize_window(width, height);
        viewport
    }

    pub fn resize_window(&self, width: u32, height: u32) {
        self.state.borrow_mut().rendered = ViewportBox::new(width, height);
    }

    pub fn live_layers(&self) -> usize {
        self.state.borrow().live_layers
    }
}

impl Viewport for TestViewport {
    fn rendered_box(&self) -> ViewportBox {
        self.state.borrow().rendered
    }

    fn mount_layer(&mut self, _size: ViewportBox) -> Result<(), ViewportError> {
        let mut state = self.state.borrow_mut();
        state.live_layers += 1;
        state.max_live_layers = state.max_live_layers.max(state.live_layers);
        Ok(())
    }

    fn resize_layer(&mut self, _size: ViewportBox) -> Result<(), ViewportError> {
        Ok(())
    }

    fn present(&mut self, _frame: &Pixmap) -> Result<(), ViewportError> {
        self.state.borrow_mut().frames += 1;
        Ok(())
    }

    fn unmount_layer(&mut self) {
        let mut state = self.state.borrow_mut();
        state.live_layers = state.live_layers.saturating_sub(1);
    }
}

/// Renderer that does nothing; tests report page events themselves.
#[derive(Debug, Clone, Default)]
pub struct NullRenderer;

impl PageRenderer for NullRenderer {
    fn render(&mut self, _document: &DocumentHandle) {}

    fn jump_to_page(&mut self, _index: usize) {}
}

/// lopdf codec that records which operations ran.
#[derive(Debug, Clone, Default)]
pub struct SpyCodec {
    pub calls: Rc<RefCell<Vec<&'static str>>>,
}

impl SpyCodec {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

pub struct SpyDocument {
    inner: <LopdfCodec as DocumentCodec>::Document,
    calls: Rc<RefCell<Vec<&'static str>>>,
}

impl DocumentCodec for SpyCodec {
    type Document = SpyDocument;

    fn parse(&self, bytes: &[u8]) -> Result<SpyDocument, CodecError> {
        self.calls.borrow_mut().push("parse");
        Ok(SpyDocument {
            inner: LopdfCodec.parse(bytes)?,
            calls: Rc::clone(&self.calls),
        })
    }
}

impl ParsedDocument for SpyDocument {
    type Image = ImageRef;

    fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, CodecError> {
        self.inner.page_size(index)
    }

    fn embed_raster_image(&mut self, png: &[u8]) -> Result<ImageRef, CodecError> {
        self.calls.borrow_mut().push("embed");
        self.inner.embed_raster_image(png)
    }

    fn draw_image(
        &mut self,
        index: usize,
        image: &ImageRef,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), CodecError> {
        self.calls.borrow_mut().push("draw");
        self.inner.draw_image(index, image, x, y, width, height)
    }

    fn serialize(&mut self) -> Result<Vec<u8>, CodecError> {
        self.calls.borrow_mut().push("serialize");
        self.inner.serialize()
    }
}
