//! Page renderer adapter
//!
//! The renderer itself (pdf.js in the browser) is external. This module
//! defines the contract it has to honor and keeps the page count and current
//! page it reports, validated against each other.

use crate::error::EditorError;
use crate::loader::DocumentHandle;

/// External paginated renderer.
pub trait PageRenderer {
    /// Start rendering a document. The renderer later reports the page count
    /// through [`PageNavigator::on_document_loaded`].
    fn render(&mut self, document: &DocumentHandle);

    /// Scroll the renderer to a zero-based page.
    fn jump_to_page(&mut self, index: usize);
}

/// Page state reported by the renderer.
#[derive(Debug)]
pub struct PageNavigator<R: PageRenderer> {
    renderer: R,
    page_count: usize,
    current_page: usize,
}

impl<R: PageRenderer> PageNavigator<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            page_count: 0,
            current_page: 0,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// 0 until the renderer has parsed the document.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Forget the previous document: page 0, count unknown.
    pub fn reset(&mut self) {
        self.page_count = 0;
        self.current_page = 0;
    }

    /// Reset and hand a new document to the renderer.
    pub fn open(&mut self, document: &DocumentHandle) {
        self.reset();
        self.renderer.render(document);
    }

    pub fn on_document_loaded(&mut self, page_count: usize) {
        self.page_count = page_count;
        if self.current_page >= page_count {
            self.current_page = 0;
        }
        tracing::debug!(page_count, "renderer reported page count");
    }

    /// Record a page change. Indices outside the known range are ignored.
    pub fn on_page_changed(&mut self, index: usize) -> bool {
        if index >= self.page_count {
            tracing::warn!(
                index,
                page_count = self.page_count,
                "ignoring page change outside document"
            );
            return false;
        }
        self.current_page = index;
        true
    }

    /// Ask the renderer to show a page. The current page is updated when the
    /// renderer reports the change back.
    pub fn jump_to_page(&mut self, index: usize) -> Result<(), EditorError> {
        if index >= self.page_count {
            return Err(EditorError::PageOutOfRange {
                index,
                page_count: self.page_count,
            });
        }
        self.renderer.jump_to_page(index);
        Ok(())
    }
}
