//! Editor session
//!
//! [`EditorSession`] is the single owner of everything that lives as long as
//! the editor view: the loaded document, the page navigator, the overlay and
//! the resize binding. Hosts forward user actions and renderer events to it.

use crate::annotations::{self, Rectangle, RectangleOptions, TextLabel, TextOptions};
use crate::codec::DocumentCodec;
use crate::config::EditorConfig;
use crate::error::{EditorError, FlattenError, LoadError, ViewportError};
use crate::flatten::{flatten_and_export, FlattenRequest};
use crate::interaction::PointerTracker;
use crate::loader::{DocumentHandle, DocumentLoader, LoadTicket, SelectedFile};
use crate::pager::{PageNavigator, PageRenderer};
use crate::raster::TextRenderer;
use crate::sink::DownloadSink;
use crate::surface::{OverlayManager, OverlaySurface, Viewport};

/// Result of a save click. Failures are reported, never propagated.
#[derive(Debug)]
pub enum SaveOutcome {
    Delivered { file_name: String, bytes: usize },
    Failed(FlattenError),
}

impl SaveOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SaveOutcome::Delivered { .. })
    }

    pub fn error(&self) -> Option<&FlattenError> {
        match self {
            SaveOutcome::Failed(err) => Some(err),
            SaveOutcome::Delivered { .. } => None,
        }
    }
}

pub struct EditorSession<V: Viewport, R: PageRenderer> {
    config: EditorConfig,
    loader: DocumentLoader,
    document: Option<DocumentHandle>,
    navigator: PageNavigator<R>,
    overlay: OverlayManager<V>,
    pointer: PointerTracker,
    /// Whether window resizes are currently forwarded to the overlay
    resize_bound: bool,
}

impl<V: Viewport, R: PageRenderer> EditorSession<V, R> {
    pub fn new(config: EditorConfig, viewport: V, renderer: R) -> Self {
        Self {
            loader: DocumentLoader::new(config.accepted_media_type.clone()),
            config,
            document: None,
            navigator: PageNavigator::new(renderer),
            overlay: OverlayManager::new(viewport),
            pointer: PointerTracker::new(),
            resize_bound: false,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    pub fn navigator(&self) -> &PageNavigator<R> {
        &self.navigator
    }

    pub fn overlay(&self) -> &OverlayManager<V> {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut OverlayManager<V> {
        &mut self.overlay
    }

    pub fn surface(&self) -> Option<&OverlaySurface> {
        self.overlay.surface()
    }

    pub fn page_count(&self) -> usize {
        self.navigator.page_count()
    }

    pub fn current_page(&self) -> usize {
        self.navigator.current_page()
    }

    pub fn is_resize_bound(&self) -> bool {
        self.resize_bound
    }

    /// First half of a load: validate the selected file.
    pub fn select_file(&mut self, file: &SelectedFile) -> Result<LoadTicket, LoadError> {
        self.loader.begin(file)
    }

    /// Second half of a load: install the document, hand it to the renderer
    /// and give it a fresh overlay.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        bytes: Vec<u8>,
    ) -> Result<&DocumentHandle, LoadError> {
        let handle = self.loader.complete(ticket, bytes)?;
        tracing::info!(
            name = handle.name(),
            bytes = handle.len(),
            replacing = self.document.is_some(),
            "document loaded"
        );

        self.pointer.pointer_up();
        self.navigator.open(&handle);

        if let Err(err) = self.overlay.create() {
            tracing::error!(error = %err, "could not attach overlay surface");
        }
        self.resize_bound = self.overlay.has_surface();

        Ok(&*self.document.insert(handle))
    }

    /// Drop the document and everything attached to it. Reads still in
    /// flight are voided.
    pub fn unload(&mut self) {
        if self.document.take().is_some() {
            tracing::debug!("document unloaded");
        }
        self.release();
    }

    /// Release everything the view holds. Safe to call repeatedly; also runs
    /// on drop.
    pub fn teardown(&mut self) {
        self.document = None;
        self.release();
    }

    fn release(&mut self) {
        self.loader.invalidate();
        self.resize_bound = false;
        self.pointer.pointer_up();
        self.overlay.destroy();
        self.navigator.reset();
    }

    /// Forward a window resize. Ignored unless the binding is held.
    pub fn on_window_resize(&mut self) -> Result<(), ViewportError> {
        if !self.resize_bound {
            return Ok(());
        }
        self.overlay.resize()?;
        self.overlay.render()?;
        Ok(())
    }

    pub fn on_document_loaded(&mut self, page_count: usize) {
        self.navigator.on_document_loaded(page_count);
    }

    pub fn on_page_changed(&mut self, index: usize) -> bool {
        self.navigator.on_page_changed(index)
    }

    pub fn jump_to_page(&mut self, index: usize) -> Result<(), EditorError> {
        self.navigator.jump_to_page(index)
    }

    pub fn add_rectangle(&mut self, opts: RectangleOptions) -> Result<Rectangle, EditorError> {
        let surface = self.overlay.surface_mut().ok_or(EditorError::NoSurface)?;
        let rect = annotations::add_rectangle(surface, &self.config.rectangle, opts);
        self.rerender();
        Ok(rect)
    }

    pub fn add_text(
        &mut self,
        content: Option<&str>,
        opts: TextOptions,
    ) -> Result<TextLabel, EditorError> {
        let surface = self.overlay.surface_mut().ok_or(EditorError::NoSurface)?;
        let label = annotations::add_text(surface, &self.config.text, content, opts);
        self.rerender();
        Ok(label)
    }

    /// Swap the font used for text labels and redraw.
    pub fn set_text_renderer(&mut self, text: TextRenderer) {
        tracing::debug!(has_font = text.has_font(), "text renderer replaced");
        self.overlay.set_text_renderer(text);
        self.rerender();
    }

    /// Returns whether the press landed on an object.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        let Some(surface) = self.overlay.surface_mut() else {
            return false;
        };
        let before = surface.selection();
        let hit = self.pointer.pointer_down(surface, x, y);
        if hit != before || hit.is_some() {
            self.rerender();
        }
        hit.is_some()
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        let Some(surface) = self.overlay.surface_mut() else {
            return false;
        };
        let changed = self.pointer.pointer_move(surface, x, y);
        if changed {
            self.rerender();
        }
        changed
    }

    pub fn pointer_up(&mut self) {
        self.pointer.pointer_up();
    }

    /// Flatten the overlay into the current page and deliver the result.
    pub fn save<C, S>(&mut self, codec: &C, sink: &mut S) -> SaveOutcome
    where
        C: DocumentCodec,
        S: DownloadSink,
    {
        let request = FlattenRequest {
            document: self.document.as_ref(),
            page_index: self.navigator.current_page(),
            file_name: &self.config.export_file_name,
        };

        match flatten_and_export(request, &mut self.overlay, codec, sink) {
            Ok(artifact) => SaveOutcome::Delivered {
                file_name: artifact.file_name,
                bytes: artifact.bytes.len(),
            },
            Err(err) => {
                tracing::error!(error = %err, retryable = err.is_retryable(), "save failed");
                SaveOutcome::Failed(err)
            }
        }
    }

    fn rerender(&mut self) {
        if let Err(err) = self.overlay.render() {
            tracing::warn!(error = %err, "overlay render failed");
        }
    }
}

impl<V: Viewport, R: PageRenderer> Drop for EditorSession<V, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
