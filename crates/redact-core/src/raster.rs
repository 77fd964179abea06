//! Surface rasterizer
//!
//! Paints an [`OverlaySurface`] into a transparent tiny-skia pixmap of the
//! same pixel size. Objects are painted in insertion order, so later objects
//! cover earlier ones.
//!
//! Text labels use glyph outlines from a TrueType/OpenType face when one is
//! available. Without a face, each glyph is drawn as a solid block sized by
//! character class, which keeps labels legible as redaction marks and keeps
//! output deterministic on hosts without fonts (the browser worker, CI).

use crate::annotations::{
    fallback_text_width, AnnotationObject, Color, Interactive, Rectangle, TextLabel,
    FALLBACK_ADVANCE, LINE_HEIGHT,
};
use crate::error::RasterError;
use crate::surface::OverlaySurface;
use std::sync::Arc;
#[cfg(feature = "system-fonts")]
use std::sync::OnceLock;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

/// Whether the frame is for on-screen display or for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Includes selection chrome.
    Live,
    /// Objects only.
    Export,
}

const SELECTION_COLOR: Color = Color::rgb(0, 120, 215);

/// Tried in order when the host has no face registered as generic sans-serif.
#[cfg(feature = "system-fonts")]
const SANS_SERIF_NAMES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Helvetica",
    "Arial",
];

/// Font face bytes plus the collection index.
#[derive(Clone)]
struct FontFace {
    data: Arc<Vec<u8>>,
    index: u32,
}

/// Draws text labels, with or without a real font.
#[derive(Clone, Default)]
pub struct TextRenderer {
    font: Option<FontFace>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl TextRenderer {
    /// Renderer that draws block glyphs only.
    pub fn blocks() -> Self {
        Self { font: None }
    }

    /// Renderer backed by the given font file (TTF/OTF/TTC).
    pub fn from_font_data(data: Vec<u8>, index: u32) -> Result<Self, RasterError> {
        ttf_parser::Face::parse(&data, index)
            .map_err(|e| RasterError::Font(e.to_string()))?;
        Ok(Self {
            font: Some(FontFace {
                data: Arc::new(data),
                index,
            }),
        })
    }

    /// Renderer backed by the host's sans-serif face, falling back to block
    /// glyphs when no usable font is installed. The lookup runs once per
    /// process.
    #[cfg(feature = "system-fonts")]
    pub fn system() -> Self {
        static SYSTEM: OnceLock<TextRenderer> = OnceLock::new();
        SYSTEM
            .get_or_init(|| {
                let mut db = fontdb::Database::new();
                db.load_system_fonts();
                Self::from_database(&db)
            })
            .clone()
    }

    /// Pick a face from `db`: the generic sans-serif family, then common
    /// sans-serif names, then whatever face comes first.
    #[cfg(feature = "system-fonts")]
    fn from_database(db: &fontdb::Database) -> Self {
        let mut families = vec![fontdb::Family::SansSerif];
        families.extend(SANS_SERIF_NAMES.iter().map(|&name| fontdb::Family::Name(name)));
        let query = fontdb::Query {
            families: &families,
            ..Default::default()
        };

        let face = db
            .query(&query)
            .or_else(|| db.faces().next().map(|info| info.id))
            .and_then(|id| db.with_face_data(id, |data, index| (data.to_vec(), index)));

        match face {
            Some((data, index)) => Self::from_font_data(data, index).unwrap_or_else(|e| {
                tracing::warn!("system font unusable, using block glyphs: {}", e);
                Self::blocks()
            }),
            None => {
                tracing::warn!(faces = db.len(), "no system font found, using block glyphs");
                Self::blocks()
            }
        }
    }

    /// Best renderer this build can offer: system fonts when the
    /// `system-fonts` feature is on, block glyphs otherwise.
    pub fn preferred() -> Self {
        #[cfg(feature = "system-fonts")]
        {
            Self::system()
        }
        #[cfg(not(feature = "system-fonts"))]
        {
            Self::blocks()
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        self.font
            .as_ref()
            .and_then(|font| ttf_parser::Face::parse(&font.data, font.index).ok())
    }

    /// Advance width of `text` at `font_size` pixels.
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        match self.face() {
            Some(face) => outline_text_width(&face, text, font_size),
            None => fallback_text_width(text, font_size),
        }
    }

    /// Height of `label` once wrapped the way it will be painted.
    pub fn label_height(&self, label: &TextLabel) -> f32 {
        let size = label.font_size;
        let lines = match self.face() {
            Some(face) => label.wrapped_lines(|s| outline_text_width(&face, s, size)),
            None => label.wrapped_lines(|s| fallback_text_width(s, size)),
        };
        lines.len().max(1) as f32 * size * LINE_HEIGHT
    }

    fn paint_label(&self, pixmap: &mut Pixmap, label: &TextLabel) {
        let face = self.face();
        let size = label.font_size;
        let line_height = size * LINE_HEIGHT;

        let lines = match &face {
            Some(face) => label.wrapped_lines(|s| outline_text_width(face, s, size)),
            None => label.wrapped_lines(|s| fallback_text_width(s, size)),
        };

        let mut builder = PathBuilder::new();
        for (i, line) in lines.iter().enumerate() {
            let top = label.y + i as f32 * line_height;
            match &face {
                Some(face) => push_outline_line(&mut builder, face, line, label.x, top, size),
                None => push_block_line(&mut builder, line, label.x, top, size),
            }
        }

        if let Some(path) = builder.finish() {
            pixmap.fill_path(
                &path,
                &fill_paint(label.fill),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }
}

/// Paint the surface. The pixmap has exactly the surface's pixel size.
pub fn rasterize(
    surface: &OverlaySurface,
    text: &TextRenderer,
    mode: RenderMode,
) -> Result<Pixmap, RasterError> {
    let mut pixmap =
        Pixmap::new(surface.width(), surface.height()).ok_or(RasterError::EmptySurface {
            width: surface.width(),
            height: surface.height(),
        })?;

    for object in surface.objects() {
        match object {
            AnnotationObject::Rectangle(rect) => paint_rectangle(&mut pixmap, rect),
            AnnotationObject::Text(label) => text.paint_label(&mut pixmap, label),
        }
    }

    if mode == RenderMode::Live {
        if let Some(selected) = surface.selection().and_then(|id| surface.object(id)) {
            paint_selection(&mut pixmap, selected);
        }
    }

    Ok(pixmap)
}

/// Lossless PNG of the pixmap (straight alpha).
pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, RasterError> {
    pixmap
        .encode_png()
        .map_err(|e| RasterError::Encode(e.to_string()))
}

fn fill_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(tiny_skia::Color::from_rgba8(
        color.r,
        color.g,
        color.b,
        color.alpha_u8(),
    ));
    paint.anti_alias = true;
    paint
}

fn paint_rectangle(pixmap: &mut Pixmap, rect: &Rectangle) {
    // Degenerate or non-finite boxes are skipped, not errors.
    if let Some(area) = Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) {
        pixmap.fill_rect(area, &fill_paint(rect.fill), Transform::identity(), None);
    }
}

fn paint_selection(pixmap: &mut Pixmap, object: &AnnotationObject) {
    let bounds = object.bounds();
    let Some(area) = Rect::from_xywh(bounds.x, bounds.y, bounds.width, bounds.height) else {
        return;
    };
    let path = PathBuilder::from_rect(area);
    let stroke = Stroke {
        width: 1.0,
        ..Stroke::default()
    };
    pixmap.stroke_path(
        &path,
        &fill_paint(SELECTION_COLOR),
        &stroke,
        Transform::identity(),
        None,
    );

    // Resize handle in the bottom-right corner.
    let handle = crate::interaction::HANDLE_SIZE;
    if let Some(knob) = Rect::from_xywh(
        bounds.right() - handle / 2.0,
        bounds.bottom() - handle / 2.0,
        handle,
        handle,
    ) {
        pixmap.fill_rect(knob, &fill_paint(SELECTION_COLOR), Transform::identity(), None);
    }
}

fn outline_text_width(face: &ttf_parser::Face<'_>, text: &str, font_size: f32) -> f32 {
    let scale = font_size / face.units_per_em() as f32;
    text.chars()
        .map(|ch| glyph_advance(face, ch).map_or(font_size * FALLBACK_ADVANCE, |adv| adv * scale))
        .sum()
}

fn glyph_advance(face: &ttf_parser::Face<'_>, ch: char) -> Option<f32> {
    let glyph = face.glyph_index(ch)?;
    face.glyph_hor_advance(glyph).map(f32::from)
}

/// Converts font-unit outlines to pixmap space (y down) at a pen position.
struct GlyphPath<'a> {
    builder: &'a mut PathBuilder,
    scale: f32,
    origin_x: f32,
    baseline: f32,
}

impl GlyphPath<'_> {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl ttf_parser::OutlineBuilder for GlyphPath<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn push_outline_line(
    builder: &mut PathBuilder,
    face: &ttf_parser::Face<'_>,
    line: &str,
    x: f32,
    top: f32,
    font_size: f32,
) {
    let scale = font_size / face.units_per_em() as f32;
    let baseline = top + face.ascender() as f32 * scale;
    let mut pen = x;

    for ch in line.chars() {
        let Some(glyph) = face.glyph_index(ch) else {
            pen += font_size * FALLBACK_ADVANCE;
            continue;
        };
        let mut sink = GlyphPath {
            builder: &mut *builder,
            scale,
            origin_x: pen,
            baseline,
        };
        face.outline_glyph(glyph, &mut sink);
        pen += face
            .glyph_hor_advance(glyph)
            .map_or(font_size * FALLBACK_ADVANCE, |adv| adv as f32 * scale);
    }
}

fn push_block_line(builder: &mut PathBuilder, line: &str, x: f32, top: f32, font_size: f32) {
    let advance = font_size * FALLBACK_ADVANCE;
    let glyph_width = advance * 0.8;
    let baseline = top + font_size * 0.9;

    for (i, ch) in line.chars().enumerate() {
        let height = if ch.is_whitespace() || ch.is_control() {
            continue;
        } else if ch.is_uppercase() || ch.is_ascii_digit() {
            font_size * 0.7
        } else if ch.is_lowercase() {
            font_size * 0.5
        } else {
            font_size * 0.6
        };
        let left = x + i as f32 * advance;
        if let Some(rect) = Rect::from_xywh(left, baseline - height, glyph_width, height) {
            builder.push_rect(rect);
        }
    }
}
