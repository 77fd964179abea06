//! Annotation objects and the tools that place them on the overlay
//!
//! Two kinds of objects exist: opaque-ish rectangles used to black out
//! content, and wrapped text labels. Both share the [`Interactive`]
//! capability so selection, dragging and resizing work the same way for
//! either kind.

use crate::surface::OverlaySurface;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Line height multiplier applied to a label's font size.
pub const LINE_HEIGHT: f32 = 1.16;

/// Average glyph advance as a fraction of the font size, used when no font
/// metrics are available.
pub const FALLBACK_ADVANCE: f32 = 0.6;

/// Identifier of an object on a surface. Unique for the surface's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned box in surface pixels (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// RGBA color. Channels are 0-255, alpha is 0.0-1.0 like CSS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Alpha scaled to a byte, clamped.
    pub fn alpha_u8(&self) -> u8 {
        (self.a.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// Parse a CSS-style color: `#rgb`, `#rrggbb`, `#rrggbbaa`,
    /// `rgb(r, g, b)`, `rgba(r, g, b, a)` or a basic named color.
    pub fn parse(input: &str) -> Option<Self> {
        let value = input.trim().to_ascii_lowercase();

        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }

        if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
        {
            let args = args.strip_suffix(')')?;
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            if parts.len() != 3 && parts.len() != 4 {
                return None;
            }
            let r = parts[0].parse::<u8>().ok()?;
            let g = parts[1].parse::<u8>().ok()?;
            let b = parts[2].parse::<u8>().ok()?;
            let a = match parts.get(3) {
                Some(alpha) => alpha.parse::<f32>().ok()?.clamp(0.0, 1.0),
                None => 1.0,
            };
            return Some(Color::rgba(r, g, b, a));
        }

        named_color(&value)
    }

    pub fn to_css(&self) -> String {
        if (self.a - 1.0).abs() < f32::EPSILON {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
            Some(Color::rgb(digits.next()??, digits.next()??, digits.next()??))
        }
        6 => Some(Color::rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        8 => Some(Color::rgba(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])? as f32 / 255.0,
        )),
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "blue" => Color::BLUE,
        "red" => Color::rgb(255, 0, 0),
        "green" => Color::rgb(0, 128, 0),
        "yellow" => Color::rgb(255, 255, 0),
        "orange" => Color::rgb(255, 165, 0),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "transparent" => Color::rgba(0, 0, 0, 0.0),
        _ => return None,
    };
    Some(color)
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value).ok_or_else(|| format!("Invalid color: {}", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_css()
    }
}

/// Shared capability of everything drawn on the overlay.
pub trait Interactive {
    fn id(&self) -> ObjectId;
    fn bounds(&self) -> Bounds;
    fn is_selectable(&self) -> bool;
    fn move_to(&mut self, x: f32, y: f32);
    /// Resize from the top-left anchor. Text labels only honor the width;
    /// their height follows the wrapped content.
    fn resize_to(&mut self, width: f32, height: f32);
}

/// Filled box, typically semi-transparent black for redaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rectangle {
    pub id: ObjectId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill: Color,
    pub selectable: bool,
}

impl Interactive for Rectangle {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn bounds(&self) -> Bounds {
        Bounds {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    fn is_selectable(&self) -> bool {
        self.selectable
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    fn resize_to(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }
}

/// Text wrapped to a fixed bounding width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLabel {
    pub id: ObjectId,
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub fill: Color,
    pub width: f32,
    /// Wrapped height as last laid out. The overlay re-measures it with the
    /// active font on every render.
    pub height: f32,
}

impl TextLabel {
    /// Lines after wrapping with the given advance measure.
    pub fn wrapped_lines<F>(&self, measure: F) -> Vec<String>
    where
        F: Fn(&str) -> f32,
    {
        wrap_text(&self.text, self.width, measure)
    }

    /// Height estimated with fallback metrics.
    pub fn estimated_height(&self) -> f32 {
        let lines = self
            .wrapped_lines(|s| fallback_text_width(s, self.font_size))
            .len()
            .max(1);
        lines as f32 * self.font_size * LINE_HEIGHT
    }
}

impl Interactive for TextLabel {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn bounds(&self) -> Bounds {
        Bounds {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    fn is_selectable(&self) -> bool {
        true
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    fn resize_to(&mut self, width: f32, _height: f32) {
        self.width = width.max(self.font_size);
        self.height = self.estimated_height();
    }
}

/// Width of `text` assuming every glyph advances by the fallback ratio.
pub fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * FALLBACK_ADVANCE
}

/// Greedy word wrap. Explicit newlines always break; a single word wider
/// than `max_width` is kept whole on its own line.
pub fn wrap_text<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", current, word);
            if measure(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }

    lines
}

/// Tagged union of everything that can live on the overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AnnotationObject {
    Rectangle(Rectangle),
    Text(TextLabel),
}

impl AnnotationObject {
    pub fn as_rectangle(&self) -> Option<&Rectangle> {
        match self {
            AnnotationObject::Rectangle(rect) => Some(rect),
            AnnotationObject::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextLabel> {
        match self {
            AnnotationObject::Text(label) => Some(label),
            AnnotationObject::Rectangle(_) => None,
        }
    }

    fn inner(&self) -> &dyn Interactive {
        match self {
            AnnotationObject::Rectangle(rect) => rect,
            AnnotationObject::Text(label) => label,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Interactive {
        match self {
            AnnotationObject::Rectangle(rect) => rect,
            AnnotationObject::Text(label) => label,
        }
    }
}

impl Interactive for AnnotationObject {
    fn id(&self) -> ObjectId {
        self.inner().id()
    }

    fn bounds(&self) -> Bounds {
        self.inner().bounds()
    }

    fn is_selectable(&self) -> bool {
        self.inner().is_selectable()
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.inner_mut().move_to(x, y)
    }

    fn resize_to(&mut self, width: f32, height: f32) {
        self.inner_mut().resize_to(width, height)
    }
}

/// Fully-specified rectangle defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangleStyle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill: Color,
    pub selectable: bool,
}

impl Default for RectangleStyle {
    fn default() -> Self {
        Self {
            x: 100.0,
            y: 100.0,
            width: 150.0,
            height: 50.0,
            fill: Color::rgba(0, 0, 0, 0.5),
            selectable: true,
        }
    }
}

/// Fully-specified text label defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub fill: Color,
    pub text: String,
    pub width: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            x: 150.0,
            y: 200.0,
            font_size: 20.0,
            fill: Color::BLUE,
            text: "Sample Text".to_string(),
            width: 200.0,
        }
    }
}

/// Caller overrides for a new rectangle; unset fields use the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RectangleOptions {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub fill: Option<Color>,
    pub selectable: Option<bool>,
}

/// Caller overrides for a new text label; unset fields use the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub font_size: Option<f32>,
    pub fill: Option<Color>,
    pub width: Option<f32>,
}

/// Append a rectangle to the surface and mark it for re-render.
pub fn add_rectangle(
    surface: &mut OverlaySurface,
    defaults: &RectangleStyle,
    opts: RectangleOptions,
) -> Rectangle {
    let id = surface.allocate_id();
    let rect = Rectangle {
        id,
        x: opts.x.unwrap_or(defaults.x),
        y: opts.y.unwrap_or(defaults.y),
        width: opts.width.unwrap_or(defaults.width),
        height: opts.height.unwrap_or(defaults.height),
        fill: opts.fill.unwrap_or(defaults.fill),
        selectable: opts.selectable.unwrap_or(defaults.selectable),
    };
    surface.push(AnnotationObject::Rectangle(rect.clone()));
    tracing::debug!(id = %id, x = rect.x, y = rect.y, "rectangle added");
    rect
}

/// Append a text label to the surface and mark it for re-render.
pub fn add_text(
    surface: &mut OverlaySurface,
    defaults: &TextStyle,
    content: Option<&str>,
    opts: TextOptions,
) -> TextLabel {
    let id = surface.allocate_id();
    let mut label = TextLabel {
        id,
        x: opts.x.unwrap_or(defaults.x),
        y: opts.y.unwrap_or(defaults.y),
        text: content.unwrap_or(&defaults.text).to_string(),
        font_size: opts.font_size.unwrap_or(defaults.font_size),
        fill: opts.fill.unwrap_or(defaults.fill),
        width: opts.width.unwrap_or(defaults.width),
        height: 0.0,
    };
    label.height = label.estimated_height();
    surface.push(AnnotationObject::Text(label.clone()));
    tracing::debug!(id = %id, x = label.x, y = label.y, "text label added");
    label
}
