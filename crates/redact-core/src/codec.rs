//! Document codec
//!
//! The flatten pipeline only needs five things from a document library:
//! parse, page size, image embedding, drawing an image on a page, and
//! serialization. [`LopdfCodec`] provides them on top of lopdf.

use crate::error::CodecError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// Fallback when a page (and all its ancestors) lacks a usable MediaBox.
const US_LETTER: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

/// Native page size in document units (points for PDF).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Parses document bytes.
pub trait DocumentCodec {
    type Document: ParsedDocument;

    fn parse(&self, bytes: &[u8]) -> Result<Self::Document, CodecError>;
}

/// A parsed, mutable copy of a document.
pub trait ParsedDocument {
    /// Handle to an image registered with [`ParsedDocument::embed_raster_image`].
    type Image;

    fn page_count(&self) -> usize;

    /// Size of a zero-based page.
    fn page_size(&self, index: usize) -> Result<PageSize, CodecError>;

    /// Register a PNG image. Nothing is drawn yet.
    fn embed_raster_image(&mut self, png: &[u8]) -> Result<Self::Image, CodecError>;

    /// Draw an embedded image on a page, in page units with the origin at the
    /// bottom-left corner.
    fn draw_image(
        &mut self,
        index: usize,
        image: &Self::Image,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), CodecError>;

    fn serialize(&mut self) -> Result<Vec<u8>, CodecError>;
}

/// lopdf-backed codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfCodec;

impl DocumentCodec for LopdfCodec {
    type Document = LopdfDocument;

    fn parse(&self, bytes: &[u8]) -> Result<LopdfDocument, CodecError> {
        let doc = Document::load_mem(bytes).map_err(|e| CodecError::ParseError(e.to_string()))?;
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        tracing::debug!(pages = pages.len(), "parsed document");
        Ok(LopdfDocument { doc, pages })
    }
}

/// Image XObject registered in a [`LopdfDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    pub object_id: ObjectId,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

#[derive(Debug)]
pub struct LopdfDocument {
    doc: Document,
    /// Page object ids in document order
    pages: Vec<ObjectId>,
}

impl LopdfDocument {
    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn page_id(&self, index: usize) -> Result<ObjectId, CodecError> {
        self.pages
            .get(index)
            .copied()
            .ok_or(CodecError::PageOutOfRange {
                index,
                page_count: self.pages.len(),
            })
    }
}

impl ParsedDocument for LopdfDocument {
    type Image = ImageRef;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, CodecError> {
        let page_id = self.page_id(index)?;
        Ok(media_box_size(&self.doc, page_id).unwrap_or_else(|| {
            tracing::warn!(index, "page has no MediaBox, assuming US Letter");
            US_LETTER
        }))
    }

    fn embed_raster_image(&mut self, png: &[u8]) -> Result<ImageRef, CodecError> {
        let image = decode_png(png)?;

        let smask_id = if image.alpha.iter().all(|&a| a == u8::MAX) {
            None
        } else {
            let smask = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width as i64,
                    "Height" => image.height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                deflate(&image.alpha)?,
            );
            Some(self.doc.add_object(smask))
        };

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        if let Some(id) = smask_id {
            dict.set("SMask", id);
        }
        let object_id = self.doc.add_object(Stream::new(dict, deflate(&image.rgb)?));

        tracing::debug!(
            width = image.width,
            height = image.height,
            masked = smask_id.is_some(),
            "embedded raster image"
        );
        Ok(ImageRef {
            object_id,
            pixel_width: image.width,
            pixel_height: image.height,
        })
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
        let page_id = self.page_id(index)?;

        let mut resources = effective_resources(&self.doc, page_id);
        let name = {
            let xobjects = ensure_xobject_dict(&self.doc, &mut resources)?;
            let name = unique_xobject_name(xobjects);
            xobjects.set(name.as_bytes().to_vec(), image.object_id);
            name
        };
        page_dict_mut(&mut self.doc, page_id)?.set("Resources", resources);

        isolate_existing_contents(&mut self.doc, page_id)?;

        let content = format!(
            "q {} 0 0 {} {} {} cm /{} Do Q",
            width, height, x, y, name
        );
        self.doc
            .add_page_contents(page_id, content.into_bytes())
            .map_err(|e| CodecError::OperationError(e.to_string()))?;

        tracing::debug!(index, xobject = %name, "drew image on page");
        Ok(())
    }

    fn serialize(&mut self) -> Result<Vec<u8>, CodecError> {
        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| CodecError::SerializationError(e.to_string()))?;
        Ok(output)
    }
}

struct DecodedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Vec<u8>,
}

fn decode_png(bytes: &[u8]) -> Result<DecodedImage, CodecError> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| CodecError::InvalidImage(e.to_string()))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| CodecError::InvalidImage(e.to_string()))?;
    let data = &buf[..info.buffer_size()];

    if info.width == 0 || info.height == 0 {
        return Err(CodecError::InvalidImage("image has no pixels".into()));
    }

    let pixels = info.width as usize * info.height as usize;
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);

    match info.color_type {
        png::ColorType::Rgba => {
            for px in data.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
        }
        png::ColorType::Rgb => {
            rgb.extend_from_slice(data);
            alpha.resize(pixels, u8::MAX);
        }
        png::ColorType::GrayscaleAlpha => {
            for px in data.chunks_exact(2) {
                rgb.extend_from_slice(&[px[0], px[0], px[0]]);
                alpha.push(px[1]);
            }
        }
        png::ColorType::Grayscale => {
            for &g in data {
                rgb.extend_from_slice(&[g, g, g]);
            }
            alpha.resize(pixels, u8::MAX);
        }
        png::ColorType::Indexed => {
            return Err(CodecError::InvalidImage(
                "indexed image was not expanded".into(),
            ))
        }
    }

    Ok(DecodedImage {
        width: info.width,
        height: info.height,
        rgb,
        alpha,
    })
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CodecError::OperationError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::OperationError(e.to_string()))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, CodecError> {
    doc.get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| CodecError::OperationError(e.to_string()))
}

/// MediaBox of a page, walking up the page tree for inherited values.
fn media_box_size(doc: &Document, page_id: ObjectId) -> Option<PageSize> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_object(id).and_then(|o| o.as_dict()).ok()?;
        if let Some(size) = dict.get(b"MediaBox").ok().and_then(|b| rect_size(doc, b)) {
            return Some(size);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    None
}

fn rect_size(doc: &Document, obj: &Object) -> Option<PageSize> {
    let resolved = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = number(&arr[0])?;
    let lly = number(&arr[1])?;
    let urx = number(&arr[2])?;
    let ury = number(&arr[3])?;
    let size = PageSize {
        width: (urx - llx).abs(),
        height: (ury - lly).abs(),
    };
    (size.width > 0.0 && size.height > 0.0).then_some(size)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Resources that apply to a page, as an owned dictionary.
///
/// Resources may be inherited from the page tree or shared by reference with
/// other pages. The copy lets us add entries for one page without touching
/// any other page.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_object(id).and_then(|o| o.as_dict()) else {
            break;
        };
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(res)) => return res.clone(),
            Ok(Object::Reference(res_id)) => {
                if let Ok(res) = doc.get_object(*res_id).and_then(|o| o.as_dict()) {
                    return res.clone();
                }
            }
            _ => {}
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Dictionary::new()
}

/// The XObject sub-dictionary of `resources`, inlined so it can be edited.
fn ensure_xobject_dict<'a>(
    doc: &Document,
    resources: &'a mut Dictionary,
) -> Result<&'a mut Dictionary, CodecError> {
    let inlined = match resources.remove(b"XObject") {
        None => Dictionary::new(),
        Some(Object::Dictionary(dict)) => dict,
        Some(Object::Reference(id)) => doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        Some(_) => {
            return Err(CodecError::OperationError(
                "XObject resource entry is not a dictionary".into(),
            ))
        }
    };
    resources.set("XObject", Object::Dictionary(inlined));
    match resources.get_mut(b"XObject") {
        Ok(Object::Dictionary(dict)) => Ok(dict),
        _ => Err(CodecError::OperationError(
            "XObject resource entry is not a dictionary".into(),
        )),
    }
}

fn unique_xobject_name(xobjects: &Dictionary) -> String {
    (0..)
        .map(|n| format!("Overlay{}", n))
        .find(|name| !xobjects.has(name.as_bytes()))
        .unwrap_or_else(|| "Overlay".to_string())
}

/// Wrap the page's current content streams in `q ... Q` so any graphics
/// state they leave behind cannot leak into content appended afterwards.
fn isolate_existing_contents(doc: &mut Document, page_id: ObjectId) -> Result<(), CodecError> {
    let existing: Vec<Object> = {
        let page = doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| CodecError::OperationError(e.to_string()))?;
        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        }
    };
    if existing.is_empty() {
        return Ok(());
    }

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let close_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(close_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}
