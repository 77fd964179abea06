//! Cheap PDF sanity checks
//!
//! Run before handing bytes to the editor so obviously broken files are
//! reported up front instead of failing at save time.

/// Smallest file that can hold a `%PDF-x.y` header.
const MIN_PDF_LEN: usize = 8;

/// How far from the end `%%EOF` is searched for.
const EOF_SEARCH_WINDOW: usize = 1024;

/// Header and trailer check without parsing the object graph.
pub fn quick_validate(bytes: &[u8]) -> Result<(), String> {
    if bytes.len() < MIN_PDF_LEN {
        return Err("File too small to be a valid PDF".to_string());
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err("Not a valid PDF file (missing %PDF- header)".to_string());
    }

    let tail = &bytes[bytes.len().saturating_sub(EOF_SEARCH_WINDOW)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err("PDF appears truncated (missing %%EOF marker)".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};

    fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for i in 0..num_pages {
            let content = format!("BT /F1 12 Tf 100 700 Td (Page {}) Tj ET", i + 1);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
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

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_quick_validate_rejects_non_pdf() {
        assert!(quick_validate(b"not a pdf file").is_err());
    }

    #[test]
    fn test_quick_validate_rejects_small_file() {
        assert!(quick_validate(b"tiny").is_err());
    }

    #[test]
    fn test_quick_validate_rejects_truncated_file() {
        let pdf = create_test_pdf(2);
        let truncated = &pdf[..pdf.len() / 2];
        let err = quick_validate(truncated).unwrap_err();
        assert!(err.contains("truncated"));
    }

    #[test]
    fn test_quick_validate_accepts_valid_pdf() {
        assert!(quick_validate(&create_test_pdf(1)).is_ok());
        assert!(quick_validate(&create_test_pdf(4)).is_ok());
    }
}
