//! Replacement-document assembly: one full-page image per PDF page.
//!
//! Each normalised image becomes an 8-bit DeviceRGB image XObject drawn
//! across the whole page. The page is sized so the image keeps the physical
//! dimensions it was rendered at (`pixels * 72 / dpi` points), which means a
//! replaced page has the same size as the page it replaces.

use crate::error::PdfInvertError;
use crate::pipeline::normalize::NormalizedImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::{debug, info};

const IMAGE_NAME: &str = "Im0";

/// Build the replacement document in memory, pages in input order.
pub fn build_document(images: &[NormalizedImage], dpi: u32) -> Result<Document, PdfInvertError> {
    if images.is_empty() {
        return Err(PdfInvertError::EmptySelection);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(images.len());
    for normalized in images {
        let page_id = add_image_page(&mut doc, pages_id, normalized, dpi)?;
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    normalized: &NormalizedImage,
    dpi: u32,
) -> Result<ObjectId, PdfInvertError> {
    let (px_w, px_h) = normalized.image.dimensions();
    let width = points(px_w, dpi);
    let height = points(px_h, dpi);

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => px_w as i64,
            "Height" => px_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        },
        normalized.image.as_raw().clone(),
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_NAME => image_id,
            },
        },
    });

    debug!(
        "Assembled page for source page {}: {}x{} px → {:.1}x{:.1} pt",
        normalized.page, px_w, px_h, width, height
    );
    Ok(page_id)
}

/// Pixel length at `dpi` expressed in PDF points.
fn points(pixels: u32, dpi: u32) -> f32 {
    pixels as f32 * 72.0 / dpi as f32
}

/// Build the replacement document and write it to `dest`.
///
/// Returns the number of pages written.
pub fn assemble(images: &[NormalizedImage], dpi: u32, dest: &Path) -> Result<usize, PdfInvertError> {
    let mut doc = build_document(images, dpi)?;
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfInvertError::io("Failed to serialise replacement PDF", e))?;
    std::fs::write(dest, &buffer).map_err(|e| PdfInvertError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    info!(
        "Replacement PDF: {} pages, {} bytes → {}",
        images.len(),
        buffer.len(),
        dest.display()
    );
    Ok(images.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn page(page: u32, w: u32, h: u32) -> NormalizedImage {
        NormalizedImage {
            page,
            image: RgbImage::from_pixel(w, h, Rgb([255, 255, 255])),
            inverted: true,
        }
    }

    fn media_box(doc: &Document, page_id: ObjectId) -> Vec<f32> {
        doc.get_object(page_id)
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect()
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = build_document(&[], 300).unwrap_err();
        assert!(matches!(err, PdfInvertError::EmptySelection));
    }

    #[test]
    fn one_page_per_image_in_order() {
        let images = vec![page(10, 30, 40), page(11, 60, 40), page(12, 30, 90)];
        let doc = build_document(&images, 300).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);

        let widths: Vec<f32> = pages.values().map(|&id| media_box(&doc, id)[2]).collect();
        assert_eq!(widths, vec![7.2, 14.4, 7.2]);
    }

    #[test]
    fn page_keeps_physical_size() {
        // US Letter at 300 DPI
        let doc = build_document(&[page(1, 2550, 3300)], 300).unwrap();
        let id = *doc.get_pages().get(&1).unwrap();
        assert_eq!(media_box(&doc, id), vec![0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn image_xobject_is_rgb() {
        let doc = build_document(&[page(1, 4, 2)], 72).unwrap();
        let image = doc
            .objects
            .values()
            .find_map(|o| match o {
                Object::Stream(s)
                    if s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice()) =>
                {
                    Some(s)
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(image.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert_eq!(image.dict.get(b"BitsPerComponent").unwrap().as_i64().unwrap(), 8);
        assert_eq!(image.content.len(), 4 * 2 * 3);
    }

    #[test]
    fn assemble_writes_loadable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("inverted.pdf");
        let n = assemble(&[page(1, 20, 20), page(2, 20, 20)], 150, &dest).unwrap();
        assert_eq!(n, 2);

        let doc = Document::load(&dest).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
