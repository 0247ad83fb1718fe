//! Document assembler: one snapshot in, a single-page PDF out.
//!
//! The page is exactly the size of the bitmap, one PDF unit per device pixel,
//! and the bitmap covers it edge to edge. The PNG encoding of the snapshot is
//! embedded as-is: its IDAT stream is already zlib data with PNG row filters,
//! which PDF reads through `FlateDecode` with a PNG predictor.

use lopdf::{Dictionary, Document, Object, Stream};

use crate::error::{Error, Result};
use crate::rendering::RenderSnapshot;

/// Fixed output name of every export
pub const EXPORT_FILE_NAME: &str = "markdown-export.pdf";
pub const PDF_MIME_TYPE: &str = "application/pdf";

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Landscape only when strictly wider than tall
    pub fn for_size(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Page size in PDF units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
}

impl PageGeometry {
    pub fn for_snapshot(snapshot: &RenderSnapshot) -> Self {
        Self {
            width: snapshot.width(),
            height: snapshot.height(),
            orientation: Orientation::for_size(snapshot.width(), snapshot.height()),
        }
    }
}

/// A finished export, ready for a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub geometry: PageGeometry,
}

/// Build the container for `snapshot`. Pure: equal snapshots give equal bytes.
pub fn assemble(snapshot: &RenderSnapshot) -> Result<Artifact> {
    let geometry = PageGeometry::for_snapshot(snapshot);
    let png = snapshot.encode_png()?;
    let image_data = idat_stream(&png)?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let catalog_id = doc.new_object_id();
    let page_id = doc.new_object_id();
    let content_id = doc.new_object_id();
    let image_id = doc.new_object_id();

    let mut decode_parms = Dictionary::new();
    decode_parms.set("Predictor", Object::Integer(15));
    decode_parms.set("Colors", Object::Integer(3));
    decode_parms.set("BitsPerComponent", Object::Integer(8));
    decode_parms.set("Columns", Object::Integer(geometry.width as i64));

    let mut image_dict = Dictionary::new();
    image_dict.set("Type", Object::Name(b"XObject".to_vec()));
    image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
    image_dict.set("Width", Object::Integer(geometry.width as i64));
    image_dict.set("Height", Object::Integer(geometry.height as i64));
    image_dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    image_dict.set("BitsPerComponent", Object::Integer(8));
    image_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    image_dict.set("DecodeParms", Object::Dictionary(decode_parms));
    doc.objects.insert(
        image_id,
        Object::Stream(Stream::new(image_dict, image_data).with_compression(false)),
    );

    let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", geometry.width, geometry.height);
    doc.objects.insert(
        content_id,
        Object::Stream(Stream::new(Dictionary::new(), content.into_bytes()).with_compression(false)),
    );

    let mut xobjects = Dictionary::new();
    xobjects.set("Im0", Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(pages_id));
    page_dict.set("Contents", Object::Reference(content_id));
    page_dict.set("Resources", Object::Dictionary(resources));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(geometry.width as i64),
            Object::Integer(geometry.height as i64),
        ]),
    );
    doc.objects.insert(page_id, Object::Dictionary(page_dict));

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(1));
    pages_dict.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    doc.objects.insert(catalog_id, Object::Dictionary(catalog_dict));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| Error::Assembly(format!("failed to write PDF: {}", e)))?;

    log::debug!(
        "assembled {:?} page {}x{} ({} bytes)",
        geometry.orientation,
        geometry.width,
        geometry.height,
        bytes.len()
    );
    Ok(Artifact {
        file_name: EXPORT_FILE_NAME.to_string(),
        mime_type: PDF_MIME_TYPE,
        bytes,
        geometry,
    })
}

/// Concatenated IDAT payload of an 8-bit RGB PNG
fn idat_stream(png: &[u8]) -> Result<Vec<u8>> {
    if png.len() < PNG_SIGNATURE.len() || &png[..8] != PNG_SIGNATURE {
        return Err(Error::Assembly("encoded image is not a PNG".into()));
    }
    let mut data = Vec::new();
    let mut pos = PNG_SIGNATURE.len();
    while pos + 12 <= png.len() {
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let kind = &png[pos + 4..pos + 8];
        let body_start = pos + 8;
        let body_end = body_start
            .checked_add(len)
            .filter(|end| end + 4 <= png.len())
            .ok_or_else(|| Error::Assembly("truncated PNG chunk".into()))?;
        let body = &png[body_start..body_end];
        match kind {
            b"IHDR" => {
                // bit depth 8, colour type 2 (truecolour), no interlace
                if body.len() < 13 || body[8] != 8 || body[9] != 2 || body[12] != 0 {
                    return Err(Error::Assembly("PNG is not 8-bit RGB".into()));
                }
            }
            b"IDAT" => data.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }
        pos = body_end + 4;
    }
    if data.is_empty() {
        return Err(Error::Assembly("PNG has no image data".into()));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media_box(bytes: &[u8]) -> Vec<i64> {
        let doc = Document::load_mem(bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        page.get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn orientation_follows_aspect() {
        assert_eq!(Orientation::for_size(1200, 800), Orientation::Landscape);
        assert_eq!(Orientation::for_size(800, 1200), Orientation::Portrait);
        assert_eq!(Orientation::for_size(500, 500), Orientation::Portrait);
    }

    #[test]
    fn page_matches_snapshot_size() {
        let snapshot = RenderSnapshot::solid(30, 20, [255, 0, 0, 255]).unwrap();
        let artifact = assemble(&snapshot).unwrap();
        assert_eq!(artifact.file_name, EXPORT_FILE_NAME);
        assert_eq!(artifact.mime_type, PDF_MIME_TYPE);
        assert!(artifact.bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(media_box(&artifact.bytes), vec![0, 0, 30, 20]);
        assert_eq!(artifact.geometry.orientation, Orientation::Landscape);
    }

    #[test]
    fn assembly_is_byte_identical() {
        let snapshot = RenderSnapshot::solid(16, 24, [10, 20, 30, 255]).unwrap();
        assert_eq!(assemble(&snapshot).unwrap().bytes, assemble(&snapshot).unwrap().bytes);
    }

    #[test]
    fn embedded_image_is_the_snapshot_drawn_full_bleed() {
        let (w, h) = (23u32, 9u32);
        let pixels: Vec<u8> = (0..w * h)
            .flat_map(|i| {
                let alpha = if i % 5 == 0 { 128 } else { 255 };
                [(i * 7 % 256) as u8, (i * 13 % 256) as u8, (i * 29 % 256) as u8, alpha]
            })
            .collect();
        let snapshot = RenderSnapshot::new(w, h, pixels).unwrap();
        let artifact = assemble(&snapshot).unwrap();

        let doc = Document::load_mem(&artifact.bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        assert_eq!(content, b"q 23 0 0 9 0 0 cm /Im0 Do Q".to_vec());

        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(xobjects.len(), 1);
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        let mut image = doc.get_object(image_id).unwrap().as_stream().unwrap().clone();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 23);
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 9);

        // lopdf leaves image streams compressed
        image.dict.remove(b"Subtype");
        assert_eq!(image.decompressed_content().unwrap(), snapshot.to_rgb());
    }

    #[test]
    fn idat_requires_png() {
        assert!(idat_stream(b"not a png at all").is_err());
        let png = RenderSnapshot::solid(2, 2, [0, 0, 0, 255]).unwrap().encode_png().unwrap();
        assert!(!idat_stream(&png).unwrap().is_empty());
    }
}
