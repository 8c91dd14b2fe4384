//! Scan renderer
//!
//! Pure Rust backend built on lopdf. It interprets the graphics-state
//! operators of a page's content stream and paints every image XObject into
//! the device raster. Scanned bills are one page-sized image per page, which
//! this covers completely; vector and text content is not painted.

use crate::error::RoiError;
use crate::geometry::{BBox, PageRect, RenderScale};
use crate::renderer::{PageRenderer, RenderDocument};
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

/// US Letter, used when a page tree declares no MediaBox at all
const FALLBACK_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];
/// Maximum nesting of form XObjects (guards against reference cycles)
const MAX_FORM_DEPTH: usize = 8;
/// Maximum Parent hops when resolving inherited page attributes
const MAX_TREE_DEPTH: usize = 64;

pub struct ScanRenderer;

impl PageRenderer for ScanRenderer {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn description(&self) -> &'static str {
        "Pure Rust image-XObject rasterizer for scanned pages - no system dependencies"
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RenderDocument + 'a>, RoiError> {
        let doc = Document::load(path).map_err(|e| {
            RoiError::RenderFailure(format!("Failed to load PDF {}: {}", path.display(), e))
        })?;
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        tracing::debug!("Opened {} ({} pages) with scan renderer", path.display(), pages.len());

        Ok(Box::new(ScanDocument { doc, pages }))
    }
}

pub struct ScanDocument {
    doc: Document,
    pages: Vec<ObjectId>,
}

/// 2-D affine transform `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_objects(values: &[Object]) -> Option<Self> {
        let v: Vec<f64> = values.iter().filter_map(number).collect();
        match v.as_slice() {
            [a, b, c, d, e, f] if values.len() == 6 => Some(Self {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    /// Apply `self` first, then `next`
    fn then(&self, next: &Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    fn invert(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-12 {
            return None;
        }
        Some(Matrix {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// An image XObject and the CTM it was painted with (unit square -> page)
struct Placement {
    matrix: Matrix,
    image: RgbImage,
}

#[derive(Debug, Default)]
struct PaintStats {
    images: usize,
    skipped_images: usize,
    text_objects: usize,
    path_fills: usize,
}

impl ScanDocument {
    fn page_id(&self, index: usize) -> Result<ObjectId, RoiError> {
        self.pages
            .get(index)
            .copied()
            .ok_or(RoiError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
    }

    /// Look up a page attribute, following the Parent chain for inherited keys
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.doc.get_dictionary(page_id).ok();
        let mut hops = 0;
        while let Some(dict) = current {
            if let Ok(obj) = dict.get(key) {
                return Some(self.resolve(obj));
            }
            hops += 1;
            if hops > MAX_TREE_DEPTH {
                break;
            }
            current = dict
                .get(b"Parent")
                .and_then(Object::as_reference)
                .ok()
                .and_then(|id| self.doc.get_dictionary(id).ok());
        }
        None
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    fn collect_placements<'a>(
        &'a self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        base: Matrix,
        depth: usize,
        placements: &mut Vec<Placement>,
        stats: &mut PaintStats,
    ) -> Result<(), RoiError> {
        let mut ctm = base;
        let mut saved = Vec::new();

        for op in operations {
            match op.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => {
                    if let Some(m) = saved.pop() {
                        ctm = m;
                    }
                }
                "cm" => match Matrix::from_objects(&op.operands) {
                    Some(m) => ctm = m.then(&ctm),
                    None => tracing::warn!("Ignoring malformed cm operands: {:?}", op.operands),
                },
                "Do" => {
                    let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                        continue;
                    };
                    let Some(stream) = self.xobject(resources, name) else {
                        tracing::warn!("XObject /{} not found", String::from_utf8_lossy(name));
                        continue;
                    };
                    let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
                    match subtype {
                        Some(b"Image") => match decode_image(self, stream) {
                            Ok(image) => {
                                stats.images += 1;
                                placements.push(Placement { matrix: ctm, image });
                            }
                            Err(e) => {
                                stats.skipped_images += 1;
                                tracing::warn!(
                                    "Skipping image /{}: {}",
                                    String::from_utf8_lossy(name),
                                    e
                                );
                            }
                        },
                        Some(b"Form") => {
                            if depth >= MAX_FORM_DEPTH {
                                tracing::warn!("Form XObject nesting too deep, skipping");
                                continue;
                            }
                            let form_matrix = stream
                                .dict
                                .get(b"Matrix")
                                .ok()
                                .map(|o| self.resolve(o))
                                .and_then(|o| o.as_array().ok())
                                .and_then(|a| Matrix::from_objects(a))
                                .unwrap_or(Matrix::IDENTITY);
                            let form_resources = stream
                                .dict
                                .get(b"Resources")
                                .ok()
                                .map(|o| self.resolve(o))
                                .and_then(|o| o.as_dict().ok())
                                .or(resources);
                            let data = stream_data(stream)?;
                            let content = Content::decode(&data).map_err(|e| {
                                RoiError::RenderFailure(format!(
                                    "Failed to parse form content: {}",
                                    e
                                ))
                            })?;
                            self.collect_placements(
                                &content.operations,
                                form_resources,
                                form_matrix.then(&ctm),
                                depth + 1,
                                placements,
                                stats,
                            )?;
                        }
                        _ => {}
                    }
                }
                "BT" => stats.text_objects += 1,
                "BI" => stats.skipped_images += 1,
                "f" | "F" | "f*" | "S" | "s" | "B" | "B*" | "b" | "b*" => stats.path_fills += 1,
                _ => {}
            }
        }

        Ok(())
    }

    fn xobject<'a>(&'a self, resources: Option<&'a Dictionary>, name: &[u8]) -> Option<&'a Stream> {
        let xobjects = resources?.get(b"XObject").ok().map(|o| self.resolve(o))?;
        let entry = xobjects.as_dict().ok()?.get(name).ok()?;
        self.resolve(entry).as_stream().ok()
    }
}

impl RenderDocument for ScanDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn media_box(&self, index: usize) -> Result<PageRect, RoiError> {
        let page_id = self.page_id(index)?;
        let values: Option<Vec<f64>> = self
            .inherited(page_id, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .and_then(|a| a.iter().map(|v| number(self.resolve(v))).collect());

        let [x0, y0, x1, y1] = match values.as_deref() {
            Some([x0, y0, x1, y1]) => [*x0, *y0, *x1, *y1],
            _ => {
                tracing::warn!("Page {} has no usable MediaBox, assuming US Letter", index);
                FALLBACK_MEDIA_BOX
            }
        };
        Ok(PageRect::new(x0, y0, x1, y1))
    }

    fn rotation(&self, index: usize) -> Result<i64, RoiError> {
        let page_id = self.page_id(index)?;
        Ok(self
            .inherited(page_id, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0))
    }

    fn rasterize(
        &self,
        index: usize,
        bbox: &BBox,
        width: u32,
        height: u32,
        scale: RenderScale,
    ) -> Result<DynamicImage, RoiError> {
        let page_id = self.page_id(index)?;
        let data = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| RoiError::RenderFailure(format!("Failed to read page content: {}", e)))?;
        let content = Content::decode(&data)
            .map_err(|e| RoiError::RenderFailure(format!("Failed to parse page content: {}", e)))?;
        let resources = self
            .inherited(page_id, b"Resources")
            .and_then(|o| o.as_dict().ok());

        let mut placements = Vec::new();
        let mut stats = PaintStats::default();
        self.collect_placements(
            &content.operations,
            resources,
            Matrix::IDENTITY,
            0,
            &mut placements,
            &mut stats,
        )?;

        tracing::debug!("Page {} paint summary: {:?}", index, stats);
        if stats.text_objects > 0 || stats.path_fills > 0 {
            tracing::warn!(
                "Page {} has {} text objects and {} path paints that the scan renderer does not draw",
                index,
                stats.text_objects,
                stats.path_fills
            );
        }
        if placements.is_empty() && stats.skipped_images > 0 {
            return Err(RoiError::RenderFailure(format!(
                "Page {} has no decodable images ({} skipped)",
                index, stats.skipped_images
            )));
        }

        let mut raster = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for placement in &placements {
            paint(&mut raster, placement, bbox, scale);
        }

        Ok(DynamicImage::ImageRgb8(raster))
    }
}

/// Resample one placed image into the raster covering `bbox`
fn paint(raster: &mut RgbImage, placement: &Placement, bbox: &BBox, scale: RenderScale) {
    let Some(inverse) = placement.matrix.invert() else {
        return;
    };
    let f = scale.factor();
    let (width, height) = raster.dimensions();

    // Device-space bounds of the placed unit square
    let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].map(|(u, v)| {
        let (px, py) = placement.matrix.apply(u, v);
        ((px - bbox.x0) * f, (bbox.y1 - py) * f)
    });
    let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);

    let x_start = min_x.floor().max(0.0) as u32;
    let x_end = (max_x.ceil().max(0.0) as u32).min(width);
    let y_start = min_y.floor().max(0.0) as u32;
    let y_end = (max_y.ceil().max(0.0) as u32).min(height);

    let (iw, ih) = placement.image.dimensions();
    for y in y_start..y_end {
        let py = bbox.y1 - (y as f64 + 0.5) / f;
        for x in x_start..x_end {
            let px = bbox.x0 + (x as f64 + 0.5) / f;
            let (u, v) = inverse.apply(px, py);
            if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                continue;
            }
            // Image row 0 is the top of the unit square
            let sx = u * iw as f64 - 0.5;
            let sy = (1.0 - v) * ih as f64 - 0.5;
            raster.put_pixel(x, y, sample_bilinear(&placement.image, sx, sy));
        }
    }
}

fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = image.dimensions();
    let x = x.clamp(0.0, (w - 1) as f64);
    let y = y.clamp(0.0, (h - 1) as f64);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = image.get_pixel(x0, y0).0;
    let p10 = image.get_pixel(x1, y0).0;
    let p01 = image.get_pixel(x0, y1).0;
    let p11 = image.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn filter_names(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Stream bytes with every filter removed
fn stream_data(stream: &Stream) -> Result<Vec<u8>, RoiError> {
    if filter_names(stream).is_empty() {
        return Ok(stream.content.clone());
    }
    stream
        .decompressed_content()
        .map_err(|e| RoiError::RenderFailure(format!("Failed to decompress stream: {}", e)))
}

/// Number of color components of an image XObject
fn color_components(doc: &ScanDocument, stream: &Stream) -> Result<u32, RoiError> {
    let Ok(cs) = stream.dict.get(b"ColorSpace") else {
        return Ok(3);
    };
    let cs = doc.resolve(cs);

    let (family, params) = match cs {
        Object::Name(name) => (name.as_slice(), None),
        Object::Array(items) => match items.first().and_then(|o| o.as_name().ok()) {
            Some(name) => (name, items.get(1)),
            None => return Err(RoiError::RenderFailure("Empty color space array".to_string())),
        },
        other => {
            return Err(RoiError::RenderFailure(format!(
                "Unsupported color space object: {:?}",
                other
            )))
        }
    };

    match family {
        b"DeviceGray" | b"CalGray" => Ok(1),
        b"DeviceRGB" | b"CalRGB" => Ok(3),
        b"DeviceCMYK" => Ok(4),
        b"ICCBased" => Ok(params
            .map(|p| doc.resolve(p))
            .and_then(|p| p.as_stream().ok())
            .and_then(|s| s.dict.get(b"N").ok())
            .and_then(number)
            .map(|n| n as u32)
            .unwrap_or(3)),
        other => Err(RoiError::RenderFailure(format!(
            "Unsupported color space: {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn dict_u32(stream: &Stream, key: &[u8]) -> Option<u32> {
    stream
        .dict
        .get(key)
        .ok()
        .and_then(number)
        .filter(|v| *v > 0.0)
        .map(|v| v as u32)
}

/// Decode an image XObject to RGB
fn decode_image(doc: &ScanDocument, stream: &Stream) -> Result<RgbImage, RoiError> {
    if stream
        .dict
        .get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false)
    {
        return Err(RoiError::RenderFailure("Stencil masks are not supported".to_string()));
    }

    let filters = filter_names(stream);
    if filters.last().map(|f| f.as_slice()) == Some(&b"DCTDecode"[..]) {
        if filters.len() > 1 {
            return Err(RoiError::RenderFailure(
                "Chained filters before DCTDecode are not supported".to_string(),
            ));
        }
        let img = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|e| RoiError::RenderFailure(format!("Failed to decode JPEG: {}", e)))?;
        return Ok(img.into_rgb8());
    }
    if let Some(unsupported) = filters
        .iter()
        .find(|f| matches!(f.as_slice(), b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode"))
    {
        return Err(RoiError::RenderFailure(format!(
            "Unsupported image filter: {}",
            String::from_utf8_lossy(unsupported)
        )));
    }

    let width = dict_u32(stream, b"Width")
        .ok_or_else(|| RoiError::RenderFailure("Missing image width".to_string()))?;
    let height = dict_u32(stream, b"Height")
        .ok_or_else(|| RoiError::RenderFailure("Missing image height".to_string()))?;
    let bits = dict_u32(stream, b"BitsPerComponent").unwrap_or(8);
    let components = color_components(doc, stream)?;
    let data = stream_data(stream)?;

    tracing::debug!(
        "PDF image: {}x{}, {} bits, {} components, data_len={}",
        width,
        height,
        bits,
        components,
        data.len()
    );

    let (w, h) = (width as usize, height as usize);
    let expected = w * h * components as usize;

    match (components, bits) {
        (1, 8) if data.len() >= w * h => {
            let gray = GrayImage::from_raw(width, height, data[..w * h].to_vec())
                .ok_or_else(|| RoiError::RenderFailure("Invalid grayscale image data".to_string()))?;
            Ok(DynamicImage::ImageLuma8(gray).into_rgb8())
        }
        (1, 1) => {
            let row_bytes = w.div_ceil(8);
            if data.len() < row_bytes * h {
                return Err(RoiError::RenderFailure("Truncated 1-bit image data".to_string()));
            }
            let inverted = decode_inverted(stream);
            Ok(RgbImage::from_fn(width, height, |x, y| {
                let byte = data[y as usize * row_bytes + x as usize / 8];
                let bit = (byte >> (7 - (x % 8))) & 1 == 1;
                if bit != inverted {
                    Rgb([255, 255, 255])
                } else {
                    Rgb([0, 0, 0])
                }
            }))
        }
        (3, 8) if data.len() >= expected => RgbImage::from_raw(width, height, data[..expected].to_vec())
            .ok_or_else(|| RoiError::RenderFailure("Invalid RGB image data".to_string())),
        (4, 8) if data.len() >= expected => {
            let rgb: Vec<u8> = data[..expected]
                .chunks_exact(4)
                .flat_map(|px| {
                    let k = 1.0 - px[3] as f32 / 255.0;
                    [0, 1, 2].map(|i| ((1.0 - px[i] as f32 / 255.0) * k * 255.0).round() as u8)
                })
                .collect();
            RgbImage::from_raw(width, height, rgb)
                .ok_or_else(|| RoiError::RenderFailure("Invalid CMYK->RGB conversion".to_string()))
        }
        _ => Err(RoiError::RenderFailure(format!(
            "Unsupported image format: {} components, {} bits, data_len={}, expected={}",
            components,
            bits,
            data.len(),
            expected
        ))),
    }
}

/// True when /Decode is [1 0], i.e. set bits are dark
fn decode_inverted(stream: &Stream) -> bool {
    stream
        .dict
        .get(b"Decode")
        .and_then(Object::as_array)
        .ok()
        .and_then(|a| a.first())
        .and_then(number)
        .map(|v| v >= 1.0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CoordinateSpace;
    use crate::renderer::{render_page, render_region};
    use lopdf::dictionary;

    /// Build a one-page PDF whose content paints `image` over `placement`
    /// (x, y, w, h in points) on a `page_w` x `page_h` MediaBox.
    fn scanned_pdf(
        image: &GrayImage,
        page_w: i64,
        page_h: i64,
        placement: (f32, f32, f32, f32),
        rotate: i64,
    ) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            image.as_raw().clone(),
        );
        image_stream.compress().unwrap();
        let image_id = doc.add_object(image_stream);

        let (x, y, w, h) = placement;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()],
                ),
                Operation::new("Do", vec![Object::Name(b"Scan".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Rotate" => rotate,
            "Resources" => dictionary! { "XObject" => dictionary! { "Scan" => image_id } },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn open(doc: Document) -> ScanDocument {
        let pages = doc.get_pages().into_values().collect();
        ScanDocument { doc, pages }
    }

    /// Gray page whose top half is black
    fn top_dark(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |_, y| if y < h / 2 { image::Luma([0]) } else { image::Luma([255]) })
    }

    #[test]
    fn test_matrix_inverse_roundtrip() {
        let m = Matrix {
            a: 2.0,
            b: 0.5,
            c: -0.25,
            d: 3.0,
            e: 10.0,
            f: -4.0,
        };
        let inv = m.invert().unwrap();
        let (x, y) = m.apply(1.5, -2.0);
        let (u, v) = inv.apply(x, y);
        assert!((u - 1.5).abs() < 1e-9);
        assert!((v + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_matrix_concatenation_order() {
        let scale = Matrix { a: 2.0, d: 2.0, ..Matrix::IDENTITY };
        let shift = Matrix { e: 5.0, f: 7.0, ..Matrix::IDENTITY };
        // scale first, then translate
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (7.0, 9.0));
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (12.0, 16.0));
    }

    #[test]
    fn test_inherited_media_box_and_rotation() {
        let doc = open(scanned_pdf(&top_dark(10, 10), 300, 400, (0.0, 0.0, 300.0, 400.0), 90));
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.media_box(0).unwrap(), PageRect::new(0.0, 0.0, 300.0, 400.0));
        assert_eq!(doc.rotation(0).unwrap(), 90);
    }

    #[test]
    fn test_full_page_render_keeps_orientation() {
        let doc = open(scanned_pdf(&top_dark(100, 100), 200, 200, (0.0, 0.0, 200.0, 200.0), 0));
        let (img, _) = render_page(&doc, 0, RenderScale::new(72).unwrap()).unwrap();
        assert_eq!(img.dimensions(), (200, 200));
        assert_eq!(img.get_pixel(100, 10).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(100, 190).0, [255, 255, 255]);
    }

    #[test]
    fn test_region_outside_image_is_white() {
        // image covers only the left half of the page
        let doc = open(scanned_pdf(&top_dark(50, 100), 200, 200, (0.0, 0.0, 100.0, 200.0), 0));
        let bbox = BBox::bottom_left(120.0, 150.0, 180.0, 190.0).unwrap();
        let img = render_region(&doc, 0, &bbox, RenderScale::new(144).unwrap()).unwrap();
        assert_eq!(img.dimensions(), (120, 80));
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_region_bottom_left_maps_to_upper_part_of_page() {
        let doc = open(scanned_pdf(&top_dark(100, 100), 200, 200, (0.0, 0.0, 200.0, 200.0), 0));
        let scale = RenderScale::new(300).unwrap();
        // bottom-left y in [120, 180] is the dark top half
        let upper = BBox::bottom_left(20.0, 120.0, 80.0, 180.0).unwrap();
        let img = render_region(&doc, 0, &upper, scale).unwrap();
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));

        // the same numbers read as top-left select the light bottom half
        let tl = BBox::new(20.0, 120.0, 80.0, 180.0, CoordinateSpace::TopLeft).unwrap();
        let img = render_region(&doc, 0, &tl, scale).unwrap();
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_unpaintable_page_fails() {
        let mut doc = scanned_pdf(&top_dark(10, 10), 100, 100, (0.0, 0.0, 100.0, 100.0), 0);
        // corrupt the image dictionary so it cannot be decoded
        for (_, obj) in doc.objects.iter_mut() {
            if let Object::Stream(stream) = obj {
                if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Image"[..]) {
                    stream.dict.set("ColorSpace", "Separation");
                }
            }
        }
        let doc = open(doc);
        let err = render_page(&doc, 0, RenderScale::new(72).unwrap()).unwrap_err();
        assert!(matches!(err, RoiError::RenderFailure(_)));
    }

    #[test]
    fn test_decode_one_bit_image() {
        let doc = open(scanned_pdf(&top_dark(8, 8), 8, 8, (0.0, 0.0, 8.0, 8.0), 0));
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 8,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 1,
            },
            vec![0b1111_0000, 0b0000_1111],
        );
        let img = decode_image(&doc, &stream).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(7, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(7, 1).0, [255, 255, 255]);
    }
}
