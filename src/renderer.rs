use crate::error::RoiError;
use crate::geometry::{BBox, CoordinateSpace, PageRect, RenderScale};
use image::{DynamicImage, RgbImage};
#[cfg(any(feature = "renderer-pdfium", test))]
use image::imageops;
use std::path::Path;

/// Trait that all page rendering backends must implement
pub trait PageRenderer {
    /// Returns the backend identifier (e.g., "scan", "pdfium")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the backend
    fn description(&self) -> &'static str;

    /// Open a document. The handle is released when dropped.
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RenderDocument + 'a>, RoiError>;
}

/// An open, paginated document
pub trait RenderDocument {
    fn page_count(&self) -> usize;

    /// MediaBox of a page already checked to be in range
    fn media_box(&self, index: usize) -> Result<PageRect, RoiError>;

    /// Declared page rotation in degrees
    fn rotation(&self, index: usize) -> Result<i64, RoiError>;

    /// Rasterize the bottom-left `bbox` of page `index` into a
    /// `width` x `height` raster, using `device = (point - origin) * scale`
    /// with no rotation applied.
    fn rasterize(
        &self,
        index: usize,
        bbox: &BBox,
        width: u32,
        height: u32,
        scale: RenderScale,
    ) -> Result<DynamicImage, RoiError>;
}

/// Validate `index` and return the page's MediaBox
pub fn page_rect(doc: &dyn RenderDocument, index: usize) -> Result<PageRect, RoiError> {
    let count = doc.page_count();
    if index >= count {
        return Err(RoiError::PageOutOfRange { index, count });
    }
    doc.media_box(index)
}

/// Render a page sub-rectangle at `scale`.
///
/// `bbox` may be in either coordinate space; it is converted against the
/// page's MediaBox before rendering. The result is always 3-channel RGB.
pub fn render_region(
    doc: &dyn RenderDocument,
    index: usize,
    bbox: &BBox,
    scale: RenderScale,
) -> Result<RgbImage, RoiError> {
    let page = page_rect(doc, index)?;

    let rotation = doc.rotation(index)?;
    if rotation.rem_euclid(360) != 0 {
        tracing::warn!(
            "Page {} declares rotation {}°; rendering without it so page points map linearly to pixels",
            index,
            rotation
        );
    }

    let native = bbox.to_space(CoordinateSpace::BottomLeft, &page);
    let (width, height) = native.pixel_size(scale);
    if width == 0 || height == 0 {
        return Err(RoiError::InvalidBbox(format!(
            "{} ({}) is smaller than one pixel at {} DPI",
            bbox,
            bbox.space,
            scale.dpi()
        )));
    }

    tracing::debug!(
        "Rendering page {} bbox [{}] ({}) at {} DPI -> {}x{} px",
        index,
        native,
        native.space,
        scale.dpi(),
        width,
        height
    );

    let raster = doc.rasterize(index, &native, width, height, scale)?;
    Ok(raster.into_rgb8())
}

/// Render a whole page at `scale`, returning the raster and the MediaBox
pub fn render_page(
    doc: &dyn RenderDocument,
    index: usize,
    scale: RenderScale,
) -> Result<(RgbImage, PageRect), RoiError> {
    let page = page_rect(doc, index)?;
    let image = render_region(doc, index, &page.bbox(), scale)?;
    Ok((image, page))
}

/// Undo the clockwise `/Rotate` a backend applied while rasterizing, so the
/// raster is back in MediaBox orientation (a 90 or 270 turn swaps the sides)
#[cfg(any(feature = "renderer-pdfium", test))]
pub fn unrotate(image: RgbImage, degrees: i64) -> RgbImage {
    match degrees.rem_euclid(360) {
        90 => imageops::rotate270(&image),
        180 => imageops::rotate180(&image),
        270 => imageops::rotate90(&image),
        _ => image,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgb;

    /// Synthetic document: white pages, with a black band over the top
    /// quarter so vertical orientation is observable.
    pub(crate) struct StripedDocument {
        pub pages: Vec<PageRect>,
        pub rotation: i64,
    }

    impl RenderDocument for StripedDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn media_box(&self, index: usize) -> Result<PageRect, RoiError> {
            Ok(self.pages[index])
        }

        fn rotation(&self, _index: usize) -> Result<i64, RoiError> {
            Ok(self.rotation)
        }

        fn rasterize(
            &self,
            index: usize,
            bbox: &BBox,
            width: u32,
            height: u32,
            scale: RenderScale,
        ) -> Result<DynamicImage, RoiError> {
            let page = self.pages[index];
            let band = page.y1 - page.height() / 4.0;
            let f = scale.factor();
            let img = RgbImage::from_fn(width, height, |_, y| {
                let py = bbox.y1 - (y as f64 + 0.5) / f;
                if py >= band {
                    Rgb([0, 0, 0])
                } else {
                    Rgb([255, 255, 255])
                }
            });
            Ok(DynamicImage::ImageRgba8(DynamicImage::ImageRgb8(img).to_rgba8()))
        }
    }

    fn doc() -> StripedDocument {
        StripedDocument {
            pages: vec![PageRect::new(0.0, 0.0, 612.0, 792.0)],
            rotation: 0,
        }
    }

    #[test]
    fn test_page_index_equal_to_count_is_out_of_range() {
        let doc = doc();
        let scale = RenderScale::new(72).unwrap();
        let bbox = BBox::bottom_left(0.0, 0.0, 10.0, 10.0).unwrap();
        let err = render_region(&doc, 1, &bbox, scale).unwrap_err();
        assert!(matches!(err, RoiError::PageOutOfRange { index: 1, count: 1 }));
    }

    #[test]
    fn test_region_size_follows_dpi() {
        let doc = doc();
        let scale = RenderScale::new(400).unwrap();
        let bbox = BBox::bottom_left(348.0, 469.0, 540.0, 610.0).unwrap();
        let img = render_region(&doc, 0, &bbox, scale).unwrap();

        let expected_w = (192.0_f64 * 400.0 / 72.0).round() as i64;
        let expected_h = (141.0_f64 * 400.0 / 72.0).round() as i64;
        assert!((img.width() as i64 - expected_w).abs() <= 1);
        assert!((img.height() as i64 - expected_h).abs() <= 1);
    }

    #[test]
    fn test_full_page_at_72_dpi_is_one_to_one() {
        let (img, page) = render_page(&doc(), 0, RenderScale::new(72).unwrap()).unwrap();
        assert_eq!(img.dimensions(), (612, 792));
        assert_eq!(page.width(), 612.0);
    }

    #[test]
    fn test_top_left_and_bottom_left_boxes_render_identically() {
        let doc = doc();
        let scale = RenderScale::new(144).unwrap();
        let bl = BBox::bottom_left(100.0, 560.0, 200.0, 640.0).unwrap();
        let tl = bl.to_space(CoordinateSpace::TopLeft, &doc.pages[0]);

        let a = render_region(&doc, 0, &bl, scale).unwrap();
        let b = render_region(&doc, 0, &tl, scale).unwrap();
        assert_eq!(a, b);
        // band starts at y=594pt, so the top rows are black and the bottom white
        assert_eq!(a.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(a.get_pixel(0, a.height() - 1).0, [255, 255, 255]);
    }

    #[test]
    fn test_rotation_flag_is_ignored() {
        let mut rotated = doc();
        rotated.rotation = 90;
        let scale = RenderScale::new(72).unwrap();
        let (a, _) = render_page(&rotated, 0, scale).unwrap();
        let (b, _) = render_page(&doc(), 0, scale).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sub_pixel_bbox_is_rejected() {
        let bbox = BBox::bottom_left(0.0, 0.0, 0.1, 0.1).unwrap();
        let err = render_region(&doc(), 0, &bbox, RenderScale::new(72).unwrap()).unwrap_err();
        assert!(matches!(err, RoiError::InvalidBbox(_)));
    }

    #[test]
    fn test_direct_render_matches_projected_window() {
        let doc = doc();
        let page = doc.pages[0];
        for dpi in [72, 150, 300, 400] {
            let scale = RenderScale::new(dpi).unwrap();
            let bbox = BBox::bottom_left(348.3, 469.7, 540.1, 610.9).unwrap();
            let (full, _) = render_page(&doc, 0, scale).unwrap();
            let direct = render_region(&doc, 0, &bbox, scale).unwrap();

            let window = bbox.device_window(&page, scale);
            assert!(window.x1 <= full.width() as f64 + 1.0);
            assert!((direct.width() as f64 - window.width()).abs() <= 1.0);
            assert!((direct.height() as f64 - window.height()).abs() <= 1.0);
        }
    }

    #[test]
    fn test_unrotate_restores_media_box_orientation() {
        // 4x2 page raster with a marker in its top-left corner
        let mut page = RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]));
        page.put_pixel(0, 0, Rgb([255, 0, 0]));

        let displayed = [
            (90, imageops::rotate90(&page)),
            (180, imageops::rotate180(&page)),
            (270, imageops::rotate270(&page)),
            (-90, imageops::rotate270(&page)),
        ];
        for (degrees, shown) in displayed {
            let restored = unrotate(shown, degrees);
            assert_eq!(restored.dimensions(), (4, 2), "rotation {}", degrees);
            assert_eq!(restored, page, "rotation {}", degrees);
        }
        assert_eq!(unrotate(page.clone(), 0), page);
    }
}
