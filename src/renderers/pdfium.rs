//! Pdfium renderer
//!
//! Renders vector and text content as well as images. Requires the pdfium
//! shared library next to the binary or installed system-wide.

use crate::error::RoiError;
use crate::geometry::{BBox, PageRect, RenderScale};
use crate::renderer::{unrotate, PageRenderer, RenderDocument};
use image::{imageops, DynamicImage, Rgb, RgbImage};
use pdfium_render::prelude::*;
use std::path::Path;

pub struct PdfiumRenderer {
    pdfium: Pdfium,
}

impl PdfiumRenderer {
    pub fn new() -> Result<Self, RoiError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| RoiError::RenderFailure(format!("Failed to bind pdfium library: {}", e)))?;

        tracing::info!("pdfium renderer initialized");

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn description(&self) -> &'static str {
        "pdfium-based renderer - draws vector, text and image content"
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RenderDocument + 'a>, RoiError> {
        let document = self.pdfium.load_pdf_from_file(path, None).map_err(|e| {
            RoiError::RenderFailure(format!("Failed to load PDF {}: {}", path.display(), e))
        })?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PdfiumDocument<'_> {
    fn page(&self, index: usize) -> Result<PdfPage<'_>, RoiError> {
        let page_index = PdfPageIndex::try_from(index).map_err(|_| RoiError::PageOutOfRange {
            index,
            count: self.page_count(),
        })?;
        self.document
            .pages()
            .get(page_index)
            .map_err(|e| RoiError::RenderFailure(format!("Failed to load page {}: {}", index, e)))
    }
}

impl RenderDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    /// Absolute MediaBox. Without one, the page's displayed size turned back
    /// by its `/Rotate`, anchored at the origin.
    fn media_box(&self, index: usize) -> Result<PageRect, RoiError> {
        let page = self.page(index)?;
        if let Ok(media) = page.boundaries().media() {
            let bounds = media.bounds;
            return Ok(PageRect::new(
                bounds.left().value as f64,
                bounds.bottom().value as f64,
                bounds.right().value as f64,
                bounds.top().value as f64,
            ));
        }

        let (width, height) = (page.width().value as f64, page.height().value as f64);
        let (width, height) = match self.rotation(index)? {
            90 | 270 => (height, width),
            _ => (width, height),
        };
        Ok(PageRect::new(0.0, 0.0, width, height))
    }

    fn rotation(&self, index: usize) -> Result<i64, RoiError> {
        let page = self.page(index)?;
        let degrees = match page.rotation() {
            Ok(PdfPageRenderRotation::Degrees90) => 90,
            Ok(PdfPageRenderRotation::Degrees180) => 180,
            Ok(PdfPageRenderRotation::Degrees270) => 270,
            _ => 0,
        };
        Ok(degrees)
    }

    /// Renders the full page under the uniform scale, turns pdfium's
    /// `/Rotate`-applied output back to MediaBox orientation, then copies out
    /// the device window of `bbox`. Areas outside the page stay white.
    fn rasterize(
        &self,
        index: usize,
        bbox: &BBox,
        width: u32,
        height: u32,
        scale: RenderScale,
    ) -> Result<DynamicImage, RoiError> {
        let page = self.page(index)?;
        let media = self.media_box(index)?;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .scale_page_by_factor(scale.factor() as f32)
                    .render_form_data(true)
                    .render_annotations(true),
            )
            .map_err(|e| RoiError::RenderFailure(format!("Failed to render page: {}", e)))?;
        let full = unrotate(bitmap.as_image().into_rgb8(), self.rotation(index)?);

        let window = bbox.device_window(&media, scale);
        let left = window.x0.round() as i64;
        let top = window.y0.round() as i64;

        let mut region = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        imageops::replace(&mut region, &full, -left, -top);

        Ok(DynamicImage::ImageRgb8(region))
    }
}
