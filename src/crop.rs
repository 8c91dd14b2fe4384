//! End-to-end region crop: render, enhance, package

use crate::config::EnhanceConfig;
use crate::enhance::{Pipeline, Preset, StepTiming};
use crate::error::RoiError;
use crate::geometry::{BBox, RenderScale};
use crate::package::package_image;
use crate::renderer::{self, PageRenderer};
use crate::renderers::open_document;
use image::DynamicImage;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Meter display region on the bills this tool was built for (bottom-left points)
pub const DEFAULT_BBOX: [f64; 4] = [348.0, 469.0, 540.0, 610.0];

/// Everything needed for one crop invocation
#[derive(Debug, Clone)]
pub struct CropRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub page: usize,
    pub bbox: BBox,
    pub dpi: u32,
    pub preset: Preset,
    pub sharpen: bool,
    pub tuning: EnhanceConfig,
}

/// What a successful crop produced
#[derive(Debug, Clone, Serialize)]
pub struct CropSummary {
    pub output: PathBuf,
    pub page: usize,
    pub bbox: BBox,
    pub dpi: u32,
    pub width: u32,
    pub height: u32,
    pub preset: String,
    pub render_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Render `bbox` of one page, enhance it and write it as a one-page PDF.
///
/// The page index is validated before anything is written; any failure
/// leaves no file at `output`.
pub fn crop_roi_to_pdf(
    renderer: &dyn PageRenderer,
    request: &CropRequest,
) -> Result<CropSummary, RoiError> {
    let scale = RenderScale::new(request.dpi)?;

    let start = std::time::Instant::now();
    let raster = {
        let doc = open_document(renderer, &request.input)?;
        renderer::render_region(doc.as_ref(), request.page, &request.bbox, scale)?
    };
    let render_time_ms = start.elapsed().as_millis() as u64;

    let enhanced = Pipeline::new(request.preset, request.tuning.for_dpi(request.dpi))
        .with_sharpen(request.sharpen)
        .process(&DynamicImage::ImageRgb8(raster))?;

    let packaged = package_image(&enhanced.image, &request.output)?;

    Ok(CropSummary {
        output: packaged.path,
        page: request.page,
        bbox: request.bbox,
        dpi: request.dpi,
        width: packaged.width,
        height: packaged.height,
        preset: enhanced.preset,
        render_time_ms,
        steps: enhanced.steps,
    })
}

/// `roi_<input file name>` in the current directory
pub fn default_output(input: &Path) -> PathBuf {
    let mut name = OsString::from("roi_");
    name.push(input.file_name().unwrap_or(input.as_os_str()));
    PathBuf::from(name)
}

/// Open `path` in the platform viewer. Failures are logged only.
pub fn open_file(path: &Path) {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };

    match command.arg(path).status() {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::warn!("Couldn't auto-open {}: viewer exited with {}", path.display(), status),
        Err(e) => tracing::warn!("Couldn't auto-open {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderDocument;
    use crate::renderers::scan::ScanRenderer;
    use image::{GrayImage, Luma};

    /// 200x100 pt page whose right half is dark
    fn half_dark_pdf(dir: &Path) -> PathBuf {
        let path = dir.join("bill.pdf");
        let img = GrayImage::from_fn(200, 100, |x, _| if x < 100 { Luma([230]) } else { Luma([20]) });
        package_image(&DynamicImage::ImageLuma8(img), &path).unwrap();
        path
    }

    fn request(input: PathBuf, output: PathBuf, page: usize) -> CropRequest {
        CropRequest {
            input,
            output,
            page,
            bbox: BBox::bottom_left(80.0, 20.0, 120.0, 60.0).unwrap(),
            dpi: 144,
            preset: Preset::Raw,
            sharpen: false,
            tuning: EnhanceConfig::default(),
        }
    }

    #[test]
    fn test_crop_writes_single_page_of_rendered_size() {
        let dir = tempfile::tempdir().unwrap();
        let input = half_dark_pdf(dir.path());
        let output = dir.path().join("roi.pdf");

        let summary = crop_roi_to_pdf(&ScanRenderer, &request(input, output.clone(), 0)).unwrap();
        assert_eq!((summary.width, summary.height), (80, 80));
        assert!(output.exists());

        let doc = ScanRenderer.open(&output).unwrap();
        assert_eq!(doc.page_count(), 1);
        let (img, _) = renderer::render_page(doc.as_ref(), 0, RenderScale::new(72).unwrap()).unwrap();
        assert_eq!(img.dimensions(), (80, 80));
        assert!(img.get_pixel(10, 40).0[0] > 200);
        assert!(img.get_pixel(70, 40).0[0] < 50);
    }

    #[test]
    fn test_page_out_of_range_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = half_dark_pdf(dir.path());
        let output = dir.path().join("roi.pdf");

        let err = crop_roi_to_pdf(&ScanRenderer, &request(input, output.clone(), 1)).unwrap_err();
        assert!(matches!(err, RoiError::PageOutOfRange { index: 1, count: 1 }));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("roi.pdf");
        let req = request(dir.path().join("nope.pdf"), output.clone(), 0);
        let err = crop_roi_to_pdf(&ScanRenderer, &req).unwrap_err();
        assert!(matches!(err, RoiError::InputNotFound(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_mask_preset_packages_gray_mask() {
        let dir = tempfile::tempdir().unwrap();
        let input = half_dark_pdf(dir.path());
        let output = dir.path().join("mask.pdf");
        let mut req = request(input, output, 0);
        req.preset = Preset::Mask;

        let summary = crop_roi_to_pdf(&ScanRenderer, &req).unwrap();
        assert_eq!(summary.preset, "mask");
        assert_eq!(summary.steps.len(), 8);
    }

    #[test]
    fn test_default_output_name() {
        assert_eq!(
            default_output(Path::new("/bills/march.pdf")),
            PathBuf::from("roi_march.pdf")
        );
    }
}
