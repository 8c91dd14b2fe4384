//! Text-mode calibration session for finding a region's bounding box
//!
//! The full page is rendered once to `page_preview.png`; the operator reads
//! pixel positions off that image and types them back. Because the preview
//! and every region render use the same pure scale, a device rectangle maps
//! to page points by division alone.

use crate::error::RoiError;
use crate::geometry::{BBox, CoordinateSpace, DeviceRect, PageRect, RenderScale};
use crate::renderer::{self, RenderDocument};
use image::RgbImage;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Smallest accepted selection, in device pixels per side
pub const MIN_SPAN_PX: f64 = 3.0;

pub const PAGE_PREVIEW: &str = "page_preview.png";
pub const ROI_PREVIEW: &str = "roi_preview.png";
pub const BBOX_FILE: &str = "bbox.txt";

/// A parsed operator command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Device-pixel rectangle on the page preview, any corner order
    Select(DeviceRect),
    /// Known top-left bbox in points
    Preview(BBox),
    Save,
    Quit,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Self>, RoiError> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = parts.collect();

        let command = match verb {
            "select" => {
                let v = numbers(&rest)?;
                Command::Select(DeviceRect::from_corners(v[0], v[1], v[2], v[3]))
            }
            "bbox" => Command::Preview(BBox::from_slice(&numbers(&rest)?, CoordinateSpace::TopLeft)?),
            "s" | "save" => Command::Save,
            "q" | "quit" => Command::Quit,
            "h" | "help" | "?" => Command::Help,
            other => {
                return Err(RoiError::InvalidInput(format!("unknown command '{}'", other)));
            }
        };
        Ok(Some(command))
    }
}

fn numbers(args: &[&str]) -> Result<Vec<f64>, RoiError> {
    if args.len() != 4 {
        return Err(RoiError::InvalidBbox(format!(
            "expected 4 coordinates, got {}",
            args.len()
        )));
    }
    args.iter()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| RoiError::InvalidBbox(format!("not a number: {:?}", s)))
        })
        .collect()
}

/// Last region shown to the operator
#[derive(Debug, Clone)]
pub struct Selection {
    pub bbox: BBox,
    pub image: RgbImage,
}

pub struct CalibrationSession<'a> {
    doc: Box<dyn RenderDocument + 'a>,
    page_index: usize,
    page: PageRect,
    scale: RenderScale,
    preview_size: (u32, u32),
    out_dir: PathBuf,
    selection: Option<Selection>,
}

impl<'a> CalibrationSession<'a> {
    /// Render page `page_index` and write the full-page preview into `out_dir`
    pub fn new(
        doc: Box<dyn RenderDocument + 'a>,
        page_index: usize,
        scale: RenderScale,
        out_dir: &Path,
    ) -> Result<Self, RoiError> {
        let (preview, page) = renderer::render_page(doc.as_ref(), page_index, scale)?;
        let preview_path = out_dir.join(PAGE_PREVIEW);
        preview
            .save(&preview_path)
            .map_err(|e| RoiError::write_failure(&preview_path, e))?;
        tracing::info!("Wrote {}", preview_path.display());

        Ok(Self {
            doc,
            page_index,
            page,
            scale,
            preview_size: preview.dimensions(),
            out_dir: out_dir.to_path_buf(),
            selection: None,
        })
    }

    pub fn page(&self) -> PageRect {
        self.page
    }

    pub fn preview_size(&self) -> (u32, u32) {
        self.preview_size
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Select a device rectangle of the page preview.
    ///
    /// Returns `Ok(None)` when the clamped rectangle is narrower than
    /// [`MIN_SPAN_PX`] on either side.
    pub fn select(&mut self, rect: DeviceRect) -> Result<Option<&Selection>, RoiError> {
        let (w, h) = self.preview_size();
        let rect = rect.clamp(w, h);
        if rect.width() < MIN_SPAN_PX || rect.height() < MIN_SPAN_PX {
            return Ok(None);
        }
        let bbox = rect.to_bbox(self.scale)?;
        self.preview_bbox(bbox).map(Some)
    }

    /// Render `bbox` directly at the session scale and make it the selection
    pub fn preview_bbox(&mut self, bbox: BBox) -> Result<&Selection, RoiError> {
        let bbox = bbox.to_space(CoordinateSpace::TopLeft, &self.page());
        let image = renderer::render_region(self.doc.as_ref(), self.page_index, &bbox, self.scale)?;
        Ok(&*self.selection.insert(Selection { bbox, image }))
    }

    /// Write `bbox.txt` and `roi_preview.png` for the current selection
    pub fn save(&self) -> Result<Option<(PathBuf, PathBuf)>, RoiError> {
        let Some(selection) = self.selection() else {
            return Ok(None);
        };

        let image_path = self.out_dir.join(ROI_PREVIEW);
        selection
            .image
            .save(&image_path)
            .map_err(|e| RoiError::write_failure(&image_path, e))?;

        let bbox_path = self.out_dir.join(BBOX_FILE);
        std::fs::write(&bbox_path, format!("{}\n", selection.bbox))
            .map_err(|e| RoiError::write_failure(&bbox_path, e))?;

        Ok(Some((image_path, bbox_path)))
    }

    /// Read commands from `input` until `q` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<(), RoiError> {
        let io_err = |e: std::io::Error| RoiError::write_failure("<stdout>", e);

        self.describe(&mut out).map_err(io_err)?;
        print_help(&mut out).map_err(io_err)?;

        for line in input.lines() {
            let line = line.map_err(|e| RoiError::InvalidInput(format!("Failed to read command: {}", e)))?;
            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(out, "{}", e).map_err(io_err)?;
                    continue;
                }
            };

            match command {
                Command::Quit => break,
                Command::Help => print_help(&mut out).map_err(io_err)?,
                Command::Save => match self.save()? {
                    Some((image_path, bbox_path)) => {
                        writeln!(out, "Saved crop -> {}", image_path.display()).map_err(io_err)?;
                        writeln!(out, "Saved bbox -> {}", bbox_path.display()).map_err(io_err)?;
                    }
                    None => writeln!(out, "No selection to save yet.").map_err(io_err)?,
                },
                Command::Select(rect) => {
                    let page = self.page();
                    match self.select(rect) {
                        Ok(Some(selection)) => report(&mut out, selection, &page).map_err(io_err)?,
                        Ok(None) => writeln!(
                            out,
                            "Selection smaller than {} px; try again.",
                            MIN_SPAN_PX
                        )
                        .map_err(io_err)?,
                        Err(e) => writeln!(out, "{}", e).map_err(io_err)?,
                    }
                }
                Command::Preview(bbox) => {
                    let page = self.page();
                    match self.preview_bbox(bbox) {
                        Ok(selection) => report(&mut out, selection, &page).map_err(io_err)?,
                        Err(e) => writeln!(out, "{}", e).map_err(io_err)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn describe<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let (w, h) = self.preview_size();
        writeln!(
            out,
            "Page {} size: {:.2} x {:.2} points; rendered {} x {} px at {} DPI -> {}",
            self.page_index,
            self.page.width(),
            self.page.height(),
            w,
            h,
            self.scale.dpi(),
            self.out_dir.join(PAGE_PREVIEW).display()
        )?;
        let rotation = self.doc.rotation(self.page_index).unwrap_or(0);
        if rotation.rem_euclid(360) != 0 {
            writeln!(
                out,
                "Note: page has rotation flag {}°, rendered without it; the preview may look sideways but coordinates map correctly.",
                rotation
            )?;
        }
        Ok(())
    }
}

fn report<W: Write>(out: &mut W, selection: &Selection, page: &PageRect) -> std::io::Result<()> {
    let b = &selection.bbox;
    let bl = b.to_space(CoordinateSpace::BottomLeft, page);
    writeln!(out, "=== Selection ===")?;
    writeln!(out, "PDF bbox (points, origin top-left): {}", b)?;
    writeln!(
        out,
        "As integers: {} {} {} {}",
        b.x0.round() as i64,
        b.y0.round() as i64,
        b.x1.round() as i64,
        b.y1.round() as i64
    )?;
    writeln!(out, "For crop --bbox (points, origin bottom-left): {}", bl)?;
    writeln!(
        out,
        "Preview: {} x {} px (press 's' to save)",
        selection.image.width(),
        selection.image.height()
    )
}

fn print_help<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  select X0 Y0 X1 Y1   pixel rectangle on the page preview")?;
    writeln!(out, "  bbox X0 Y0 X1 Y1     preview a bbox in points (origin top-left)")?;
    writeln!(out, "  s                    save {} and {}", ROI_PREVIEW, BBOX_FILE)?;
    writeln!(out, "  q                    quit")
}
