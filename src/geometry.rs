//! Page-space and device-space geometry
//!
//! Page space is measured in points (1/72 inch). A [`BBox`] always carries the
//! [`CoordinateSpace`] its y values are expressed in, so the production crop
//! path (bottom-left, the page's native system) and the calibration path
//! (top-left, aligned with rendered rasters) can never be mixed silently.

use crate::error::RoiError;
use serde::Serialize;
use std::fmt;

/// Points per inch in PDF user space
pub const POINTS_PER_INCH: f64 = 72.0;

/// Origin convention of a bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinateSpace {
    /// Origin at the page's lower-left corner, y grows upward (PDF native)
    BottomLeft,
    /// Origin at the page's upper-left corner, y grows downward (raster aligned)
    TopLeft,
}

impl fmt::Display for CoordinateSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BottomLeft => f.write_str("bottom-left"),
            Self::TopLeft => f.write_str("top-left"),
        }
    }
}

/// Uniform page-to-device scale derived from a DPI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderScale {
    dpi: u32,
}

impl RenderScale {
    pub fn new(dpi: u32) -> Result<Self, RoiError> {
        if dpi == 0 {
            return Err(RoiError::InvalidInput("DPI must be positive".to_string()));
        }
        Ok(Self { dpi })
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Device pixels per page point
    pub fn factor(&self) -> f64 {
        self.dpi as f64 / POINTS_PER_INCH
    }

    /// Number of whole device pixels covering `points`
    pub fn pixels(&self, points: f64) -> u32 {
        (points * self.factor()).round().max(0.0) as u32
    }

    pub fn to_points(&self, pixels: f64) -> f64 {
        pixels / self.factor()
    }
}

/// A page's MediaBox in native (bottom-left) user-space coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageRect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// The whole page as a bottom-left bbox
    pub fn bbox(&self) -> BBox {
        BBox {
            x0: self.x0,
            y0: self.y0,
            x1: self.x1,
            y1: self.y1,
            space: CoordinateSpace::BottomLeft,
        }
    }
}

/// Rectangle in page points, tagged with its origin convention
///
/// Construction sorts the corners, so `x0 < x1` and `y0 < y1` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub space: CoordinateSpace,
}

impl BBox {
    pub fn new(
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        space: CoordinateSpace,
    ) -> Result<Self, RoiError> {
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return Err(RoiError::InvalidBbox(format!(
                "non-finite coordinate in ({}, {}, {}, {})",
                x0, y0, x1, y1
            )));
        }

        let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (y0, y1) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };

        if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
            return Err(RoiError::InvalidBbox(format!(
                "degenerate rectangle ({}, {}, {}, {})",
                x0, y0, x1, y1
            )));
        }

        Ok(Self {
            x0,
            y0,
            x1,
            y1,
            space,
        })
    }

    #[cfg(test)]
    pub fn bottom_left(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self, RoiError> {
        Self::new(x0, y0, x1, y1, CoordinateSpace::BottomLeft)
    }

    pub fn top_left(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self, RoiError> {
        Self::new(x0, y0, x1, y1, CoordinateSpace::TopLeft)
    }

    /// Parse four numbers separated by whitespace and/or commas
    /// (the `bbox.txt` format)
    pub fn parse(text: &str, space: CoordinateSpace) -> Result<Self, RoiError> {
        let values = text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| RoiError::InvalidBbox(format!("not a number: {:?}", s)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match values.as_slice() {
            [x0, y0, x1, y1] => Self::new(*x0, *y0, *x1, *y1, space),
            _ => Err(RoiError::InvalidBbox(format!(
                "expected 4 coordinates, got {}",
                values.len()
            ))),
        }
    }

    pub fn from_slice(values: &[f64], space: CoordinateSpace) -> Result<Self, RoiError> {
        match values {
            [x0, y0, x1, y1] => Self::new(*x0, *y0, *x1, *y1, space),
            _ => Err(RoiError::InvalidBbox(format!(
                "expected 4 coordinates, got {}",
                values.len()
            ))),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Convert into `target` relative to `page`.
    ///
    /// Top-left coordinates are measured from the MediaBox's upper-left
    /// corner: `x_tl = x_bl - page.x0`, `y_tl = page.y1 - y_bl`.
    pub fn to_space(&self, target: CoordinateSpace, page: &PageRect) -> BBox {
        match (self.space, target) {
            (CoordinateSpace::BottomLeft, CoordinateSpace::TopLeft) => BBox {
                x0: self.x0 - page.x0,
                y0: page.y1 - self.y1,
                x1: self.x1 - page.x0,
                y1: page.y1 - self.y0,
                space: target,
            },
            (CoordinateSpace::TopLeft, CoordinateSpace::BottomLeft) => BBox {
                x0: self.x0 + page.x0,
                y0: page.y1 - self.y1,
                x1: self.x1 + page.x0,
                y1: page.y1 - self.y0,
                space: target,
            },
            _ => *self,
        }
    }

    /// Project into the pixel grid of a full-page render at `scale`
    #[cfg(any(feature = "renderer-pdfium", test))]
    pub fn device_window(&self, page: &PageRect, scale: RenderScale) -> DeviceRect {
        let tl = self.to_space(CoordinateSpace::TopLeft, page);
        let f = scale.factor();
        DeviceRect {
            x0: tl.x0 * f,
            y0: tl.y0 * f,
            x1: tl.x1 * f,
            y1: tl.y1 * f,
        }
    }

    /// Pixel size of a direct render of this box at `scale`
    pub fn pixel_size(&self, scale: RenderScale) -> (u32, u32) {
        (scale.pixels(self.width()), scale.pixels(self.height()))
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} {:.2} {:.2} {:.2}",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}

/// Rectangle in device pixels of a full-page raster (top-left origin, y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl DeviceRect {
    /// Build from two arbitrary corners (drag start and end)
    pub fn from_corners(ax: f64, ay: f64, bx: f64, by: f64) -> Self {
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    /// Clamp to a `width` x `height` raster
    pub fn clamp(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self {
            x0: self.x0.clamp(0.0, w),
            y0: self.y0.clamp(0.0, h),
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Convert to top-left page points by dividing by the render scale (no y flip)
    pub fn to_bbox(&self, scale: RenderScale) -> Result<BBox, RoiError> {
        BBox::top_left(
            scale.to_points(self.x0),
            scale.to_points(self.y0),
            scale.to_points(self.x1),
            scale.to_points(self.y1),
        )
    }
}
