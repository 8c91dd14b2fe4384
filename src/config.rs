use crate::error::RoiError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Area band, in pixels, of a connected component accepted as a decimal dot
///
/// Dot area grows with the square of the render resolution, so the band is
/// stored together with the DPI it was measured at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotAreaBand {
    pub min_area: u32,
    pub max_area: u32,
    pub reference_dpi: u32,
}

impl Default for DotAreaBand {
    fn default() -> Self {
        Self {
            min_area: 2,
            max_area: 120,
            reference_dpi: 400,
        }
    }
}

impl DotAreaBand {
    /// Rescale the band to `dpi` (area scales with DPI squared)
    pub fn scaled_to(&self, dpi: u32) -> Self {
        let ratio = (dpi as f64 / self.reference_dpi as f64).powi(2);
        let min_area = (self.min_area as f64 * ratio).round().max(1.0) as u32;
        let max_area = (self.max_area as f64 * ratio).round().max(min_area as f64) as u32;
        Self {
            min_area,
            max_area,
            reference_dpi: dpi,
        }
    }

    pub fn contains(&self, area: u32) -> bool {
        (self.min_area..=self.max_area).contains(&area)
    }
}

/// Largest morphology kernel side, in pixels
pub const MAX_KERNEL: u32 = 255;

/// Tuning for the meter-display enhancer
///
/// Every value here was tuned empirically on 400 DPI renders of bill pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Gaussian sigma of the background estimate for illumination normalization
    pub background_sigma: f32,
    /// CLAHE clip limit, relative to a uniform histogram; 0 disables clipping
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid (columns, rows)
    pub clahe_grid: (u32, u32),
    /// Bilateral filter diameter in pixels
    pub bilateral_diameter: u32,
    /// Intensity difference at which a neighbor's weight falls to ~60 %
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    /// Adaptive threshold neighborhood (odd, pixels)
    pub adaptive_block_size: u32,
    /// Subtracted from the local mean before comparing
    pub adaptive_offset: f32,
    /// Side of the square opening kernel for digit strokes
    pub open_kernel: u32,
    /// Diameter of the elliptical black-hat kernel for the decimal mark.
    /// Must be wider than the widest dot, and `dot_area.min_area` must exceed
    /// the corner residue this kernel leaves on large dark shapes: 3 with
    /// min 2 catches dots up to 2 px across, 7 with min 5 catches 5x5 dots.
    pub blackhat_kernel: u32,
    pub dot_area: DotAreaBand,
    /// Side of the square kernel of the final dilation
    pub dilate_kernel: u32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            background_sigma: 25.0,
            clahe_clip_limit: 2.0,
            clahe_grid: (8, 8),
            bilateral_diameter: 7,
            bilateral_sigma_color: 25.0,
            bilateral_sigma_space: 7.0,
            adaptive_block_size: 35,
            adaptive_offset: 7.0,
            open_kernel: 2,
            blackhat_kernel: 3,
            dot_area: DotAreaBand::default(),
            dilate_kernel: 2,
        }
    }
}

impl EnhanceConfig {
    /// Load tuning from a JSON file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, RoiError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RoiError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            RoiError::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Same tuning with the dot area band rescaled to `dpi`
    pub fn for_dpi(&self, dpi: u32) -> Self {
        Self {
            dot_area: self.dot_area.scaled_to(dpi),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), RoiError> {
        for (name, sigma) in [
            ("background_sigma", self.background_sigma),
            ("bilateral_sigma_color", self.bilateral_sigma_color),
            ("bilateral_sigma_space", self.bilateral_sigma_space),
        ] {
            if !sigma.is_finite() || sigma <= 0.0 {
                return Err(RoiError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, sigma
                )));
            }
        }
        if !self.clahe_clip_limit.is_finite() || self.clahe_clip_limit < 0.0 {
            return Err(RoiError::InvalidConfig(format!(
                "clahe_clip_limit must be >= 0, got {}",
                self.clahe_clip_limit
            )));
        }
        if !self.adaptive_offset.is_finite() {
            return Err(RoiError::InvalidConfig(
                "adaptive_offset must be finite".to_string(),
            ));
        }
        if self.bilateral_diameter == 0 {
            return Err(RoiError::InvalidConfig(
                "bilateral_diameter must be at least 1 pixel".to_string(),
            ));
        }
        if self.clahe_grid.0 == 0 || self.clahe_grid.1 == 0 {
            return Err(RoiError::InvalidConfig(
                "clahe_grid must be at least 1x1".to_string(),
            ));
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(RoiError::InvalidConfig(
                "adaptive_block_size must be odd and >= 3".to_string(),
            ));
        }
        for (name, side) in [
            ("open_kernel", self.open_kernel),
            ("blackhat_kernel", self.blackhat_kernel),
            ("dilate_kernel", self.dilate_kernel),
        ] {
            if side == 0 || side > MAX_KERNEL {
                return Err(RoiError::InvalidConfig(format!(
                    "{} must be between 1 and {} pixels, got {}",
                    name, MAX_KERNEL, side
                )));
            }
        }
        if self.dot_area.reference_dpi == 0 || self.dot_area.min_area > self.dot_area.max_area {
            return Err(RoiError::InvalidConfig(format!(
                "invalid dot area band {:?}",
                self.dot_area
            )));
        }
        Ok(())
    }
}
