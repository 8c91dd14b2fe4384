use crate::config::EnhanceConfig;
use crate::enhance::blur::gaussian_blur;
use crate::enhance::morphology::{self, StructuringElement};
use image::{GrayImage, Luma};

/// Digit-stroke extraction: inverted Gaussian adaptive threshold followed by
/// a small opening that drops dust without thinning real strokes.
///
/// Foreground (255) marks pixels darker than their neighborhood mean by more
/// than the configured offset.
pub fn apply(denoised: &GrayImage, config: &EnhanceConfig) -> GrayImage {
    let binary = adaptive_threshold(denoised, config.adaptive_block_size, config.adaptive_offset);
    let element = StructuringElement::rect(config.open_kernel, config.open_kernel);
    morphology::open(&binary, &element)
}

/// Gaussian sigma matching a square `block_size` window
fn block_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn adaptive_threshold(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let mean = gaussian_blur(gray, block_sigma(block_size));

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let threshold = mean.get_pixel(x, y).0[0] - offset;
        if gray.get_pixel(x, y).0[0] as f32 <= threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));
        let result = apply(&img, &EnhanceConfig::default());
        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_dark_stroke_becomes_foreground() {
        let mut img = GrayImage::from_pixel(60, 30, Luma([235]));
        for y in 5..25 {
            for x in 20..26 {
                img.put_pixel(x, y, Luma([25]));
            }
        }
        let result = apply(&img, &EnhanceConfig::default());
        assert_eq!(result.get_pixel(23, 15).0[0], 255);
        assert_eq!(result.get_pixel(5, 15).0[0], 0);
        assert_eq!(result.get_pixel(40, 15).0[0], 0);
    }

    #[test]
    fn test_flat_background_stays_empty() {
        let img = GrayImage::from_pixel(40, 40, Luma([180]));
        let result = apply(&img, &EnhanceConfig::default());
        assert!(result.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_block_sigma_for_default_window() {
        assert!((block_sigma(35) - 5.6).abs() < 1e-5);
    }
}
