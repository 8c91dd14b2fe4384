use crate::config::EnhanceConfig;
use crate::enhance::blur::gaussian_blur;
use image::{GrayImage, Luma};

/// Flatten uneven lighting: divide by a heavily blurred background estimate
/// and rescale to the 8-bit range.
pub fn apply(gray: &GrayImage, config: &EnhanceConfig) -> GrayImage {
    let background = gaussian_blur(gray, config.background_sigma);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let bg = background.get_pixel(x, y).0[0].max(1.0);
        let v = gray.get_pixel(x, y).0[0] as f32 * 255.0 / bg;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flattens_horizontal_gradient() {
        // background brightens left to right; normalized it should be flat
        let img = GrayImage::from_fn(120, 40, |x, _| Luma([120 + (x as u8 / 2)]));
        let result = apply(&img, &EnhanceConfig::default());

        let left = result.get_pixel(40, 20).0[0] as i32;
        let right = result.get_pixel(80, 20).0[0] as i32;
        assert!((left - right).abs() <= 8, "left={} right={}", left, right);
        assert!(left > 230);
    }

    #[test]
    fn test_dark_stroke_stays_dark() {
        let img = GrayImage::from_fn(80, 80, |x, _| {
            if (38..42).contains(&x) {
                Luma([30])
            } else {
                Luma([200])
            }
        });
        let result = apply(&img, &EnhanceConfig::default());
        assert!(result.get_pixel(40, 40).0[0] < 60);
        assert!(result.get_pixel(10, 40).0[0] > 240);
    }

    #[test]
    fn test_black_background_does_not_divide_by_zero() {
        let img = GrayImage::new(10, 10);
        let result = apply(&img, &EnhanceConfig::default());
        assert!(result.pixels().all(|p| p.0[0] == 0));
    }
}
