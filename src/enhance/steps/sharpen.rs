use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

const RADIUS: f32 = 2.0;
const AMOUNT: f32 = 1.6;
const THRESHOLD: i32 = 3;

/// Unsharp mask: add back 160% of the detail lost to a radius-2 Gaussian,
/// skipping differences of 3 levels or less so flat paper grain stays flat.
pub fn apply(gray: &GrayImage) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, RADIUS);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let original = gray.get_pixel(x, y).0[0] as i32;
        let detail = original - blurred.get_pixel(x, y).0[0] as i32;
        if detail.abs() <= THRESHOLD {
            return Luma([original as u8]);
        }
        let v = original as f32 + AMOUNT * detail as f32;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharpen_enhances_edges() {
        // Left half dark, right half light
        let img = GrayImage::from_fn(20, 10, |x, _| if x < 10 { Luma([50]) } else { Luma([200]) });
        let result = apply(&img);

        let edge_left = result.get_pixel(9, 5).0[0] as i32;
        let edge_right = result.get_pixel(10, 5).0[0] as i32;

        let original_diff = 200i32 - 50;
        let result_diff = (edge_right - edge_left).abs();
        assert!(
            result_diff >= original_diff,
            "Edge should be enhanced: {} >= {}",
            result_diff,
            original_diff
        );
    }

    #[test]
    fn test_flat_region_unchanged() {
        let img = GrayImage::from_pixel(16, 16, Luma([140]));
        assert_eq!(apply(&img), img);
    }
}
