use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Single-channel float image
pub type GrayFloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Gaussian blur kept in floating point, so background and local-mean
/// estimates are not quantized before they are compared with pixels.
/// Borders replicate the edge pixel.
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayFloatImage {
    let float = GrayFloatImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[0] as f32])
    });
    gaussian_blur_f32(&float, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blur_preserves_uniform_image() {
        let img = GrayImage::from_pixel(12, 7, Luma([131]));
        let blurred = gaussian_blur(&img, 25.0);
        assert!(blurred.pixels().all(|p| (p.0[0] - 131.0).abs() < 0.01));
    }

    #[test]
    fn test_blur_spreads_a_point() {
        let mut img = GrayImage::new(21, 21);
        img.put_pixel(10, 10, Luma([255]));
        let blurred = gaussian_blur(&img, 2.0);
        let center = blurred.get_pixel(10, 10).0[0];
        assert!(center < 255.0);
        assert!(blurred.get_pixel(11, 10).0[0] > 0.0);
        assert!(center > blurred.get_pixel(12, 10).0[0]);
        // not rounded to whole levels
        assert!(blurred.get_pixel(14, 10).0[0].fract() != 0.0);
    }
}
