use image::{imageops, DynamicImage, GrayImage};

/// Convert a rendered raster to 8-bit luminance
/// Every enhancement path starts here
pub fn apply(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Bring an enhanced mask (pure 0/255, white foreground in the minority)
/// back to dark-on-light, the polarity the mask preset expects from a render.
/// Any other image is returned as is.
pub fn dark_on_light(mut gray: GrayImage) -> GrayImage {
    let mut on = 0usize;
    for p in gray.pixels() {
        match p.0[0] {
            0 => {}
            255 => on += 1,
            _ => return gray,
        }
    }
    let total = (gray.width() * gray.height()) as usize;
    if on == 0 || on * 2 >= total {
        return gray;
    }
    tracing::debug!(
        "Input is a white-on-black mask ({} of {} pixels set), inverting",
        on,
        total
    );
    imageops::invert(&mut gray);
    gray
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_grayscale_converts_color() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(0, 0, Rgb([255, 0, 0])); // Red
        img.put_pixel(1, 0, Rgb([0, 255, 0])); // Green
        img.put_pixel(2, 0, Rgb([0, 0, 255])); // Blue

        let gray = apply(&DynamicImage::ImageRgb8(img));

        assert!(gray.get_pixel(0, 0).0[0] > 0);
        assert!(gray.get_pixel(1, 0).0[0] > gray.get_pixel(0, 0).0[0]);
        assert!(gray.get_pixel(2, 0).0[0] > 0);
    }

    #[test]
    fn test_grayscale_preserves_dimensions() {
        let img = RgbImage::new(100, 50);
        let gray = apply(&DynamicImage::ImageRgb8(img));
        assert_eq!(gray.dimensions(), (100, 50));
    }

    #[test]
    fn test_white_on_black_mask_is_inverted() {
        let mut mask = GrayImage::new(10, 10);
        mask.put_pixel(4, 4, Luma([255]));
        let flipped = dark_on_light(mask);
        assert_eq!(flipped.get_pixel(4, 4).0[0], 0);
        assert_eq!(flipped.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_render_polarity_left_alone() {
        // dark-on-light binary page
        let mut page = GrayImage::from_pixel(10, 10, Luma([255]));
        page.put_pixel(4, 4, Luma([0]));
        assert_eq!(dark_on_light(page.clone()), page);

        // gray levels present
        let mut gray = GrayImage::new(10, 10);
        gray.put_pixel(4, 4, Luma([255]));
        gray.put_pixel(5, 5, Luma([128]));
        assert_eq!(dark_on_light(gray.clone()), gray);

        // blank
        let blank = GrayImage::new(10, 10);
        assert_eq!(dark_on_light(blank.clone()), blank);
    }
}
