use image::{GrayImage, Luma};

/// Min-max contrast stretch onto the full 0-255 range
///
/// Used as the autocontrast of the light preset and to normalize the
/// black-hat response before Otsu.
pub fn stretch(gray: &GrayImage) -> GrayImage {
    let (min_val, max_val) = find_min_max(gray);

    // Avoid division by zero
    if max_val <= min_val {
        return gray.clone();
    }

    let range = (max_val - min_val) as f32;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let pixel = gray.get_pixel(x, y).0[0];
        let normalized = ((pixel - min_val) as f32 / range * 255.0).round();
        Luma([normalized as u8])
    })
}

fn find_min_max(img: &GrayImage) -> (u8, u8) {
    let mut min = 255u8;
    let mut max = 0u8;

    for pixel in img.pixels() {
        let val = pixel.0[0];
        min = min.min(val);
        max = max.max(val);
    }

    (min, max)
}
