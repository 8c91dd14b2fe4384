//! Flat morphology on 8-bit single-channel images
//!
//! Erosion and dilation come from `imageproc::morphology`; samples that fall
//! outside the image are ignored. On binary masks (0 / 255) these are the
//! usual binary operators.

use image::{imageops, GrayImage, Luma};
use imageproc::map::map_colors2;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

/// Structuring element anchored at (width/2, height/2), together with its
/// point reflection through the anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    mask: Mask,
    reflected: Mask,
}

impl StructuringElement {
    /// Full `width` x `height` rectangle
    pub fn rect(width: u32, height: u32) -> Self {
        Self::from_shape(&GrayImage::from_pixel(width, height, Luma([255u8])))
    }

    /// Ellipse inscribed in a `width` x `height` box. A 3x3 ellipse is a cross.
    pub fn ellipse(width: u32, height: u32) -> Self {
        let (w, h) = (width as i32, height as i32);
        let r = h / 2;
        let c = w / 2;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut shape = GrayImage::new(width, height);
        for i in 0..h {
            let dy = i - r;
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
            for j in (c - dx).max(0)..(c + dx + 1).min(w) {
                shape.put_pixel(j as u32, i as u32, Luma([255u8]));
            }
        }
        Self::from_shape(&shape)
    }

    /// Kernel sides are capped by `EnhanceConfig::validate`, so the anchors fit in a byte
    fn from_shape(shape: &GrayImage) -> Self {
        let (w, h) = shape.dimensions();
        let (ax, ay) = (w / 2, h / 2);
        let flipped = imageops::rotate180(shape);
        Self {
            mask: Mask::from_image(shape, ax as u8, ay as u8),
            reflected: Mask::from_image(&flipped, (w - 1 - ax) as u8, (h - 1 - ay) as u8),
        }
    }
}

pub fn erode(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_erode(image, &element.mask)
}

pub fn dilate(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_dilate(image, &element.mask)
}

/// Erosion followed by dilation with the reflected element. An even-sided
/// rectangle keeps shapes in place instead of shifting them by a pixel.
pub fn open(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_dilate(&erode(image, element), &element.reflected)
}

/// Dilation followed by erosion with the reflected element
pub fn close(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_erode(&dilate(image, element), &element.reflected)
}

/// Closing minus the image: bright where dark features narrower than the
/// element were filled in
pub fn black_hat(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    let closed = close(image, element);
    map_colors2(&closed, image, |c, i| Luma([c[0].saturating_sub(i[0])]))
}

/// Pixel-wise maximum (logical OR on binary masks)
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    map_colors2(a, b, |p, q| Luma([p[0].max(q[0])]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::morphology::grayscale_close;

    fn count_on(img: &GrayImage) -> usize {
        img.pixels().filter(|p| p.0[0] > 0).count()
    }

    #[test]
    fn test_three_by_three_ellipse_is_cross() {
        let cross = StructuringElement::ellipse(3, 3);
        assert_eq!(cross.mask, Mask::diamond(1));
        assert_eq!(cross.reflected, Mask::diamond(1));
    }

    #[test]
    fn test_rect_anchor_for_even_size() {
        let square = GrayImage::from_pixel(2, 2, Luma([255u8]));
        let rect = StructuringElement::rect(2, 2);
        // offsets (-1..=0, -1..=0), reflected (0..=1, 0..=1)
        assert_eq!(rect.mask, Mask::from_image(&square, 1, 1));
        assert_eq!(rect.reflected, Mask::from_image(&square, 0, 0));
    }

    #[test]
    fn test_opening_removes_single_pixel_dust() {
        let mut img = GrayImage::new(20, 20);
        img.put_pixel(3, 3, Luma([255]));
        for y in 8..16 {
            for x in 8..12 {
                img.put_pixel(x, y, Luma([255]));
            }
        }

        let opened = open(&img, &StructuringElement::rect(2, 2));
        assert_eq!(opened.get_pixel(3, 3).0[0], 0);
        // 4px-wide stroke survives unchanged, without shifting
        assert_eq!(count_on(&opened), 32);
        assert_eq!(opened.get_pixel(8, 8).0[0], 255);
        assert_eq!(opened.get_pixel(11, 15).0[0], 255);
        assert_eq!(opened.get_pixel(12, 15).0[0], 0);
    }

    #[test]
    fn test_close_with_cross_matches_imageproc() {
        let img = GrayImage::from_fn(16, 12, |x, y| Luma([((x * 37 + y * 91) % 251) as u8]));
        let cross = StructuringElement::ellipse(3, 3);
        assert_eq!(close(&img, &cross), grayscale_close(&img, &Mask::diamond(1)));
    }

    #[test]
    fn test_black_hat_highlights_small_dark_dot() {
        let mut img = GrayImage::from_pixel(15, 15, Luma([200]));
        img.put_pixel(7, 7, Luma([20]));

        let bh = black_hat(&img, &StructuringElement::ellipse(3, 3));
        assert_eq!(bh.get_pixel(7, 7).0[0], 180);
        assert_eq!(count_on(&bh), 1);
    }

    #[test]
    fn test_black_hat_ignores_wide_dark_region() {
        let img = GrayImage::from_fn(30, 30, |x, _| if x < 15 { Luma([20]) } else { Luma([200]) });
        let bh = black_hat(&img, &StructuringElement::ellipse(3, 3));
        assert_eq!(count_on(&bh), 0);
    }

    #[test]
    fn test_dilate_grows_mask() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 2, Luma([255]));
        let grown = dilate(&img, &StructuringElement::rect(2, 2));
        assert_eq!(count_on(&grown), 4);
    }

    #[test]
    fn test_union_is_pixelwise_or() {
        let mut a = GrayImage::new(3, 1);
        let mut b = GrayImage::new(3, 1);
        a.put_pixel(0, 0, Luma([255]));
        b.put_pixel(2, 0, Luma([255]));
        let u = union(&a, &b);
        assert_eq!(u.as_raw(), &vec![255, 0, 255]);
    }
}
