use crate::config::{DotAreaBand, EnhanceConfig};
use crate::enhance::morphology::{self, StructuringElement};
use crate::enhance::steps::normalize;
use image::{GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::region_labelling::{connected_components, Connectivity};

/// Black-hat response with a dot-sized element, stretched to 0..=255
///
/// Only dark features the element cannot fit inside are filled by the
/// closing, so `blackhat_kernel` must be wider than the widest dot. Convex
/// corners of large dark shapes also respond, with a residue per corner that
/// grows with the kernel (1 px at 3, 4 px at 7, 6 px at 9); `dot_area.min_area`
/// has to sit above it.
pub fn black_hat_response(denoised: &GrayImage, config: &EnhanceConfig) -> GrayImage {
    let element = StructuringElement::ellipse(config.blackhat_kernel, config.blackhat_kernel);
    normalize::stretch(&morphology::black_hat(denoised, &element))
}

/// Decimal-mark mask from a normalized black-hat response: Otsu binarization,
/// then only components whose area lies in the configured band survive.
pub fn apply(response: &GrayImage, config: &EnhanceConfig) -> GrayImage {
    let binary = threshold(response, otsu_level(response), ThresholdType::Binary);
    filter_components_by_area(&binary, &config.dot_area)
}

/// Keep 8-connected foreground components whose pixel area is inside `band`
pub fn filter_components_by_area(binary: &GrayImage, band: &DotAreaBand) -> GrayImage {
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));

    let max_label = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;
    let mut areas = vec![0u32; max_label + 1];
    for p in labels.pixels() {
        areas[p.0[0] as usize] += 1;
    }

    let kept = areas
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, area)| band.contains(**area))
        .count();
    tracing::debug!(
        "Decimal candidates: {} components, {} inside area band {}..={}",
        max_label,
        kept,
        band.min_area,
        band.max_area
    );

    GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
        let label = labels.get_pixel(x, y).0[0] as usize;
        if label > 0 && band.contains(areas[label]) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
