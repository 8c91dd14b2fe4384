use crate::config::EnhanceConfig;
use crate::enhance::morphology::{self, StructuringElement};
use image::GrayImage;

/// Final mask: digit strokes OR decimal dots, thickened by a small dilation
pub fn apply(digits: &GrayImage, dots: &GrayImage, config: &EnhanceConfig) -> GrayImage {
    let merged = morphology::union(digits, dots);
    let element = StructuringElement::rect(config.dilate_kernel, config.dilate_kernel);
    morphology::dilate(&merged, &element)
}
