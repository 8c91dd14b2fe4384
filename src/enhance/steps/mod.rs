//! Individual enhancement stages

pub mod clahe;
pub mod combine;
pub mod decimal;
pub mod denoise;
pub mod grayscale;
pub mod illumination;
pub mod normalize;
pub mod sharpen;
pub mod threshold;
