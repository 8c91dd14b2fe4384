//! Image enhancement for meter-display regions
//!
//! Provides preset pipelines that turn a rendered region into either a
//! lightly cleaned grayscale image or a binary digit mask that keeps the
//! decimal mark.

pub mod blur;
pub mod morphology;
pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, Preset, StepTiming};
