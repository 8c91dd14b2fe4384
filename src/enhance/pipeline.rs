use crate::config::EnhanceConfig;
use crate::error::RoiError;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// Enhancement preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Preset {
    /// Rendered pixels untouched, still RGB
    Raw,
    /// Grayscale, autocontrast, optional unsharp mask
    /// Steps: grayscale, autocontrast, sharpen
    #[default]
    Light,
    /// Binary digit mask that keeps the decimal mark
    /// Steps: grayscale, illumination, clahe, denoise, digits, blackhat, dots, combine
    Mask,
}

impl Preset {
    /// Get the preset name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Light => "light",
            Self::Mask => "mask",
        }
    }
}

/// Timing information for a single enhancement step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of enhancement including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct EnhanceResult {
    /// Enhanced image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Intermediate images by stage name, only when requested
    #[serde(skip)]
    pub stages: Vec<(&'static str, GrayImage)>,
    /// Total enhancement time in milliseconds
    pub total_time_ms: u64,
    /// Preset used
    pub preset: String,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Enhancement pipeline that applies steps based on preset
pub struct Pipeline {
    preset: Preset,
    config: EnhanceConfig,
    sharpen: bool,
    keep_stages: bool,
}

impl Pipeline {
    pub fn new(preset: Preset, config: EnhanceConfig) -> Self {
        Self {
            preset,
            config,
            sharpen: true,
            keep_stages: false,
        }
    }

    /// Enable or disable the unsharp step of the light preset
    pub fn with_sharpen(mut self, sharpen: bool) -> Self {
        self.sharpen = sharpen;
        self
    }

    /// Keep every intermediate image in the result
    pub fn with_stages(mut self, keep: bool) -> Self {
        self.keep_stages = keep;
        self
    }

    /// Process an image according to the configured preset
    pub fn process(&self, image: &DynamicImage) -> Result<EnhanceResult, RoiError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RoiError::InvalidInput(format!(
                "Cannot enhance an empty {}x{} image",
                image.width(),
                image.height()
            )));
        }

        let start = Instant::now();
        let mut timings = Vec::new();
        let mut stages = Vec::new();

        let output = match self.preset {
            Preset::Raw => image.clone(),
            Preset::Light => {
                let gray = self.run_step("grayscale", &mut timings, &mut stages, || {
                    steps::grayscale::apply(image)
                });
                let mut img = self.run_step("autocontrast", &mut timings, &mut stages, || {
                    steps::normalize::stretch(&gray)
                });
                if self.sharpen {
                    img = self.run_step("sharpen", &mut timings, &mut stages, || {
                        steps::sharpen::apply(&img)
                    });
                }
                DynamicImage::ImageLuma8(img)
            }
            Preset::Mask => DynamicImage::ImageLuma8(self.mask(image, &mut timings, &mut stages)),
        };

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Enhanced {}x{} image with preset '{}' in {}ms",
            image.width(),
            image.height(),
            self.preset.as_str(),
            total_time_ms
        );

        Ok(EnhanceResult {
            image: output,
            stages,
            total_time_ms,
            preset: self.preset.as_str().to_string(),
            steps: timings,
        })
    }

    fn mask(
        &self,
        image: &DynamicImage,
        timings: &mut Vec<StepTiming>,
        stages: &mut Vec<(&'static str, GrayImage)>,
    ) -> GrayImage {
        let config = &self.config;

        let gray = self.run_step("gray", timings, stages, || {
            steps::grayscale::dark_on_light(steps::grayscale::apply(image))
        });
        let flat = self.run_step("illumination", timings, stages, || {
            steps::illumination::apply(&gray, config)
        });
        let equalized = self.run_step("clahe", timings, stages, || steps::clahe::apply(&flat, config));
        let denoised = self.run_step("denoised", timings, stages, || {
            steps::denoise::apply(&equalized, config)
        });

        // both extraction branches read the same denoised image
        let digits = self.run_step("digits", timings, stages, || {
            steps::threshold::apply(&denoised, config)
        });
        let response = self.run_step("blackhat", timings, stages, || {
            steps::decimal::black_hat_response(&denoised, config)
        });
        let dots = self.run_step("dots", timings, stages, || steps::decimal::apply(&response, config));

        self.run_step("mask", timings, stages, || steps::combine::apply(&digits, &dots, config))
    }

    fn run_step<F>(
        &self,
        name: &'static str,
        timings: &mut Vec<StepTiming>,
        stages: &mut Vec<(&'static str, GrayImage)>,
        step_fn: F,
    ) -> GrayImage
    where
        F: FnOnce() -> GrayImage,
    {
        let step_start = Instant::now();
        let result = step_fn();
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!("Step '{}' took {}ms", name, time_ms);
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        if self.keep_stages {
            stages.push((name, result.clone()));
        }
        result
    }
}
