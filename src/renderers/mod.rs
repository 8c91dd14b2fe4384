//! Page renderer implementations
//!
//! This module contains implementations of the PageRenderer trait for
//! different rasterization backends. Optional backends are conditionally
//! compiled based on feature flags.

#[cfg(feature = "renderer-pdfium")]
pub mod pdfium;

pub mod scan;

use crate::error::RoiError;
use crate::renderer::{PageRenderer, RenderDocument};
use serde::Serialize;
use std::path::Path;

/// Information about an available renderer
#[derive(Debug, Clone, Serialize)]
pub struct RendererInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub default: bool,
}

/// Registry of available page renderers
pub struct RendererRegistry {
    renderers: Vec<Box<dyn PageRenderer>>,
    default_renderer: String,
}

impl RendererRegistry {
    /// Create a registry with every compiled-in backend that initializes
    pub fn new() -> Self {
        let mut renderers: Vec<Box<dyn PageRenderer>> = Vec::new();

        #[cfg(feature = "renderer-pdfium")]
        {
            tracing::debug!("Initializing pdfium renderer...");
            match pdfium::PdfiumRenderer::new() {
                Ok(renderer) => renderers.push(Box::new(renderer)),
                Err(e) => tracing::warn!("pdfium renderer unavailable: {}", e),
            }
        }

        renderers.push(Box::new(scan::ScanRenderer));

        let default_renderer = renderers
            .first()
            .map(|r| r.name().to_string())
            .unwrap_or_default();

        Self {
            renderers,
            default_renderer,
        }
    }

    /// Get a renderer by name
    pub fn get(&self, name: &str) -> Option<&dyn PageRenderer> {
        self.renderers
            .iter()
            .find(|r| r.name() == name)
            .map(|r| r.as_ref())
    }

    /// Get the named renderer, or the default one when `name` is `None`
    pub fn select(&self, name: Option<&str>) -> Result<&dyn PageRenderer, RoiError> {
        let wanted = name.unwrap_or(&self.default_renderer);
        self.get(wanted).ok_or_else(|| {
            RoiError::InvalidConfig(format!(
                "Unknown renderer '{}' (available: {})",
                wanted,
                self.list().join(", ")
            ))
        })
    }

    /// Get the default renderer name
    pub fn default_name(&self) -> &str {
        &self.default_renderer
    }

    /// List all available renderer names
    pub fn list(&self) -> Vec<&str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    /// Get info about all available renderers
    pub fn info(&self) -> Vec<RendererInfo> {
        self.renderers
            .iter()
            .map(|r| RendererInfo {
                name: r.name(),
                description: r.description(),
                default: r.name() == self.default_renderer,
            })
            .collect()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Open `path` with `renderer`, reporting a missing file as such
pub fn open_document<'a>(
    renderer: &'a dyn PageRenderer,
    path: &Path,
) -> Result<Box<dyn RenderDocument + 'a>, RoiError> {
    if !path.exists() {
        return Err(RoiError::InputNotFound(path.to_path_buf()));
    }
    renderer.open(path)
}
