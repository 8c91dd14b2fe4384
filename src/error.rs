use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoiError {
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to render page: {0}")]
    RenderFailure(String),

    #[error("Failed to write {}: {message}", .path.display())]
    WriteFailure { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RoiError {
    /// Stable identifier used in logs and `--json` summaries
    pub fn code(&self) -> &'static str {
        match self {
            RoiError::InputNotFound(_) => "INPUT_NOT_FOUND",
            RoiError::PageOutOfRange { .. } => "PAGE_OUT_OF_RANGE",
            RoiError::InvalidBbox(_) => "INVALID_BBOX",
            RoiError::InvalidInput(_) => "INVALID_INPUT",
            RoiError::RenderFailure(_) => "RENDER_FAILURE",
            RoiError::WriteFailure { .. } => "WRITE_FAILURE",
            RoiError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }

    pub fn write_failure(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        RoiError::WriteFailure {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_out_of_range_message() {
        let err = RoiError::PageOutOfRange { index: 3, count: 3 };
        assert_eq!(err.to_string(), "Page 3 out of range (document has 3 pages)");
        assert_eq!(err.code(), "PAGE_OUT_OF_RANGE");
    }

    #[test]
    fn test_write_failure_includes_path() {
        let err = RoiError::write_failure("/tmp/out.pdf", "permission denied");
        assert_eq!(err.to_string(), "Failed to write /tmp/out.pdf: permission denied");
        assert_eq!(err.code(), "WRITE_FAILURE");
    }
}
