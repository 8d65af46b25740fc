//! Error types for bump-bond analyses.

use std::io;
use std::path::PathBuf;

use common::file_format::FileExtensionError;
use common::GridShape;
use thiserror::Error;

/// Errors that can occur while loading, classifying or persisting detector maps.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to encode '{path}': {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Unsupported file '{path}': {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: FileExtensionError,
    },

    #[error("Object '{object}' not found in '{path}'")]
    MissingObject { path: PathBuf, object: String },

    #[error("Object '{object}' in '{path}' is not a {expected}")]
    WrongObjectKind {
        path: PathBuf,
        object: String,
        expected: &'static str,
    },

    #[error("Canvas '{object}' in '{path}' has no histogram primitive")]
    NoHistogramPrimitive { path: PathBuf, object: String },

    #[error("Histogram '{name}' is inconsistent: {reason}")]
    InvalidHistogram { name: String, reason: String },

    #[error("Dimension mismatch for {grid}: expected {expected}, got {actual}")]
    DimensionMismatch {
        grid: String,
        expected: GridShape,
        actual: GridShape,
    },

    #[error("Grid {shape} is too small, at least 2 rows and 2 columns are required")]
    GridTooSmall { shape: GridShape },

    #[error("Threshold {name} = {value} is outside [0, 1]")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Enable mask line {line}: {reason}")]
    MaskParse { line: usize, reason: String },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to render '{path}': {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_names_grid() {
        let err = Error::DimensionMismatch {
            grid: "coupled_injection".to_string(),
            expected: GridShape::new(336, 432),
            actual: GridShape::new(336, 400),
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch for coupled_injection: expected 336x432, got 336x400"
        );
    }

    #[test]
    fn test_missing_object_error_message() {
        let err = Error::MissingObject {
            path: PathBuf::from("Run000059_PixelAlive.json"),
            object: "Detector/Board_0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Object 'Detector/Board_0' not found in 'Run000059_PixelAlive.json'"
        );
    }

    #[test]
    fn test_threshold_error_message() {
        let err = Error::ThresholdOutOfRange {
            name: "alive_efficiency",
            value: 1.5,
        };
        assert_eq!(
            err.to_string(),
            "Threshold alive_efficiency = 1.5 is outside [0, 1]"
        );
    }

    #[test]
    fn test_open_error_has_source() {
        use std::error::Error as StdError;

        let err = Error::Open {
            path: PathBuf::from("/missing.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/missing.json"));
    }

    #[test]
    fn test_mask_parse_error_message() {
        let err = Error::MaskParse {
            line: 7,
            reason: "ENABLE before any COL".to_string(),
        };
        assert_eq!(err.to_string(), "Enable mask line 7: ENABLE before any COL");
    }
}
