//! Error taxonomy for the extraction engine.
//!
//! Fatal errors (`Configuration`, `Geometry`) abort a run before any page is
//! processed. `Rasterization` is fatal for one page only and `Ocr` for one
//! zone only; both are recorded by the pipeline instead of propagated.

use thiserror::Error;

/// Template authoring defects, detected once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("rectangle ({x_min},{y_min})-({x_max},{y_max}) has zero or negative area")]
    InvalidBounds {
        x_min: i64,
        y_min: i64,
        x_max: i64,
        y_max: i64,
    },

    #[error("rectangle ({x_min},{y_min})-({x_max},{y_max}) does not fit in page coordinates")]
    OutOfRange {
        x_min: i64,
        y_min: i64,
        x_max: i64,
        y_max: i64,
    },

    #[error("zone {key}: {cause}")]
    Zone {
        key: String,
        cause: Box<GeometryError>,
    },

    #[error("zone key {0} is declared more than once")]
    DuplicateKey(String),

    #[error("zone key {0} is reserved for the verification overlay")]
    ReservedKey(String),
}

/// OCR failures for a single crop.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("empty input bitmap ({width}x{height})")]
    EmptyInput { width: u32, height: u32 },

    #[error("OCR processing failed: {0}")]
    Processing(String),

    #[error("failed to release OCR engine: {0}")]
    Release(String),
}

/// Upstream page-image failures.
#[derive(Debug, Error)]
pub enum RasterizationError {
    #[error("page {index} is out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("failed to render page {index}: {reason}")]
    Render { index: usize, reason: String },

    #[error("failed to decode page {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read page source: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for the engine.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("template error: {0}")]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Rasterization(#[from] RasterizationError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ZoneError>;
