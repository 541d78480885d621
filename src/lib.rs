pub mod core;
pub mod error;
pub mod export;
pub mod extract;
pub mod ocr;
pub mod pipeline;
pub mod raster;
pub mod zones;

pub use crate::core::geometry::{make_grid_zones, Rect};
pub use crate::core::model::{ExtractionResult, FieldValue, PageImage, PageReport, RunSummary};
pub use crate::core::template::Template;
pub use error::ZoneError;
