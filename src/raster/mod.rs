//! Rasterizer collaborator: turns a document into an ordered sequence of
//! page images, indexed from 0 in arrival order.

pub mod directory;
pub mod pdf;

use crate::core::model::PageImage;
use crate::error::RasterizationError;

pub use directory::ImageDirectory;
pub use pdf::PdfRasterizer;

/// Default rendering resolution for report scans.
pub const DEFAULT_DPI: u32 = 300;

pub trait Rasterizer: Sync {
    fn page_count(&self) -> Result<usize, RasterizationError>;

    fn page_image(&self, index: usize, dpi: u32) -> Result<PageImage, RasterizationError>;

    /// Display name of a page, available even when it fails to decode.
    fn page_name(&self, index: usize) -> String {
        format!("page-{index}")
    }
}
