//! Zone sets: named rectangles on the page template plus the logic that
//! turns their crops into recorded values.

pub mod fields;
pub mod grid;

use image::RgbaImage;
use serde::Serialize;

use crate::core::geometry::Rect;
use crate::core::model::ExtractionResult;
use crate::ocr::OcrEngine;

pub use fields::FieldZones;
pub use grid::GridZones;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// One rectangle per key.
    Field,
    /// One rectangle per column of a repeating grid.
    Grid,
}

/// A single rectangle as fed to extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone<'a> {
    pub key: &'a str,
    pub index: Option<usize>,
    pub rect: Rect,
    pub kind: ZoneKind,
}

impl Zone<'_> {
    /// `<key>` for base fields, `<key>_<index>` for grid cells.
    pub fn tile_name(&self) -> String {
        match self.index {
            Some(index) => format!("{}_{index}", self.key),
            None => self.key.to_string(),
        }
    }
}

/// Read-only after construction; every `parse` call builds a fresh result.
pub trait ZoneSet: Send + Sync {
    /// Every rectangle in declaration order (grid cells in column order).
    fn zones(&self) -> Vec<Zone<'_>>;

    /// Crops and OCRs every zone. A failing zone is recorded with an empty
    /// placeholder; it never aborts the page.
    fn parse(&self, page: &RgbaImage, ocr: &mut dyn OcrEngine) -> ExtractionResult;
}
