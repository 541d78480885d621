use image::RgbaImage;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::core::crop::crop;
use crate::core::geometry::Rect;
use crate::core::model::{ExtractionResult, FieldValue};
use crate::core::template::GridSpec;
use crate::error::GeometryError;
use crate::ocr::OcrEngine;
use crate::zones::{Zone, ZoneKind, ZoneSet};

/// Permission matrices: one rectangle per flag column.
#[derive(Debug, Clone, Default)]
pub struct GridZones {
    grids: IndexMap<String, Vec<Rect>>,
}

impl GridZones {
    pub fn new(specs: &[GridSpec]) -> Result<Self, GeometryError> {
        let grids = specs
            .iter()
            .map(|spec| spec.cells().map(|cells| (spec.key.clone(), cells)))
            .collect::<Result<_, GeometryError>>()?;
        Ok(Self { grids })
    }

    #[cfg(test)]
    pub(crate) fn from_cells<I>(grids: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<Rect>)>,
    {
        Self {
            grids: grids.into_iter().collect(),
        }
    }
}

impl ZoneSet for GridZones {
    fn zones(&self) -> Vec<Zone<'_>> {
        self.grids
            .iter()
            .flat_map(|(key, cells)| {
                cells.iter().enumerate().map(move |(index, rect)| Zone {
                    key,
                    index: Some(index),
                    rect: *rect,
                    kind: ZoneKind::Grid,
                })
            })
            .collect()
    }

    fn parse(&self, page: &RgbaImage, ocr: &mut dyn OcrEngine) -> ExtractionResult {
        let mut result = ExtractionResult::new();
        for (key, cells) in &self.grids {
            // failed columns keep their slot so consumers can align by index
            let mut columns = Vec::with_capacity(cells.len());
            for (index, rect) in cells.iter().enumerate() {
                let tile = crop(page, rect);
                match ocr.recognize(&tile) {
                    Ok(text) => {
                        debug!(zone = %key, column = index, %text, "extracted permission");
                        columns.push(text);
                    }
                    Err(e) => {
                        warn!(zone = %key, column = index, "OCR failed: {e}");
                        result.record_failure(key, Some(index), e.to_string());
                        columns.push(String::new());
                    }
                }
            }
            result.values.insert(key.clone(), FieldValue::Grid(columns));
        }
        result
    }
}
