use image::RgbaImage;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::core::crop::crop;
use crate::core::geometry::Rect;
use crate::core::model::{ExtractionResult, FieldValue};
use crate::core::template::FieldSpec;
use crate::ocr::OcrEngine;
use crate::zones::{Zone, ZoneKind, ZoneSet};

/// Single-rectangle fields: username, name, email, groups.
#[derive(Debug, Clone, Default)]
pub struct FieldZones {
    zones: IndexMap<String, Rect>,
}

impl FieldZones {
    pub fn new(specs: &[FieldSpec]) -> Self {
        Self {
            zones: specs
                .iter()
                .map(|spec| (spec.key.clone(), spec.rect))
                .collect(),
        }
    }
}

impl ZoneSet for FieldZones {
    fn zones(&self) -> Vec<Zone<'_>> {
        self.zones
            .iter()
            .map(|(key, rect)| Zone {
                key,
                index: None,
                rect: *rect,
                kind: ZoneKind::Field,
            })
            .collect()
    }

    fn parse(&self, page: &RgbaImage, ocr: &mut dyn OcrEngine) -> ExtractionResult {
        let mut result = ExtractionResult::new();
        for (key, rect) in &self.zones {
            let tile = crop(page, rect);
            let text = match ocr.recognize(&tile) {
                Ok(text) => {
                    debug!(zone = %key, %text, "extracted field");
                    text
                }
                Err(e) => {
                    warn!(zone = %key, "OCR failed: {e}");
                    result.record_failure(key, None, e.to_string());
                    String::new()
                }
            };
            result.values.insert(key.clone(), FieldValue::Single(text));
        }
        result
    }
}
