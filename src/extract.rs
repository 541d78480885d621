//! Applies every zone set to every page and merges their outputs.

use tracing::{error, info};

use crate::core::model::{ExtractionResult, PageImage};
use crate::core::template::Template;
use crate::error::GeometryError;
use crate::ocr::OcrEngine;
use crate::zones::{FieldZones, GridZones, Zone, ZoneSet};

#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub index: usize,
    pub name: String,
    pub result: ExtractionResult,
}

pub struct PageExtractor {
    zone_sets: Vec<Box<dyn ZoneSet>>,
}

impl PageExtractor {
    pub fn new(zone_sets: Vec<Box<dyn ZoneSet>>) -> Self {
        Self { zone_sets }
    }

    /// Base fields first, then the permission grids.
    pub fn from_template(template: &Template) -> Result<Self, GeometryError> {
        let zone_sets: Vec<Box<dyn ZoneSet>> = vec![
            Box::new(FieldZones::new(&template.fields)),
            Box::new(GridZones::new(&template.grids)?),
        ];
        Ok(Self::new(zone_sets))
    }

    /// Every rectangle fed to extraction, in processing order.
    pub fn zones(&self) -> Vec<Zone<'_>> {
        self.zone_sets.iter().flat_map(|set| set.zones()).collect()
    }

    pub fn extract_page(&self, page: &PageImage, ocr: &mut dyn OcrEngine) -> ExtractionResult {
        let mut merged = ExtractionResult::new();
        for set in &self.zone_sets {
            let partial = set.parse(&page.raster, ocr);
            for key in merged.merge(partial) {
                error!(page = page.index, zone = %key, "zone key declared by more than one zone set");
            }
        }
        merged
    }

    /// Extracts pages in arrival order. Each page is independent of the
    /// others.
    pub fn run<I>(&self, pages: I, ocr: &mut dyn OcrEngine) -> Vec<PageExtraction>
    where
        I: IntoIterator<Item = PageImage>,
    {
        let mut extractions: Vec<PageExtraction> = pages
            .into_iter()
            .map(|page| {
                info!(page = page.index, name = %page.name, "extracting page");
                let result = self.extract_page(&page, ocr);
                PageExtraction {
                    index: page.index,
                    name: page.name,
                    result,
                }
            })
            .collect();
        extractions.sort_by_key(|e| e.index);
        extractions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Rect;
    use crate::core::template::{FieldSpec, GridSpec};
    use crate::error::OcrError;
    use image::{DynamicImage, RgbaImage};
    use pretty_assertions::assert_eq;

    struct EchoSize;

    impl OcrEngine for EchoSize {
        fn extract_text(&mut self, image: &RgbaImage) -> Result<String, OcrError> {
            Ok(format!("{}x{}", image.width(), image.height()))
        }
    }

    fn template() -> Template {
        Template {
            fields: vec![FieldSpec {
                key: "email".into(),
                rect: Rect::new(0, 0, 30, 8),
            }],
            grids: vec![GridSpec {
                key: "PRM".into(),
                start_x: 0,
                start_y: 10,
                cell_width: 4,
                cell_height: 6,
                columns: 3,
                pitch: 5,
            }],
        }
    }

    fn blank_page(index: usize) -> PageImage {
        PageImage::new(index, format!("page-{index}"), DynamicImage::new_rgba8(40, 20))
    }

    #[test]
    fn merges_fields_and_grids() {
        let extractor = PageExtractor::from_template(&template()).unwrap();
        let result = extractor.extract_page(&blank_page(0), &mut EchoSize);

        assert_eq!(result.value("email"), Some("30x8"));
        assert_eq!(
            result.grid("PRM"),
            Some(&["4x6".to_string(), "4x6".to_string(), "4x6".to_string()][..])
        );
        assert_eq!(extractor.zones().len(), 4);
    }

    #[test]
    fn colliding_keys_keep_first_set() {
        let zone_sets: Vec<Box<dyn ZoneSet>> = vec![
            Box::new(FieldZones::new(&template().fields)),
            Box::new(GridZones::from_cells([(
                "email".to_string(),
                vec![Rect::new(0, 0, 2, 2)],
            )])),
        ];
        let extractor = PageExtractor::new(zone_sets);
        let result = extractor.extract_page(&blank_page(0), &mut EchoSize);
        assert_eq!(result.value("email"), Some("30x8"));
        assert_eq!(result.values.len(), 1);
    }

    #[test]
    fn run_returns_one_entry_per_page_in_index_order() {
        let extractor = PageExtractor::from_template(&template()).unwrap();
        let pages = vec![blank_page(2), blank_page(0), blank_page(1)];
        let extractions = extractor.run(pages, &mut EchoSize);

        let indices: Vec<_> = extractions.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(extractions[1].name, "page-1");
    }
}
