use std::path::Path;

use image::{DynamicImage, RgbaImage};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identifier of a logical field on the template (`"username"`, `"PRM"`, ...).
pub type ZoneKey = String;

/// One decoded document page.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub index: usize,
    pub name: String,
    pub raster: RgbaImage,
}

impl PageImage {
    pub fn new(index: usize, name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            index,
            name: name.into(),
            raster: image.into_rgba8(),
        }
    }

    /// Display name for a page file: its file name without extension.
    pub fn display_name(path: &Path) -> String {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }
}

/// Extracted text for a ZoneKey: one string for base fields, one per column
/// for permission grids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Grid(Vec<String>),
}

impl FieldValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            FieldValue::Single(text) => Some(text),
            FieldValue::Grid(_) => None,
        }
    }

    pub fn as_grid(&self) -> Option<&[String]> {
        match self {
            FieldValue::Grid(columns) => Some(columns),
            FieldValue::Single(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedZone {
    pub key: ZoneKey,
    /// Grid column, `None` for base fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub reason: String,
}

/// Merged output of every zone set for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionResult {
    pub values: IndexMap<ZoneKey, FieldValue>,
    pub failed: Vec<FailedZone>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(FieldValue::as_single)
    }

    pub fn grid(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).and_then(FieldValue::as_grid)
    }

    pub fn is_failed(&self, key: &str) -> bool {
        self.failed.iter().any(|f| f.key == key)
    }

    pub fn is_cell_failed(&self, key: &str, index: usize) -> bool {
        self.failed
            .iter()
            .any(|f| f.key == key && f.index == Some(index))
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub(crate) fn record_failure(&mut self, key: &str, index: Option<usize>, reason: String) {
        self.failed.push(FailedZone {
            key: key.to_string(),
            index,
            reason,
        });
    }

    /// Folds `other` into `self`, returning keys present in both. Colliding
    /// keys keep the value already recorded.
    pub fn merge(&mut self, other: ExtractionResult) -> Vec<ZoneKey> {
        let mut collisions = Vec::new();
        for (key, value) in other.values {
            if self.values.contains_key(&key) {
                collisions.push(key);
                continue;
            }
            self.values.insert(key, value);
        }
        self.failed.extend(
            other
                .failed
                .into_iter()
                .filter(|f| !collisions.contains(&f.key)),
        );
        collisions
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PageStatus {
    /// Every zone extracted and every artifact written.
    Passed,
    /// Extraction ran to completion but some zones failed OCR.
    Incomplete,
    /// The page could not be processed (rasterization or artifact I/O).
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub index: usize,
    pub name: String,
    #[serde(flatten)]
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExtractionResult>,
}

impl PageReport {
    pub fn extracted(index: usize, name: String, result: ExtractionResult) -> Self {
        let status = if result.has_failures() {
            PageStatus::Incomplete
        } else {
            PageStatus::Passed
        };
        Self {
            index,
            name,
            status,
            result: Some(result),
        }
    }

    pub fn failed(index: usize, name: String, reason: impl Into<String>) -> Self {
        Self {
            index,
            name,
            status: PageStatus::Failed {
                reason: reason.into(),
            },
            result: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == PageStatus::Passed
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub page_count: usize,
    pub pages: Vec<PageReport>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn passed_count(&self) -> usize {
        self.pages.iter().filter(|p| p.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.pages.len() - self.passed_count()
    }

    pub fn skipped_count(&self) -> usize {
        self.page_count.saturating_sub(self.pages.len())
    }

    pub fn all_passed(&self) -> bool {
        !self.cancelled && self.skipped_count() == 0 && self.failed_count() == 0
    }
}
