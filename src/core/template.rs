//! Page template: where each field lives on a report page.
//!
//! Base fields are literal rectangles; permission matrices are parametric
//! grids expanded through [`make_grid_zones`].

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::geometry::{make_grid_zones, Rect};
use crate::error::GeometryError;
use crate::export::verification::OVERLAY_STEM;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridSpec {
    pub key: String,
    pub start_x: i32,
    pub start_y: i32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub columns: usize,
    pub pitch: u32,
}

impl GridSpec {
    pub fn cells(&self) -> Result<Vec<Rect>, GeometryError> {
        make_grid_zones(
            self.start_x,
            self.start_y,
            self.cell_width,
            self.cell_height,
            self.columns,
            self.pitch,
        )
        .map_err(|cause| zone_error(&self.key, cause))
    }
}

/// Declaration order of `fields` and `grids` is the processing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    pub fields: Vec<FieldSpec>,
    pub grids: Vec<GridSpec>,
}

const PERMISSION_CELL_WIDTH: u32 = 11;
const PERMISSION_CELL_HEIGHT: u32 = 40;
const PERMISSION_COLUMNS: usize = 12;

fn field(key: &str, rect: Rect) -> FieldSpec {
    FieldSpec {
        key: key.to_string(),
        rect,
    }
}

fn permission_grid(key: &str, start_x: i32, start_y: i32) -> GridSpec {
    GridSpec {
        key: key.to_string(),
        start_x,
        start_y,
        cell_width: PERMISSION_CELL_WIDTH,
        cell_height: PERMISSION_CELL_HEIGHT,
        columns: PERMISSION_COLUMNS,
        pitch: PERMISSION_CELL_WIDTH,
    }
}

impl Default for Template {
    /// The user access review report layout, measured on 300 DPI scans.
    fn default() -> Self {
        Self {
            fields: vec![
                field("username", Rect::new(0, 150, 175, 173)),
                field("name", Rect::new(0, 175, 280, 196)),
                field("email", Rect::new(450, 175, 1440, 196)),
                field("groups", Rect::new(180, 850, 1440, 1440)),
            ],
            grids: vec![
                permission_grid("PRM", 32, 355),
                permission_grid("CIS", 174, 355),
            ],
        }
    }
}

impl Template {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read template {}", path.display()))?;
        let template: Template = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse template {}", path.display()))?;
        Ok(template)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects empty or out-of-range rectangles, keys declared twice
    /// anywhere in the template, and the overlay's reserved file stem.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let mut seen = HashSet::new();
        let keys = self
            .fields
            .iter()
            .map(|f| &f.key)
            .chain(self.grids.iter().map(|g| &g.key));
        for key in keys {
            if key == OVERLAY_STEM {
                return Err(GeometryError::ReservedKey(key.clone()));
            }
            if !seen.insert(key.as_str()) {
                return Err(GeometryError::DuplicateKey(key.clone()));
            }
        }

        for spec in &self.fields {
            let rect = spec.rect;
            Rect::try_new(
                rect.x_min().into(),
                rect.y_min().into(),
                rect.x_max().into(),
                rect.y_max().into(),
            )
            .map_err(|cause| zone_error(&spec.key, cause))?;
        }
        for grid in &self.grids {
            grid.cells()?;
        }
        Ok(())
    }

    pub fn zone_count(&self) -> usize {
        self.fields.len() + self.grids.iter().map(|g| g.columns).sum::<usize>()
    }
}

fn zone_error(key: &str, cause: GeometryError) -> GeometryError {
    GeometryError::Zone {
        key: key.to_string(),
        cause: Box::new(cause),
    }
}
