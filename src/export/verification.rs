//! Zone placement overlay for manual QA against a real scan.
//!
//! Write-only: nothing here feeds back into extraction.

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use tracing::info;

use crate::core::model::PageImage;
use crate::export::tiles::TileWriter;
use crate::zones::{Zone, ZoneKind};

/// File stem of the overlay. No zone key may use it or its tile would be
/// overwritten.
pub const OVERLAY_STEM: &str = "output";
pub const OVERLAY_FILE: &str = "output.png";

pub const FIELD_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// One entry per permission grid, reused from the start when exhausted.
pub const GRID_PALETTE: [Rgba<u8>; 6] = [
    Rgba([0, 0, 255, 255]),
    Rgba([0, 160, 0, 255]),
    Rgba([255, 0, 255, 255]),
    Rgba([255, 140, 0, 255]),
    Rgba([0, 190, 190, 255]),
    Rgba([128, 0, 128, 255]),
];

const OUTLINE_WIDTH: u32 = 2;

#[derive(Debug, Clone)]
pub struct VerificationArtifact {
    pub overlay: PathBuf,
    pub tiles: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct VerificationRenderer {
    tiles: TileWriter,
}

impl VerificationRenderer {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            tiles: TileWriter::new(out_dir),
        }
    }

    /// Writes the annotated page and one tile per zone.
    pub fn render(&self, page: &PageImage, zones: &[Zone<'_>]) -> Result<VerificationArtifact> {
        let tiles = self.tiles.write(page, zones)?;

        let overlay = self.tiles.page_dir(&page.name).join(OVERLAY_FILE);
        annotate(&page.raster, zones)
            .save(&overlay)
            .with_context(|| format!("failed to write overlay {}", overlay.display()))?;
        info!(page = page.index, path = %overlay.display(), zones = zones.len(), "wrote verification overlay");

        Ok(VerificationArtifact { overlay, tiles })
    }
}

/// Copy of `page` with every zone outlined.
pub fn annotate(page: &RgbaImage, zones: &[Zone<'_>]) -> RgbaImage {
    let mut canvas = page.clone();
    for (zone, color) in zones.iter().zip(zone_colors(zones)) {
        let rect = zone.rect;
        for inset in 0..OUTLINE_WIDTH {
            let width = rect.width().saturating_sub(2 * inset);
            let height = rect.height().saturating_sub(2 * inset);
            if width == 0 || height == 0 {
                break;
            }
            let outline = imageproc::rect::Rect::at(
                rect.x_min().saturating_add(inset as i32),
                rect.y_min().saturating_add(inset as i32),
            )
            .of_size(width, height);
            draw_hollow_rect_mut(&mut canvas, outline, color);
        }
    }
    canvas
}

/// Base fields share [`FIELD_COLOR`]; each grid key takes the next palette
/// entry in first-seen order.
pub fn zone_colors(zones: &[Zone<'_>]) -> Vec<Rgba<u8>> {
    let mut grid_keys: Vec<&str> = Vec::new();
    zones
        .iter()
        .map(|zone| match zone.kind {
            ZoneKind::Field => FIELD_COLOR,
            ZoneKind::Grid => {
                let ordinal = match grid_keys.iter().position(|k| *k == zone.key) {
                    Some(ordinal) => ordinal,
                    None => {
                        grid_keys.push(zone.key);
                        grid_keys.len() - 1
                    }
                };
                GRID_PALETTE[ordinal % GRID_PALETTE.len()]
            }
        })
        .collect()
}
