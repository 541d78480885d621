use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::crop::crop;
use crate::core::model::PageImage;
use crate::zones::Zone;

/// Writes one PNG per zone under `<out_dir>/<page name>/`.
#[derive(Debug, Clone)]
pub struct TileWriter {
    out_dir: PathBuf,
}

impl TileWriter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn page_dir(&self, page_name: &str) -> PathBuf {
        self.out_dir.join(page_name)
    }

    pub fn write(&self, page: &PageImage, zones: &[Zone<'_>]) -> Result<Vec<PathBuf>> {
        let dir = self.page_dir(&page.name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        zones
            .iter()
            .map(|zone| write_tile(&dir, page, zone))
            .collect()
    }
}

fn write_tile(dir: &Path, page: &PageImage, zone: &Zone<'_>) -> Result<PathBuf> {
    let path = dir.join(format!("{}.png", zone.tile_name()));
    crop(&page.raster, &zone.rect)
        .save(&path)
        .with_context(|| format!("failed to write tile {}", path.display()))?;
    Ok(path)
}
