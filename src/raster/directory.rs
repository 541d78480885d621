use std::fs;
use std::path::{Path, PathBuf};

use crate::core::model::PageImage;
use crate::error::RasterizationError;
use crate::raster::Rasterizer;

/// Pages already rasterized to `*.png` files in one directory.
///
/// Files are ordered by name, with digit runs compared as numbers, so
/// `page-2.png` comes before `page-10.png` and indices are stable across runs.
#[derive(Debug, Clone)]
pub struct ImageDirectory {
    files: Vec<PathBuf>,
}

impl ImageDirectory {
    pub fn open(dir: &Path) -> Result<Self, RasterizationError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some("png") {
                continue;
            }
            files.push(path);
        }
        files.sort_by_cached_key(|path| (natural_key(path), path.clone()));

        Ok(Self { files })
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum NameChunk {
    /// Leading zeros stripped; a longer run is a larger number.
    Number { len: usize, digits: String },
    Text(String),
}

fn natural_key(path: &Path) -> Vec<NameChunk> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut chunks = Vec::new();
    let mut rest = name.as_str();
    while let Some(first) = rest.chars().next() {
        let is_digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        chunks.push(if is_digit {
            let digits = run.trim_start_matches('0').to_string();
            NameChunk::Number {
                len: digits.len(),
                digits,
            }
        } else {
            NameChunk::Text(run.to_string())
        });
        rest = tail;
    }
    chunks
}

impl Rasterizer for ImageDirectory {
    fn page_count(&self) -> Result<usize, RasterizationError> {
        Ok(self.files.len())
    }

    fn page_image(&self, index: usize, _dpi: u32) -> Result<PageImage, RasterizationError> {
        let path = self
            .files
            .get(index)
            .ok_or(RasterizationError::PageOutOfRange {
                index,
                count: self.files.len(),
            })?;
        let image =
            image::open(path).map_err(|source| RasterizationError::Decode { index, source })?;
        Ok(PageImage::new(index, PageImage::display_name(path), image))
    }

    fn page_name(&self, index: usize) -> String {
        self.files
            .get(index)
            .map(|path| PageImage::display_name(path))
            .unwrap_or_else(|| format!("page-{index}"))
    }
}
