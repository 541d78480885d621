use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::core::model::PageImage;
use crate::error::RasterizationError;
use crate::raster::Rasterizer;

/// Renders PDF pages through poppler's `pdfinfo`/`pdftoppm`.
#[derive(Debug)]
pub struct PdfRasterizer {
    path: PathBuf,
    scratch: TempDir,
}

impl PdfRasterizer {
    pub fn new(path: PathBuf) -> Result<Self, RasterizationError> {
        if !path.is_file() {
            return Err(RasterizationError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("PDF not found: {}", path.display()),
            )));
        }
        let scratch = tempfile::Builder::new()
            .prefix("uar-zones-pages-")
            .tempdir()?;
        Ok(Self { path, scratch })
    }
}

impl Rasterizer for PdfRasterizer {
    fn page_count(&self) -> Result<usize, RasterizationError> {
        get_page_count(&self.path)
    }

    fn page_image(&self, index: usize, dpi: u32) -> Result<PageImage, RasterizationError> {
        // pdftoppm uses 1-based page indices
        let page_number = index + 1;
        let prefix = self.scratch.path().join(format!("page-{index}"));

        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(&self.path)
            .arg(&prefix)
            .output()
            .map_err(|e| RasterizationError::Render {
                index,
                reason: format!("failed to invoke pdftoppm; is poppler-utils installed? {e}"),
            })?;

        if !output.status.success() {
            return Err(RasterizationError::Render {
                index,
                reason: format!(
                    "pdftoppm exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        // -singlefile writes exactly `<prefix>.png`
        let image_path = prefix.with_extension("png");
        info!(page = index, path = %image_path.display(), "rendered page");

        let image = image::open(&image_path)
            .map_err(|source| RasterizationError::Decode { index, source })?;
        let _ = std::fs::remove_file(&image_path);

        Ok(PageImage::new(index, format!("page-{index}"), image))
    }
}

fn get_page_count(pdf_path: &Path) -> Result<usize, RasterizationError> {
    let output = Command::new("pdfinfo").arg(pdf_path).output()?;

    if !output.status.success() {
        return Err(RasterizationError::Render {
            index: 0,
            reason: format!("pdfinfo failed with status: {}", output.status),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_page_count(&stdout).ok_or_else(|| RasterizationError::Render {
        index: 0,
        reason: format!(
            "pdfinfo output did not contain a 'Pages:' line for {}",
            pdf_path.display()
        ),
    })
}

fn parse_page_count(pdfinfo: &str) -> Option<usize> {
    let pages: usize = pdfinfo
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))?
        .trim()
        .parse()
        .ok()?;
    debug!(pages, "pdfinfo page count");
    Some(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pdfinfo_pages_line() {
        let out = "Producer:       scanner\nPages:          17\nEncrypted:      no\n";
        assert_eq!(parse_page_count(out), Some(17));
        assert_eq!(parse_page_count("Title: x\n"), None);
        assert_eq!(parse_page_count("Pages: many\n"), None);
    }

    #[test]
    fn missing_pdf_is_rejected() {
        assert!(PdfRasterizer::new(PathBuf::from("/nonexistent/report.pdf")).is_err());
    }
}
