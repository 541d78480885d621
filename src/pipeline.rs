use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::core::model::{PageReport, PageStatus, RunSummary};
use crate::core::template::Template;
use crate::error::ZoneError;
use crate::export::{Exporter, JsonExporter, TileWriter, VerificationRenderer};
use crate::extract::PageExtractor;
use crate::ocr::{OcrEngine, OcrProvider, OcrSession};
use crate::raster::{Rasterizer, DEFAULT_DPI};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output: PathBuf,
    /// Page that gets the zone overlay, by 0-based index.
    pub verification_page: Option<usize>,
    pub dpi: u32,
    pub workers: usize,
    /// Write crop tiles for every page, not only the verification page.
    pub write_tiles: bool,
}

impl PipelineConfig {
    pub fn new(output: PathBuf) -> Self {
        Self {
            output,
            verification_page: None,
            dpi: DEFAULT_DPI,
            workers: 1,
            write_tiles: true,
        }
    }

    pub fn with_verification_page(mut self, page: Option<usize>) -> Self {
        self.verification_page = page;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_tiles(mut self, write_tiles: bool) -> Self {
        self.write_tiles = write_tiles;
        self
    }
}

/// Rasterizes, extracts and reports every page.
///
/// Template, worker and OCR acquisition problems are fatal and surface before
/// any page is touched. Page and zone failures are recorded in the returned
/// summary. Setting `cancel` lets in-flight pages finish and skips the rest.
pub fn run_pipeline<R, P>(
    config: &PipelineConfig,
    template: &Template,
    rasterizer: &R,
    provider: &P,
    cancel: &AtomicBool,
) -> Result<RunSummary>
where
    R: Rasterizer + ?Sized,
    P: OcrProvider,
    P::Engine: Send,
{
    template
        .validate()
        .map_err(ZoneError::from)
        .context("invalid page template")?;
    if config.workers == 0 {
        return Err(ZoneError::Configuration("worker count must be at least 1".to_string()).into());
    }
    fs::create_dir_all(&config.output)
        .with_context(|| format!("failed to create output directory {}", config.output.display()))?;

    let page_count = rasterizer
        .page_count()
        .map_err(ZoneError::from)
        .context("failed to count pages")?;
    if let Some(page) = config.verification_page {
        if page >= page_count {
            warn!(page, page_count, "verification page is past the last page; no overlay will be written");
        }
    }

    let worker_count = config.workers.min(page_count).max(1);
    let mut sessions = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        sessions.push(
            OcrSession::open(provider)
                .map_err(ZoneError::from)
                .context("failed to acquire OCR engine")?,
        );
    }

    info!(pages = page_count, workers = worker_count, zones = template.zone_count(), "starting extraction");

    let extractor = PageExtractor::from_template(template).map_err(ZoneError::from)?;
    let worker = PageWorker {
        config,
        extractor: &extractor,
        rasterizer,
        tiles: TileWriter::new(config.output.clone()),
        renderer: VerificationRenderer::new(config.output.clone()),
    };
    let cursor = AtomicUsize::new(0);
    let reports = Mutex::new(Vec::with_capacity(page_count));

    thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = sessions
            .into_iter()
            .map(|session| {
                let (worker, cursor, reports) = (&worker, &cursor, &reports);
                scope.spawn(move || worker.drain(session, cursor, page_count, cancel, reports))
            })
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                anyhow::bail!("page worker panicked");
            }
        }
        Ok(())
    })?;

    let mut pages = reports.into_inner();
    pages.sort_by_key(|report| report.index);
    let summary = RunSummary {
        page_count,
        cancelled: cancel.load(Ordering::SeqCst) && pages.len() < page_count,
        pages,
    };

    JsonExporter::new(config.output.clone())
        .export(&summary)
        .context("failed to write results")?;

    info!(
        passed = summary.passed_count(),
        failed = summary.failed_count(),
        skipped = summary.skipped_count(),
        "extraction finished"
    );
    Ok(summary)
}

struct PageWorker<'a, R: ?Sized> {
    config: &'a PipelineConfig,
    extractor: &'a PageExtractor,
    rasterizer: &'a R,
    tiles: TileWriter,
    renderer: VerificationRenderer,
}

impl<R: Rasterizer + ?Sized> PageWorker<'_, R> {
    fn drain<E: OcrEngine>(
        &self,
        mut session: OcrSession<E>,
        cursor: &AtomicUsize,
        page_count: usize,
        cancel: &AtomicBool,
        reports: &Mutex<Vec<PageReport>>,
    ) {
        loop {
            if cancel.load(Ordering::SeqCst) {
                break;
            }
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            if index >= page_count {
                break;
            }
            let report = self.process_page(index, session.engine());
            reports.lock().push(report);
        }
        if let Err(e) = session.finish() {
            warn!("{e}");
        }
    }

    fn process_page(&self, index: usize, ocr: &mut dyn OcrEngine) -> PageReport {
        let page = match self.rasterizer.page_image(index, self.config.dpi) {
            Ok(page) => page,
            Err(e) => {
                error!(page = index, "skipping page: {e}");
                return PageReport::failed(index, self.rasterizer.page_name(index), e.to_string());
            }
        };
        info!(page = index, name = %page.name, "processing page");

        let result = self.extractor.extract_page(&page, ocr);

        let zones = self.extractor.zones();
        let artifacts = if self.config.verification_page == Some(index) {
            self.renderer.render(&page, &zones).map(|_| ())
        } else if self.config.write_tiles {
            self.tiles.write(&page, &zones).map(|_| ())
        } else {
            Ok(())
        };

        match artifacts {
            Ok(()) => PageReport::extracted(index, page.name, result),
            Err(e) => {
                error!(page = index, "failed to write page artifacts: {e:#}");
                PageReport {
                    index,
                    name: page.name,
                    status: PageStatus::Failed {
                        reason: format!("{e:#}"),
                    },
                    result: Some(result),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::PageImage;
    use crate::error::{OcrError, RasterizationError};
    use image::{DynamicImage, RgbaImage};
    use pretty_assertions::assert_eq;

    struct Blank {
        pages: usize,
    }

    impl Rasterizer for Blank {
        fn page_count(&self) -> Result<usize, RasterizationError> {
            Ok(self.pages)
        }

        fn page_image(&self, index: usize, _dpi: u32) -> Result<PageImage, RasterizationError> {
            Ok(PageImage::new(index, format!("page-{index}"), DynamicImage::new_rgba8(1500, 1500)))
        }
    }

    struct Fixed;

    impl OcrEngine for Fixed {
        fn extract_text(&mut self, _image: &RgbaImage) -> Result<String, OcrError> {
            Ok("x".to_string())
        }
    }

    impl OcrProvider for Fixed {
        type Engine = Fixed;

        fn acquire(&self) -> Result<Fixed, OcrError> {
            Ok(Fixed)
        }
    }

    struct Unavailable;

    impl OcrProvider for Unavailable {
        type Engine = Fixed;

        fn acquire(&self) -> Result<Fixed, OcrError> {
            Err(OcrError::EngineUnavailable("no engine".to_string()))
        }
    }

    #[test]
    fn invalid_template_aborts_before_output() -> Result<()> {
        let out = tempfile::tempdir()?;
        let config = PipelineConfig::new(out.path().join("run"));
        let mut template = Template::default();
        template.fields[0].key = "PRM".to_string();

        let err = run_pipeline(&config, &template, &Blank { pages: 1 }, &Fixed, &AtomicBool::new(false))
            .unwrap_err();
        assert!(format!("{err:#}").contains("PRM"));
        assert!(!config.output.exists());
        Ok(())
    }

    #[test]
    fn grid_past_page_coordinates_is_a_template_error() -> Result<()> {
        let out = tempfile::tempdir()?;
        let config = PipelineConfig::new(out.path().join("run"));
        let mut template = Template::default();
        template.grids[1].start_x = 2_000_000_000;
        template.grids[1].pitch = 100_000_000;

        let err = run_pipeline(&config, &template, &Blank { pages: 1 }, &Fixed, &AtomicBool::new(false))
            .unwrap_err();
        assert!(format!("{err:#}").contains("CIS"));
        assert!(matches!(
            err.downcast_ref::<ZoneError>(),
            Some(ZoneError::Geometry(_))
        ));
        assert!(!config.output.exists());
        Ok(())
    }

    #[test]
    fn unavailable_engine_is_fatal() -> Result<()> {
        let out = tempfile::tempdir()?;
        let config = PipelineConfig::new(out.path().to_path_buf());
        let result = run_pipeline(
            &config,
            &Template::default(),
            &Blank { pages: 2 },
            &Unavailable,
            &AtomicBool::new(false),
        );
        assert!(result.is_err());
        assert!(!out.path().join("page-0").exists());
        Ok(())
    }

    #[test]
    fn cancelled_run_skips_all_pages() -> Result<()> {
        let out = tempfile::tempdir()?;
        let config = PipelineConfig::new(out.path().to_path_buf());
        let summary = run_pipeline(
            &config,
            &Template::default(),
            &Blank { pages: 3 },
            &Fixed,
            &AtomicBool::new(true),
        )?;
        assert!(summary.cancelled);
        assert_eq!(summary.pages.len(), 0);
        assert_eq!(summary.skipped_count(), 3);
        assert!(!summary.all_passed());
        Ok(())
    }

    #[test]
    fn zero_workers_is_a_configuration_error() {
        let config = PipelineConfig::new(std::env::temp_dir()).with_workers(0);
        let err = run_pipeline(
            &config,
            &Template::default(),
            &Blank { pages: 1 },
            &Fixed,
            &AtomicBool::new(false),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ZoneError>(),
            Some(ZoneError::Configuration(_))
        ));
    }
}
