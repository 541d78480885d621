use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uar_zones::core::model::{PageStatus, RunSummary};
use uar_zones::ocr::bridge::DEFAULT_PSM;
use uar_zones::ocr::TesseractBridge;
use uar_zones::pipeline::{run_pipeline, PipelineConfig};
use uar_zones::raster::{ImageDirectory, PdfRasterizer, Rasterizer, DEFAULT_DPI};
use uar_zones::{Template, ZoneError};

#[derive(Parser, Debug)]
#[command(name = "uar-zones")]
#[command(version, about = "Extract user access review fields from scanned report pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract fields from every page
    Extract(ExtractArgs),

    /// Print the built-in page template as JSON
    Template {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show information about a PDF file
    Info {
        /// Input PDF file path
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Directory of already rasterized page PNGs
    #[arg(long, env = "CONVERT_PATH")]
    images: Option<PathBuf>,

    /// PDF to rasterize (takes precedence over --images)
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Output directory for tiles, overlay and results.json
    #[arg(short, long, env = "OUTPUT_PATH")]
    output: PathBuf,

    /// 0-based index of the page to draw the zone overlay on. Image
    /// directories are indexed in natural file name order (page-2 before
    /// page-10)
    #[arg(long, env = "TESTING_PAGE_NUMBER")]
    verify_page: Option<usize>,

    /// Rendering DPI when rasterizing a PDF
    #[arg(long, default_value_t = DEFAULT_DPI)]
    dpi: u32,

    /// Pages processed in parallel, one OCR engine each
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// JSON template replacing the built-in zone layout
    #[arg(long)]
    template: Option<PathBuf>,

    /// Tesseract language
    #[arg(long, default_value = "eng")]
    lang: String,

    /// Tesseract page segmentation mode (7 forces single-line reads)
    #[arg(long, default_value_t = DEFAULT_PSM)]
    psm: u8,

    /// Only write crop tiles for the verification page
    #[arg(long)]
    no_tiles: bool,

    /// Disable progress output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uar_zones=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract(args) => extract(args).await,
        Commands::Template { output } => print_template(output),
        Commands::Info { input } => show_info(input),
    }
}

async fn extract(args: ExtractArgs) -> Result<()> {
    let template = match &args.template {
        Some(path) => Template::from_json_file(path)?,
        None => Template::default(),
    };

    let rasterizer: Box<dyn Rasterizer + Send> = match (&args.pdf, &args.images) {
        (Some(pdf), _) => Box::new(
            PdfRasterizer::new(pdf.clone())
                .with_context(|| format!("Failed to open PDF: {}", pdf.display()))?,
        ),
        (None, Some(dir)) => Box::new(
            ImageDirectory::open(dir)
                .with_context(|| format!("Failed to read page images from {}", dir.display()))?,
        ),
        (None, None) => {
            return Err(ZoneError::Configuration(
                "no page source: pass --pdf or --images (or set CONVERT_PATH)".to_string(),
            )
            .into())
        }
    };

    let config = PipelineConfig::new(args.output.clone())
        .with_verification_page(args.verify_page)
        .with_dpi(args.dpi)
        .with_workers(args.workers)
        .with_tiles(!args.no_tiles);
    let provider = TesseractBridge::new()
        .with_lang(args.lang.clone())
        .with_psm(args.psm);

    if !args.quiet {
        println!("[*] Output: {}", config.output.display());
        if let Some(page) = config.verification_page {
            println!("[*] Verification page: {page}");
        }
        println!("[*] Workers: {}", config.workers);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    tokio::spawn(cancel_on_ctrl_c(Arc::clone(&cancel)));

    let summary = tokio::task::spawn_blocking(move || {
        run_pipeline(&config, &template, rasterizer.as_ref(), &provider, &cancel)
    })
    .await
    .context("extraction task failed")??;

    if !args.quiet {
        print_summary(&summary);
    }

    if summary.cancelled {
        anyhow::bail!("run cancelled after {} of {} page(s)", summary.pages.len(), summary.page_count);
    }
    if summary.failed_count() > 0 {
        anyhow::bail!("{} page(s) did not pass", summary.failed_count());
    }
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: Arc<AtomicBool>) {
    if signal::ctrl_c().await.is_ok() {
        tracing::warn!("Received Ctrl+C, finishing in-flight pages...");
        cancel.store(true, Ordering::SeqCst);
    }
}

fn print_summary(summary: &RunSummary) {
    for page in &summary.pages {
        match &page.status {
            PageStatus::Passed => println!("  [✓] {} ({})", page.name, page.index),
            PageStatus::Incomplete => {
                let failed = page.result.as_ref().map_or(0, |r| r.failed.len());
                println!("  [~] {} ({}): {failed} zone(s) failed", page.name, page.index);
            }
            PageStatus::Failed { reason } => {
                eprintln!("  [✗] {} ({}): {reason}", page.name, page.index)
            }
        }
    }
    println!(
        "\n[*] Summary: {} passed, {} failed, {} skipped",
        summary.passed_count(),
        summary.failed_count(),
        summary.skipped_count()
    );
}

fn print_template(output: Option<PathBuf>) -> Result<()> {
    let json = Template::default().to_json()?;
    match output {
        Some(path) => fs::write(&path, json)
            .with_context(|| format!("Failed to write template to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn show_info(input: PathBuf) -> Result<()> {
    let rasterizer = PdfRasterizer::new(input.clone())
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;
    let page_count = rasterizer.page_count()?;

    println!("PDF Information");
    println!("===============");
    println!("File: {}", input.display());
    println!("Pages: {}", page_count);

    Ok(())
}
