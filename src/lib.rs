//! Passports - Core Library
//!
//! Fetches a range of Passport data pages, lays them out two to a sheet next
//! to the fixed background half, rasterizes every sheet and concatenates the
//! sheets into one printable PDF.

use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

pub mod composer;
pub mod document_builder;
pub mod error;
pub mod fetcher;
pub mod grouper;
pub mod progress;
pub mod rasterizer;

pub use error::{Error, Result};

use composer::{BASE_UNIT_HEIGHT, BASE_UNIT_WIDTH};
use document_builder::PaperSize;
use fetcher::AssetSource;
use progress::ProgressSink;
use rasterizer::{FontSet, Rasterizer};

/// Logical pages per printable sheet.
pub const PAGES_PER_SHEET: usize = 2;

pub const DEFAULT_BASE_URL: &str = "https://data.passports.purduehackers.com";

/// Geometry, endpoints and output location for a run.
///
/// `canvas_size` and `unit_size` are the only places sheet and page sizes are
/// derived, so layout and rasterization always agree.
#[derive(Debug, Clone)]
pub struct Config {
    pub paper_width_in: f32,
    pub paper_height_in: f32,
    pub dpi: u32,
    pub scale_factor: f32,
    /// Vertical space between stacked pages, in canvas pixels.
    pub sheet_gap: f32,
    pub base_url: String,
    pub background_path: String,
    pub font_dir: PathBuf,
    pub output_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            paper_width_in: 8.5,
            paper_height_in: 11.0,
            dpi: 300,
            scale_factor: 3.0,
            sheet_gap: 50.0,
            base_url: DEFAULT_BASE_URL.to_string(),
            background_path: "/page-1-second-half.png".to_string(),
            font_dir: PathBuf::from("assets"),
            output_path: PathBuf::from("output.pdf"),
        }
    }
}

impl Config {
    /// Sheet canvas in pixels: paper size at `dpi`.
    pub fn canvas_size(&self) -> (u32, u32) {
        let dpi = self.dpi as f32;
        (
            (self.paper_width_in * dpi).round() as u32,
            (self.paper_height_in * dpi).round() as u32,
        )
    }

    /// One data page cell in canvas pixels.
    pub fn unit_size(&self) -> (f32, f32) {
        (
            BASE_UNIT_WIDTH * self.scale_factor,
            BASE_UNIT_HEIGHT * self.scale_factor,
        )
    }

    pub fn paper_size(&self) -> PaperSize {
        PaperSize::from_inches(self.paper_width_in, self.paper_height_in)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: usize,
    pub sheets: usize,
    pub output: PathBuf,
}

/// Renders data pages `start..=end` into `config.output_path`.
pub fn run(
    config: &Config,
    start: u32,
    end: u32,
    source: &dyn AssetSource,
    progress: Option<&dyn ProgressSink>,
) -> Result<RunSummary> {
    check_range(start, end)?;
    if let Some(sink) = progress {
        sink.update("Loading fonts");
    }
    let fonts = Arc::new(FontSet::load(source, &config.font_dir)?);
    run_with_fonts(config, start, end, source, fonts, progress)
}

/// Same as [`run`], with the font set already loaded.
pub fn run_with_fonts(
    config: &Config,
    start: u32,
    end: u32,
    source: &dyn AssetSource,
    fonts: Arc<FontSet>,
    progress: Option<&dyn ProgressSink>,
) -> Result<RunSummary> {
    check_range(start, end)?;
    let started = Instant::now();
    let report = |message: &str| {
        if let Some(sink) = progress {
            sink.update(message);
        }
    };
    info!("Processing data pages {} to {} with {:?}", start, end, config);

    // 1. Describe every page
    report(&format!("Fetching data pages {} to {}", start, end));
    let base = Url::parse(&config.base_url)
        .map_err(|e| Error::network(&config.base_url, format!("invalid base URL: {}", e)))?;
    let pages = (start..=end)
        .map(|index| composer::compose_logical_page(config, &base, index))
        .collect::<Result<Vec<_>>>()?;
    let page_count = pages.len();

    // 2. Two pages per sheet
    report("Chunking data pages");
    let sheets = grouper::group(pages, config)?;
    info!("Laid out {} pages on {} sheets", page_count, sheets.len());

    // 3. Rasterize sheets one at a time, in order
    let rasterizer = Rasterizer::new(config.canvas_size(), fonts, source);
    let mut buffers = Vec::with_capacity(sheets.len());
    for (i, sheet) in sheets.iter().enumerate() {
        report(&format!("Rendering sheet {}/{}", i + 1, sheets.len()));
        buffers.push(rasterizer.rasterize(sheet)?);
    }

    // 4. Concatenate into the PDF
    report("Writing PDF");
    document_builder::build_pdf(&buffers, config.paper_size(), &config.output_path)?;

    if let Some(sink) = progress {
        sink.finish(&format!("Data pages saved to {}", config.output_path.display()));
    }
    info!("Finished in {:.2?}", started.elapsed());

    Ok(RunSummary {
        pages: page_count,
        sheets: buffers.len(),
        output: config.output_path.clone(),
    })
}

fn check_range(start: u32, end: u32) -> Result<()> {
    if start > end {
        return Err(Error::InvalidRange { start, end });
    }
    Ok(())
}
