//! Rasterizer Module
//!
//! Turns a printable sheet into PNG bytes. The sheet's layout is resolved to
//! placements, every referenced image is fetched and decoded, and the images
//! are drawn onto a white canvas of exactly the sheet's declared size.

use crate::composer::Rotation;
use crate::error::{Error, Result};
use crate::fetcher::{self, AssetSource};
use crate::grouper::{Placement, PrintableSheet};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};
use ttf_parser::Face;

/// Family name and file name of every font a run needs.
pub const FONTS: &[(&str, &str)] = &[
    ("Inter", "Inter-Regular.ttf"),
    ("Inter Bold", "Inter-Bold.ttf"),
    ("OCR B", "OCRB-Regular.ttf"),
];

#[derive(Debug, Clone)]
pub struct LoadedFont {
    pub family: String,
    pub data: Vec<u8>,
}

/// Fonts loaded once per run and shared read-only between sheets.
#[derive(Debug, Clone, Default)]
pub struct FontSet {
    fonts: Vec<LoadedFont>,
}

impl FontSet {
    /// Fetches and validates every entry of [`FONTS`] from `dir`.
    ///
    /// There is no fallback font: any missing or unparsable file fails the
    /// whole load.
    pub fn load(source: &dyn AssetSource, dir: &Path) -> Result<Self> {
        let mut fonts = Vec::with_capacity(FONTS.len());
        for (family, file) in FONTS {
            let url = fetcher::font_url(dir, file)?;
            let data = source.fetch(&url)?;
            Face::parse(&data, 0)
                .map_err(|e| Error::Render(format!("font '{}' ({}) is unusable: {}", family, url, e)))?;
            debug!("Loaded font '{}' ({} bytes)", family, data.len());
            fonts.push(LoadedFont {
                family: family.to_string(),
                data,
            });
        }
        info!("Loaded {} fonts from {:?}", fonts.len(), dir);
        Ok(FontSet { fonts })
    }

    pub fn get(&self, family: &str) -> Option<&LoadedFont> {
        self.fonts.iter().find(|f| f.family == family)
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.fonts.iter().map(|f| f.family.as_str())
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// PNG rendering of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    pub sheet_index: usize,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

pub struct Rasterizer<'a> {
    width: u32,
    height: u32,
    fonts: Arc<FontSet>,
    source: &'a dyn AssetSource,
}

impl<'a> Rasterizer<'a> {
    pub fn new(canvas: (u32, u32), fonts: Arc<FontSet>, source: &'a dyn AssetSource) -> Self {
        debug!(
            "Rasterizer canvas {}x{}, fonts: {:?}",
            canvas.0,
            canvas.1,
            fonts.families().collect::<Vec<_>>()
        );
        Rasterizer {
            width: canvas.0,
            height: canvas.1,
            fonts,
            source,
        }
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    /// Renders `sheet`, fetching every image it references.
    pub fn rasterize(&self, sheet: &PrintableSheet) -> Result<RasterBuffer> {
        if (sheet.width, sheet.height) != (self.width, self.height) {
            return Err(Error::Layout(format!(
                "sheet {} is declared {}x{} but the canvas is {}x{}",
                sheet.index, sheet.width, sheet.height, self.width, self.height
            )));
        }
        let placements = sheet.layout()?;

        let mut canvas = Pixmap::new(self.width, self.height).ok_or_else(|| {
            Error::Render(format!("invalid canvas size {}x{}", self.width, self.height))
        })?;
        canvas.fill(Color::WHITE);

        for placement in &placements {
            let bytes = self.source.fetch(&placement.image.url)?;
            let image = decode_pixmap(&bytes)
                .map_err(|e| Error::Render(format!("{}: {}", placement.image.url, e)))?;
            let transform = placement_transform(placement, image.width(), image.height());

            let paint = PixmapPaint {
                quality: FilterQuality::Bilinear,
                ..PixmapPaint::default()
            };
            canvas.draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
        }

        let png = canvas
            .encode_png()
            .map_err(|e| Error::Render(format!("png encode failed: {}", e)))?;
        debug!(
            "Rendered sheet {} (pages {:?}) to {} bytes",
            sheet.index,
            sheet.page_indices(),
            png.len()
        );

        Ok(RasterBuffer {
            sheet_index: sheet.index,
            width: self.width,
            height: self.height,
            png,
        })
    }
}

/// Maps source pixels onto the canvas: scale to the declared size, apply
/// the rotation, then move to the placement origin.
fn placement_transform(placement: &Placement, src_width: u32, src_height: u32) -> Transform {
    let image = &placement.image;
    let scale = Transform::from_scale(
        image.width / src_width as f32,
        image.height / src_height as f32,
    );
    let turned = match image.rotation {
        Rotation::None => scale,
        // (x, y) -> (h - y, x)
        Rotation::QuarterTurn => {
            scale.post_concat(Transform::from_row(0.0, 1.0, -1.0, 0.0, image.height, 0.0))
        }
    };
    turned.post_translate(placement.x, placement.y)
}

fn decode_pixmap(data: &[u8]) -> std::result::Result<Pixmap, String> {
    let rgba = image::load_from_memory(data)
        .map_err(|e| format!("cannot decode image: {}", e))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| format!("image has empty size {}x{}", width, height))?;
    for (src, dst) in rgba.as_raw().chunks_exact(4).zip(pixmap.data_mut().chunks_exact_mut(4)) {
        let a = src[3];
        dst[0] = premul_u8(src[0], a);
        dst[1] = premul_u8(src[1], a);
        dst[2] = premul_u8(src[2], a);
        dst[3] = a;
    }
    Ok(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}
