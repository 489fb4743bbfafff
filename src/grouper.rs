//! Page Grouper Module
//!
//! Batches logical pages onto printable sheets and resolves a sheet into
//! absolutely positioned images.

use crate::composer::{EmbeddedImage, LogicalPage};
use crate::error::{Error, Result};
use crate::{Config, PAGES_PER_SHEET};
use log::debug;

/// One physical output page: logical pages stacked top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintableSheet {
    pub index: usize,
    pub pages: Vec<LogicalPage>,
    pub width: u32,
    pub height: u32,
    pub gap: f32,
}

/// An image pinned to a position on the sheet canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub image: EmbeddedImage,
    pub x: f32,
    pub y: f32,
}

impl PrintableSheet {
    pub fn new(index: usize, config: &Config) -> Self {
        let (width, height) = config.canvas_size();
        PrintableSheet {
            index,
            pages: Vec::with_capacity(PAGES_PER_SHEET),
            width,
            height,
            gap: config.sheet_gap,
        }
    }

    pub fn push(&mut self, page: LogicalPage) -> Result<()> {
        if self.pages.len() >= PAGES_PER_SHEET {
            return Err(Error::Layout(format!(
                "sheet {} already holds {} pages; cannot add page {}",
                self.index, PAGES_PER_SHEET, page.index
            )));
        }
        self.pages.push(page);
        Ok(())
    }

    /// Source indices on this sheet, top to bottom.
    pub fn page_indices(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.index).collect()
    }

    /// Resolves the stacked layout into placements in canvas pixels.
    ///
    /// Fails if a page does not fit the canvas or carries a dimension that
    /// cannot be drawn.
    pub fn layout(&self) -> Result<Vec<Placement>> {
        if !(self.gap.is_finite() && self.gap >= 0.0) {
            return Err(Error::Layout(format!("invalid sheet gap {}", self.gap)));
        }

        let canvas_w = self.width as f32;
        let canvas_h = self.height as f32;
        let mut placements = Vec::with_capacity(self.pages.len() * 2);
        let mut y = 0.0_f32;

        for (slot, page) in self.pages.iter().enumerate() {
            if slot > 0 {
                y += self.gap;
            }
            if page.width > canvas_w + f32::EPSILON || y + page.height > canvas_h + f32::EPSILON {
                return Err(Error::Layout(format!(
                    "page {} ({:.2}x{:.2}) at y={:.2} overflows the {}x{} sheet",
                    page.index, page.width, page.height, y, self.width, self.height
                )));
            }

            let mut x = 0.0_f32;
            for image in page.images() {
                let (w, h) = image.footprint();
                if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
                    return Err(Error::Layout(format!(
                        "image {} has unusable size {}x{}",
                        image.url, w, h
                    )));
                }
                if h > page.height + 1e-3 {
                    return Err(Error::Layout(format!(
                        "image {} is taller than its page ({:.2} > {:.2})",
                        image.url, h, page.height
                    )));
                }
                placements.push(Placement {
                    image: image.clone(),
                    x,
                    y,
                });
                x += w;
            }
            if x > page.width + 1e-3 {
                return Err(Error::Layout(format!(
                    "images on page {} span {:.2}, wider than the page ({:.2})",
                    page.index, x, page.width
                )));
            }

            y += page.height;
        }

        Ok(placements)
    }
}

/// Splits pages into consecutive sheets of `PAGES_PER_SHEET`, keeping order.
pub fn group(pages: Vec<LogicalPage>, config: &Config) -> Result<Vec<PrintableSheet>> {
    let mut sheets: Vec<PrintableSheet> = Vec::with_capacity(pages.len().div_ceil(PAGES_PER_SHEET));
    let mut current = PrintableSheet::new(0, config);

    for page in pages {
        if current.pages.len() == PAGES_PER_SHEET {
            let next = PrintableSheet::new(current.index + 1, config);
            sheets.push(std::mem::replace(&mut current, next));
        }
        current.push(page)?;
    }
    if !current.pages.is_empty() {
        sheets.push(current);
    }

    debug!("Grouped pages into {} sheets", sheets.len());
    Ok(sheets)
}
