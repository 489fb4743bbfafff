//! Page Composer Module
//!
//! Describes one logical page: the rotated data page image on the left and
//! the fixed background image on the right. Nothing is fetched here; images
//! are only referenced by URL and resolved when a sheet is rasterized.

use crate::error::{Error, Result};
use crate::fetcher;
use crate::Config;
use url::Url;

/// Size of one data page cell before scaling.
pub const BASE_UNIT_WIDTH: f32 = 324.63;
pub const BASE_UNIT_HEIGHT: f32 = 475.86;

/// How an image is turned before it is placed in its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    /// 90° clockwise about the top-left corner, then shifted right by the
    /// image's declared height. A `w`×`h` image fills an `h`×`w` cell.
    QuarterTurn,
}

/// An image reference with the size it is declared to be drawn at.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub url: Url,
    pub width: f32,
    pub height: f32,
    pub rotation: Rotation,
}

impl EmbeddedImage {
    /// Width and height of the box the image covers once rotated.
    pub fn footprint(&self) -> (f32, f32) {
        match self.rotation {
            Rotation::None => (self.width, self.height),
            Rotation::QuarterTurn => (self.height, self.width),
        }
    }
}

/// A data page and the background laid out side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalPage {
    pub index: u32,
    pub data_page: EmbeddedImage,
    pub background: EmbeddedImage,
    pub width: f32,
    pub height: f32,
}

impl LogicalPage {
    /// The two images in left-to-right order.
    pub fn images(&self) -> [&EmbeddedImage; 2] {
        [&self.data_page, &self.background]
    }
}

/// Builds the logical page for data page `index`.
pub fn compose_logical_page(config: &Config, base: &Url, index: u32) -> Result<LogicalPage> {
    let (unit_width, unit_height) = config.unit_size();
    if !(unit_width.is_finite() && unit_height.is_finite() && unit_width > 0.0 && unit_height > 0.0)
    {
        return Err(Error::Layout(format!(
            "scale factor {} gives an unusable page unit of {}x{}",
            config.scale_factor, unit_width, unit_height
        )));
    }

    // Declared landscape so that after the quarter turn it fills the
    // portrait cell exactly.
    let data_page = EmbeddedImage {
        url: fetcher::data_page_url(base, index)?,
        width: unit_height,
        height: unit_width,
        rotation: Rotation::QuarterTurn,
    };
    let background = EmbeddedImage {
        url: fetcher::background_url(base, &config.background_path)?,
        width: unit_width,
        height: unit_height,
        rotation: Rotation::None,
    };

    Ok(LogicalPage {
        index,
        data_page,
        background,
        width: 2.0 * unit_width,
        height: unit_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://data.passports.purduehackers.com").unwrap()
    }

    #[test]
    fn page_is_two_units_wide_and_one_unit_tall() {
        let config = Config::default();
        let page = compose_logical_page(&config, &base(), 7).unwrap();

        assert_eq!(page.index, 7);
        assert!((page.width - 2.0 * 324.63 * 3.0).abs() < 1e-3);
        assert!((page.height - 475.86 * 3.0).abs() < 1e-3);
    }

    #[test]
    fn data_page_is_rotated_into_a_portrait_cell() {
        let config = Config::default();
        let page = compose_logical_page(&config, &base(), 1).unwrap();

        assert_eq!(page.data_page.rotation, Rotation::QuarterTurn);
        assert_eq!(
            page.data_page.url.as_str(),
            "https://data.passports.purduehackers.com/1.png"
        );
        let (w, h) = page.data_page.footprint();
        assert!((w - page.background.width).abs() < 1e-3);
        assert!((h - page.background.height).abs() < 1e-3);
    }

    #[test]
    fn background_is_identical_for_every_page() {
        let config = Config::default();
        let a = compose_logical_page(&config, &base(), 1).unwrap();
        let b = compose_logical_page(&config, &base(), 2).unwrap();

        assert_eq!(a.background, b.background);
        assert_eq!(a.background.rotation, Rotation::None);
        assert!(a.background.url.as_str().ends_with("/page-1-second-half.png"));
    }

    #[test]
    fn scale_factor_drives_dimensions() {
        let config = Config {
            scale_factor: 3.21,
            ..Config::default()
        };
        let page = compose_logical_page(&config, &base(), 1).unwrap();
        assert!((page.height - 475.86 * 3.21).abs() < 1e-2);
    }

    #[test]
    fn zero_scale_is_a_layout_error() {
        let config = Config {
            scale_factor: 0.0,
            ..Config::default()
        };
        let err = compose_logical_page(&config, &base(), 1).unwrap_err();
        assert!(matches!(err, Error::Layout(_)));
    }
}
