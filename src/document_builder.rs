//! Document Builder Module
//!
//! Concatenates rendered sheets into a single PDF, one sheet per page.

use crate::error::{Error, Result};
use crate::rasterizer::RasterBuffer;
use image::ImageOutputFormat;
use log::{debug, info};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

const JPEG_QUALITY: u8 = 90;

/// Physical page size in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PaperSize {
    pub const LETTER: PaperSize = PaperSize {
        width_pt: 612.0,
        height_pt: 792.0,
    };

    pub fn from_inches(width: f32, height: f32) -> Self {
        PaperSize {
            width_pt: width * 72.0,
            height_pt: height * 72.0,
        }
    }
}

/// A sheet re-encoded for embedding.
struct EncodedSheet {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

/// Builds the PDF in memory and writes it to `output_path`.
///
/// Page `k` of the output is `buffers[k]`. The file only appears at
/// `output_path` once it has been fully written and synced.
pub fn build_pdf(buffers: &[RasterBuffer], paper: PaperSize, output_path: &Path) -> Result<()> {
    let bytes = render_pdf(buffers, paper)?;
    write_atomically(output_path, &bytes)?;
    info!("Wrote {} pages ({} bytes) to {:?}", buffers.len(), bytes.len(), output_path);
    Ok(())
}

/// Serialises `buffers` into PDF bytes.
pub fn render_pdf(buffers: &[RasterBuffer], paper: PaperSize) -> Result<Vec<u8>> {
    if buffers.is_empty() {
        return Err(Error::Pdf("no pages to write".to_string()));
    }

    // Re-encoding dominates; do it in parallel. collect() keeps input order.
    let encoded: Vec<EncodedSheet> = buffers
        .par_iter()
        .map(encode_sheet)
        .collect::<Result<_>>()?;

    let mut pdf = Pdf::new();
    let mut ref_counter = std::iter::successors(Some(1), |n| Some(n + 1));
    let mut next_ref = move || Ref::new(ref_counter.next().unwrap_or(i32::MAX));

    let catalog_ref = next_ref();
    let page_tree_ref = next_ref();
    pdf.catalog(catalog_ref).pages(page_tree_ref);

    let page_refs: Vec<Ref> = encoded.iter().map(|_| next_ref()).collect();

    for (sheet, &page_ref) in encoded.iter().zip(&page_refs) {
        let content_ref = next_ref();
        let image_ref = next_ref();
        write_page(&mut pdf, page_ref, page_tree_ref, content_ref, image_ref, sheet, paper);
    }

    pdf.pages(page_tree_ref)
        .kids(page_refs.iter().copied())
        .count(page_refs.len() as i32);

    Ok(pdf.finish())
}

fn encode_sheet(buffer: &RasterBuffer) -> Result<EncodedSheet> {
    let rgb = image::load_from_memory(&buffer.png)
        .map_err(|e| Error::Pdf(format!("sheet {} is not a readable image: {}", buffer.sheet_index, e)))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut jpeg), ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|e| Error::Pdf(format!("sheet {} could not be encoded: {}", buffer.sheet_index, e)))?;
    debug!("Encoded sheet {} ({}x{}) as {} bytes", buffer.sheet_index, width, height, jpeg.len());

    Ok(EncodedSheet { width, height, jpeg })
}

/// Writes the page object, its content stream and its image XObject.
fn write_page(
    pdf: &mut Pdf,
    page_ref: Ref,
    page_tree_ref: Ref,
    content_ref: Ref,
    image_ref: Ref,
    sheet: &EncodedSheet,
    paper: PaperSize,
) {
    let image_name_str = format!("Sheet{}", image_ref.get());
    let image_name = Name(image_name_str.as_bytes());

    // Fit inside the page, keep aspect ratio, centre.
    let scale_x = paper.width_pt / sheet.width as f32;
    let scale_y = paper.height_pt / sheet.height as f32;
    let scale_factor = scale_x.min(scale_y);
    let scaled_width = sheet.width as f32 * scale_factor;
    let scaled_height = sheet.height as f32 * scale_factor;
    let offset_x = (paper.width_pt - scaled_width) / 2.0;
    let offset_y = (paper.height_pt - scaled_height) / 2.0;

    let mut page = pdf.page(page_ref);
    page.media_box(Rect::new(0.0, 0.0, paper.width_pt, paper.height_pt));
    page.parent(page_tree_ref);
    page.contents(content_ref);
    page.resources().x_objects().pair(image_name, image_ref);
    page.finish();

    let mut content = Content::new();
    content.save_state();
    content.transform([scaled_width, 0.0, 0.0, scaled_height, offset_x, offset_y]);
    content.x_object(image_name);
    content.restore_state();
    pdf.stream(content_ref, &content.finish());

    let mut image_xobject = pdf.image_xobject(image_ref, &sheet.jpeg);
    image_xobject.filter(Filter::DctDecode);
    image_xobject.width(sheet.width as i32);
    image_xobject.height(sheet.height as i32);
    image_xobject.color_space().device_rgb();
    image_xobject.bits_per_component(8);
    image_xobject.finish();
}

/// Writes `bytes` next to `path`, syncs, then renames over `path`. A failed
/// write leaves no partial file behind.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let part = part_path(path);
    let file_error = |source: std::io::Error| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(file_error)?;
    }

    let written = File::create(&part).and_then(|mut file| {
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()
    });
    let result = written.and_then(|_| fs::rename(&part, path));

    if let Err(source) = result {
        let _ = fs::remove_file(&part);
        return Err(file_error(source));
    }
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn buffer(index: usize, width: u32, height: u32, shade: u8) -> RasterBuffer {
        let img = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
            .unwrap();
        RasterBuffer {
            sheet_index: index,
            width,
            height,
            png,
        }
    }

    fn page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn one_page_per_buffer() {
        let buffers: Vec<_> = (0..3).map(|i| buffer(i, 85, 110, 10 * i as u8)).collect();
        let bytes = render_pdf(&buffers, PaperSize::LETTER).unwrap();
        assert_eq!(page_count(&bytes), 3);
    }

    #[test]
    fn pages_are_letter_sized() {
        let bytes = render_pdf(&[buffer(0, 85, 110, 0)], PaperSize::LETTER).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let media_box = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| match v {
                lopdf::Object::Integer(i) => *i as f32,
                lopdf::Object::Real(r) => *r,
                other => panic!("unexpected MediaBox entry {:?}", other),
            })
            .collect::<Vec<_>>();
        assert_eq!(media_box, vec![0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn output_is_deterministic() {
        let buffers = vec![buffer(0, 40, 50, 100), buffer(1, 40, 50, 200)];
        let a = render_pdf(&buffers, PaperSize::LETTER).unwrap();
        let b = render_pdf(&buffers, PaperSize::LETTER).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(render_pdf(&[], PaperSize::LETTER), Err(Error::Pdf(_))));
    }

    #[test]
    fn corrupt_buffer_is_rejected() {
        let bad = RasterBuffer {
            sheet_index: 0,
            width: 1,
            height: 1,
            png: vec![1, 2, 3],
        };
        assert!(matches!(render_pdf(&[bad], PaperSize::LETTER), Err(Error::Pdf(_))));
    }

    #[test]
    fn build_pdf_writes_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.pdf");

        build_pdf(&[buffer(0, 85, 110, 0)], PaperSize::LETTER, &path).unwrap();

        assert_eq!(page_count(&fs::read(&path).unwrap()), 1);
        assert!(!part_path(&path).exists());
    }

    #[test]
    fn unwritable_destination_is_a_file_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();
        let path = blocker.join("output.pdf");

        let err = build_pdf(&[buffer(0, 85, 110, 0)], PaperSize::LETTER, &path).unwrap_err();
        assert!(matches!(err, Error::FileWrite { .. }));
    }

    #[test]
    fn letter_from_inches() {
        assert_eq!(PaperSize::from_inches(8.5, 11.0), PaperSize::LETTER);
    }
}
