//! PDF rendering of filled body documents via genpdf.
//!
//! The filled body is plain text with light inline styling: `**bold**`,
//! `*italic*`, `***both***`, and `- ` list items, one paragraph per line.
//! The template's letterhead PNG, when set, is stamped at the top of the
//! first page.

use crate::error::ServiceError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use genpdf::elements::{Break, Image as PdfImage, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::Document;
use image::imageops::FilterType;
use image::{load_from_memory, DynamicImage, GenericImageView};
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use std::fs::File;
use std::path::Path;
use tempfile::NamedTempFile;

const PAGE_WIDTH_INCH: f64 = 8.5;
const MARGIN_MM: f64 = 10.0;
const IMAGE_DPI: f64 = 150.0;
const FONT_SIZE_PT: u8 = 11;

/// Renders `text` to a PDF at `out_path`.
pub fn render_body_pdf(
    fonts_dir: &Path,
    text: &str,
    letterhead_png: Option<&str>,
    out_path: &Path,
) -> Result<(), ServiceError> {
    let mut doc = configure_document(fonts_dir)?;

    // Temp files backing embedded images must outlive rendering.
    let mut temp_files: Vec<NamedTempFile> = Vec::new();
    if let Some(b64) = letterhead_png {
        push_letterhead(&mut doc, b64, &mut temp_files)?;
        doc.push(Break::new(1));
    }

    for line in text.lines() {
        if line.is_empty() {
            doc.push(Break::new(1));
        } else if let Some(item) = line.strip_prefix("- ") {
            let mut p = Paragraph::new("");
            p.push(StyledString::new("• ", Style::new()));
            push_segments(&mut p, item);
            doc.push(p);
        } else {
            let mut p = Paragraph::new("");
            push_segments(&mut p, line);
            doc.push(p);
        }
    }

    let mut out = File::create(out_path)?;
    doc.render(&mut out)
        .map_err(|e| ServiceError::Generation(format!("PDF rendering failed: {}", e)))?;
    Ok(())
}

fn configure_document(fonts_dir: &Path) -> Result<Document, ServiceError> {
    let family = load_font(fonts_dir)?;
    let mut doc = Document::new(family);
    doc.set_title("Generated document");
    doc.set_font_size(FONT_SIZE_PT);
    doc.set_line_spacing(1.2);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(MARGIN_MM as i32);
    doc.set_page_decorator(decorator);
    Ok(doc)
}

/// Arial when the firm's TTFs are installed, LiberationSans otherwise.
fn load_font(
    fonts_dir: &Path,
) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, ServiceError> {
    if let Ok(family) = genpdf::fonts::from_files(fonts_dir, "Arial", None) {
        return Ok(family);
    }
    genpdf::fonts::from_files(fonts_dir, "LiberationSans", None)
        .map_err(|e| ServiceError::Generation(format!("cannot load PDF fonts: {}", e)))
}

/// Decodes the letterhead, scales it to the printable width, flattens any
/// alpha over white and embeds it via a temporary PNG.
fn push_letterhead(
    doc: &mut Document,
    b64: &str,
    temp_files: &mut Vec<NamedTempFile>,
) -> Result<(), ServiceError> {
    let bytes = BASE64
        .decode(b64)
        .map_err(|e| ServiceError::Generation(format!("bad letterhead image: {}", e)))?;
    let img = load_from_memory(&bytes)
        .map_err(|e| ServiceError::Generation(format!("bad letterhead image: {}", e)))?;

    let content_width_px = (PAGE_WIDTH_INCH - 2.0 * MARGIN_MM / 25.4) * IMAGE_DPI;
    let (orig_w, orig_h) = img.dimensions();
    let scale = (content_width_px / orig_w as f64).min(1.0);
    let resized = if scale < 1.0 {
        img.resize(
            ((orig_w as f64) * scale).round() as u32,
            ((orig_h as f64) * scale).round().max(1.0) as u32,
            FilterType::Lanczos3,
        )
    } else {
        img
    };

    let rgba = resized.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut background = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, &rgba, 0, 0);
    let raw = DynamicImage::ImageRgba8(background).to_rgb8().into_raw();

    let mut tmp = NamedTempFile::new()?;
    {
        let file = tmp.as_file_mut();
        let mut encoder = PngEncoder::new(file, w, h);
        encoder.set_color(PngColorType::Rgb);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| ServiceError::Generation(format!("letterhead encode failed: {}", e)))?;
        writer
            .write_image_data(&raw)
            .map_err(|e| ServiceError::Generation(format!("letterhead encode failed: {}", e)))?;
    }
    let mut element = PdfImage::from_path(tmp.path())
        .map_err(|e| ServiceError::Generation(format!("letterhead embed failed: {}", e)))?;
    element.set_dpi(IMAGE_DPI);
    temp_files.push(tmp);
    doc.push(element);
    Ok(())
}

/// Splits a line on `***`/`**`/`*` markers and pushes styled runs. Unmatched
/// markers are kept as literal text.
fn push_segments(paragraph: &mut Paragraph, line: &str) {
    let mut rest = line;
    while !rest.is_empty() {
        let Some(start) = rest.find('*') else {
            paragraph.push(StyledString::new(rest, Style::new()));
            break;
        };
        if start > 0 {
            paragraph.push(StyledString::new(&rest[..start], Style::new()));
            rest = &rest[start..];
        }
        let marker_len = rest.chars().take_while(|c| *c == '*').count().min(3);
        let marker = &rest[..marker_len];
        let style = match marker_len {
            3 => Style::new().bold().italic(),
            2 => Style::new().bold(),
            _ => Style::new().italic(),
        };
        match rest[marker_len..].find(marker) {
            Some(end) => {
                paragraph.push(StyledString::new(
                    &rest[marker_len..marker_len + end],
                    style,
                ));
                rest = &rest[marker_len + end + marker_len..];
            }
            None => {
                paragraph.push(StyledString::new(marker, Style::new()));
                rest = &rest[marker_len..];
            }
        }
    }
}
