//! Header and footer bands.
//!
//! A band is rendered once into content-stream commands and reused verbatim
//! on every page. Its logo, if any, is embedded once and referenced by every
//! page's resource dictionary.

use crate::error::Result;
use crate::layout::PageLayout;
use crate::objects::ObjectId;
use crate::raster;
use crate::writer::StreamWriter;
use chrono::{DateTime, TimeZone};
use image::DynamicImage;
use std::fmt::Write as _;
use std::io::Write;

/// Position of a band on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandPosition {
    Header,
    Footer,
}

/// Text and optional logo for one band.
#[derive(Debug, Clone)]
pub struct Band {
    pub position: BandPosition,
    pub title: String,
    pub subtitle: String,
    pub logo: Option<DynamicImage>,
}

impl Band {
    pub fn header(title: impl Into<String>) -> Self {
        Self {
            position: BandPosition::Header,
            title: title.into(),
            subtitle: String::new(),
            logo: None,
        }
    }

    pub fn footer(title: impl Into<String>) -> Self {
        Self {
            position: BandPosition::Footer,
            title: title.into(),
            subtitle: String::new(),
            logo: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_logo(mut self, logo: DynamicImage) -> Self {
        self.logo = Some(logo);
        self
    }
}

/// Geometry of the bands, in points. Baselines are placed relative to the
/// page's vertical margins, so bands follow the page size.
#[derive(Debug, Clone, PartialEq)]
pub struct BandStyle {
    pub logo_width: u32,
    pub logo_height: u32,
    pub logo_x: i64,
    /// Logo sits this far below the band baseline
    pub logo_drop: i64,
    pub title_x: i64,
    pub info_x: i64,
    pub title_font_size: u32,
    pub subtitle_font_size: u32,
    pub info_font_size: u32,
    /// Header baseline sits this far below the top margin
    pub header_drop: i64,
    /// Footer baseline sits this far above the bottom margin
    pub footer_rise: i64,
    /// chrono format for the header timestamp
    pub date_format: String,
}

impl Default for BandStyle {
    fn default() -> Self {
        Self {
            logo_width: 50,
            logo_height: 50,
            logo_x: 50,
            logo_drop: 20,
            title_x: 120,
            info_x: 400,
            title_font_size: 16,
            subtitle_font_size: 10,
            info_font_size: 8,
            header_drop: 12,
            footer_rise: 0,
            date_format: "%d %b %Y %H:%M".to_string(),
        }
    }
}

/// Output of [`render_band`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedBand {
    pub content: String,
    pub logo: Option<ObjectId>,
}

/// Render `band` into positioning commands for pages of `layout`, embedding
/// its logo through `writer`. `now` stamps the header's "Generated:" line.
pub fn render_band<W: Write, Tz: TimeZone>(
    writer: &StreamWriter<W>,
    band: &Band,
    style: &BandStyle,
    layout: &PageLayout,
    now: &DateTime<Tz>,
) -> Result<RenderedBand>
where
    Tz::Offset: std::fmt::Display,
{
    let is_header = band.position == BandPosition::Header;
    let y = baseline(band.position, style, layout);

    let mut content = String::new();
    let mut logo = None;

    if let Some(image) = &band.logo {
        let resized = raster::resize_to_box(image, style.logo_width, style.logo_height);
        let id = writer.embed_image(&raster::flatten_to_white(&resized))?;
        let _ = writeln!(
            content,
            "q {} 0 0 {} {} {} cm /{} Do Q",
            style.logo_width,
            style.logo_height,
            style.logo_x,
            y - style.logo_drop,
            id.image_name()
        );
        logo = Some(id);
    }

    if !band.title.is_empty() {
        push_text(&mut content, style.title_font_size, style.title_x, y, &band.title);
    }

    if is_header {
        if !band.subtitle.is_empty() {
            push_text(
                &mut content,
                style.subtitle_font_size,
                style.title_x,
                y - 20,
                &band.subtitle,
            );
        }
        let stamp = format!("Generated: {}", now.format(&style.date_format));
        push_text(&mut content, style.info_font_size, style.info_x, y - 30, &stamp);
    } else if !band.subtitle.is_empty() {
        push_text(
            &mut content,
            style.info_font_size,
            style.info_x,
            y - 30,
            &band.subtitle,
        );
    }

    Ok(RenderedBand { content, logo })
}

/// Baseline of a band: 780 for a header and 50 for a footer on A4 with
/// 50pt margins.
pub fn baseline(position: BandPosition, style: &BandStyle, layout: &PageLayout) -> i64 {
    match position {
        BandPosition::Header => {
            i64::from(layout.page_height) - i64::from(layout.margin_y) - style.header_drop
        }
        BandPosition::Footer => i64::from(layout.margin_y) + style.footer_rise,
    }
}

fn push_text(content: &mut String, size: u32, x: i64, y: i64, text: &str) {
    let _ = writeln!(
        content,
        "BT /F1 {size} Tf {x} {y} Td ({}) Tj ET",
        escape_pdf_string(text)
    );
}

/// Escape backslashes and parentheses for a PDF literal string.
pub fn escape_pdf_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '(' | ')') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
