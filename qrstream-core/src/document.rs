//! End-to-end generation of a grid document.

use crate::error::Result;
use crate::header_footer::{render_band, Band, BandStyle, RenderedBand};
use crate::layout::{calculate, LayoutParams, PageLayout};
use crate::objects::ObjectId;
use crate::pipeline::produce_images;
use crate::raster::Rasterizer;
use crate::writer::{assemble_page, PageSpec, StreamWriter, WriterConfig};
use chrono::Local;
use std::io::Write;
use tracing::{debug, info};

/// What to put on the pages besides the grid itself.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub layout: LayoutParams,
    pub header: Option<Band>,
    pub footer: Option<Band>,
    pub band_style: BandStyle,
}

impl GenerateOptions {
    pub fn new(layout: LayoutParams) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, band: Band) -> Self {
        self.header = Some(band);
        self
    }

    pub fn with_footer(mut self, band: Band) -> Self {
        self.footer = Some(band);
        self
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub layout: PageLayout,
    pub images: usize,
    pub pages: usize,
    pub objects: usize,
    pub bytes_written: u64,
}

/// Render every entry of `contents` as an image and stream a complete PDF to
/// `sink`, returning the sink once the trailer is written.
///
/// The layout is validated before the first byte is written. Any error later
/// on leaves `sink` with an incomplete document that must be discarded.
pub fn generate<W, R, S>(
    sink: W,
    contents: &[S],
    options: &GenerateOptions,
    config: WriterConfig,
    rasterizer: &R,
) -> Result<(W, GenerationReport)>
where
    W: Write + Send,
    R: Rasterizer + ?Sized,
    S: AsRef<str> + Sync,
{
    let layout = calculate(&options.layout);
    layout.validate()?;
    info!(
        columns = layout.columns,
        rows = layout.rows,
        per_page = layout.images_per_page,
        images = contents.len(),
        "layout calculated"
    );

    let max_workers = config.max_workers;
    let writer = StreamWriter::new(sink, config)?;

    let now = Local::now();
    let header = match &options.header {
        Some(band) => render_band(&writer, band, &options.band_style, &layout, &now)?,
        None => RenderedBand::default(),
    };
    let footer = match &options.footer {
        Some(band) => render_band(&writer, band, &options.band_style, &layout, &now)?,
        None => RenderedBand::default(),
    };
    let aux_images: Vec<ObjectId> = header.logo.into_iter().chain(footer.logo).collect();

    let image_ids = produce_images(&writer, contents, layout.image_size, rasterizer, max_workers)?;
    debug!(objects = writer.object_count()?, "grid images embedded");

    let mut pages = Vec::with_capacity(layout.page_count(image_ids.len()));
    for batch in image_ids.chunks(layout.images_per_page as usize) {
        let page = assemble_page(
            &writer,
            &PageSpec {
                images: batch,
                layout: &layout,
                header_content: &header.content,
                footer_content: &footer.content,
                aux_images: &aux_images,
            },
        )?;
        debug!(page = pages.len() + 1, images = batch.len(), id = %page, "page written");
        pages.push(page);
    }

    let (sink, summary) = writer.finalize(&pages)?;

    Ok((
        sink,
        GenerationReport {
            layout,
            images: image_ids.len(),
            pages: summary.page_count,
            objects: summary.object_count,
            bytes_written: summary.bytes_written,
        },
    ))
}
