use super::{StreamWriter, FONT_ID, PLACEHOLDER_ID};
use crate::error::Result;
use crate::layout::PageLayout;
use crate::objects::{Dictionary, Object, ObjectId};
use std::fmt::Write as _;
use std::io::Write;

/// Everything needed to emit one page of the grid.
#[derive(Debug, Clone, Copy)]
pub struct PageSpec<'a> {
    /// Grid images in reading order, at most `layout.images_per_page`
    pub images: &'a [ObjectId],
    pub layout: &'a PageLayout,
    /// Commands drawn before the grid
    pub header_content: &'a str,
    /// Commands drawn after the grid
    pub footer_content: &'a str,
    /// Images referenced by the header/footer content
    pub aux_images: &'a [ObjectId],
}

/// Write the content stream, resource dictionary and page object for one
/// batch of images and return the page object's number.
pub fn assemble_page<W: Write>(writer: &StreamWriter<W>, spec: &PageSpec<'_>) -> Result<ObjectId> {
    let layout = spec.layout;
    let content = grid_content(spec);
    let content_id = writer.embed_stream(content.as_bytes(), Dictionary::new())?;

    let mut xobjects = Dictionary::with_capacity(spec.images.len() + spec.aux_images.len());
    for id in spec.images.iter().chain(spec.aux_images) {
        xobjects.set(id.image_name(), *id);
    }
    let resources = Dictionary::new()
        .with(
            "ProcSet",
            vec![
                Object::name("PDF"),
                Object::name("ImageC"),
                Object::name("ImageB"),
                Object::name("Text"),
            ],
        )
        .with("Font", Dictionary::new().with("F1", FONT_ID))
        .with("XObject", xobjects);
    let resources_id = writer.allocate_object(resources)?;

    let page = Dictionary::new()
        .with("Type", Object::name("Page"))
        .with("Parent", PLACEHOLDER_ID)
        .with(
            "MediaBox",
            vec![
                Object::from(0),
                Object::from(0),
                Object::from(layout.page_width),
                Object::from(layout.page_height),
            ],
        )
        .with("Contents", content_id)
        .with("Resources", resources_id);

    writer.allocate_object(page)
}

/// Header, one `cm`/`Do` pair per image, footer.
fn grid_content(spec: &PageSpec<'_>) -> String {
    let layout = spec.layout;
    let size = layout.image_size;
    let pitch = i64::from(layout.pitch());
    let (origin_x, origin_y) = layout.grid_origin();
    let columns = layout.columns.max(1) as usize;

    let mut content = String::with_capacity(
        spec.header_content.len() + spec.footer_content.len() + spec.images.len() * 40,
    );
    content.push_str(spec.header_content);

    for (i, id) in spec.images.iter().enumerate() {
        let x = origin_x + (i % columns) as i64 * pitch;
        let y = origin_y - (i / columns) as i64 * pitch;
        // Infallible: writing into a String
        let _ = writeln!(
            content,
            "q {size} 0 0 {size} {x} {y} cm /{} Do Q",
            id.image_name()
        );
    }

    content.push_str(spec.footer_content);
    content
}
