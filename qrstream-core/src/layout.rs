//! Grid geometry for a fixed-size page.
//!
//! All values are PDF points. Columns and rows come from floor division of the
//! usable page area by the grid pitch (`image_size + spacing`).

use crate::error::{PdfError, Result};

/// Inputs to [`calculate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutParams {
    pub page_width: u32,
    pub page_height: u32,
    pub margin_x: u32,
    pub margin_y: u32,
    pub header_height: u32,
    pub footer_height: u32,
    pub spacing: u32,
    pub image_size: u32,
}

impl Default for LayoutParams {
    /// A4 portrait, 80pt images with a 50pt header and footer band.
    fn default() -> Self {
        Self {
            page_width: 595,
            page_height: 842,
            margin_x: 50,
            margin_y: 50,
            header_height: 50,
            footer_height: 50,
            spacing: 20,
            image_size: 80,
        }
    }
}

impl LayoutParams {
    pub fn with_page_size(mut self, width: u32, height: u32) -> Self {
        self.page_width = width;
        self.page_height = height;
        self
    }

    pub fn with_margins(mut self, x: u32, y: u32) -> Self {
        self.margin_x = x;
        self.margin_y = y;
        self
    }

    pub fn with_bands(mut self, header_height: u32, footer_height: u32) -> Self {
        self.header_height = header_height;
        self.footer_height = footer_height;
        self
    }

    pub fn with_spacing(mut self, spacing: u32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_image_size(mut self, size: u32) -> Self {
        self.image_size = size;
        self
    }
}

/// Computed grid geometry. May be degenerate; see [`PageLayout::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub image_size: u32,
    pub columns: u32,
    pub rows: u32,
    pub images_per_page: u32,
    pub header_height: u32,
    pub footer_height: u32,
    pub margin_x: u32,
    pub margin_y: u32,
    pub spacing: u32,
    pub page_width: u32,
    pub page_height: u32,
}

/// Derive the grid for `params`. Never fails; a zero pitch or an image larger
/// than the usable area yields zero columns or rows.
pub fn calculate(params: &LayoutParams) -> PageLayout {
    let usable_width =
        i64::from(params.page_width) - 2 * i64::from(params.margin_x);
    let usable_height = i64::from(params.page_height)
        - 2 * i64::from(params.margin_y)
        - (i64::from(params.header_height) + i64::from(params.footer_height));

    let pitch = i64::from(params.image_size) + i64::from(params.spacing);
    let (columns, rows) = if pitch == 0 {
        (0, 0)
    } else {
        (
            (usable_width.max(0) / pitch) as u32,
            (usable_height.max(0) / pitch) as u32,
        )
    };

    PageLayout {
        image_size: params.image_size,
        columns,
        rows,
        images_per_page: columns.saturating_mul(rows),
        header_height: params.header_height,
        footer_height: params.footer_height,
        margin_x: params.margin_x,
        margin_y: params.margin_y,
        spacing: params.spacing,
        page_width: params.page_width,
        page_height: params.page_height,
    }
}

impl PageLayout {
    /// Reject layouts that cannot hold a single image.
    pub fn validate(&self) -> Result<()> {
        if self.image_size == 0 {
            return Err(PdfError::InvalidLayout(
                "image size must be greater than zero".to_string(),
            ));
        }
        if self.columns == 0 || self.rows == 0 {
            return Err(PdfError::InvalidLayout(format!(
                "{}pt images with {}pt spacing leave {} columns x {} rows on a {}x{} page",
                self.image_size,
                self.spacing,
                self.columns,
                self.rows,
                self.page_width,
                self.page_height
            )));
        }
        Ok(())
    }

    /// Distance between the origins of neighbouring cells.
    pub fn pitch(&self) -> u32 {
        self.image_size.saturating_add(self.spacing)
    }

    /// Lower-left corner of the top-left cell.
    pub fn grid_origin(&self) -> (i64, i64) {
        let x = i64::from(self.margin_x);
        let y = i64::from(self.page_height)
            - i64::from(self.margin_y)
            - i64::from(self.header_height)
            - i64::from(self.image_size);
        (x, y)
    }

    /// Number of pages needed for `images` images. Zero for an empty input
    /// or a degenerate layout.
    pub fn page_count(&self, images: usize) -> usize {
        if self.images_per_page == 0 {
            return 0;
        }
        images.div_ceil(self.images_per_page as usize)
    }
}
