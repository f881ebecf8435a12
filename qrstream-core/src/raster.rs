//! Raster helpers around the `image` crate.
//!
//! Holds the [`Rasterizer`] seam used by the image pipeline, the QR code
//! rasterizer behind it, and the small logo transforms (resize, flatten).

use crate::error::{PdfError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;

/// Color spaces the writer emits for image XObjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRGB,
}

impl ColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
        }
    }
}

/// Uncompressed 8-bit samples, row-major, ready for an image XObject.
#[derive(Debug, Clone)]
pub struct PixelData {
    pub color_space: ColorSpace,
    pub data: Vec<u8>,
}

/// Extract raw samples: single-channel gray images stay gray, everything else
/// is converted to RGB (alpha is discarded; flatten first to keep it).
pub fn pixel_data(image: &DynamicImage) -> PixelData {
    match image {
        DynamicImage::ImageLuma8(gray) => PixelData {
            color_space: ColorSpace::DeviceGray,
            data: gray.as_raw().clone(),
        },
        other => PixelData {
            color_space: ColorSpace::DeviceRGB,
            data: other.to_rgb8().into_raw(),
        },
    }
}

/// Turns a content string into a square raster of `edge` pixels.
pub trait Rasterizer: Sync {
    fn rasterize(&self, content: &str, edge: u32) -> Result<DynamicImage>;
}

impl<F> Rasterizer for F
where
    F: Fn(&str, u32) -> Result<DynamicImage> + Sync,
{
    fn rasterize(&self, content: &str, edge: u32) -> Result<DynamicImage> {
        self(content, edge)
    }
}

/// QR error correction level.
#[cfg(feature = "qr")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrErrorCorrection {
    Low,
    Medium,
    Quartile,
    #[default]
    High,
}

/// QR code rasterizer: black modules on white, scaled to fill the edge.
#[cfg(feature = "qr")]
#[derive(Debug, Clone, Default)]
pub struct QrRasterizer {
    pub error_correction: QrErrorCorrection,
    /// Quiet-zone width in modules; the grid spacing already separates codes
    pub quiet_zone: u32,
}

#[cfg(feature = "qr")]
impl QrRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_correction(mut self, level: QrErrorCorrection) -> Self {
        self.error_correction = level;
        self
    }

    pub fn with_quiet_zone(mut self, modules: u32) -> Self {
        self.quiet_zone = modules;
        self
    }
}

#[cfg(feature = "qr")]
impl Rasterizer for QrRasterizer {
    fn rasterize(&self, content: &str, edge: u32) -> Result<DynamicImage> {
        use qrcode::{EcLevel, QrCode};

        if edge == 0 {
            return Err(PdfError::Codec("QR edge length must be non-zero".to_string()));
        }

        let ec_level = match self.error_correction {
            QrErrorCorrection::Low => EcLevel::L,
            QrErrorCorrection::Medium => EcLevel::M,
            QrErrorCorrection::Quartile => EcLevel::Q,
            QrErrorCorrection::High => EcLevel::H,
        };
        let code = QrCode::with_error_correction_level(content.as_bytes(), ec_level)
            .map_err(|e| PdfError::Codec(format!("cannot encode {content:?}: {e}")))?;

        let width = code.width();
        let colors = code.to_colors();
        let quiet = self.quiet_zone as usize;
        let modules = width + 2 * quiet;
        let edge_px = edge as usize;

        let image = image::GrayImage::from_fn(edge, edge, |x, y| {
            let mx = (x as usize * modules / edge_px).checked_sub(quiet);
            let my = (y as usize * modules / edge_px).checked_sub(quiet);
            let dark = match (mx, my) {
                (Some(mx), Some(my)) if mx < width && my < width => {
                    colors[my * width + mx] == qrcode::Color::Dark
                }
                _ => false,
            };
            image::Luma([if dark { 0 } else { 255 }])
        });

        Ok(DynamicImage::ImageLuma8(image))
    }
}

/// Scale `image` to exactly `width` x `height` pixels.
pub fn resize_to_box(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_exact(width, height, FilterType::CatmullRom)
}

/// Composite `image` over an opaque white background.
pub fn flatten_to_white(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let flat = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let px = rgba.get_pixel(x, y).0;
        let alpha = u32::from(px[3]);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(px[0]), blend(px[1]), blend(px[2])])
    });
    DynamicImage::ImageRgb8(flat)
}

/// Decode a PNG or JPEG file.
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    image::open(path)
        .map_err(|e| PdfError::InvalidImage(format!("{}: {e}", path.display())))
}
