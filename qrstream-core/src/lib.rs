//! # qrstream
//!
//! Streaming PDF generation for very large grids of generated images, such as
//! sheets of QR code labels. Pages are laid out on a fixed grid, images are
//! rasterized and compressed in parallel, and the document is written to any
//! [`std::io::Write`] sink through a bounded buffer, so memory stays flat no
//! matter how many images the document holds.
//!
//! ## Quick Start
//!
//! ```rust
//! use qrstream::{generate, GenerateOptions, LayoutParams, QrRasterizer, Result, WriterConfig};
//!
//! # fn main() -> Result<()> {
//! let contents: Vec<String> = (1..=100)
//!     .map(|i| format!("https://example.com/item/{i}"))
//!     .collect();
//!
//! let options = GenerateOptions::new(LayoutParams::default().with_bands(0, 0));
//! let (pdf, report) = generate(
//!     Vec::new(),
//!     &contents,
//!     &options,
//!     WriterConfig::default(),
//!     &QrRasterizer::new(),
//! )?;
//!
//! assert_eq!(report.pages, 3);
//! assert!(pdf.starts_with(b"%PDF-1.7"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`layout`] - Grid geometry
//! - [`writer`] - Low-level streaming writer, page assembly and trailer
//! - [`pipeline`] - Bounded parallel rasterize-and-embed
//! - [`header_footer`] - Header and footer bands
//! - [`raster`] - Rasterizers and image helpers
//! - [`document`] - The end-to-end driver
//!
//! ## Features
//!
//! - `qr` (default): [`QrRasterizer`], backed by the `qrcode` crate

pub mod compression;
pub mod document;
pub mod error;
pub mod header_footer;
pub mod layout;
pub mod objects;
pub mod pipeline;
pub mod raster;
pub mod writer;

pub use document::{generate, GenerateOptions, GenerationReport};
pub use error::{PdfError, Result};
pub use header_footer::{render_band, Band, BandPosition, BandStyle, RenderedBand};
pub use layout::{calculate, LayoutParams, PageLayout};
pub use objects::{Dictionary, Object, ObjectId};
pub use pipeline::produce_images;
pub use raster::Rasterizer;
#[cfg(feature = "qr")]
pub use raster::{QrErrorCorrection, QrRasterizer};
pub use writer::{assemble_page, FinalizeSummary, PageSpec, StreamWriter, WriterConfig};

/// Current version of qrstream
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
