//! Streaming PDF writer
//!
//! [`StreamWriter`] appends fully serialized objects to a bounded in-memory
//! buffer and hands the buffer to the sink whenever it grows past
//! [`WriterConfig::chunk_size`]. Offsets for the cross-reference table are
//! taken from the logical position (bytes already flushed plus bytes pending),
//! so they stay exact no matter how many flushes happen.
//!
//! The writer is shared by reference between image workers. Object numbers
//! and offsets are issued together under one short lock; compression and
//! serialization happen before the lock is taken.

mod config;
mod finalize;
mod page;

pub use config::WriterConfig;
pub use finalize::FinalizeSummary;
pub use page::{assemble_page, PageSpec};

use crate::compression;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::raster;
use image::DynamicImage;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Object 1: empty dictionary that page objects name as their parent.
pub const PLACEHOLDER_ID: ObjectId = ObjectId::new(1);
/// Object 2: the built-in Helvetica font, exposed to pages as `/F1`.
pub const FONT_ID: ObjectId = ObjectId::new(2);

struct WriterState<W: Write> {
    sink: W,
    buffer: Vec<u8>,
    xref: Vec<u64>,
    flushed: u64,
    flush_count: usize,
    failed: bool,
}

impl<W: Write> WriterState<W> {
    fn position(&self) -> u64 {
        self.flushed + self.buffer.len() as u64
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.failed {
            return Err(PdfError::WriterFailed);
        }
        Ok(())
    }

    /// Issue the next object number, record its offset and write `N 0 obj`.
    fn begin_object(&mut self) -> ObjectId {
        let id = ObjectId::new(self.xref.len() as u32 + 1);
        let offset = self.position();
        self.xref.push(offset);
        self.buffer
            .extend_from_slice(format!("{} {} obj\n", id.number(), id.generation()).as_bytes());
        id
    }

    fn write_object(&mut self, body: &[u8]) -> ObjectId {
        let id = self.begin_object();
        self.buffer.extend_from_slice(body);
        self.buffer.extend_from_slice(b"\nendobj\n");
        id
    }

    fn write_stream_object(&mut self, header: &[u8], payload: &[u8]) -> ObjectId {
        let id = self.begin_object();
        self.buffer.extend_from_slice(header);
        self.buffer.extend_from_slice(b"\nstream\n");
        self.buffer.extend_from_slice(payload);
        self.buffer.extend_from_slice(b"\nendstream\nendobj\n");
        id
    }

    fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.buffer.is_empty() {
            return Ok(());
        }

        debug!(bytes = self.buffer.len(), offset = self.flushed, "flushing buffer");
        if let Err(e) = self.sink.write_all(&self.buffer) {
            self.failed = true;
            return Err(PdfError::Io(e));
        }
        self.flushed += self.buffer.len() as u64;
        self.flush_count += 1;
        self.buffer.clear();
        Ok(())
    }

    fn maybe_flush(&mut self, chunk_size: usize) -> Result<()> {
        if self.buffer.len() > chunk_size {
            self.flush()?;
        }
        Ok(())
    }
}

/// Append-only PDF writer with a bounded buffer.
pub struct StreamWriter<W: Write> {
    state: Mutex<WriterState<W>>,
    config: WriterConfig,
}

impl<W: Write> StreamWriter<W> {
    /// Validate `config`, then write the file header and the two reserved
    /// objects and flush them to `sink`.
    pub fn new(sink: W, config: WriterConfig) -> Result<Self> {
        config.validate()?;

        let mut state = WriterState {
            sink,
            buffer: Vec::with_capacity(config.buffer_capacity),
            xref: Vec::new(),
            flushed: 0,
            flush_count: 0,
            failed: false,
        };

        state.write_bytes(b"%PDF-1.7\n");
        // Binary comment so transfer tools treat the file as binary
        state.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n']);

        let placeholder = state.write_object(&Object::from(Dictionary::new()).to_bytes());
        let font = Dictionary::new()
            .with("Type", Object::name("Font"))
            .with("Subtype", Object::name("Type1"))
            .with("BaseFont", Object::name("Helvetica"));
        let font_id = state.write_object(&Object::from(font).to_bytes());
        debug_assert_eq!(placeholder, PLACEHOLDER_ID);
        debug_assert_eq!(font_id, FONT_ID);

        state.flush()?;

        Ok(Self {
            state: Mutex::new(state),
            config,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, WriterState<W>>> {
        let state = self.state.lock().map_err(|_| PdfError::WriterFailed)?;
        state.ensure_usable()?;
        Ok(state)
    }

    /// Append a plain (non-stream) object and return its number.
    pub fn allocate_object(&self, object: impl Into<Object>) -> Result<ObjectId> {
        let body = object.into().to_bytes();

        let mut state = self.lock()?;
        let id = state.write_object(&body);
        state.maybe_flush(self.config.chunk_size)?;
        Ok(id)
    }

    /// Compress `raw` and append it as a stream object.
    ///
    /// `header` describes the decoded payload (for example an image's
    /// dimensions); `/Filter` and `/Length` are filled in here so the length
    /// always matches the compressed byte count.
    pub fn embed_stream(&self, raw: &[u8], mut header: Dictionary) -> Result<ObjectId> {
        let payload = compression::compress(raw, self.config.compression_level)?;
        header.set("Filter", Object::name("FlateDecode"));
        header.set("Length", payload.len());
        let header = Object::from(header).to_bytes();

        let mut state = self.lock()?;
        let id = state.write_stream_object(&header, &payload);
        state.maybe_flush(self.config.chunk_size)?;
        Ok(id)
    }

    /// Embed a raster as an 8-bit image XObject.
    pub fn embed_image(&self, image: &DynamicImage) -> Result<ObjectId> {
        let samples = raster::pixel_data(image);
        let header = Dictionary::new()
            .with("Type", Object::name("XObject"))
            .with("Subtype", Object::name("Image"))
            .with("Width", image.width())
            .with("Height", image.height())
            .with("ColorSpace", Object::name(samples.color_space.pdf_name()))
            .with("BitsPerComponent", 8);

        self.embed_stream(&samples.data, header)
    }

    /// Hand any buffered bytes to the sink.
    pub fn flush(&self) -> Result<()> {
        self.lock()?.flush()
    }

    /// Number of objects written so far, reserved objects included.
    pub fn object_count(&self) -> Result<usize> {
        Ok(self.lock()?.xref.len())
    }
}
