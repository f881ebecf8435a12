use crate::error::{PdfError, Result};

/// Tuning knobs for [`StreamWriter`](super::StreamWriter) and the image pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Flush the buffer once it holds more than this many bytes
    pub chunk_size: usize,
    /// Initial capacity reserved for the buffer
    pub buffer_capacity: usize,
    /// Maximum number of images rasterized at the same time
    pub max_workers: usize,
    /// zlib level for every stream object (0-9)
    pub compression_level: u32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5 * 1024 * 1024,       // 5MB
            buffer_capacity: 10 * 1024 * 1024, // 10MB
            max_workers: 8,
            compression_level: 6,
        }
    }
}

impl WriterConfig {
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    pub fn with_buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PdfError::InvalidConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(PdfError::InvalidConfig(
                "at least one image worker is required".to_string(),
            ));
        }
        if self.compression_level > 9 {
            return Err(PdfError::InvalidConfig(format!(
                "compression level {} is outside 0-9",
                self.compression_level
            )));
        }
        Ok(())
    }
}
