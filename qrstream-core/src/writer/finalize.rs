use super::StreamWriter;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use std::io::Write;
use tracing::info;

/// Totals reported once the document has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeSummary {
    /// Objects in the file, not counting the free-list head
    pub object_count: usize,
    pub page_count: usize,
    /// Size of the complete file
    pub bytes_written: u64,
    /// Offset of the `xref` keyword
    pub startxref: u64,
    pub catalog: ObjectId,
    pub pages_root: ObjectId,
}

impl<W: Write> StreamWriter<W> {
    /// Write the page tree, catalog, cross-reference table and trailer, flush
    /// everything and hand the sink back. Consumes the writer, so nothing can
    /// be allocated after the trailer.
    pub fn finalize(self, pages: &[ObjectId]) -> Result<(W, FinalizeSummary)> {
        let kids: Vec<Object> = pages.iter().copied().map(Object::from).collect();
        let pages_root = self.allocate_object(
            Dictionary::new()
                .with("Type", Object::name("Pages"))
                .with("Count", pages.len())
                .with("Kids", kids),
        )?;
        let catalog = self.allocate_object(
            Dictionary::new()
                .with("Type", Object::name("Catalog"))
                .with("Pages", pages_root),
        )?;

        let mut state = self.state.into_inner().map_err(|_| PdfError::WriterFailed)?;
        state.ensure_usable()?;

        let startxref = state.position();
        let size = state.xref.len() + 1;

        let mut table = Vec::with_capacity(32 + size * 20);
        table.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
        table.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &state.xref {
            table.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        table.extend_from_slice(
            format!(
                "trailer\n<< /Size {size} /Root {catalog} >>\nstartxref\n{startxref}\n%%EOF\n"
            )
            .as_bytes(),
        );
        state.write_bytes(&table);

        state.flush()?;
        state.sink.flush()?;

        let summary = FinalizeSummary {
            object_count: state.xref.len(),
            page_count: pages.len(),
            bytes_written: state.flushed,
            startxref,
            catalog,
            pages_root,
        };
        info!(
            objects = summary.object_count,
            pages = summary.page_count,
            bytes = summary.bytes_written,
            flushes = state.flush_count,
            "document finalized"
        );

        Ok((state.sink, summary))
    }
}
