//! Bounded-parallelism image production
//!
//! A fixed pool of scoped worker threads pulls input indices from a shared
//! ticket counter, rasterizes the content string, embeds the raster through
//! the shared [`StreamWriter`] and reports `(index, object)` back to the
//! calling thread, which files each result into a pre-sized slot. The pool
//! size is the admission gate: no more than `max_workers` rasters exist at
//! once, and output order always matches input order.
//!
//! The first failure stops the batch: workers stop taking tickets, the
//! calling thread drains what is in flight and returns that first error.

use crate::error::{PdfError, Result};
use crate::objects::ObjectId;
use crate::raster::Rasterizer;
use crate::writer::StreamWriter;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rasterize and embed every entry of `contents`, `edge` pixels square.
///
/// Returns one image object per input, in input order. Blocks until every
/// image has been embedded or the batch has failed.
pub fn produce_images<W, R, S>(
    writer: &StreamWriter<W>,
    contents: &[S],
    edge: u32,
    rasterizer: &R,
    max_workers: usize,
) -> Result<Vec<ObjectId>>
where
    W: Write + Send,
    R: Rasterizer + ?Sized,
    S: AsRef<str> + Sync,
{
    if max_workers == 0 {
        return Err(PdfError::InvalidConfig(
            "at least one image worker is required".to_string(),
        ));
    }

    let total = contents.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let num_workers = max_workers.min(total);
    let start = Instant::now();
    let next_ticket = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);
    let (result_sender, result_receiver) = mpsc::channel::<(usize, Result<ObjectId>)>();

    let mut slots: Vec<Option<ObjectId>> = vec![None; total];
    let mut first_error: Option<PdfError> = None;
    let mut worker_panicked = false;

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let sender = result_sender.clone();
            let next_ticket = &next_ticket;
            let cancelled = &cancelled;

            handles.push(scope.spawn(move || {
                let mut processed = 0usize;
                while !cancelled.load(Ordering::SeqCst) {
                    let idx = next_ticket.fetch_add(1, Ordering::SeqCst);
                    if idx >= total {
                        break;
                    }

                    let result = rasterizer
                        .rasterize(contents[idx].as_ref(), edge)
                        .and_then(|image| writer.embed_image(&image));
                    if result.is_err() {
                        cancelled.store(true, Ordering::SeqCst);
                    }
                    processed += 1;

                    if sender.send((idx, result)).is_err() {
                        break;
                    }
                }
                debug!(worker_id, processed, "image worker finished");
            }));
        }

        // Only the workers hold senders now; the loop ends when they all exit
        drop(result_sender);

        for (idx, result) in result_receiver {
            match result {
                Ok(id) => slots[idx] = Some(id),
                Err(e) => {
                    if first_error.is_none() {
                        warn!(index = idx, error = %e, "image failed, cancelling batch");
                        first_error = Some(e);
                    }
                }
            }
        }

        for handle in handles {
            if handle.join().is_err() {
                worker_panicked = true;
            }
        }
    });

    if let Some(e) = first_error {
        return Err(e);
    }
    if worker_panicked {
        return Err(PdfError::WorkerPanicked);
    }

    let ids = slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(PdfError::WorkerPanicked)?;

    info!(
        images = ids.len(),
        workers = num_workers,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "images embedded"
    );
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriterConfig;
    use image::{DynamicImage, GrayImage, Luma};

    /// One-pixel-high raster whose width encodes the input number.
    fn width_coded(content: &str, _edge: u32) -> Result<DynamicImage> {
        let n: u32 = content
            .parse()
            .map_err(|_| PdfError::Codec(format!("not a number: {content}")))?;
        Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(n + 1, 1, Luma([0]))))
    }

    fn writer() -> StreamWriter<Vec<u8>> {
        StreamWriter::new(Vec::new(), WriterConfig::default().with_chunk_size(256)).unwrap()
    }

    #[test]
    fn test_empty_input() {
        let writer = writer();
        let ids = produce_images::<_, _, String>(&writer, &[], 10, &width_coded, 4).unwrap();
        assert!(ids.is_empty());
        assert_eq!(writer.object_count().unwrap(), 2);
    }

    #[test]
    fn test_one_object_per_input() {
        let writer = writer();
        let contents: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        let ids = produce_images(&writer, &contents, 10, &width_coded, 8).unwrap();

        assert_eq!(ids.len(), 50);
        assert_eq!(writer.object_count().unwrap(), 52);

        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 50);
        assert_eq!(sorted.first(), Some(&ObjectId::new(3)));
        assert_eq!(sorted.last(), Some(&ObjectId::new(52)));
    }

    #[test]
    fn test_single_worker_is_sequential() {
        let writer = writer();
        let contents = ["0", "1", "2", "3"];
        let ids = produce_images(&writer, &contents, 10, &width_coded, 1).unwrap();
        let numbers: Vec<u32> = ids.iter().map(ObjectId::number).collect();
        assert_eq!(numbers, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_codec_failure_aborts_batch() {
        let writer = writer();
        let mut contents: Vec<String> = (0..40).map(|i| i.to_string()).collect();
        contents[17] = "not-a-number".to_string();

        let result = produce_images(&writer, &contents, 10, &width_coded, 4);
        assert!(matches!(result, Err(PdfError::Codec(ref msg)) if msg.contains("not-a-number")));
    }

    #[test]
    fn test_in_flight_never_exceeds_ceiling() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let tracking = |content: &str, edge: u32| -> Result<DynamicImage> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(2));
            let image = width_coded(content, edge);
            in_flight.fetch_sub(1, Ordering::SeqCst);
            image
        };

        let writer = writer();
        let contents: Vec<String> = (0..64).map(|i| i.to_string()).collect();
        produce_images(&writer, &contents, 10, &tracking, 3).unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_panicking_rasterizer_is_reported() {
        let writer = writer();
        let contents = ["1", "2", "boom", "4"];
        let exploding = |content: &str, edge: u32| -> Result<DynamicImage> {
            if content == "boom" {
                panic!("rasterizer exploded");
            }
            width_coded(content, edge)
        };

        let result = produce_images(&writer, &contents, 10, &exploding, 2);
        assert!(matches!(result, Err(PdfError::WorkerPanicked)));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let writer = writer();
        let result = produce_images(&writer, &["1"], 10, &width_coded, 0);
        assert!(matches!(result, Err(PdfError::InvalidConfig(_))));
    }
}
