//! End-to-end tests over the bytes `generate` produces
//!
//! The helpers below read the file the way a PDF reader would: start from
//! `startxref`, follow the cross-reference table and parse each object at its
//! recorded offset.

use image::{DynamicImage, GrayImage, Luma};
use qrstream::compression::decompress;
use qrstream::{
    generate, Band, GenerateOptions, LayoutParams, PdfError, Result, WriterConfig,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One-pixel-high raster whose width encodes the input number.
fn width_coded(content: &str, _edge: u32) -> Result<DynamicImage> {
    let n: u32 = content
        .parse()
        .map_err(|_| PdfError::Codec(format!("not a number: {content}")))?;
    Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(n + 1, 1, Luma([0]))))
}

fn solid(_: &str, edge: u32) -> Result<DynamicImage> {
    Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(edge, edge, Luma([128]))))
}

fn numbered(count: usize) -> Vec<String> {
    (0..count).map(|i| i.to_string()).collect()
}

fn no_bands() -> GenerateOptions {
    GenerateOptions::new(LayoutParams::default().with_bands(0, 0))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

struct ParsedObject {
    header: String,
    stream: Option<Vec<u8>>,
}

/// Parse the xref table into a map from object number to object.
fn parse_objects(bytes: &[u8]) -> HashMap<u32, ParsedObject> {
    let marker = rfind(bytes, b"startxref\n").expect("startxref present");
    let tail = String::from_utf8_lossy(&bytes[marker + 10..]).into_owned();
    let startxref: usize = tail.lines().next().unwrap().parse().unwrap();

    let table = String::from_utf8_lossy(&bytes[startxref..]).into_owned();
    let mut lines = table.lines();
    assert_eq!(lines.next(), Some("xref"));
    let size: usize = lines
        .next()
        .unwrap()
        .split_whitespace()
        .nth(1)
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(lines.next(), Some("0000000000 65535 f "));

    let mut objects = HashMap::new();
    for number in 1..size as u32 {
        let entry = lines.next().unwrap();
        assert!(entry.ends_with(" 00000 n "), "bad entry {entry:?}");
        let offset: usize = entry[..10].parse().unwrap();
        objects.insert(number, parse_object_at(bytes, offset, number));
    }
    objects
}

fn parse_object_at(bytes: &[u8], offset: usize, number: u32) -> ParsedObject {
    let object = &bytes[offset..];
    let opening = format!("{number} 0 obj\n");
    assert!(
        object.starts_with(opening.as_bytes()),
        "object {number} not at offset {offset}"
    );
    let body = &object[opening.len()..];

    let stream_at = find(body, b"\nstream\n");
    let end_at = find(body, b"\nendobj\n").unwrap();
    match stream_at {
        Some(s) if s < end_at => {
            let header = String::from_utf8_lossy(&body[..s]).into_owned();
            let length = dict_integer(&header, "Length").unwrap() as usize;
            let data = &body[s + 8..];
            assert_eq!(&data[length..length + 18], b"\nendstream\nendobj\n");
            ParsedObject {
                stream: Some(decompress(&data[..length]).unwrap()),
                header,
            }
        }
        _ => ParsedObject {
            header: String::from_utf8_lossy(&body[..end_at]).into_owned(),
            stream: None,
        },
    }
}

fn dict_integer(header: &str, key: &str) -> Option<i64> {
    let pattern = format!("/{key} ");
    let start = header.find(&pattern)? + pattern.len();
    header[start..].split_whitespace().next()?.parse().ok()
}

fn dict_reference(header: &str, key: &str) -> Option<u32> {
    dict_integer(header, key).map(|n| n as u32)
}

fn kids(objects: &HashMap<u32, ParsedObject>) -> Vec<u32> {
    let root = objects
        .values()
        .find(|o| o.header.contains("/Type /Pages"))
        .expect("page tree");
    let start = root.header.find("/Kids [").unwrap() + 7;
    let end = start + root.header[start..].find(']').unwrap();
    root.header[start..end]
        .split(" 0 R")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().unwrap())
        .collect()
}

/// Image object numbers in the order the page draws them.
fn drawn_images(content: &str) -> Vec<u32> {
    content
        .lines()
        .filter(|line| line.ends_with(" Do Q") && line.contains("/Im"))
        .map(|line| {
            let name = line.split_whitespace().rev().nth(2).unwrap();
            name.trim_start_matches("/Im").parse().unwrap()
        })
        .collect()
}

#[test]
fn test_reference_scenario_structure() {
    let contents: Vec<String> = (1..=100)
        .map(|i| format!("https://qrcite.com?id={i}"))
        .collect();
    let (bytes, report) =
        generate(Vec::new(), &contents, &no_bands(), WriterConfig::default(), &solid).unwrap();

    assert_eq!(report.pages, 3);
    assert_eq!(report.objects, 113);

    let objects = parse_objects(&bytes);
    assert_eq!(objects.len(), 113);

    let images = objects
        .values()
        .filter(|o| o.header.contains("/Subtype /Image"))
        .count();
    assert_eq!(images, 100);

    let per_page: Vec<usize> = kids(&objects)
        .iter()
        .map(|page| {
            let contents = dict_reference(&objects[page].header, "Contents").unwrap();
            let stream = objects[&contents].stream.as_ref().unwrap();
            drawn_images(&String::from_utf8_lossy(stream)).len()
        })
        .collect();
    assert_eq!(per_page, vec![45, 45, 10]);

    let catalog = objects
        .iter()
        .find(|(_, o)| o.header.contains("/Type /Catalog"))
        .map(|(n, _)| *n)
        .unwrap();
    assert!(bytes.ends_with(b"%%EOF\n"));
    let trailer = String::from_utf8_lossy(&bytes[rfind(&bytes, b"trailer").unwrap()..]).into_owned();
    assert!(trailer.contains(&format!("/Size 114 /Root {catalog} 0 R")));
}

#[test]
fn test_images_keep_input_order() {
    let contents = numbered(120);
    let config = WriterConfig::default().with_max_workers(8).with_chunk_size(512);
    let (bytes, _) = generate(Vec::new(), &contents, &no_bands(), config, &width_coded).unwrap();

    let objects = parse_objects(&bytes);
    let mut widths = Vec::new();
    for page in kids(&objects) {
        let contents = dict_reference(&objects[&page].header, "Contents").unwrap();
        let stream = objects[&contents].stream.as_ref().unwrap();
        for image in drawn_images(&String::from_utf8_lossy(stream)) {
            widths.push(dict_integer(&objects[&image].header, "Width").unwrap());
        }
    }

    let expected: Vec<i64> = (1..=120).collect();
    assert_eq!(widths, expected);
}

#[test]
fn test_stream_lengths_and_payloads() {
    let (bytes, _) = generate(
        Vec::new(),
        &numbered(12),
        &no_bands(),
        WriterConfig::default().with_chunk_size(64),
        &solid,
    )
    .unwrap();

    for object in parse_objects(&bytes).values() {
        if object.header.contains("/Subtype /Image") {
            let samples = object.stream.as_ref().unwrap();
            assert_eq!(samples.len(), 80 * 80);
            assert!(samples.iter().all(|&b| b == 128));
        }
    }
}

#[test]
fn test_chunk_size_does_not_change_output() {
    let contents = numbered(60);
    let run = |chunk_size: usize| {
        let config = WriterConfig::default()
            .with_chunk_size(chunk_size)
            .with_max_workers(1);
        generate(Vec::new(), &contents, &no_bands(), config, &solid)
            .unwrap()
            .0
    };

    let tiny = run(1);
    let huge = run(64 * 1024 * 1024);
    assert_eq!(tiny, huge);
    parse_objects(&tiny);
}

/// Records the largest single write it receives.
#[derive(Default)]
struct RecordingSink {
    bytes: Vec<u8>,
    largest_write: usize,
    writes: usize,
}

impl Write for &mut RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.largest_write = self.largest_write.max(buf.len());
        self.writes += 1;
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_sink_sees_bounded_chunks() {
    let chunk_size = 4096;
    let mut sink = RecordingSink::default();
    let (_, report) = generate(
        &mut sink,
        &numbered(200),
        &no_bands(),
        WriterConfig::default().with_chunk_size(chunk_size),
        &solid,
    )
    .unwrap();

    assert_eq!(report.bytes_written, sink.bytes.len() as u64);
    assert!(sink.writes > 2);
    // One chunk plus at most one object that pushed it over the limit
    assert!(sink.largest_write <= chunk_size + 80 * 80 + 256);
    parse_objects(&sink.bytes);
}

#[test]
fn test_bands_are_drawn_on_every_page() {
    let options = GenerateOptions::new(LayoutParams::default())
        .with_header(Band::header("Inventory (batch 7)"))
        .with_footer(Band::footer("Warehouse"));
    let (bytes, report) =
        generate(Vec::new(), &numbered(61), &options, WriterConfig::default(), &solid).unwrap();
    assert_eq!(report.layout.images_per_page, 30);
    assert_eq!(report.pages, 3);

    let objects = parse_objects(&bytes);
    for page in kids(&objects) {
        let header = &objects[&page].header;
        assert!(header.contains("/Parent 1 0 R"));
        assert!(header.contains("/MediaBox [0 0 595 842]"));

        let contents = dict_reference(header, "Contents").unwrap();
        let text = String::from_utf8_lossy(objects[&contents].stream.as_ref().unwrap()).into_owned();
        assert!(text.starts_with("BT /F1 16 Tf 120 780 Td (Inventory \\(batch 7\\)) Tj ET\n"));
        assert!(text.contains("BT /F1 16 Tf 120 50 Td (Warehouse) Tj ET\n"));
        assert!(text.contains("q 80 0 0 80 50 662 cm /Im"));
    }
}

#[test]
fn test_rasterizer_failure_is_returned() {
    let failures = AtomicUsize::new(0);
    let flaky = |content: &str, edge: u32| -> Result<DynamicImage> {
        if content == "13" {
            failures.fetch_add(1, Ordering::SeqCst);
            return Err(PdfError::Codec("unlucky".to_string()));
        }
        solid(content, edge)
    };

    let result = generate(Vec::new(), &numbered(40), &no_bands(), WriterConfig::default(), &flaky);
    assert!(matches!(result, Err(PdfError::Codec(ref msg)) if msg == "unlucky"));
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[test]
fn test_output_loads_in_lopdf() {
    let (bytes, report) = generate(
        Vec::new(),
        &numbered(100),
        &no_bands(),
        WriterConfig::default().with_chunk_size(1024),
        &solid,
    )
    .unwrap();

    let document = lopdf::Document::load_mem(&bytes).expect("lopdf parses the output");
    assert_eq!(document.get_pages().len(), report.pages);
}

#[cfg(feature = "qr")]
mod qr {
    use super::*;
    use qrstream::QrRasterizer;

    #[test]
    fn test_qr_document() {
        let contents: Vec<String> = (1..=46)
            .map(|i| format!("https://qrcite.com?id={i}"))
            .collect();
        let (bytes, report) = generate(
            Vec::new(),
            &contents,
            &no_bands(),
            WriterConfig::default(),
            &QrRasterizer::new(),
        )
        .unwrap();
        assert_eq!(report.pages, 2);

        let objects = parse_objects(&bytes);
        let grays = objects
            .values()
            .filter(|o| o.header.contains("/ColorSpace /DeviceGray"))
            .count();
        assert_eq!(grays, 46);

        let document = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(document.get_pages().len(), 2);
    }
}
