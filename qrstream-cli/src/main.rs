use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use qrstream::raster::load_image;
use qrstream::{
    calculate, generate, Band, GenerateOptions, LayoutParams, QrRasterizer, WriterConfig,
};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "qrstream",
    about = "Stream large grids of QR codes into a PDF",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a PDF with one QR code per input string
    Generate {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Number of generated strings (`<prefix><n>` for n in 1..=count)
        #[arg(short, long, conflicts_with = "input")]
        count: Option<usize>,

        /// Prefix for generated strings
        #[arg(long, default_value = "https://qrcite.com?id=")]
        prefix: String,

        /// Read one string per line from this file instead
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        geometry: Geometry,

        /// Header title
        #[arg(long)]
        title: Option<String>,

        /// Header subtitle
        #[arg(long)]
        subtitle: Option<String>,

        /// Small text in the footer band
        #[arg(long)]
        footer_text: Option<String>,

        /// PNG or JPEG logo drawn in the header band
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Maximum number of images rasterized at once
        #[arg(short, long, default_value_t = 8)]
        workers: usize,

        /// Flush to disk once this many bytes are buffered
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Bytes reserved up front for the write buffer
        #[arg(long)]
        buffer_capacity: Option<usize>,

        /// Flate compression level (0-9)
        #[arg(long, default_value_t = 6)]
        compression_level: u32,
    },

    /// Print the grid that a set of page parameters produces
    Layout {
        #[command(flatten)]
        geometry: Geometry,
    },
}

/// Page geometry in points.
#[derive(Args, Debug, Clone)]
struct Geometry {
    /// Edge length of each image
    #[arg(long, default_value_t = 80)]
    image_size: u32,

    #[arg(long, default_value_t = 595)]
    page_width: u32,

    #[arg(long, default_value_t = 842)]
    page_height: u32,

    #[arg(long, default_value_t = 50)]
    margin_x: u32,

    #[arg(long, default_value_t = 50)]
    margin_y: u32,

    /// Gap between neighbouring images
    #[arg(long, default_value_t = 20)]
    spacing: u32,

    #[arg(long, default_value_t = 50)]
    header_height: u32,

    #[arg(long, default_value_t = 50)]
    footer_height: u32,
}

impl Geometry {
    fn params(&self) -> LayoutParams {
        LayoutParams::default()
            .with_page_size(self.page_width, self.page_height)
            .with_margins(self.margin_x, self.margin_y)
            .with_bands(self.header_height, self.footer_height)
            .with_spacing(self.spacing)
            .with_image_size(self.image_size)
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrstream=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            output,
            count,
            prefix,
            input,
            geometry,
            title,
            subtitle,
            footer_text,
            logo,
            workers,
            chunk_size,
            buffer_capacity,
            compression_level,
        } => {
            let contents = match (input, count) {
                (Some(path), _) => read_lines(&path)?,
                (None, Some(count)) => (1..=count).map(|i| format!("{prefix}{i}")).collect(),
                (None, None) => bail!("either --count or --input is required"),
            };

            let mut options = GenerateOptions::new(geometry.params());
            if title.is_some() || subtitle.is_some() || logo.is_some() {
                let mut header = Band::header(title.unwrap_or_default())
                    .with_subtitle(subtitle.unwrap_or_default());
                if let Some(path) = &logo {
                    header = header.with_logo(load_image(path)?);
                }
                options = options.with_header(header);
            }
            if let Some(text) = footer_text {
                options = options.with_footer(Band::footer("").with_subtitle(text));
            }

            let mut config = WriterConfig::default()
                .with_max_workers(workers)
                .with_compression_level(compression_level);
            if let Some(chunk_size) = chunk_size {
                config = config.with_chunk_size(chunk_size);
            }
            if let Some(capacity) = buffer_capacity {
                config = config.with_buffer_capacity(capacity);
            }
            config.validate()?;

            let layout = calculate(&options.layout);
            layout.validate()?;

            run_generate(&output, &contents, &options, config)?;
        }

        Commands::Layout { geometry } => {
            let layout = calculate(&geometry.params());
            println!("Columns: {}", layout.columns);
            println!("Rows: {}", layout.rows);
            println!("Images per page: {}", layout.images_per_page);
            if let Err(e) = layout.validate() {
                println!("Warning: {e}");
            }
        }
    }

    Ok(())
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("cannot open input {}", path.display()))?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

fn run_generate(
    output: &Path,
    contents: &[String],
    options: &GenerateOptions,
    config: WriterConfig,
) -> Result<()> {
    let start = Instant::now();
    let file =
        File::create(output).with_context(|| format!("cannot create {}", output.display()))?;

    let result = generate(
        BufWriter::new(file),
        contents,
        options,
        config,
        &QrRasterizer::new(),
    );

    let report = match result {
        Ok((sink, report)) => {
            sink.into_inner()
                .map_err(|e| e.into_error())
                .with_context(|| format!("cannot write {}", output.display()))?;
            report
        }
        Err(e) => {
            error!(error = %e, "generation failed, removing partial output");
            let _ = fs::remove_file(output);
            return Err(e.into());
        }
    };

    let elapsed = start.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "done");

    println!(
        "Layout: {} columns x {} rows ({} per page)",
        report.layout.columns, report.layout.rows, report.layout.images_per_page
    );
    println!("Images: {}", report.images);
    println!("Pages: {}", report.pages);
    println!("Objects: {}", report.objects);
    println!("Bytes: {}", report.bytes_written);
    println!("Elapsed: {:.2?}", elapsed);
    println!("Wrote {}", output.display());
    Ok(())
}
