//! hats CLI - Command-line interface for HATS event-camera encoding.
//!
//! Reads `t x y p` event files, runs them through the HATS engine and writes
//! composited frames.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines,
    clippy::struct_excessive_bools
)]

use clap::{Parser, Subcommand, ValueEnum};
use hats_algorithms::{
    HatsEngine, PositiveEventCounter, DEFAULT_NORMALIZATION_EPSILON, DEFAULT_PRINT_INTERVAL,
};
use hats_core::{HatsConfig, Polarity};
use hats_io::{infer_sensor_size, EventFileReader, FrameFormat, FrameWriter};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    HatsIo(#[from] hats_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] hats_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no events in {0}, cannot infer sensor size")]
    EmptyInput(PathBuf),
}

/// Polarities to composite.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolaritySelection {
    /// "On" events only
    On,
    /// "Off" events only
    Off,
    /// One frame per polarity
    Both,
}

impl PolaritySelection {
    fn polarities(self) -> &'static [Polarity] {
        match self {
            Self::On => &[Polarity::On],
            Self::Off => &[Polarity::Off],
            Self::Both => &Polarity::ALL,
        }
    }
}

/// Frame file format.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Binary greyscale PGM
    Pgm,
    /// Greyscale PNG
    Png,
    /// Full-precision CSV
    Csv,
}

impl From<OutputFormat> for FrameFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Pgm => FrameFormat::Pgm,
            OutputFormat::Png => FrameFormat::Png,
            OutputFormat::Csv => FrameFormat::Csv,
        }
    }
}

/// HATS encoding for event-based vision sensors.
#[derive(Parser)]
#[command(name = "hats")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an event file into HATS frames
    Process {
        /// Input event file (`t x y p` lines)
        input: PathBuf,

        /// Output directory for frames
        #[arg(short, long)]
        output: PathBuf,

        /// Sensor width in pixels (inferred from the events if omitted)
        #[arg(long)]
        width: Option<u32>,

        /// Sensor height in pixels (inferred from the events if omitted)
        #[arg(long)]
        height: Option<u32>,

        /// JSON configuration file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Neighborhood radius R
        #[arg(long)]
        radius: Option<u16>,

        /// Cell side K in pixels
        #[arg(long)]
        cell_size: Option<u16>,

        /// Temporal memory window (microseconds)
        #[arg(long)]
        temporal_window_us: Option<i64>,

        /// Decay constant (seconds)
        #[arg(long)]
        tau: Option<f64>,

        /// Number of local surfaces kept per cell and polarity
        #[arg(long)]
        window_size: Option<usize>,

        /// Process cells in parallel
        #[arg(long)]
        parallel: bool,

        /// Write a frame after every N input events
        #[arg(long, default_value = "10000")]
        frame_every: usize,

        /// Polarities to composite
        #[arg(long, value_enum, default_value = "on")]
        polarity: PolaritySelection,

        /// Frame file format
        #[arg(long, value_enum, default_value = "pgm")]
        format: OutputFormat,

        /// Composite normalized histograms instead of raw sums
        #[arg(long)]
        normalized: bool,

        /// Write a JSON run summary to this path
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Show information about an event file
    Info {
        /// Input event file
        input: PathBuf,
    },

    /// Count positive events, logging progress periodically
    Count {
        /// Input event file
        input: PathBuf,

        /// Positive events between progress lines
        #[arg(long, default_value_t = DEFAULT_PRINT_INTERVAL)]
        print_interval: u64,

        /// Events read per batch
        #[arg(long, default_value = "65536")]
        batch_size: usize,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Loads the configuration file (or defaults) and applies flag overrides.
fn build_config(
    path: Option<&Path>,
    radius: Option<u16>,
    cell_size: Option<u16>,
    temporal_window_us: Option<i64>,
    tau: Option<f64>,
    window_size: Option<usize>,
    parallel: bool,
) -> Result<HatsConfig> {
    let mut config = match path {
        Some(path) => HatsConfig::from_file(path)?,
        None => HatsConfig::default(),
    };
    if let Some(radius) = radius {
        config = config.with_radius(radius);
    }
    if let Some(cell_size) = cell_size {
        config = config.with_cell_size(cell_size);
    }
    if let Some(window) = temporal_window_us {
        config = config.with_temporal_window_us(window);
    }
    if let Some(tau) = tau {
        config = config.with_tau(tau);
    }
    if let Some(window_size) = window_size {
        config = config.with_window_size(window_size);
    }
    if parallel {
        config = config.with_parallel(true);
    }
    Ok(config)
}

fn polarity_name(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::On => "on",
        Polarity::Off => "off",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process {
            input,
            output,
            width,
            height,
            config,
            radius,
            cell_size,
            temporal_window_us,
            tau,
            window_size,
            parallel,
            frame_every,
            polarity,
            format,
            normalized,
            summary,
        } => {
            // Processing pipeline:
            // 1. Resolve configuration and sensor size
            // 2. Stream event batches through the engine
            // 3. Composite and write a frame after each batch
            // 4. Report totals

            let config = build_config(
                config.as_deref(),
                radius,
                cell_size,
                temporal_window_us,
                tau,
                window_size,
                parallel,
            )?;

            let reader = EventFileReader::open(&input)?;
            let (width, height) = match (width, height) {
                (Some(w), Some(h)) => (w, h),
                (w, h) => {
                    info!("inferring sensor size from {}", input.display());
                    let events = reader.read_all()?;
                    let (inferred_w, inferred_h) = infer_sensor_size(&events)
                        .ok_or_else(|| CliError::EmptyInput(input.clone()))?;
                    (w.unwrap_or(inferred_w), h.unwrap_or(inferred_h))
                }
            };

            let mut engine = HatsEngine::setup(width, height, config)?;
            std::fs::create_dir_all(&output)?;
            let frame_format = FrameFormat::from(format);

            let start = Instant::now();
            let mut frames_written = 0usize;

            let mut batches = reader.batches(frame_every);
            for (index, batch) in batches.by_ref().enumerate() {
                let batch = batch?;
                engine.ingest(&batch);

                for &polarity in polarity.polarities() {
                    let frame = if normalized {
                        engine.composite_normalized(polarity, DEFAULT_NORMALIZATION_EPSILON)?
                    } else {
                        engine.composite(polarity)?
                    };

                    let path = output.join(format!(
                        "frame_{:05}_{}.{}",
                        index,
                        polarity_name(polarity),
                        frame_format.extension()
                    ));
                    FrameWriter::create(&path)?.write_frame(frame.view(), frame_format)?;
                    debug!("wrote {}", path.display());
                    frames_written += 1;
                }
            }

            let elapsed = start.elapsed();
            let totals = engine.statistics().totals;
            let out_of_range = batches.out_of_range();

            println!(
                "Processed {} events in {:.2}s",
                totals.total() + out_of_range,
                elapsed.as_secs_f64()
            );
            println!(
                "Accepted: {} (on: {}, off: {})",
                totals.processed, totals.on_events, totals.off_events
            );
            println!(
                "Discarded: {} (out of bounds: {}, out of order: {})",
                totals.discarded() + out_of_range,
                totals.out_of_bounds + out_of_range,
                totals.out_of_order
            );
            println!("Frames written: {}", frames_written);

            if let Some(summary) = summary {
                let report = serde_json::json!({
                    "input": input.display().to_string(),
                    "width": width,
                    "height": height,
                    "config": engine.config(),
                    "statistics": engine.statistics(),
                    "out_of_range_lines": out_of_range,
                    "frames_written": frames_written,
                    "elapsed_seconds": elapsed.as_secs_f64(),
                });
                std::fs::write(&summary, serde_json::to_string_pretty(&report)?)?;
                info!("summary written to {}", summary.display());
            }
        }

        Commands::Info { input } => {
            let reader = EventFileReader::open(&input)?;
            let file_size = reader.file_size();

            println!("File: {}", input.display());
            println!(
                "Size: {} bytes ({:.2} MB)",
                file_size,
                file_size as f64 / 1_000_000.0
            );

            let (events, out_of_range) = reader.read_all_with_discards()?;
            println!("Events: {}", events.len());
            if out_of_range > 0 {
                println!("Out-of-range events: {}", out_of_range);
            }

            if let (Some(first), Some(last)) = (events.first(), events.last()) {
                let on_events = events.iter().filter(|e| e.polarity).count();
                println!("On events: {}", on_events);
                println!("Off events: {}", events.len() - on_events);
                println!("Time range: {} - {} us", first.t, last.t);

                let unordered = events.windows(2).filter(|w| w[1].t < w[0].t).count();
                if unordered > 0 {
                    println!("Timestamp decreases: {}", unordered);
                }

                if let Some((width, height)) = infer_sensor_size(&events) {
                    let cell_size = u32::from(HatsConfig::default().cell_size);
                    println!("Inferred sensor: {}x{}", width, height);
                    println!(
                        "Cell grid (K = {}): {}x{}",
                        cell_size,
                        width.div_ceil(cell_size),
                        height.div_ceil(cell_size)
                    );
                }
            }
        }

        Commands::Count {
            input,
            print_interval,
            batch_size,
        } => {
            let reader = EventFileReader::open(&input)?;
            let mut counter = PositiveEventCounter::new(print_interval)?;

            for batch in reader.batches(batch_size) {
                counter.accept(&batch?);
            }

            println!("Positive events: {}", counter.count());
        }
    }

    Ok(())
}
