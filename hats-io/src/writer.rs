//! Frame writers.
//!
//! Frames are written as 8-bit greyscale images (PGM or PNG, min-max scaled)
//! for viewing, or as CSV carrying the full-precision values.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::{Error, Result};
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, GrayImage, ImageEncoder, ImageFormat};
use ndarray::{Array2, ArrayView2};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output format of a frame file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Binary greyscale PGM (P5).
    Pgm,
    /// Greyscale PNG.
    Png,
    /// Comma-separated values, one frame row per line.
    Csv,
}

impl FrameFormat {
    /// Picks the format from a file extension; unknown extensions are PGM.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            Some(ext) if ext.eq_ignore_ascii_case("png") => Self::Png,
            _ => Self::Pgm,
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pgm => "pgm",
            Self::Png => "png",
            Self::Csv => "csv",
        }
    }
}

/// Scales a frame linearly so its minimum maps to 0 and its maximum to 255.
///
/// A constant frame maps to all zeros.
#[must_use]
pub fn scale_to_u8(frame: ArrayView2<'_, f64>) -> Array2<u8> {
    let (min, max) = frame
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    if !range.is_finite() || range <= 0.0 {
        return Array2::zeros(frame.raw_dim());
    }
    frame.mapv(|v| ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8)
}

/// Converts a frame into a min-max scaled greyscale image.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] if a frame dimension does not fit in `u32`.
pub fn to_gray_image(frame: ArrayView2<'_, f64>) -> Result<GrayImage> {
    let (rows, cols) = frame.dim();
    let width = u32::try_from(cols)
        .map_err(|_| Error::InvalidFormat(format!("frame width {cols} too large")))?;
    let height = u32::try_from(rows)
        .map_err(|_| Error::InvalidFormat(format!("frame height {rows} too large")))?;

    let pixels: Vec<u8> = scale_to_u8(frame).iter().copied().collect();
    GrayImage::from_raw(width, height, pixels)
        .ok_or_else(|| Error::InvalidFormat(format!("cannot build {width}x{height} image")))
}

/// Writer for composited frames.
pub struct FrameWriter {
    writer: BufWriter<File>,
}

impl FrameWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes a frame in the given format.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn write_frame(&mut self, frame: ArrayView2<'_, f64>, format: FrameFormat) -> Result<()> {
        match format {
            FrameFormat::Pgm => self.write_pgm(frame),
            FrameFormat::Png => self.write_png(frame),
            FrameFormat::Csv => self.write_csv(frame),
        }
    }

    /// Writes a frame as binary PGM (P5).
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn write_pgm(&mut self, frame: ArrayView2<'_, f64>) -> Result<()> {
        let image = to_gray_image(frame)?;
        PnmEncoder::new(&mut self.writer)
            .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::L8,
            )?;

        self.writer.flush()?;
        Ok(())
    }

    /// Writes a frame as greyscale PNG.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn write_png(&mut self, frame: ArrayView2<'_, f64>) -> Result<()> {
        let image = to_gray_image(frame)?;
        image.write_to(&mut self.writer, ImageFormat::Png)?;

        self.writer.flush()?;
        Ok(())
    }

    /// Writes a frame as CSV.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_csv(&mut self, frame: ArrayView2<'_, f64>) -> Result<()> {
        for row in frame.rows() {
            let mut first = true;
            for value in row {
                if !first {
                    self.writer.write_all(b",")?;
                }
                write!(self.writer, "{value}")?;
                first = false;
            }
            writeln!(self.writer)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
