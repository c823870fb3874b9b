//! Memory-mapped event file readers.
//!
//! Event files are plain text with one event per line:
//!
//! ```text
//! # t x y p
//! 1000 12 40 1
//! 1012 13 40 0
//! ```
//!
//! `t` is in microseconds and `p` is `1` for "on", `0` for "off". Blank
//! lines and lines starting with `#` are skipped. Well-formed lines whose
//! coordinates fall outside `0..=65535` cannot belong to any sensor; they are
//! dropped and counted instead of failing the read.

use crate::{Error, Result};
use hats_core::Event;
use log::{debug, warn};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire file
/// into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Mapped size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.mmap.len()
    }

    /// Path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A parsed line.
#[derive(Debug, PartialEq)]
enum Line {
    /// Blank or comment.
    Skip,
    Event(Event),
    /// Well-formed, but the coordinates do not fit a sensor.
    OutOfRange,
}

fn parse_line(line: &[u8]) -> std::result::Result<Line, String> {
    let text = std::str::from_utf8(line).map_err(|e| format!("not valid UTF-8: {e}"))?;
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(Line::Skip);
    }

    let mut fields = text.split_whitespace();
    let mut field = |name: &str| {
        fields
            .next()
            .ok_or_else(|| format!("missing field `{name}`"))
    };

    let t_field = field("t")?;
    let x_field = field("x")?;
    let y_field = field("y")?;
    let p_field = field("p")?;

    let t = t_field
        .parse::<i64>()
        .map_err(|e| format!("bad timestamp `{t_field}`: {e}"))?;
    let x = x_field
        .parse::<i32>()
        .map_err(|e| format!("bad x `{x_field}`: {e}"))?;
    let y = y_field
        .parse::<i32>()
        .map_err(|e| format!("bad y `{y_field}`: {e}"))?;
    let polarity = match p_field {
        "1" => true,
        "0" => false,
        other => return Err(format!("bad polarity `{other}`, expected 0 or 1")),
    };

    if let Some(extra) = fields.next() {
        return Err(format!("unexpected trailing field `{extra}`"));
    }

    match (u16::try_from(x), u16::try_from(y)) {
        (Ok(x), Ok(y)) => Ok(Line::Event(Event::new(x, y, t, polarity))),
        _ => Ok(Line::OutOfRange),
    }
}

fn format_error(path: &Path, line: usize, reason: &str) -> Error {
    Error::InvalidFormat(format!("{}:{line}: {reason}", path.display()))
}

/// Reader for `t x y p` event files.
pub struct EventFileReader {
    reader: MappedFileReader,
}

impl EventFileReader {
    /// Opens an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            reader: MappedFileReader::open(path)?,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.size()
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// Parses the whole file, lines in parallel, preserving file order.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] naming a malformed line.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        self.read_all_with_discards().map(|(events, _)| events)
    }

    /// Like [`read_all`](Self::read_all), also returning how many lines were
    /// dropped for out-of-range coordinates.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] naming a malformed line.
    pub fn read_all_with_discards(&self) -> Result<(Vec<Event>, usize)> {
        let lines: Vec<(usize, &[u8])> = self
            .reader
            .as_bytes()
            .split(|&b| b == b'\n')
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .collect();

        let parsed = lines
            .par_iter()
            .map(|&(number, line)| {
                parse_line(line).map_err(|reason| format_error(self.path(), number, &reason))
            })
            .collect::<Result<Vec<Line>>>()?;

        let mut events = Vec::with_capacity(parsed.len());
        let mut out_of_range = 0;
        for line in parsed {
            match line {
                Line::Event(event) => events.push(event),
                Line::OutOfRange => out_of_range += 1,
                Line::Skip => {}
            }
        }

        if out_of_range > 0 {
            warn!(
                "{}: dropped {} events with out-of-range coordinates",
                self.path().display(),
                out_of_range
            );
        }
        debug!(
            "read {} events from {} ({} lines)",
            events.len(),
            self.path().display(),
            lines.len()
        );
        Ok((events, out_of_range))
    }

    /// Streams the file as batches of up to `batch_size` events.
    ///
    /// A `batch_size` of zero is treated as one.
    #[must_use]
    pub fn batches(&self, batch_size: usize) -> EventBatches<'_> {
        EventBatches {
            data: self.reader.as_bytes(),
            path: self.reader.path(),
            position: 0,
            line: 0,
            batch_size: batch_size.max(1),
            out_of_range: 0,
            failed: false,
        }
    }
}

/// Iterator over consecutive event batches of a mapped file.
///
/// Stops after yielding the first parse error.
pub struct EventBatches<'a> {
    data: &'a [u8],
    path: &'a Path,
    position: usize,
    line: usize,
    batch_size: usize,
    out_of_range: usize,
    failed: bool,
}

impl EventBatches<'_> {
    /// Lines dropped so far for out-of-range coordinates.
    #[must_use]
    pub fn out_of_range(&self) -> usize {
        self.out_of_range
    }
}

impl Iterator for EventBatches<'_> {
    type Item = Result<Vec<Event>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.data.len() {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size && self.position < self.data.len() {
            let rest = &self.data[self.position..];
            let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
            let line = &rest[..end];
            self.position += end + 1;
            self.line += 1;

            match parse_line(line) {
                Ok(Line::Event(event)) => batch.push(event),
                Ok(Line::OutOfRange) => {
                    debug!(
                        "{}:{}: coordinates out of range, dropped",
                        self.path.display(),
                        self.line
                    );
                    self.out_of_range += 1;
                }
                Ok(Line::Skip) => {}
                Err(reason) => {
                    self.failed = true;
                    return Some(Err(format_error(self.path, self.line, &reason)));
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

/// Smallest sensor size covering every event: `(max x + 1, max y + 1)`.
#[must_use]
pub fn infer_sensor_size(events: &[Event]) -> Option<(u32, u32)> {
    let width = events.iter().map(|e| u32::from(e.x)).max()?;
    let height = events.iter().map(|e| u32::from(e.y)).max()?;
    Some((width + 1, height + 1))
}
