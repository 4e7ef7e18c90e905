use std::io::{self, BufRead, Write};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::util::{numbered_lines, open_reader};

/// Named genomic region from a region (BED-like) file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    /// Chromosome/contig name.
    pub chrom: String,
    /// Start coordinate as written in the file.
    pub start: u32,
    /// End coordinate as written in the file.
    pub end: u32,
    /// Region (amplicon) name.
    pub name: String,
}

impl Interval {
    /// Whether `pos` lies on `chrom` within `start..=end`.
    pub fn contains(&self, chrom: &str, pos: u32) -> bool {
        self.chrom == chrom && self.start <= pos && pos <= self.end
    }
}

/// Errors raised while loading a region file. All are fatal: a partially
/// loaded store is never returned.
#[derive(Debug, Error)]
pub enum IntervalError {
    /// The region file could not be read.
    #[error("failed to read region file: {0}")]
    Io(#[from] io::Error),

    /// Fewer than four non-empty leading fields.
    #[error("line {line}: expected chromosome, start, end and name as non-empty tab-separated fields")]
    MissingFields {
        /// 1-based line number.
        line: usize,
    },

    /// Start or end is not an unsigned integer.
    #[error("line {line}: invalid {field} coordinate '{value}'")]
    InvalidCoordinate {
        /// 1-based line number.
        line: usize,
        /// Which coordinate failed (`start` or `end`).
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// Start is not strictly before end.
    #[error("line {line}: start {start} is not before end {end}")]
    EmptyInterval {
        /// 1-based line number.
        line: usize,
        /// Parsed start.
        start: u32,
        /// Parsed end.
        end: u32,
    },
}

/// Immutable, file-ordered list of intervals answering point lookups.
///
/// Overlapping intervals are kept as written; lookups return the first match
/// in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalStore {
    intervals: Vec<Interval>,
}

impl IntervalStore {
    /// Load a region file (plain or `.gz`).
    pub fn from_path(path: &Path) -> Result<Self, IntervalError> {
        let store = Self::from_reader(open_reader(path)?)?;
        info!(path = %path.display(), intervals = store.len(), "loaded region file");
        Ok(store)
    }

    /// Parse tab-separated `chromosome start end name` lines. Blank lines and
    /// lines starting with `#` are skipped; columns past the fourth are ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, IntervalError> {
        let mut intervals = Vec::new();

        for entry in numbered_lines(reader) {
            let (line_no, line) = entry?;
            if line.starts_with('#') {
                continue;
            }
            intervals.push(parse_interval(line_no, &line)?);
        }

        debug!(intervals = intervals.len(), "parsed region lines");
        Ok(Self { intervals })
    }

    /// Wrap intervals that were already validated elsewhere.
    pub(crate) fn from_intervals(intervals: Vec<Interval>) -> Self {
        Self { intervals }
    }

    /// First interval (in file order) on `chrom` with `start <= pos <= end`.
    pub fn lookup(&self, chrom: &str, pos: u32) -> Option<&Interval> {
        self.intervals
            .iter()
            .find(|interval| interval.contains(chrom, pos))
    }

    /// Name of the first interval containing the position.
    pub fn name_at(&self, chrom: &str, pos: u32) -> Option<&str> {
        self.lookup(chrom, pos).map(|interval| interval.name.as_str())
    }

    /// All intervals in file order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Iterate over intervals in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the store holds no intervals.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Write the store back out as a 4-column region file.
    pub fn write_bed<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for interval in &self.intervals {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}",
                interval.chrom, interval.start, interval.end, interval.name
            )?;
        }
        writer.flush()
    }
}

impl<'a> IntoIterator for &'a IntervalStore {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

fn parse_interval(line_no: usize, line: &str) -> Result<Interval, IntervalError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 4 || fields[..4].iter().any(|field| field.is_empty()) {
        return Err(IntervalError::MissingFields { line: line_no });
    }

    let coordinate = |field: &'static str, value: &str| {
        value
            .parse::<u32>()
            .map_err(|_| IntervalError::InvalidCoordinate {
                line: line_no,
                field,
                value: value.to_string(),
            })
    };
    let start = coordinate("start", fields[1])?;
    let end = coordinate("end", fields[2])?;
    if start >= end {
        return Err(IntervalError::EmptyInterval {
            line: line_no,
            start,
            end,
        });
    }

    Ok(Interval {
        chrom: fields[0].to_string(),
        start,
        end,
        name: fields[3].to_string(),
    })
}
