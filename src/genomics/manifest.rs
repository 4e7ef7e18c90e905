//! Amplicon-aligner manifest → region conversion.
//!
//! A manifest row describes one amplicon as
//! `name, chromosome, 1-based start, amplicon sequence, upstream probe length,
//! downstream probe length, strand`. The sequenced region excludes both probes,
//! and the probe order flips on the reverse strand.

use std::io::{self, BufRead};
use std::path::Path;

use thiserror::Error;
use tracing::info;

use super::interval::{Interval, IntervalStore};
use crate::util::{numbered_lines, open_reader};

const MANIFEST_COLUMNS: usize = 7;

/// Errors raised while reading an amplicon manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest could not be read.
    #[error("failed to read manifest: {0}")]
    Io(#[from] io::Error),

    /// Row does not have exactly seven columns.
    #[error("line {line}: expected 7 columns, found {found}")]
    ColumnCount {
        /// 1-based line number.
        line: usize,
        /// Columns present.
        found: usize,
    },

    /// A numeric column failed to parse.
    #[error("line {line}: invalid {field} '{value}'")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// Column description.
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// Probe trimming leaves no region, or coordinates overflow.
    #[error("line {line}: amplicon '{name}' has no sequenced region after probe trimming")]
    EmptyRegion {
        /// 1-based line number.
        line: usize,
        /// Amplicon name.
        name: String,
    },
}

/// Build the genotyping region store from a manifest file.
pub fn regions_from_manifest_path(path: &Path) -> Result<IntervalStore, ManifestError> {
    let store = regions_from_manifest(open_reader(path)?)?;
    info!(path = %path.display(), amplicons = store.len(), "loaded amplicon manifest");
    Ok(store)
}

/// Build the genotyping region store from manifest text.
///
/// The first `#` line opens the amplicon section and the next `#` line ends it.
pub fn regions_from_manifest<R: BufRead>(reader: R) -> Result<IntervalStore, ManifestError> {
    let mut intervals = Vec::new();
    let mut seen_section_header = false;

    for entry in numbered_lines(reader) {
        let (line_no, line) = entry?;
        if line.starts_with('#') {
            if seen_section_header {
                break;
            }
            seen_section_header = true;
            continue;
        }
        intervals.push(parse_manifest_row(line_no, &line)?);
    }

    Ok(IntervalStore::from_intervals(intervals))
}

fn parse_manifest_row(line_no: usize, line: &str) -> Result<Interval, ManifestError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != MANIFEST_COLUMNS {
        return Err(ManifestError::ColumnCount {
            line: line_no,
            found: fields.len(),
        });
    }

    let number = |field: &'static str, value: &str| {
        value
            .parse::<i64>()
            .map_err(|_| ManifestError::InvalidNumber {
                line: line_no,
                field,
                value: value.to_string(),
            })
    };
    let position = number("start position", fields[2])?;
    let upstream = number("upstream probe length", fields[4])?;
    let downstream = number("downstream probe length", fields[5])?;
    let sequence_len = fields[3].len() as i64;

    let mut start = position - 1;
    let mut end = start + sequence_len;
    if fields[6] == "+" {
        start += upstream;
        end -= downstream;
    } else {
        start += downstream;
        end -= upstream;
    }

    let empty = || ManifestError::EmptyRegion {
        line: line_no,
        name: fields[0].to_string(),
    };
    let start = u32::try_from(start).map_err(|_| empty())?;
    let end = u32::try_from(end).map_err(|_| empty())?;
    if start >= end {
        return Err(empty());
    }

    Ok(Interval {
        chrom: fields[1].to_string(),
        start,
        end,
        name: fields[0].to_string(),
    })
}
