use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::info;

use crate::util::{numbered_lines, open_reader};

/// Errors raised while loading aligner mapping statistics.
#[derive(Debug, Error)]
pub enum AmpliconStatsError {
    /// The statistics file could not be read.
    #[error("failed to read mapping statistics: {0}")]
    Io(#[from] io::Error),

    /// Row is too short to hold a depth column.
    #[error("line {line}: expected at least 4 columns, found {found}")]
    ColumnCount {
        /// 1-based line number.
        line: usize,
        /// Columns present.
        found: usize,
    },

    /// Depth column is not a non-negative integer.
    #[error("line {line}: invalid depth '{value}' for amplicon '{amplicon}'")]
    InvalidDepth {
        /// 1-based line number.
        line: usize,
        /// Amplicon name.
        amplicon: String,
        /// Offending text.
        value: String,
    },

    /// The same amplicon appears twice for one sample.
    #[error("line {line}: amplicon '{amplicon}' repeated for sample '{sample}'")]
    DuplicateAmplicon {
        /// 1-based line number.
        line: usize,
        /// Sample being loaded.
        sample: String,
        /// Repeated amplicon.
        amplicon: String,
    },
}

/// Coverage verdict for one amplicon of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmpliconStatus {
    /// Mapped read depth (0 when the aligner did not report the amplicon).
    pub depth: u64,
    /// Whether `depth` meets the threshold.
    pub passed: bool,
}

/// Per-sample, per-amplicon mapped read depths from aligner statistics files.
#[derive(Debug, Clone, Default)]
pub struct AmpliconDepths {
    samples: IndexMap<String, HashMap<String, u64>>,
}

impl AmpliconDepths {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one sample's statistics file.
    pub fn load_sample_path(&mut self, sample: &str, path: &Path) -> Result<(), AmpliconStatsError> {
        self.load_sample(sample, open_reader(path)?)?;
        info!(
            sample,
            path = %path.display(),
            amplicons = self.samples.get(sample).map_or(0, HashMap::len),
            "loaded mapping statistics"
        );
        Ok(())
    }

    /// Load tab-separated rows (column 1 amplicon, column 4 depth); `#` and
    /// blank lines are skipped. Loading the same sample again replaces it.
    pub fn load_sample<R: BufRead>(&mut self, sample: &str, reader: R) -> Result<(), AmpliconStatsError> {
        let mut depths = HashMap::new();

        for entry in numbered_lines(reader) {
            let (line_no, line) = entry?;
            if line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 4 {
                return Err(AmpliconStatsError::ColumnCount {
                    line: line_no,
                    found: fields.len(),
                });
            }
            let amplicon = fields[0].to_string();
            let depth = fields[3]
                .trim()
                .parse::<u64>()
                .map_err(|_| AmpliconStatsError::InvalidDepth {
                    line: line_no,
                    amplicon: amplicon.clone(),
                    value: fields[3].to_string(),
                })?;
            if depths.contains_key(&amplicon) {
                return Err(AmpliconStatsError::DuplicateAmplicon {
                    line: line_no,
                    sample: sample.to_string(),
                    amplicon,
                });
            }
            depths.insert(amplicon, depth);
        }

        self.samples.insert(sample.to_string(), depths);
        Ok(())
    }

    /// Reported depth, if any.
    pub fn depth(&self, sample: &str, amplicon: &str) -> Option<u64> {
        self.samples.get(sample)?.get(amplicon).copied()
    }

    /// Depth (0 when unreported) and whether it reaches `threshold`.
    pub fn status(&self, sample: &str, amplicon: &str, threshold: u32) -> AmpliconStatus {
        let depth = self.depth(sample, amplicon).unwrap_or(0);
        AmpliconStatus {
            depth,
            passed: depth >= u64::from(threshold),
        }
    }

    /// Loaded samples in load order.
    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(String::as_str)
    }
}
