//! Per-sample coverage gap detection over target regions.
//!
//! A depth matrix (`chromosome, position, depth_1 .. depth_n`) is streamed once
//! against the positions of every target region. Any sample with a base below
//! the minimum depth fails the core amplicon containing that base, and target
//! bases that never appear in the matrix fail for every sample.

use std::collections::{BTreeSet, HashMap};
use std::io::{self, BufRead};
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::interval::IntervalStore;
use crate::util::{numbered_lines, open_reader};

/// Bases trimmed from the start of every target region before evaluation.
pub const TARGET_FLANK_TRIM: u32 = 2;

/// Errors raised while computing coverage outcomes.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// The depth matrix or sample order file could not be read.
    #[error("failed to read coverage input: {0}")]
    Io(#[from] io::Error),

    /// A sample order line has no `_`/`.` separated token.
    #[error("sample order line {line}: cannot derive a sample token from '{value}'")]
    MalformedSampleName {
        /// 1-based line number.
        line: usize,
        /// The full line.
        value: String,
    },

    /// Two sample order lines resolve to the same token.
    #[error("sample order line {line}: sample '{sample}' listed twice")]
    DuplicateSample {
        /// 1-based line number.
        line: usize,
        /// Repeated token.
        sample: String,
    },

    /// A depth row does not carry one depth per sample.
    #[error("depth line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        /// 1-based line number.
        line: usize,
        /// `2 + samples`.
        expected: usize,
        /// Columns present.
        found: usize,
    },

    /// Position or depth is not an integer.
    #[error("depth line {line}: invalid {field} '{value}'")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// Column description.
        field: &'static str,
        /// Offending text.
        value: String,
    },
}

/// Sample token of a sample order line: the second-to-last field after
/// splitting on `_` and `.` (`"run_S12.bam"` gives `"S12"`).
pub fn sample_token(line: &str) -> Option<&str> {
    let fields: Vec<&str> = line.split(['_', '.']).collect();
    if fields.len() < 2 {
        return None;
    }
    Some(fields[fields.len() - 2]).filter(|token| !token.is_empty())
}

/// Read sample tokens in depth-column order. Blank lines are skipped.
pub fn read_sample_order<R: BufRead>(reader: R) -> Result<Vec<String>, CoverageError> {
    let mut samples: Vec<String> = Vec::new();

    for entry in numbered_lines(reader) {
        let (line_no, line) = entry?;
        let line = line.trim();
        let token = sample_token(line).ok_or_else(|| CoverageError::MalformedSampleName {
            line: line_no,
            value: line.to_string(),
        })?;
        if samples.iter().any(|sample| sample == token) {
            return Err(CoverageError::DuplicateSample {
                line: line_no,
                sample: token.to_string(),
            });
        }
        samples.push(token.to_string());
    }

    if samples.is_empty() {
        warn!("sample order file lists no samples");
    }
    Ok(samples)
}

/// Frozen per-sample failed-region sets. A region absent from a sample's set
/// passed for that sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailedRegions {
    failed: IndexMap<String, BTreeSet<String>>,
}

impl FailedRegions {
    /// Samples in depth-column order.
    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.failed.keys().map(String::as_str)
    }

    /// Failed region names for a sample; `None` for an unknown sample.
    pub fn failed_for(&self, sample: &str) -> Option<&BTreeSet<String>> {
        self.failed.get(sample)
    }

    /// Whether `region` failed for `sample`.
    pub fn is_failed(&self, sample: &str, region: &str) -> bool {
        self.failed
            .get(sample)
            .is_some_and(|regions| regions.contains(region))
    }

    /// Iterate `(sample, failed regions)` in depth-column order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, BTreeSet<String>> {
        self.failed.iter()
    }
}

/// Evaluates a depth matrix against target regions, naming failures by the
/// core region that contains each failing base.
#[derive(Debug, Clone, Copy)]
pub struct CoverageAnalyzer<'a> {
    targets: &'a IntervalStore,
    core: &'a IntervalStore,
    min_depth: u32,
}

impl<'a> CoverageAnalyzer<'a> {
    /// Bases with depth below `min_depth` fail.
    pub fn new(targets: &'a IntervalStore, core: &'a IntervalStore, min_depth: u32) -> Self {
        Self {
            targets,
            core,
            min_depth,
        }
    }

    /// Analyse a depth matrix file with its sample order file.
    pub fn analyze_paths(
        &self,
        depth_path: &Path,
        sample_order_path: &Path,
    ) -> Result<FailedRegions, CoverageError> {
        info!(
            depth = %depth_path.display(),
            samples = %sample_order_path.display(),
            min_depth = self.min_depth,
            "analysing coverage"
        );
        self.analyze(open_reader(depth_path)?, open_reader(sample_order_path)?)
    }

    /// Analyse a depth matrix whose columns follow `sample_order`.
    pub fn analyze<D, S>(&self, depth: D, sample_order: S) -> Result<FailedRegions, CoverageError>
    where
        D: BufRead,
        S: BufRead,
    {
        let samples = read_sample_order(sample_order)?;
        self.analyze_samples(depth, samples)
    }

    /// Analyse a depth matrix for an already resolved sample list.
    ///
    /// With no samples the rows carry only chromosome and position, and the
    /// result is empty.
    pub fn analyze_samples<D: BufRead>(
        &self,
        depth: D,
        samples: Vec<String>,
    ) -> Result<FailedRegions, CoverageError> {
        let mut accumulator = CoverageAccumulator::new(self, samples);
        for entry in numbered_lines(depth) {
            let (line_no, line) = entry?;
            accumulator.observe_row(line_no, &line)?;
        }
        Ok(accumulator.finish())
    }
}

/// Single-pass state; consumed by [`CoverageAccumulator::finish`].
struct CoverageAccumulator<'a> {
    core: &'a IntervalStore,
    min_depth: u32,
    observed: HashMap<String, HashMap<u32, bool>>,
    failed: IndexMap<String, BTreeSet<String>>,
    rows: usize,
}

impl<'a> CoverageAccumulator<'a> {
    fn new(analyzer: &CoverageAnalyzer<'a>, samples: Vec<String>) -> Self {
        let mut observed: HashMap<String, HashMap<u32, bool>> = HashMap::new();
        for target in analyzer.targets {
            let positions = observed.entry(target.chrom.clone()).or_default();
            for pos in target.start.saturating_add(TARGET_FLANK_TRIM)..=target.end {
                positions.entry(pos).or_insert(false);
            }
        }

        Self {
            core: analyzer.core,
            min_depth: analyzer.min_depth,
            observed,
            failed: samples
                .into_iter()
                .map(|sample| (sample, BTreeSet::new()))
                .collect(),
            rows: 0,
        }
    }

    fn observe_row(&mut self, line_no: usize, line: &str) -> Result<(), CoverageError> {
        let fields: Vec<&str> = line.split('\t').collect();
        let expected = 2 + self.failed.len();
        if fields.len() != expected {
            return Err(CoverageError::ColumnCount {
                line: line_no,
                expected,
                found: fields.len(),
            });
        }

        let number = |field: &'static str, value: &str| {
            value
                .parse::<u32>()
                .map_err(|_| CoverageError::InvalidNumber {
                    line: line_no,
                    field,
                    value: value.to_string(),
                })
        };
        let chrom = fields[0];
        let pos = number("position", fields[1])?;

        if let Some(flag) = self
            .observed
            .get_mut(chrom)
            .and_then(|positions| positions.get_mut(&pos))
        {
            *flag = true;
        }

        let core = self.core;
        let min_depth = self.min_depth;
        let mut region = None;
        for (raw, regions) in fields[2..].iter().zip(self.failed.values_mut()) {
            if number("depth", raw)? >= min_depth {
                continue;
            }
            let name = *region.get_or_insert_with(|| core.name_at(chrom, pos));
            if let Some(name) = name {
                regions.insert(name.to_string());
            }
        }

        self.rows += 1;
        Ok(())
    }

    fn finish(mut self) -> FailedRegions {
        let mut unobserved = 0usize;
        let mut missing_regions = BTreeSet::new();
        for (chrom, positions) in &self.observed {
            for (&pos, _) in positions.iter().filter(|(_, seen)| !**seen) {
                unobserved += 1;
                if let Some(name) = self.core.name_at(chrom, pos) {
                    missing_regions.insert(name.to_string());
                }
            }
        }

        if unobserved > 0 {
            warn!(
                positions = unobserved,
                regions = missing_regions.len(),
                "target bases absent from depth data, failing them for every sample"
            );
        }
        for regions in self.failed.values_mut() {
            regions.extend(missing_regions.iter().cloned());
        }

        debug!(rows = self.rows, samples = self.failed.len(), "coverage pass complete");
        FailedRegions {
            failed: self.failed,
        }
    }
}
