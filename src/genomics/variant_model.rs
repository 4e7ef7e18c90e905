//! Variant (VCF-like) file parsing into per-sample record lists.
//!
//! Parsing moves from the file-format line through the header (`##` meta
//! lines and the `#CHROM` column row) into the body of data rows. The parser
//! is consumed when the input ends, so a finished model is never mutated.

use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::{FieldMap, VariantKey, VariantRecord, VariantSite};
use crate::util::{numbered_lines, open_reader};

/// File-format declarations produced by the upstream caller and annotator.
pub const ACCEPTED_FILE_FORMATS: [&str; 2] = ["##fileformat=VCFv4.1", "##fileformat=VCFv4.2"];

/// Fixed names of the leading columns, in order.
pub const CANONICAL_COLUMNS: [&str; 9] = [
    "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT",
];

const SITE_COLUMNS: usize = 8;
const FORMAT_COLUMN: usize = 8;
const FIRST_SAMPLE_COLUMN: usize = 9;

/// Bucket used for records when the file declares no sample columns.
pub const NO_SAMPLE: &str = "";

/// Errors raised while parsing a variant file. Every variant is a fatal
/// structural problem; advisory mismatches are logged instead.
#[derive(Debug, Error)]
pub enum VcfError {
    /// The file could not be read.
    #[error("failed to read variant file: {0}")]
    Io(#[from] io::Error),

    /// No single-`#` column header row precedes the data.
    #[error("variant file has no #CHROM column header line")]
    MissingColumnHeader,

    /// Column header row is shorter than the eight site columns.
    #[error("malformed column header: found {found} columns, expected at least 8")]
    TooFewColumns {
        /// Columns present.
        found: usize,
    },

    /// One of the leading column names is wrong.
    #[error("malformed column header: column {column} is '{found}', expected '{expected}'")]
    UnexpectedColumn {
        /// 1-based column number.
        column: usize,
        /// Canonical name.
        expected: &'static str,
        /// Name found in the file.
        found: String,
    },

    /// A sample identifier appears in more than one column.
    #[error("sample '{0}' appears in more than one column")]
    DuplicateSample(String),

    /// A `#CHROM` column row appeared after the first data row.
    #[error("line {line}: column header line after variant records")]
    HeaderAfterRecords {
        /// 1-based line number.
        line: usize,
    },

    /// A data row is shorter than the header requires.
    #[error("line {line}: expected at least {expected} columns, found {found}")]
    ColumnCount {
        /// 1-based line number.
        line: usize,
        /// Columns required by the header.
        expected: usize,
        /// Columns present.
        found: usize,
    },

    /// POS is not an unsigned integer.
    #[error("line {line}: invalid POS '{value}'")]
    InvalidPosition {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },

    /// QUAL is neither `.` nor a number.
    #[error("line {line}: invalid QUAL '{value}'")]
    InvalidQuality {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },
}

/// Parsed variant file.
#[derive(Debug, Clone)]
pub struct VariantModel {
    file_format: String,
    meta: Vec<String>,
    columns: Vec<String>,
    records: IndexMap<String, Vec<VariantRecord>>,
}

impl VariantModel {
    /// Parse a variant file (plain or `.gz`).
    pub fn from_path(path: &Path) -> Result<Self, VcfError> {
        info!(path = %path.display(), "parsing variant file");
        let model = Self::from_reader(open_reader(path)?)?;
        info!(
            path = %path.display(),
            samples = model.records.len(),
            records = model.record_count(),
            "parsed variant file"
        );
        Ok(model)
    }

    /// Parse variant-file text.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, VcfError> {
        let mut parser = Parser::new();
        for entry in numbered_lines(reader) {
            let (line_no, line) = entry?;
            parser.feed(line_no, line)?;
        }
        parser.finish()
    }

    /// First non-blank line of the file, normally `##fileformat=...`.
    pub fn file_format(&self) -> &str {
        &self.file_format
    }

    /// `##` meta lines after the file-format line, in file order.
    pub fn meta_lines(&self) -> &[String] {
        &self.meta
    }

    /// Column header names, including the leading `#CHROM`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Sample identifiers in column order (empty when the file has none).
    pub fn samples(&self) -> &[String] {
        self.columns.get(FIRST_SAMPLE_COLUMN..).unwrap_or(&[])
    }

    /// Whether the file declares sample columns.
    pub fn has_genotypes(&self) -> bool {
        self.columns.len() > FIRST_SAMPLE_COLUMN
    }

    /// Records keyed by sample identifier, or by [`NO_SAMPLE`] when the file
    /// has no sample columns. Buckets follow column order and records follow
    /// file order.
    pub fn records(&self) -> &IndexMap<String, Vec<VariantRecord>> {
        &self.records
    }

    /// Records for one sample bucket.
    pub fn sample_records(&self, sample: &str) -> Option<&[VariantRecord]> {
        self.records.get(sample).map(Vec::as_slice)
    }

    /// Every record across every bucket.
    pub fn iter_records(&self) -> impl Iterator<Item = &VariantRecord> {
        self.records.values().flatten()
    }

    /// Total records across every bucket.
    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// IDs declared by `##INFO=<ID=...>` meta lines.
    pub fn info_ids(&self) -> Vec<&str> {
        self.declared_ids("##INFO=<")
    }

    /// IDs declared by `##FORMAT=<ID=...>` meta lines.
    pub fn format_ids(&self) -> Vec<&str> {
        self.declared_ids("##FORMAT=<")
    }

    fn declared_ids(&self, prefix: &str) -> Vec<&str> {
        self.meta
            .iter()
            .filter_map(|line| line.strip_prefix(prefix))
            .filter_map(|body| body.split(',').find_map(|pair| pair.strip_prefix("ID=")))
            .collect()
    }
}

/// Split an INFO column into key/value pairs.
///
/// `.` yields an empty map. Tokens are split on the first `=`; bare flags
/// without `=` are dropped. When a key repeats, the first value is kept.
pub fn parse_info(field: &str) -> FieldMap {
    let mut info = FieldMap::new();
    if field == "." {
        return info;
    }
    for token in field.split(';') {
        if let Some((key, value)) = token.split_once('=') {
            info.entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    info
}

/// Zip a FORMAT key list with one sample's values.
///
/// When the two lists differ in length only the first pair (the genotype) is
/// kept and every other key maps to the empty string. Returns the map and
/// whether that fallback was applied.
pub fn parse_format(keys: &str, values: &str) -> (FieldMap, bool) {
    let keys: Vec<&str> = keys.split(':').collect();
    let values: Vec<&str> = values.split(':').collect();
    let mut format = FieldMap::with_capacity(keys.len());

    if keys.len() == values.len() {
        for (key, value) in keys.iter().zip(&values) {
            format
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
        return (format, false);
    }

    format.insert(keys[0].to_string(), values[0].to_string());
    for key in &keys[1..] {
        format.entry(key.to_string()).or_default();
    }
    (format, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Unstarted,
    Header,
    Body,
}

struct Parser {
    state: ParseState,
    file_format: String,
    meta: Vec<String>,
    column_header: Option<String>,
    columns: Vec<String>,
    records: IndexMap<String, Vec<VariantRecord>>,
}

impl Parser {
    fn new() -> Self {
        Self {
            state: ParseState::Unstarted,
            file_format: String::new(),
            meta: Vec::new(),
            column_header: None,
            columns: Vec::new(),
            records: IndexMap::new(),
        }
    }

    fn feed(&mut self, line_no: usize, line: String) -> Result<(), VcfError> {
        match self.state {
            ParseState::Unstarted => {
                if !ACCEPTED_FILE_FORMATS.contains(&line.as_str()) {
                    warn!(
                        declared = %line,
                        "file format is not VCFv4.1 or VCFv4.2, parser may not function correctly"
                    );
                }
                self.file_format = line;
                self.state = ParseState::Header;
            }
            ParseState::Header if line.starts_with("##") => self.meta.push(line),
            ParseState::Header if line.starts_with('#') => self.column_header = Some(line),
            ParseState::Header => {
                self.close_header()?;
                self.state = ParseState::Body;
                self.push_row(line_no, &line)?;
            }
            ParseState::Body if line.starts_with("##") => self.meta.push(line),
            ParseState::Body if line.starts_with('#') => {
                return Err(VcfError::HeaderAfterRecords { line: line_no });
            }
            ParseState::Body => self.push_row(line_no, &line)?,
        }
        Ok(())
    }

    fn finish(mut self) -> Result<VariantModel, VcfError> {
        match self.state {
            ParseState::Unstarted => return Err(VcfError::MissingColumnHeader),
            ParseState::Header => self.close_header()?,
            ParseState::Body => {}
        }

        Ok(VariantModel {
            file_format: self.file_format,
            meta: self.meta,
            columns: self.columns,
            records: self.records,
        })
    }

    fn close_header(&mut self) -> Result<(), VcfError> {
        let header = self
            .column_header
            .take()
            .ok_or(VcfError::MissingColumnHeader)?;
        let columns: Vec<String> = header.split('\t').map(str::to_string).collect();

        if columns.len() < SITE_COLUMNS {
            return Err(VcfError::TooFewColumns {
                found: columns.len(),
            });
        }
        for (idx, (found, expected)) in columns.iter().zip(CANONICAL_COLUMNS).enumerate() {
            if found != expected {
                return Err(VcfError::UnexpectedColumn {
                    column: idx + 1,
                    expected,
                    found: found.clone(),
                });
            }
        }

        if columns.len() <= FIRST_SAMPLE_COLUMN {
            warn!("variant file has no genotypes");
            self.records.insert(NO_SAMPLE.to_string(), Vec::new());
        } else {
            for sample in &columns[FIRST_SAMPLE_COLUMN..] {
                if self.records.insert(sample.clone(), Vec::new()).is_some() {
                    return Err(VcfError::DuplicateSample(sample.clone()));
                }
            }
        }

        self.columns = columns;
        Ok(())
    }

    fn push_row(&mut self, line_no: usize, line: &str) -> Result<(), VcfError> {
        let fields: Vec<&str> = line.split('\t').collect();
        let has_genotypes = self.columns.len() > FIRST_SAMPLE_COLUMN;
        let required = if has_genotypes {
            self.columns.len()
        } else {
            SITE_COLUMNS
        };
        if fields.len() < required {
            return Err(VcfError::ColumnCount {
                line: line_no,
                expected: required,
                found: fields.len(),
            });
        }

        let pos = fields[1]
            .parse::<u32>()
            .map_err(|_| VcfError::InvalidPosition {
                line: line_no,
                value: fields[1].to_string(),
            })?;
        let quality = match fields[5] {
            "." => 0.0,
            raw => raw.parse::<f64>().map_err(|_| VcfError::InvalidQuality {
                line: line_no,
                value: raw.to_string(),
            })?,
        };

        let site = Arc::new(VariantSite {
            key: VariantKey::new(fields[0], pos, fields[3], fields[4]),
            id: fields[2].to_string(),
            quality,
            filter: fields[6].to_string(),
            info: parse_info(fields[7]),
        });

        if !has_genotypes {
            self.bucket(NO_SAMPLE)
                .push(VariantRecord::new(site, FieldMap::new()));
            return Ok(());
        }

        let format_keys = fields[FORMAT_COLUMN];
        for (offset, value) in fields[FIRST_SAMPLE_COLUMN..required].iter().enumerate() {
            let sample = &self.columns[FIRST_SAMPLE_COLUMN + offset];
            let format = if *value == "." {
                FieldMap::new()
            } else {
                let (format, truncated) = parse_format(format_keys, value);
                if truncated {
                    warn!(
                        line = line_no,
                        sample = %sample,
                        variant = %site.key,
                        "sample fields do not match FORMAT keys, keeping genotype only"
                    );
                }
                format
            };
            let record = VariantRecord::new(Arc::clone(&site), format);
            let sample = sample.clone();
            self.bucket(&sample).push(record);
        }
        debug!(line = line_no, variant = %site.key, "parsed variant row");
        Ok(())
    }

    fn bucket(&mut self, sample: &str) -> &mut Vec<VariantRecord> {
        self.records.entry(sample.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::GenotypeClass;
    use std::io::Cursor;

    const TWO_SAMPLES: &str = "\
##fileformat=VCFv4.1
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
##INFO=<ID=EFF,Number=.,Type=String,Description=\"Effect\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2
chr1\t100\trs1\tA\tG\t50\tPASS\tDP=1200;AF=0.5;SOMATIC\tGT:AD\t0/1:600,600\t1/1:0,1200
chr2\t200\t.\tC\tT\t.\tLowQ\t.\tGT:AD\t0/1\t.
";

    fn parse(text: &str) -> VariantModel {
        VariantModel::from_reader(Cursor::new(text)).expect("variant file should parse")
    }

    #[test]
    fn samples_get_their_own_buckets_in_column_order() {
        let model = parse(TWO_SAMPLES);
        assert_eq!(model.samples(), ["S1", "S2"]);
        assert!(model.has_genotypes());
        let buckets: Vec<&str> = model.records().keys().map(String::as_str).collect();
        assert_eq!(buckets, ["S1", "S2"]);
        assert_eq!(model.sample_records("S1").unwrap().len(), 2);
        assert_eq!(model.record_count(), 4);
    }

    #[test]
    fn site_columns_are_shared_across_samples() {
        let model = parse(TWO_SAMPLES);
        let s1 = &model.sample_records("S1").unwrap()[0];
        let s2 = &model.sample_records("S2").unwrap()[0];
        assert_eq!(s1.key(), s2.key());
        assert_eq!(s1.id(), "rs1");
        assert_eq!(s1.quality(), 50.0);
        assert_eq!(s1.info_value("DP"), Some("1200"));
        assert_eq!(s1.info_value("SOMATIC"), None);
        assert_eq!(s1.genotype_class(), GenotypeClass::Het);
        assert_eq!(s2.genotype_class(), GenotypeClass::HomAlt);
        assert_eq!(s2.format_value("AD"), Some("0,1200"));
    }

    #[test]
    fn missing_quality_info_and_sample_values() {
        let model = parse(TWO_SAMPLES);
        let s1 = &model.sample_records("S1").unwrap()[1];
        let s2 = &model.sample_records("S2").unwrap()[1];
        assert_eq!(s1.quality(), 0.0);
        assert!(s1.info().is_empty());
        assert!(!s1.is_pass());
        assert!(s2.format().is_empty());
    }

    #[test]
    fn mismatched_format_keeps_only_genotype() {
        let model = parse(TWO_SAMPLES);
        let record = &model.sample_records("S1").unwrap()[1];
        assert_eq!(record.format_value("GT"), Some("0/1"));
        assert_eq!(record.format_value("AD"), Some(""));
    }

    #[test]
    fn no_sample_columns_use_empty_bucket() {
        let model = parse(
            "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\nchr1\t5\t.\tA\tC\t.\t.\tINT=Benign\n",
        );
        assert!(!model.has_genotypes());
        assert!(model.samples().is_empty());
        let records = model.sample_records(NO_SAMPLE).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].info_value("INT"), Some("Benign"));
    }

    #[test]
    fn format_column_without_samples_has_no_genotypes() {
        let model = parse(
            "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\nchr1\t5\t.\tA\tC\t10\tPASS\tDP=3\n",
        );
        assert!(!model.has_genotypes());
        assert_eq!(model.sample_records(NO_SAMPLE).unwrap().len(), 1);
    }

    #[test]
    fn header_only_file_parses_to_empty_buckets() {
        let model = parse("##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n");
        assert_eq!(model.sample_records("S1").unwrap().len(), 0);
    }

    #[test]
    fn unknown_file_format_is_only_advisory() {
        let model = parse("##fileformat=VCFv4.3\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n");
        assert_eq!(model.file_format(), "##fileformat=VCFv4.3");
    }

    #[test]
    fn meta_lines_expose_declared_ids() {
        let model = parse(TWO_SAMPLES);
        assert_eq!(model.meta_lines().len(), 3);
        assert_eq!(model.info_ids(), ["DP", "EFF"]);
        assert_eq!(model.format_ids(), ["GT"]);
    }

    #[test]
    fn info_splits_on_first_equals_and_drops_flags() {
        let info = parse_info("DP=1200;AF=0.5");
        assert_eq!(info.get("DP").map(String::as_str), Some("1200"));
        assert_eq!(info.get("AF").map(String::as_str), Some("0.5"));
        assert_eq!(info.len(), 2);

        let info = parse_info("EFF=a(b|c=d);DB;DP=3;DP=4");
        let pairs: Vec<(&str, &str)> = info.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, [("EFF", "a(b|c=d)"), ("DP", "3")]);
    }

    #[test]
    fn format_zips_positionally() {
        let (format, truncated) = parse_format("GT:DP:VF", "0/1:900:0.45");
        assert!(!truncated);
        assert_eq!(format.get("VF").map(String::as_str), Some("0.45"));

        let (format, truncated) = parse_format("GT:DP:VF", "0/1:900");
        assert!(truncated);
        let pairs: Vec<(&str, &str)> = format.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, [("GT", "0/1"), ("DP", ""), ("VF", "")]);
    }

    #[test]
    fn wrong_canonical_column_is_fatal() {
        let err = VariantModel::from_reader(Cursor::new(
            "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTERS\tINFO\n",
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            VcfError::UnexpectedColumn { column: 7, expected: "FILTER", .. }
        ));
    }

    #[test]
    fn short_header_is_fatal() {
        let err = VariantModel::from_reader(Cursor::new(
            "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\n",
        ))
        .unwrap_err();
        assert!(matches!(err, VcfError::TooFewColumns { found: 7 }));
    }

    #[test]
    fn missing_header_is_fatal() {
        let err = VariantModel::from_reader(Cursor::new("##fileformat=VCFv4.1\nchr1\t1\t.\tA\tC\t.\t.\t.\n"))
            .unwrap_err();
        assert!(matches!(err, VcfError::MissingColumnHeader));

        let err = VariantModel::from_reader(Cursor::new("")).unwrap_err();
        assert!(matches!(err, VcfError::MissingColumnHeader));
    }

    #[test]
    fn truncated_row_is_fatal() {
        let err = VariantModel::from_reader(Cursor::new(
            "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\nchr1\t1\t.\tA\tC\t.\t.\t.\tGT\t0/1\n",
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            VcfError::ColumnCount { line: 3, expected: 11, found: 10 }
        ));
    }

    #[test]
    fn bad_numbers_are_fatal() {
        let header = "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        let err = VariantModel::from_reader(Cursor::new(format!("{header}chr1\tx\t.\tA\tC\t.\t.\t.\n")))
            .unwrap_err();
        assert!(matches!(err, VcfError::InvalidPosition { line: 3, .. }));

        let err = VariantModel::from_reader(Cursor::new(format!("{header}chr1\t1\t.\tA\tC\thigh\t.\t.\n")))
            .unwrap_err();
        assert!(matches!(err, VcfError::InvalidQuality { line: 3, .. }));
    }

    #[test]
    fn duplicate_sample_is_fatal() {
        let err = VariantModel::from_reader(Cursor::new(
            "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS1\n",
        ))
        .unwrap_err();
        assert!(matches!(err, VcfError::DuplicateSample(ref sample) if sample == "S1"));
    }

    #[test]
    fn meta_lines_after_records_are_kept() {
        let model = VariantModel::from_reader(Cursor::new(
            "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\nchr1\t1\t.\tA\tC\t.\t.\t.\n##trailing=comment\nchr1\t2\t.\tG\tT\t.\t.\t.\n",
        ))
        .unwrap();
        assert_eq!(model.meta_lines(), ["##trailing=comment".to_string()]);
        assert_eq!(model.record_count(), 2);
    }

    #[test]
    fn column_header_after_records_is_fatal() {
        let err = VariantModel::from_reader(Cursor::new(
            "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\nchr1\t1\t.\tA\tC\t.\t.\t.\n#CHROM\tPOS\n",
        ))
        .unwrap_err();
        assert!(matches!(err, VcfError::HeaderAfterRecords { line: 4 }));
    }
}
