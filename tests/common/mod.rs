#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const UPDATE_ENV: &str = "AMPLIQC_UPDATE_SNAPSHOTS";

/// Compare `actual` with `tests/snapshots/<name>` line by line, ignoring line
/// endings. With `AMPLIQC_UPDATE_SNAPSHOTS` set the file is rewritten instead.
pub fn assert_snapshot(name: &str, actual: &str) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/snapshots")
        .join(name);

    if std::env::var_os(UPDATE_ENV).is_some() {
        fs::create_dir_all(path.parent().expect("snapshot has a parent dir"))
            .expect("create snapshot directory");
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("cannot read snapshot {}: {err}", path.display()));
    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();

    if let Some(idx) = (0..expected_lines.len().max(actual_lines.len()))
        .find(|&idx| expected_lines.get(idx) != actual_lines.get(idx))
    {
        panic!(
            "{} differs at line {}\n  expected: {:?}\n  actual:   {:?}\nrerun with {UPDATE_ENV}=1 to accept the new output",
            path.display(),
            idx + 1,
            expected_lines.get(idx),
            actual_lines.get(idx),
        );
    }
}

/// Scratch directory holding input files for one test.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Caller VCF with one sample column and the given body rows.
pub fn sample_vcf(sample: &str, rows: &[&str]) -> String {
    let mut text = String::from(
        "##fileformat=VCFv4.1\n\
         ##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth\">\n\
         ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n",
    );
    text.push_str("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t");
    text.push_str(sample);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}
