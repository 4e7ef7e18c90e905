#[path = "common/mod.rs"]
mod common;

use std::fmt::Write as _;

use ampliqc::genomics::{
    regions_from_manifest_path, AmpliconDepths, CoverageAnalyzer, CoverageError, IntervalStore,
};
use ampliqc::QcConfig;
use common::Fixture;

const TARGETS: &str = "\
#chrom\tstart\tend\tname
chr17\t41245400\t41245420\tBRCA1_ex11a_t
chr17\t41245500\t41245510\tBRCA1_ex11b_t
";

const CORE: &str = "\
chr17\t41245390\t41245430\tBRCA1_ex11a
chr17\t41245490\t41245520\tBRCA1_ex11b
";

const SAMPLE_ORDER: &str = "/scratch/run42/S1/run42_S1.bam\n/scratch/run42/S2/run42_S2.bam\n";

fn depth_matrix(depth_for: impl Fn(u32, usize) -> Option<u32>) -> String {
    let mut out = String::new();
    for (start, end) in [(41_245_400u32, 41_245_420u32), (41_245_500, 41_245_510)] {
        for pos in start..=end {
            let depths: Option<Vec<u32>> = (0..2).map(|sample| depth_for(pos, sample)).collect();
            let Some(depths) = depths else { continue };
            write!(out, "chr17\t{pos}").unwrap();
            for depth in depths {
                write!(out, "\t{depth}").unwrap();
            }
            out.push('\n');
        }
    }
    out
}

fn run(matrix: &str) -> Result<ampliqc::FailedRegions, CoverageError> {
    let fixture = Fixture::new();
    let targets = IntervalStore::from_path(&fixture.write("targets.bed", TARGETS)).unwrap();
    let core = IntervalStore::from_path(&fixture.write("core.bed", CORE)).unwrap();
    let depth = fixture.write("run42_Coverage.txt", matrix);
    let order = fixture.write("BAMsforDepthAnalysis.list", SAMPLE_ORDER);

    let threshold = QcConfig::default().min_panel_depth;
    CoverageAnalyzer::new(&targets, &core, threshold).analyze_paths(&depth, &order)
}

#[test]
fn adequate_depth_everywhere_fails_nothing() {
    let threshold = QcConfig::default().min_panel_depth;
    let failed = run(&depth_matrix(|_, _| Some(threshold + 1))).unwrap();
    assert_eq!(failed.samples().collect::<Vec<_>>(), ["S1", "S2"]);
    for (_, regions) in failed.iter() {
        assert!(regions.is_empty());
    }
}

#[test]
fn low_base_fails_only_its_sample_and_amplicon() {
    let threshold = QcConfig::default().min_panel_depth;
    let failed = run(&depth_matrix(|pos, sample| {
        Some(if pos == 41_245_505 && sample == 1 {
            threshold - 1
        } else {
            threshold + 1
        })
    }))
    .unwrap();

    assert!(failed.failed_for("S1").unwrap().is_empty());
    assert_eq!(
        failed.failed_for("S2").unwrap().iter().collect::<Vec<_>>(),
        ["BRCA1_ex11b"]
    );
}

#[test]
fn missing_row_fails_region_for_all_samples() {
    let failed = run(&depth_matrix(|pos, _| (pos != 41_245_410).then_some(2000))).unwrap();
    for sample in ["S1", "S2"] {
        assert!(failed.is_failed(sample, "BRCA1_ex11a"));
        assert!(!failed.is_failed(sample, "BRCA1_ex11b"));
    }
}

#[test]
fn flank_bases_may_be_absent() {
    let failed = run(&depth_matrix(|pos, _| {
        let flank = pos == 41_245_400 || pos == 41_245_401 || pos == 41_245_500;
        (!flank).then_some(2000)
    }))
    .unwrap();
    for (_, regions) in failed.iter() {
        assert!(regions.is_empty());
    }
}

#[test]
fn short_depth_row_is_fatal() {
    let err = run("chr17\t41245402\t500\n").unwrap_err();
    assert!(matches!(err, CoverageError::ColumnCount { line: 1, .. }));
}

#[test]
fn manifest_regions_drive_amplicon_status() {
    let fixture = Fixture::new();
    let manifest = fixture.write(
        "panel_manifest.txt",
        "#Probes\nRS1\tchr1\t1001\tACGTACGTACGTACGTACGT\t3\t4\t+\nRS2\tchr2\t501\tACGTACGTACGTACGTACGT\t3\t4\t-\n#Targets\nRS1\tchr1\t1000\t1020\n",
    );
    let stats = fixture.write("S1_MappingStats.txt", "#Amplicon\tA\tB\tReads\nRS1\tx\ty\t1500\n");

    let regions = regions_from_manifest_path(&manifest).unwrap();
    assert_eq!(regions.len(), 2);

    let mut depths = AmpliconDepths::new();
    depths.load_sample_path("S1", &stats).unwrap();
    let threshold = QcConfig::default().min_amplicon_depth;
    let verdicts: Vec<(String, u64, bool)> = regions
        .iter()
        .map(|amplicon| {
            let status = depths.status("S1", &amplicon.name, threshold);
            (amplicon.name.clone(), status.depth, status.passed)
        })
        .collect();
    assert_eq!(
        verdicts,
        vec![("RS1".to_string(), 1500, true), ("RS2".to_string(), 0, false)]
    );
}
