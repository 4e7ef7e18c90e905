use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ampliqc::genomics::{
    compress_variants, regions_from_manifest_path, AmpliconDepths, AnnotationIndex,
    CoverageAnalyzer, InterpretationIndex, IntervalStore, VariantModel,
};
use ampliqc::QcConfig;

#[derive(Parser, Debug)]
#[command(name = "ampliqc", about = "Variant and coverage QC for amplicon sequencing panels")]
struct Cli {
    /// Log debug diagnostics to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct OutputArg {
    /// Write to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Name the first region containing a position.
    Lookup {
        /// Region file (`chrom start end name`).
        regions: PathBuf,
        chrom: String,
        pos: u32,
    },
    /// Collapse QC-passing variants from caller output into a minimal VCF.
    Compress {
        /// Caller VCF files.
        #[arg(required = true)]
        vcfs: Vec<PathBuf>,
        #[arg(long, default_value_t = QcConfig::default().min_variant_quality)]
        min_quality: f64,
        #[arg(long, default_value_t = QcConfig::default().min_variant_depth)]
        min_depth: u32,
        #[command(flatten)]
        output: OutputArg,
    },
    /// List the EFF annotations of a re-annotated VCF.
    Annotate {
        vcf: PathBuf,
        /// Print INT interpretations (falling back to EFF) instead.
        #[arg(long)]
        interpretations: bool,
    },
    /// Classify every sample genotype in a VCF.
    Genotypes { vcf: PathBuf },
    /// Report regions failing per-base coverage for each sample.
    Gaps {
        /// Fine-grained target regions evaluated base by base.
        #[arg(long)]
        targets: PathBuf,
        /// Amplicon regions used to name failing bases.
        #[arg(long)]
        core: PathBuf,
        /// Depth matrix (`chrom pos depth...`).
        #[arg(long)]
        depth: PathBuf,
        /// One alignment file name per depth column.
        #[arg(long)]
        samples: PathBuf,
        #[arg(long, default_value_t = QcConfig::default().min_panel_depth)]
        min_depth: u32,
    },
    /// Convert an aligner manifest into a genotyping region file.
    Manifest {
        manifest: PathBuf,
        #[command(flatten)]
        output: OutputArg,
    },
    /// Report mapped read depth per amplicon from aligner statistics.
    Amplicons {
        /// Aligner manifest listing the amplicons.
        #[arg(long)]
        manifest: PathBuf,
        /// Per-sample statistics as `SAMPLE=PATH`.
        #[arg(long = "stats", value_parser = parse_sample_path, required = true)]
        stats: Vec<(String, PathBuf)>,
        #[arg(long, default_value_t = QcConfig::default().min_amplicon_depth)]
        min_depth: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Lookup { regions, chrom, pos } => run_lookup(&regions, &chrom, pos)?,
        Commands::Compress {
            vcfs,
            min_quality,
            min_depth,
            output,
        } => {
            let config = QcConfig::default()
                .with_min_variant_quality(min_quality)
                .with_min_variant_depth(min_depth);
            config.validate()?;
            run_compress(&vcfs, &config, output)?
        }
        Commands::Annotate {
            vcf,
            interpretations,
        } => run_annotate(&vcf, interpretations)?,
        Commands::Genotypes { vcf } => run_genotypes(&vcf)?,
        Commands::Gaps {
            targets,
            core,
            depth,
            samples,
            min_depth,
        } => run_gaps(&targets, &core, &depth, &samples, min_depth)?,
        Commands::Manifest { manifest, output } => run_manifest(&manifest, output)?,
        Commands::Amplicons {
            manifest,
            stats,
            min_depth,
        } => run_amplicons(&manifest, &stats, min_depth)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_sample_path(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((sample, path)) if !sample.is_empty() && !path.is_empty() => {
            Ok((sample.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected SAMPLE=PATH, got '{raw}'")),
    }
}

fn open_output(output: OutputArg) -> Result<Box<dyn Write>> {
    Ok(match output.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(&path)
                .with_context(|| format!("failed to create output file {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn load_model(path: &Path) -> Result<VariantModel> {
    VariantModel::from_path(path)
        .with_context(|| format!("failed to parse variant file {}", path.display()))
}

fn load_regions(path: &Path) -> Result<IntervalStore> {
    IntervalStore::from_path(path)
        .with_context(|| format!("failed to load region file {}", path.display()))
}

fn run_lookup(regions_path: &Path, chrom: &str, pos: u32) -> Result<()> {
    let regions = load_regions(regions_path)?;
    match regions.lookup(chrom, pos) {
        Some(interval) => println!(
            "{}\t{}\t{}\t{}",
            interval.name, interval.chrom, interval.start, interval.end
        ),
        None => println!("{chrom}:{pos} is off target"),
    }
    Ok(())
}

fn run_compress(vcf_paths: &[PathBuf], config: &QcConfig, output: OutputArg) -> Result<()> {
    let models = vcf_paths
        .iter()
        .map(|path| load_model(path))
        .collect::<Result<Vec<_>>>()?;

    let unique = compress_variants(
        &models,
        config.min_variant_quality,
        config.min_variant_depth,
    )
    .context("variant compression failed")?;
    debug!(variants = unique.len(), "writing unannotated variants");

    let mut writer = open_output(output)?;
    unique.write_vcf(&mut writer)
}

fn run_annotate(vcf_path: &Path, interpretations: bool) -> Result<()> {
    let model = load_model(vcf_path)?;
    let mut out = BufWriter::new(io::stdout().lock());

    if interpretations {
        let index = InterpretationIndex::derive(&model)
            .with_context(|| format!("failed to index interpretations in {}", vcf_path.display()))?;
        for record in model.iter_records() {
            if let Some(text) = index.get(record.key()) {
                writeln!(out, "{}\t{}", record.key(), text)?;
            }
        }
    } else {
        let index = AnnotationIndex::derive(&model)
            .with_context(|| format!("failed to index annotations in {}", vcf_path.display()))?;
        for (variant, annotations) in index.iter() {
            for annotation in annotations {
                let hgvs = annotation.hgvs();
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    variant,
                    annotation.gene,
                    annotation.transcript,
                    hgvs.coding.unwrap_or(""),
                    hgvs.protein.unwrap_or(""),
                    annotation.exon_rank,
                    annotation.effect
                )?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn run_genotypes(vcf_path: &Path) -> Result<()> {
    let model = load_model(vcf_path)?;
    if !model.has_genotypes() {
        return Err(anyhow!("{} has no sample columns", vcf_path.display()));
    }

    let mut out = BufWriter::new(io::stdout().lock());
    for (sample, records) in model.records() {
        for record in records {
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                sample,
                record.key(),
                record.genotype(),
                record.genotype_class()
            )?;
        }
    }
    out.flush()?;
    Ok(())
}

fn run_gaps(
    targets_path: &Path,
    core_path: &Path,
    depth_path: &Path,
    samples_path: &Path,
    min_depth: u32,
) -> Result<()> {
    let targets = load_regions(targets_path)?;
    let core = load_regions(core_path)?;

    let failed = CoverageAnalyzer::new(&targets, &core, min_depth)
        .analyze_paths(depth_path, samples_path)
        .with_context(|| format!("coverage analysis of {} failed", depth_path.display()))?;

    let mut out = BufWriter::new(io::stdout().lock());
    for (sample, regions) in failed.iter() {
        for region in regions {
            writeln!(out, "{sample}\t{region}")?;
        }
    }
    out.flush()?;
    Ok(())
}

fn run_manifest(manifest_path: &Path, output: OutputArg) -> Result<()> {
    let regions = regions_from_manifest_path(manifest_path)
        .with_context(|| format!("failed to convert manifest {}", manifest_path.display()))?;
    let mut writer = open_output(output)?;
    regions.write_bed(&mut writer)?;
    Ok(())
}

fn run_amplicons(manifest_path: &Path, stats: &[(String, PathBuf)], min_depth: u32) -> Result<()> {
    let regions = regions_from_manifest_path(manifest_path)
        .with_context(|| format!("failed to convert manifest {}", manifest_path.display()))?;

    let mut depths = AmpliconDepths::new();
    for (sample, path) in stats {
        depths
            .load_sample_path(sample, path)
            .with_context(|| format!("failed to load statistics for {sample} from {}", path.display()))?;
    }

    let mut out = BufWriter::new(io::stdout().lock());
    for (sample, _) in stats {
        for amplicon in &regions {
            let status = depths.status(sample, &amplicon.name, min_depth);
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                sample,
                amplicon.name,
                status.depth,
                if status.passed { "PASS" } else { "FAIL" }
            )?;
        }
    }
    out.flush()?;
    Ok(())
}
