//! # Amplicon panel QC core
//!
//! Parsers and analyses for targeted amplicon sequencing runs:
//!
//! 1. **Regions**: BED-like region files and aligner manifests load into an
//!    [`IntervalStore`] answering "which amplicon covers this base".
//! 2. **Variants**: VCF caller output loads into a [`VariantModel`] keyed by
//!    sample, with per-record INFO and FORMAT maps.
//! 3. **Annotation**: EFF strings from a re-annotated VCF are indexed by
//!    variant identity in an [`AnnotationIndex`].
//! 4. **Deduplication**: QC-passing variants from every sample collapse into
//!    one minimal VCF for external annotation.
//! 5. **Coverage**: a per-base depth matrix is evaluated against target
//!    regions, yielding each sample's failed amplicons.
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::path::Path;
//! use ampliqc::{compress_variants, QcConfig, VariantModel};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = QcConfig::default();
//! let model = VariantModel::from_path(Path::new("run.vcf"))?;
//! let unique = compress_variants([&model], config.min_variant_quality, config.min_variant_depth)?;
//! unique.write_vcf(&mut std::io::stdout())?;
//! # Ok(())
//! # }
//! ```
//!
//! Diagnostics are emitted through `tracing`; installing a subscriber is left
//! to the caller.

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod genomics;
pub mod util;

pub use config::{ConfigError, QcConfig};
pub use genomics::{
    classify_genotype, compress_variants, regions_from_manifest_path, AmpliconDepths,
    AnnotationIndex, CoverageAnalyzer, FailedRegions, GenotypeClass, InterpretationIndex,
    IntervalStore, UniqueVariants, VariantKey, VariantModel, VariantRecord,
};
