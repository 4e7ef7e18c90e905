//! Variant, annotation and coverage models for amplicon panel QC.
//!
//! Region files load into [`IntervalStore`]s, caller output into
//! [`VariantModel`]s, and the remaining components derive annotation lookups,
//! deduplicated variant sets and per-sample coverage failures from those.

mod amplicon;
mod annotation;
mod coverage;
mod dedup;
mod genotype;
mod interval;
mod manifest;
mod types;
mod variant_model;
mod vcf;

pub use amplicon::{AmpliconDepths, AmpliconStatsError, AmpliconStatus};
pub use annotation::{
    Annotation, AnnotationError, AnnotationIndex, Hgvs, InterpretationIndex, ANNOTATION_KEY,
    INTERPRETATION_KEY,
};
pub use coverage::{
    read_sample_order, sample_token, CoverageAnalyzer, CoverageError, FailedRegions,
    TARGET_FLANK_TRIM,
};
pub use dedup::{compress_variants, DedupError, UniqueVariants, DEPTH_KEY};
pub use genotype::{classify_genotype, GenotypeClass};
pub use interval::{Interval, IntervalError, IntervalStore};
pub use manifest::{regions_from_manifest, regions_from_manifest_path, ManifestError};
pub use types::{FieldMap, VariantKey, VariantRecord, VariantSite, PASS_FILTER};
pub use variant_model::{
    parse_format, parse_info, VariantModel, VcfError, ACCEPTED_FILE_FORMATS, CANONICAL_COLUMNS,
    NO_SAMPLE,
};
pub use vcf::{render_unannotated_vcf, write_unannotated_vcf};
