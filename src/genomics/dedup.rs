use std::io::Write;

use indexmap::IndexSet;
use thiserror::Error;
use tracing::info;

use super::types::VariantKey;
use super::variant_model::VariantModel;
use super::vcf::write_unannotated_vcf;

/// INFO key holding the site read depth.
pub const DEPTH_KEY: &str = "DP";

/// Data-integrity failures while selecting variants. Both are fatal: they mean
/// the caller output is malformed.
#[derive(Debug, Error)]
pub enum DedupError {
    /// A record passing FILTER and QUAL has no `DP`.
    #[error("{variant} passes QC filters but has no INFO/DP value")]
    MissingDepth {
        /// Offending variant.
        variant: VariantKey,
    },

    /// `DP` is not an integer.
    #[error("{variant} has non-integer INFO/DP '{value}'")]
    InvalidDepth {
        /// Offending variant.
        variant: VariantKey,
        /// Raw value.
        value: String,
    },
}

/// QC-passing variant identities collected across samples, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueVariants {
    variants: IndexSet<VariantKey>,
}

impl UniqueVariants {
    /// Number of distinct variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether nothing passed QC.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Whether the variant was selected.
    pub fn contains(&self, variant: &VariantKey) -> bool {
        self.variants.contains(variant)
    }

    /// Iterate in first-seen order.
    pub fn iter(&self) -> indexmap::set::Iter<'_, VariantKey> {
        self.variants.iter()
    }

    /// Write the minimal 8-column VCF for re-annotation.
    pub fn write_vcf<W: Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        write_unannotated_vcf(writer, &self.variants)
    }
}

impl<'a> IntoIterator for &'a UniqueVariants {
    type Item = &'a VariantKey;
    type IntoIter = indexmap::set::Iter<'a, VariantKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}

/// Collect the distinct identities of records with `FILTER == PASS`,
/// `QUAL >= min_quality` and `INFO/DP >= min_depth`, across every sample of
/// every model.
pub fn compress_variants<'a, I>(
    models: I,
    min_quality: f64,
    min_depth: u32,
) -> Result<UniqueVariants, DedupError>
where
    I: IntoIterator<Item = &'a VariantModel>,
{
    let mut variants = IndexSet::new();
    let mut examined = 0usize;

    for model in models {
        for record in model.iter_records() {
            examined += 1;
            let meets_quality = record.quality() >= min_quality;
            if !record.is_pass() || !meets_quality {
                continue;
            }
            let raw = record
                .info_value(DEPTH_KEY)
                .ok_or_else(|| DedupError::MissingDepth {
                    variant: record.key().clone(),
                })?;
            let depth = raw.parse::<i64>().map_err(|_| DedupError::InvalidDepth {
                variant: record.key().clone(),
                value: raw.to_string(),
            })?;
            if depth >= i64::from(min_depth) {
                variants.insert(record.key().clone());
            }
        }
    }

    info!(
        examined,
        unique = variants.len(),
        "compressed variants for annotation"
    );
    Ok(UniqueVariants { variants })
}
