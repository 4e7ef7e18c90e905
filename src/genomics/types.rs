use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::genotype::{classify_genotype, GenotypeClass};

/// Insertion-ordered key/value pairs taken from an INFO or FORMAT column.
pub type FieldMap = IndexMap<String, String>;

/// FILTER value of a record that passed every caller filter.
pub const PASS_FILTER: &str = "PASS";

/// Genomic identity of a variant.
///
/// Equality and hashing cover exactly chromosome, 1-based position, reference
/// allele and alternative allele, so identities built from two independently
/// parsed files compare equal for the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariantKey {
    chrom: String,
    pos: u32,
    reference: String,
    alternate: String,
}

impl VariantKey {
    /// Construct a variant identity.
    pub fn new(
        chrom: impl Into<String>,
        pos: u32,
        reference: impl Into<String>,
        alternate: impl Into<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            reference: reference.into(),
            alternate: alternate.into(),
        }
    }

    /// Chromosome/contig name.
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// 1-based position.
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Reference allele.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Alternative allele.
    pub fn alternate(&self) -> &str {
        &self.alternate
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}{}>{}",
            self.chrom, self.pos, self.reference, self.alternate
        )
    }
}

/// Site-level columns of a data row, shared by every sample's record.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSite {
    /// Variant identity.
    pub key: VariantKey,
    /// ID column (e.g. a dbSNP rs number), `.` when absent.
    pub id: String,
    /// QUAL column; `.` is stored as 0.
    pub quality: f64,
    /// FILTER column, verbatim.
    pub filter: String,
    /// INFO column split into key/value pairs. Bare flags are not kept.
    pub info: FieldMap,
}

/// One variant row as seen by one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    site: Arc<VariantSite>,
    format: FieldMap,
}

impl VariantRecord {
    /// Pair a shared site with a sample's FORMAT values.
    pub fn new(site: Arc<VariantSite>, format: FieldMap) -> Self {
        Self { site, format }
    }

    /// Site-level data shared across samples.
    pub fn site(&self) -> &VariantSite {
        &self.site
    }

    /// Variant identity.
    pub fn key(&self) -> &VariantKey {
        &self.site.key
    }

    /// Chromosome/contig name.
    pub fn chrom(&self) -> &str {
        self.site.key.chrom()
    }

    /// 1-based position.
    pub fn pos(&self) -> u32 {
        self.site.key.pos()
    }

    /// ID column.
    pub fn id(&self) -> &str {
        &self.site.id
    }

    /// QUAL column (0 when missing).
    pub fn quality(&self) -> f64 {
        self.site.quality
    }

    /// FILTER column.
    pub fn filter(&self) -> &str {
        &self.site.filter
    }

    /// Whether FILTER is exactly `PASS`.
    pub fn is_pass(&self) -> bool {
        self.site.filter == PASS_FILTER
    }

    /// INFO key/value pairs.
    pub fn info(&self) -> &FieldMap {
        &self.site.info
    }

    /// Look up a single INFO value.
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.site.info.get(key).map(String::as_str)
    }

    /// This sample's FORMAT key/value pairs.
    pub fn format(&self) -> &FieldMap {
        &self.format
    }

    /// Look up a single FORMAT value for this sample.
    pub fn format_value(&self, key: &str) -> Option<&str> {
        self.format.get(key).map(String::as_str)
    }

    /// Raw GT token, or the empty string when the sample has none.
    pub fn genotype(&self) -> &str {
        self.format_value("GT").unwrap_or("")
    }

    /// Categorical genotype label for this sample.
    pub fn genotype_class(&self) -> GenotypeClass {
        classify_genotype(self.genotype())
    }
}
