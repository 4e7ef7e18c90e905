//! Functional annotations embedded in INFO by the external annotator.
//!
//! Each `EFF` value is a comma-separated list of entries shaped like
//! `EFFECT(IMPACT|CLASS|CODON|AA_CHANGE|AA_LEN|GENE|BIOTYPE|CODING|TRANSCRIPT|EXON|ALLELE)`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use indexmap::IndexSet;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::VariantKey;
use super::variant_model::VariantModel;

/// INFO key carrying per-transcript annotations.
pub const ANNOTATION_KEY: &str = "EFF";
/// INFO key carrying curated interpretations.
pub const INTERPRETATION_KEY: &str = "INT";

const SKIPPED_EFFECT_PREFIX: &str = "sequence_feature";
const ANNOTATION_FIELDS: usize = 12;

/// Errors raised while deriving annotation or interpretation indexes.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// An annotation entry has fewer than twelve fields (structural).
    #[error("malformed EFF entry for {variant}: '{entry}' has {found} fields, expected 12")]
    MalformedEntry {
        /// Variant carrying the entry.
        variant: VariantKey,
        /// The offending entry.
        entry: String,
        /// Fields found.
        found: usize,
    },

    /// An interpretation record has neither `INT` nor `EFF` (data integrity).
    #[error("interpretation for {variant} has neither INT nor EFF in INFO")]
    MissingInterpretation {
        /// Variant lacking an interpretation.
        variant: VariantKey,
    },
}

/// One transcript-level annotation of a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Annotation {
    /// Predicted effect, e.g. `NON_SYNONYMOUS_CODING`.
    pub effect: String,
    /// Impact class (`HIGH`, `MODERATE`, ...).
    pub impact: String,
    /// Functional class (`MISSENSE`, `NONSENSE`, ...).
    pub functional_class: String,
    /// Codon change.
    pub codon_change: String,
    /// Protein and coding change packed as `p./c.`.
    pub amino_acid_change: String,
    /// Protein length.
    pub amino_acid_length: String,
    /// Gene symbol.
    pub gene: String,
    /// Transcript biotype.
    pub biotype: String,
    /// Whether the gene is coding.
    pub coding: String,
    /// Transcript identifier.
    pub transcript: String,
    /// Exon rank.
    pub exon_rank: String,
    /// Index of the ALT allele the entry refers to.
    pub allele: String,
}

/// HGVS notation unpacked from [`Annotation::amino_acid_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hgvs<'a> {
    /// Coding (`c.`) or non-coding (`n.`) change.
    pub coding: Option<&'a str>,
    /// Protein (`p.`) change.
    pub protein: Option<&'a str>,
}

impl Annotation {
    /// Parse a single annotation entry; `None` when it has fewer than twelve fields.
    pub fn parse(entry: &str) -> Option<Self> {
        let fields: Vec<&str> = split_entry(entry).collect();
        if fields.len() < ANNOTATION_FIELDS {
            return None;
        }
        let field = |idx: usize| fields[idx].to_string();
        Some(Self {
            effect: field(0),
            impact: field(1),
            functional_class: field(2),
            codon_change: field(3),
            amino_acid_change: field(4),
            amino_acid_length: field(5),
            gene: field(6),
            biotype: field(7),
            coding: field(8),
            transcript: field(9),
            exon_rank: field(10),
            allele: field(11),
        })
    }

    /// Split the packed change: `p./c.` gives both, a lone value is the
    /// coding change.
    pub fn hgvs(&self) -> Hgvs<'_> {
        let parts: Vec<&str> = self.amino_acid_change.split('/').collect();
        match parts.as_slice() {
            [coding] => Hgvs {
                coding: Some(*coding),
                protein: None,
            },
            [protein, coding] => Hgvs {
                coding: Some(*coding),
                protein: Some(*protein),
            },
            _ => Hgvs::default(),
        }
    }
}

fn split_entry(entry: &str) -> impl Iterator<Item = &str> {
    entry.split(|c: char| matches!(c, '(' | ')' | '|'))
}

fn parse_annotations(value: &str, variant: &VariantKey) -> Result<Vec<Annotation>, AnnotationError> {
    let mut annotations = Vec::new();
    for entry in value.split(',') {
        if entry.starts_with(SKIPPED_EFFECT_PREFIX) {
            continue;
        }
        let annotation = Annotation::parse(entry).ok_or_else(|| AnnotationError::MalformedEntry {
            variant: variant.clone(),
            entry: entry.to_string(),
            found: split_entry(entry).count(),
        })?;
        annotations.push(annotation);
    }
    Ok(annotations)
}

/// Variant identity → distinct annotations, built from an annotated model.
#[derive(Debug, Clone, Default)]
pub struct AnnotationIndex {
    annotations: HashMap<VariantKey, IndexSet<Annotation>>,
}

impl AnnotationIndex {
    /// Collect annotations from every record of every sample bucket.
    ///
    /// `sequence_feature` entries are dropped and identical entries collapse.
    /// A variant whose entries are all dropped gets no index entry.
    /// Each distinct annotation string is parsed once.
    pub fn derive(model: &VariantModel) -> Result<Self, AnnotationError> {
        let mut annotations: HashMap<VariantKey, IndexSet<Annotation>> = HashMap::new();
        let mut parsed: HashMap<&str, Vec<Annotation>> = HashMap::new();

        for record in model.iter_records() {
            let Some(value) = record.info_value(ANNOTATION_KEY) else {
                continue;
            };
            let entries = match parsed.entry(value) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(parse_annotations(value, record.key())?),
            };
            if entries.is_empty() {
                continue;
            }
            annotations
                .entry(record.key().clone())
                .or_default()
                .extend(entries.iter().cloned());
        }

        debug!(variants = annotations.len(), "derived annotation index");
        Ok(Self { annotations })
    }

    /// Annotations for a variant, in first-seen order.
    pub fn get(&self, variant: &VariantKey) -> Option<&IndexSet<Annotation>> {
        self.annotations.get(variant)
    }

    /// Whether any annotation exists for the variant.
    pub fn contains(&self, variant: &VariantKey) -> bool {
        self.annotations.contains_key(variant)
    }

    /// Number of annotated variants.
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Whether no variant is annotated.
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Iterate over annotated variants (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = (&VariantKey, &IndexSet<Annotation>)> {
        self.annotations.iter()
    }
}

/// Variant identity → curated interpretation text.
#[derive(Debug, Clone, Default)]
pub struct InterpretationIndex {
    interpretations: HashMap<VariantKey, String>,
}

impl InterpretationIndex {
    /// Read `INT` from every record, falling back to `EFF` for files written
    /// by older annotators.
    pub fn derive(model: &VariantModel) -> Result<Self, AnnotationError> {
        let mut interpretations = HashMap::new();

        for record in model.iter_records() {
            let text = match record.info_value(INTERPRETATION_KEY) {
                Some(text) => text,
                None => {
                    warn!(variant = %record.key(), "no INT value, falling back to EFF");
                    record.info_value(ANNOTATION_KEY).ok_or_else(|| {
                        AnnotationError::MissingInterpretation {
                            variant: record.key().clone(),
                        }
                    })?
                }
            };
            interpretations
                .entry(record.key().clone())
                .or_insert_with(|| text.to_string());
        }

        Ok(Self { interpretations })
    }

    /// Interpretation for a variant.
    pub fn get(&self, variant: &VariantKey) -> Option<&str> {
        self.interpretations.get(variant).map(String::as_str)
    }

    /// Number of interpreted variants.
    pub fn len(&self) -> usize {
        self.interpretations.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.interpretations.is_empty()
    }
}
