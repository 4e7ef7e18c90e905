use std::fmt;

/// Report label for a sample's GT token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GenotypeClass {
    /// One reference and one alternative allele.
    Het,
    /// Two alternative alleles.
    HomAlt,
    /// One alternative allele, the other uncalled.
    UncertainHet,
    /// Neither allele called.
    UncertainHom,
    /// No GT value at all.
    Unknown,
    /// Anything else (multi-allelic, hom-ref, malformed); needs manual review.
    Complex,
}

impl GenotypeClass {
    /// Label written to reports.
    pub fn label(self) -> &'static str {
        match self {
            GenotypeClass::Het => "HET",
            GenotypeClass::HomAlt => "HOM_ALT",
            GenotypeClass::UncertainHet => "UNCERTAIN_HET",
            GenotypeClass::UncertainHom => "UNCERTAIN_HOM",
            GenotypeClass::Unknown => "Unknown",
            GenotypeClass::Complex => "Complex",
        }
    }
}

impl fmt::Display for GenotypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a GT token. Phased (`|`) and unphased (`/`) separators are
/// interchangeable; `1/0` is accepted even though callers should emit `0/1`.
pub fn classify_genotype(token: &str) -> GenotypeClass {
    match token {
        "0/1" | "1/0" | "0|1" | "1|0" => GenotypeClass::Het,
        "1/1" | "1|1" => GenotypeClass::HomAlt,
        "./1" | "1/." | ".|1" | "1|." => GenotypeClass::UncertainHet,
        "./." | ".|." => GenotypeClass::UncertainHom,
        "" => GenotypeClass::Unknown,
        _ => GenotypeClass::Complex,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0/1", GenotypeClass::Het)]
    #[test_case("1/0", GenotypeClass::Het)]
    #[test_case("0|1", GenotypeClass::Het)]
    #[test_case("1|0", GenotypeClass::Het)]
    #[test_case("1/1", GenotypeClass::HomAlt)]
    #[test_case("1|1", GenotypeClass::HomAlt)]
    #[test_case("./1", GenotypeClass::UncertainHet)]
    #[test_case("1/.", GenotypeClass::UncertainHet)]
    #[test_case(".|1", GenotypeClass::UncertainHet)]
    #[test_case("1|.", GenotypeClass::UncertainHet)]
    #[test_case("./.", GenotypeClass::UncertainHom)]
    #[test_case(".|.", GenotypeClass::UncertainHom)]
    #[test_case("", GenotypeClass::Unknown)]
    #[test_case("2/3", GenotypeClass::Complex)]
    #[test_case("0/0", GenotypeClass::Complex)]
    #[test_case("0/1/1", GenotypeClass::Complex)]
    #[test_case(" 0/1", GenotypeClass::Complex)]
    fn classifies(token: &str, expected: GenotypeClass) {
        assert_eq!(classify_genotype(token), expected);
    }

    #[test]
    fn labels_match_report_vocabulary() {
        let labels: Vec<&str> = [
            GenotypeClass::Het,
            GenotypeClass::HomAlt,
            GenotypeClass::UncertainHet,
            GenotypeClass::UncertainHom,
            GenotypeClass::Unknown,
            GenotypeClass::Complex,
        ]
        .iter()
        .map(|class| class.label())
        .collect();
        assert_eq!(
            labels,
            ["HET", "HOM_ALT", "UNCERTAIN_HET", "UNCERTAIN_HOM", "Unknown", "Complex"]
        );
        assert_eq!(GenotypeClass::HomAlt.to_string(), "HOM_ALT");
    }
}
