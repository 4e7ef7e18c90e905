use anyhow::{anyhow, Result};
use std::io::Write;

use super::VariantKey;

const HEADER: &str = "##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

/// Write variant identities as a minimal 8-column VCF with no genotype
/// columns, ready for external re-annotation.
pub fn write_unannotated_vcf<'a, W, I>(writer: &mut W, variants: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a VariantKey>,
{
    writer.write_all(HEADER.as_bytes())?;

    for variant in variants {
        let line = format!(
            "{chrom}\t{pos}\t.\t{ref_allele}\t{alt_allele}\t.\t.\t.\n",
            chrom = variant.chrom(),
            pos = variant.pos(),
            ref_allele = variant.reference(),
            alt_allele = variant.alternate(),
        );
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

/// Render the minimal VCF into a string (useful for tests and snapshots).
pub fn render_unannotated_vcf<'a, I>(variants: I) -> Result<String>
where
    I: IntoIterator<Item = &'a VariantKey>,
{
    let mut buffer = Vec::new();
    write_unannotated_vcf(&mut buffer, variants)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered VCF is not valid UTF-8"))
}
