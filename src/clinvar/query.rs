//! ClinVar overlap queries and variant set loading.
//!
//! Loading is two-phase: an id search over the gene's span, then one
//! batched summary request for every id found. Either phase failing fails
//! the whole load; ids from phase one are never surfaced on their own.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::ClinicalVariant;
use crate::coords::{bare_chrom, thousands, GeneBounds, GenomicRange};
use crate::sources::{VariantSource, VariantSummary};
use crate::Result;

/// Coordinate-system tag of a ClinVar position search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssemblyTag {
    /// GRCh37 / hg19 positions
    ChrPos37,
    /// GRCh38 / hg38 positions
    ChrPos38,
}

impl AssemblyTag {
    /// Select the tag for an assembly id; anything but "hg19" is GRCh38.
    pub fn for_assembly(assembly: &str) -> Self {
        match assembly {
            "hg19" => Self::ChrPos37,
            _ => Self::ChrPos38,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChrPos37 => "chrpos37",
            Self::ChrPos38 => "chrpos38",
        }
    }
}

impl fmt::Display for AssemblyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ClinVar search for variants positioned inside a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapQuery {
    /// Chromosome label without prefix (e.g., "17")
    pub chromosome: String,
    /// Searched span, `[min, max]`
    pub range: GenomicRange,
    pub tag: AssemblyTag,
    /// Maximum number of ids requested
    pub page_size: usize,
}

impl OverlapQuery {
    pub fn new(chrom: &str, bounds: GeneBounds, assembly: &str, page_size: usize) -> Self {
        Self {
            chromosome: bare_chrom(chrom).to_string(),
            range: bounds.as_range(),
            tag: AssemblyTag::for_assembly(assembly),
            page_size,
        }
    }

    /// E-utilities search term (e.g., `17[chromosome] AND 43044295:43125483[chrpos38]`).
    pub fn term(&self) -> String {
        format!(
            "{}[chromosome] AND {}:{}[{}]",
            self.chromosome, self.range.start, self.range.end, self.tag
        )
    }
}

/// Title-case each space-separated word (`single nucleotide variant` ->
/// `Single Nucleotide Variant`).
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render `location_sort` with thousands separators, "Unknown" when absent.
fn format_location(location_sort: Option<&str>) -> String {
    location_sort
        .and_then(|raw| leading_integer(raw.trim()))
        .map(thousands)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Integer prefix of a string (`"00043045712"` -> 43045712).
fn leading_integer(raw: &str) -> Option<u64> {
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

/// Turn one summary record into a variant of the set.
pub fn variant_from_summary(summary: VariantSummary, chromosome: &str) -> ClinicalVariant {
    let location = format_location(summary.location_sort.as_deref());
    ClinicalVariant {
        clinvar_id: summary.uid,
        title: summary.title,
        variation_type: title_case(summary.obj_type.as_deref().unwrap_or("Unknown")),
        classification: summary
            .classification
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        gene_sort: summary.gene_sort.unwrap_or_default(),
        chromosome: chromosome.to_string(),
        location,
        score: None,
        is_scoring: false,
        score_error: None,
    }
}

/// Load the variants overlapping a gene.
///
/// Returns `Ok(None)` without contacting the source when the bounds (or
/// the chromosome) are not known yet.
pub async fn fetch_variants(
    source: &dyn VariantSource,
    chrom: &str,
    bounds: Option<GeneBounds>,
    assembly: &str,
    page_size: usize,
) -> Result<Option<Vec<ClinicalVariant>>> {
    let Some(bounds) = bounds else {
        tracing::debug!("Gene bounds unknown, skipping ClinVar lookup");
        return Ok(None);
    };
    if chrom.is_empty() {
        tracing::debug!("Gene chromosome unknown, skipping ClinVar lookup");
        return Ok(None);
    }

    let query = OverlapQuery::new(chrom, bounds, assembly, page_size);
    tracing::debug!("ClinVar search: {}", query.term());

    let ids = source.search_ids(&query).await?;
    if ids.is_empty() {
        tracing::info!("No ClinVar variants found for {}", query.term());
        return Ok(Some(Vec::new()));
    }

    let summaries = source.fetch_summaries(&ids).await?;
    let variants: Vec<ClinicalVariant> = summaries
        .into_iter()
        .map(|summary| variant_from_summary(summary, &query.chromosome))
        .collect();
    tracing::info!(
        "Loaded {} ClinVar variants on chr{}:{}",
        variants.len(),
        query.chromosome,
        query.range
    );
    Ok(Some(variants))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hg19", AssemblyTag::ChrPos37)]
    #[case("hg38", AssemblyTag::ChrPos38)]
    #[case("hs1", AssemblyTag::ChrPos38)]
    #[case("", AssemblyTag::ChrPos38)]
    fn test_assembly_tag(#[case] assembly: &str, #[case] expected: AssemblyTag) {
        assert_eq!(AssemblyTag::for_assembly(assembly), expected);
    }

    #[test]
    fn test_query_term() {
        let bounds = GeneBounds::from_endpoints(43125483, 43044295);
        let query = OverlapQuery::new("chr17", bounds, "hg38", 20);
        assert_eq!(query.chromosome, "17");
        assert_eq!(
            query.term(),
            "17[chromosome] AND 43044295:43125483[chrpos38]"
        );

        let query = OverlapQuery::new("17", bounds, "hg19", 20);
        assert!(query.term().ends_with("[chrpos37]"));
    }

    #[rstest]
    #[case("single nucleotide variant", "Single Nucleotide Variant")]
    #[case("DELETION", "Deletion")]
    #[case("copy number gain", "Copy Number Gain")]
    #[case("Indel", "Indel")]
    #[case("", "")]
    fn test_title_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(title_case(input), expected);
    }

    #[test]
    fn test_variant_from_full_summary() {
        let summary = VariantSummary {
            uid: "55601".to_string(),
            title: "NM_007294.4(BRCA1):c.5123C>A (p.Ala1708Glu)".to_string(),
            obj_type: Some("single nucleotide variant".to_string()),
            classification: Some("Pathogenic".to_string()),
            gene_sort: Some("BRCA1".to_string()),
            location_sort: Some("00000000043063903".to_string()),
        };
        let variant = variant_from_summary(summary, "17");
        assert_eq!(variant.clinvar_id, "55601");
        assert_eq!(variant.title, "NM_007294.4(BRCA1):c.5123C>A (p.Ala1708Glu)");
        assert_eq!(variant.variation_type, "Single Nucleotide Variant");
        assert_eq!(variant.classification, "Pathogenic");
        assert_eq!(variant.location, "43,063,903");
        assert_eq!(variant.chromosome, "17");
        assert!(variant.score.is_none());
        assert!(!variant.is_scoring);
    }

    #[test]
    fn test_variant_from_sparse_summary() {
        let summary = VariantSummary {
            uid: "1".to_string(),
            title: "GRCh38/hg38 17q21.31(chr17:43044295-43125483)x3".to_string(),
            ..Default::default()
        };
        let variant = variant_from_summary(summary, "17");
        assert_eq!(variant.variation_type, "Unknown");
        assert_eq!(variant.classification, "Unknown");
        assert_eq!(variant.location, "Unknown");
        assert_eq!(variant.gene_sort, "");
    }
}
