//! Locus resolution: gene id to bounds and default window.

use serde::Serialize;

use crate::catalog::Gene;
use crate::coords::{GeneBounds, GenomicRange};
use crate::error::LocusError;
use crate::sources::{GeneDirectory, GeneMetadata, Organism};
use crate::Result;

/// Descriptive gene details kept alongside the bounds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GeneDetails {
    pub summary: Option<String>,
    pub organism: Option<Organism>,
    /// Strand of the placement the bounds came from
    pub strand: Option<String>,
    /// Chromosome accession of that placement (e.g., "NC_000017.11")
    pub chraccver: Option<String>,
}

/// A resolved gene locus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLocus {
    pub bounds: GeneBounds,
    /// First window to load for the gene
    pub default_window: GenomicRange,
    pub details: GeneDetails,
}

impl ResolvedLocus {
    /// Derive the locus from gene metadata.
    ///
    /// Only the first genomic placement is used. Returns `None` when the
    /// metadata carries no placement.
    pub fn from_metadata(metadata: GeneMetadata, window_limit: u64) -> Option<Self> {
        let info = metadata.genomic_info.into_iter().next()?;
        let bounds = GeneBounds::from_endpoints(info.chrstart, info.chrstop);
        Some(Self {
            bounds,
            default_window: bounds.default_window(window_limit),
            details: GeneDetails {
                summary: metadata.summary,
                organism: metadata.organism,
                strand: info.strand,
                chraccver: info.chraccver,
            },
        })
    }
}

/// Resolve a gene to its bounds and default window.
///
/// Fails with [`LocusError::MissingIdentifier`] when the gene has no id,
/// without contacting the directory. `Ok(None)` means the directory knows
/// no placement for the gene, which callers show as "no coordinates".
pub async fn resolve_locus(
    genes: &dyn GeneDirectory,
    gene: &Gene,
    window_limit: u64,
) -> Result<Option<ResolvedLocus>> {
    let gene_id = match gene.gene_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => {
            return Err(LocusError::MissingIdentifier {
                symbol: gene.symbol.clone(),
            })
        }
    };

    tracing::debug!("Fetching gene metadata for {} ({})", gene.symbol, gene_id);
    let Some(metadata) = genes.gene_metadata(gene_id).await? else {
        tracing::info!("No gene metadata for {} ({})", gene.symbol, gene_id);
        return Ok(None);
    };

    let locus = ResolvedLocus::from_metadata(metadata, window_limit);
    match &locus {
        Some(locus) => tracing::info!(
            "Resolved {} to {} (window {})",
            gene.symbol,
            locus.bounds,
            locus.default_window
        ),
        None => tracing::info!("No genomic placement for {} ({})", gene.symbol, gene_id),
    }
    Ok(locus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{GenomicInfo, MockCall, MockSources};
    use proptest::prelude::*;

    fn gene(symbol: &str, gene_id: Option<&str>) -> Gene {
        Gene {
            symbol: symbol.to_string(),
            name: String::new(),
            chrom: "chr17".to_string(),
            description: String::new(),
            gene_id: gene_id.map(str::to_string),
        }
    }

    fn placement(chrstart: u64, chrstop: u64) -> GeneMetadata {
        GeneMetadata {
            genomic_info: vec![GenomicInfo {
                chrstart,
                chrstop,
                chraccver: None,
                strand: Some("-".to_string()),
            }],
            summary: Some("summary".to_string()),
            organism: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_brca1() {
        let mock = MockSources::with_test_data();
        let locus = resolve_locus(&mock, &gene("BRCA1", Some("672")), 10_000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locus.bounds.min(), 43044295);
        assert_eq!(locus.bounds.max(), 43125483);
        assert_eq!(locus.default_window, GenomicRange::new(43044295, 43054295).unwrap());
        assert_eq!(locus.details.strand.as_deref(), Some("-"));
    }

    #[tokio::test]
    async fn test_missing_identifier_makes_no_call() {
        let mock = MockSources::with_test_data();
        for id in [None, Some(""), Some("  ")] {
            let err = resolve_locus(&mock, &gene("ORPHAN", id), 10_000)
                .await
                .unwrap_err();
            assert!(matches!(err, LocusError::MissingIdentifier { .. }));
        }
        assert_eq!(mock.calls(MockCall::GeneMetadata), 0);
    }

    #[tokio::test]
    async fn test_unknown_gene_and_missing_placement() {
        let mock = MockSources::with_test_data();
        assert!(resolve_locus(&mock, &gene("NOPE", Some("1")), 10_000)
            .await
            .unwrap()
            .is_none());
        assert!(resolve_locus(&mock, &gene("BRCA1P1", Some("394269")), 10_000)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let mock = MockSources::with_test_data();
        mock.fail(MockCall::GeneMetadata, "503 Service Unavailable");
        let err = resolve_locus(&mock, &gene("BRCA1", Some("672")), 10_000)
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn test_first_placement_wins() {
        let mut meta = placement(100, 200);
        meta.genomic_info.push(GenomicInfo {
            chrstart: 5000,
            chrstop: 9000,
            chraccver: None,
            strand: None,
        });
        let locus = ResolvedLocus::from_metadata(meta, 10_000).unwrap();
        assert_eq!(locus.bounds, GeneBounds::from_endpoints(100, 200));
    }

    proptest! {
        #[test]
        fn prop_reverse_strand_bounds(a in 1u64..1_000_000_000, b in 1u64..1_000_000_000) {
            let (chrstart, chrstop) = (a.max(b), a.min(b));
            let locus = ResolvedLocus::from_metadata(placement(chrstart, chrstop), 10_000).unwrap();
            prop_assert!(locus.bounds.min() <= locus.bounds.max());
            prop_assert_eq!(locus.bounds.min(), chrstop);
            prop_assert_eq!(locus.bounds.max(), chrstart);
        }

        #[test]
        fn prop_default_window_within_limit(a in 1u64..1_000_000_000, span in 0u64..200_000) {
            let locus = ResolvedLocus::from_metadata(placement(a + span, a), 10_000).unwrap();
            let window = locus.default_window;
            prop_assert_eq!(window.start, locus.bounds.min());
            prop_assert!(window.end - window.start <= 10_000);
            prop_assert!(window.end <= locus.bounds.max());
        }
    }
}
