//! Genome, chromosome and gene catalog records.
//!
//! The remote catalogs return loosely shaped data. The helpers here turn
//! it into the lists the session offers: assemblies grouped by organism,
//! primary chromosomes in karyotype order, and gene search hits with
//! UCSC-style chromosome names.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::coords::ucsc_chrom;

/// One reference genome build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    /// Assembly identifier (e.g., "hg38")
    pub id: String,
    /// Source name (e.g., "GRCh38 Genome Reference Consortium Human Reference 38")
    pub source_name: String,
    /// Display name
    pub name: String,
    /// Whether the build is currently served
    pub active: bool,
    /// Organism the build belongs to; "other" when the catalog omits it
    pub organism: String,
}

/// A chromosome of an assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chromosome {
    /// UCSC name (e.g., "chr17")
    pub name: String,
    /// Length in bp
    pub size: u64,
}

/// A gene hit from a search or browse lookup.
///
/// Symbols are not unique within one result list, so a gene is identified
/// by symbol, chromosome and its index in the list it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    /// Gene symbol (e.g., "BRCA1")
    pub symbol: String,
    /// Display name
    pub name: String,
    /// UCSC chromosome name (e.g., "chr17")
    pub chrom: String,
    /// Free-text description
    pub description: String,
    /// NCBI Gene ID (e.g., "672")
    pub gene_id: Option<String>,
}

/// Group assemblies by organism, keeping catalog order within each group.
pub fn group_by_organism(assemblies: Vec<Assembly>) -> BTreeMap<String, Vec<Assembly>> {
    let mut grouped: BTreeMap<String, Vec<Assembly>> = BTreeMap::new();
    for assembly in assemblies {
        grouped
            .entry(assembly.organism.clone())
            .or_default()
            .push(assembly);
    }
    grouped
}

/// Check whether a chromosome is a primary contig.
///
/// Alternate haplotypes, unplaced and random contigs are excluded.
pub fn is_primary_chromosome(name: &str) -> bool {
    !(name.contains('_') || name.contains("Un") || name.contains("random"))
}

/// Karyotype ordering: numeric labels ascending, then the rest lexically.
pub fn compare_chromosomes(a: &str, b: &str) -> Ordering {
    let a = a.replacen("chr", "", 1);
    let b = b.replacen("chr", "", 1);
    let num = |s: &str| -> Option<u64> {
        if !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit()) {
            s.parse().ok()
        } else {
            None
        }
    };
    match (num(&a), num(&b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(&b),
    }
}

/// Keep primary chromosomes and sort them in karyotype order.
pub fn primary_chromosomes(mut chromosomes: Vec<Chromosome>) -> Vec<Chromosome> {
    chromosomes.retain(|c| is_primary_chromosome(&c.name));
    chromosomes.sort_by(|a, b| compare_chromosomes(&a.name, &b.name));
    chromosomes
}

/// Normalize raw search hits: UCSC chromosome names, result limit.
pub fn normalize_gene_hits(hits: Vec<Gene>, limit: usize) -> Vec<Gene> {
    hits.into_iter()
        .take(limit)
        .map(|mut gene| {
            if !gene.chrom.is_empty() {
                gene.chrom = ucsc_chrom(&gene.chrom);
            }
            gene
        })
        .collect()
}

/// Browse filter: genes located on the selected chromosome.
pub fn genes_on_chromosome(genes: Vec<Gene>, chrom: &str) -> Vec<Gene> {
    genes.into_iter().filter(|g| g.chrom == chrom).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrom(name: &str) -> Chromosome {
        Chromosome {
            name: name.to_string(),
            size: 1,
        }
    }

    fn gene(symbol: &str, chrom: &str) -> Gene {
        Gene {
            symbol: symbol.to_string(),
            name: format!("{} gene", symbol),
            chrom: chrom.to_string(),
            description: format!("{} gene", symbol),
            gene_id: None,
        }
    }

    #[test]
    fn test_primary_filter() {
        assert!(is_primary_chromosome("chr1"));
        assert!(is_primary_chromosome("chrX"));
        assert!(!is_primary_chromosome("chr1_KI270706v1_random"));
        assert!(!is_primary_chromosome("chrUn_GL000195v1"));
        assert!(!is_primary_chromosome("chr17_alt"));
    }

    #[test]
    fn test_karyotype_order() {
        let sorted = primary_chromosomes(vec![
            chrom("chrX"),
            chrom("chr10"),
            chrom("chrM"),
            chrom("chr2"),
            chrom("chrUn_x"),
            chrom("chr1"),
            chrom("chrY"),
        ]);
        let names: Vec<_> = sorted.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["chr1", "chr2", "chr10", "chrM", "chrX", "chrY"]);
    }

    #[test]
    fn test_group_by_organism() {
        let assembly = |id: &str, organism: &str| Assembly {
            id: id.to_string(),
            source_name: id.to_string(),
            name: id.to_string(),
            active: true,
            organism: organism.to_string(),
        };
        let grouped = group_by_organism(vec![
            assembly("hg38", "Human"),
            assembly("mm39", "Mouse"),
            assembly("hg19", "Human"),
        ]);
        let human: Vec<_> = grouped["Human"].iter().map(|a| a.id.as_str()).collect();
        assert_eq!(human, vec!["hg38", "hg19"]);
        assert_eq!(grouped["Mouse"].len(), 1);
    }

    #[test]
    fn test_normalize_gene_hits() {
        let hits: Vec<Gene> = (0..15).map(|i| gene(&format!("G{}", i), "17")).collect();
        let normalized = normalize_gene_hits(hits, 10);
        assert_eq!(normalized.len(), 10);
        assert!(normalized.iter().all(|g| g.chrom == "chr17"));
    }

    #[test]
    fn test_normalize_keeps_prefixed_and_empty() {
        let normalized = normalize_gene_hits(vec![gene("A", "chrX"), gene("B", "")], 10);
        assert_eq!(normalized[0].chrom, "chrX");
        assert_eq!(normalized[1].chrom, "");
    }

    #[test]
    fn test_genes_on_chromosome() {
        let genes = vec![gene("A", "chr1"), gene("B", "chr11"), gene("C", "chr1")];
        let on_chr1 = genes_on_chromosome(genes, "chr1");
        let symbols: Vec<_> = on_chr1.iter().map(|g| g.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["A", "C"]);
    }
}
