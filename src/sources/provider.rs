//! Remote collaborator traits
//!
//! Defines the contracts the locus pipeline consumes. Implementations:
//! - [`MockSources`](super::MockSources) for testing
//! - UCSC / NCBI / scoring HTTP clients (feature `http`)
//!
//! Every method returns typed records decoded at the boundary. Transport
//! problems, non-success statuses and undecodable bodies are
//! [`LocusError::UpstreamFailure`](crate::LocusError) or
//! [`LocusError::Decode`](crate::LocusError); data-level problems that the
//! service itself reports travel inside the record (see [`SequenceReply`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::{Assembly, Chromosome, Gene};
use crate::clinvar::{OverlapQuery, ScoreResult};
use crate::coords::HalfOpenRange;
use crate::Result;

/// Gene metadata as returned by the gene summary lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneMetadata {
    /// Genomic placements; only the first one is used
    pub genomic_info: Vec<GenomicInfo>,
    /// Free-text gene summary
    pub summary: Option<String>,
    pub organism: Option<Organism>,
}

/// One genomic placement of a gene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomicInfo {
    pub chrstart: u64,
    pub chrstop: u64,
    /// Chromosome accession with version (e.g., "NC_000017.11")
    pub chraccver: Option<String>,
    pub strand: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organism {
    pub scientific_name: String,
    pub common_name: String,
}

/// Reply of a sequence lookup.
///
/// A reply with `error` set (or without `dna`) is a soft data error, not a
/// failed call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceReply {
    pub dna: Option<String>,
    pub error: Option<String>,
}

/// One ClinVar summary record (phase two of the variant lookup).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariantSummary {
    /// ClinVar UID
    pub uid: String,
    pub title: String,
    /// Raw variation type (e.g., "single nucleotide variant")
    pub obj_type: Option<String>,
    /// Germline classification description
    pub classification: Option<String>,
    pub gene_sort: Option<String>,
    /// Numeric position used for sorting, as text
    pub location_sort: Option<String>,
}

/// A request to score one substitution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreRequest {
    /// 1-based position
    pub position: u64,
    /// Alternate nucleotide
    pub alternative: char,
    /// Assembly identifier (e.g., "hg38")
    pub assembly: String,
    /// Chromosome as the session knows it (e.g., "chr17")
    pub chromosome: String,
}

/// Genome and chromosome catalog.
#[async_trait]
pub trait GenomeCatalog: Send + Sync {
    /// All assemblies the catalog serves.
    async fn list_assemblies(&self) -> Result<Vec<Assembly>>;

    /// Raw chromosome list of an assembly (unfiltered, unsorted).
    async fn list_chromosomes(&self, assembly: &str) -> Result<Vec<Chromosome>>;
}

/// Gene search and metadata.
#[async_trait]
pub trait GeneDirectory: Send + Sync {
    /// Free-text gene search, at most `limit` hits.
    async fn search_genes(&self, query: &str, assembly: &str, limit: usize) -> Result<Vec<Gene>>;

    /// Gene metadata; `Ok(None)` when the service knows no such gene.
    async fn gene_metadata(&self, gene_id: &str) -> Result<Option<GeneMetadata>>;
}

/// Reference sequence retrieval.
#[async_trait]
pub trait SequenceSource: Send + Sync {
    /// Fetch the sequence of a 0-based half-open range.
    async fn fetch_sequence(
        &self,
        assembly: &str,
        chrom: &str,
        range: HalfOpenRange,
    ) -> Result<SequenceReply>;
}

/// Two-phase ClinVar lookup.
#[async_trait]
pub trait VariantSource: Send + Sync {
    /// Phase one: record ids matching the overlap query.
    async fn search_ids(&self, query: &OverlapQuery) -> Result<Vec<String>>;

    /// Phase two: summaries for all ids in one batched request.
    async fn fetch_summaries(&self, ids: &[String]) -> Result<Vec<VariantSummary>>;
}

/// External pathogenicity predictor.
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResult>;
}

/// The full set of collaborators the orchestrator talks to.
#[derive(Clone)]
pub struct Sources {
    pub catalog: Arc<dyn GenomeCatalog>,
    pub genes: Arc<dyn GeneDirectory>,
    pub sequence: Arc<dyn SequenceSource>,
    pub variants: Arc<dyn VariantSource>,
    /// `None` when no scoring endpoint is configured
    pub scoring: Option<Arc<dyn ScoringService>>,
}

impl Sources {
    /// Use one object for every collaborator (e.g., a mock).
    pub fn uniform<T>(source: Arc<T>) -> Self
    where
        T: GenomeCatalog + GeneDirectory + SequenceSource + VariantSource + ScoringService + 'static,
    {
        Self {
            catalog: source.clone(),
            genes: source.clone(),
            sequence: source.clone(),
            variants: source.clone(),
            scoring: Some(source),
        }
    }

    /// Drop the scoring collaborator.
    pub fn without_scoring(mut self) -> Self {
        self.scoring = None;
        self
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("scoring", &self.scoring.is_some())
            .finish_non_exhaustive()
    }
}
