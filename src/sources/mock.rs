//! In-memory collaborators for tests and offline use
//!
//! [`MockSources`] implements every collaborator trait over canned data and
//! lets a test steer timing and failure per call kind: inject an error,
//! add a delay, or hold calls behind a [`MockGate`] until the test releases
//! them. Every call is counted and its arguments recorded.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Semaphore;

use super::provider::{
    GeneDirectory, GeneMetadata, GenomeCatalog, GenomicInfo, Organism, ScoreRequest,
    ScoringService, SequenceReply, SequenceSource, VariantSource, VariantSummary,
};
use crate::catalog::{Assembly, Chromosome, Gene};
use crate::clinvar::{OverlapQuery, ScoreResult};
use crate::coords::{bare_chrom, HalfOpenRange};
use crate::error::LocusError;
use crate::Result;

/// Collaborator call kinds, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    ListAssemblies,
    ListChromosomes,
    SearchGenes,
    GeneMetadata,
    FetchSequence,
    SearchIds,
    FetchSummaries,
    Score,
}

/// Holds matching calls until released, one call per release.
#[derive(Debug, Clone)]
pub struct MockGate {
    semaphore: Arc<Semaphore>,
}

impl MockGate {
    /// Let one held (or future) call through.
    pub fn release(&self) {
        self.semaphore.add_permits(1);
    }
}

/// A canned ClinVar record.
#[derive(Debug, Clone)]
struct MockVariant {
    summary: VariantSummary,
    /// Bare chromosome label
    chromosome: String,
    position: u64,
}

#[derive(Debug, Default)]
struct MockState {
    assemblies: Vec<Assembly>,
    chromosomes: HashMap<String, Vec<Chromosome>>,
    genes: Vec<Gene>,
    metadata: HashMap<String, GeneMetadata>,
    variants: Vec<MockVariant>,
    scores: HashMap<(u64, char), ScoreResult>,
    /// Soft error message and the number of bases still returned
    sequence_error: Option<(String, Option<u64>)>,

    failures: HashMap<MockCall, String>,
    delays: HashMap<MockCall, Duration>,
    gates: HashMap<(MockCall, String), MockGate>,

    calls: HashMap<MockCall, usize>,
    sequence_requests: Vec<(String, String, HalfOpenRange)>,
    overlap_queries: Vec<OverlapQuery>,
    score_requests: Vec<ScoreRequest>,
}

/// Mock implementation of every collaborator.
///
/// The reference sequence is synthetic: the base at 1-based position `p`
/// is `"acgt"[(p - 1) % 4]`, returned lowercase.
#[derive(Debug, Default)]
pub struct MockSources {
    state: Mutex<MockState>,
}

/// Reference base of the synthetic sequence at a 1-based position.
pub fn mock_base(position: u64) -> char {
    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
    BASES[((position.saturating_sub(1)) % 4) as usize]
}

impl MockSources {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock with human assemblies, BRCA1/BRCA2/TP53 and a handful of
    /// BRCA1 ClinVar records.
    pub fn with_test_data() -> Self {
        let mock = Self::new();
        {
            let mut st = mock.lock();
            st.assemblies = vec![
                assembly("hg38", "Dec. 2013 (GRCh38/hg38)", "Human", true),
                assembly("hg19", "Feb. 2009 (GRCh37/hg19)", "Human", true),
                assembly("mm39", "Jun. 2020 (GRCm39/mm39)", "Mouse", true),
                assembly("sacCer1", "Oct. 2003 (SGD/sacCer1)", "", false),
            ];
            let chroms = vec![
                chromosome("chrY", 57227415),
                chromosome("chr10", 133797422),
                chromosome("chr1_KI270706v1_random", 175055),
                chromosome("chrX", 156040895),
                chromosome("chr17", 83257441),
                chromosome("chrUn_GL000195v1", 182896),
                chromosome("chr2", 242193529),
                chromosome("chrM", 16569),
                chromosome("chr1", 248956422),
                chromosome("chr13", 114364328),
            ];
            st.chromosomes.insert("hg38".to_string(), chroms.clone());
            st.chromosomes.insert("hg19".to_string(), chroms);

            st.genes = vec![
                gene("BRCA1", "BRCA1 DNA repair associated", "17", "672"),
                gene("BRCA2", "BRCA2 DNA repair associated", "13", "675"),
                gene("TP53", "tumor protein p53", "17", "7157"),
                gene("BRCA1P1", "BRCA1 pseudogene 1", "17", "394269"),
            ];
            st.metadata
                .insert("672".to_string(), metadata(43125483, 43044295, "-"));
            st.metadata
                .insert("675".to_string(), metadata(32315508, 32400268, "+"));
            st.metadata
                .insert("7157".to_string(), metadata(7687538, 7661779, "-"));
            // Known to the directory but without placement
            st.metadata.insert(
                "394269".to_string(),
                GeneMetadata {
                    genomic_info: Vec::new(),
                    summary: None,
                    organism: None,
                },
            );

            st.variants = vec![
                snv("55601", "c.5123C>A (p.Ala1708Glu)", "Pathogenic", 43044300),
                snv("37642", "c.4956G>A (p.Met1652Ile)", "Benign", 43045712),
                snv("54318", "c.5096G>A (p.Arg1699Gln)", "Uncertain significance", 43047650),
                MockVariant {
                    summary: VariantSummary {
                        uid: "17661".to_string(),
                        title: "NM_007294.4(BRCA1):c.5266dup (p.Gln1756fs)".to_string(),
                        obj_type: Some("duplication".to_string()),
                        classification: Some("Pathogenic".to_string()),
                        gene_sort: Some("BRCA1".to_string()),
                        location_sort: Some("00000000043057062".to_string()),
                    },
                    chromosome: "17".to_string(),
                    position: 43057062,
                },
                snv("12374", "c.215C>T (p.Pro72Leu)", "Benign", 7676154),
            ];
        }
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn add_assembly(&self, assembly: Assembly) {
        self.lock().assemblies.push(assembly);
    }

    pub fn add_gene(&self, gene: Gene, meta: Option<GeneMetadata>) {
        let mut st = self.lock();
        if let (Some(id), Some(meta)) = (gene.gene_id.clone(), meta) {
            st.metadata.insert(id, meta);
        }
        st.genes.push(gene);
    }

    /// Add a ClinVar record at a 1-based position of a chromosome.
    pub fn add_variant(&self, summary: VariantSummary, chrom: &str, position: u64) {
        self.lock().variants.push(MockVariant {
            summary,
            chromosome: bare_chrom(chrom).to_string(),
            position,
        });
    }

    /// Remove every ClinVar record.
    pub fn clear_variants(&self) {
        self.lock().variants.clear();
    }

    /// Fix the predictor output for one substitution.
    pub fn set_score(&self, position: u64, alternative: char, result: ScoreResult) {
        self.lock().scores.insert((position, alternative), result);
    }

    /// Answer sequence requests with a soft error, optionally still
    /// returning the first `returned` bases.
    pub fn set_sequence_error(&self, msg: impl Into<String>, returned: Option<u64>) {
        self.lock().sequence_error = Some((msg.into(), returned));
    }

    pub fn clear_sequence_error(&self) {
        self.lock().sequence_error = None;
    }

    /// Fail every call of a kind with an upstream error.
    pub fn fail(&self, call: MockCall, msg: impl Into<String>) {
        self.lock().failures.insert(call, msg.into());
    }

    pub fn recover(&self, call: MockCall) {
        self.lock().failures.remove(&call);
    }

    /// Delay every call of a kind.
    pub fn delay(&self, call: MockCall, delay: Duration) {
        self.lock().delays.insert(call, delay);
    }

    /// Hold calls of a kind until released.
    ///
    /// `key` narrows the gate: the gene id for [`MockCall::GeneMetadata`],
    /// the position for [`MockCall::Score`], and `""` for everything else.
    pub fn gate(&self, call: MockCall, key: impl Into<String>) -> MockGate {
        let gate = MockGate {
            semaphore: Arc::new(Semaphore::new(0)),
        };
        self.lock().gates.insert((call, key.into()), gate.clone());
        gate
    }

    /// Number of calls of a kind so far.
    pub fn calls(&self, call: MockCall) -> usize {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// `(assembly, chrom, range)` of every sequence request.
    pub fn sequence_requests(&self) -> Vec<(String, String, HalfOpenRange)> {
        self.lock().sequence_requests.clone()
    }

    pub fn overlap_queries(&self) -> Vec<OverlapQuery> {
        self.lock().overlap_queries.clone()
    }

    pub fn score_requests(&self) -> Vec<ScoreRequest> {
        self.lock().score_requests.clone()
    }

    /// Count the call, then apply gate, delay and injected failure.
    async fn enter(&self, call: MockCall, key: &str) -> Result<()> {
        let (gate, delay) = {
            let mut st = self.lock();
            *st.calls.entry(call).or_default() += 1;
            (
                st.gates.get(&(call, key.to_string())).cloned(),
                st.delays.get(&call).copied(),
            )
        };
        if let Some(gate) = gate {
            if let Ok(permit) = gate.semaphore.acquire().await {
                permit.forget();
            }
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        // Checked after waiting so a test can flip failures while a call is held
        match self.lock().failures.get(&call) {
            Some(msg) => Err(LocusError::upstream("mock", msg)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GenomeCatalog for MockSources {
    async fn list_assemblies(&self) -> Result<Vec<Assembly>> {
        self.enter(MockCall::ListAssemblies, "").await?;
        Ok(self.lock().assemblies.clone())
    }

    async fn list_chromosomes(&self, assembly: &str) -> Result<Vec<Chromosome>> {
        self.enter(MockCall::ListChromosomes, "").await?;
        Ok(self
            .lock()
            .chromosomes
            .get(assembly)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl GeneDirectory for MockSources {
    async fn search_genes(&self, query: &str, _assembly: &str, limit: usize) -> Result<Vec<Gene>> {
        self.enter(MockCall::SearchGenes, "").await?;
        let needle = query.to_lowercase();
        Ok(self
            .lock()
            .genes
            .iter()
            .filter(|g| {
                g.symbol.to_lowercase().contains(&needle)
                    || g.name.to_lowercase().contains(&needle)
                    || g.chrom.eq_ignore_ascii_case(query)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn gene_metadata(&self, gene_id: &str) -> Result<Option<GeneMetadata>> {
        self.enter(MockCall::GeneMetadata, gene_id).await?;
        Ok(self.lock().metadata.get(gene_id).cloned())
    }
}

#[async_trait]
impl SequenceSource for MockSources {
    async fn fetch_sequence(
        &self,
        assembly: &str,
        chrom: &str,
        range: HalfOpenRange,
    ) -> Result<SequenceReply> {
        self.lock()
            .sequence_requests
            .push((assembly.to_string(), chrom.to_string(), range));
        self.enter(MockCall::FetchSequence, "").await?;

        let synth = |len: u64| -> String {
            (range.start..range.start + len)
                .map(|p| mock_base(p + 1).to_ascii_lowercase())
                .collect()
        };
        let soft = self.lock().sequence_error.clone();
        Ok(match soft {
            Some((msg, returned)) => SequenceReply {
                dna: returned.map(|n| synth(n.min(range.len()))),
                error: Some(msg),
            },
            None => SequenceReply {
                dna: Some(synth(range.len())),
                error: None,
            },
        })
    }
}

#[async_trait]
impl VariantSource for MockSources {
    async fn search_ids(&self, query: &OverlapQuery) -> Result<Vec<String>> {
        self.lock().overlap_queries.push(query.clone());
        self.enter(MockCall::SearchIds, "").await?;
        Ok(self
            .lock()
            .variants
            .iter()
            .filter(|v| {
                v.chromosome == query.chromosome
                    && v.position >= query.range.start
                    && v.position <= query.range.end
            })
            .take(query.page_size)
            .map(|v| v.summary.uid.clone())
            .collect())
    }

    async fn fetch_summaries(&self, ids: &[String]) -> Result<Vec<VariantSummary>> {
        self.enter(MockCall::FetchSummaries, "").await?;
        let st = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| st.variants.iter().find(|v| &v.summary.uid == id))
            .map(|v| v.summary.clone())
            .collect())
    }
}

#[async_trait]
impl ScoringService for MockSources {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResult> {
        self.lock().score_requests.push(request.clone());
        self.enter(MockCall::Score, &request.position.to_string())
            .await?;
        let fixed = self
            .lock()
            .scores
            .get(&(request.position, request.alternative))
            .cloned();
        Ok(fixed.unwrap_or_else(|| ScoreResult {
            prediction: "Likely benign".to_string(),
            delta_score: -0.0001,
            classification_confidence: 0.62,
            position: Some(request.position),
            reference: Some(mock_base(request.position).to_string()),
            alternative: Some(request.alternative.to_string()),
        }))
    }
}

fn assembly(id: &str, name: &str, organism: &str, active: bool) -> Assembly {
    Assembly {
        id: id.to_string(),
        source_name: id.to_string(),
        name: name.to_string(),
        active,
        organism: if organism.is_empty() {
            "other".to_string()
        } else {
            organism.to_string()
        },
    }
}

fn chromosome(name: &str, size: u64) -> Chromosome {
    Chromosome {
        name: name.to_string(),
        size,
    }
}

fn gene(symbol: &str, name: &str, chrom: &str, gene_id: &str) -> Gene {
    Gene {
        symbol: symbol.to_string(),
        name: name.to_string(),
        chrom: format!("chr{}", chrom),
        description: name.to_string(),
        gene_id: Some(gene_id.to_string()),
    }
}

fn metadata(chrstart: u64, chrstop: u64, strand: &str) -> GeneMetadata {
    GeneMetadata {
        genomic_info: vec![GenomicInfo {
            chrstart,
            chrstop,
            chraccver: None,
            strand: Some(strand.to_string()),
        }],
        summary: None,
        organism: Some(Organism {
            scientific_name: "Homo sapiens".to_string(),
            common_name: "human".to_string(),
        }),
    }
}

fn snv(uid: &str, change: &str, classification: &str, position: u64) -> MockVariant {
    let gene = if position < 10_000_000 { "TP53" } else { "BRCA1" };
    let tx = if gene == "TP53" {
        "NM_000546.6"
    } else {
        "NM_007294.4"
    };
    MockVariant {
        summary: VariantSummary {
            uid: uid.to_string(),
            title: format!("{}({}):{}", tx, gene, change),
            obj_type: Some("single nucleotide variant".to_string()),
            classification: Some(classification.to_string()),
            gene_sort: Some(gene.to_string()),
            location_sort: Some(format!("{:017}", position)),
        },
        chromosome: "17".to_string(),
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::GeneBounds;

    #[test]
    fn test_mock_base() {
        assert_eq!(mock_base(1), 'A');
        assert_eq!(mock_base(2), 'C');
        assert_eq!(mock_base(5), 'A');
        assert_eq!(mock_base(43044300), 'T');
    }

    #[tokio::test]
    async fn test_sequence_is_lowercase_and_sized() {
        let mock = MockSources::with_test_data();
        let reply = mock
            .fetch_sequence("hg38", "chr17", HalfOpenRange { start: 0, end: 6 })
            .await
            .unwrap();
        assert_eq!(reply.dna.as_deref(), Some("acgtac"));
        assert!(reply.error.is_none());
        assert_eq!(mock.calls(MockCall::FetchSequence), 1);
    }

    #[tokio::test]
    async fn test_soft_sequence_error() {
        let mock = MockSources::with_test_data();
        mock.set_sequence_error("end past chromosome", Some(2));
        let reply = mock
            .fetch_sequence("hg38", "chr17", HalfOpenRange { start: 4, end: 10 })
            .await
            .unwrap();
        assert_eq!(reply.dna.as_deref(), Some("ac"));
        assert_eq!(reply.error.as_deref(), Some("end past chromosome"));
    }

    #[tokio::test]
    async fn test_search_ids_filters_by_span() {
        let mock = MockSources::with_test_data();
        let bounds = GeneBounds::from_endpoints(43044295, 43125483);
        let ids = mock
            .search_ids(&OverlapQuery::new("chr17", bounds, "hg38", 20))
            .await
            .unwrap();
        assert_eq!(ids, vec!["55601", "37642", "54318", "17661"]);

        let ids = mock
            .search_ids(&OverlapQuery::new("chr17", bounds, "hg38", 2))
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mock = MockSources::with_test_data();
        mock.fail(MockCall::ListAssemblies, "boom");
        let err = mock.list_assemblies().await.unwrap_err();
        assert!(err.is_upstream());
        mock.recover(MockCall::ListAssemblies);
        assert_eq!(mock.list_assemblies().await.unwrap().len(), 4);
        assert_eq!(mock.calls(MockCall::ListAssemblies), 2);
    }

    #[tokio::test]
    async fn test_gate_holds_until_released() {
        let mock = Arc::new(MockSources::with_test_data());
        let gate = mock.gate(MockCall::GeneMetadata, "672");

        let task = {
            let mock = mock.clone();
            tokio::spawn(async move { mock.gene_metadata("672").await })
        };
        // Other keys are not held
        assert!(mock.gene_metadata("7157").await.unwrap().is_some());
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        gate.release();
        assert!(task.await.unwrap().unwrap().is_some());
    }
}
