//! NCBI clients: gene search, gene summaries and ClinVar.
//!
//! Gene search goes through the Clinical Tables `ncbi_genes` service; gene
//! metadata and ClinVar lookups go through E-utilities (`esummary.fcgi`,
//! `esearch.fcgi`). Each host gets its own [`ResilientClient`] so one
//! failing service does not trip the other's breaker.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::http_client::ResilientClient;
use super::provider::{
    GeneDirectory, GeneMetadata, GenomicInfo, Organism, VariantSource, VariantSummary,
};
use crate::catalog::{normalize_gene_hits, Gene};
use crate::clinvar::OverlapQuery;
use crate::error::LocusError;
use crate::Result;

const GENE_SEARCH: &str = "NCBI gene search";
const EUTILS: &str = "NCBI E-utilities";

/// Display columns requested from the gene search.
const DISPLAY_FIELDS: &str = "chromosome,Symbol,description,map_location,type_of_gene";
/// Extra fields requested from the gene search; `GeneID` is the one used.
const EXTRA_FIELDS: &str = "chromosome,Symbol,description,map_location,type_of_gene,GenomicInfo,GeneID";

/// NCBI gene and ClinVar client.
#[derive(Debug, Clone)]
pub struct NcbiClient {
    eutils: Arc<ResilientClient>,
    tables: Arc<ResilientClient>,
    eutils_base: String,
    gene_search_url: String,
    api_key: Option<String>,
}

impl NcbiClient {
    pub fn new(
        eutils: Arc<ResilientClient>,
        tables: Arc<ResilientClient>,
        eutils_base: impl Into<String>,
        gene_search_url: impl Into<String>,
    ) -> Self {
        Self {
            eutils,
            tables,
            eutils_base: eutils_base.into().trim_end_matches('/').to_string(),
            gene_search_url: gene_search_url.into(),
            api_key: None,
        }
    }

    /// Send an API key with every E-utilities request.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    fn eutils_url(&self, tool: &str) -> String {
        format!("{}/{}", self.eutils_base, tool)
    }

    fn eutils_params<'a>(&self, mut params: Vec<(&'a str, String)>) -> Vec<(&'a str, String)> {
        params.push(("retmode", "json".to_string()));
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }
}

/// Decode a Clinical Tables reply: `[total, codes, extra_fields, display_rows]`.
///
/// Display rows are read as `[chromosome, _, symbol, name, ..]`; rows too
/// short to carry a symbol are skipped.
fn decode_gene_search(body: &Value, limit: usize) -> Result<Vec<Gene>> {
    let parts = body
        .as_array()
        .ok_or_else(|| LocusError::decode(GENE_SEARCH, "expected a JSON array"))?;
    let total = parts.first().and_then(Value::as_u64).unwrap_or(0) as usize;
    if total == 0 {
        return Ok(Vec::new());
    }

    let gene_ids: Vec<String> = parts
        .get(2)
        .and_then(|extra| extra.get("GeneID"))
        .and_then(Value::as_array)
        .map(|ids| ids.iter().map(value_to_string).collect())
        .unwrap_or_default();
    let rows = parts
        .get(3)
        .and_then(Value::as_array)
        .ok_or_else(|| LocusError::decode(GENE_SEARCH, "missing display rows"))?;

    let mut genes = Vec::new();
    for (i, row) in rows.iter().enumerate().take(total.min(limit)) {
        let Some(cols) = row.as_array() else { continue };
        let Some(symbol) = cols.get(2).and_then(Value::as_str) else {
            continue;
        };
        let name = cols.get(3).and_then(Value::as_str).unwrap_or_default();
        genes.push(Gene {
            symbol: symbol.to_string(),
            name: name.to_string(),
            chrom: cols
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: name.to_string(),
            gene_id: gene_ids.get(i).filter(|id| !id.is_empty()).cloned(),
        });
    }
    Ok(normalize_gene_hits(genes, limit))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    result: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct GeneDocument {
    #[serde(default)]
    genomicinfo: Vec<GeneDocumentInfo>,
    summary: Option<String>,
    organism: Option<GeneDocumentOrganism>,
}

#[derive(Debug, Deserialize)]
struct GeneDocumentInfo {
    chrstart: u64,
    chrstop: u64,
    chraccver: Option<String>,
    strand: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneDocumentOrganism {
    #[serde(default)]
    scientificname: String,
    #[serde(default)]
    commonname: String,
}

fn decode_gene_summary(envelope: SummaryEnvelope, gene_id: &str) -> Result<Option<GeneMetadata>> {
    let Some(doc) = envelope.result.and_then(|mut r| r.remove(gene_id)) else {
        return Ok(None);
    };
    let doc: GeneDocument =
        serde_json::from_value(doc).map_err(|e| LocusError::decode(EUTILS, e))?;
    Ok(Some(GeneMetadata {
        genomic_info: doc
            .genomicinfo
            .into_iter()
            .map(|info| GenomicInfo {
                chrstart: info.chrstart,
                chrstop: info.chrstop,
                chraccver: info.chraccver,
                strand: info.strand,
            })
            .collect(),
        summary: doc.summary.filter(|s| !s.is_empty()),
        organism: doc.organism.map(|o| Organism {
            scientific_name: o.scientificname,
            common_name: o.commonname,
        }),
    }))
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    esearchresult: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClinVarDocument {
    #[serde(default)]
    title: String,
    obj_type: Option<String>,
    germline_classification: Option<Classification>,
    gene_sort: Option<String>,
    location_sort: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Classification {
    description: Option<String>,
}

/// Decode a ClinVar `esummary` reply in `result.uids` order.
fn decode_clinvar_summaries(envelope: SummaryEnvelope) -> Result<Vec<VariantSummary>> {
    let Some(mut result) = envelope.result else {
        return Ok(Vec::new());
    };
    let uids: Vec<String> = match result.remove("uids") {
        Some(uids) => serde_json::from_value(uids).map_err(|e| LocusError::decode(EUTILS, e))?,
        None => return Ok(Vec::new()),
    };

    let mut summaries = Vec::with_capacity(uids.len());
    for uid in uids {
        let Some(doc) = result.remove(&uid) else {
            tracing::debug!("ClinVar summary missing document for {}", uid);
            continue;
        };
        let doc: ClinVarDocument =
            serde_json::from_value(doc).map_err(|e| LocusError::decode(EUTILS, e))?;
        summaries.push(VariantSummary {
            uid,
            title: doc.title,
            obj_type: doc.obj_type,
            classification: doc.germline_classification.and_then(|c| c.description),
            gene_sort: doc.gene_sort,
            location_sort: doc.location_sort,
        });
    }
    Ok(summaries)
}

#[async_trait]
impl GeneDirectory for NcbiClient {
    async fn search_genes(&self, query: &str, assembly: &str, limit: usize) -> Result<Vec<Gene>> {
        tracing::debug!("Gene search '{}' ({})", query, assembly);
        let body: Value = self
            .tables
            .get_json(
                GENE_SEARCH,
                &self.gene_search_url,
                &[
                    ("terms", query.to_string()),
                    ("df", DISPLAY_FIELDS.to_string()),
                    ("ef", EXTRA_FIELDS.to_string()),
                    ("count", limit.to_string()),
                ],
            )
            .await?;
        decode_gene_search(&body, limit)
    }

    async fn gene_metadata(&self, gene_id: &str) -> Result<Option<GeneMetadata>> {
        let params = self.eutils_params(vec![("db", "gene".to_string()), ("id", gene_id.to_string())]);
        let envelope: SummaryEnvelope = self
            .eutils
            .get_json(EUTILS, &self.eutils_url("esummary.fcgi"), &params)
            .await?;
        decode_gene_summary(envelope, gene_id)
    }
}

#[async_trait]
impl VariantSource for NcbiClient {
    async fn search_ids(&self, query: &OverlapQuery) -> Result<Vec<String>> {
        let params = self.eutils_params(vec![
            ("db", "clinvar".to_string()),
            ("term", query.term()),
            ("retmax", query.page_size.to_string()),
        ]);
        let envelope: SearchEnvelope = self
            .eutils
            .get_json(EUTILS, &self.eutils_url("esearch.fcgi"), &params)
            .await?;
        Ok(envelope
            .esearchresult
            .map(|r| r.idlist)
            .unwrap_or_default())
    }

    async fn fetch_summaries(&self, ids: &[String]) -> Result<Vec<VariantSummary>> {
        let params =
            self.eutils_params(vec![("db", "clinvar".to_string()), ("id", ids.join(","))]);
        let envelope: SummaryEnvelope = self
            .eutils
            .get_json(EUTILS, &self.eutils_url("esummary.fcgi"), &params)
            .await?;
        decode_clinvar_summaries(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_gene_search() {
        let body = json!([
            2,
            ["672", "8068"],
            {"GeneID": ["672", "8068"]},
            [
                ["17", "BRCA1", "BRCA1", "BRCA1 DNA repair associated", "17q21.31"],
                ["X", "BRCA1P1", "BRCA1P1", "BRCA1 pseudogene 1", "17q21.31"]
            ]
        ]);
        let genes = decode_gene_search(&body, 10).unwrap();
        assert_eq!(genes.len(), 2);
        assert_eq!(genes[0].symbol, "BRCA1");
        assert_eq!(genes[0].chrom, "chr17");
        assert_eq!(genes[0].name, "BRCA1 DNA repair associated");
        assert_eq!(genes[0].gene_id.as_deref(), Some("672"));
        assert_eq!(genes[1].chrom, "chrX");
    }

    #[test]
    fn test_decode_gene_search_limit_and_bad_rows() {
        let body = json!([
            3,
            [],
            {"GeneID": [672, "", "3"]},
            [["17", "A", "A", "a"], ["17"], ["1", "C", "C", "c"]]
        ]);
        let genes = decode_gene_search(&body, 10).unwrap();
        assert_eq!(genes.len(), 2);
        assert_eq!(genes[0].gene_id.as_deref(), Some("672"));
        assert_eq!(genes[1].symbol, "C");

        let genes = decode_gene_search(&body, 1).unwrap();
        assert_eq!(genes.len(), 1);
    }

    #[test]
    fn test_decode_gene_search_empty() {
        assert!(decode_gene_search(&json!([0, [], null, []]), 10)
            .unwrap()
            .is_empty());
        assert!(decode_gene_search(&json!({"error": "x"}), 10).is_err());
    }

    #[test]
    fn test_decode_gene_summary() {
        let envelope: SummaryEnvelope = serde_json::from_value(json!({
            "header": {"type": "esummary"},
            "result": {
                "uids": ["672"],
                "672": {
                    "name": "BRCA1",
                    "summary": "This gene encodes a nuclear phosphoprotein.",
                    "organism": {"scientificname": "Homo sapiens", "commonname": "human", "taxid": 9606},
                    "genomicinfo": [
                        {"chrloc": "17", "chraccver": "NC_000017.11", "chrstart": 43125482, "chrstop": 43044294, "exoncount": 24}
                    ]
                }
            }
        }))
        .unwrap();
        let meta = decode_gene_summary(envelope, "672").unwrap().unwrap();
        assert_eq!(meta.genomic_info.len(), 1);
        assert_eq!(meta.genomic_info[0].chrstart, 43125482);
        assert_eq!(meta.genomic_info[0].chraccver.as_deref(), Some("NC_000017.11"));
        assert_eq!(meta.organism.unwrap().scientific_name, "Homo sapiens");
    }

    #[test]
    fn test_decode_gene_summary_unknown_id() {
        let envelope: SummaryEnvelope =
            serde_json::from_value(json!({"result": {"uids": []}})).unwrap();
        assert!(decode_gene_summary(envelope, "999999999").unwrap().is_none());

        let envelope: SummaryEnvelope = serde_json::from_value(json!({
            "result": {"uids": ["1"], "1": {"uid": "1", "error": "cannot get document summary"}}
        }))
        .unwrap();
        let meta = decode_gene_summary(envelope, "1").unwrap().unwrap();
        assert!(meta.genomic_info.is_empty());
    }

    #[test]
    fn test_decode_clinvar_summaries_keeps_uid_order() {
        let envelope: SummaryEnvelope = serde_json::from_value(json!({
            "result": {
                "uids": ["2", "1"],
                "1": {
                    "title": "NM_007294.4(BRCA1):c.5123C>A (p.Ala1708Glu)",
                    "obj_type": "single nucleotide variant",
                    "germline_classification": {"description": "Pathogenic"},
                    "gene_sort": "BRCA1",
                    "location_sort": "00000000043063903"
                },
                "2": {
                    "title": "GRCh38/hg38 17q21.31(chr17:43044295-43125483)x1",
                    "obj_type": "copy number loss",
                    "germline_classification": {"description": ""}
                }
            }
        }))
        .unwrap();
        let summaries = decode_clinvar_summaries(envelope).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].uid, "2");
        assert_eq!(summaries[1].uid, "1");
        assert_eq!(summaries[1].classification.as_deref(), Some("Pathogenic"));
        assert_eq!(summaries[0].location_sort, None);
    }

    #[test]
    fn test_decode_clinvar_summaries_empty() {
        let envelope: SummaryEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(decode_clinvar_summaries(envelope).unwrap().is_empty());
    }

    #[test]
    fn test_eutils_params_api_key() {
        let http = Arc::new(ResilientClient::new(&crate::config::HttpConfig::default()).unwrap());
        let client = NcbiClient::new(http.clone(), http, "https://eutils.example/", "https://ct.example")
            .with_api_key(Some("secret".to_string()));
        let params = client.eutils_params(vec![("db", "gene".to_string())]);
        assert!(params.contains(&("retmode", "json".to_string())));
        assert!(params.contains(&("api_key", "secret".to_string())));
        assert_eq!(client.eutils_url("esearch.fcgi"), "https://eutils.example/esearch.fcgi");
    }
}
