//! UCSC Genome Browser REST client.
//!
//! Serves the genome catalog and reference sequence:
//!
//! - `list/ucscGenomes` for assemblies
//! - `list/chromosomes?genome=` for chromosome sizes
//! - `getData/sequence?genome=;chrom=;start=;end=` for DNA (0-based, half-open)

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::http_client::ResilientClient;
use super::provider::{GenomeCatalog, SequenceReply, SequenceSource};
use crate::catalog::{Assembly, Chromosome};
use crate::coords::{ucsc_chrom, HalfOpenRange};
use crate::error::LocusError;
use crate::Result;

const SERVICE: &str = "UCSC";

#[derive(Debug, Deserialize)]
struct GenomesResponse {
    #[serde(rename = "ucscGenomes")]
    ucsc_genomes: Option<BTreeMap<String, GenomeInfo>>,
}

#[derive(Debug, Deserialize)]
struct GenomeInfo {
    #[serde(rename = "sourceName")]
    source_name: Option<String>,
    description: Option<String>,
    organism: Option<String>,
    /// 0/1 upstream, occasionally a boolean
    #[serde(default)]
    active: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChromosomesResponse {
    chromosomes: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Deserialize)]
struct SequenceResponse {
    dna: Option<String>,
    error: Option<String>,
}

/// UCSC REST client.
#[derive(Debug, Clone)]
pub struct UcscClient {
    http: Arc<ResilientClient>,
    base_url: String,
}

impl UcscClient {
    pub fn new(http: Arc<ResilientClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn decode_assemblies(response: GenomesResponse) -> Result<Vec<Assembly>> {
    let genomes = response
        .ucsc_genomes
        .ok_or_else(|| LocusError::decode(SERVICE, "missing ucscGenomes"))?;
    Ok(genomes
        .into_iter()
        .map(|(id, info)| Assembly {
            source_name: info.source_name.unwrap_or_else(|| id.clone()),
            name: info.description.unwrap_or_else(|| id.clone()),
            active: is_truthy(&info.active),
            organism: info
                .organism
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| "other".to_string()),
            id,
        })
        .collect())
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        serde_json::Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    }
}

fn decode_chromosomes(response: ChromosomesResponse) -> Result<Vec<Chromosome>> {
    let chromosomes = response
        .chromosomes
        .ok_or_else(|| LocusError::decode(SERVICE, "missing chromosomes"))?;
    Ok(chromosomes
        .into_iter()
        .map(|(name, size)| Chromosome { name, size })
        .collect())
}

#[async_trait]
impl GenomeCatalog for UcscClient {
    async fn list_assemblies(&self) -> Result<Vec<Assembly>> {
        let response: GenomesResponse = self
            .http
            .get_json(SERVICE, &self.url("list/ucscGenomes"), &[])
            .await?;
        decode_assemblies(response)
    }

    async fn list_chromosomes(&self, assembly: &str) -> Result<Vec<Chromosome>> {
        let response: ChromosomesResponse = self
            .http
            .get_json(
                SERVICE,
                &self.url("list/chromosomes"),
                &[("genome", assembly.to_string())],
            )
            .await?;
        decode_chromosomes(response)
    }
}

#[async_trait]
impl SequenceSource for UcscClient {
    async fn fetch_sequence(
        &self,
        assembly: &str,
        chrom: &str,
        range: HalfOpenRange,
    ) -> Result<SequenceReply> {
        tracing::debug!(
            "Fetching {}:{}:{}-{} from UCSC",
            assembly,
            chrom,
            range.start,
            range.end
        );
        // UCSC reports bad coordinates as a 400 with an `error` body
        let response: SequenceResponse = self
            .http
            .get_json_lenient(
                SERVICE,
                &self.url("getData/sequence"),
                &[
                    ("genome", assembly.to_string()),
                    ("chrom", ucsc_chrom(chrom)),
                    ("start", range.start.to_string()),
                    ("end", range.end.to_string()),
                ],
            )
            .await?;
        Ok(SequenceReply {
            dna: response.dna,
            error: response.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_assemblies() {
        let json = r#"{
            "downloadTime": "2025:01:01T00:00:00Z",
            "ucscGenomes": {
                "hg38": {
                    "description": "Dec. 2013 (GRCh38/hg38)",
                    "sourceName": "GRCh38 Genome Reference Consortium Human Reference 38",
                    "organism": "Human",
                    "active": 1
                },
                "sacCer1": {
                    "description": "Oct. 2003 (SGD/sacCer1)",
                    "active": 0
                }
            }
        }"#;
        let response: GenomesResponse = serde_json::from_str(json).unwrap();
        let assemblies = decode_assemblies(response).unwrap();
        assert_eq!(assemblies.len(), 2);

        let hg38 = assemblies.iter().find(|a| a.id == "hg38").unwrap();
        assert_eq!(hg38.organism, "Human");
        assert_eq!(hg38.name, "Dec. 2013 (GRCh38/hg38)");
        assert!(hg38.active);

        let yeast = assemblies.iter().find(|a| a.id == "sacCer1").unwrap();
        assert_eq!(yeast.organism, "other");
        assert_eq!(yeast.source_name, "sacCer1");
        assert!(!yeast.active);
    }

    #[test]
    fn test_decode_assemblies_missing_key() {
        let response: GenomesResponse = serde_json::from_str("{}").unwrap();
        let err = decode_assemblies(response).unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn test_decode_chromosomes() {
        let json = r#"{"genome": "hg38", "chromosomes": {"chr1": 248956422, "chr17": 83257441}}"#;
        let response: ChromosomesResponse = serde_json::from_str(json).unwrap();
        let chroms = decode_chromosomes(response).unwrap();
        assert_eq!(chroms.len(), 2);
        assert!(chroms
            .iter()
            .any(|c| c.name == "chr17" && c.size == 83257441));
    }

    #[test]
    fn test_sequence_error_body() {
        let json = r#"{"error": "chrom 'chrZ' not found in genome hg38", "statusCode": 400}"#;
        let response: SequenceResponse = serde_json::from_str(json).unwrap();
        assert!(response.dna.is_none());
        assert!(response.error.unwrap().contains("chrZ"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let http = Arc::new(ResilientClient::new(&crate::config::HttpConfig::default()).unwrap());
        let client = UcscClient::new(http, "https://api.genome.ucsc.edu/");
        assert_eq!(
            client.url("list/ucscGenomes"),
            "https://api.genome.ucsc.edu/list/ucscGenomes"
        );
    }
}
