//! Remote data sources
//!
//! The locus pipeline talks to five collaborators through the traits in
//! [`provider`]. HTTP implementations live behind the `http` feature;
//! [`MockSources`] serves canned data for tests and offline use.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ferro_locus::sources::{MockSources, Sources};
//!
//! let sources = Sources::uniform(Arc::new(MockSources::with_test_data()));
//! assert!(sources.scoring.is_some());
//! ```

#[cfg(feature = "http")]
pub mod http_client;
pub mod mock;
#[cfg(feature = "http")]
pub mod ncbi;
pub mod provider;
#[cfg(feature = "http")]
pub mod scoring;
#[cfg(feature = "http")]
pub mod ucsc;

pub use mock::{mock_base, MockCall, MockGate, MockSources};
pub use provider::{
    GeneDirectory, GeneMetadata, GenomeCatalog, GenomicInfo, Organism, ScoreRequest,
    ScoringService, SequenceReply, SequenceSource, Sources, VariantSource, VariantSummary,
};

#[cfg(feature = "http")]
use std::sync::Arc;

#[cfg(feature = "http")]
use crate::config::LocusConfig;

#[cfg(feature = "http")]
impl Sources {
    /// Build HTTP collaborators from configuration.
    ///
    /// Scoring is left unset when no scoring endpoint is configured.
    pub fn from_config(config: &LocusConfig) -> crate::Result<Self> {
        let ucsc_http = Arc::new(http_client::ResilientClient::new(&config.http)?);
        let eutils_http = Arc::new(http_client::ResilientClient::new(&config.http)?);
        let tables_http = Arc::new(http_client::ResilientClient::new(&config.http)?);

        let ucsc = Arc::new(ucsc::UcscClient::new(ucsc_http, &config.endpoints.ucsc));
        let ncbi = Arc::new(
            ncbi::NcbiClient::new(
                eutils_http,
                tables_http,
                &config.endpoints.eutils,
                &config.endpoints.gene_search,
            )
            .with_api_key(config.http.ncbi_api_key.clone()),
        );
        let scoring = match &config.endpoints.scoring {
            Some(url) => {
                let http = Arc::new(http_client::ResilientClient::new(&config.http)?);
                Some(Arc::new(scoring::ScoringClient::new(http, url)) as Arc<dyn ScoringService>)
            }
            None => None,
        };

        Ok(Self {
            catalog: ucsc.clone(),
            genes: ncbi.clone(),
            sequence: ucsc,
            variants: ncbi,
            scoring,
        })
    }
}
