//! HTTP client for the single-variant pathogenicity predictor.
//!
//! The predictor takes a POST with the substitution in the query string
//! (`variant_position`, `alternative`, `genome`, `chromosome`) and answers
//! with a JSON [`ScoreResult`].

use async_trait::async_trait;
use std::sync::Arc;

use super::http_client::ResilientClient;
use super::provider::{ScoreRequest, ScoringService};
use crate::clinvar::ScoreResult;
use crate::Result;

const SERVICE: &str = "Variant scoring";

#[derive(Debug, Clone)]
pub struct ScoringClient {
    http: Arc<ResilientClient>,
    url: String,
}

impl ScoringClient {
    pub fn new(http: Arc<ResilientClient>, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

fn query_params(request: &ScoreRequest) -> Vec<(&'static str, String)> {
    vec![
        ("variant_position", request.position.to_string()),
        ("alternative", request.alternative.to_string()),
        ("genome", request.assembly.clone()),
        ("chromosome", request.chromosome.clone()),
    ]
}

#[async_trait]
impl ScoringService for ScoringClient {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResult> {
        tracing::debug!(
            "Scoring {}:{} -> {} ({})",
            request.chromosome,
            request.position,
            request.alternative,
            request.assembly
        );
        self.http
            .post_json(SERVICE, &self.url, &query_params(request))
            .await
    }
}
