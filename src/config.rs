//! Configuration file support for ferro-locus.
//!
//! # Example Configuration
//!
//! ```toml
//! [endpoints]
//! ucsc = "https://api.genome.ucsc.edu"
//! eutils = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils"
//! gene_search = "https://clinicaltables.nlm.nih.gov/api/ncbi_genes/v3/search"
//! scoring = "https://example.org/analyze_single_variant"
//!
//! [http]
//! timeout_seconds = 30
//! rate_limit_ms = 350
//!
//! [session]
//! default_assembly = "hg38"
//! max_window = 10000
//! coalesce_scoring = true
//! soft_error_range = "as-requested"
//! ```
//!
//! # Config File Locations
//!
//! Configuration is searched in this order (first found wins):
//! 1. `.ferro-locus.toml` in current directory
//! 2. `~/.config/ferro-locus/config.toml`
//!
//! An explicit `--config` path on the command line bypasses the search.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::LocusError;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocusConfig {
    /// Remote service locations
    pub endpoints: EndpointConfig,
    /// HTTP client behaviour
    pub http: HttpConfig,
    /// Session policies
    pub session: SessionConfig,
}

/// Remote service base URLs
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// UCSC Genome Browser REST API base
    pub ucsc: String,
    /// NCBI E-utilities base
    pub eutils: String,
    /// NCBI clinical tables gene search
    pub gene_search: String,
    /// Variant scoring endpoint; scoring is unavailable when unset
    pub scoring: Option<String>,
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-call timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Minimum delay between requests in milliseconds
    pub rate_limit_ms: Option<u64>,
    /// NCBI API key, appended to E-utilities requests when set
    pub ncbi_api_key: Option<String>,
    /// Circuit breaker configuration
    pub circuit_breaker: CircuitBreakerConfig,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure threshold before opening circuit (default: 5)
    pub failure_threshold: u32,
    /// Recovery timeout in seconds (default: 60)
    pub recovery_timeout_seconds: u64,
    /// Success threshold for closing circuit (default: 3)
    pub success_threshold: u32,
}

/// How the stored actual range reacts to a soft sequence error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoftErrorRange {
    /// Keep the range exactly as the retrieval step reported it
    #[default]
    AsRequested,
    /// Cut the range to the length of the sequence actually returned
    ShrinkToReturned,
}

/// Session policies
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Assembly used when none is chosen (default: "hg38")
    pub default_assembly: String,
    /// Organism whose assemblies are listed (default: "Human")
    pub organism: String,
    /// Largest `end - start` accepted for a sequence window (default: 10000)
    pub max_window: u64,
    /// Span of the window loaded right after a gene is resolved (default: 10000)
    pub default_window: u64,
    /// Maximum gene search results (default: 10)
    pub max_search_results: usize,
    /// ClinVar search page size (default: 20)
    pub variant_page_size: usize,
    /// Skip a scoring request for a variant already being scored (default: true)
    pub coalesce_scoring: bool,
    /// Actual-range policy on soft sequence errors
    pub soft_error_range: SoftErrorRange,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            ucsc: "https://api.genome.ucsc.edu".to_string(),
            eutils: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            gene_search: "https://clinicaltables.nlm.nih.gov/api/ncbi_genes/v3/search"
                .to_string(),
            scoring: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            rate_limit_ms: None,
            ncbi_api_key: None,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_seconds: 60,
            success_threshold: 3,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_assembly: "hg38".to_string(),
            organism: "Human".to_string(),
            max_window: 10_000,
            default_window: 10_000,
            max_search_results: 10,
            variant_page_size: 20,
            coalesce_scoring: true,
            soft_error_range: SoftErrorRange::default(),
        }
    }
}

impl HttpConfig {
    /// Per-call timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl LocusConfig {
    /// Load configuration from the default locations.
    ///
    /// Returns `None` when no config file is found; an unreadable or invalid
    /// file found on the search path is an error.
    pub fn discover() -> Result<Option<Self>, LocusError> {
        let cwd_config = PathBuf::from(".ferro-locus.toml");
        if cwd_config.exists() {
            return Self::from_file(&cwd_config).map(Some);
        }

        if let Some(home) = dirs_home() {
            let home_config = home.join(".config").join("ferro-locus").join("config.toml");
            if home_config.exists() {
                return Self::from_file(&home_config).map(Some);
            }
        }

        Ok(None)
    }

    /// Load from an explicit path, or discover, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, LocusError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::discover()?.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, LocusError> {
        let content = std::fs::read_to_string(path).map_err(|e| LocusError::Config {
            msg: format!("Could not read {}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML content.
    pub fn parse(content: &str) -> Result<Self, LocusError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), LocusError> {
        let content = toml::to_string_pretty(self).map_err(|e| LocusError::Config {
            msg: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), LocusError> {
        let fail = |msg: String| Err(LocusError::Config { msg });

        if self.session.max_window == 0 {
            return fail("session.max_window must be greater than 0".to_string());
        }
        if self.session.default_window == 0 {
            return fail("session.default_window must be greater than 0".to_string());
        }
        if self.http.timeout_seconds == 0 {
            return fail("http.timeout_seconds must be greater than 0".to_string());
        }
        if self.session.default_assembly.trim().is_empty() {
            return fail("session.default_assembly must not be empty".to_string());
        }

        let mut urls = vec![
            ("endpoints.ucsc", self.endpoints.ucsc.as_str()),
            ("endpoints.eutils", self.endpoints.eutils.as_str()),
            ("endpoints.gene_search", self.endpoints.gene_search.as_str()),
        ];
        if let Some(scoring) = &self.endpoints.scoring {
            urls.push(("endpoints.scoring", scoring.as_str()));
        }
        for (key, url) in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return fail(format!("{} is not an http(s) URL: '{}'", key, url));
            }
        }

        Ok(())
    }
}

/// Get the home directory.
fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
