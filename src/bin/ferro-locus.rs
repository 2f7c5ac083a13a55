// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-locus CLI
//!
//! Command-line interface for inspecting a gene locus: reference sequence
//! windows, overlapping ClinVar variants and substitution scores.

use clap::{Parser, Subcommand};
use ferro_locus::catalog::Gene;
use ferro_locus::cli::{
    output_assemblies, output_chromosomes, output_error, output_genes, output_view,
    split_substitution_arg, OutputFormat,
};
use ferro_locus::{LocusConfig, LocusError, Orchestrator, SessionView, Sources};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "ferro-locus")]
#[command(author, version, about = "Gene locus inspector")]
#[command(
    long_about = "Inspect a gene locus: reference sequence, ClinVar variants and substitution scores.

Examples:
  ferro-locus assemblies --organism Human
  ferro-locus search BRCA1
  ferro-locus inspect BRCA1 --start 43044295 --end 43045295
  ferro-locus inspect BRCA1 --score --substitute 43044300:G
  ferro-locus inspect BRCA1 --score-id 55601 --compare 55601
  ferro-locus config -o ferro-locus.toml"
)]
struct Cli {
    /// Configuration file (defaults to .ferro-locus.toml, then ~/.config/ferro-locus/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Log level filter (e.g., warn, info, ferro_locus=debug)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List assemblies grouped by organism
    Assemblies {
        /// Only list assemblies of this organism
        #[arg(long)]
        organism: Option<String>,
    },

    /// List the primary chromosomes of an assembly
    Chromosomes {
        /// Assembly (defaults to session.default_assembly)
        #[arg(short, long)]
        assembly: Option<String>,
    },

    /// Search genes by symbol or name
    Search {
        /// Search text
        query: String,
    },

    /// Resolve a gene and show its sequence window and variants
    Inspect {
        /// Gene symbol (e.g., BRCA1)
        symbol: String,

        /// Pick the search hit with this NCBI Gene ID
        #[arg(long)]
        gene_id: Option<String>,

        /// Assembly (defaults to session.default_assembly)
        #[arg(short, long)]
        assembly: Option<String>,

        /// Window start (1-based, inclusive)
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Window end (1-based, inclusive)
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Score every scorable variant
        #[arg(long)]
        score: bool,

        /// Score a ClinVar variant by ID (repeatable)
        #[arg(long)]
        score_id: Vec<String>,

        /// Score a substitution inside the window as POSITION:ALT
        #[arg(long)]
        substitute: Option<String>,

        /// Show a variant as the comparison focus
        #[arg(long)]
        compare: Option<String>,
    },

    /// Generate a sample configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "ferro-locus.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = OutputFormat::from_str(&cli.format).unwrap_or_default();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("ERROR: {}", e);
        std::process::exit(2);
    }

    if let Err(e) = run(cli, format).await {
        let mut stderr = io::stderr();
        let _ = output_error(&mut stderr, &e, format);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, format: OutputFormat) -> Result<(), LocusError> {
    let mut out = io::stdout();

    match cli.command {
        Commands::Config { output, force } => config_command(&output, force)?,
        Commands::Assemblies { organism } => {
            let (_, orch) = connect(cli.config.as_deref())?;
            let mut grouped = orch.assemblies_by_organism().await?;
            if let Some(organism) = organism {
                grouped.retain(|name, _| name.eq_ignore_ascii_case(&organism));
            }
            output_assemblies(&mut out, &grouped, format)?;
        }
        Commands::Chromosomes { assembly } => {
            let (config, orch) = connect(cli.config.as_deref())?;
            let assembly = assembly.unwrap_or_else(|| config.session.default_assembly.clone());
            let chromosomes = orch.list_chromosomes(&assembly).await?;
            output_chromosomes(&mut out, &chromosomes, format)?;
        }
        Commands::Search { query } => {
            let (_, orch) = connect(cli.config.as_deref())?;
            let genes = orch.search_genes(&query).await?;
            output_genes(&mut out, &genes, format)?;
        }
        Commands::Inspect {
            symbol,
            gene_id,
            assembly,
            start,
            end,
            score,
            score_id,
            substitute,
            compare,
        } => {
            let (_, orch) = connect(cli.config.as_deref())?;
            if let Some(assembly) = assembly {
                orch.change_assembly(&assembly).await;
            }
            let gene = pick_gene(&orch, &symbol, gene_id.as_deref()).await?;
            info!("Inspecting {} ({:?})", gene.symbol, gene.gene_id);

            let mut view = orch.select_gene(gene).await;
            if let (Some(start), Some(end)) = (start, end) {
                view = orch.load_window(&start, &end).await;
            }

            let mut ids = score_id;
            if score {
                ids.extend(
                    view.variants
                        .iter()
                        .filter(|v| v.is_scorable())
                        .map(|v| v.clinvar_id.clone()),
                );
            }
            if !ids.is_empty() {
                view = score_all(&orch, ids).await;
            }
            if let Some(id) = compare {
                view = orch.show_comparison(&id).await;
            }
            if let Some(arg) = substitute {
                let (position, alt) =
                    split_substitution_arg(&arg).ok_or_else(|| LocusError::InvalidSubstitution {
                        msg: format!("expected POSITION:ALT, got '{}'", arg),
                    })?;
                let nucleotide = view
                    .sequence
                    .window
                    .as_ref()
                    .and_then(|w| w.base_at(position))
                    .ok_or_else(|| LocusError::InvalidSubstitution {
                        msg: format!("position {} is outside the loaded sequence", position),
                    })?;
                orch.pick_sequence_position(position, nucleotide).await;
                view = orch.score_position(&alt).await;
            }
            output_view(&mut out, &view, format)?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Score variants concurrently and return the settled view.
async fn score_all(orch: &Orchestrator, ids: Vec<String>) -> SessionView {
    let mut tasks = JoinSet::new();
    for id in ids {
        let orch = orch.clone();
        tasks.spawn(async move { orch.score_variant(&id).await });
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!("Scoring task failed: {}", e);
        }
    }
    orch.snapshot().await
}

fn connect(path: Option<&Path>) -> Result<(LocusConfig, Orchestrator), LocusError> {
    let config = LocusConfig::load(path)?;
    debug!("Using endpoints {:?}", config.endpoints);
    let orch = Orchestrator::new(Sources::from_config(&config)?, &config);
    Ok((config, orch))
}

/// Search for `symbol` and pick the matching hit.
async fn pick_gene(
    orch: &Orchestrator,
    symbol: &str,
    gene_id: Option<&str>,
) -> Result<Gene, LocusError> {
    let hits = orch.search_genes(symbol).await?;
    let picked = match gene_id {
        Some(id) => hits.iter().find(|g| g.gene_id.as_deref() == Some(id)),
        None => hits
            .iter()
            .find(|g| g.symbol.eq_ignore_ascii_case(symbol))
            .or_else(|| hits.first()),
    };
    picked.cloned().ok_or_else(|| LocusError::MissingIdentifier {
        symbol: symbol.to_string(),
    })
}

fn config_command(output: &Path, force: bool) -> Result<(), LocusError> {
    if output.exists() && !force {
        return Err(LocusError::Config {
            msg: format!(
                "Configuration file already exists: {} (use --force to overwrite)",
                output.display()
            ),
        });
    }
    LocusConfig::default().to_file(output)?;
    println!("Sample configuration file created: {}", output.display());
    Ok(())
}

fn init_tracing(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    Ok(())
}
