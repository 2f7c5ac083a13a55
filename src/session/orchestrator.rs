//! Async driver for the session state machine.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

use super::state::{Command, Event, Mode, Session};
use super::view::SessionView;
use crate::catalog::{
    group_by_organism, normalize_gene_hits, primary_chromosomes, Assembly, Chromosome, Gene,
};
use crate::clinvar::{fetch_variants, ScoreResult};
use crate::config::LocusConfig;
use crate::error::LocusError;
use crate::locus::resolve_locus;
use crate::sources::{ScoreRequest, Sources};
use crate::window::fetch_window;
use crate::Result;

/// Runs user intents against the collaborators.
///
/// Each intent is handled in three steps: lock the session and apply the
/// intent, run the resulting commands concurrently with the lock released,
/// then apply each completion as it arrives (which may start more
/// commands). An intent method returns once all work it started has
/// settled.
///
/// Cloning is cheap; clones share one session.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    sources: Sources,
    session: Arc<Mutex<Session>>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(sources: Sources, config: &LocusConfig) -> Self {
        Self {
            sources,
            session: Arc::new(Mutex::new(Session::new(config.session.clone()))),
            timeout: config.http.timeout(),
        }
    }

    /// Bound every collaborator call by this timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current state.
    pub async fn snapshot(&self) -> SessionView {
        SessionView::from(&*self.session.lock().await)
    }

    /// Apply an event and run everything it triggers.
    pub async fn dispatch(&self, event: Event) -> SessionView {
        let commands = self.session.lock().await.handle(event);
        self.run(commands).await;
        self.snapshot().await
    }

    /// Load the chromosome list of the configured assembly.
    pub async fn start(&self) -> SessionView {
        let assembly = self.session.lock().await.assembly().to_string();
        self.dispatch(Event::ChangeAssembly(assembly)).await
    }

    pub async fn select_gene(&self, gene: Gene) -> SessionView {
        self.dispatch(Event::SelectGene(gene)).await
    }

    pub async fn close_gene(&self) -> SessionView {
        self.dispatch(Event::CloseGene).await
    }

    pub async fn load_window(&self, start: &str, end: &str) -> SessionView {
        self.dispatch(Event::LoadWindow {
            start: start.to_string(),
            end: end.to_string(),
        })
        .await
    }

    pub async fn refresh_variants(&self) -> SessionView {
        self.dispatch(Event::RefreshVariants).await
    }

    pub async fn score_variant(&self, clinvar_id: &str) -> SessionView {
        self.dispatch(Event::ScoreVariant {
            clinvar_id: clinvar_id.to_string(),
        })
        .await
    }

    pub async fn pick_sequence_position(&self, position: u64, nucleotide: char) -> SessionView {
        self.dispatch(Event::PickPosition {
            position,
            nucleotide,
        })
        .await
    }

    pub async fn score_position(&self, alternate: &str) -> SessionView {
        self.dispatch(Event::ScorePosition {
            alternate: alternate.to_string(),
        })
        .await
    }

    pub async fn show_comparison(&self, clinvar_id: &str) -> SessionView {
        self.dispatch(Event::ShowComparison {
            clinvar_id: clinvar_id.to_string(),
        })
        .await
    }

    pub async fn clear_comparison(&self) -> SessionView {
        self.dispatch(Event::ClearComparison).await
    }

    pub async fn switch_mode(&self, mode: Mode) -> SessionView {
        self.dispatch(Event::SwitchMode(mode)).await
    }

    pub async fn select_chromosome(&self, chrom: &str) -> SessionView {
        self.dispatch(Event::SelectChromosome(chrom.to_string()))
            .await
    }

    pub async fn change_assembly(&self, assembly: &str) -> SessionView {
        self.dispatch(Event::ChangeAssembly(assembly.to_string()))
            .await
    }

    pub async fn search(&self, query: &str) -> SessionView {
        self.dispatch(Event::Search(query.to_string())).await
    }

    /// Run the canned BRCA1 search.
    pub async fn run_example(&self) -> SessionView {
        self.dispatch(Event::RunExample).await
    }

    /// Assemblies of an organism, in catalog order.
    pub async fn list_assemblies(&self, organism: &str) -> Result<Vec<Assembly>> {
        let assemblies = self
            .bounded("genome catalog", self.sources.catalog.list_assemblies())
            .await?;
        Ok(group_by_organism(assemblies)
            .remove(organism)
            .unwrap_or_default())
    }

    /// All assemblies grouped by organism.
    pub async fn assemblies_by_organism(&self) -> Result<BTreeMap<String, Vec<Assembly>>> {
        let assemblies = self
            .bounded("genome catalog", self.sources.catalog.list_assemblies())
            .await?;
        Ok(group_by_organism(assemblies))
    }

    /// Primary chromosomes of an assembly in karyotype order.
    pub async fn list_chromosomes(&self, assembly: &str) -> Result<Vec<Chromosome>> {
        let chromosomes = self
            .bounded(
                "chromosome catalog",
                self.sources.catalog.list_chromosomes(assembly),
            )
            .await?;
        Ok(primary_chromosomes(chromosomes))
    }

    /// One-off gene search outside the session state.
    pub async fn search_genes(&self, query: &str) -> Result<Vec<Gene>> {
        let (assembly, limit) = {
            let session = self.session.lock().await;
            (
                session.assembly().to_string(),
                session.config().max_search_results,
            )
        };
        let genes = self
            .bounded(
                "gene search",
                self.sources.genes.search_genes(query, &assembly, limit),
            )
            .await?;
        Ok(normalize_gene_hits(genes, limit))
    }

    async fn run(&self, commands: Vec<Command>) {
        let mut tasks = JoinSet::new();
        for command in commands {
            let this = self.clone();
            tasks.spawn(async move { this.execute(command).await });
        }
        while let Some(joined) = tasks.join_next().await {
            let event = match joined {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Collaborator task failed: {}", e);
                    continue;
                }
            };
            let follow_up = self.session.lock().await.handle(event);
            for command in follow_up {
                let this = self.clone();
                tasks.spawn(async move { this.execute(command).await });
            }
        }
    }

    async fn execute(&self, command: Command) -> Event {
        let config = self.session.lock().await.config().clone();
        match command {
            Command::ResolveLocus { ticket, gene } => {
                let outcome = self
                    .bounded(
                        "gene metadata",
                        resolve_locus(&*self.sources.genes, &gene, config.default_window),
                    )
                    .await;
                Event::LocusResolved { ticket, outcome }
            }
            Command::FetchWindow {
                ticket,
                assembly,
                chrom,
                range,
            } => {
                let outcome = self
                    .bounded(
                        "sequence",
                        fetch_window(
                            &*self.sources.sequence,
                            &assembly,
                            &chrom,
                            range,
                            config.soft_error_range,
                        ),
                    )
                    .await;
                Event::WindowLoaded { ticket, outcome }
            }
            Command::FetchVariants {
                ticket,
                assembly,
                chrom,
                bounds,
            } => {
                let outcome = self
                    .bounded(
                        "ClinVar",
                        fetch_variants(
                            &*self.sources.variants,
                            &chrom,
                            Some(bounds),
                            &assembly,
                            config.variant_page_size,
                        ),
                    )
                    .await;
                Event::VariantsLoaded { ticket, outcome }
            }
            Command::ScoreVariant {
                ticket,
                clinvar_id,
                request,
            } => Event::VariantScored {
                ticket,
                clinvar_id,
                outcome: self.score(&request).await,
            },
            Command::ScorePosition { ticket, request } => Event::PositionScored {
                ticket,
                outcome: self.score(&request).await,
            },
            Command::SearchGenes {
                seq,
                query,
                assembly,
                chromosome,
            } => {
                let outcome = self
                    .bounded(
                        "gene search",
                        self.sources
                            .genes
                            .search_genes(&query, &assembly, config.max_search_results),
                    )
                    .await
                    .map(|genes| normalize_gene_hits(genes, config.max_search_results));
                Event::SearchCompleted {
                    seq,
                    chromosome,
                    outcome,
                }
            }
            Command::ListChromosomes { assembly } => {
                let outcome = self
                    .bounded(
                        "chromosome catalog",
                        self.sources.catalog.list_chromosomes(&assembly),
                    )
                    .await;
                Event::ChromosomesLoaded { assembly, outcome }
            }
        }
    }

    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResult> {
        match &self.sources.scoring {
            Some(scoring) => self.bounded("Variant scoring", scoring.score(request)).await,
            None => Err(LocusError::upstream(
                "Variant scoring",
                "no scoring endpoint configured",
            )),
        }
    }

    /// Await a collaborator call, turning expiry into an upstream failure.
    async fn bounded<T, F>(&self, service: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!("{} call timed out after {:?}", service, self.timeout);
                Err(LocusError::upstream(
                    service,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        }
    }
}
