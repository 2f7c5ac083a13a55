//! The session state machine.
//!
//! [`Session::handle`] is a pure transition function: it applies one
//! [`Event`] and returns the [`Command`]s to run next. Nothing here awaits
//! or performs I/O; the [`Orchestrator`](super::Orchestrator) executes the
//! commands and feeds their completions back in as events.
//!
//! Every completion carries the [`Ticket`] of the request that produced it.
//! A ticket names the gene selection (`generation`) and the sub-system
//! sequence number current when the request was issued; completions whose
//! ticket no longer matches are dropped.

use serde::Serialize;

use crate::catalog::{genes_on_chromosome, primary_chromosomes, Chromosome, Gene};
use crate::clinvar::{ClinicalVariant, ScoreResult, VariantSet};
use crate::config::SessionConfig;
use crate::coords::{GeneBounds, GenomicRange};
use crate::locus::ResolvedLocus;
use crate::scoring::{
    apply_score, begin_scoring, failure_message, manual_substitution, ActiveSequencePosition,
    Substitution,
};
use crate::sources::ScoreRequest;
use crate::window::{validate_range, SequenceWindow};
use crate::Result;

/// Gene list mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Free-text gene search
    #[default]
    Search,
    /// Genes on the selected chromosome
    Browse,
}

/// Locus-level state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message")]
pub enum LocusStatus {
    #[default]
    NoGeneSelected,
    LoadingLocus,
    LocusError(String),
    LocusReady,
}

/// Identifies the request a completion answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    /// Gene selection the request belongs to
    pub generation: u64,
    /// Sub-system sequence number (window load, variant epoch, ...)
    pub seq: u64,
}

/// Gene search / browse results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<Gene>,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    seq: u64,
}

/// Sequence sub-state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SequenceState {
    pub window: Option<SequenceWindow>,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    seq: u64,
}

/// Variant sub-state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantState {
    pub set: VariantSet,
    pub loading: bool,
    pub error: Option<String>,
    /// Bumped on every (re)load; scoring results from older epochs are dropped
    epoch: u64,
}

/// Result of scoring the picked sequence position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManualScore {
    pub substitution: Option<Substitution>,
    pub result: Option<ScoreResult>,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    seq: u64,
}

/// Inputs to the state machine: user intents and remote completions.
#[derive(Debug, Clone)]
pub enum Event {
    SelectGene(Gene),
    CloseGene,
    LoadWindow { start: String, end: String },
    RefreshVariants,
    ScoreVariant { clinvar_id: String },
    PickPosition { position: u64, nucleotide: char },
    ScorePosition { alternate: String },
    ShowComparison { clinvar_id: String },
    ClearComparison,
    SwitchMode(Mode),
    SelectChromosome(String),
    ChangeAssembly(String),
    Search(String),
    /// Canned BRCA1 lookup
    RunExample,

    LocusResolved {
        ticket: Ticket,
        outcome: Result<Option<ResolvedLocus>>,
    },
    WindowLoaded {
        ticket: Ticket,
        outcome: Result<SequenceWindow>,
    },
    VariantsLoaded {
        ticket: Ticket,
        outcome: Result<Option<Vec<ClinicalVariant>>>,
    },
    VariantScored {
        ticket: Ticket,
        clinvar_id: String,
        outcome: Result<ScoreResult>,
    },
    PositionScored {
        ticket: Ticket,
        outcome: Result<ScoreResult>,
    },
    SearchCompleted {
        seq: u64,
        chromosome: Option<String>,
        outcome: Result<Vec<Gene>>,
    },
    ChromosomesLoaded {
        assembly: String,
        outcome: Result<Vec<Chromosome>>,
    },
}

/// Remote work requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ResolveLocus {
        ticket: Ticket,
        gene: Gene,
    },
    FetchWindow {
        ticket: Ticket,
        assembly: String,
        chrom: String,
        range: GenomicRange,
    },
    FetchVariants {
        ticket: Ticket,
        assembly: String,
        chrom: String,
        bounds: GeneBounds,
    },
    ScoreVariant {
        ticket: Ticket,
        clinvar_id: String,
        request: ScoreRequest,
    },
    ScorePosition {
        ticket: Ticket,
        request: ScoreRequest,
    },
    SearchGenes {
        seq: u64,
        query: String,
        assembly: String,
        /// Browse mode: keep only genes on this chromosome
        chromosome: Option<String>,
    },
    ListChromosomes {
        assembly: String,
    },
}

/// State of one inspection session.
#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    assembly: String,
    mode: Mode,
    chromosome: Option<String>,
    chromosomes: Vec<Chromosome>,
    search: SearchState,

    generation: u64,
    gene: Option<Gene>,
    status: LocusStatus,
    locus: Option<ResolvedLocus>,
    sequence: SequenceState,
    variants: VariantState,
    focus: Option<ClinicalVariant>,
    active_position: Option<ActiveSequencePosition>,
    manual: ManualScore,
}

/// Query of the canned example lookup.
pub const EXAMPLE_QUERY: &str = "BRCA1";

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            assembly: config.default_assembly.clone(),
            config,
            mode: Mode::Search,
            chromosome: None,
            chromosomes: Vec::new(),
            search: SearchState::default(),
            generation: 0,
            gene: None,
            status: LocusStatus::NoGeneSelected,
            locus: None,
            sequence: SequenceState::default(),
            variants: VariantState::default(),
            focus: None,
            active_position: None,
            manual: ManualScore::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn chromosome(&self) -> Option<&str> {
        self.chromosome.as_deref()
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn gene(&self) -> Option<&Gene> {
        self.gene.as_ref()
    }

    pub fn status(&self) -> &LocusStatus {
        &self.status
    }

    pub fn locus(&self) -> Option<&ResolvedLocus> {
        self.locus.as_ref()
    }

    pub fn bounds(&self) -> Option<GeneBounds> {
        self.locus.as_ref().map(|l| l.bounds)
    }

    pub fn sequence(&self) -> &SequenceState {
        &self.sequence
    }

    pub fn variants(&self) -> &VariantState {
        &self.variants
    }

    pub fn focus(&self) -> Option<&ClinicalVariant> {
        self.focus.as_ref()
    }

    pub fn active_position(&self) -> Option<ActiveSequencePosition> {
        self.active_position
    }

    pub fn manual_score(&self) -> &ManualScore {
        &self.manual
    }

    /// Apply one event and return the commands it triggers.
    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::SelectGene(gene) => self.select_gene(gene),
            Event::CloseGene => {
                self.close_gene();
                Vec::new()
            }
            Event::LoadWindow { start, end } => self.load_window(&start, &end),
            Event::RefreshVariants => self.refresh_variants(),
            Event::ScoreVariant { clinvar_id } => self.score_variant(&clinvar_id),
            Event::PickPosition {
                position,
                nucleotide,
            } => {
                if self.gene.is_some() {
                    self.active_position = Some(ActiveSequencePosition {
                        position,
                        reference: nucleotide.to_ascii_uppercase(),
                    });
                }
                Vec::new()
            }
            Event::ScorePosition { alternate } => self.score_position(&alternate),
            Event::ShowComparison { clinvar_id } => {
                match self.variants.set.get(&clinvar_id) {
                    Some(v) if v.score.is_some() => self.focus = Some(v.clone()),
                    _ => tracing::debug!("No scored variant {} to compare", clinvar_id),
                }
                Vec::new()
            }
            Event::ClearComparison => {
                self.focus = None;
                Vec::new()
            }
            Event::SwitchMode(mode) => self.switch_mode(mode),
            Event::SelectChromosome(chrom) => {
                self.chromosome = Some(chrom);
                match self.mode {
                    Mode::Browse => self.browse(),
                    Mode::Search => Vec::new(),
                }
            }
            Event::ChangeAssembly(assembly) => self.change_assembly(assembly),
            Event::Search(query) => self.start_search(query, None),
            Event::RunExample => {
                self.close_gene();
                self.mode = Mode::Search;
                self.start_search(EXAMPLE_QUERY.to_string(), None)
            }

            Event::LocusResolved { ticket, outcome } => self.on_locus(ticket, outcome),
            Event::WindowLoaded { ticket, outcome } => {
                self.on_window(ticket, outcome);
                Vec::new()
            }
            Event::VariantsLoaded { ticket, outcome } => {
                self.on_variants(ticket, outcome);
                Vec::new()
            }
            Event::VariantScored {
                ticket,
                clinvar_id,
                outcome,
            } => {
                self.on_variant_scored(ticket, &clinvar_id, outcome);
                Vec::new()
            }
            Event::PositionScored { ticket, outcome } => {
                self.on_position_scored(ticket, outcome);
                Vec::new()
            }
            Event::SearchCompleted {
                seq,
                chromosome,
                outcome,
            } => {
                self.on_search(seq, chromosome, outcome);
                Vec::new()
            }
            Event::ChromosomesLoaded { assembly, outcome } => self.on_chromosomes(assembly, outcome),
        }
    }

    fn ticket(&self, seq: u64) -> Ticket {
        Ticket {
            generation: self.generation,
            seq,
        }
    }

    fn is_stale(&self, ticket: Ticket, seq: u64, what: &str) -> bool {
        let stale = ticket.generation != self.generation || ticket.seq != seq;
        if stale {
            tracing::debug!(
                "Dropping stale {} (generation {} seq {}, current {} / {})",
                what,
                ticket.generation,
                ticket.seq,
                self.generation,
                seq
            );
        }
        stale
    }

    fn select_gene(&mut self, gene: Gene) -> Vec<Command> {
        self.close_gene();
        tracing::info!("Selected gene {} ({})", gene.symbol, gene.chrom);
        self.gene = Some(gene.clone());
        self.status = LocusStatus::LoadingLocus;
        vec![Command::ResolveLocus {
            ticket: self.ticket(0),
            gene,
        }]
    }

    /// Back to the gene list; all per-gene state is discarded and any
    /// response still in flight for the old gene becomes stale.
    fn close_gene(&mut self) {
        if let Some(gene) = &self.gene {
            tracing::info!("Closed gene {}", gene.symbol);
        }
        self.generation += 1;
        self.gene = None;
        self.status = LocusStatus::NoGeneSelected;
        self.locus = None;
        self.sequence = SequenceState::default();
        self.variants = VariantState::default();
        self.focus = None;
        self.active_position = None;
        self.manual = ManualScore::default();
    }

    fn on_locus(&mut self, ticket: Ticket, outcome: Result<Option<ResolvedLocus>>) -> Vec<Command> {
        if self.is_stale(ticket, 0, "locus") || self.status != LocusStatus::LoadingLocus {
            return Vec::new();
        }
        let Some(gene) = self.gene.clone() else {
            return Vec::new();
        };

        let locus = match outcome {
            Ok(Some(locus)) => locus,
            Ok(None) => {
                let msg = format!("No genomic coordinates found for {}", gene.symbol);
                tracing::warn!("{}", msg);
                self.status = LocusStatus::LocusError(msg);
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!("Locus lookup for {} failed: {}", gene.symbol, err);
                self.status = LocusStatus::LocusError(err.to_string());
                return Vec::new();
            }
        };

        tracing::info!("Locus ready for {}: {}", gene.symbol, locus.bounds);
        let window = locus.default_window;
        let bounds = locus.bounds;
        self.locus = Some(locus);
        self.status = LocusStatus::LocusReady;

        let mut commands = Vec::with_capacity(2);
        commands.push(self.window_command(window));
        commands.extend(self.variants_command(bounds));
        commands
    }

    fn window_command(&mut self, range: GenomicRange) -> Command {
        self.sequence.seq += 1;
        self.sequence.loading = true;
        self.sequence.error = None;
        Command::FetchWindow {
            ticket: self.ticket(self.sequence.seq),
            assembly: self.assembly.clone(),
            chrom: self.gene_chrom(),
            range,
        }
    }

    fn variants_command(&mut self, bounds: GeneBounds) -> Option<Command> {
        let chrom = self.gene_chrom();
        if chrom.is_empty() {
            return None;
        }
        self.variants.epoch += 1;
        self.variants.loading = true;
        self.variants.error = None;
        Some(Command::FetchVariants {
            ticket: self.ticket(self.variants.epoch),
            assembly: self.assembly.clone(),
            chrom,
            bounds,
        })
    }

    fn gene_chrom(&self) -> String {
        self.gene
            .as_ref()
            .map(|g| g.chrom.clone())
            .unwrap_or_default()
    }

    fn load_window(&mut self, start: &str, end: &str) -> Vec<Command> {
        if self.status != LocusStatus::LocusReady {
            tracing::debug!("Ignoring window request without a resolved locus");
            return Vec::new();
        }
        match validate_range(start, end, self.bounds(), self.config.max_window) {
            Ok(range) => vec![self.window_command(range)],
            Err(err) => {
                tracing::debug!("Rejected window {}-{}: {}", start, end, err);
                // Drop any fetch still in flight so the message stays
                self.sequence.seq += 1;
                self.sequence.loading = false;
                self.sequence.error = Some(err.to_string());
                Vec::new()
            }
        }
    }

    fn on_window(&mut self, ticket: Ticket, outcome: Result<SequenceWindow>) {
        if self.is_stale(ticket, self.sequence.seq, "sequence window") {
            return;
        }
        self.sequence.loading = false;
        match outcome {
            Ok(window) => {
                self.sequence.error = window.error.clone();
                self.sequence.window = Some(window);
            }
            Err(err) => {
                tracing::warn!("Sequence lookup failed: {}", err);
                self.sequence.error = Some(err.to_string());
            }
        }
    }

    fn refresh_variants(&mut self) -> Vec<Command> {
        match self.bounds() {
            Some(bounds) if self.status == LocusStatus::LocusReady => {
                self.variants_command(bounds).into_iter().collect()
            }
            _ => {
                tracing::debug!("Variant refresh skipped, bounds unknown");
                Vec::new()
            }
        }
    }

    fn on_variants(&mut self, ticket: Ticket, outcome: Result<Option<Vec<ClinicalVariant>>>) {
        if self.is_stale(ticket, self.variants.epoch, "variant set") {
            return;
        }
        self.variants.loading = false;
        match outcome {
            Ok(Some(variants)) => {
                self.variants.set = VariantSet::from_variants(variants);
                self.variants.error = None;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!("ClinVar lookup failed: {}", err);
                self.variants.set.clear();
                self.variants.error = Some(err.to_string());
            }
        }
    }

    fn score_variant(&mut self, clinvar_id: &str) -> Vec<Command> {
        if self.status != LocusStatus::LocusReady {
            return Vec::new();
        }
        let chrom = self.gene_chrom();
        let request = begin_scoring(
            &mut self.variants.set,
            clinvar_id,
            &self.assembly,
            &chrom,
            self.config.coalesce_scoring,
        );
        match request {
            Some(request) => vec![Command::ScoreVariant {
                ticket: self.ticket(self.variants.epoch),
                clinvar_id: clinvar_id.to_string(),
                request,
            }],
            None => Vec::new(),
        }
    }

    fn on_variant_scored(&mut self, ticket: Ticket, clinvar_id: &str, outcome: Result<ScoreResult>) {
        if self.is_stale(ticket, self.variants.epoch, "variant score") {
            return;
        }
        if let Err(err) = &outcome {
            tracing::warn!("Scoring {} failed: {}", clinvar_id, err);
        }
        if !apply_score(&mut self.variants.set, clinvar_id, &outcome) {
            return;
        }
        if outcome.is_ok() {
            self.focus = self.variants.set.get(clinvar_id).cloned();
        }
    }

    fn score_position(&mut self, alternate: &str) -> Vec<Command> {
        if self.status != LocusStatus::LocusReady {
            return Vec::new();
        }
        let Some(picked) = self.active_position else {
            tracing::debug!("No sequence position picked");
            return Vec::new();
        };
        match manual_substitution(picked, alternate, self.bounds()) {
            Ok(substitution) => {
                self.manual.seq += 1;
                self.manual.substitution = Some(substitution);
                self.manual.loading = true;
                self.manual.error = None;
                self.manual.result = None;
                vec![Command::ScorePosition {
                    ticket: self.ticket(self.manual.seq),
                    request: substitution.request(&self.assembly, &self.gene_chrom()),
                }]
            }
            Err(err) => {
                self.manual.error = Some(err.to_string());
                Vec::new()
            }
        }
    }

    fn on_position_scored(&mut self, ticket: Ticket, outcome: Result<ScoreResult>) {
        if self.is_stale(ticket, self.manual.seq, "position score") {
            return;
        }
        self.manual.loading = false;
        match outcome {
            Ok(result) => self.manual.result = Some(result),
            Err(err) => self.manual.error = Some(failure_message(&err)),
        }
    }

    fn switch_mode(&mut self, mode: Mode) -> Vec<Command> {
        if mode == self.mode {
            return Vec::new();
        }
        tracing::info!("Switching to {:?} mode", mode);
        self.close_gene();
        self.mode = mode;
        self.search.results.clear();
        self.search.error = None;
        match mode {
            Mode::Browse => self.browse(),
            Mode::Search if !self.search.query.trim().is_empty() => {
                let query = self.search.query.clone();
                self.start_search(query, None)
            }
            Mode::Search => {
                // Invalidate any browse lookup still in flight
                self.search.seq += 1;
                self.search.loading = false;
                Vec::new()
            }
        }
    }

    fn browse(&mut self) -> Vec<Command> {
        match self.chromosome.clone() {
            Some(chrom) => self.start_search(chrom.clone(), Some(chrom)),
            None => Vec::new(),
        }
    }

    fn start_search(&mut self, query: String, chromosome: Option<String>) -> Vec<Command> {
        self.search.seq += 1;
        self.search.results.clear();
        self.search.error = None;
        if query.trim().is_empty() {
            self.search.query = query;
            self.search.loading = false;
            return Vec::new();
        }
        if chromosome.is_none() {
            self.search.query = query.clone();
        }
        self.search.loading = true;
        vec![Command::SearchGenes {
            seq: self.search.seq,
            query: query.trim().to_string(),
            assembly: self.assembly.clone(),
            chromosome,
        }]
    }

    fn on_search(&mut self, seq: u64, chromosome: Option<String>, outcome: Result<Vec<Gene>>) {
        if seq != self.search.seq {
            tracing::debug!("Dropping stale gene search {}", seq);
            return;
        }
        self.search.loading = false;
        match outcome {
            Ok(genes) => {
                self.search.results = match chromosome {
                    Some(chrom) => genes_on_chromosome(genes, &chrom),
                    None => genes,
                };
            }
            Err(err) => {
                tracing::warn!("Gene search failed: {}", err);
                self.search.error = Some(err.to_string());
            }
        }
    }

    fn change_assembly(&mut self, assembly: String) -> Vec<Command> {
        tracing::info!("Switching assembly to {}", assembly);
        self.close_gene();
        self.assembly = assembly.clone();
        self.chromosome = None;
        self.chromosomes.clear();
        self.search.seq += 1;
        self.search.results.clear();
        self.search.loading = false;
        self.search.error = None;
        vec![Command::ListChromosomes { assembly }]
    }

    fn on_chromosomes(&mut self, assembly: String, outcome: Result<Vec<Chromosome>>) -> Vec<Command> {
        if assembly != self.assembly {
            tracing::debug!("Dropping chromosome list for {}", assembly);
            return Vec::new();
        }
        match outcome {
            Ok(chromosomes) => {
                self.chromosomes = primary_chromosomes(chromosomes);
                self.chromosome = self.chromosomes.first().map(|c| c.name.clone());
                match self.mode {
                    Mode::Browse => self.browse(),
                    Mode::Search => Vec::new(),
                }
            }
            Err(err) => {
                tracing::warn!("Chromosome list for {} failed: {}", assembly, err);
                self.search.error = Some(err.to_string());
                Vec::new()
            }
        }
    }
}
