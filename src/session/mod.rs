//! Inspection session: state machine, snapshot and async driver.
//!
//! Selecting a gene walks `NoGeneSelected -> LoadingLocus`, then either
//! `LocusError` or `LocusReady`. Once ready, the sequence window and the
//! variant set load independently; each keeps its own loading and error
//! flags and neither's failure touches the other.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ferro_locus::config::LocusConfig;
//! use ferro_locus::session::{LocusStatus, Orchestrator};
//! use ferro_locus::sources::{MockSources, Sources};
//! use ferro_locus::catalog::Gene;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sources = Sources::uniform(Arc::new(MockSources::with_test_data()));
//! let orch = Orchestrator::new(sources, &LocusConfig::default());
//! let gene = Gene {
//!     symbol: "BRCA1".to_string(),
//!     name: "BRCA1 DNA repair associated".to_string(),
//!     chrom: "chr17".to_string(),
//!     description: String::new(),
//!     gene_id: Some("672".to_string()),
//! };
//! let view = orch.select_gene(gene).await;
//! assert_eq!(view.status, LocusStatus::LocusReady);
//! assert_eq!(view.sequence.window.unwrap().sequence.len(), 10_001);
//! # }
//! ```

mod orchestrator;
mod state;
mod view;

pub use orchestrator::Orchestrator;
pub use state::{
    Command, Event, LocusStatus, ManualScore, Mode, SearchState, SequenceState, Session, Ticket,
    VariantState, EXAMPLE_QUERY,
};
pub use view::SessionView;
