//! Read-only session snapshot for the presentation layer.

use serde::Serialize;
use std::sync::Arc;

use super::state::{LocusStatus, ManualScore, Mode, SearchState, SequenceState, Session};
use crate::catalog::{Chromosome, Gene};
use crate::clinvar::ClinicalVariant;
use crate::coords::{GeneBounds, GenomicRange};
use crate::locus::GeneDetails;
use crate::scoring::ActiveSequencePosition;

/// Immutable copy of everything the presentation layer shows.
///
/// The variant list is shared with the session until its next write.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub assembly: String,
    pub mode: Mode,
    pub chromosome: Option<String>,
    pub chromosomes: Vec<Chromosome>,
    pub search: SearchState,

    pub gene: Option<Gene>,
    pub status: LocusStatus,
    pub bounds: Option<GeneBounds>,
    pub default_window: Option<GenomicRange>,
    pub details: Option<GeneDetails>,
    pub sequence: SequenceState,
    pub variants: Arc<Vec<ClinicalVariant>>,
    pub variants_loading: bool,
    pub variants_error: Option<String>,
    pub comparison: Option<ClinicalVariant>,
    pub active_position: Option<ActiveSequencePosition>,
    pub manual_score: ManualScore,
}

impl SessionView {
    pub fn variant(&self, clinvar_id: &str) -> Option<&ClinicalVariant> {
        self.variants.iter().find(|v| v.clinvar_id == clinvar_id)
    }
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let locus = session.locus();
        Self {
            assembly: session.assembly().to_string(),
            mode: session.mode(),
            chromosome: session.chromosome().map(str::to_string),
            chromosomes: session.chromosomes().to_vec(),
            search: session.search().clone(),
            gene: session.gene().cloned(),
            status: session.status().clone(),
            bounds: locus.map(|l| l.bounds),
            default_window: locus.map(|l| l.default_window),
            details: locus.map(|l| l.details.clone()),
            sequence: session.sequence().clone(),
            variants: session.variants().set.snapshot(),
            variants_loading: session.variants().loading,
            variants_error: session.variants().error.clone(),
            comparison: session.focus().cloned(),
            active_position: session.active_position(),
            manual_score: session.manual_score().clone(),
        }
    }
}
