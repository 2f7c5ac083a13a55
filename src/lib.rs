// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-locus: gene locus inspection
//!
//! Part of the ferro bioinformatics toolkit.
//!
//! Resolves a gene to its genomic bounds, loads bounded windows of reference
//! sequence, collects the ClinVar variants overlapping the gene and scores
//! single-nucleotide substitutions against a remote predictor. All remote
//! collaborators sit behind traits in [`sources`]; [`MockSources`] serves
//! them from memory.
//!
//! # Example
//!
//! ```
//! use ferro_locus::window::validate_range;
//! use ferro_locus::coords::GeneBounds;
//! use ferro_locus::LocusError;
//!
//! let bounds = GeneBounds::from_endpoints(43125483, 43044295);
//! assert_eq!(bounds.min(), 43044295);
//!
//! let err = validate_range("100", "50", Some(bounds), 10_000).unwrap_err();
//! assert_eq!(err, LocusError::StartNotBeforeEnd { start: 100, end: 50 });
//! ```

pub mod catalog;
pub mod cli;
pub mod clinvar;
pub mod config;
pub mod coords;
pub mod error;
pub mod locus;
pub mod scoring;
pub mod session;
pub mod sources;
pub mod window;

// Re-export commonly used types
pub use catalog::{Assembly, Chromosome, Gene};
pub use clinvar::{ClinicalVariant, ScoreResult, VariantSet};
pub use config::{LocusConfig, SoftErrorRange};
pub use coords::{GeneBounds, GenomicRange, HalfOpenRange};
pub use error::{ErrorCode, LocusError};
pub use locus::{resolve_locus, ResolvedLocus};
pub use session::{Event, LocusStatus, Mode, Orchestrator, Session, SessionView};
pub use sources::{MockSources, Sources};
pub use window::{fetch_window, validate_range, SequenceWindow};

/// Result type alias for ferro-locus operations
pub type Result<T> = std::result::Result<T, LocusError>;
