//! ClinVar variants overlapping the inspected gene.
//!
//! This module provides the variant record, the keyed collection the
//! session keeps them in, and the two-phase overlap lookup that fills it.
//!
//! # Examples
//!
//! ```
//! use ferro_locus::clinvar::OverlapQuery;
//! use ferro_locus::coords::GeneBounds;
//!
//! let bounds = GeneBounds::from_endpoints(43044295, 43125483);
//! let query = OverlapQuery::new("chr17", bounds, "hg38", 20);
//! assert_eq!(query.term(), "17[chromosome] AND 43044295:43125483[chrpos38]");
//! ```
//!
//! # References
//!
//! - [E-utilities](https://www.ncbi.nlm.nih.gov/books/NBK25500/)
//! - [ClinVar search fields](https://www.ncbi.nlm.nih.gov/clinvar/docs/help/)

mod query;
mod set;
mod types;

pub use query::{fetch_variants, title_case, variant_from_summary, AssemblyTag, OverlapQuery};
pub use set::VariantSet;
pub use types::{ClassificationTone, ClinicalVariant, ScoreResult};
