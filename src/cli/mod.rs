//! CLI utilities for ferro-locus
//!
//! Pure formatting and argument helpers used by the `ferro-locus` binary,
//! kept in the library so they can be unit tested without a terminal.

pub mod format;
pub mod sequence;

pub use format::{
    output_assemblies, output_chromosomes, output_error, output_genes, output_view, OutputFormat,
    SEQUENCE_LINE_WIDTH,
};
pub use sequence::wrap_sequence;

/// Split a `POSITION:ALT` substitution argument (e.g. `43044300:G`).
pub fn split_substitution_arg(arg: &str) -> Option<(u64, String)> {
    let cleaned: String = arg.chars().filter(|c| *c != ',').collect();
    let (position, alt) = cleaned.split_once(':')?;
    let position = position.trim().parse().ok()?;
    Some((position, alt.trim().to_string()))
}
