//! Output formatting for CLI results

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::str::FromStr;

use super::sequence::wrap_sequence;
use crate::catalog::{Assembly, Chromosome, Gene};
use crate::clinvar::{ClinicalVariant, ScoreResult};
use crate::coords::thousands;
use crate::error::LocusError;
use crate::session::{LocusStatus, SessionView};

/// Bases per rendered sequence line
pub const SEQUENCE_LINE_WIDTH: usize = 60;

/// Output format for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text format (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl FromStr for OutputFormat {
    type Err = std::convert::Infallible;

    /// Parse an output format from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use ferro_locus::cli::OutputFormat;
    /// use std::str::FromStr;
    ///
    /// assert!(matches!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json));
    /// assert!(matches!(OutputFormat::from_str("TEXT").unwrap(), OutputFormat::Text));
    /// assert!(matches!(OutputFormat::from_str("yaml").unwrap(), OutputFormat::Text));
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        })
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)
}

/// Write an error
///
/// # Examples
///
/// ```
/// use ferro_locus::cli::{output_error, OutputFormat};
/// use ferro_locus::LocusError;
/// use std::io::Cursor;
///
/// let mut buffer = Cursor::new(Vec::new());
/// let error = LocusError::StartNotBeforeEnd { start: 100, end: 50 };
/// output_error(&mut buffer, &error, OutputFormat::Text).unwrap();
/// let result = String::from_utf8(buffer.into_inner()).unwrap();
/// assert!(result.starts_with("ERROR [E1003]"));
/// ```
pub fn output_error<W: Write>(
    writer: &mut W,
    error: &LocusError,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(
            writer,
            &serde_json::json!({
                "status": "error",
                "code": error.code().as_str(),
                "error": error.to_string(),
            }),
        ),
        OutputFormat::Text => writeln!(writer, "ERROR [{}]: {}", error.code().as_str(), error),
    }
}

/// Write assemblies grouped by organism
pub fn output_assemblies<W: Write>(
    writer: &mut W,
    grouped: &BTreeMap<String, Vec<Assembly>>,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(writer, grouped),
        OutputFormat::Text => {
            for (organism, assemblies) in grouped {
                writeln!(writer, "{}", organism)?;
                for a in assemblies {
                    let inactive = if a.active { "" } else { " (inactive)" };
                    writeln!(writer, "  {:<12} {}{}", a.id, a.source_name, inactive)?;
                }
            }
            Ok(())
        }
    }
}

/// Write a chromosome list
pub fn output_chromosomes<W: Write>(
    writer: &mut W,
    chromosomes: &[Chromosome],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(writer, chromosomes),
        OutputFormat::Text => {
            for c in chromosomes {
                writeln!(writer, "{:<8} {:>15} bp", c.name, thousands(c.size))?;
            }
            Ok(())
        }
    }
}

/// Write gene hits, one per line
pub fn output_genes<W: Write>(
    writer: &mut W,
    genes: &[Gene],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(writer, genes),
        OutputFormat::Text => {
            if genes.is_empty() {
                return writeln!(writer, "No genes found");
            }
            for g in genes {
                writeln!(
                    writer,
                    "{:<12} {:<8} {:<10} {}",
                    g.symbol,
                    g.chrom,
                    g.gene_id.as_deref().unwrap_or("-"),
                    g.name
                )?;
            }
            Ok(())
        }
    }
}

fn score_text(score: &ScoreResult) -> String {
    format!(
        "{} (delta {:.4}, confidence {:.2})",
        score.prediction, score.delta_score, score.classification_confidence
    )
}

fn variant_line(v: &ClinicalVariant) -> String {
    let mut line = format!(
        "{:<10} {:>12}  {:<28} {}",
        v.clinvar_id, v.location, v.classification, v.title
    );
    if let Some(score) = &v.score {
        line.push_str(&format!("\n{:<10} score: {}", "", score_text(score)));
    }
    if let Some(err) = &v.score_error {
        line.push_str(&format!("\n{:<10} scoring failed: {}", "", err));
    }
    line
}

/// Write a locus snapshot
///
/// Text output shows the locus header, the sequence window wrapped at
/// [`SEQUENCE_LINE_WIDTH`] and the variant table. Each sub-system reports
/// its own error without hiding the others.
pub fn output_view<W: Write>(
    writer: &mut W,
    view: &SessionView,
    format: OutputFormat,
) -> io::Result<()> {
    if format == OutputFormat::Json {
        return write_json(writer, view);
    }

    let Some(gene) = &view.gene else {
        return writeln!(writer, "No gene selected");
    };
    writeln!(writer, "{} ({}) on {} [{}]", gene.symbol, gene.name, gene.chrom, view.assembly)?;

    match &view.status {
        LocusStatus::LocusError(msg) => return writeln!(writer, "Locus error: {}", msg),
        LocusStatus::LoadingLocus => return writeln!(writer, "Locus loading"),
        LocusStatus::NoGeneSelected | LocusStatus::LocusReady => {}
    }

    if let Some(bounds) = view.bounds {
        writeln!(
            writer,
            "Bounds: {}-{} ({} bp)",
            thousands(bounds.min()),
            thousands(bounds.max()),
            thousands(bounds.span() + 1)
        )?;
    }
    if let Some(details) = &view.details {
        if let Some(strand) = &details.strand {
            writeln!(writer, "Strand: {}", strand)?;
        }
        if let Some(summary) = &details.summary {
            writeln!(writer, "Summary: {}", summary)?;
        }
    }

    writeln!(writer)?;
    if let Some(err) = &view.sequence.error {
        writeln!(writer, "Sequence error: {}", err)?;
    }
    if let Some(window) = &view.sequence.window {
        writeln!(
            writer,
            "Sequence {}-{}",
            thousands(window.requested.start),
            thousands(window.requested.end)
        )?;
        if let Some(err) = &window.error {
            writeln!(writer, "  note: {}", err)?;
        }
        for line in wrap_sequence(window, SEQUENCE_LINE_WIDTH) {
            writeln!(writer, "{}", line)?;
        }
    }

    writeln!(writer)?;
    if let Some(err) = &view.variants_error {
        writeln!(writer, "Variant error: {}", err)?;
    } else {
        writeln!(writer, "ClinVar variants: {}", view.variants.len())?;
        for v in view.variants.iter() {
            writeln!(writer, "{}", variant_line(v))?;
        }
    }

    if let Some(sub) = view.manual_score.substitution {
        writeln!(writer)?;
        write!(
            writer,
            "Position {} {}>{}: ",
            thousands(sub.position),
            sub.reference,
            sub.alternative
        )?;
        match (&view.manual_score.result, &view.manual_score.error) {
            (_, Some(err)) => writeln!(writer, "scoring failed: {}", err)?,
            (Some(score), None) => writeln!(writer, "{}", score_text(score))?,
            (None, None) => writeln!(writer, "pending")?,
        }
    }
    Ok(())
}
