//! Variant scoring coordination.
//!
//! Scoring one variant is split so the session can keep state writes
//! synchronous and only await the predictor:
//!
//! 1. [`begin_scoring`] extracts the substitution, marks the entry in
//!    progress and builds the [`ScoreRequest`]
//! 2. the caller awaits the [`ScoringService`]
//! 3. [`apply_score`] folds the outcome back into that one entry
//!
//! Every write goes through [`VariantSet::update`], so no outcome can land
//! on another variant.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::clinvar::{ClinicalVariant, ScoreResult, VariantSet};
use crate::coords::GeneBounds;
use crate::error::LocusError;
use crate::sources::ScoreRequest;
use crate::Result;

/// Fallback message when a failure carries no text.
pub const SCORING_FAILED: &str = "Analysis failed";

static SUBSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z])>([A-Za-z])").expect("valid regex"));

/// A single-nucleotide substitution at a 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Substitution {
    pub position: u64,
    pub reference: char,
    pub alternative: char,
}

impl Substitution {
    pub fn request(&self, assembly: &str, chromosome: &str) -> ScoreRequest {
        ScoreRequest {
            position: self.position,
            alternative: self.alternative,
            assembly: assembly.to_string(),
            chromosome: chromosome.to_string(),
        }
    }
}

/// Parse the first `X>Y` change out of a variant title.
///
/// ```
/// use ferro_locus::scoring::parse_title_change;
///
/// assert_eq!(parse_title_change("NM_000000.1(GENE):c.123A>G"), Some(('A', 'G')));
/// assert_eq!(parse_title_change("NM_007294.4(BRCA1):c.5266dup"), None);
/// ```
pub fn parse_title_change(title: &str) -> Option<(char, char)> {
    let caps = SUBSTITUTION.captures(title)?;
    let reference = caps.get(1)?.as_str().chars().next()?;
    let alternative = caps.get(2)?.as_str().chars().next()?;
    Some((
        reference.to_ascii_uppercase(),
        alternative.to_ascii_uppercase(),
    ))
}

/// Extract the substitution a variant encodes: position from its location
/// and the change from its title.
pub fn extract_substitution(variant: &ClinicalVariant) -> Option<Substitution> {
    let position = variant.position()?;
    let (reference, alternative) = parse_title_change(&variant.title)?;
    Some(Substitution {
        position,
        reference,
        alternative,
    })
}

/// Mark a variant in progress and build its scoring request.
///
/// Returns `None`, changing nothing, when the variant is unknown or encodes
/// no simple substitution, or when `coalesce` is set and a request for it
/// is already in flight.
pub fn begin_scoring(
    set: &mut VariantSet,
    clinvar_id: &str,
    assembly: &str,
    chromosome: &str,
    coalesce: bool,
) -> Option<ScoreRequest> {
    let variant = set.get(clinvar_id)?;
    let Some(substitution) = extract_substitution(variant) else {
        tracing::debug!("Variant {} encodes no simple substitution", clinvar_id);
        return None;
    };
    if coalesce && variant.is_scoring {
        tracing::debug!("Scoring already in flight for {}", clinvar_id);
        return None;
    }
    set.update(clinvar_id, |v| v.is_scoring = true);
    Some(substitution.request(assembly, chromosome))
}

/// Fold a scoring outcome into exactly one variant.
///
/// Success attaches the result and clears any earlier error; failure keeps
/// any earlier result and records the message. Returns `false` when the
/// variant is no longer in the set.
pub fn apply_score(set: &mut VariantSet, clinvar_id: &str, outcome: &Result<ScoreResult>) -> bool {
    set.update(clinvar_id, |v| {
        v.is_scoring = false;
        match outcome {
            Ok(result) => {
                v.score = Some(result.clone());
                v.score_error = None;
            }
            Err(err) => v.score_error = Some(failure_message(err)),
        }
    })
}

/// User-facing message of a scoring failure.
///
/// A failure that carries no detail (an upstream error with an empty body,
/// a blank data error) reads as [`SCORING_FAILED`].
pub fn failure_message(err: &LocusError) -> String {
    let detail = match err {
        LocusError::UpstreamFailure { msg, .. } | LocusError::SoftDataError { msg } => msg,
        other => return other.to_string(),
    };
    if detail.trim().is_empty() {
        SCORING_FAILED.to_string()
    } else {
        err.to_string()
    }
}

/// A nucleotide the user picked inside the rendered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveSequencePosition {
    pub position: u64,
    pub reference: char,
}

/// Check a manual substitution at the picked position.
pub fn manual_substitution(
    picked: ActiveSequencePosition,
    alternative: &str,
    bounds: Option<GeneBounds>,
) -> Result<Substitution> {
    let alt = match alternative.trim().to_ascii_uppercase().as_str() {
        a @ ("A" | "C" | "G" | "T") => a.chars().next(),
        _ => None,
    }
    .ok_or_else(|| LocusError::InvalidSubstitution {
        msg: format!("alternate must be one of A, C, G, T (got '{}')", alternative),
    })?;

    let reference = picked.reference.to_ascii_uppercase();
    if alt == reference {
        return Err(LocusError::InvalidSubstitution {
            msg: format!("alternate {} equals the reference", alt),
        });
    }
    if let Some(bounds) = bounds {
        if picked.position < bounds.min() {
            return Err(LocusError::BelowMinimum {
                start: picked.position as i64,
                min: bounds.min(),
            });
        }
        if picked.position > bounds.max() {
            return Err(LocusError::AboveMaximum {
                end: picked.position,
                max: bounds.max(),
            });
        }
    }
    Ok(Substitution {
        position: picked.position,
        reference,
        alternative: alt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn variant(id: &str, title: &str, location: &str) -> ClinicalVariant {
        ClinicalVariant {
            clinvar_id: id.to_string(),
            title: title.to_string(),
            variation_type: "Single Nucleotide Variant".to_string(),
            classification: "Uncertain significance".to_string(),
            gene_sort: "BRCA1".to_string(),
            chromosome: "17".to_string(),
            location: location.to_string(),
            score: None,
            is_scoring: false,
            score_error: None,
        }
    }

    fn result(prediction: &str) -> ScoreResult {
        ScoreResult {
            prediction: prediction.to_string(),
            delta_score: -0.0012,
            classification_confidence: 0.9,
            position: None,
            reference: None,
            alternative: None,
        }
    }

    fn set() -> VariantSet {
        VariantSet::from_variants(vec![
            variant("1", "NM_007294.4(BRCA1):c.5123C>A (p.Ala1708Glu)", "43,063,903"),
            variant("2", "NM_007294.4(BRCA1):c.4956G>A", "43,045,712"),
            variant("3", "NM_007294.4(BRCA1):c.5266dup", "43,057,062"),
            variant("4", "NM_007294.4(BRCA1):c.1A>G", "Unknown"),
        ])
    }

    #[rstest]
    #[case("NM_000000.1(GENE):c.123A>G", Some(('A', 'G')))]
    #[case("NM_000000.1(GENE):c.123a>t", Some(('A', 'T')))]
    #[case("NM_007294.4(BRCA1):c.5123C>A (p.Ala1708Glu)", Some(('C', 'A')))]
    #[case("NM_007294.4(BRCA1):c.5266dup (p.Gln1756fs)", None)]
    #[case("GRCh38/hg38 17q21.31(chr17:43044295-43125483)x3", None)]
    #[case("", None)]
    fn test_parse_title_change(#[case] title: &str, #[case] expected: Option<(char, char)>) {
        assert_eq!(parse_title_change(title), expected);
    }

    #[test]
    fn test_extract_needs_position() {
        let set = set();
        let sub = extract_substitution(set.get("1").unwrap()).unwrap();
        assert_eq!(sub.position, 43063903);
        assert_eq!((sub.reference, sub.alternative), ('C', 'A'));
        assert!(extract_substitution(set.get("3").unwrap()).is_none());
        assert!(extract_substitution(set.get("4").unwrap()).is_none());
    }

    #[test]
    fn test_begin_marks_only_target() {
        let mut set = set();
        let request = begin_scoring(&mut set, "2", "hg38", "chr17", true).unwrap();
        assert_eq!(request.position, 43045712);
        assert_eq!(request.alternative, 'A');
        assert_eq!(request.chromosome, "chr17");
        assert!(set.get("2").unwrap().is_scoring);
        assert!(!set.get("1").unwrap().is_scoring);
    }

    #[test]
    fn test_begin_without_substitution_is_silent() {
        let mut set = set();
        let before = set.clone();
        assert!(begin_scoring(&mut set, "3", "hg38", "chr17", true).is_none());
        assert!(begin_scoring(&mut set, "missing", "hg38", "chr17", true).is_none());
        assert_eq!(set, before);
    }

    #[test]
    fn test_coalescing() {
        let mut set = set();
        assert!(begin_scoring(&mut set, "1", "hg38", "chr17", true).is_some());
        assert!(begin_scoring(&mut set, "1", "hg38", "chr17", true).is_none());
        assert!(begin_scoring(&mut set, "1", "hg38", "chr17", false).is_some());
    }

    #[test]
    fn test_apply_success_and_failure() {
        let mut set = set();
        begin_scoring(&mut set, "1", "hg38", "chr17", true);
        begin_scoring(&mut set, "2", "hg38", "chr17", true);

        assert!(apply_score(&mut set, "2", &Ok(result("Likely pathogenic"))));
        let two = set.get("2").unwrap();
        assert!(!two.is_scoring);
        assert_eq!(two.score.as_ref().unwrap().prediction, "Likely pathogenic");
        // Unrelated entry still in flight, untouched
        assert!(set.get("1").unwrap().is_scoring);
        assert!(set.get("1").unwrap().score.is_none());

        let err = LocusError::upstream("Variant scoring", "model unavailable");
        assert!(apply_score(&mut set, "1", &Err(err)));
        let one = set.get("1").unwrap();
        assert!(!one.is_scoring);
        assert_eq!(
            one.score_error.as_deref(),
            Some("Variant scoring request failed: model unavailable")
        );

        assert!(!apply_score(&mut set, "gone", &Ok(result("Benign"))));
    }

    #[test]
    fn test_failure_keeps_previous_score() {
        let mut set = set();
        apply_score(&mut set, "1", &Ok(result("Likely benign")));
        apply_score(
            &mut set,
            "1",
            &Err(LocusError::SoftDataError { msg: " ".to_string() }),
        );
        let one = set.get("1").unwrap();
        assert!(one.score.is_some());
        assert_eq!(one.score_error.as_deref(), Some(SCORING_FAILED));
    }

    #[test]
    fn test_upstream_failure_without_detail() {
        let mut set = set();
        apply_score(&mut set, "1", &Err(LocusError::upstream("Variant scoring", "")));
        assert_eq!(set.get("1").unwrap().score_error.as_deref(), Some(SCORING_FAILED));

        let err = LocusError::upstream("Variant scoring", "HTTP 502 Bad Gateway");
        assert_eq!(
            failure_message(&err),
            "Variant scoring request failed: HTTP 502 Bad Gateway"
        );
    }

    #[rstest]
    #[case("G", Ok('G'))]
    #[case(" t ", Ok('T'))]
    #[case("A", Err("E1007"))]
    #[case("N", Err("E1007"))]
    #[case("AC", Err("E1007"))]
    fn test_manual_substitution(#[case] alt: &str, #[case] expected: std::result::Result<char, &str>) {
        let picked = ActiveSequencePosition {
            position: 43044300,
            reference: 'a',
        };
        let bounds = GeneBounds::from_endpoints(43044295, 43125483);
        match (manual_substitution(picked, alt, Some(bounds)), expected) {
            (Ok(sub), Ok(c)) => {
                assert_eq!(sub.alternative, c);
                assert_eq!(sub.reference, 'A');
            }
            (Err(err), Err(code)) => assert_eq!(err.code().as_str(), code),
            (got, want) => panic!("got {:?}, want {:?}", got, want),
        }
    }

    #[test]
    fn test_manual_substitution_outside_bounds() {
        let bounds = GeneBounds::from_endpoints(100, 200);
        let below = ActiveSequencePosition {
            position: 99,
            reference: 'A',
        };
        let above = ActiveSequencePosition {
            position: 201,
            reference: 'A',
        };
        assert!(matches!(
            manual_substitution(below, "G", Some(bounds)),
            Err(LocusError::BelowMinimum { .. })
        ));
        assert!(matches!(
            manual_substitution(above, "G", Some(bounds)),
            Err(LocusError::AboveMaximum { .. })
        ));
    }
}
