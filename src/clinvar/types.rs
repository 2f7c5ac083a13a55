//! ClinVar variant types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A clinically annotated variant overlapping the inspected gene.
///
/// Identity is `clinvar_id`. The scoring fields (`score`, `is_scoring`,
/// `score_error`) are written only by the scoring coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalVariant {
    /// ClinVar UID (e.g., "55601")
    pub clinvar_id: String,
    /// Title, usually an HGVS expression (e.g., "NM_007294.4(BRCA1):c.5266dup (p.Gln1756fs)")
    pub title: String,
    /// Variation type in title case (e.g., "Single Nucleotide Variant")
    pub variation_type: String,
    /// Germline classification label, "Unknown" when absent
    pub classification: String,
    /// Gene sort key from the summary, empty when absent
    pub gene_sort: String,
    /// Chromosome label without prefix (e.g., "17")
    pub chromosome: String,
    /// Position with thousands separators, "Unknown" when absent
    pub location: String,
    /// Predictor output once scored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreResult>,
    /// A scoring request is in flight
    #[serde(default)]
    pub is_scoring: bool,
    /// Terminal message of the last failed scoring request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_error: Option<String>,
}

impl ClinicalVariant {
    /// Coarse tone of the classification label.
    pub fn tone(&self) -> ClassificationTone {
        ClassificationTone::from_label(&self.classification)
    }

    /// Check whether the variation type names a single nucleotide change.
    pub fn is_single_nucleotide(&self) -> bool {
        self.variation_type
            .to_lowercase()
            .contains("single nucleotide")
    }

    /// Check whether scoring can be offered: a single nucleotide change
    /// whose title encodes a simple substitution at a known position.
    pub fn is_scorable(&self) -> bool {
        self.is_single_nucleotide() && crate::scoring::extract_substitution(self).is_some()
    }

    /// Numeric position parsed from `location`, if any.
    pub fn position(&self) -> Option<u64> {
        let digits: String = self.location.chars().filter(|c| *c != ',').collect();
        digits.trim().parse().ok()
    }
}

/// Output of the external pathogenicity predictor for one substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Prediction label (e.g., "Likely pathogenic")
    pub prediction: String,
    /// Likelihood delta between alternate and reference
    pub delta_score: f64,
    /// Confidence of the prediction label
    pub classification_confidence: f64,
    /// 1-based position the score refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

impl ScoreResult {
    /// Tone of the prediction label.
    pub fn tone(&self) -> ClassificationTone {
        ClassificationTone::from_label(&self.prediction)
    }
}

/// Coarse reading of a free-text classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationTone {
    /// Label mentions pathogenicity
    Pathogenic,
    /// Label mentions benign
    Benign,
    /// Anything else, including "Unknown" and uncertain significance
    Uncertain,
}

impl ClassificationTone {
    /// Classify a label, case-insensitively.
    ///
    /// Any label mentioning "pathogenic" wins over "benign", so conflicting
    /// records (e.g., "Conflicting interpretations of pathogenicity") read
    /// as pathogenic.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("pathogenic") {
            Self::Pathogenic
        } else if lower.contains("benign") {
            Self::Benign
        } else {
            Self::Uncertain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pathogenic => "pathogenic",
            Self::Benign => "benign",
            Self::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for ClassificationTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
