//! Keyed, insertion-ordered collection of clinical variants.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::ClinicalVariant;

/// The variants overlapping the inspected gene, keyed by `clinvar_id`.
///
/// Storage is copy-on-write: [`VariantSet::snapshot`] hands out the current
/// vector behind an `Arc`, and every write produces a new vector when a
/// snapshot is still alive. A reader holding a snapshot never observes a
/// half-applied update.
///
/// # Example
///
/// ```
/// use ferro_locus::clinvar::{ClinicalVariant, VariantSet};
///
/// let variant = ClinicalVariant {
///     clinvar_id: "55601".to_string(),
///     title: "NM_007294.4(BRCA1):c.5123C>A (p.Ala1708Glu)".to_string(),
///     variation_type: "Single Nucleotide Variant".to_string(),
///     classification: "Pathogenic".to_string(),
///     gene_sort: "BRCA1".to_string(),
///     chromosome: "17".to_string(),
///     location: "43,063,903".to_string(),
///     score: None,
///     is_scoring: false,
///     score_error: None,
/// };
///
/// let mut set = VariantSet::from_variants(vec![variant]);
/// let before = set.snapshot();
///
/// assert!(set.update("55601", |v| v.is_scoring = true));
/// assert!(set.get("55601").unwrap().is_scoring);
/// assert!(!before[0].is_scoring);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VariantSet {
    /// Variants in upstream order.
    variants: Arc<Vec<ClinicalVariant>>,
    /// clinvar_id -> index into `variants`
    index: HashMap<String, usize>,
}

impl VariantSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from upstream order.
    ///
    /// A repeated `clinvar_id` keeps its first occurrence.
    pub fn from_variants(variants: Vec<ClinicalVariant>) -> Self {
        let mut index = HashMap::with_capacity(variants.len());
        let mut kept = Vec::with_capacity(variants.len());
        for variant in variants {
            if index.contains_key(&variant.clinvar_id) {
                tracing::debug!("Dropping duplicate ClinVar record {}", variant.clinvar_id);
                continue;
            }
            index.insert(variant.clinvar_id.clone(), kept.len());
            kept.push(variant);
        }
        Self {
            variants: Arc::new(kept),
            index,
        }
    }

    /// Get a variant by ClinVar id.
    pub fn get(&self, clinvar_id: &str) -> Option<&ClinicalVariant> {
        self.index.get(clinvar_id).map(|&i| &self.variants[i])
    }

    pub fn contains(&self, clinvar_id: &str) -> bool {
        self.index.contains_key(clinvar_id)
    }

    /// Iterate in upstream order.
    pub fn iter(&self) -> impl Iterator<Item = &ClinicalVariant> {
        self.variants.iter()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Shared, immutable view of the current contents.
    pub fn snapshot(&self) -> Arc<Vec<ClinicalVariant>> {
        Arc::clone(&self.variants)
    }

    /// Apply `f` to exactly the entry keyed by `clinvar_id`.
    ///
    /// All other entries are left untouched. Returns `false` (and changes
    /// nothing) when the id is not present. The id itself cannot be changed
    /// through `f`.
    pub fn update<F>(&mut self, clinvar_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut ClinicalVariant),
    {
        let Some(&i) = self.index.get(clinvar_id) else {
            return false;
        };
        let mut updated = self.variants[i].clone();
        f(&mut updated);
        updated.clinvar_id = clinvar_id.to_string();
        Arc::make_mut(&mut self.variants)[i] = updated;
        true
    }

    /// Remove all variants.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl PartialEq for VariantSet {
    fn eq(&self, other: &Self) -> bool {
        self.variants == other.variants
    }
}

impl<'a> IntoIterator for &'a VariantSet {
    type Item = &'a ClinicalVariant;
    type IntoIter = std::slice::Iter<'a, ClinicalVariant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}
