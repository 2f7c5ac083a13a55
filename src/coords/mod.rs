//! Type-safe genomic coordinate wrappers
//!
//! Everything the session exposes is 1-based and inclusive. Remote sequence
//! services speak 0-based half-open; the only way across is
//! [`GenomicRange::to_half_open`].
//!
//! | Type | Basis | Used for |
//! |------|-------|----------|
//! | [`GenomicRange`] | 1-based, closed | user windows, gene bounds, variant positions |
//! | [`HalfOpenRange`] | 0-based, half-open | UCSC `getData/sequence` requests |
//!
//! # Examples
//!
//! ```
//! use ferro_locus::coords::{GeneBounds, GenomicRange};
//!
//! // Reverse-strand genes report stop < start
//! let bounds = GeneBounds::from_endpoints(43125483, 43044295);
//! assert_eq!(bounds.min(), 43044295);
//! assert_eq!(bounds.max(), 43125483);
//!
//! let window = bounds.default_window(10_000);
//! assert_eq!(window, GenomicRange::new(43044295, 43054295).unwrap());
//!
//! let api = window.to_half_open();
//! assert_eq!((api.start, api.end), (43044294, 43054295));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// The inclusive `[min, max]` span of a gene on its chromosome.
///
/// # Invariant
///
/// `min <= max`. Construction normalizes endpoints given in either strand
/// order, so the invariant cannot be violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GeneBounds {
    min: u64,
    max: u64,
}

impl GeneBounds {
    /// Build bounds from raw start/stop as reported by gene metadata.
    ///
    /// ```
    /// use ferro_locus::coords::GeneBounds;
    ///
    /// let fwd = GeneBounds::from_endpoints(100, 200);
    /// let rev = GeneBounds::from_endpoints(200, 100);
    /// assert_eq!(fwd, rev);
    /// ```
    pub fn from_endpoints(chrstart: u64, chrstop: u64) -> Self {
        Self {
            min: chrstart.min(chrstop),
            max: chrstart.max(chrstop),
        }
    }

    #[inline]
    pub const fn min(&self) -> u64 {
        self.min
    }

    #[inline]
    pub const fn max(&self) -> u64 {
        self.max
    }

    /// Distance between the bounds (`max - min`).
    #[inline]
    pub const fn span(&self) -> u64 {
        self.max - self.min
    }

    /// Check whether a 1-based position lies within the bounds.
    #[inline]
    pub const fn contains(&self, pos: u64) -> bool {
        pos >= self.min && pos <= self.max
    }

    /// Initial viewing window for a freshly resolved gene.
    ///
    /// Starts at `min`. Genes spanning more than `limit` bp are cut to
    /// `min + limit`; smaller genes are shown whole.
    pub fn default_window(&self, limit: u64) -> GenomicRange {
        let end = if self.span() > limit {
            self.min.saturating_add(limit)
        } else {
            self.max
        };
        GenomicRange {
            start: self.min,
            end,
        }
    }

    /// The bounds as a closed range.
    pub fn as_range(&self) -> GenomicRange {
        GenomicRange {
            start: self.min,
            end: self.max,
        }
    }
}

impl fmt::Display for GeneBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// A 1-based closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicRange {
    pub start: u64,
    pub end: u64,
}

impl GenomicRange {
    /// Create a range, returning `None` if `start` is 0 or after `end`.
    pub const fn new(start: u64, end: u64) -> Option<Self> {
        if start == 0 || start > end {
            None
        } else {
            Some(Self { start, end })
        }
    }

    /// Number of bases covered (inclusive).
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A closed range always covers at least one base.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Convert to the 0-based half-open convention used by sequence services.
    #[inline]
    pub const fn to_half_open(self) -> HalfOpenRange {
        HalfOpenRange {
            start: self.start - 1,
            end: self.end,
        }
    }

    /// Shrink the range so it covers at most `len` bases from `start`.
    ///
    /// Returns `None` when `len` is 0.
    pub fn truncate(self, len: u64) -> Option<Self> {
        if len == 0 {
            return None;
        }
        Some(Self {
            start: self.start,
            end: self.end.min(self.start + len - 1),
        })
    }
}

impl fmt::Display for GenomicRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A 0-based half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HalfOpenRange {
    pub start: u64,
    pub end: u64,
}

impl HalfOpenRange {
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Chromosome name in UCSC style (`chr17`).
pub fn ucsc_chrom(name: &str) -> String {
    if name.starts_with("chr") {
        name.to_string()
    } else {
        format!("chr{}", name)
    }
}

/// Chromosome label without any `chr` prefix (`17`), case-insensitive.
pub fn bare_chrom(name: &str) -> &str {
    match name.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &name[3..],
        _ => name,
    }
}

/// Render an integer with `,` thousands separators (e.g. `43,044,295`).
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// [`thousands`] for values that may be negative.
pub fn signed_thousands(value: i64) -> String {
    let digits = thousands(value.unsigned_abs());
    if value < 0 {
        format!("-{}", digits)
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(43044295), "43,044,295");
        assert_eq!(thousands(100000), "100,000");
        assert_eq!(signed_thousands(-12345), "-12,345");
        assert_eq!(signed_thousands(0), "0");
    }

    #[test]
    fn test_bounds_normalize_reverse_strand() {
        let bounds = GeneBounds::from_endpoints(43125483, 43044295);
        assert_eq!(bounds.min(), 43044295);
        assert_eq!(bounds.max(), 43125483);
        assert_eq!(bounds.span(), 81188);
    }

    #[test]
    fn test_default_window_large_gene() {
        let bounds = GeneBounds::from_endpoints(43044295, 43125483);
        let window = bounds.default_window(10_000);
        assert_eq!(window.start, 43044295);
        assert_eq!(window.end, 43054295);
    }

    #[test]
    fn test_default_window_small_gene() {
        let bounds = GeneBounds::from_endpoints(1000, 5000);
        let window = bounds.default_window(10_000);
        assert_eq!(window, bounds.as_range());
    }

    #[test]
    fn test_default_window_exactly_limit() {
        let bounds = GeneBounds::from_endpoints(1000, 11_000);
        assert_eq!(bounds.default_window(10_000).end, 11_000);
    }

    #[test]
    fn test_contains() {
        let bounds = GeneBounds::from_endpoints(10, 20);
        assert!(bounds.contains(10));
        assert!(bounds.contains(20));
        assert!(!bounds.contains(9));
        assert!(!bounds.contains(21));
    }

    #[test]
    fn test_range_construction() {
        assert!(GenomicRange::new(0, 10).is_none());
        assert!(GenomicRange::new(11, 10).is_none());
        assert_eq!(GenomicRange::new(5, 5).map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_half_open_conversion() {
        let range = GenomicRange::new(100, 200).unwrap();
        let api = range.to_half_open();
        assert_eq!(api.start, 99);
        assert_eq!(api.end, 200);
        assert_eq!(api.len(), range.len());
    }

    #[test]
    fn test_truncate() {
        let range = GenomicRange::new(100, 200).unwrap();
        assert_eq!(range.truncate(0), None);
        assert_eq!(range.truncate(10), GenomicRange::new(100, 109));
        assert_eq!(range.truncate(500), Some(range));
    }

    #[test]
    fn test_chrom_names() {
        assert_eq!(ucsc_chrom("17"), "chr17");
        assert_eq!(ucsc_chrom("chrX"), "chrX");
        assert_eq!(bare_chrom("chr17"), "17");
        assert_eq!(bare_chrom("CHR17"), "17");
        assert_eq!(bare_chrom("17"), "17");
        assert_eq!(bare_chrom("ch"), "ch");
    }
}
