//! Sequence window validation and retrieval.
//!
//! A window is a 1-based inclusive sub-range of the gene. Validation runs
//! entirely locally; only a valid window reaches the sequence source.
//!
//! Validation order, first failing rule wins:
//!
//! 1. both values parse as integers ([`LocusError::InvalidRange`])
//! 2. `start < end` ([`LocusError::StartNotBeforeEnd`])
//! 3. `end - start <= max_window` ([`LocusError::RangeTooLarge`])
//! 4. with bounds, `start >= min` then `end <= max`
//!    ([`LocusError::BelowMinimum`], [`LocusError::AboveMaximum`])
//! 5. `start >= 1` ([`LocusError::InvalidRange`])
//!
//! An oversized window is reported as such whatever the bound checks say.
//! A start of zero or below is reported against the gene bound when one
//! is known.

use serde::Serialize;

use crate::config::SoftErrorRange;
use crate::coords::{ucsc_chrom, GeneBounds, GenomicRange};
use crate::error::LocusError;
use crate::sources::SequenceSource;
use crate::Result;

/// A loaded sequence window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceWindow {
    /// Range the user asked for
    pub requested: GenomicRange,
    /// Range the sequence covers, as reported; `None` if nothing came back
    pub actual: Option<GenomicRange>,
    /// Uppercase nucleotides
    pub sequence: String,
    /// Soft data error reported by the source
    pub error: Option<String>,
}

impl SequenceWindow {
    /// Nucleotide at a 1-based position, if it lies inside the window.
    pub fn base_at(&self, position: u64) -> Option<char> {
        let actual = self.actual?;
        if position < actual.start || position > actual.end {
            return None;
        }
        self.sequence
            .as_bytes()
            .get((position - actual.start) as usize)
            .map(|&b| b as char)
    }
}

/// Validate a user-entered window.
///
/// ```
/// use ferro_locus::coords::GeneBounds;
/// use ferro_locus::window::validate_range;
///
/// let bounds = GeneBounds::from_endpoints(43044295, 43125483);
/// let range = validate_range("43044295", "43054295", Some(bounds), 10_000).unwrap();
/// assert_eq!(range.len(), 10_001);
///
/// assert!(validate_range("100", "50", None, 10_000).is_err());
/// ```
pub fn validate_range(
    start: &str,
    end: &str,
    bounds: Option<GeneBounds>,
    max_window: u64,
) -> Result<GenomicRange> {
    let invalid = || LocusError::InvalidRange {
        start: start.to_string(),
        end: end.to_string(),
    };
    let (Ok(s), Ok(e)) = (start.trim().parse::<i64>(), end.trim().parse::<i64>()) else {
        return Err(invalid());
    };

    if s >= e {
        return Err(LocusError::StartNotBeforeEnd { start: s, end: e });
    }
    let span = e.abs_diff(s);
    if span > max_window {
        return Err(LocusError::RangeTooLarge {
            span,
            max: max_window,
        });
    }
    if let Some(bounds) = bounds {
        if s < bounds.min() as i64 {
            return Err(LocusError::BelowMinimum {
                start: s,
                min: bounds.min(),
            });
        }
        if e > bounds.max() as i64 {
            return Err(LocusError::AboveMaximum {
                end: e.unsigned_abs(),
                max: bounds.max(),
            });
        }
    }
    if s < 1 {
        return Err(invalid());
    }
    GenomicRange::new(s.unsigned_abs(), e.unsigned_abs()).ok_or_else(invalid)
}

/// Fetch the sequence of a validated window.
///
/// The chromosome gets its `chr` prefix and the range is sent 0-based
/// half-open. A soft error from the source still yields a window, with
/// the message in [`SequenceWindow::error`]; `policy` decides what range
/// and sequence are kept in that case.
pub async fn fetch_window(
    source: &dyn SequenceSource,
    assembly: &str,
    chrom: &str,
    range: GenomicRange,
    policy: SoftErrorRange,
) -> Result<SequenceWindow> {
    let chrom = ucsc_chrom(chrom);
    tracing::debug!("Fetching sequence {}:{} ({})", chrom, range, assembly);
    let reply = source
        .fetch_sequence(assembly, &chrom, range.to_half_open())
        .await?;

    let returned = reply.dna.unwrap_or_default().to_ascii_uppercase();
    if reply.error.is_none() && !returned.is_empty() {
        return Ok(SequenceWindow {
            requested: range,
            actual: Some(range),
            sequence: returned,
            error: None,
        });
    }

    let msg = reply
        .error
        .unwrap_or_else(|| format!("No sequence returned for {}:{}", chrom, range));
    tracing::warn!("Sequence lookup for {}:{} reported: {}", chrom, range, msg);

    Ok(match policy {
        SoftErrorRange::AsRequested => SequenceWindow {
            requested: range,
            actual: Some(range),
            sequence: String::new(),
            error: Some(msg),
        },
        SoftErrorRange::ShrinkToReturned => SequenceWindow {
            requested: range,
            actual: range.truncate(returned.len() as u64),
            sequence: returned,
            error: Some(msg),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockCall, MockSources};
    use proptest::prelude::*;
    use rstest::rstest;

    const MAX: u64 = 10_000;

    fn brca1() -> GeneBounds {
        GeneBounds::from_endpoints(43044295, 43125483)
    }

    #[rstest]
    #[case("abc", "100")]
    #[case("100", "")]
    #[case("1.5", "20")]
    #[case("-5", "20")]
    #[case("99999999999999999999999", "1")]
    fn test_unparseable(#[case] start: &str, #[case] end: &str) {
        let err = validate_range(start, end, None, MAX).unwrap_err();
        assert_eq!(err.code().as_str(), "E1002");
    }

    #[test]
    fn test_start_not_before_end() {
        let err = validate_range("100", "50", None, MAX).unwrap_err();
        assert_eq!(err, LocusError::StartNotBeforeEnd { start: 100, end: 50 });
        let err = validate_range("100", "100", None, MAX).unwrap_err();
        assert!(matches!(err, LocusError::StartNotBeforeEnd { .. }));
    }

    #[test]
    fn test_zero_start() {
        let err = validate_range("0", "50", None, MAX).unwrap_err();
        assert!(matches!(err, LocusError::InvalidRange { .. }));
    }

    #[rstest]
    #[case("0", "50", 0)]
    #[case("-5", "50", -5)]
    fn test_non_positive_start_below_known_bound(
        #[case] start: &str,
        #[case] end: &str,
        #[case] expected: i64,
    ) {
        let bounds = GeneBounds::from_endpoints(100, 5000);
        let err = validate_range(start, end, Some(bounds), MAX).unwrap_err();
        assert_eq!(
            err,
            LocusError::BelowMinimum {
                start: expected,
                min: 100
            }
        );
        assert_eq!(err.code().as_str(), "E1004");
    }

    #[test]
    fn test_bound_errors_carry_values() {
        let err = validate_range("43044000", "43045000", Some(brca1()), MAX).unwrap_err();
        assert_eq!(
            err,
            LocusError::BelowMinimum {
                start: 43044000,
                min: 43044295
            }
        );
        assert!(err.to_string().contains("43,044,000"));
        assert!(err.to_string().contains("43,044,295"));

        let err = validate_range("43125000", "43126000", Some(brca1()), MAX).unwrap_err();
        assert_eq!(
            err,
            LocusError::AboveMaximum {
                end: 43126000,
                max: 43125483
            }
        );
    }

    #[test]
    fn test_too_large_overrides_bounds() {
        // Both below the minimum and oversized
        let err = validate_range("1", "20000", Some(brca1()), MAX).unwrap_err();
        assert!(matches!(err, LocusError::RangeTooLarge { span: 19999, .. }));
    }

    #[test]
    fn test_exact_max_span_allowed() {
        let range = validate_range("43044295", "43054295", Some(brca1()), MAX).unwrap();
        assert_eq!(range.end - range.start, MAX);
    }

    #[test]
    fn test_whitespace_trimmed() {
        let range = validate_range(" 100 ", "200\n", None, MAX).unwrap();
        assert_eq!(range, GenomicRange::new(100, 200).unwrap());
    }

    #[tokio::test]
    async fn test_fetch_uppercases_and_converts() {
        let mock = MockSources::with_test_data();
        let range = GenomicRange::new(1, 6).unwrap();
        let window = fetch_window(&mock, "hg38", "17", range, SoftErrorRange::AsRequested)
            .await
            .unwrap();
        assert_eq!(window.sequence, "ACGTAC");
        assert_eq!(window.actual, Some(range));
        assert_eq!(window.base_at(3), Some('G'));
        assert_eq!(window.base_at(7), None);

        let requests = mock.sequence_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, "chr17");
        assert_eq!((requests[0].2.start, requests[0].2.end), (0, 6));
    }

    #[tokio::test]
    async fn test_soft_error_as_requested() {
        let mock = MockSources::with_test_data();
        mock.set_sequence_error("Region not covered", Some(3));
        let range = GenomicRange::new(11, 20).unwrap();
        let window = fetch_window(&mock, "hg38", "chr17", range, SoftErrorRange::AsRequested)
            .await
            .unwrap();
        assert_eq!(window.sequence, "");
        assert_eq!(window.actual, Some(range));
        assert_eq!(window.error.as_deref(), Some("Region not covered"));
    }

    #[tokio::test]
    async fn test_soft_error_shrink_to_returned() {
        let mock = MockSources::with_test_data();
        mock.set_sequence_error("Region not covered", Some(3));
        let range = GenomicRange::new(11, 20).unwrap();
        let window = fetch_window(&mock, "hg38", "chr17", range, SoftErrorRange::ShrinkToReturned)
            .await
            .unwrap();
        assert_eq!(window.sequence.len(), 3);
        assert_eq!(window.actual, GenomicRange::new(11, 13));

        mock.set_sequence_error("Region not covered", None);
        let window = fetch_window(&mock, "hg38", "chr17", range, SoftErrorRange::ShrinkToReturned)
            .await
            .unwrap();
        assert_eq!(window.actual, None);
        assert_eq!(window.base_at(11), None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let mock = MockSources::with_test_data();
        mock.fail(MockCall::FetchSequence, "connection reset");
        let range = GenomicRange::new(1, 10).unwrap();
        let err = fetch_window(&mock, "hg38", "chr17", range, SoftErrorRange::AsRequested)
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }

    proptest! {
        #[test]
        fn prop_oversized_always_too_large(
            start in 0u64..1_000_000_000,
            extra in 1u64..1_000_000,
            min in 1u64..1_000_000_000,
            span in 0u64..1_000_000,
            with_bounds in any::<bool>(),
        ) {
            let end = start + MAX + extra;
            let bounds = with_bounds.then(|| GeneBounds::from_endpoints(min, min + span));
            let err = validate_range(&start.to_string(), &end.to_string(), bounds, MAX).unwrap_err();
            let is_too_large = matches!(err, LocusError::RangeTooLarge { .. });
            prop_assert!(is_too_large);
        }

        #[test]
        fn prop_valid_ranges_respect_bounds(
            min in 1u64..1_000_000,
            span in 1u64..50_000,
            a in 0u64..60_000,
            b in 0u64..60_000,
        ) {
            let bounds = GeneBounds::from_endpoints(min, min + span);
            let (s, e) = (min + a.min(b), min + a.max(b));
            if let Ok(range) = validate_range(&s.to_string(), &e.to_string(), Some(bounds), MAX) {
                prop_assert!(range.start >= bounds.min());
                prop_assert!(range.end <= bounds.max());
                prop_assert!(range.end - range.start <= MAX);
                prop_assert!(range.start < range.end);
            }
        }
    }
}
