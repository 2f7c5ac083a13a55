//! Sequence rendering for CLI output

use crate::coords::thousands;
use crate::window::SequenceWindow;

/// Wrap a window's sequence into lines prefixed with the 1-based position
/// of their first base.
///
/// Positions follow the range the sequence actually covers; a window with
/// no sequence renders no lines.
///
/// # Examples
///
/// ```
/// use ferro_locus::cli::wrap_sequence;
/// use ferro_locus::coords::GenomicRange;
/// use ferro_locus::window::SequenceWindow;
///
/// let range = GenomicRange::new(1001, 1010).unwrap();
/// let window = SequenceWindow {
///     requested: range,
///     actual: Some(range),
///     sequence: "ACGTACGTAC".to_string(),
///     error: None,
/// };
/// let lines = wrap_sequence(&window, 4);
/// assert_eq!(lines.len(), 3);
/// assert!(lines[1].trim_start().starts_with("1,005"));
/// assert!(lines[2].ends_with("AC"));
/// ```
pub fn wrap_sequence(window: &SequenceWindow, width: usize) -> Vec<String> {
    let Some(actual) = window.actual else {
        return Vec::new();
    };
    let width = width.max(1);
    let gutter = thousands(actual.end).len();
    window
        .sequence
        .as_bytes()
        .chunks(width)
        .enumerate()
        .map(|(i, chunk)| {
            let position = actual.start + (i * width) as u64;
            format!(
                "{:>gutter$}  {}",
                thousands(position),
                String::from_utf8_lossy(chunk),
                gutter = gutter
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::GenomicRange;

    fn window(start: u64, sequence: &str) -> SequenceWindow {
        let range = GenomicRange::new(start, start + sequence.len() as u64 - 1).unwrap();
        SequenceWindow {
            requested: range,
            actual: Some(range),
            sequence: sequence.to_string(),
            error: None,
        }
    }

    #[test]
    fn test_wrap_exact_multiple() {
        let lines = wrap_sequence(&window(1, "ACGTACGT"), 4);
        assert_eq!(lines, vec!["1  ACGT", "5  ACGT"]);
    }

    #[test]
    fn test_wrap_aligns_gutter() {
        let lines = wrap_sequence(&window(995, "ACGTACGTACGT"), 6);
        assert_eq!(lines[0], "  995  ACGTAC");
        assert_eq!(lines[1], "1,001  GTACGT");
    }

    #[test]
    fn test_wrap_empty_window() {
        let range = GenomicRange::new(10, 20).unwrap();
        let empty = SequenceWindow {
            requested: range,
            actual: None,
            sequence: String::new(),
            error: Some("Region not covered".to_string()),
        };
        assert!(wrap_sequence(&empty, 60).is_empty());
    }

    #[test]
    fn test_zero_width_treated_as_one() {
        assert_eq!(wrap_sequence(&window(1, "AC"), 0).len(), 2);
    }
}
