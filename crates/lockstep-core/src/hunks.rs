//! Hunk source adapter
//!
//! The layout engine consumes hunks as an opaque ordered list; this module
//! is the default producer of that list for hosts that hand us two text
//! buffers instead of a precomputed diff. Line hunks come from imara-diff;
//! sub-line inner changes are derived by common prefix/suffix trimming for
//! hunks that pair lines 1:1. Anything smarter (a real character diff)
//! belongs to the external diff provider, not to this crate.

use imara_diff::{Algorithm, Diff, InternedInput};

use crate::range::{LineRange, LineRangeMapping, RangeMapping, TextPosition, TextRange};

/// Compute the ordered, non-overlapping hunk list for two text buffers.
pub fn compute_line_hunks(old: &str, new: &str) -> Vec<LineRangeMapping> {
    let input = InternedInput::new(old, new);
    let mut diff = Diff::compute(Algorithm::Histogram, &input);
    diff.postprocess_lines(&input);

    diff.hunks()
        .map(|h| {
            // imara ranges are 0-based half-open; the engine speaks 1-based.
            LineRangeMapping::new(
                LineRange::new(h.before.start + 1, h.before.end + 1),
                LineRange::new(h.after.start + 1, h.after.end + 1),
            )
        })
        .collect()
}

/// Like [`compute_line_hunks`], with inner changes attached where a hunk
/// pairs lines 1:1.
pub fn compute_hunks_with_inner(old: &str, new: &str) -> Vec<LineRangeMapping> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    compute_line_hunks(old, new)
        .into_iter()
        .map(|hunk| match refine_hunk(&hunk, &old_lines, &new_lines) {
            Some(inner) => hunk.with_inner_changes(inner),
            None => hunk,
        })
        .collect()
}

/// Pair lines positionally and trim the common prefix/suffix of each pair.
/// Returns `None` when the hunk does not pair 1:1 or no line differs.
fn refine_hunk(
    hunk: &LineRangeMapping,
    old_lines: &[&str],
    new_lines: &[&str],
) -> Option<Vec<RangeMapping>> {
    if hunk.original_range.is_empty()
        || hunk.original_range.len() != hunk.modified_range.len()
    {
        return None;
    }

    let mut inner = Vec::new();
    for (orig_line, mod_line) in hunk.original_range.lines().zip(hunk.modified_range.lines()) {
        let a = *old_lines.get(orig_line as usize - 1)?;
        let b = *new_lines.get(mod_line as usize - 1)?;
        if a == b {
            continue;
        }
        let (prefix, a_end, b_end) = trim_common(a, b);
        inner.push(RangeMapping {
            original: TextRange::new(
                TextPosition::new(orig_line, prefix + 1),
                TextPosition::new(orig_line, a_end + 1),
            ),
            modified: TextRange::new(
                TextPosition::new(mod_line, prefix + 1),
                TextPosition::new(mod_line, b_end + 1),
            ),
        });
    }

    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// Common prefix length plus per-side end offsets (in chars) after
/// trimming the common suffix. The suffix never eats into the prefix.
fn trim_common(a: &str, b: &str) -> (u32, u32, u32) {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let mut prefix = 0;
    while prefix < a_chars.len()
        && prefix < b_chars.len()
        && a_chars[prefix] == b_chars[prefix]
    {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < a_chars.len() - prefix
        && suffix < b_chars.len() - prefix
        && a_chars[a_chars.len() - 1 - suffix] == b_chars[b_chars.len() - 1 - suffix]
    {
        suffix += 1;
    }

    (
        prefix as u32,
        (a_chars.len() - suffix) as u32,
        (b_chars.len() - suffix) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_replacement() {
        let hunks = compute_line_hunks("a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].original_range, LineRange::new(2, 3));
        assert_eq!(hunks[0].modified_range, LineRange::new(2, 3));
    }

    #[test]
    fn test_pure_insertion_has_empty_original_side() {
        let hunks = compute_line_hunks("a\nd\n", "a\nb\nc\nd\n");
        assert_eq!(hunks.len(), 1);
        assert!(hunks[0].original_range.is_empty());
        assert_eq!(hunks[0].modified_range.len(), 2);
        assert!(hunks[0].is_pure_insertion());
    }

    #[test]
    fn test_hunks_are_ascending_and_non_overlapping() {
        let old = "a\nb\nc\nd\ne\nf\ng\nh\n";
        let new = "a\nB\nc\nd\nE\nE2\nf\ng\nH\n";
        let hunks = compute_line_hunks(old, new);
        assert!(hunks.len() >= 2, "fixture should produce several hunks");
        for pair in hunks.windows(2) {
            assert!(
                pair[0].original_range.end_exclusive <= pair[1].original_range.start,
                "original ranges must not overlap"
            );
            assert!(
                pair[0].modified_range.end_exclusive <= pair[1].modified_range.start,
                "modified ranges must not overlap"
            );
        }
    }

    #[test]
    fn test_inner_change_trims_common_prefix_and_suffix() {
        let hunks = compute_hunks_with_inner("let foo = 4;\n", "let bar = 4;\n");
        assert_eq!(hunks.len(), 1);
        let inner = hunks[0].inner_changes.as_ref().expect("inner changes");
        assert_eq!(inner.len(), 1);
        // "let " is common, " = 4;" is common; the change covers foo/bar.
        assert_eq!(inner[0].original.start, TextPosition::new(1, 5));
        assert_eq!(inner[0].original.end, TextPosition::new(1, 8));
        assert_eq!(inner[0].modified.start, TextPosition::new(1, 5));
        assert_eq!(inner[0].modified.end, TextPosition::new(1, 8));
        assert!(inner[0].original.is_single_line());
    }

    #[test]
    fn test_no_inner_changes_for_uneven_hunks() {
        let hunks = compute_hunks_with_inner("a\nx\nb\n", "a\nx1\nx2\nb\n");
        assert!(
            hunks.iter().all(|h| h.inner_changes.is_none()),
            "1:2 pairing must not fabricate inner changes"
        );
    }

    #[test]
    fn test_trim_common_never_overlaps() {
        // "aa" vs "aaa": prefix 2, suffix must not reach into the prefix
        let (prefix, a_end, b_end) = trim_common("aa", "aaa");
        assert_eq!(prefix, 2);
        assert_eq!(a_end, 2);
        assert_eq!(b_end, 3);
    }
}
