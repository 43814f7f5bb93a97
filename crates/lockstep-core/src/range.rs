//! Line ranges and hunk mappings

use serde::{Deserialize, Serialize};

/// Half-open range of 1-based line numbers: `[start, end_exclusive)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end_exclusive: u32,
}

impl LineRange {
    /// Create a range; `start` must not exceed `end_exclusive`
    pub fn new(start: u32, end_exclusive: u32) -> Self {
        debug_assert!(start <= end_exclusive, "inverted line range");
        Self {
            start,
            end_exclusive,
        }
    }

    /// Range of `len` lines starting at `start`
    pub fn of_length(start: u32, len: u32) -> Self {
        Self {
            start,
            end_exclusive: start + len,
        }
    }

    /// Empty range anchored at `line`
    pub fn empty_at(line: u32) -> Self {
        Self {
            start: line,
            end_exclusive: line,
        }
    }

    pub fn len(&self) -> u32 {
        self.end_exclusive - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end_exclusive
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line < self.end_exclusive
    }

    /// True if `other` lies fully inside this range (empty ranges count
    /// when anchored inside)
    pub fn contains_range(&self, other: &LineRange) -> bool {
        self.start <= other.start && other.end_exclusive <= self.end_exclusive
    }

    pub fn intersects(&self, other: &LineRange) -> bool {
        self.start < other.end_exclusive && other.start < self.end_exclusive
    }

    /// Iterate the line numbers in the range
    pub fn lines(&self) -> impl Iterator<Item = u32> {
        self.start..self.end_exclusive
    }

    /// Last line contained in the range, if any
    pub fn last_line(&self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.end_exclusive - 1)
        }
    }
}

/// 1-based line/column position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextPosition {
    pub line: u32,
    pub column: u32,
}

impl TextPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Range between two text positions (end exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextRange {
    pub fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }

    /// True if the range starts and ends on the same line
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }
}

/// Sub-line pairing inside a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeMapping {
    pub original: TextRange,
    pub modified: TextRange,
}

/// One diff-reported change: an original line range paired with a modified
/// line range, optionally refined by sub-line inner changes.
///
/// Hunk lists are expected in ascending, non-overlapping order on both
/// sides; the alignment computer relies on this but fails soft if the list
/// is stale relative to the live document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRangeMapping {
    pub original_range: LineRange,
    pub modified_range: LineRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_changes: Option<Vec<RangeMapping>>,
}

impl LineRangeMapping {
    pub fn new(original_range: LineRange, modified_range: LineRange) -> Self {
        Self {
            original_range,
            modified_range,
            inner_changes: None,
        }
    }

    pub fn with_inner_changes(mut self, inner: Vec<RangeMapping>) -> Self {
        self.inner_changes = Some(inner);
        self
    }

    /// Lines only added on the modified side
    pub fn is_pure_insertion(&self) -> bool {
        self.original_range.is_empty() && !self.modified_range.is_empty()
    }

    /// Lines only removed from the original side
    pub fn is_pure_deletion(&self) -> bool {
        self.modified_range.is_empty() && !self.original_range.is_empty()
    }

    /// Whether this hunk can be rendered as a character-level overlay
    /// instead of a block substitution: every inner change stays on a
    /// single line on both sides, or the hunk is a pure insertion at the
    /// very top of the document.
    pub fn allows_true_inline(&self) -> bool {
        if self.is_pure_insertion() && self.modified_range.start == 1 {
            return true;
        }
        match &self.inner_changes {
            Some(inner) => inner
                .iter()
                .all(|c| c.original.is_single_line() && c.modified.is_single_line()),
            None => false,
        }
    }
}
