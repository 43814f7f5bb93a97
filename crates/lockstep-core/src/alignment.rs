//! Alignment computation
//!
//! Merges the diff hunk list with per-side line-height override events
//! (wrapped visual lines, foreign spacers) into an ordered list of bands
//! that covers both documents end to end. Each band pairs an original line
//! range with a modified line range and carries the pixel height each side
//! needs; downstream the band deltas become spacers and the band table
//! drives scroll translation.
//!
//! The band list is rebuilt from scratch on every pass and never mutated.

use serde::{Deserialize, Serialize};

use crate::doc::DocumentMetrics;
use crate::range::{LineRange, LineRangeMapping};

/// Extra pixel height on one line that the diff does not explain: wrapped
/// visual lines, or a spacer some other feature already installed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineHeightOverride {
    pub line_number: u32,
    pub height_in_px: f64,
}

impl LineHeightOverride {
    pub fn new(line_number: u32, height_in_px: f64) -> Self {
        Self {
            line_number,
            height_in_px,
        }
    }
}

/// One band: a corresponding original/modified line-range pair plus each
/// side's required pixel height. `diff` is attached to the band that closes
/// a hunk so the reconciler can pick block rendering or revert affordances.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub original_range: LineRange,
    pub modified_range: LineRange,
    pub original_height_in_px: f64,
    pub modified_height_in_px: f64,
    pub diff: Option<LineRangeMapping>,
}

impl Alignment {
    /// Height the modified side needs beyond the original side
    pub fn height_delta(&self) -> f64 {
        self.modified_height_in_px - self.original_height_in_px
    }
}

/// One side's live geometry: the document the pane currently shows, the
/// pending override queue (ascending by line), and the base line height.
#[derive(Clone, Copy)]
pub struct PaneGeometry<'a> {
    pub doc: &'a dyn DocumentMetrics,
    pub overrides: &'a [LineHeightOverride],
    pub line_height: f64,
}

/// Output of one pass. `stale` marks a partial list: the diff referenced a
/// line beyond the live document (an edit raced ahead of the diff), the
/// pass stopped early, and the next diff update will heal it.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentOutcome {
    pub alignments: Vec<Alignment>,
    pub stale: bool,
}

/// Compute the band list for one hunk list against two live documents.
///
/// Hunks must be ascending and non-overlapping on both sides. Overrides
/// must be ascending per side; each override is consumed by exactly one
/// band. When `consider_inner` is set, hunks carrying inner changes are
/// split so that untouched prefixes and suffixes align 1:1.
pub fn compute_alignments(
    hunks: &[LineRangeMapping],
    original: PaneGeometry<'_>,
    modified: PaneGeometry<'_>,
    consider_inner: bool,
) -> AlignmentOutcome {
    let mut b = Builder {
        original,
        modified,
        orig_pos: 0,
        mod_pos: 0,
        last_orig: 1,
        last_mod: 1,
        out: Vec::new(),
        stale: false,
    };

    for hunk in hunks {
        if !b.drain_overrides(hunk.original_range.start, hunk.modified_range.start) {
            return b.finish();
        }
        // Equal gap between the cursor and the hunk; delta is zero but the
        // band keeps the table gap-free for scroll translation.
        if !b.emit(hunk.original_range.start, hunk.modified_range.start, false, None) {
            return b.finish();
        }

        if consider_inner {
            if let Some(inner) = &hunk.inner_changes {
                for change in inner {
                    if change.original.start.column > 1 && change.modified.start.column > 1 {
                        if !b.emit(change.original.start.line, change.modified.start.line, false, None)
                        {
                            return b.finish();
                        }
                    }
                    let orig_last = b.original.doc.last_column(change.original.end.line);
                    let mod_last = b.modified.doc.last_column(change.modified.end.line);
                    if change.original.end.column < orig_last && change.modified.end.column < mod_last
                    {
                        if !b.emit(change.original.end.line, change.modified.end.line, false, None) {
                            return b.finish();
                        }
                    }
                }
            }
        }

        // The band closing the hunk is always emitted, even when inner
        // splits already advanced past where it would normally be skipped.
        if !b.emit(
            hunk.original_range.end_exclusive,
            hunk.modified_range.end_exclusive,
            true,
            Some(hunk.clone()),
        ) {
            return b.finish();
        }
    }

    if !b.drain_overrides(u32::MAX, u32::MAX) {
        return b.finish();
    }

    // Close the table at the document ends.
    let orig_end = original.doc.line_count() + 1;
    let mod_end = modified.doc.line_count() + 1;
    b.emit(orig_end, mod_end, true, None);

    b.finish()
}

struct Builder<'a> {
    original: PaneGeometry<'a>,
    modified: PaneGeometry<'a>,
    orig_pos: usize,
    mod_pos: usize,
    last_orig: u32,
    last_mod: u32,
    out: Vec<Alignment>,
    stale: bool,
}

impl Builder<'_> {
    fn finish(self) -> AlignmentOutcome {
        if self.stale {
            log::debug!(
                "alignment pass aborted on stale diff after {} bands",
                self.out.len()
            );
        }
        AlignmentOutcome {
            alignments: self.out,
            stale: self.stale,
        }
    }

    fn peek_orig(&self, bound: u32) -> Option<LineHeightOverride> {
        self.original
            .overrides
            .get(self.orig_pos)
            .copied()
            .filter(|o| o.line_number < bound)
    }

    fn peek_mod(&self, bound: u32) -> Option<LineHeightOverride> {
        self.modified
            .overrides
            .get(self.mod_pos)
            .copied()
            .filter(|o| o.line_number < bound)
    }

    /// Merge override events strictly before the given per-side bounds into
    /// paired 1-line-terminated bands. The closer event (measured from the
    /// cursor in its own coordinate space) goes first; equidistant events on
    /// both sides are consumed together; the side without an event gets a
    /// zero-height counterpart at the projected position.
    fn drain_overrides(&mut self, orig_bound: u32, mod_bound: u32) -> bool {
        loop {
            let next_orig = self.peek_orig(orig_bound);
            let next_mod = self.peek_mod(mod_bound);
            if next_orig.is_none() && next_mod.is_none() {
                return true;
            }

            // An event behind the cursor is an ordering anomaly (its line
            // was already covered by an earlier band); drop it.
            if let Some(o) = next_orig {
                if o.line_number < self.last_orig {
                    self.orig_pos += 1;
                    continue;
                }
            }
            if let Some(m) = next_mod {
                if m.line_number < self.last_mod {
                    self.mod_pos += 1;
                    continue;
                }
            }

            let dist_orig = next_orig.map(|o| o.line_number - self.last_orig);
            let dist_mod = next_mod.map(|m| m.line_number - self.last_mod);

            let (end_orig, end_mod) = match (dist_orig, dist_mod) {
                (Some(d_o), Some(d_m)) if d_o < d_m => {
                    (self.last_orig + d_o + 1, self.last_mod + d_o + 1)
                }
                (Some(d_o), Some(d_m)) if d_o > d_m => {
                    (self.last_orig + d_m + 1, self.last_mod + d_m + 1)
                }
                (Some(d), Some(_)) => (self.last_orig + d + 1, self.last_mod + d + 1),
                (Some(d), None) => (self.last_orig + d + 1, self.last_mod + d + 1),
                (None, Some(d)) => (self.last_orig + d + 1, self.last_mod + d + 1),
                (None, None) => unreachable!(),
            };

            if !self.emit(end_orig, end_mod, false, None) {
                return false;
            }
        }
    }

    /// Emit the band `[cursor, end)` on both sides. Returns false when the
    /// pass must stop (stale diff). Without `force`, a band whose end does
    /// not make strict progress on both sides is skipped; with `force`,
    /// only degenerate (backwards) bands are dropped.
    fn emit(
        &mut self,
        end_orig: u32,
        end_mod: u32,
        force: bool,
        diff: Option<LineRangeMapping>,
    ) -> bool {
        if !force && (end_orig <= self.last_orig || end_mod <= self.last_mod) {
            return true;
        }
        if end_orig < self.last_orig || end_mod < self.last_mod {
            // Ordering anomaly; drop rather than emit a negative range.
            return true;
        }

        let original_range = LineRange::new(self.last_orig, end_orig);
        let modified_range = LineRange::new(self.last_mod, end_mod);
        if original_range.is_empty() && modified_range.is_empty() {
            return true;
        }

        if exceeds_document(&original_range, self.original.doc.line_count())
            || exceeds_document(&modified_range, self.modified.doc.line_count())
        {
            self.stale = true;
            return false;
        }

        let original_height = original_range.len() as f64 * self.original.line_height
            + take_within(self.original.overrides, &mut self.orig_pos, &original_range);
        let modified_height = modified_range.len() as f64 * self.modified.line_height
            + take_within(self.modified.overrides, &mut self.mod_pos, &modified_range);

        self.out.push(Alignment {
            original_range,
            modified_range,
            original_height_in_px: original_height,
            modified_height_in_px: modified_height,
            diff,
        });
        self.last_orig = end_orig;
        self.last_mod = end_mod;
        true
    }
}

/// Consume every queued override whose line falls before the band end and
/// sum the heights of those inside the band. Events before the band start
/// were already handled (or are anomalies) and contribute nothing.
fn take_within(overrides: &[LineHeightOverride], pos: &mut usize, range: &LineRange) -> f64 {
    let mut sum = 0.0;
    while let Some(o) = overrides.get(*pos) {
        if o.line_number >= range.end_exclusive {
            break;
        }
        if o.line_number >= range.start {
            sum += o.height_in_px;
        }
        *pos += 1;
    }
    sum
}

/// True when the range requires a line the live document no longer has.
/// Empty ranges are anchors and may sit one past the last line.
fn exceeds_document(range: &LineRange, line_count: u32) -> bool {
    if range.is_empty() {
        range.start > line_count + 1
    } else {
        range.end_exclusive - 1 > line_count
    }
}
