//! Unchanged region folding
//!
//! Equal spans between hunks can be folded away. Each region tracks how
//! many of its lines the user has revealed from the top and bottom; a
//! region is fully folded when both counts are 0 and fully shown when the
//! counts cover it. Folding state is user-owned and survives diff
//! refreshes via snapshots as long as the region's ranges are unchanged.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::range::{LineRange, LineRangeMapping};
use crate::zones::{PaneZones, ViewZone, ZoneKind};

/// Folding parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldOptions {
    /// Lines kept visible next to each hunk
    pub context_line_count: u32,
    /// Equal spans shorter than this stay shown
    pub minimum_hidden_line_count: u32,
    /// Lines one reveal action uncovers
    pub reveal_line_count: u32,
}

impl Default for FoldOptions {
    fn default() -> Self {
        Self {
            context_line_count: 3,
            minimum_hidden_line_count: 3,
            reveal_line_count: 20,
        }
    }
}

/// Fold progress of one region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Hidden,
    PartiallyRevealed,
    Shown,
}

/// Which flank of a region a control operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionEdge {
    Top,
    Bottom,
}

/// The two kinds of interactive affordances on a collapsed region. A drag
/// handle sets an absolute visible count while the pointer moves; a reveal
/// button uncovers a fixed number of lines per press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionControl {
    Drag { edge: RegionEdge, visible: u32 },
    Reveal { edge: RegionEdge, count: u32 },
}

/// A contiguous span identical on both sides, eligible for folding
#[derive(Debug, Clone, PartialEq)]
pub struct UnchangedRegion {
    pub original_range: LineRange,
    pub modified_range: LineRange,
    visible_top: u32,
    visible_bottom: u32,
    is_dragged: bool,
}

impl UnchangedRegion {
    pub fn new(original_range: LineRange, modified_range: LineRange) -> Self {
        debug_assert_eq!(original_range.len(), modified_range.len());
        Self {
            original_range,
            modified_range,
            visible_top: 0,
            visible_bottom: 0,
            is_dragged: false,
        }
    }

    pub fn line_count(&self) -> u32 {
        self.original_range.len()
    }

    pub fn visible_top(&self) -> u32 {
        self.visible_top
    }

    pub fn visible_bottom(&self) -> u32 {
        self.visible_bottom
    }

    pub fn is_dragged(&self) -> bool {
        self.is_dragged
    }

    pub fn hidden_line_count(&self) -> u32 {
        self.line_count() - self.visible_top - self.visible_bottom
    }

    pub fn state(&self) -> RegionState {
        if self.hidden_line_count() == 0 {
            RegionState::Shown
        } else if self.visible_top == 0 && self.visible_bottom == 0 {
            RegionState::Hidden
        } else {
            RegionState::PartiallyRevealed
        }
    }

    /// Set both visible counts, clamped so they never exceed the region
    pub fn set_visible(&mut self, top: u32, bottom: u32) {
        let top = top.min(self.line_count());
        let bottom = bottom.min(self.line_count() - top);
        self.visible_top = top;
        self.visible_bottom = bottom;
    }

    pub fn reveal_all(&mut self) {
        self.visible_top = self.line_count();
        self.visible_bottom = 0;
    }

    /// Dispatch one interactive affordance
    pub fn apply(&mut self, control: RegionControl) {
        match control {
            RegionControl::Drag { edge, visible } => {
                self.is_dragged = true;
                match edge {
                    RegionEdge::Top => self.set_visible(visible, self.visible_bottom),
                    RegionEdge::Bottom => self.set_visible(self.visible_top, visible),
                }
            }
            RegionControl::Reveal { edge, count } => match edge {
                RegionEdge::Top => self.set_visible(self.visible_top + count, self.visible_bottom),
                RegionEdge::Bottom => {
                    self.set_visible(self.visible_top, self.visible_bottom + count)
                }
            },
        }
    }

    pub fn finish_drag(&mut self) {
        self.is_dragged = false;
    }

    /// Still-hidden middle of the region on the original side
    pub fn hidden_original_range(&self) -> LineRange {
        LineRange::new(
            self.original_range.start + self.visible_top,
            self.original_range.end_exclusive - self.visible_bottom,
        )
    }

    /// Still-hidden middle of the region on the modified side
    pub fn hidden_modified_range(&self) -> LineRange {
        LineRange::new(
            self.modified_range.start + self.visible_top,
            self.modified_range.end_exclusive - self.visible_bottom,
        )
    }

    pub fn snapshot(&self) -> RegionSnapshot {
        RegionSnapshot {
            original_range: self.original_range,
            modified_range: self.modified_range,
            visible_top: self.visible_top,
            visible_bottom: self.visible_bottom,
        }
    }
}

/// Serializable fold state, matched back by range after a diff refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub original_range: LineRange,
    pub modified_range: LineRange,
    pub visible_top: u32,
    pub visible_bottom: u32,
}

/// Derive the foldable regions from the hunk list. Every maximal equal
/// span is trimmed by the context margin on each flank that touches a
/// hunk; what remains becomes a region if it is long enough. Regions start
/// fully folded.
pub fn compute_unchanged_regions(
    hunks: &[LineRangeMapping],
    original_line_count: u32,
    modified_line_count: u32,
    options: FoldOptions,
) -> Vec<UnchangedRegion> {
    let mut regions = Vec::new();
    let mut last_orig = 1u32;
    let mut last_mod = 1u32;

    let mut push_gap = |orig_start: u32,
                        orig_end: u32,
                        mod_start: u32,
                        trim_top: bool,
                        trim_bottom: bool| {
        if orig_end <= orig_start {
            return;
        }
        let gap_len = orig_end - orig_start;
        let top_margin = if trim_top { options.context_line_count } else { 0 };
        let bottom_margin = if trim_bottom { options.context_line_count } else { 0 };
        if gap_len <= top_margin + bottom_margin {
            return;
        }
        let len = gap_len - top_margin - bottom_margin;
        if len < options.minimum_hidden_line_count {
            return;
        }
        regions.push(UnchangedRegion::new(
            LineRange::of_length(orig_start + top_margin, len),
            LineRange::of_length(mod_start + top_margin, len),
        ));
    };

    for hunk in hunks {
        push_gap(
            last_orig,
            hunk.original_range.start,
            last_mod,
            last_orig > 1,
            true,
        );
        last_orig = hunk.original_range.end_exclusive;
        last_mod = hunk.modified_range.end_exclusive;
    }
    push_gap(last_orig, original_line_count + 1, last_mod, last_orig > 1, false);

    // A stale diff can make the modified side run past its document; such
    // regions would hide lines that do not exist. Drop them.
    regions.retain(|r| r.modified_range.end_exclusive <= modified_line_count + 1);
    regions
}

/// Carry user fold state over to a freshly derived region set. Counts are
/// restored only when both ranges still match; moved regions reset.
pub fn restore_snapshots(regions: &mut [UnchangedRegion], snapshots: &[RegionSnapshot]) {
    let by_range: FxHashMap<(LineRange, LineRange), (u32, u32)> = snapshots
        .iter()
        .map(|s| {
            (
                (s.original_range, s.modified_range),
                (s.visible_top, s.visible_bottom),
            )
        })
        .collect();
    for region in regions.iter_mut() {
        if let Some(&(top, bottom)) =
            by_range.get(&(region.original_range, region.modified_range))
        {
            region.set_visible(top, bottom);
        }
    }
}

/// What the host must apply for the current fold state: one collapsed
/// widget zone per pane per folded region, plus the hidden line ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionLayout {
    pub zones: PaneZones,
    pub hidden_original: Vec<LineRange>,
    pub hidden_modified: Vec<LineRange>,
}

pub fn region_layout(regions: &[UnchangedRegion], line_height: f64) -> RegionLayout {
    let mut layout = RegionLayout::default();
    for region in regions {
        if region.state() == RegionState::Shown {
            continue;
        }
        let hidden_original = region.hidden_original_range();
        let hidden_modified = region.hidden_modified_range();

        for (zones, after) in [
            (&mut layout.zones.original, hidden_original.start - 1),
            (&mut layout.zones.modified, hidden_modified.start - 1),
        ] {
            zones.push(ViewZone {
                after_line_number: after,
                height_in_px: line_height,
                kind: ZoneKind::CollapsedRegion {
                    hidden_original,
                    hidden_modified,
                },
                min_width_in_px: 0.0,
                show_in_hidden_areas: true,
                suppress_mouse_down: false,
                action: None,
            });
        }

        layout.hidden_original.push(hidden_original);
        layout.hidden_modified.push(hidden_modified);
    }
    layout
}
