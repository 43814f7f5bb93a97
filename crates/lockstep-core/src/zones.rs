//! View zone reconciliation
//!
//! Turns the band list into the two ordered spacer lists the host installs,
//! one per pane. A band whose modified side is taller pushes a spacer into
//! the original pane (and the other way around); a hunk that cannot be
//! overlaid character-by-character in single-pane mode becomes a rich
//! deleted-code block instead. Zones are rebuilt per pass; the host diffs
//! them against the installed set.

use crate::alignment::Alignment;
use crate::doc::WrapQuery;
use crate::range::{LineRange, LineRangeMapping};

/// How the two documents are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Both panes visible, aligned side by side
    #[default]
    SideBySide,
    /// Single modified pane; original content appears as overlays/blocks
    Inline,
}

/// What a zone is for. The host picks the widget; the engine only reserves
/// the vertical space and says what belongs inside it.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneKind {
    /// Plain vertical filler keeping the panes level
    Spacer,
    /// Original lines rendered as a block inside the modified pane
    DeletedCode { original_range: LineRange },
    /// Zero-height anchor spanning a hunk for gutter affordances
    GutterMarker { original_range: LineRange },
    /// Compensation for wrap-induced extra visual lines under a block
    WrapFiller,
    /// Folded unchanged span; carries what is hidden on each side
    CollapsedRegion {
        hidden_original: LineRange,
        hidden_modified: LineRange,
    },
    /// Document-top padding; emitted only by the scroll synchronizer
    TopPadding,
}

/// Interactive affordance attached to a zone
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneAction {
    RevertHunk { hunk: LineRangeMapping },
}

/// A reserved vertical block in one pane, not backed by real content
#[derive(Debug, Clone, PartialEq)]
pub struct ViewZone {
    /// 1-based line the zone sits below; 0 places it above the document
    pub after_line_number: u32,
    pub height_in_px: f64,
    pub kind: ZoneKind,
    pub min_width_in_px: f64,
    pub show_in_hidden_areas: bool,
    pub suppress_mouse_down: bool,
    pub action: Option<ZoneAction>,
}

impl ViewZone {
    pub fn spacer(after_line_number: u32, height_in_px: f64) -> Self {
        Self {
            after_line_number,
            height_in_px,
            kind: ZoneKind::Spacer,
            min_width_in_px: 0.0,
            show_in_hidden_areas: false,
            suppress_mouse_down: true,
            action: None,
        }
    }
}

/// The two per-pane zone lists produced by one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaneZones {
    pub original: Vec<ViewZone>,
    pub modified: Vec<ViewZone>,
}

/// The moved block currently being compared, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovedBlockPair {
    pub original_range: LineRange,
    pub modified_range: LineRange,
}

impl MovedBlockPair {
    fn covers(&self, alignment: &Alignment) -> bool {
        self.original_range.contains_range(&alignment.original_range)
            && self.modified_range.contains_range(&alignment.modified_range)
    }

    fn touches(&self, alignment: &Alignment) -> bool {
        self.original_range.intersects(&alignment.original_range)
            || self.modified_range.intersects(&alignment.modified_range)
    }
}

/// Inputs for one reconciliation pass
pub struct ZoneInput<'a> {
    pub alignments: &'a [Alignment],
    /// Bands restricted to the compared moved block; empty when inactive
    pub moved_alignments: &'a [Alignment],
    pub active_move: Option<MovedBlockPair>,
    pub mode: RenderMode,
    /// Wrap expansion of the original pane's own rendering
    pub original_wrap: &'a dyn WrapQuery,
    /// Visual lines each original line occupies when rendered as a block
    /// inside the modified pane
    pub block_wrap: &'a dyn WrapQuery,
    pub original_line_height: f64,
    pub modified_line_height: f64,
    /// Width the deleted-code overlay asked for on the previous pass
    pub block_min_width_in_px: f64,
    /// Whether the per-line gutter menu already offers a revert for a hunk
    pub gutter_has_revert: &'a dyn Fn(&LineRangeMapping) -> bool,
}

/// Build both panes' zone lists from the band table.
pub fn reconcile_zones(input: &ZoneInput<'_>) -> PaneZones {
    let mut zones = PaneZones::default();

    // Hunks rendered as blocks swallow every band inside their extent; the
    // block itself carries the whole height.
    let block_extents: Vec<(LineRange, LineRange)> = match input.mode {
        RenderMode::Inline => input
            .alignments
            .iter()
            .filter_map(|a| a.diff.as_ref())
            .filter(|d| !d.allows_true_inline())
            .map(|d| (d.original_range, d.modified_range))
            .collect(),
        RenderMode::SideBySide => Vec::new(),
    };

    let inside_block = |a: &Alignment| {
        block_extents.iter().any(|(orig, modi)| {
            orig.contains_range(&a.original_range) && modi.contains_range(&a.modified_range)
        })
    };

    for alignment in input.alignments {
        if let Some(diff) = &alignment.diff {
            if input.mode == RenderMode::Inline && !diff.allows_true_inline() {
                emit_block_zones(input, diff, &mut zones);
                continue;
            }
        }
        if inside_block(alignment) {
            continue;
        }
        if let Some(active) = input.active_move {
            // The moved-block pass owns spacers for these lines.
            if active.covers(alignment) {
                continue;
            }
        }
        emit_delta_spacer(input, alignment, &mut zones);
    }

    if let Some(active) = input.active_move {
        for alignment in input.moved_alignments {
            if active.touches(alignment) {
                emit_delta_spacer_plain(alignment, &mut zones);
            }
        }
    }

    zones
}

/// The delta rule: whichever side is shorter receives a spacer after the
/// band's end, sized to the difference.
fn emit_delta_spacer(input: &ZoneInput<'_>, alignment: &Alignment, zones: &mut PaneZones) {
    let delta = alignment.height_delta();
    if delta > 0.0 {
        zones.original.push(ViewZone::spacer(
            alignment.original_range.end_exclusive - 1,
            delta,
        ));
    } else if delta < 0.0 {
        let mut zone = ViewZone::spacer(alignment.modified_range.end_exclusive - 1, -delta);
        if let Some(diff) = &alignment.diff {
            if diff.is_pure_deletion() && !(input.gutter_has_revert)(diff) {
                zone.action = Some(ZoneAction::RevertHunk { hunk: diff.clone() });
                zone.suppress_mouse_down = false;
            }
        }
        zones.modified.push(zone);
    }
}

/// Same rule without affordances, for the moved-block pass.
fn emit_delta_spacer_plain(alignment: &Alignment, zones: &mut PaneZones) {
    let delta = alignment.height_delta();
    if delta > 0.0 {
        zones.original.push(ViewZone::spacer(
            alignment.original_range.end_exclusive - 1,
            delta,
        ));
    } else if delta < 0.0 {
        zones
            .modified
            .push(ViewZone::spacer(alignment.modified_range.end_exclusive - 1, -delta));
    }
}

/// Single-pane rendering of a hunk that cannot be overlaid inline: the
/// original lines become a block in the modified pane, the original pane
/// gets wrap compensation fillers plus a gutter anchor.
fn emit_block_zones(input: &ZoneInput<'_>, diff: &LineRangeMapping, zones: &mut PaneZones) {
    let block_height: f64 = diff
        .original_range
        .lines()
        .map(|l| input.block_wrap.visual_lines(l) as f64)
        .sum::<f64>()
        * input.modified_line_height;

    zones.modified.push(ViewZone {
        after_line_number: diff.modified_range.start.saturating_sub(1),
        height_in_px: block_height,
        kind: ZoneKind::DeletedCode {
            original_range: diff.original_range,
        },
        min_width_in_px: input.block_min_width_in_px,
        show_in_hidden_areas: false,
        suppress_mouse_down: false,
        action: None,
    });

    for line in diff.original_range.lines() {
        let extra = input
            .block_wrap
            .visual_lines(line)
            .saturating_sub(input.original_wrap.visual_lines(line));
        if extra > 0 {
            let mut filler =
                ViewZone::spacer(line, extra as f64 * input.original_line_height);
            filler.kind = ZoneKind::WrapFiller;
            zones.original.push(filler);
        }
    }

    zones.original.push(ViewZone {
        after_line_number: diff.original_range.start.saturating_sub(1),
        height_in_px: 0.0,
        kind: ZoneKind::GutterMarker {
            original_range: diff.original_range,
        },
        min_width_in_px: 0.0,
        show_in_hidden_areas: false,
        suppress_mouse_down: false,
        action: None,
    });
}
