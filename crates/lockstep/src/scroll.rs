//! Scroll coupling between the two panes
//!
//! One pane scrolls, the other follows. The follower's target comes from
//! walking the band table: accumulate each side's band heights until the
//! leader's position falls inside a band, then map proportionally within
//! it. The write to the follower echoes back as a scroll event; a two-state
//! machine per write path drops the echo instead of feeding it back in.
//!
//! Comparing a moved block can shift one pane by a document-top padding
//! zone; that padding is owned here and nowhere else.

use std::time::{Duration, Instant};

use lockstep_core::{Alignment, ViewZone, ZoneKind};

use crate::host::Pane;

/// Per-pane scroll bookkeeping. The host owns the authoritative scrollTop;
/// the synchronizer owns the padding and the derived content offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollState {
    pub scroll_top: f64,
    pub top_padding: f64,
    /// Content height above the band the pane is currently scrolled into
    pub scroll_offset: f64,
    /// Offset the last computed write was heading for; equals
    /// `scroll_offset` once the write lands
    pub animated_scroll_offset: f64,
}

/// Guard state for one write path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    ApplyingComputedScroll,
}

/// A write the session must perform on a host pane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollWrite {
    pub pane: Pane,
    pub target: f64,
}

pub struct ScrollSynchronizer {
    original: ScrollState,
    modified: ScrollState,
    phase: SyncPhase,
    applying_to: Option<Pane>,
    settle_deadline: Option<Instant>,
    settle_delay: Duration,
}

impl ScrollSynchronizer {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            original: ScrollState::default(),
            modified: ScrollState::default(),
            phase: SyncPhase::Idle,
            applying_to: None,
            settle_deadline: None,
            settle_delay,
        }
    }

    pub fn state(&self, pane: Pane) -> ScrollState {
        match pane {
            Pane::Original => self.original,
            Pane::Modified => self.modified,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn set_settle_delay(&mut self, delay: Duration) {
        self.settle_delay = delay;
    }

    fn state_mut(&mut self, pane: Pane) -> &mut ScrollState {
        match pane {
            Pane::Original => &mut self.original,
            Pane::Modified => &mut self.modified,
        }
    }

    /// React to a vertical scroll event on `pane`. Returns the follower
    /// write, or `None` when the event is our own echo. The caller performs
    /// the write and then calls [`finish_apply`](Self::finish_apply).
    pub fn on_vertical_scroll(
        &mut self,
        pane: Pane,
        new_top: f64,
        alignments: &[Alignment],
    ) -> Option<ScrollWrite> {
        if self.applying_to == Some(pane) {
            // The echo of our own write.
            return None;
        }

        let new_top = new_top.max(0.0);
        let padding_from = self.state(pane).top_padding;
        let padding_to = self.state(pane.other()).top_padding;

        let mapping = translate(alignments, pane, (new_top - padding_from).max(0.0));
        let target = (mapping.mapped + padding_to).max(0.0);

        let from = self.state_mut(pane);
        from.scroll_top = new_top;
        from.scroll_offset = mapping.offset_from;
        from.animated_scroll_offset = mapping.offset_from;

        let to = self.state_mut(pane.other());
        to.animated_scroll_offset = mapping.offset_to;
        to.scroll_offset = mapping.offset_to;
        to.scroll_top = target;

        self.phase = SyncPhase::ApplyingComputedScroll;
        self.applying_to = Some(pane.other());
        Some(ScrollWrite {
            pane: pane.other(),
            target,
        })
    }

    /// Horizontal scroll mirrors 1:1 under the same guard.
    pub fn on_horizontal_scroll(&mut self, pane: Pane, new_left: f64) -> Option<ScrollWrite> {
        if self.applying_to == Some(pane) {
            return None;
        }
        self.phase = SyncPhase::ApplyingComputedScroll;
        self.applying_to = Some(pane.other());
        Some(ScrollWrite {
            pane: pane.other(),
            target: new_left.max(0.0),
        })
    }

    /// The guarded write completed (or failed); the machine returns to idle.
    pub fn finish_apply(&mut self) {
        self.phase = SyncPhase::Idle;
        self.applying_to = None;
    }

    /// Engage the guard for a write initiated outside the scroll mapping
    /// (padding compensation); its echo must be dropped all the same.
    pub fn begin_external_apply(&mut self, pane: Pane) {
        self.phase = SyncPhase::ApplyingComputedScroll;
        self.applying_to = Some(pane);
    }

    /// Re-balance document-top padding for the compared moved block.
    ///
    /// `true_top_*` is the block start's pixel top in each pane, already
    /// corrected by that pane's current padding. The pane holding focus
    /// keeps its exact visual position (its scrollTop shifts with its
    /// padding); the other pane's position is derived from the coupling
    /// invariant, never set independently.
    pub fn reconcile_move_padding(
        &mut self,
        true_top_original: f64,
        true_top_modified: f64,
        focused: Pane,
        now: Instant,
    ) -> Vec<ScrollWrite> {
        let delta = true_top_modified - true_top_original;

        if delta == 0.0 {
            if self.original.top_padding != 0.0 || self.modified.top_padding != 0.0 {
                self.settle_deadline = Some(now + self.settle_delay);
            }
            return Vec::new();
        }
        self.settle_deadline = None;

        let (new_original, new_modified) = if delta > 0.0 {
            (delta, 0.0)
        } else {
            (0.0, -delta)
        };
        if new_original == self.original.top_padding && new_modified == self.modified.top_padding {
            return Vec::new();
        }
        log::debug!(
            "moved-block padding: original {new_original}px, modified {new_modified}px"
        );

        let focused_padding_shift = match focused {
            Pane::Original => new_original - self.original.top_padding,
            Pane::Modified => new_modified - self.modified.top_padding,
        };
        self.original.top_padding = new_original;
        self.modified.top_padding = new_modified;

        let focused_state = self.state_mut(focused);
        focused_state.scroll_top = (focused_state.scroll_top + focused_padding_shift).max(0.0);
        let focused_top = focused_state.scroll_top;

        let derived_top = self.coupled_top(focused, focused_top);
        let other = focused.other();
        self.state_mut(other).scroll_top = derived_top;

        vec![
            ScrollWrite {
                pane: focused,
                target: focused_top,
            },
            ScrollWrite {
                pane: other,
                target: derived_top,
            },
        ]
    }

    /// The comparison went away; paddings drain after the settle delay.
    pub fn clear_move_compare(&mut self, now: Instant) {
        if self.original.top_padding != 0.0 || self.modified.top_padding != 0.0 {
            self.settle_deadline = Some(now + self.settle_delay);
        }
    }

    /// Poll the settle deadline. Returns true when the paddings were just
    /// reset and the session must reinstall zones.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.settle_deadline {
            Some(deadline) if now >= deadline => {
                self.settle_deadline = None;
                self.original.top_padding = 0.0;
                self.modified.top_padding = 0.0;
                true
            }
            _ => false,
        }
    }

    /// Document-top padding zones to append to each pane's install list
    pub fn padding_zones(&self) -> (Option<ViewZone>, Option<ViewZone>) {
        (
            padding_zone(self.original.top_padding),
            padding_zone(self.modified.top_padding),
        )
    }

    /// Follower scrollTop for a leader position, per the coupling
    /// invariant over the currently stored offsets and paddings.
    fn coupled_top(&self, leader: Pane, leader_top: f64) -> f64 {
        let (from, to) = match leader {
            Pane::Original => (&self.original, &self.modified),
            Pane::Modified => (&self.modified, &self.original),
        };
        (leader_top - (from.scroll_offset - to.scroll_offset)
            - (from.top_padding - to.top_padding))
            .max(0.0)
    }
}

fn padding_zone(height: f64) -> Option<ViewZone> {
    (height > 0.0).then(|| ViewZone {
        after_line_number: 0,
        height_in_px: height,
        kind: ZoneKind::TopPadding,
        min_width_in_px: 0.0,
        show_in_hidden_areas: true,
        suppress_mouse_down: true,
        action: None,
    })
}

struct Translation {
    mapped: f64,
    /// Leader content height above the band the position falls in
    offset_from: f64,
    /// Follower content height above the same band
    offset_to: f64,
}

/// Walk the band table and map a content position from one pane into the
/// other. Positions past the table continue 1:1.
fn translate(alignments: &[Alignment], from: Pane, top: f64) -> Translation {
    let mut acc_from = 0.0_f64;
    let mut acc_to = 0.0_f64;
    for alignment in alignments {
        let (h_from, h_to) = match from {
            Pane::Original => (alignment.original_height_in_px, alignment.modified_height_in_px),
            Pane::Modified => (alignment.modified_height_in_px, alignment.original_height_in_px),
        };
        if acc_from + h_from > top {
            let fraction = if h_from > 0.0 {
                ((top - acc_from) / h_from).clamp(0.0, 1.0)
            } else {
                1.0
            };
            return Translation {
                mapped: acc_to + fraction * h_to,
                offset_from: acc_from,
                offset_to: acc_to,
            };
        }
        acc_from += h_from;
        acc_to += h_to;
    }
    Translation {
        mapped: top - acc_from + acc_to,
        offset_from: acc_from,
        offset_to: acc_to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::{compute_alignments, LineRange, LineRangeMapping, PaneGeometry, TextMetrics};

    const LH: f64 = 18.0;

    fn doc(lines: u32) -> TextMetrics {
        TextMetrics::new(
            &(1..=lines)
                .map(|i| format!("line {i}"))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    fn bands(hunks: &[LineRangeMapping], orig: u32, modi: u32) -> Vec<Alignment> {
        let orig = doc(orig);
        let modi = doc(modi);
        compute_alignments(
            hunks,
            PaneGeometry {
                doc: &orig,
                overrides: &[],
                line_height: LH,
            },
            PaneGeometry {
                doc: &modi,
                overrides: &[],
                line_height: LH,
            },
            false,
        )
        .alignments
    }

    // A band counts as "above" the position once its original-side extent
    // ends at or before it; zero-height insertion bands sitting exactly at
    // the position are above it.
    fn delta_above(alignments: &[Alignment], original_top: f64) -> f64 {
        let mut acc = 0.0;
        let mut sum = 0.0;
        for a in alignments {
            if acc + a.original_height_in_px > original_top {
                break;
            }
            acc += a.original_height_in_px;
            sum += a.modified_height_in_px - a.original_height_in_px;
        }
        sum
    }

    #[test]
    fn test_follower_offset_matches_cumulative_band_delta() {
        let hunks = vec![
            LineRangeMapping::new(LineRange::empty_at(5), LineRange::new(5, 8)),
            LineRangeMapping::new(LineRange::new(10, 12), LineRange::new(13, 13)),
        ];
        let alignments = bands(&hunks, 20, 21);
        let mut sync = ScrollSynchronizer::new(Duration::from_millis(100));

        // Band boundaries in original-pane pixels.
        let mut boundary = 0.0;
        for a in &alignments {
            boundary += a.original_height_in_px;
            let write = sync
                .on_vertical_scroll(Pane::Original, boundary, &alignments)
                .expect("a scroll while idle must produce a follower write");
            sync.finish_apply();

            let expected = delta_above(&alignments, boundary);
            assert!(
                (write.target - boundary - expected).abs() < 1e-6,
                "at original top {boundary}: follower target {} must differ by {expected}",
                write.target
            );
        }
    }

    #[test]
    fn test_echo_event_is_dropped() {
        let alignments = bands(&[], 10, 10);
        let mut sync = ScrollSynchronizer::new(Duration::from_millis(100));

        let write = sync
            .on_vertical_scroll(Pane::Original, 90.0, &alignments)
            .expect("first event produces a write");
        assert_eq!(write.pane, Pane::Modified);
        assert_eq!(sync.phase(), SyncPhase::ApplyingComputedScroll);

        // The host dispatches the echo before the write call returns.
        assert!(
            sync.on_vertical_scroll(Pane::Modified, write.target, &alignments)
                .is_none(),
            "echo on the pane being written must be ignored"
        );

        sync.finish_apply();
        assert_eq!(sync.phase(), SyncPhase::Idle);

        // A genuine event on that pane afterwards couples normally.
        assert!(sync
            .on_vertical_scroll(Pane::Modified, 36.0, &alignments)
            .is_some());
    }

    #[test]
    fn test_identical_documents_scroll_one_to_one() {
        let alignments = bands(&[], 30, 30);
        let mut sync = ScrollSynchronizer::new(Duration::from_millis(100));
        let write = sync
            .on_vertical_scroll(Pane::Modified, 123.0, &alignments)
            .unwrap();
        assert_eq!(write.pane, Pane::Original);
        assert!((write.target - 123.0).abs() < 1e-9);
    }

    #[test]
    fn test_positions_past_the_table_continue_one_to_one() {
        let hunks = vec![LineRangeMapping::new(
            LineRange::empty_at(3),
            LineRange::new(3, 5),
        )];
        let alignments = bands(&hunks, 10, 12);
        let mut sync = ScrollSynchronizer::new(Duration::from_millis(100));

        let table_height: f64 = alignments.iter().map(|a| a.original_height_in_px).sum();
        let write = sync
            .on_vertical_scroll(Pane::Original, table_height + 50.0, &alignments)
            .unwrap();
        let full_delta = delta_above(&alignments, table_height);
        assert!((write.target - (table_height + 50.0 + full_delta)).abs() < 1e-6);
    }

    #[test]
    fn test_negative_scroll_top_clamps_to_zero() {
        let alignments = bands(&[], 10, 10);
        let mut sync = ScrollSynchronizer::new(Duration::from_millis(100));
        let write = sync
            .on_vertical_scroll(Pane::Original, -25.0, &alignments)
            .unwrap();
        assert_eq!(write.target, 0.0);
        assert_eq!(sync.state(Pane::Original).scroll_top, 0.0);
    }

    #[test]
    fn test_horizontal_scroll_mirrors_exactly() {
        let mut sync = ScrollSynchronizer::new(Duration::from_millis(100));
        let write = sync.on_horizontal_scroll(Pane::Original, 64.0).unwrap();
        assert_eq!(write, ScrollWrite { pane: Pane::Modified, target: 64.0 });
        assert!(sync.on_horizontal_scroll(Pane::Modified, 64.0).is_none());
        sync.finish_apply();
    }

    #[test]
    fn test_moved_block_padding_follows_the_lower_pane() {
        let mut sync = ScrollSynchronizer::new(Duration::from_millis(100));
        let now = Instant::now();

        // Block starts 40px lower in the modified pane.
        let writes = sync.reconcile_move_padding(100.0, 140.0, Pane::Original, now);
        assert_eq!(sync.state(Pane::Original).top_padding, 40.0);
        assert_eq!(sync.state(Pane::Modified).top_padding, 0.0);
        assert_eq!(writes.len(), 2);
        assert_eq!(
            writes[0].pane,
            Pane::Original,
            "the focused pane is written first to preserve its view"
        );

        let (orig_zone, mod_zone) = sync.padding_zones();
        let zone = orig_zone.expect("original pane gets the padding zone");
        assert_eq!(zone.after_line_number, 0);
        assert_eq!(zone.height_in_px, 40.0);
        assert!(mod_zone.is_none());
    }

    #[test]
    fn test_padding_inverts_when_original_sits_lower() {
        let mut sync = ScrollSynchronizer::new(Duration::from_millis(100));
        sync.reconcile_move_padding(90.0, 30.0, Pane::Modified, Instant::now());
        assert_eq!(sync.state(Pane::Original).top_padding, 0.0);
        assert_eq!(sync.state(Pane::Modified).top_padding, 60.0);
    }

    #[test]
    fn test_padding_resets_after_settle_delay() {
        let delay = Duration::from_millis(100);
        let mut sync = ScrollSynchronizer::new(delay);
        let t0 = Instant::now();

        sync.reconcile_move_padding(0.0, 40.0, Pane::Original, t0);
        assert_eq!(sync.state(Pane::Original).top_padding, 40.0);

        sync.clear_move_compare(t0);
        assert!(
            !sync.tick(t0 + delay / 2),
            "padding holds until the deadline"
        );
        assert_eq!(sync.state(Pane::Original).top_padding, 40.0);

        assert!(sync.tick(t0 + delay + Duration::from_millis(1)));
        assert_eq!(sync.state(Pane::Original).top_padding, 0.0);
        assert_eq!(sync.state(Pane::Modified).top_padding, 0.0);
        assert!(!sync.tick(t0 + delay * 2), "reset fires once");
    }

    #[test]
    fn test_focused_pane_keeps_visual_position_across_padding_change() {
        let alignments = bands(&[], 30, 30);
        let mut sync = ScrollSynchronizer::new(Duration::from_millis(100));
        sync.on_vertical_scroll(Pane::Original, 200.0, &alignments);
        sync.finish_apply();

        let writes = sync.reconcile_move_padding(100.0, 140.0, Pane::Original, Instant::now());
        // 40px of padding pushed the content down; scrollTop follows so the
        // viewport shows the same content.
        assert_eq!(writes[0].target, 240.0);
        // The other pane is derived from the invariant, not set separately.
        assert_eq!(writes[1].target, 200.0);
    }
}
