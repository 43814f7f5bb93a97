//! Layout session
//!
//! Owns the recompute graph and the two host panes. Every input lives in a
//! versioned cell; one invalidation means one atomic pass: collect
//! overrides, compute the band table, reconcile zones and folds, then write
//! everything to the hosts behind the re-entrancy guard. Hosts must consult
//! [`LayoutSession::is_applying_layout`] before treating our own writes as
//! fresh invalidations.

use std::time::Instant;

use anyhow::Result;
use lockstep_core::{
    compute_alignments, compute_unchanged_regions, reconcile_zones, region_layout,
    restore_snapshots, Alignment, AlignmentOutcome, Input, LineHeightOverride, LineRange,
    LineRangeMapping, Memo, MovedBlockPair, PaneGeometry, RegionControl, RegionSnapshot,
    SideChannel, UnchangedRegion, ViewZone, ZoneInput,
};
use rustc_hash::FxHashMap;

use crate::dispose::DisposalBag;
use crate::host::{HostDoc, HostWrap, Pane, PaneHost, SuppressionFlag};
use crate::options::LayoutOptions;
use crate::scroll::{ScrollState, ScrollSynchronizer};

/// A moved block under comparison: the pairing plus the sub-diff between
/// the two copies, both supplied by the diff provider.
#[derive(Debug, Clone, PartialEq)]
pub struct MovedBlockCompare {
    pub pair: MovedBlockPair,
    pub hunks: Vec<LineRangeMapping>,
}

/// Guard for the view-zone / hidden-area write path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum WritePhase {
    #[default]
    Idle,
    ApplyingComputedChange,
}

/// Version key of one full pass
type PassKey = (u64, u64, u64, u64, u64, u64);

pub struct LayoutSession<H: PaneHost> {
    original: H,
    modified: H,

    options: Input<LayoutOptions>,
    hunks: Input<Vec<LineRangeMapping>>,
    /// Bumped whenever the hosts' wrap, viewport or foreign zones change
    geometry: Input<()>,
    active_move: Input<Option<MovedBlockCompare>>,
    /// Bumped on fold interactions
    region_rev: Input<()>,
    /// Width the deleted-code overlay measured; consumed next pass
    overlay_width: SideChannel<f64>,

    alignments: Memo<PassKey, AlignmentOutcome>,
    moved_alignments: Memo<PassKey, Vec<Alignment>>,
    regions: Vec<UnchangedRegion>,
    regions_key: (u64, u64),

    scroll: ScrollSynchronizer,
    write_phase: WritePhase,
    suppression: SuppressionFlag,
    gutter_menu_line: Option<u32>,
    installed: Option<(PassKey, u64, u64)>,
    disposables: DisposalBag,
}

impl<H: PaneHost> LayoutSession<H> {
    pub fn new(original: H, modified: H, options: LayoutOptions) -> Self {
        let settle_delay = options.settle_delay();
        Self {
            original,
            modified,
            options: Input::new(options),
            hunks: Input::new(Vec::new()),
            geometry: Input::new(()),
            active_move: Input::new(None),
            region_rev: Input::new(()),
            overlay_width: SideChannel::new(0.0),
            alignments: Memo::new(),
            moved_alignments: Memo::new(),
            regions: Vec::new(),
            regions_key: (0, 0),
            scroll: ScrollSynchronizer::new(settle_delay),
            write_phase: WritePhase::Idle,
            suppression: SuppressionFlag::default(),
            gutter_menu_line: None,
            installed: None,
            disposables: DisposalBag::new(),
        }
    }

    pub fn original(&self) -> &H {
        &self.original
    }

    pub fn modified(&self) -> &H {
        &self.modified
    }

    pub fn scroll_state(&self, pane: Pane) -> ScrollState {
        self.scroll.state(pane)
    }

    /// The suppression predicate: true while this session is writing zones
    /// or hidden areas. Hosts must not re-invalidate on notifications that
    /// arrive inside this window.
    pub fn is_applying_layout(&self) -> bool {
        self.write_phase == WritePhase::ApplyingComputedChange
    }

    /// Shareable handle on the same predicate, for hosts whose change
    /// listeners fire synchronously inside our writes.
    pub fn suppression_flag(&self) -> SuppressionFlag {
        self.suppression.clone()
    }

    /// Whether the last pass was cut short by a diff that no longer
    /// matches the documents (self-heals on the next diff update)
    pub fn is_stale(&self) -> bool {
        self.alignments.peek().map(|o| o.stale).unwrap_or(false)
    }

    pub fn regions(&self) -> &[UnchangedRegion] {
        &self.regions
    }

    pub fn region_snapshots(&self) -> Vec<RegionSnapshot> {
        self.regions.iter().map(UnchangedRegion::snapshot).collect()
    }

    /// Tie an external resource to this session's lifetime; released in
    /// reverse order on dispose.
    pub fn on_dispose(&mut self, cleanup: impl FnOnce() + 'static) {
        self.disposables.push(cleanup);
    }

    // ==================== Invalidations ====================

    /// A new diff arrived from the background computation.
    pub fn update_diff(&mut self, hunks: Vec<LineRangeMapping>) {
        self.hunks.set(hunks);
    }

    pub fn update_options(&mut self, options: LayoutOptions) {
        self.scroll.set_settle_delay(options.settle_delay());
        self.options.set(options);
    }

    /// Wrap column, line height or viewport changed on either host.
    pub fn notify_geometry_changed(&mut self) {
        self.geometry.touch();
    }

    /// A host reports its view-zone set changed. Returns false (and stays
    /// quiet) when the change is the echo of this session's own write.
    pub fn notify_view_zones_changed(&mut self) -> bool {
        if self.write_phase == WritePhase::ApplyingComputedChange {
            log::trace!("suppressed view-zone echo during layout write");
            return false;
        }
        self.geometry.touch();
        true
    }

    /// The per-line gutter menu opened or closed on a modified-pane line;
    /// revert spacers for that hunk are redundant while it shows.
    pub fn set_gutter_menu_line(&mut self, line: Option<u32>) {
        if self.gutter_menu_line != line {
            self.gutter_menu_line = line;
            self.geometry.touch();
        }
    }

    /// The deleted-code overlay measured its rendered width. Consumed at
    /// the start of the next pass, never read back synchronously.
    pub fn report_overlay_width(&mut self, width: f64) {
        self.overlay_width.publish(width);
    }

    // ==================== The pass ====================

    /// Pull the whole graph up to date and push the result to the hosts.
    /// Cheap when nothing changed.
    pub fn refresh(&mut self) -> Result<()> {
        self.overlay_width.begin_pass();
        self.sync_regions();
        self.ensure_alignments();
        self.ensure_moved_alignments();
        self.install()
    }

    fn pass_key(&self) -> PassKey {
        (
            self.hunks.version(),
            self.options.version(),
            self.geometry.version(),
            self.active_move.version(),
            self.region_rev.version(),
            self.overlay_width.epoch(),
        )
    }

    /// Regions follow the diff; user fold state carries over where the
    /// ranges still match.
    fn sync_regions(&mut self) {
        let key = (self.hunks.version(), self.options.version());
        if self.regions_key == key {
            return;
        }
        let snapshots = self.region_snapshots();
        let options = self.options.get();
        self.regions = if options.collapse_unchanged {
            compute_unchanged_regions(
                self.hunks.get(),
                self.original.line_count(),
                self.modified.line_count(),
                options.fold,
            )
        } else {
            Vec::new()
        };
        restore_snapshots(&mut self.regions, &snapshots);
        self.regions_key = key;
    }

    fn ensure_alignments(&mut self) {
        let key = self.pass_key();
        if self.alignments.is_fresh(&key) {
            return;
        }
        let original_overrides = collect_overrides(&self.original);
        let modified_overrides = collect_overrides(&self.modified);
        let outcome = compute_alignments(
            self.hunks.get(),
            PaneGeometry {
                doc: &HostDoc(&self.original),
                overrides: &original_overrides,
                line_height: self.original.line_height(),
            },
            PaneGeometry {
                doc: &HostDoc(&self.modified),
                overrides: &modified_overrides,
                line_height: self.modified.line_height(),
            },
            self.options.get().inner_alignment,
        );
        self.alignments.store(key, outcome);
    }

    /// The compared moved block gets its own band table, computed from the
    /// sub-diff the provider attached to it. Override queues stay out of
    /// it; the main pass already accounts for them.
    fn ensure_moved_alignments(&mut self) {
        let key = self.pass_key();
        if self.moved_alignments.is_fresh(&key) {
            return;
        }
        let bands = match self.active_move.get() {
            Some(compare) => {
                compute_alignments(
                    &compare.hunks,
                    PaneGeometry {
                        doc: &HostDoc(&self.original),
                        overrides: &[],
                        line_height: self.original.line_height(),
                    },
                    PaneGeometry {
                        doc: &HostDoc(&self.modified),
                        overrides: &[],
                        line_height: self.modified.line_height(),
                    },
                    false,
                )
                .alignments
            }
            None => Vec::new(),
        };
        self.moved_alignments.store(key, bands);
    }

    fn install(&mut self) -> Result<()> {
        let padding_original = self.scroll.state(Pane::Original).top_padding;
        let padding_modified = self.scroll.state(Pane::Modified).top_padding;
        let install_key = (
            self.pass_key(),
            padding_original.to_bits(),
            padding_modified.to_bits(),
        );
        if self.installed == Some(install_key) {
            return Ok(());
        }

        let Some(outcome) = self.alignments.peek() else {
            return Ok(());
        };
        let moved_alignments = self.moved_alignments.peek().map(Vec::as_slice).unwrap_or(&[]);
        let options = self.options.get();
        let menu_line = self.gutter_menu_line;
        let gutter_has_revert =
            move |d: &LineRangeMapping| menu_line == Some(d.modified_range.start);

        let mut zones = reconcile_zones(&ZoneInput {
            alignments: &outcome.alignments,
            moved_alignments,
            active_move: self.active_move.get().as_ref().map(|c| c.pair),
            mode: options.render_mode(),
            original_wrap: &HostWrap(&self.original),
            block_wrap: &HostWrap(&self.modified),
            original_line_height: self.original.line_height(),
            modified_line_height: self.modified.line_height(),
            block_min_width_in_px: *self.overlay_width.value(),
            gutter_has_revert: &gutter_has_revert,
        });

        let folds = region_layout(&self.regions, self.original.line_height());
        zones.original.extend(folds.zones.original);
        zones.modified.extend(folds.zones.modified);
        zones.original.sort_by_key(|z| z.after_line_number);
        zones.modified.sort_by_key(|z| z.after_line_number);

        let (pad_original, pad_modified) = self.scroll.padding_zones();
        if let Some(zone) = pad_original {
            zones.original.insert(0, zone);
        }
        if let Some(zone) = pad_modified {
            zones.modified.insert(0, zone);
        }

        self.begin_layout_write();
        let result = self.write_layout(
            zones.original,
            zones.modified,
            folds.hidden_original,
            folds.hidden_modified,
        );
        self.end_layout_write();
        result?;

        self.installed = Some(install_key);
        Ok(())
    }

    fn begin_layout_write(&mut self) {
        self.write_phase = WritePhase::ApplyingComputedChange;
        self.suppression.set(true);
    }

    fn end_layout_write(&mut self) {
        self.suppression.set(false);
        self.write_phase = WritePhase::Idle;
    }

    fn write_layout(
        &mut self,
        original_zones: Vec<ViewZone>,
        modified_zones: Vec<ViewZone>,
        hidden_original: Vec<LineRange>,
        hidden_modified: Vec<LineRange>,
    ) -> Result<()> {
        self.original.install_view_zones(original_zones)?;
        self.modified.install_view_zones(modified_zones)?;
        self.original.set_hidden_areas(hidden_original)?;
        self.modified.set_hidden_areas(hidden_modified)?;
        Ok(())
    }

    // ==================== Scrolling ====================

    /// A pane reported a vertical scroll (user or programmatic). Couples
    /// the other pane; the echo of our own write is dropped by the guard.
    pub fn notify_scrolled(&mut self, pane: Pane, new_top: f64) -> Result<()> {
        self.refresh()?;
        let write = match self.alignments.peek() {
            Some(outcome) => self.scroll.on_vertical_scroll(pane, new_top, &outcome.alignments),
            None => None,
        };
        if let Some(write) = write {
            let result = self.host_mut(write.pane).set_scroll_top(write.target);
            self.scroll.finish_apply();
            result?;
        }
        Ok(())
    }

    pub fn notify_scrolled_horizontally(&mut self, pane: Pane, new_left: f64) -> Result<()> {
        if let Some(write) = self.scroll.on_horizontal_scroll(pane, new_left) {
            let result = self.host_mut(write.pane).set_scroll_left(write.target);
            self.scroll.finish_apply();
            result?;
        }
        Ok(())
    }

    // ==================== Moved-block compare ====================

    /// Activate, change or clear the compared moved block.
    pub fn set_move_compare(
        &mut self,
        compare: Option<MovedBlockCompare>,
        focused: Pane,
    ) -> Result<()> {
        let block_start = compare.as_ref().map(|c| {
            (
                c.pair.original_range.start,
                c.pair.modified_range.start,
            )
        });
        self.active_move.set(compare);
        self.refresh()?;

        match block_start {
            Some((original_line, modified_line)) => {
                let true_top_original = self.original.top_of_line(original_line)
                    - self.scroll.state(Pane::Original).top_padding;
                let true_top_modified = self.modified.top_of_line(modified_line)
                    - self.scroll.state(Pane::Modified).top_padding;
                let writes = self.scroll.reconcile_move_padding(
                    true_top_original,
                    true_top_modified,
                    focused,
                    Instant::now(),
                );
                let had_writes = !writes.is_empty();
                for write in writes {
                    self.scroll.begin_external_apply(write.pane);
                    let result = self.host_mut(write.pane).set_scroll_top(write.target);
                    self.scroll.finish_apply();
                    result?;
                }
                if had_writes {
                    self.install()?;
                }
            }
            None => {
                self.scroll.clear_move_compare(Instant::now());
            }
        }
        Ok(())
    }

    /// Poll the padding settle deadline; reinstalls zones when it fires.
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        if self.scroll.tick(now) {
            self.install()?;
        }
        Ok(())
    }

    // ==================== Folding ====================

    pub fn apply_region_control(&mut self, index: usize, control: RegionControl) -> Result<()> {
        let Some(region) = self.regions.get_mut(index) else {
            return Ok(());
        };
        region.apply(control);
        self.region_rev.touch();
        self.refresh()
    }

    pub fn finish_region_drag(&mut self, index: usize) {
        if let Some(region) = self.regions.get_mut(index) {
            region.finish_drag();
        }
    }

    pub fn restore_region_state(&mut self, snapshots: &[RegionSnapshot]) -> Result<()> {
        restore_snapshots(&mut self.regions, snapshots);
        self.region_rev.touch();
        self.refresh()
    }

    // ==================== Teardown ====================

    /// Remove everything this session installed, then release registered
    /// resources in reverse order.
    pub fn dispose(mut self) -> Result<()> {
        self.begin_layout_write();
        let result = self.write_layout(Vec::new(), Vec::new(), Vec::new(), Vec::new());
        self.end_layout_write();
        result
        // `disposables` drains on drop, newest first.
    }

    fn host_mut(&mut self, pane: Pane) -> &mut H {
        match pane {
            Pane::Original => &mut self.original,
            Pane::Modified => &mut self.modified,
        }
    }
}

/// Build one pane's override queue: wrap expansion beyond one visual line,
/// plus foreign spacers, merged per line and sorted.
fn collect_overrides(host: &dyn PaneHost) -> Vec<LineHeightOverride> {
    let line_height = host.line_height();
    let mut by_line: FxHashMap<u32, f64> = FxHashMap::default();

    for line in 1..=host.line_count() {
        let extra = host.visual_lines(line).saturating_sub(1);
        if extra > 0 {
            *by_line.entry(line).or_default() += extra as f64 * line_height;
        }
    }
    for zone in host.foreign_zones() {
        // A spacer above the document counts against the first line.
        let line = zone.after_line_number.max(1);
        *by_line.entry(line).or_default() += zone.height_in_px;
    }

    let mut overrides: Vec<LineHeightOverride> = by_line
        .into_iter()
        .map(|(line_number, height_in_px)| LineHeightOverride {
            line_number,
            height_in_px,
        })
        .collect();
    overrides.sort_by_key(|o| o.line_number);
    overrides
}
