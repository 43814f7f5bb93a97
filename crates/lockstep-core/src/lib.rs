//! Core layout engine for lockstep
//!
//! Keeps an "original" and a "modified" document pane visually aligned
//! line-for-line. The diff arrives as an opaque ordered hunk list; this
//! crate turns it, together with per-line height overrides from wrapping
//! and foreign spacers, into an ordered band table, per-pane spacer lists
//! and foldable unchanged regions. Everything here is pure geometry: no
//! host editor, no I/O, no rendering.

pub mod alignment;
pub mod doc;
pub mod graph;
pub mod hunks;
pub mod range;
pub mod region;
pub mod zones;

pub use alignment::{
    compute_alignments, Alignment, AlignmentOutcome, LineHeightOverride, PaneGeometry,
};
pub use doc::{DocumentMetrics, NoWrap, TextMetrics, WrapQuery};
pub use graph::{Input, Memo, SideChannel};
pub use hunks::{compute_hunks_with_inner, compute_line_hunks};
pub use range::{LineRange, LineRangeMapping, RangeMapping, TextPosition, TextRange};
pub use region::{
    compute_unchanged_regions, region_layout, restore_snapshots, FoldOptions, RegionControl,
    RegionEdge, RegionLayout, RegionSnapshot, RegionState, UnchangedRegion,
};
pub use zones::{
    reconcile_zones, MovedBlockPair, PaneZones, RenderMode, ViewZone, ZoneAction, ZoneInput,
    ZoneKind,
};
