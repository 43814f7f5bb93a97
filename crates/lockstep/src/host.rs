//! Pane host abstraction
//!
//! The two panes are externally owned editors. The engine reads geometry
//! through this trait and writes through its narrow setters; every setter
//! can fail because a host may be disposed under us. Echo events caused by
//! our own writes come back through the session's notify methods, where
//! the re-entrancy guards drop them.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use lockstep_core::{DocumentMetrics, LineRange, ViewZone, WrapQuery};

/// Identifies one of the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Original,
    Modified,
}

impl Pane {
    pub fn other(self) -> Pane {
        match self {
            Pane::Original => Pane::Modified,
            Pane::Modified => Pane::Original,
        }
    }
}

/// A spacer some other feature already installed in a pane; folded into
/// the override queue so alignment accounts for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForeignZone {
    pub after_line_number: u32,
    pub height_in_px: f64,
}

/// Narrow surface of one host editor pane
pub trait PaneHost {
    fn line_count(&self) -> u32;
    fn line_length(&self, line: u32) -> u32;
    fn line_height(&self) -> f64;

    /// Visual lines `line` occupies under the pane's current wrap
    fn visual_lines(&self, line: u32) -> u32;

    /// Pixel top of a logical line in the pane's scroll space
    fn top_of_line(&self, line: u32) -> f64;

    fn scroll_top(&self) -> f64;
    fn scroll_left(&self) -> f64;
    fn set_scroll_top(&mut self, top: f64) -> Result<()>;
    fn set_scroll_left(&mut self, left: f64) -> Result<()>;

    /// Replace the zones this subsystem owns in the pane
    fn install_view_zones(&mut self, zones: Vec<ViewZone>) -> Result<()>;

    fn set_hidden_areas(&mut self, areas: Vec<LineRange>) -> Result<()>;

    /// Zones installed by other features, to be treated as overrides
    fn foreign_zones(&self) -> Vec<ForeignZone>;
}

/// Shared handle on the session's write guard. Hosts clone it and check
/// [`is_raised`](SuppressionFlag::is_raised) inside their change listeners:
/// a view-zone or hidden-area notification arriving while raised is the
/// session's own write echoing back and must not re-invalidate.
#[derive(Debug, Clone, Default)]
pub struct SuppressionFlag(Rc<Cell<bool>>);

impl SuppressionFlag {
    pub fn is_raised(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn set(&self, raised: bool) {
        self.0.set(raised);
    }
}

/// Adapter exposing a host as the core document oracle
pub struct HostDoc<'a>(pub &'a dyn PaneHost);

impl DocumentMetrics for HostDoc<'_> {
    fn line_count(&self) -> u32 {
        self.0.line_count()
    }

    fn line_length(&self, line: u32) -> u32 {
        self.0.line_length(line)
    }
}

/// Adapter exposing a host's wrap geometry as the core wrap oracle
pub struct HostWrap<'a>(pub &'a dyn PaneHost);

impl WrapQuery for HostWrap<'_> {
    fn visual_lines(&self, line: u32) -> u32 {
        self.0.visual_lines(line)
    }
}
