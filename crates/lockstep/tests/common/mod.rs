#![allow(dead_code)] // Shared across several integration tests; each test binary uses a subset of helpers.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use anyhow::{bail, Result};
use lockstep::{ForeignZone, LayoutOptions, LayoutSession, PaneHost, SuppressionFlag};
use lockstep_core::{
    compute_alignments, compute_line_hunks, Alignment, DocumentMetrics, LineRange, PaneGeometry,
    TextMetrics, ViewZone,
};
use rustc_hash::FxHashMap;

pub const LINE_HEIGHT: f64 = 18.0;

/// Everything a fake pane remembers. Tests keep a cloned handle on it while
/// the session owns another, so installed state can be inspected from the
/// outside.
pub struct PaneData {
    pub doc: TextMetrics,
    pub line_height: f64,
    /// Visual lines per logical line; absent means 1 (no wrap)
    pub wrap: FxHashMap<u32, u32>,
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub zones: Vec<ViewZone>,
    pub hidden: Vec<LineRange>,
    pub foreign: Vec<ForeignZone>,
    /// When set, every setter fails like a torn-down editor would
    pub disposed: bool,
    /// The session's suppression predicate, observed at each layout write
    pub suppression: Option<SuppressionFlag>,
    /// Whether the predicate held during each install/hidden-area write
    pub suppressed_writes: Vec<Option<bool>>,
    pub zone_installs: u32,
}

/// Host pane double backed by shared state
#[derive(Clone)]
pub struct FakePane(Rc<RefCell<PaneData>>);

impl FakePane {
    pub fn new(text: &str, line_height: f64) -> Self {
        Self(Rc::new(RefCell::new(PaneData {
            doc: TextMetrics::new(text),
            line_height,
            wrap: FxHashMap::default(),
            scroll_top: 0.0,
            scroll_left: 0.0,
            zones: Vec::new(),
            hidden: Vec::new(),
            foreign: Vec::new(),
            disposed: false,
            suppression: None,
            suppressed_writes: Vec::new(),
            zone_installs: 0,
        })))
    }

    pub fn data(&self) -> Ref<'_, PaneData> {
        self.0.borrow()
    }

    pub fn data_mut(&self) -> RefMut<'_, PaneData> {
        self.0.borrow_mut()
    }

    pub fn spacer_zones(&self) -> Vec<ViewZone> {
        self.0.borrow().zones.clone()
    }
}

impl PaneHost for FakePane {
    fn line_count(&self) -> u32 {
        self.0.borrow().doc.line_count()
    }

    fn line_length(&self, line: u32) -> u32 {
        self.0.borrow().doc.line_length(line)
    }

    fn line_height(&self) -> f64 {
        self.0.borrow().line_height
    }

    fn visual_lines(&self, line: u32) -> u32 {
        self.0.borrow().wrap.get(&line).copied().unwrap_or(1)
    }

    fn top_of_line(&self, line: u32) -> f64 {
        let data = self.0.borrow();
        let content: f64 = (1..line)
            .map(|l| data.wrap.get(&l).copied().unwrap_or(1) as f64 * data.line_height)
            .sum();
        let zones_above: f64 = data
            .zones
            .iter()
            .filter(|z| z.after_line_number < line)
            .map(|z| z.height_in_px)
            .sum();
        content + zones_above
    }

    fn scroll_top(&self) -> f64 {
        self.0.borrow().scroll_top
    }

    fn scroll_left(&self) -> f64 {
        self.0.borrow().scroll_left
    }

    fn set_scroll_top(&mut self, top: f64) -> Result<()> {
        let mut data = self.0.borrow_mut();
        if data.disposed {
            bail!("pane disposed");
        }
        data.scroll_top = top;
        Ok(())
    }

    fn set_scroll_left(&mut self, left: f64) -> Result<()> {
        let mut data = self.0.borrow_mut();
        if data.disposed {
            bail!("pane disposed");
        }
        data.scroll_left = left;
        Ok(())
    }

    fn install_view_zones(&mut self, zones: Vec<ViewZone>) -> Result<()> {
        let mut data = self.0.borrow_mut();
        if data.disposed {
            bail!("pane disposed");
        }
        let raised = data.suppression.as_ref().map(SuppressionFlag::is_raised);
        data.suppressed_writes.push(raised);
        data.zones = zones;
        data.zone_installs += 1;
        Ok(())
    }

    fn set_hidden_areas(&mut self, areas: Vec<LineRange>) -> Result<()> {
        let mut data = self.0.borrow_mut();
        if data.disposed {
            bail!("pane disposed");
        }
        let raised = data.suppression.as_ref().map(SuppressionFlag::is_raised);
        data.suppressed_writes.push(raised);
        data.hidden = areas;
        Ok(())
    }

    fn foreign_zones(&self) -> Vec<ForeignZone> {
        self.0.borrow().foreign.clone()
    }
}

/// Build a session over two text buffers, diffed for real, with the
/// suppression predicate wired into both fake panes.
pub fn session_with_texts(
    old: &str,
    new: &str,
    options: LayoutOptions,
) -> (LayoutSession<FakePane>, FakePane, FakePane) {
    let original = FakePane::new(old, LINE_HEIGHT);
    let modified = FakePane::new(new, LINE_HEIGHT);
    let (o, m) = (original.clone(), modified.clone());

    let mut session = LayoutSession::new(original, modified, options);
    let flag = session.suppression_flag();
    o.data_mut().suppression = Some(flag.clone());
    m.data_mut().suppression = Some(flag);
    session.update_diff(compute_line_hunks(old, new));
    (session, o, m)
}

pub fn numbered_lines(count: u32) -> String {
    (1..=count)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The band table the session is expected to work from: same diff, no
/// overrides, shared line height.
pub fn band_table(old: &str, new: &str) -> Vec<Alignment> {
    let orig = TextMetrics::new(old);
    let modi = TextMetrics::new(new);
    compute_alignments(
        &compute_line_hunks(old, new),
        PaneGeometry {
            doc: &orig,
            overrides: &[],
            line_height: LINE_HEIGHT,
        },
        PaneGeometry {
            doc: &modi,
            overrides: &[],
            line_height: LINE_HEIGHT,
        },
        false,
    )
    .alignments
}

/// Cumulative `modified − original` band height over every band that ends
/// at or above the given original-pane position.
pub fn delta_above(alignments: &[Alignment], original_top: f64) -> f64 {
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
