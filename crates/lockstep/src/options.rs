//! Layout options
//!
//! Only the type lives here; reading options from disk is the embedder's
//! business. Field defaults follow what the engine assumes when the host
//! hands us nothing.

use std::time::Duration;

use lockstep_core::{FoldOptions, RenderMode};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Paired panes when true; single-pane overlay rendering when false
    pub render_side_by_side: bool,
    /// Split hunks at inner changes so untouched prefixes/suffixes align
    pub inner_alignment: bool,
    /// Fold equal spans between hunks
    pub collapse_unchanged: bool,
    pub fold: FoldOptions,
    /// Debounce before moved-block padding resets once the compared block
    /// lines up (milliseconds)
    pub settle_delay_ms: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            render_side_by_side: true,
            inner_alignment: true,
            collapse_unchanged: false,
            fold: FoldOptions::default(),
            settle_delay_ms: 400,
        }
    }
}

impl LayoutOptions {
    pub fn render_mode(&self) -> RenderMode {
        if self.render_side_by_side {
            RenderMode::SideBySide
        } else {
            RenderMode::Inline
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
