//! Host-facing layer of the lockstep engine
//!
//! [`LayoutSession`] wires two externally owned editor panes to the core
//! geometry: it collects wrap and foreign-spacer overrides, runs one atomic
//! recompute per invalidation, installs the resulting spacer lists and
//! hidden areas through guarded writes, and keeps the panes' scroll
//! positions coupled without feedback loops.

pub mod dispose;
pub mod host;
pub mod options;
pub mod scroll;
pub mod session;

pub use dispose::DisposalBag;
pub use host::{ForeignZone, HostDoc, HostWrap, Pane, PaneHost, SuppressionFlag};
pub use options::LayoutOptions;
pub use scroll::{ScrollState, ScrollSynchronizer, ScrollWrite, SyncPhase};
pub use session::{LayoutSession, MovedBlockCompare};
