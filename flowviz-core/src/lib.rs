//! # Flowviz Core Library (flowviz-core)
//!
//! Bipartite flow aggregation, layout and highlight sequencing for the
//! survey display wall.
//!
//! **Pipeline:** response records → Category Normalizer → Flow Aggregator
//! → Layout Engine (linear Sankey / radial chord) → rendering backend,
//! with the Highlight Sequencer running beside it and emitting focus
//! changes over the shared EventBus.
//!
//! Nothing here draws; the output is plain data a renderer consumes.

pub mod aggregate;
pub mod catalog;
pub mod display;
pub mod error;
pub mod layout;
pub mod normalize;
pub mod record;
pub mod sequencer;
pub mod theme;

pub use aggregate::{aggregate, FieldPair, FlowEdge, FlowGraph, FlowNode};
pub use catalog::{CategoryField, FieldCatalog, FieldKind, UNKNOWN_LABEL};
pub use display::{DisplayHandle, DisplayService, DisplaySnapshot, FlowDisplay};
pub use error::{Error, Result};
pub use record::ResponseRecord;
pub use sequencer::{DwellSchedule, HighlightSequencer};
