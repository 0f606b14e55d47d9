//! Highlight-sequencer type definitions
//!
//! Supporting types for the autoplay state machine and its cursor.

use serde::{Deserialize, Serialize};

/// Sequencer state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum SequencerState {
    /// Not cycling; full, unhighlighted view
    Idle,
    /// Walking source node indices with a fixed per-step dwell
    CyclingSource,
    /// Showing the full view while switching to the next target field
    CyclingTarget,
    /// Showing the full view while rotating to the next source field
    SwappingFieldPair,
    /// Suspended by user interaction
    Paused,
}

impl SequencerState {
    /// True for the states that own a running dwell timer
    pub fn is_cycling(&self) -> bool {
        matches!(
            self,
            SequencerState::CyclingSource
                | SequencerState::CyclingTarget
                | SequencerState::SwappingFieldPair
        )
    }
}

impl std::fmt::Display for SequencerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequencerState::Idle => write!(f, "Idle"),
            SequencerState::CyclingSource => write!(f, "CyclingSource"),
            SequencerState::CyclingTarget => write!(f, "CyclingTarget"),
            SequencerState::SwappingFieldPair => write!(f, "SwappingFieldPair"),
            SequencerState::Paused => write!(f, "Paused"),
        }
    }
}

/// Which axis of the bipartite diagram a node belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// Position of the highlight sequencer
///
/// One cursor exists per active diagram; it is only ever mutated by the
/// sequencer's own dwell steps or by pause/resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightCursor {
    /// Axis the focused node lives on
    pub side: Side,
    /// Index of the focused node in display order
    pub index: usize,
    /// Field shown on the source axis
    pub source_field: String,
    /// Field shown on the target axis
    pub target_field: String,
}
