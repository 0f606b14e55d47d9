//! Layout-related type definitions

use serde::{Deserialize, Serialize};

/// Whether a diagram has enough data to be drawn
///
/// `InsufficientData` is not an error: the rendering backend shows a
/// message instead of an empty or broken chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiagramStatus {
    /// Layout can be drawn
    Ready,
    /// Too few records or too few non-empty nodes
    InsufficientData {
        /// Records left after test-data filtering
        eligible: usize,
        /// Nodes (both sides) with a non-zero count
        active_nodes: usize,
    },
}

impl DiagramStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, DiagramStatus::Ready)
    }
}

/// Summary of a freshly computed layout, carried by `LayoutChanged`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSummary {
    /// Field on the source axis
    pub source_field: String,
    /// Field on the target axis
    pub target_field: String,
    /// Records counted after filtering
    pub eligible_records: usize,
    /// Number of source nodes (including zero-count slots)
    pub source_nodes: usize,
    /// Number of target nodes (including zero-count slots)
    pub target_nodes: usize,
    /// Data-quality fallbacks applied during normalization
    pub quality_issues: usize,
    /// Drawability of the diagram
    pub status: DiagramStatus,
}
