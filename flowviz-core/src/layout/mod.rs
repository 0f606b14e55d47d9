//! Layout Engine
//!
//! Turns a `FlowGraph` into geometry a renderer can draw directly:
//! - `linear` - Sankey/alluvial: two vertical stacks joined by bands
//! - `radial` - chord: two angular halves joined by ribbons
//!
//! Both variants are pure functions of (graph, node order, geometry,
//! colors). Node order is decided here once and shared by both.

mod linear;
mod radial;

pub use linear::{EdgeBand, LinearFrame, LinearLayout, NodeExtent};
pub use radial::{polar, ArcExtent, RadialFrame, RadialLayout, Ribbon, SubArc};

use crate::aggregate::{FlowGraph, FlowNode};
use crate::catalog::FieldCatalog;
use flowviz_common::events::Side;
use std::collections::HashMap;

/// Last displayed top-to-bottom order of the source axis
///
/// Keeps categorical nodes from re-shuffling when only counts change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualOrder {
    field: Option<String>,
    labels: Vec<String>,
}

impl VisualOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the order just displayed for `field`
    pub fn remember(&mut self, field: &str, labels: Vec<String>) {
        self.field = Some(field.to_string());
        self.labels = labels;
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn clear(&mut self) {
        self.field = None;
        self.labels.clear();
    }
}

/// Display order of both axes, as indices into the graph's node lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOrder {
    pub source: Vec<usize>,
    pub target: Vec<usize>,
}

impl NodeOrder {
    /// Canonical order produced by the aggregator
    pub fn canonical(graph: &FlowGraph) -> Self {
        Self {
            source: (0..graph.source_nodes.len()).collect(),
            target: (0..graph.target_nodes.len()).collect(),
        }
    }

    /// Canonical order, with the source axis following `memory` when it
    /// describes the same categorical field
    ///
    /// Bucketed fields always stay in bucket order. Remembered labels keep
    /// their relative order; labels new to this pass follow in canonical
    /// order; remembered labels no longer present are dropped.
    pub fn resolve(graph: &FlowGraph, catalog: &FieldCatalog, memory: &VisualOrder) -> Self {
        let mut order = Self::canonical(graph);

        let source_field = graph.pair.source();
        let bucketed = catalog
            .get(source_field)
            .map_or(true, |field| field.is_bucketed());
        if bucketed || memory.field() != Some(source_field) {
            return order;
        }

        let index: HashMap<&str, usize> = graph
            .source_nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.label.as_str(), i))
            .collect();

        let mut source: Vec<usize> = memory
            .labels()
            .iter()
            .filter_map(|label| index.get(label.as_str()).copied())
            .collect();
        for i in 0..graph.source_nodes.len() {
            if !source.contains(&i) {
                source.push(i);
            }
        }
        order.source = source;
        order
    }

    fn indices(&self, side: Side) -> &[usize] {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    /// Nodes of one side in display order
    ///
    /// Indices outside the graph (stale order) are skipped.
    pub fn nodes<'g>(&self, graph: &'g FlowGraph, side: Side) -> Vec<&'g FlowNode> {
        let nodes = graph.nodes(side);
        self.indices(side)
            .iter()
            .filter_map(|&i| nodes.get(i))
            .collect()
    }

    /// Source labels in display order, for `VisualOrder::remember`
    pub fn source_labels(&self, graph: &FlowGraph) -> Vec<String> {
        self.nodes(graph, Side::Source)
            .into_iter()
            .map(|n| n.label.clone())
            .collect()
    }
}

/// Edge counts keyed by (source label, target label)
fn edge_counts(graph: &FlowGraph) -> HashMap<(&str, &str), usize> {
    graph
        .edges
        .iter()
        .map(|e| ((e.source_label.as_str(), e.target_label.as_str()), e.count))
        .collect()
}
