//! Linear (Sankey) layout
//!
//! Source nodes stack down the left edge, target nodes down the right.
//! Both stacks share one vertical scale so a record has the same
//! thickness at either end; when the sides' totals differ the smaller
//! side is scaled up to match. Leftover height goes into the padding so
//! both stacks span the viewport.

use super::{edge_counts, NodeOrder};
use crate::aggregate::{FlowGraph, FlowNode};
use crate::theme::NodeColors;
use flowviz_common::config::LinearSettings;
use flowviz_common::events::Side;
use serde::Serialize;

/// Vertical extent of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeExtent {
    pub label: String,
    pub side: Side,
    pub count: usize,
    /// Top edge, pixels
    pub start: f64,
    /// Bottom edge, pixels
    pub end: f64,
    /// Cumulative share of the side's total before this node
    pub fraction_start: f64,
    /// Cumulative share including this node
    pub fraction_end: f64,
    pub color: String,
}

impl NodeExtent {
    pub fn height(&self) -> f64 {
        self.end - self.start
    }

    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Band joining a sub-span of a source node to a sub-span of a target node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeBand {
    pub source_label: String,
    pub target_label: String,
    pub count: usize,
    pub source_start: f64,
    pub source_end: f64,
    pub target_start: f64,
    pub target_end: f64,
    /// Right edge of the source node column
    pub source_x: f64,
    /// Left edge of the target node column
    pub target_x: f64,
}

impl EdgeBand {
    pub fn is_dummy(&self) -> bool {
        self.count == 0
    }

    /// Closed SVG path: cubic top curve out, cubic bottom curve back
    pub fn link_path(&self) -> String {
        let x0 = self.source_x;
        let x1 = self.target_x;
        let xm = (x0 + x1) / 2.0;
        format!(
            "M{x0:.2},{s0:.2}C{xm:.2},{s0:.2} {xm:.2},{t0:.2} {x1:.2},{t0:.2}\
             L{x1:.2},{t1:.2}C{xm:.2},{t1:.2} {xm:.2},{s1:.2} {x0:.2},{s1:.2}Z",
            s0 = self.source_start,
            s1 = self.source_end,
            t0 = self.target_start,
            t1 = self.target_end,
        )
    }
}

/// Complete Sankey geometry for one graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinearFrame {
    pub source_nodes: Vec<NodeExtent>,
    pub target_nodes: Vec<NodeExtent>,
    /// Row-major over displayed source × target order
    pub edges: Vec<EdgeBand>,
}

impl LinearFrame {
    pub fn is_empty(&self) -> bool {
        self.source_nodes.is_empty() && self.target_nodes.is_empty()
    }

    pub fn nodes(&self, side: Side) -> &[NodeExtent] {
        match side {
            Side::Source => &self.source_nodes,
            Side::Target => &self.target_nodes,
        }
    }
}

/// Sankey layout engine for a fixed viewport
#[derive(Debug, Clone, PartialEq)]
pub struct LinearLayout {
    settings: LinearSettings,
}

/// Scale and spacing chosen for one stack
struct Stack {
    scale: f64,
    padding: f64,
    offset: f64,
}

impl LinearLayout {
    pub fn new(settings: LinearSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LinearSettings {
        &self.settings
    }

    /// Lay out `graph` in `order`
    pub fn compute(&self, graph: &FlowGraph, order: &NodeOrder, colors: &NodeColors<'_>) -> LinearFrame {
        let sources = order.nodes(graph, Side::Source);
        let targets = order.nodes(graph, Side::Target);
        let source_total: usize = sources.iter().map(|n| n.aggregate_count).sum();
        let target_total: usize = targets.iter().map(|n| n.aggregate_count).sum();
        let max_total = source_total.max(target_total);
        if max_total == 0 {
            return LinearFrame::default();
        }

        let s = &self.settings;
        let available = |n: usize| {
            let gaps = n.saturating_sub(1) as f64 * s.node_padding;
            (s.height - 2.0 * s.margin - gaps).max(0.0)
        };
        let ky = (available(sources.len()) / max_total as f64)
            .min(available(targets.len()) / max_total as f64);

        let source_stack = self.stack(sources.len(), source_total, max_total, ky);
        let target_stack = self.stack(targets.len(), target_total, max_total, ky);

        let source_nodes = place(&sources, &source_stack, source_total, colors);
        let target_nodes = place(&targets, &target_stack, target_total, colors);

        let counts = edge_counts(graph);
        let source_x = s.margin + s.node_width;
        let target_x = s.width - s.margin - s.node_width;

        // Each node's extent is partitioned in the opposite axis's order
        let mut source_cursor: Vec<f64> = source_nodes.iter().map(|n| n.start).collect();
        let mut target_cursor: Vec<f64> = target_nodes.iter().map(|n| n.start).collect();
        let mut edges = Vec::with_capacity(sources.len() * targets.len());
        for (i, source) in sources.iter().enumerate() {
            for target in &targets {
                let count = counts
                    .get(&(source.label.as_str(), target.label.as_str()))
                    .copied()
                    .unwrap_or(0);
                let source_start = source_cursor[i];
                let source_end = source_start + count as f64 * source_stack.scale;
                source_cursor[i] = source_end;
                edges.push(EdgeBand {
                    source_label: source.label.clone(),
                    target_label: target.label.clone(),
                    count,
                    source_start,
                    source_end,
                    target_start: 0.0,
                    target_end: 0.0,
                    source_x,
                    target_x,
                });
            }
        }
        // Target sub-spans follow source order: walk edges column by column
        for j in 0..targets.len() {
            for i in 0..sources.len() {
                let edge = &mut edges[i * targets.len() + j];
                edge.target_start = target_cursor[j];
                edge.target_end = edge.target_start + edge.count as f64 * target_stack.scale;
                target_cursor[j] = edge.target_end;
            }
        }

        LinearFrame {
            source_nodes,
            target_nodes,
            edges,
        }
    }

    fn stack(&self, n: usize, side_total: usize, max_total: usize, ky: f64) -> Stack {
        let s = &self.settings;
        if n == 0 || side_total == 0 {
            return Stack {
                scale: 0.0,
                padding: s.node_padding,
                offset: s.margin,
            };
        }

        let scale = ky * max_total as f64 / side_total as f64;
        let used = side_total as f64 * scale + (n - 1) as f64 * s.node_padding;
        let extra = (s.height - 2.0 * s.margin - used).max(0.0);
        if n == 1 {
            Stack {
                scale,
                padding: s.node_padding,
                offset: s.margin + extra / 2.0,
            }
        } else {
            Stack {
                scale,
                padding: s.node_padding + extra / (n - 1) as f64,
                offset: s.margin,
            }
        }
    }
}

fn place(nodes: &[&FlowNode], stack: &Stack, side_total: usize, colors: &NodeColors<'_>) -> Vec<NodeExtent> {
    let mut y = stack.offset;
    let mut cumulative = 0usize;
    nodes
        .iter()
        .map(|node| {
            let start = y;
            let end = start + node.aggregate_count as f64 * stack.scale;
            y = end + stack.padding;

            let fraction_start = fraction(cumulative, side_total);
            cumulative += node.aggregate_count;
            NodeExtent {
                label: node.label.clone(),
                side: node.side,
                count: node.aggregate_count,
                start,
                end,
                fraction_start,
                fraction_end: fraction(cumulative, side_total),
                color: colors.color(&node.field_name, &node.label),
            }
        })
        .collect()
}

fn fraction(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}
