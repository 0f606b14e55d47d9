//! Radial (chord) layout
//!
//! Angles are radians measured clockwise from 12 o'clock. Target nodes
//! occupy the right half, source nodes the left half; each half starts
//! at the top so node 0 sits nearest 12 o'clock on both sides. The two
//! halves are separated by `side_gap_degrees` at 12 and 6 o'clock.

use super::{edge_counts, NodeOrder};
use crate::aggregate::{FlowGraph, FlowNode};
use crate::theme::NodeColors;
use flowviz_common::config::RadialSettings;
use flowviz_common::events::Side;
use serde::Serialize;
use std::f64::consts::{PI, TAU};

/// Cartesian point for `angle` on a circle of `radius` centred at the origin
///
/// Screen coordinates: y grows downwards, so 12 o'clock is `(0, -radius)`.
pub fn polar(angle: f64, radius: f64) -> (f64, f64) {
    (radius * angle.sin(), -radius * angle.cos())
}

/// Arc of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcExtent {
    pub label: String,
    pub side: Side,
    pub count: usize,
    pub start_angle: f64,
    pub end_angle: f64,
    pub color: String,
}

impl ArcExtent {
    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    /// Label anchor angle
    pub fn mid_angle(&self) -> f64 {
        (self.start_angle + self.end_angle) / 2.0
    }
}

/// Angular sub-span of a node arc; `start_angle <= end_angle`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubArc {
    pub start_angle: f64,
    pub end_angle: f64,
}

/// Ribbon joining a source sub-arc to a target sub-arc
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ribbon {
    pub source_label: String,
    pub target_label: String,
    pub count: usize,
    pub source: SubArc,
    pub target: SubArc,
}

/// Complete chord geometry for one graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RadialFrame {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub source_arcs: Vec<ArcExtent>,
    pub target_arcs: Vec<ArcExtent>,
    /// Row-major over displayed source × target order
    pub ribbons: Vec<Ribbon>,
}

impl RadialFrame {
    pub fn is_empty(&self) -> bool {
        self.source_arcs.is_empty() && self.target_arcs.is_empty()
    }
}

/// Chord layout engine
#[derive(Debug, Clone, PartialEq)]
pub struct RadialLayout {
    settings: RadialSettings,
}

/// Angular budget for one half
struct Half {
    /// Radians per record
    scale: f64,
    pad: f64,
    /// Angle nearest 12 o'clock
    top: f64,
    /// +1 clockwise (target half), -1 counter-clockwise (source half)
    direction: f64,
}

impl Half {
    /// Arc `[a, b]` covering `width` radians starting `offset` from the top
    fn span(&self, offset: f64, width: f64) -> SubArc {
        let a = self.top + self.direction * offset;
        let b = self.top + self.direction * (offset + width);
        SubArc {
            start_angle: a.min(b),
            end_angle: a.max(b),
        }
    }
}

impl RadialLayout {
    pub fn new(settings: RadialSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RadialSettings {
        &self.settings
    }

    pub fn compute(&self, graph: &FlowGraph, order: &NodeOrder, colors: &NodeColors<'_>) -> RadialFrame {
        let sources = order.nodes(graph, Side::Source);
        let targets = order.nodes(graph, Side::Target);
        let source_total: usize = sources.iter().map(|n| n.aggregate_count).sum();
        let target_total: usize = targets.iter().map(|n| n.aggregate_count).sum();
        if source_total == 0 && target_total == 0 {
            return RadialFrame::default();
        }

        let gap = self.settings.side_gap_degrees.to_radians().clamp(0.0, PI);
        let target_half = self.half(targets.len(), target_total, gap / 2.0, 1.0, gap);
        let source_half = self.half(sources.len(), source_total, TAU - gap / 2.0, -1.0, gap);

        let source_offsets = offsets(&sources, &source_half);
        let target_offsets = offsets(&targets, &target_half);
        let source_arcs = arcs(&sources, &source_offsets, &source_half, colors);
        let target_arcs = arcs(&targets, &target_offsets, &target_half, colors);

        // Sub-arcs walk each node from its 12-o'clock end, in the
        // opposite axis's display order
        let counts = edge_counts(graph);
        let mut source_used = vec![0.0; sources.len()];
        let mut target_used = vec![0.0; targets.len()];
        let mut ribbons = Vec::with_capacity(sources.len() * targets.len());
        for (i, source) in sources.iter().enumerate() {
            for target in &targets {
                let count = counts
                    .get(&(source.label.as_str(), target.label.as_str()))
                    .copied()
                    .unwrap_or(0);
                let source_width = count as f64 * source_half.scale;
                let source_arc = source_half.span(source_offsets[i] + source_used[i], source_width);
                source_used[i] += source_width;

                ribbons.push(Ribbon {
                    source_label: source.label.clone(),
                    target_label: target.label.clone(),
                    count,
                    source: source_arc,
                    target: SubArc {
                        start_angle: 0.0,
                        end_angle: 0.0,
                    },
                });
            }
        }
        for j in 0..targets.len() {
            for i in 0..sources.len() {
                let ribbon = &mut ribbons[i * targets.len() + j];
                let width = ribbon.count as f64 * target_half.scale;
                ribbon.target = target_half.span(target_offsets[j] + target_used[j], width);
                target_used[j] += width;
            }
        }

        RadialFrame {
            inner_radius: self.settings.inner_radius,
            outer_radius: self.settings.outer_radius,
            source_arcs,
            target_arcs,
            ribbons,
        }
    }

    fn half(&self, n: usize, total: usize, top: f64, direction: f64, gap: f64) -> Half {
        let extent = PI - gap;
        let mut pad = self.settings.pad_degrees.to_radians().max(0.0);
        let gaps = n.saturating_sub(1) as f64;
        if gaps * pad >= extent {
            pad = 0.0;
        }
        let scale = if total == 0 {
            0.0
        } else {
            (extent - gaps * pad) / total as f64
        };
        Half {
            scale,
            pad,
            top,
            direction,
        }
    }
}

/// Offset of each node from its half's top
fn offsets(nodes: &[&FlowNode], half: &Half) -> Vec<f64> {
    let mut offset = 0.0;
    nodes
        .iter()
        .map(|node| {
            let start = offset;
            offset += node.aggregate_count as f64 * half.scale + half.pad;
            start
        })
        .collect()
}

fn arcs(nodes: &[&FlowNode], offsets: &[f64], half: &Half, colors: &NodeColors<'_>) -> Vec<ArcExtent> {
    nodes
        .iter()
        .zip(offsets)
        .map(|(node, &offset)| {
            let span = half.span(offset, node.aggregate_count as f64 * half.scale);
            ArcExtent {
                label: node.label.clone(),
                side: node.side,
                count: node.aggregate_count,
                start_angle: span.start_angle,
                end_angle: span.end_angle,
                color: colors.color(&node.field_name, &node.label),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, FieldPair};
    use crate::catalog::FieldCatalog;
    use crate::record::ResponseRecord;
    use crate::theme::ConfiguredTheme;

    const EPS: f64 = 1e-9;

    fn graph() -> FlowGraph {
        let data = [
            (2.0, "visual"),
            (2.0, "visual"),
            (7.0, "auditory"),
            (12.0, "visual"),
            (22.0, "kinesthetic"),
            (22.0, "visual"),
        ];
        let records: Vec<ResponseRecord> = data
            .iter()
            .map(|(y, s)| ResponseRecord::new().with_years(*y).with_answer("learning_style", s))
            .collect();
        let pair = FieldPair::new("years_at_organization", "learning_style").unwrap();
        aggregate(&records, &pair, FieldCatalog::survey(), false).unwrap()
    }

    fn compute(graph: &FlowGraph) -> RadialFrame {
        let theme = ConfiguredTheme::default();
        RadialLayout::new(RadialSettings::default()).compute(
            graph,
            &NodeOrder::canonical(graph),
            &NodeColors::new(&theme, true),
        )
    }

    #[test]
    fn test_halves_are_disjoint() {
        let frame = compute(&graph());
        for arc in &frame.target_arcs {
            assert!(arc.start_angle >= 0.0 && arc.end_angle <= PI + EPS, "{}", arc.label);
        }
        for arc in &frame.source_arcs {
            assert!(arc.start_angle >= PI - EPS && arc.end_angle <= TAU + EPS, "{}", arc.label);
        }
    }

    #[test]
    fn test_first_node_nearest_top() {
        let settings = RadialSettings::default();
        let half_gap = settings.side_gap_degrees.to_radians() / 2.0;
        let frame = compute(&graph());

        assert!((frame.target_arcs[0].start_angle - half_gap).abs() < EPS);
        assert!((frame.source_arcs[0].end_angle - (TAU - half_gap)).abs() < EPS);
        // Source arcs descend from 12 o'clock towards 6 o'clock
        for pair in frame.source_arcs.windows(2) {
            assert!(pair[1].end_angle <= pair[0].start_angle + EPS);
        }
    }

    #[test]
    fn test_sweeps_proportional_and_fill_half() {
        let settings = RadialSettings::default();
        let gap = settings.side_gap_degrees.to_radians();
        let pad = settings.pad_degrees.to_radians();
        let frame = compute(&graph());

        let n = frame.target_arcs.len() as f64;
        let sweep: f64 = frame.target_arcs.iter().map(ArcExtent::sweep).sum();
        assert!((sweep + (n - 1.0) * pad - (PI - gap)).abs() < 1e-9);

        let visual = frame.target_arcs.iter().find(|a| a.label == "visual").unwrap();
        let auditory = frame.target_arcs.iter().find(|a| a.label == "auditory").unwrap();
        assert!((visual.sweep() - 4.0 * auditory.sweep()).abs() < EPS);
    }

    #[test]
    fn test_ribbons_partition_arcs() {
        let frame = compute(&graph());
        let n_targets = frame.target_arcs.len();
        assert_eq!(frame.ribbons.len(), frame.source_arcs.len() * n_targets);

        for (i, arc) in frame.source_arcs.iter().enumerate() {
            let total: f64 = frame.ribbons[i * n_targets..(i + 1) * n_targets]
                .iter()
                .map(|r| r.source.end_angle - r.source.start_angle)
                .sum();
            assert!((total - arc.sweep()).abs() < EPS, "{}", arc.label);
        }
        for (j, arc) in frame.target_arcs.iter().enumerate() {
            let column: Vec<&Ribbon> = frame.ribbons.iter().skip(j).step_by(n_targets).collect();
            let total: f64 = column
                .iter()
                .map(|r| r.target.end_angle - r.target.start_angle)
                .sum();
            assert!((total - arc.sweep()).abs() < EPS, "{}", arc.label);
            assert!((column[0].target.start_angle - arc.start_angle).abs() < EPS);
        }
    }

    #[test]
    fn test_compute_is_idempotent_and_empty_safe() {
        let graph = graph();
        assert_eq!(compute(&graph), compute(&graph));

        let pair = FieldPair::new("years_at_organization", "learning_style").unwrap();
        assert!(compute(&FlowGraph::empty(pair)).is_empty());
    }

    #[test]
    fn test_polar_orientation() {
        let (x, y) = polar(0.0, 10.0);
        assert!(x.abs() < EPS && (y + 10.0).abs() < EPS);
        let (x, y) = polar(PI / 2.0, 10.0);
        assert!((x - 10.0).abs() < EPS && y.abs() < EPS);
    }
}
