//! Flow Aggregator
//!
//! Turns a record set and a (source field, target field) pair into a
//! weighted bipartite graph.
//!
//! **Invariants:**
//! - Every declared source label × declared target label has an edge,
//!   zero-count edges included, so node slots stay stable across pairs
//! - Node counts are the row/column sums of the edge matrix
//! - Both sides sum to the number of eligible records
//!
//! Labels outside the catalog and the `Unknown` label only get slots
//! when observed; they sort after the declared labels (extras
//! lexicographically, `Unknown` last).

use crate::catalog::{CategoryField, FieldCatalog, UNKNOWN_LABEL};
use crate::error::{Error, Result};
use crate::normalize::{normalize_value, DataQualityReport};
use crate::record::ResponseRecord;
use flowviz_common::events::{DiagramStatus, HighlightCursor, LayoutSummary, Side};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Ordered pair of two different catalog fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFieldPair")]
pub struct FieldPair {
    source: String,
    target: String,
}

/// Wire shape of a `FieldPair`, checked by `FieldPair::new` on the way in
#[derive(Deserialize)]
struct RawFieldPair {
    source: String,
    target: String,
}

impl TryFrom<RawFieldPair> for FieldPair {
    type Error = Error;

    fn try_from(raw: RawFieldPair) -> Result<Self> {
        Self::new(raw.source, raw.target)
    }
}

impl FieldPair {
    /// Create a pair, rejecting `source == target`
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let target = target.into();
        if source == target {
            return Err(Error::SelfPairing(source));
        }
        Ok(Self { source, target })
    }

    /// Create a pair whose fields must both exist in `catalog`
    pub fn validated(catalog: &FieldCatalog, source: &str, target: &str) -> Result<Self> {
        catalog.field(source)?;
        catalog.field(target)?;
        Self::new(source, target)
    }

    /// Create a pair, substituting the target when it equals the source
    ///
    /// Substitution policy: the first catalog field (rotation order) other
    /// than the source. Unknown field names are still rejected.
    pub fn resolve(catalog: &FieldCatalog, source: &str, target: &str) -> Result<Self> {
        catalog.field(source)?;
        if source != target {
            return Self::validated(catalog, source, target);
        }

        let substitute = catalog
            .names()
            .find(|name| *name != source)
            .ok_or_else(|| Error::Catalog("catalog has only one field".to_string()))?;
        debug!(
            "Field pair {} → {} is self-referential, substituting target {}",
            source, target, substitute
        );
        Self::new(source, substitute)
    }

    /// First two fields of the catalog
    pub fn default_for(catalog: &FieldCatalog) -> Result<Self> {
        let mut names = catalog.names();
        match (names.next(), names.next()) {
            (Some(source), Some(target)) => Self::new(source, target),
            _ => Err(Error::Catalog("catalog needs at least two fields".to_string())),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Field shown on the given axis
    pub fn field(&self, side: Side) -> &str {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    /// Cursor pointing at node `index` on `side` of this pair
    pub fn cursor(&self, side: Side, index: usize) -> HighlightCursor {
        HighlightCursor {
            side,
            index,
            source_field: self.source.clone(),
            target_field: self.target.clone(),
        }
    }
}

impl std::fmt::Display for FieldPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {}", self.source, self.target)
    }
}

/// One category label on one axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    pub field_name: String,
    pub label: String,
    pub aggregate_count: usize,
    pub side: Side,
}

/// Records sharing a (source label, target label) combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source_label: String,
    pub target_label: String,
    pub count: usize,
}

impl FlowEdge {
    /// Zero-weight placeholder kept for layout stability
    pub fn is_dummy(&self) -> bool {
        self.count == 0
    }
}

/// Weighted bipartite graph for one field pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowGraph {
    pub pair: FieldPair,
    /// Source nodes in canonical order
    pub source_nodes: Vec<FlowNode>,
    /// Target nodes in canonical order
    pub target_nodes: Vec<FlowNode>,
    /// Row-major over source × target, in node order
    pub edges: Vec<FlowEdge>,
    /// Eligible records (after test-data filtering)
    pub total: usize,
    /// Fallbacks applied while normalizing
    pub quality: DataQualityReport,
}

impl FlowGraph {
    /// Graph with no records: empty node and edge lists
    pub fn empty(pair: FieldPair) -> Self {
        Self {
            pair,
            source_nodes: Vec::new(),
            target_nodes: Vec::new(),
            edges: Vec::new(),
            total: 0,
            quality: DataQualityReport::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn nodes(&self, side: Side) -> &[FlowNode] {
        match side {
            Side::Source => &self.source_nodes,
            Side::Target => &self.target_nodes,
        }
    }

    pub fn node(&self, side: Side, label: &str) -> Option<&FlowNode> {
        self.nodes(side).iter().find(|n| n.label == label)
    }

    pub fn edge(&self, source_label: &str, target_label: &str) -> Option<&FlowEdge> {
        self.edges
            .iter()
            .find(|e| e.source_label == source_label && e.target_label == target_label)
    }

    /// Count for an edge, zero when the pair of labels has no slot
    pub fn edge_count(&self, source_label: &str, target_label: &str) -> usize {
        self.edge(source_label, target_label).map_or(0, |e| e.count)
    }

    /// Nodes on either side with a non-zero count
    pub fn active_nodes(&self) -> usize {
        self.source_nodes
            .iter()
            .chain(self.target_nodes.iter())
            .filter(|n| n.aggregate_count > 0)
            .count()
    }

    /// Whether the graph can be drawn
    pub fn status(&self, min_active_nodes: usize) -> DiagramStatus {
        let active_nodes = self.active_nodes();
        if self.total == 0 || active_nodes < min_active_nodes {
            DiagramStatus::InsufficientData {
                eligible: self.total,
                active_nodes,
            }
        } else {
            DiagramStatus::Ready
        }
    }

    /// Event summary of this graph
    pub fn summary(&self, min_active_nodes: usize) -> LayoutSummary {
        LayoutSummary {
            source_field: self.pair.source().to_string(),
            target_field: self.pair.target().to_string(),
            eligible_records: self.total,
            source_nodes: self.source_nodes.len(),
            target_nodes: self.target_nodes.len(),
            quality_issues: self.quality.total(),
            status: self.status(min_active_nodes),
        }
    }

    /// Verify flow conservation
    ///
    /// Holds when both sides and the edge set sum to `total`, every node's
    /// count equals the sum of its edges, and the edge set is the full
    /// cross-product of node labels.
    pub fn check_conservation(&self) -> bool {
        let edge_sum: usize = self.edges.iter().map(|e| e.count).sum();
        let source_sum: usize = self.source_nodes.iter().map(|n| n.aggregate_count).sum();
        let target_sum: usize = self.target_nodes.iter().map(|n| n.aggregate_count).sum();
        if edge_sum != self.total || source_sum != self.total || target_sum != self.total {
            return false;
        }
        if self.edges.len() != self.source_nodes.len() * self.target_nodes.len() {
            return false;
        }

        let rows_ok = self.source_nodes.iter().all(|node| {
            let sum: usize = self
                .edges
                .iter()
                .filter(|e| e.source_label == node.label)
                .map(|e| e.count)
                .sum();
            sum == node.aggregate_count
        });
        let columns_ok = self.target_nodes.iter().all(|node| {
            let sum: usize = self
                .edges
                .iter()
                .filter(|e| e.target_label == node.label)
                .map(|e| e.count)
                .sum();
            sum == node.aggregate_count
        });
        rows_ok && columns_ok
    }
}

/// Aggregate `records` into a bipartite graph for `pair`
///
/// Single pass over the records, then a zero-initialised cross-product of
/// labels overlaid with the observed counts.
///
/// Errors when a field of the pair is not in `catalog`. Zero eligible
/// records is not an error; it yields an empty graph.
pub fn aggregate(
    records: &[ResponseRecord],
    pair: &FieldPair,
    catalog: &FieldCatalog,
    include_test_data: bool,
) -> Result<FlowGraph> {
    let source_field = catalog.field(pair.source())?;
    let target_field = catalog.field(pair.target())?;

    let mut quality = DataQualityReport::new();
    let mut observed: HashMap<(String, String), usize> = HashMap::new();
    let mut source_seen = BTreeSet::new();
    let mut target_seen = BTreeSet::new();
    let mut total = 0usize;

    for record in records.iter().filter(|r| r.is_eligible(include_test_data)) {
        let source = normalize_value(source_field, record.value(pair.source()));
        let target = normalize_value(target_field, record.value(pair.target()));
        if let Some(issue) = source.issue {
            quality.record(pair.source(), issue);
        }
        if let Some(issue) = target.issue {
            quality.record(pair.target(), issue);
        }

        source_seen.insert(source.label.clone());
        target_seen.insert(target.label.clone());
        *observed.entry((source.label, target.label)).or_insert(0) += 1;
        total += 1;
    }

    if total == 0 {
        debug!("No eligible records for {}", pair);
        return Ok(FlowGraph::empty(pair.clone()));
    }

    let source_labels = axis_labels(source_field, &source_seen);
    let target_labels = axis_labels(target_field, &target_seen);

    // Zero-initialised matrix, then overlay observed counts
    let mut matrix = vec![vec![0usize; target_labels.len()]; source_labels.len()];
    let source_index: HashMap<&str, usize> = source_labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect();
    let target_index: HashMap<&str, usize> = target_labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect();
    for ((source, target), count) in &observed {
        if let (Some(&i), Some(&j)) = (
            source_index.get(source.as_str()),
            target_index.get(target.as_str()),
        ) {
            matrix[i][j] += count;
        }
    }

    let source_nodes = source_labels
        .iter()
        .enumerate()
        .map(|(i, label)| FlowNode {
            field_name: pair.source().to_string(),
            label: label.clone(),
            aggregate_count: matrix[i].iter().sum(),
            side: Side::Source,
        })
        .collect();
    let target_nodes = target_labels
        .iter()
        .enumerate()
        .map(|(j, label)| FlowNode {
            field_name: pair.target().to_string(),
            label: label.clone(),
            aggregate_count: matrix.iter().map(|row| row[j]).sum(),
            side: Side::Target,
        })
        .collect();

    let mut edges = Vec::with_capacity(source_labels.len() * target_labels.len());
    for (i, source) in source_labels.iter().enumerate() {
        for (j, target) in target_labels.iter().enumerate() {
            edges.push(FlowEdge {
                source_label: source.clone(),
                target_label: target.clone(),
                count: matrix[i][j],
            });
        }
    }

    let graph = FlowGraph {
        pair: pair.clone(),
        source_nodes,
        target_nodes,
        edges,
        total,
        quality,
    };
    debug_assert!(graph.check_conservation(), "flow conservation violated");

    debug!(
        "Aggregated {} records for {}: {} source nodes, {} target nodes",
        total,
        pair,
        graph.source_nodes.len(),
        graph.target_nodes.len()
    );
    Ok(graph)
}

/// Canonical label order for one axis
///
/// Declared labels first (always present), then observed labels outside
/// the catalog in lexicographic order, then `Unknown` when observed.
pub fn axis_labels(field: &CategoryField, observed: &BTreeSet<String>) -> Vec<String> {
    let mut labels: Vec<String> = field.declared_labels().to_vec();
    labels.extend(
        observed
            .iter()
            .filter(|l| l.as_str() != UNKNOWN_LABEL && !field.is_declared(l))
            .cloned(),
    );
    if observed.contains(UNKNOWN_LABEL) {
        labels.push(UNKNOWN_LABEL.to_string());
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> &'static FieldCatalog {
        FieldCatalog::survey()
    }

    fn years_style() -> FieldPair {
        FieldPair::new("years_at_organization", "learning_style").unwrap()
    }

    #[test]
    fn test_self_pair_rejected() {
        let err = FieldPair::new("learning_style", "learning_style").unwrap_err();
        assert!(matches!(err, Error::SelfPairing(f) if f == "learning_style"));
    }

    #[test]
    fn test_deserialize_goes_through_self_pair_check() {
        let pair: FieldPair =
            serde_json::from_str(r#"{"source": "motivation", "target": "shaped_by"}"#).unwrap();
        assert_eq!(pair.source(), "motivation");

        let err = serde_json::from_str::<FieldPair>(r#"{"source": "motivation", "target": "motivation"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("motivation"));
    }

    #[test]
    fn test_resolve_substitutes_first_other_field() {
        let pair = FieldPair::resolve(survey(), "learning_style", "learning_style").unwrap();
        assert_eq!(pair.source(), "learning_style");
        assert_eq!(pair.target(), "years_at_organization");

        let pair = FieldPair::resolve(survey(), "years_at_organization", "years_at_organization")
            .unwrap();
        assert_eq!(pair.target(), "learning_style");
    }

    #[test]
    fn test_resolve_keeps_valid_pair_and_rejects_unknown() {
        let pair = FieldPair::resolve(survey(), "motivation", "shaped_by").unwrap();
        assert_eq!(pair.to_string(), "motivation → shaped_by");
        assert!(FieldPair::resolve(survey(), "motivation", "nope").is_err());
        assert!(FieldPair::resolve(survey(), "nope", "nope").is_err());
    }

    #[test]
    fn test_default_pair_is_first_two_fields() {
        assert_eq!(FieldPair::default_for(survey()).unwrap(), years_style());
    }

    #[test]
    fn test_zero_records_yield_empty_graph() {
        let graph = aggregate(&[], &years_style(), survey(), false).unwrap();
        assert!(graph.is_empty());
        assert!(graph.source_nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert!(!graph.status(2).is_ready());
        assert!(graph.check_conservation());
    }

    #[test]
    fn test_only_test_data_counts_as_zero_records() {
        let records = vec![ResponseRecord::new().with_years(2.0).as_test_data()];
        let graph = aggregate(&records, &years_style(), survey(), false).unwrap();
        assert!(graph.is_empty());

        let graph = aggregate(&records, &years_style(), survey(), true).unwrap();
        assert_eq!(graph.total, 1);
    }

    #[test]
    fn test_unknown_field_in_pair_is_error() {
        let pair = FieldPair::new("years_at_organization", "shoe_size").unwrap();
        let err = aggregate(&[], &pair, survey(), false).unwrap_err();
        assert!(matches!(err, Error::UnknownField(_)));
    }

    #[test]
    fn test_cross_product_includes_dummy_edges() {
        let records = vec![ResponseRecord::new()
            .with_years(3.0)
            .with_answer("learning_style", "visual")];
        let graph = aggregate(&records, &years_style(), survey(), false).unwrap();

        assert_eq!(graph.source_nodes.len(), 5);
        assert_eq!(graph.target_nodes.len(), 4);
        assert_eq!(graph.edges.len(), 20);
        assert_eq!(graph.edges.iter().filter(|e| e.is_dummy()).count(), 19);
        assert_eq!(graph.edge_count("0-5", "visual"), 1);
        assert!(graph.check_conservation());
    }

    #[test]
    fn test_missing_and_novel_labels_get_trailing_slots() {
        let records = vec![
            ResponseRecord::new().with_years(3.0),
            ResponseRecord::new()
                .with_years(8.0)
                .with_answer("learning_style", "musical"),
            ResponseRecord::new()
                .with_years(30.0)
                .with_answer("learning_style", "visual"),
        ];
        let graph = aggregate(&records, &years_style(), survey(), false).unwrap();

        let labels: Vec<&str> = graph.target_nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["auditory", "kinesthetic", "reading_writing", "visual", "musical", "Unknown"]
        );
        assert_eq!(graph.node(Side::Target, "Unknown").unwrap().aggregate_count, 1);
        assert_eq!(graph.node(Side::Target, "musical").unwrap().aggregate_count, 1);
        assert_eq!(graph.quality.field("learning_style").missing, 1);
        assert_eq!(graph.quality.field("learning_style").unknown_label, 1);
        assert!(graph.check_conservation());
    }

    #[test]
    fn test_status_thresholds() {
        let records = vec![ResponseRecord::new()
            .with_years(3.0)
            .with_answer("learning_style", "visual")];
        let graph = aggregate(&records, &years_style(), survey(), false).unwrap();

        assert_eq!(graph.active_nodes(), 2);
        assert!(graph.status(2).is_ready());
        assert_eq!(
            graph.status(3),
            DiagramStatus::InsufficientData {
                eligible: 1,
                active_nodes: 2
            }
        );

        let summary = graph.summary(2);
        assert_eq!(summary.eligible_records, 1);
        assert_eq!(summary.source_nodes, 5);
        assert!(summary.status.is_ready());
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let records: Vec<ResponseRecord> = (0..40)
            .map(|i| {
                ResponseRecord::new()
                    .with_years((i % 25) as f64)
                    .with_answer("learning_style", ["visual", "auditory", "kinesthetic"][i % 3])
            })
            .collect();

        let first = aggregate(&records, &years_style(), survey(), false).unwrap();
        let second = aggregate(&records, &years_style(), survey(), false).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cursor_carries_pair() {
        let cursor = years_style().cursor(Side::Target, 3);
        assert_eq!(cursor.side, Side::Target);
        assert_eq!(cursor.index, 3);
        assert_eq!(cursor.source_field, "years_at_organization");
        assert_eq!(cursor.target_field, "learning_style");
    }
}
