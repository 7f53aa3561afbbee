//! Core domain types for the impact-analysis graph views.
//!
//! The analysis backend delivers graphs as loosely-shaped JSON: node entries
//! may be bare identifier strings or structured records, and edges may lack
//! explicit ids. Everything here funnels through [`GraphSnapshot::from_raw`]
//! exactly once, so downstream code only ever sees the canonical shapes.

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Canonical Graph Types
// =============================================================================

/// A node in a graph snapshot, fully normalized.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier within the snapshot (file, function, or class name).
    pub id: String,
    /// Human readable label; equals `id` when the source entry was a bare string.
    pub label: String,
}

/// A directed edge between two node ids.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Unique identifier within the snapshot; `e{index}` when the service
    /// omitted one.
    pub id: String,
    /// Originating node id.
    pub source: String,
    /// Destination node id.
    pub target: String,
    /// Optional relationship label ("imports", "calls", etc.).
    pub label: Option<String>,
}

/// The complete node+edge set for one graph view.
///
/// A snapshot is created fresh on every successful fetch and replaces the
/// prior snapshot wholesale; it is never patched incrementally.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// All nodes, in service order.
    pub nodes: Vec<GraphNode>,
    /// All edges, in service order.
    pub edges: Vec<GraphEdge>,
    /// Designated root node id, carried by repo-tree graphs and used by
    /// hierarchical layouts.
    pub root: Option<String>,
}

// =============================================================================
// Raw Wire Shapes
// =============================================================================

/// A node entry as delivered by the service: either a bare identifier or a
/// structured record. Resolved into [`GraphNode`] at the ingestion boundary
/// and never re-inspected downstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNodeEntry {
    /// Bare identifier; id doubles as label.
    Bare(String),
    /// Structured record with an optional label.
    Record {
        /// Node identifier.
        id: String,
        /// Display label; falls back to `id` when absent.
        label: Option<String>,
    },
}

/// An edge entry as delivered by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEdgeEntry {
    /// Edge identifier; auto-assigned from the positional index when absent.
    pub id: Option<String>,
    /// Originating node id.
    pub source: String,
    /// Destination node id.
    pub target: String,
    /// Optional relationship label.
    pub label: Option<String>,
}

/// Whole response body for the neighborhood and repo-tree endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGraphResponse {
    /// Raw node entries; missing field treated as empty.
    #[serde(default)]
    pub nodes: Vec<RawNodeEntry>,
    /// Raw edge entries; missing field treated as empty.
    #[serde(default)]
    pub edges: Vec<RawEdgeEntry>,
    /// Root node id for hierarchical layouts (repo-tree only).
    #[serde(default)]
    pub root: Option<String>,
}

impl GraphSnapshot {
    /// Creates an empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalizes a raw service response into the canonical snapshot shape.
    ///
    /// Bare-string node entries become nodes with `label == id`; edges
    /// without an explicit id receive a deterministic positional id `e{idx}`.
    pub fn from_raw(raw: RawGraphResponse) -> Self {
        let nodes = raw
            .nodes
            .into_iter()
            .map(|entry| match entry {
                RawNodeEntry::Bare(id) => GraphNode {
                    label: id.clone(),
                    id,
                },
                RawNodeEntry::Record { id, label } => GraphNode {
                    label: label.unwrap_or_else(|| id.clone()),
                    id,
                },
            })
            .collect();

        let edges = raw
            .edges
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| GraphEdge {
                id: entry.id.unwrap_or_else(|| format!("e{}", idx)),
                source: entry.source,
                target: entry.target,
                label: entry.label,
            })
            .collect();

        Self {
            nodes,
            edges,
            root: raw.root,
        }
    }

    /// Returns the number of nodes currently tracked.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges currently tracked.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True when the snapshot has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Convert to a petgraph `StableDiGraph` for layout and rendering.
    /// Returns the graph and a mapping from node id to `NodeIndex`.
    ///
    /// Edges referencing a missing node id are dropped silently; the service
    /// response is trusted but not validated.
    pub fn to_petgraph(
        &self,
    ) -> (
        StableDiGraph<GraphNode, Option<String>>,
        HashMap<String, NodeIndex>,
    ) {
        let mut graph = StableDiGraph::new();
        let mut id_to_index = HashMap::new();

        for node in &self.nodes {
            let idx = graph.add_node(node.clone());
            id_to_index.insert(node.id.clone(), idx);
        }

        for edge in &self.edges {
            if let (Some(&from_idx), Some(&to_idx)) = (
                id_to_index.get(&edge.source),
                id_to_index.get(&edge.target),
            ) {
                graph.add_edge(from_idx, to_idx, edge.label.clone());
            }
        }

        (graph, id_to_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_from_json(value: serde_json::Value) -> RawGraphResponse {
        serde_json::from_value(value).expect("valid raw graph json")
    }

    #[test]
    fn test_bare_string_nodes_get_label_equal_to_id() {
        let raw = raw_from_json(json!({
            "nodes": ["main.py", "calculate_sum", "test_main.py"],
            "edges": []
        }));

        let snapshot = GraphSnapshot::from_raw(raw);
        assert_eq!(snapshot.node_count(), 3);
        for node in &snapshot.nodes {
            assert_eq!(node.label, node.id);
        }
    }

    #[test]
    fn test_structured_nodes_keep_label_and_fall_back_to_id() {
        let raw = raw_from_json(json!({
            "nodes": [
                {"id": "a", "label": "Module A"},
                {"id": "b"}
            ],
            "edges": []
        }));

        let snapshot = GraphSnapshot::from_raw(raw);
        assert_eq!(snapshot.nodes[0].label, "Module A");
        assert_eq!(snapshot.nodes[1].label, "b");
    }

    #[test]
    fn test_mixed_node_shapes_normalize_to_one_form() {
        let raw = raw_from_json(json!({
            "nodes": ["bare", {"id": "rec", "label": "Record"}],
            "edges": []
        }));

        let snapshot = GraphSnapshot::from_raw(raw);
        assert_eq!(
            snapshot.nodes,
            vec![
                GraphNode {
                    id: "bare".into(),
                    label: "bare".into()
                },
                GraphNode {
                    id: "rec".into(),
                    label: "Record".into()
                },
            ]
        );
    }

    #[test]
    fn test_missing_edge_ids_are_positional_and_distinct() {
        let raw = raw_from_json(json!({
            "nodes": ["a", "b", "c"],
            "edges": [
                {"source": "a", "target": "b"},
                {"id": "custom", "source": "b", "target": "c"},
                {"source": "c", "target": "a"}
            ]
        }));

        let snapshot = GraphSnapshot::from_raw(raw);
        let ids: Vec<&str> = snapshot.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e0", "custom", "e2"]);

        // Re-normalizing identical input yields identical ids.
        let raw_again = raw_from_json(json!({
            "nodes": ["a", "b", "c"],
            "edges": [
                {"source": "a", "target": "b"},
                {"id": "custom", "source": "b", "target": "c"},
                {"source": "c", "target": "a"}
            ]
        }));
        assert_eq!(snapshot, GraphSnapshot::from_raw(raw_again));
    }

    #[test]
    fn test_dangling_edges_are_dropped_in_petgraph() {
        let raw = raw_from_json(json!({
            "nodes": ["a", "b"],
            "edges": [
                {"source": "a", "target": "b"},
                {"source": "a", "target": "missing"},
                {"source": "ghost", "target": "b"}
            ]
        }));

        let snapshot = GraphSnapshot::from_raw(raw);
        // The snapshot keeps all three edges...
        assert_eq!(snapshot.edge_count(), 3);

        // ...but only the resolvable one survives conversion.
        let (graph, index) = snapshot.to_petgraph();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(index.contains_key("a"));
        assert!(index.contains_key("b"));
    }

    #[test]
    fn test_root_is_carried_through_normalization() {
        let raw = raw_from_json(json!({
            "nodes": ["src", "src/main.py"],
            "edges": [{"source": "src", "target": "src/main.py"}],
            "root": "src"
        }));

        let snapshot = GraphSnapshot::from_raw(raw);
        assert_eq!(snapshot.root.as_deref(), Some("src"));
    }

    #[test]
    fn test_empty_response_yields_empty_snapshot() {
        let snapshot = GraphSnapshot::from_raw(raw_from_json(json!({})));
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.edge_count(), 0);
        assert!(snapshot.root.is_none());
    }
}
