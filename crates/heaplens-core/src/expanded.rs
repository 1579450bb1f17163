//! Eagerly materialized snapshot store.
//!
//! [`ExpandedSnapshot`] builds one value object per node and per edge up
//! front, with bidirectional adjacency, for callers that make repeated
//! graph walks and are willing to pay full materialization cost. The
//! graph lives in a petgraph `DiGraph` with an id-to-index map on the
//! side; the map is insertion-ordered so linear scans visit nodes in
//! node-table order, matching the compact store.

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use crate::edge::{Edge, EdgeData, EdgeKind};
use crate::error::SnapshotError;
use crate::id::NodeId;
use crate::node::Node;
use crate::payload::{
    SnapshotPayload, EDGE_DATA, EDGE_FIELD_COUNT, EDGE_FROM, EDGE_TO, EDGE_TYPE,
    NODE_CLASS_NAME, NODE_FIELD_COUNT, NODE_FLAGS, NODE_ID, NODE_SIZE,
};
use crate::store::{build_categories, count_allocation_buckets, ClassCategory, SnapshotStore};

/// Edge attributes stored as the graph's edge weight. Endpoints live in
/// the graph structure itself.
#[derive(Debug, Clone)]
struct EdgeWeight {
    kind: EdgeKind,
    data: EdgeData,
}

/// Snapshot store with fully materialized nodes, edges, and adjacency.
#[derive(Debug, Clone)]
pub struct ExpandedSnapshot {
    graph: DiGraph<Node, EdgeWeight>,
    /// Node identifier to graph index, in node-table insertion order.
    id_to_index: IndexMap<NodeId, NodeIndex>,
    total_size: u64,
}

impl ExpandedSnapshot {
    /// Builds an expanded store from a raw payload.
    ///
    /// One pass over the nodes materializes a [`Node`] per record
    /// (decoding flags); one pass over the edges materializes each edge,
    /// resolving named data, and links both endpoints' adjacency.
    ///
    /// # Errors
    ///
    /// Payload-shape violations surface from
    /// [`SnapshotPayload::validate`]. Additionally fails with
    /// [`SnapshotError::InvalidPayload`] on a duplicate node id, an edge
    /// endpoint naming no node, a missing root node (id 0), a root with
    /// no outgoing edges, or a root with incoming edges. On failure no
    /// partial store escapes.
    pub fn from_payload(payload: SnapshotPayload) -> Result<Self, SnapshotError> {
        payload.validate()?;

        let node_count = payload.node_count();
        let edge_count = payload.edge_count();
        let mut graph = DiGraph::with_capacity(node_count, edge_count);
        let mut id_to_index: IndexMap<NodeId, NodeIndex> = IndexMap::with_capacity(node_count);
        let mut total_size: u64 = 0;

        for record in payload.nodes.chunks_exact(NODE_FIELD_COUNT) {
            let class_index = record[NODE_CLASS_NAME] as usize;
            let node = Node::from_raw(
                record[NODE_ID],
                record[NODE_SIZE],
                payload.node_class_names[class_index].clone(),
                record[NODE_FLAGS],
            );
            let id = node.id;
            total_size = total_size.checked_add(node.size).ok_or_else(|| {
                SnapshotError::InvalidPayload {
                    reason: format!("node sizes overflow u64 at node id {id}"),
                }
            })?;
            let index = graph.add_node(node);
            if id_to_index.insert(id, index).is_some() {
                return Err(SnapshotError::InvalidPayload {
                    reason: format!("duplicate node id {id}"),
                });
            }
        }

        let Some(&root_index) = id_to_index.get(&NodeId::ROOT) else {
            return Err(SnapshotError::InvalidPayload {
                reason: "root node (id 0) is missing".to_string(),
            });
        };

        for (ordinal, record) in payload.edges.chunks_exact(EDGE_FIELD_COUNT).enumerate() {
            let from = NodeId(record[EDGE_FROM]);
            let to = NodeId(record[EDGE_TO]);
            let (Some(&from_index), Some(&to_index)) =
                (id_to_index.get(&from), id_to_index.get(&to))
            else {
                return Err(SnapshotError::InvalidPayload {
                    reason: format!("edge record {ordinal} references unknown node ({from} -> {to})"),
                });
            };

            let kind = EdgeKind::parse(&payload.edge_types[record[EDGE_TYPE] as usize]);
            let data = if kind.is_named() {
                EdgeData::Name(payload.edge_names[record[EDGE_DATA] as usize].clone())
            } else {
                EdgeData::Raw(record[EDGE_DATA])
            };
            graph.add_edge(from_index, to_index, EdgeWeight { kind, data });
        }

        if graph
            .edges_directed(root_index, Direction::Incoming)
            .next()
            .is_some()
        {
            return Err(SnapshotError::InvalidPayload {
                reason: "root node has incoming edges".to_string(),
            });
        }
        if graph
            .edges_directed(root_index, Direction::Outgoing)
            .next()
            .is_none()
        {
            return Err(SnapshotError::InvalidPayload {
                reason: "root node has no outgoing edges".to_string(),
            });
        }

        debug!(
            nodes = node_count,
            edges = edge_count,
            total_size,
            "built expanded snapshot store"
        );

        Ok(ExpandedSnapshot {
            graph,
            id_to_index,
            total_size,
        })
    }

    /// Parses a payload from JSON and builds an expanded store from it.
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        Self::from_payload(SnapshotPayload::from_json_str(json)?)
    }

    fn index_of(&self, id: NodeId) -> Result<NodeIndex, SnapshotError> {
        self.id_to_index
            .get(&id)
            .copied()
            .ok_or(SnapshotError::NodeNotFound { id })
    }

    /// The node's incoming edges in edge-table order.
    ///
    /// Only the expanded store maintains reverse adjacency; the compact
    /// store exposes outgoing edges only.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NodeNotFound`] if no node has this id.
    pub fn incoming_edges(&self, id: NodeId) -> Result<Vec<Edge>, SnapshotError> {
        let index = self.index_of(id)?;
        let mut edges: Vec<Edge> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| Edge {
                from: self.graph[edge.source()].id,
                to: id,
                kind: edge.weight().kind.clone(),
                data: edge.weight().data.clone(),
            })
            .collect();
        // petgraph walks adjacency most-recent-first; restore input order.
        edges.reverse();
        Ok(edges)
    }
}

impl SnapshotStore for ExpandedSnapshot {
    fn node_with_identifier(&self, id: NodeId) -> Result<Node, SnapshotError> {
        let index = self.index_of(id)?;
        Ok(self.graph[index].clone())
    }

    fn nodes_with_class_name(&self, class_name: &str) -> Vec<Node> {
        self.id_to_index
            .values()
            .map(|&index| &self.graph[index])
            .filter(|node| !node.is_root() && node.class_name == class_name)
            .cloned()
            .collect()
    }

    fn outgoing_edges(&self, id: NodeId) -> Result<Vec<Edge>, SnapshotError> {
        let index = self.index_of(id)?;
        let mut edges: Vec<Edge> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| Edge {
                from: id,
                to: self.graph[edge.target()].id,
                kind: edge.weight().kind.clone(),
                data: edge.weight().data.clone(),
            })
            .collect();
        // petgraph walks adjacency most-recent-first; restore input order.
        edges.reverse();
        Ok(edges)
    }

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn total_size(&self) -> u64 {
        self.total_size
    }

    fn allocation_bucket_counts(&self, bucket_sizes: &[u64]) -> Vec<usize> {
        count_allocation_buckets(
            self.id_to_index
                .values()
                .map(|&index| &self.graph[index])
                .filter(|node| !node.is_root())
                .map(|node| node.size),
            bucket_sizes,
        )
    }

    fn class_categories(&self) -> Vec<ClassCategory> {
        build_categories(
            self.id_to_index
                .values()
                .map(|&index| &self.graph[index])
                .filter(|node| !node.is_root())
                .map(|node| (node.class_name.as_str(), node.size, node.internal)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> SnapshotPayload {
        SnapshotPayload {
            version: 2,
            snapshot_type: None,
            nodes: vec![
                0, 0, 0, 0, // <root>
                1, 32, 1, 0, // Object
                2, 16, 2, 1, // Array, internal
                3, 8, 3, 2, // String, object-type
            ],
            node_class_names: vec![
                "<root>".to_string(),
                "Object".to_string(),
                "Array".to_string(),
                "String".to_string(),
            ],
            edges: vec![
                0, 1, 1, 0, // root -> 1, Property "a"
                0, 2, 2, 1, // root -> 2, Variable "b"
                1, 3, 3, 7, // 1 -> 3, Index 7
                2, 3, 0, 99, // 2 -> 3, Internal
            ],
            edge_types: vec![
                "Internal".to_string(),
                "Property".to_string(),
                "Variable".to_string(),
                "Index".to_string(),
            ],
            edge_names: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[test]
    fn materializes_nodes_with_decoded_flags() {
        let store = ExpandedSnapshot::from_payload(sample_payload()).unwrap();

        let node = store.node_with_identifier(NodeId(2)).unwrap();
        assert_eq!(node.class_name, "Array");
        assert_eq!(node.size, 16);
        assert!(node.internal);
        assert!(!node.is_object_type);

        let node = store.node_with_identifier(NodeId(3)).unwrap();
        assert!(!node.internal);
        assert!(node.is_object_type);
    }

    #[test]
    fn missing_node_is_not_found() {
        let store = ExpandedSnapshot::from_payload(sample_payload()).unwrap();
        let err = store.node_with_identifier(NodeId(42)).unwrap_err();
        assert!(matches!(err, SnapshotError::NodeNotFound { id: NodeId(42) }));
    }

    #[test]
    fn outgoing_edges_preserve_input_order() {
        let store = ExpandedSnapshot::from_payload(sample_payload()).unwrap();
        let edges = store.outgoing_edges(NodeId::ROOT).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].to, NodeId(1));
        assert_eq!(edges[0].data, EdgeData::Name("a".to_string()));
        assert_eq!(edges[1].to, NodeId(2));
        assert_eq!(edges[1].data, EdgeData::Name("b".to_string()));
    }

    #[test]
    fn incoming_edges_preserve_input_order() {
        let store = ExpandedSnapshot::from_payload(sample_payload()).unwrap();
        let edges = store.incoming_edges(NodeId(3)).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].from, NodeId(1));
        assert_eq!(edges[0].kind, EdgeKind::Index);
        assert_eq!(edges[1].from, NodeId(2));
        assert_eq!(edges[1].kind, EdgeKind::Internal);
    }

    #[test]
    fn node_without_edges_yields_empty_sequences() {
        let store = ExpandedSnapshot::from_payload(sample_payload()).unwrap();
        assert!(store.outgoing_edges(NodeId(3)).unwrap().is_empty());
        assert!(store.incoming_edges(NodeId(1)).unwrap().len() == 1);
        assert!(store.incoming_edges(NodeId::ROOT).unwrap().is_empty());
    }

    #[test]
    fn class_scan_skips_root() {
        let store = ExpandedSnapshot::from_payload(sample_payload()).unwrap();
        assert!(store.nodes_with_class_name("<root>").is_empty());
        let arrays = store.nodes_with_class_name("Array");
        assert_eq!(arrays.len(), 1);
        assert_eq!(arrays[0].id, NodeId(2));
    }

    #[test]
    fn counts_and_categories() {
        let store = ExpandedSnapshot::from_payload(sample_payload()).unwrap();
        assert_eq!(store.node_count(), 4);
        assert_eq!(store.edge_count(), 4);
        assert_eq!(store.total_size(), 56);

        let categories = store.class_categories();
        assert_eq!(categories[0].class_name, "Object");
        assert_eq!(categories[1].class_name, "Array");
    }

    #[test]
    fn bucket_counts_skip_root() {
        let store = ExpandedSnapshot::from_payload(sample_payload()).unwrap();
        // Non-root sizes 32, 16, 8; the root's 0 must not land in a bucket.
        assert_eq!(store.allocation_bucket_counts(&[16, 64]), vec![1, 2, 0]);
    }

    #[test]
    fn rejects_overflowing_total_size() {
        let mut payload = sample_payload();
        payload.nodes[5] = u64::MAX; // node 1
        payload.nodes[9] = u64::MAX; // node 2
        let err = ExpandedSnapshot::from_payload(payload).unwrap_err();
        match err {
            SnapshotError::InvalidPayload { reason } => {
                assert!(reason.contains("overflow"));
            }
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_node_id() {
        let mut payload = sample_payload();
        payload.nodes[8] = 1; // third node claims id 1
        assert!(matches!(
            ExpandedSnapshot::from_payload(payload),
            Err(SnapshotError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn rejects_unknown_edge_endpoint() {
        let mut payload = sample_payload();
        payload.edges[9] = 42; // 1 -> unknown toId
        assert!(matches!(
            ExpandedSnapshot::from_payload(payload),
            Err(SnapshotError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn rejects_missing_root() {
        let mut payload = sample_payload();
        payload.nodes[0] = 9;
        payload.edges = vec![9, 1, 0, 0];
        let err = ExpandedSnapshot::from_payload(payload).unwrap_err();
        match err {
            SnapshotError::InvalidPayload { reason } => assert!(reason.contains("root")),
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[test]
    fn rejects_root_with_incoming_edges() {
        let mut payload = sample_payload();
        payload.edges = vec![
            0, 1, 1, 0, //
            1, 0, 0, 0, // 1 -> root
        ];
        let err = ExpandedSnapshot::from_payload(payload).unwrap_err();
        match err {
            SnapshotError::InvalidPayload { reason } => {
                assert!(reason.contains("incoming"));
            }
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[test]
    fn rejects_root_without_outgoing_edges() {
        let mut payload = sample_payload();
        payload.edges = vec![1, 3, 3, 0]; // only a non-root edge
        let err = ExpandedSnapshot::from_payload(payload).unwrap_err();
        match err {
            SnapshotError::InvalidPayload { reason } => {
                assert!(reason.contains("no outgoing"));
            }
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }
}
