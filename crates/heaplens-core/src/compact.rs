//! Flat-table snapshot store with lazy views.
//!
//! [`CompactSnapshot`] keeps node and edge data in fixed-stride tables --
//! five fields per node slot (the four payload fields plus a first-edge
//! offset), four per edge slot -- with a single id-to-ordinal map on the
//! side. Queries manufacture lightweight [`NodeView`]/[`EdgeView`] borrows
//! on demand instead of retaining one heap object per record, which keeps
//! the per-snapshot cost at O(nodes + edges) flat storage when many
//! snapshots are held in memory for comparison.
//!
//! The edge table is required to arrive grouped contiguously by `fromId`,
//! with groups in increasing order. The lazy outgoing-edge scan depends on
//! that grouping, so construction rejects the first violation instead of
//! trusting the producer.

use std::collections::HashMap;

use tracing::debug;

use crate::edge::{Edge, EdgeData, EdgeKind};
use crate::error::SnapshotError;
use crate::id::NodeId;
use crate::node::Node;
use crate::payload::{
    SnapshotPayload, EDGE_DATA, EDGE_FIELD_COUNT, EDGE_FROM, EDGE_TO, EDGE_TYPE,
    NODE_CLASS_NAME, NODE_FIELD_COUNT, NODE_FLAGS, NODE_FLAG_INTERNAL, NODE_FLAG_OBJECT_TYPE,
    NODE_ID, NODE_SIZE,
};
use crate::store::{build_categories, count_allocation_buckets, ClassCategory, SnapshotStore};

/// Fields per node slot in the internal table: the payload's four plus
/// the first-outgoing-edge offset.
const COMPACT_NODE_FIELD_COUNT: usize = 5;
/// Offset of the first-outgoing-edge field within a node slot.
const NODE_FIRST_EDGE: usize = 4;
/// Sentinel first-edge value for nodes without outgoing edges.
const NO_EDGE: u64 = u64::MAX;

/// Snapshot store backed by flat fixed-stride tables.
#[derive(Debug, Clone)]
pub struct CompactSnapshot {
    /// Node table, stride [`COMPACT_NODE_FIELD_COUNT`].
    nodes: Vec<u64>,
    /// Edge table, stride [`EDGE_FIELD_COUNT`], exactly as supplied.
    edges: Vec<u64>,
    class_names: Vec<String>,
    edge_types: Vec<String>,
    edge_names: Vec<String>,
    /// Node identifier to node-table ordinal.
    id_to_ordinal: HashMap<NodeId, u32>,
    total_size: u64,
}

impl CompactSnapshot {
    /// Builds a compact store from a raw payload.
    ///
    /// One pass over the nodes copies fields into the stride-5 table and
    /// builds the id lookup; one pass over the edges records each node's
    /// first outgoing edge. Cost is O(nodes + edges) time and storage.
    ///
    /// # Errors
    ///
    /// Payload-shape violations surface from
    /// [`SnapshotPayload::validate`]. Additionally fails with
    /// [`SnapshotError::InvalidPayload`] on a duplicate node id, a
    /// missing root node (id 0), an edge whose endpoint names no node,
    /// or an edge table not grouped by `fromId` in increasing order.
    pub fn from_payload(payload: SnapshotPayload) -> Result<Self, SnapshotError> {
        payload.validate()?;

        let node_count = payload.node_count();
        let mut nodes = Vec::with_capacity(node_count * COMPACT_NODE_FIELD_COUNT);
        let mut id_to_ordinal = HashMap::with_capacity(node_count);
        let mut total_size: u64 = 0;

        for (ordinal, record) in payload.nodes.chunks_exact(NODE_FIELD_COUNT).enumerate() {
            let id = NodeId(record[NODE_ID]);
            if id_to_ordinal.insert(id, ordinal as u32).is_some() {
                return Err(SnapshotError::InvalidPayload {
                    reason: format!("duplicate node id {id}"),
                });
            }
            total_size = total_size.checked_add(record[NODE_SIZE]).ok_or_else(|| {
                SnapshotError::InvalidPayload {
                    reason: format!("node sizes overflow u64 at node id {id}"),
                }
            })?;
            nodes.extend_from_slice(record);
            nodes.push(NO_EDGE);
        }

        if !id_to_ordinal.contains_key(&NodeId::ROOT) {
            return Err(SnapshotError::InvalidPayload {
                reason: "root node (id 0) is missing".to_string(),
            });
        }

        // Record each node's first outgoing edge. `fromId` groups must be
        // contiguous and increasing; the lazy edge scan is wrong otherwise,
        // so the first violation is fatal.
        let mut last_from: Option<NodeId> = None;
        for (ordinal, record) in payload.edges.chunks_exact(EDGE_FIELD_COUNT).enumerate() {
            let from = NodeId(record[EDGE_FROM]);
            let to = NodeId(record[EDGE_TO]);
            if !id_to_ordinal.contains_key(&to) {
                return Err(SnapshotError::InvalidPayload {
                    reason: format!("edge record {ordinal} references unknown toId {to}"),
                });
            }
            if last_from == Some(from) {
                continue;
            }
            if let Some(previous) = last_from {
                if from.0 < previous.0 {
                    return Err(SnapshotError::InvalidPayload {
                        reason: format!(
                            "edge table not grouped by fromId: {from} after {previous} \
                             at record {ordinal}"
                        ),
                    });
                }
            }
            let Some(&node_ordinal) = id_to_ordinal.get(&from) else {
                return Err(SnapshotError::InvalidPayload {
                    reason: format!("edge record {ordinal} references unknown fromId {from}"),
                });
            };
            let slot = node_ordinal as usize * COMPACT_NODE_FIELD_COUNT;
            debug_assert_eq!(nodes[slot + NODE_ID], from.0, "id lookup must round-trip");
            nodes[slot + NODE_FIRST_EDGE] = (ordinal * EDGE_FIELD_COUNT) as u64;
            last_from = Some(from);
        }

        debug!(
            nodes = node_count,
            edges = payload.edge_count(),
            total_size,
            "built compact snapshot store"
        );

        Ok(CompactSnapshot {
            nodes,
            edges: payload.edges,
            class_names: payload.node_class_names,
            edge_types: payload.edge_types,
            edge_names: payload.edge_names,
            id_to_ordinal,
            total_size,
        })
    }

    /// Parses a payload from JSON and builds a compact store from it.
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        Self::from_payload(SnapshotPayload::from_json_str(json)?)
    }

    /// Looks up a node view by identifier. O(1).
    pub fn node_view(&self, id: NodeId) -> Result<NodeView<'_>, SnapshotError> {
        let ordinal = self
            .id_to_ordinal
            .get(&id)
            .copied()
            .ok_or(SnapshotError::NodeNotFound { id })?;
        Ok(NodeView {
            store: self,
            ordinal: ordinal as usize,
        })
    }

    fn node_field(&self, ordinal: usize, field: usize) -> u64 {
        self.nodes[ordinal * COMPACT_NODE_FIELD_COUNT + field]
    }

    fn view_at(&self, ordinal: usize) -> NodeView<'_> {
        NodeView {
            store: self,
            ordinal,
        }
    }
}

impl SnapshotStore for CompactSnapshot {
    fn node_with_identifier(&self, id: NodeId) -> Result<Node, SnapshotError> {
        Ok(self.node_view(id)?.to_node())
    }

    fn nodes_with_class_name(&self, class_name: &str) -> Vec<Node> {
        let mut result = Vec::new();
        for ordinal in 0..self.node_count() {
            if NodeId(self.node_field(ordinal, NODE_ID)).is_root() {
                continue;
            }
            let class_index = self.node_field(ordinal, NODE_CLASS_NAME) as usize;
            if self.class_names[class_index] == class_name {
                result.push(self.view_at(ordinal).to_node());
            }
        }
        result
    }

    fn outgoing_edges(&self, id: NodeId) -> Result<Vec<Edge>, SnapshotError> {
        let view = self.node_view(id)?;
        Ok(view
            .outgoing_edges()
            .into_iter()
            .map(|edge| edge.to_edge())
            .collect())
    }

    fn node_count(&self) -> usize {
        self.nodes.len() / COMPACT_NODE_FIELD_COUNT
    }

    fn edge_count(&self) -> usize {
        self.edges.len() / EDGE_FIELD_COUNT
    }

    fn total_size(&self) -> u64 {
        self.total_size
    }

    fn allocation_bucket_counts(&self, bucket_sizes: &[u64]) -> Vec<usize> {
        count_allocation_buckets(
            (0..self.node_count()).filter_map(|ordinal| {
                if NodeId(self.node_field(ordinal, NODE_ID)).is_root() {
                    return None;
                }
                Some(self.node_field(ordinal, NODE_SIZE))
            }),
            bucket_sizes,
        )
    }

    fn class_categories(&self) -> Vec<ClassCategory> {
        build_categories((0..self.node_count()).filter_map(|ordinal| {
            if NodeId(self.node_field(ordinal, NODE_ID)).is_root() {
                return None;
            }
            let class_index = self.node_field(ordinal, NODE_CLASS_NAME) as usize;
            Some((
                self.class_names[class_index].as_str(),
                self.node_field(ordinal, NODE_SIZE),
                self.node_field(ordinal, NODE_FLAGS) & NODE_FLAG_INTERNAL != 0,
            ))
        }))
    }
}

/// Borrowed view of one node slot in a [`CompactSnapshot`].
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    store: &'a CompactSnapshot,
    ordinal: usize,
}

impl<'a> NodeView<'a> {
    pub fn id(&self) -> NodeId {
        NodeId(self.store.node_field(self.ordinal, NODE_ID))
    }

    pub fn size(&self) -> u64 {
        self.store.node_field(self.ordinal, NODE_SIZE)
    }

    /// Class name resolved through the shared table.
    pub fn class_name(&self) -> &'a str {
        let class_index = self.store.node_field(self.ordinal, NODE_CLASS_NAME) as usize;
        &self.store.class_names[class_index]
    }

    pub fn internal(&self) -> bool {
        self.store.node_field(self.ordinal, NODE_FLAGS) & NODE_FLAG_INTERNAL != 0
    }

    pub fn is_object_type(&self) -> bool {
        self.store.node_field(self.ordinal, NODE_FLAGS) & NODE_FLAG_OBJECT_TYPE != 0
    }

    /// Outgoing edges, computed on each call.
    ///
    /// Scans forward from the recorded first-edge offset while `fromId`
    /// still matches this node, stopping at the first mismatch or the end
    /// of the edge table. Correct because construction verified the edge
    /// table is grouped by `fromId`. A node holding the no-edge sentinel
    /// yields an empty sequence.
    pub fn outgoing_edges(&self) -> Vec<EdgeView<'a>> {
        let first = self.store.node_field(self.ordinal, NODE_FIRST_EDGE);
        if first == NO_EDGE {
            return Vec::new();
        }

        let store = self.store;
        let id = self.id();
        let mut result = Vec::new();
        let mut edge_index = first as usize;
        while edge_index < store.edges.len() && store.edges[edge_index + EDGE_FROM] == id.0 {
            result.push(EdgeView { store, edge_index });
            edge_index += EDGE_FIELD_COUNT;
        }
        result
    }

    /// Materializes this view into an owned [`Node`].
    pub fn to_node(&self) -> Node {
        Node::from_raw(
            self.id().0,
            self.size(),
            self.class_name().to_string(),
            self.store.node_field(self.ordinal, NODE_FLAGS),
        )
    }
}

/// Borrowed view of one edge slot in a [`CompactSnapshot`].
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    store: &'a CompactSnapshot,
    edge_index: usize,
}

impl<'a> EdgeView<'a> {
    fn field(&self, field: usize) -> u64 {
        self.store.edges[self.edge_index + field]
    }

    pub fn from_id(&self) -> NodeId {
        NodeId(self.field(EDGE_FROM))
    }

    pub fn to_id(&self) -> NodeId {
        NodeId(self.field(EDGE_TO))
    }

    /// Edge kind resolved through the edge-type table.
    pub fn kind(&self) -> EdgeKind {
        EdgeKind::parse(&self.store.edge_types[self.field(EDGE_TYPE) as usize])
    }

    /// Edge data: a name from the edge-name table for `Property` and
    /// `Variable` edges, the raw number otherwise.
    pub fn data(&self) -> EdgeData {
        let raw = self.field(EDGE_DATA);
        if self.kind().is_named() {
            EdgeData::Name(self.store.edge_names[raw as usize].clone())
        } else {
            EdgeData::Raw(raw)
        }
    }

    /// Resolves the source node on demand; never cached.
    pub fn from(&self) -> Result<NodeView<'a>, SnapshotError> {
        self.store.node_view(self.from_id())
    }

    /// Resolves the destination node on demand; never cached.
    pub fn to(&self) -> Result<NodeView<'a>, SnapshotError> {
        self.store.node_view(self.to_id())
    }

    /// Materializes this view into an owned [`Edge`].
    pub fn to_edge(&self) -> Edge {
        Edge {
            from: self.from_id(),
            to: self.to_id(),
            kind: self.kind(),
            data: self.data(),
        }
    }
}
