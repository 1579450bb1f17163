//! The [`SnapshotStore`] trait defining the query contract for snapshots.
//!
//! Two backing representations implement this trait and are fully
//! swappable from a caller's point of view:
//! - [`CompactSnapshot`](crate::compact::CompactSnapshot) keeps flat
//!   fixed-stride tables and manufactures value objects on demand,
//!   minimizing per-snapshot memory when many snapshots coexist.
//! - [`ExpandedSnapshot`](crate::expanded::ExpandedSnapshot) eagerly
//!   materializes every node and edge with bidirectional adjacency for
//!   repeated O(1) navigation.
//!
//! Callers pick the implementation by expected workload; query results
//! are identical for any valid payload.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::SnapshotError;
use crate::id::NodeId;
use crate::node::Node;

/// The query contract over one immutable heap snapshot.
///
/// All methods are synchronous, read-only, and pure: a store never
/// changes after construction, so repeated queries return identical
/// results and concurrent reads need no coordination.
pub trait SnapshotStore {
    /// Looks up one node by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NodeNotFound`] if no node has this id.
    fn node_with_identifier(&self, id: NodeId) -> Result<Node, SnapshotError>;

    /// Returns every non-root node whose resolved class name equals
    /// `class_name`, in node-table order. Possibly empty.
    ///
    /// This is a full linear scan; no secondary index by class is
    /// maintained.
    fn nodes_with_class_name(&self, class_name: &str) -> Vec<Node>;

    /// Returns the node's outgoing edges in edge-table order. A node
    /// without outgoing edges yields an empty sequence, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NodeNotFound`] if no node has this id.
    fn outgoing_edges(&self, id: NodeId) -> Result<Vec<Edge>, SnapshotError>;

    /// Number of nodes in the snapshot, root included.
    fn node_count(&self) -> usize;

    /// Number of edges in the snapshot.
    fn edge_count(&self) -> usize;

    /// Sum of all node self sizes in bytes.
    fn total_size(&self) -> u64;

    /// Aggregates non-root nodes by class name, sorted by descending
    /// total size (class name as tiebreak).
    fn class_categories(&self) -> Vec<ClassCategory>;

    /// Buckets non-root nodes by self size into caller-supplied ranges.
    ///
    /// Returns `bucket_sizes.len() + 1` counts: a node lands in the
    /// first bucket whose threshold its size is strictly below, or in
    /// the trailing remainder bucket if no threshold applies.
    fn allocation_bucket_counts(&self, bucket_sizes: &[u64]) -> Vec<usize>;

    /// Convenience lookup of the distinguished root node.
    fn root(&self) -> Result<Node, SnapshotError> {
        self.node_with_identifier(NodeId::ROOT)
    }
}

/// Per-class aggregate over a snapshot's non-root nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCategory {
    /// The shared class name.
    pub class_name: String,
    /// Total self size of all instances, in bytes.
    pub size: u64,
    /// Instance count.
    pub count: usize,
    /// How many instances carry the internal flag.
    pub internal_count: usize,
}

/// Shared aggregation behind both stores' `class_categories`.
pub(crate) fn build_categories<'a>(
    entries: impl Iterator<Item = (&'a str, u64, bool)>,
) -> Vec<ClassCategory> {
    let mut categories: HashMap<&str, ClassCategory> = HashMap::new();
    for (class_name, size, internal) in entries {
        let category = categories
            .entry(class_name)
            .or_insert_with(|| ClassCategory {
                class_name: class_name.to_string(),
                size: 0,
                count: 0,
                internal_count: 0,
            });
        category.size += size;
        category.count += 1;
        if internal {
            category.internal_count += 1;
        }
    }

    let mut result: Vec<ClassCategory> = categories.into_values().collect();
    result.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.class_name.cmp(&b.class_name))
    });
    result
}

/// Shared bucketing behind both stores' `allocation_bucket_counts`.
pub(crate) fn count_allocation_buckets(
    sizes: impl Iterator<Item = u64>,
    bucket_sizes: &[u64],
) -> Vec<usize> {
    let mut counts = vec![0usize; bucket_sizes.len() + 1];
    let remainder_bucket = bucket_sizes.len();
    'sizes: for size in sizes {
        for (i, &threshold) in bucket_sizes.iter().enumerate() {
            if size < threshold {
                counts[i] += 1;
                continue 'sizes;
            }
        }
        counts[remainder_bucket] += 1;
    }
    counts
}
