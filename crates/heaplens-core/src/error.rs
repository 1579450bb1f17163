//! Error types for heaplens-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Construction
//! errors (`UnsupportedVersion`, `EmptyTable`, `InvalidPayload`) are fatal
//! to the construction attempt and leave no usable partial store. Query
//! errors (`NodeNotFound`, `AmbiguousPath`) surface directly to the caller;
//! queries are pure functions of immutable state, so there is no retry
//! policy.

use thiserror::Error;

use crate::id::NodeId;

/// Errors produced while constructing or querying a snapshot store.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The payload's version tag is not the supported snapshot version.
    #[error("unsupported snapshot version: {found} (expected 2)")]
    UnsupportedVersion { found: u64 },

    /// A required payload table is missing or empty.
    #[error("snapshot payload has an empty {table} table")]
    EmptyTable { table: &'static str },

    /// The payload violates a structural invariant: bad stride, index out
    /// of table bounds, duplicate node id, unknown edge endpoint, edge
    /// records not grouped by source, or missing/malformed root.
    #[error("invalid snapshot payload: {reason}")]
    InvalidPayload { reason: String },

    /// A node lookup by identifier found no matching node.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// A path selector did not match exactly one outgoing edge. Zero and
    /// multiple matches fail the same way; `matches` tells them apart.
    #[error("path selector '{selector}' at node {node} matched {matches} outgoing edges (expected exactly 1)")]
    AmbiguousPath {
        node: NodeId,
        selector: String,
        matches: usize,
    },

    /// The payload string was not valid JSON.
    #[error("snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
