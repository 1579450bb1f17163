//! Heap-graph snapshot engine.
//!
//! Ingests the JSON snapshot payload produced by an external heap
//! snapshot generator (objects as nodes, references as edges, string
//! data in shared lookup tables) and exposes it for analysis: lookup by
//! identifier, class-based queries, and selector-path traversal.
//!
//! Two interchangeable store representations implement the
//! [`SnapshotStore`] trait:
//! - [`CompactSnapshot`]: flat fixed-stride tables with lazy views,
//!   minimizing memory when many snapshots coexist for comparison.
//! - [`ExpandedSnapshot`]: fully materialized nodes/edges with
//!   bidirectional adjacency for repeated O(1) navigation.
//!
//! A store is constructed once from an immutable payload and is
//! read-only thereafter; construction either completes or fails, never
//! leaving a partially usable store.
//!
//! # Modules
//!
//! - [`payload`]: raw payload model, layout constants, validation
//! - [`id`], [`node`], [`edge`]: identifier and value-object model
//! - [`store`]: the [`SnapshotStore`] trait and class aggregates
//! - [`compact`]: flat-table store with lazy views
//! - [`expanded`]: eagerly materialized store
//! - [`path`]: selector-path traversal
//! - [`error`]: [`SnapshotError`] enum with all failure modes

pub mod compact;
pub mod edge;
pub mod error;
pub mod expanded;
pub mod id;
pub mod node;
pub mod path;
pub mod payload;
pub mod store;

// Re-export key types for ergonomic use.
pub use compact::{CompactSnapshot, EdgeView, NodeView};
pub use edge::{Edge, EdgeData, EdgeKind};
pub use error::SnapshotError;
pub use expanded::ExpandedSnapshot;
pub use id::NodeId;
pub use node::Node;
pub use path::{resolve_path, PathSelector};
pub use payload::SnapshotPayload;
pub use store::{ClassCategory, SnapshotStore};
