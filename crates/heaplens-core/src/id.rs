//! Node identifier newtype.
//!
//! Snapshot node identifiers are assigned by the external snapshot
//! producer and are unique within one snapshot. Identifier `0` is always
//! the distinguished root node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one heap node within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// The distinguished root node present in every valid snapshot.
    pub const ROOT: NodeId = NodeId(0);

    /// Returns `true` if this is the root node's identifier.
    pub fn is_root(self) -> bool {
        self == NodeId::ROOT
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        NodeId(raw)
    }
}
