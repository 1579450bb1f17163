//! Node value model.
//!
//! [`Node`] is the owned value object handed to callers by query
//! operations on either store. The producer's flags bitset is decoded
//! into the `internal` and `is_object_type` booleans at materialization.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::payload::{NODE_FLAG_INTERNAL, NODE_FLAG_OBJECT_TYPE};

/// One heap node as seen by callers.
///
/// A transient value object owned by the caller; it does not borrow the
/// backing store, and holding one does not extend the store's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within the snapshot. Id 0 is the root.
    pub id: NodeId,
    /// Self size in bytes.
    pub size: u64,
    /// Class name, resolved through the class-name table.
    pub class_name: String,
    /// The node is internal to the VM.
    pub internal: bool,
    /// The node is an object-type allocation.
    pub is_object_type: bool,
}

impl Node {
    /// Builds a node from raw record fields, decoding the flags bitset.
    pub(crate) fn from_raw(id: u64, size: u64, class_name: String, flags: u64) -> Self {
        Node {
            id: NodeId(id),
            size,
            class_name,
            internal: flags & NODE_FLAG_INTERNAL != 0,
            is_object_type: flags & NODE_FLAG_OBJECT_TYPE != 0,
        }
    }

    /// Returns `true` if this is the distinguished root node.
    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_flag_bits() {
        let node = Node::from_raw(1, 16, "Object".to_string(), 0);
        assert!(!node.internal);
        assert!(!node.is_object_type);

        let node = Node::from_raw(1, 16, "Object".to_string(), 1);
        assert!(node.internal);
        assert!(!node.is_object_type);

        let node = Node::from_raw(1, 16, "Object".to_string(), 2);
        assert!(!node.internal);
        assert!(node.is_object_type);

        let node = Node::from_raw(1, 16, "Object".to_string(), 3);
        assert!(node.internal);
        assert!(node.is_object_type);
    }

    #[test]
    fn unknown_flag_bits_are_ignored() {
        let node = Node::from_raw(1, 16, "Object".to_string(), 0b100);
        assert!(!node.internal);
        assert!(!node.is_object_type);
    }

    #[test]
    fn root_detection() {
        let root = Node::from_raw(0, 0, "<root>".to_string(), 0);
        assert!(root.is_root());
        let other = Node::from_raw(5, 8, "String".to_string(), 0);
        assert!(!other.is_root());
    }
}
