//! Raw snapshot payload as emitted by the external snapshot producer.
//!
//! The producer serializes the heap graph as JSON with camelCase keys:
//! flat node and edge field sequences plus three string lookup tables.
//! String data is stored once in the tables and referenced by integer
//! index from the node/edge records, never duplicated per record.
//!
//! Record layouts:
//! - node: `[id, size, classNameTableIndex, flags]`
//! - edge: `[fromId, toId, edgeTypeTableIndex, data]`
//!
//! For `Property` and `Variable` edges the `data` field is an index into
//! the edge-name table; for every other edge kind it is an opaque number.

use serde::{Deserialize, Serialize};

use crate::edge::EdgeKind;
use crate::error::SnapshotError;

/// The snapshot format version this engine accepts. Version 2 introduced
/// the node flags bitset (version 1 stored a bare 0/1 internal field).
pub const EXPECTED_VERSION: u64 = 2;

/// Fields per node record in the payload.
pub const NODE_FIELD_COUNT: usize = 4;
/// Fields per edge record in the payload.
pub const EDGE_FIELD_COUNT: usize = 4;

/// Node flags bit: the node is internal to the VM.
pub const NODE_FLAG_INTERNAL: u64 = 1 << 0;
/// Node flags bit: the node is an object-type allocation.
pub const NODE_FLAG_OBJECT_TYPE: u64 = 1 << 1;

// Field offsets within one record.
pub(crate) const NODE_ID: usize = 0;
pub(crate) const NODE_SIZE: usize = 1;
pub(crate) const NODE_CLASS_NAME: usize = 2;
pub(crate) const NODE_FLAGS: usize = 3;
pub(crate) const EDGE_FROM: usize = 0;
pub(crate) const EDGE_TO: usize = 1;
pub(crate) const EDGE_TYPE: usize = 2;
pub(crate) const EDGE_DATA: usize = 3;

/// A deserialized snapshot payload, not yet indexed for querying.
///
/// Both store representations consume this structure. [`validate`]
/// checks the payload-shape invariants; graph-level invariants (edge
/// grouping, endpoint existence, root adjacency) are enforced by the
/// store constructors.
///
/// [`validate`]: SnapshotPayload::validate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    /// Format version tag. Must equal [`EXPECTED_VERSION`].
    pub version: u64,
    /// Producer-reported snapshot kind, passed through unvalidated.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub snapshot_type: Option<String>,
    /// Flat node field sequence, stride [`NODE_FIELD_COUNT`].
    pub nodes: Vec<u64>,
    /// Class-name string table, indexed by each node's third field.
    pub node_class_names: Vec<String>,
    /// Flat edge field sequence, stride [`EDGE_FIELD_COUNT`].
    pub edges: Vec<u64>,
    /// Edge-type string table, indexed by each edge's third field.
    pub edge_types: Vec<String>,
    /// Edge-name string table for `Property`/`Variable` edges. May be
    /// empty when the snapshot contains no named edges.
    #[serde(default)]
    pub edge_names: Vec<String>,
}

impl SnapshotPayload {
    /// Parses a payload from the producer's JSON string and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        let payload: SnapshotPayload = serde_json::from_str(json)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Number of node records in the payload.
    pub fn node_count(&self) -> usize {
        self.nodes.len() / NODE_FIELD_COUNT
    }

    /// Number of edge records in the payload.
    pub fn edge_count(&self) -> usize {
        self.edges.len() / EDGE_FIELD_COUNT
    }

    /// Checks the payload-shape invariants.
    ///
    /// Verifies the version tag, that the node sequence, class-name
    /// table, edge sequence, and edge-type table are non-empty, that
    /// both flat sequences have whole records, and that every table
    /// index stored in a record is in bounds for its table (including
    /// the `data` field of named edges against the edge-name table).
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version != EXPECTED_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
            });
        }

        if self.nodes.is_empty() {
            return Err(SnapshotError::EmptyTable { table: "nodes" });
        }
        if self.node_class_names.is_empty() {
            return Err(SnapshotError::EmptyTable {
                table: "nodeClassNames",
            });
        }
        if self.edges.is_empty() {
            return Err(SnapshotError::EmptyTable { table: "edges" });
        }
        if self.edge_types.is_empty() {
            return Err(SnapshotError::EmptyTable { table: "edgeTypes" });
        }

        if self.nodes.len() % NODE_FIELD_COUNT != 0 {
            return Err(SnapshotError::InvalidPayload {
                reason: format!(
                    "node sequence length {} is not a multiple of {}",
                    self.nodes.len(),
                    NODE_FIELD_COUNT
                ),
            });
        }
        if self.edges.len() % EDGE_FIELD_COUNT != 0 {
            return Err(SnapshotError::InvalidPayload {
                reason: format!(
                    "edge sequence length {} is not a multiple of {}",
                    self.edges.len(),
                    EDGE_FIELD_COUNT
                ),
            });
        }

        for (ordinal, record) in self.nodes.chunks_exact(NODE_FIELD_COUNT).enumerate() {
            let class_index = record[NODE_CLASS_NAME] as usize;
            if class_index >= self.node_class_names.len() {
                return Err(SnapshotError::InvalidPayload {
                    reason: format!(
                        "node record {ordinal} class-name index {class_index} out of bounds \
                         for table of {}",
                        self.node_class_names.len()
                    ),
                });
            }
        }

        for (ordinal, record) in self.edges.chunks_exact(EDGE_FIELD_COUNT).enumerate() {
            let type_index = record[EDGE_TYPE] as usize;
            let Some(type_name) = self.edge_types.get(type_index) else {
                return Err(SnapshotError::InvalidPayload {
                    reason: format!(
                        "edge record {ordinal} type index {type_index} out of bounds for \
                         table of {}",
                        self.edge_types.len()
                    ),
                });
            };
            if EdgeKind::parse(type_name).is_named() {
                let name_index = record[EDGE_DATA] as usize;
                if name_index >= self.edge_names.len() {
                    return Err(SnapshotError::InvalidPayload {
                        reason: format!(
                            "edge record {ordinal} name index {name_index} out of bounds \
                             for table of {}",
                            self.edge_names.len()
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> SnapshotPayload {
        SnapshotPayload {
            version: 2,
            snapshot_type: Some("Inspector".to_string()),
            // <root>, one Object, one Array
            nodes: vec![0, 0, 0, 0, 1, 32, 1, 0, 2, 16, 2, 1],
            node_class_names: vec![
                "<root>".to_string(),
                "Object".to_string(),
                "Array".to_string(),
            ],
            // root -> 1 (Property "a"), root -> 2 (Variable "b")
            edges: vec![0, 1, 1, 0, 0, 2, 2, 1],
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
    fn valid_payload_passes() {
        valid_payload().validate().unwrap();
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "version": 2,
            "type": "Inspector",
            "nodes": [0, 0, 0, 0, 1, 32, 1, 0],
            "nodeClassNames": ["<root>", "Object"],
            "edges": [0, 1, 1, 0],
            "edgeTypes": ["Internal", "Property"],
            "edgeNames": ["a"]
        }"#;
        let payload = SnapshotPayload::from_json_str(json).unwrap();
        assert_eq!(payload.node_count(), 2);
        assert_eq!(payload.edge_count(), 1);
        assert_eq!(payload.snapshot_type.as_deref(), Some("Inspector"));
    }

    #[test]
    fn edge_names_table_is_optional_in_json() {
        let json = r#"{
            "version": 2,
            "nodes": [0, 0, 0, 0, 1, 8, 1, 0],
            "nodeClassNames": ["<root>", "Object"],
            "edges": [0, 1, 0, 0],
            "edgeTypes": ["Internal"]
        }"#;
        let payload = SnapshotPayload::from_json_str(json).unwrap();
        assert!(payload.edge_names.is_empty());
    }

    #[test]
    fn rejects_version_one() {
        let mut payload = valid_payload();
        payload.version = 1;
        let err = payload.validate().unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::UnsupportedVersion { found: 1 }
        ));
    }

    #[test]
    fn rejects_empty_required_tables() {
        let mut payload = valid_payload();
        payload.edge_types.clear();
        let err = payload.validate().unwrap_err();
        assert!(matches!(err, SnapshotError::EmptyTable { table: "edgeTypes" }));

        let mut payload = valid_payload();
        payload.node_class_names.clear();
        let err = payload.validate().unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::EmptyTable {
                table: "nodeClassNames"
            }
        ));
    }

    #[test]
    fn rejects_partial_records() {
        let mut payload = valid_payload();
        payload.nodes.pop();
        assert!(matches!(
            payload.validate(),
            Err(SnapshotError::InvalidPayload { .. })
        ));

        let mut payload = valid_payload();
        payload.edges.push(0);
        assert!(matches!(
            payload.validate(),
            Err(SnapshotError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn rejects_out_of_bounds_class_index() {
        let mut payload = valid_payload();
        payload.nodes[2] = 99; // first node's class-name index
        assert!(matches!(
            payload.validate(),
            Err(SnapshotError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn rejects_out_of_bounds_edge_type_index() {
        let mut payload = valid_payload();
        payload.edges[2] = 99;
        assert!(matches!(
            payload.validate(),
            Err(SnapshotError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn rejects_named_edge_with_out_of_bounds_name_index() {
        let mut payload = valid_payload();
        payload.edges[3] = 99; // Property edge's data field
        assert!(matches!(
            payload.validate(),
            Err(SnapshotError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn raw_data_is_not_bounds_checked() {
        // Index edges carry an opaque number in the data field; it is not
        // an edge-name table index and any value is accepted.
        let mut payload = valid_payload();
        payload.edges[2] = 3; // Index
        payload.edges[3] = 123_456;
        payload.validate().unwrap();
    }
}
