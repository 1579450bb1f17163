//! Edge value model.
//!
//! Query results carry owned [`Edge`] values: the endpoints, the resolved
//! edge kind, and the edge data. `Property` and `Variable` are the two
//! "named" kinds -- for those the producer's raw `data` field is an index
//! into the edge-name table and is resolved to a string; for every other
//! kind the raw number is passed through unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

/// Resolved edge type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// VM-internal reference; data is an opaque number.
    Internal,
    /// Named property reference; data resolves to a property name.
    Property,
    /// Named variable reference; data resolves to a variable name.
    Variable,
    /// Indexed element reference; data is the element index.
    Index,
    /// An edge type this engine does not recognize, kept verbatim.
    Other(String),
}

impl EdgeKind {
    /// Resolves an edge-type table entry to a kind.
    pub fn parse(name: &str) -> Self {
        match name {
            "Internal" => EdgeKind::Internal,
            "Property" => EdgeKind::Property,
            "Variable" => EdgeKind::Variable,
            "Index" => EdgeKind::Index,
            other => EdgeKind::Other(other.to_string()),
        }
    }

    /// Returns `true` for the kinds whose data field names the reference.
    pub fn is_named(&self) -> bool {
        matches!(self, EdgeKind::Property | EdgeKind::Variable)
    }

    /// The table spelling of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            EdgeKind::Internal => "Internal",
            EdgeKind::Property => "Property",
            EdgeKind::Variable => "Variable",
            EdgeKind::Index => "Index",
            EdgeKind::Other(name) => name,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge payload: a resolved name for named kinds, the raw number otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeData {
    /// Resolved edge name (`Property`/`Variable` kinds).
    Name(String),
    /// Raw numeric payload (all other kinds).
    Raw(u64),
}

impl EdgeData {
    /// The resolved name, if this is named edge data.
    pub fn name(&self) -> Option<&str> {
        match self {
            EdgeData::Name(name) => Some(name),
            EdgeData::Raw(_) => None,
        }
    }

    /// The raw numeric payload, if this is non-named edge data.
    pub fn raw(&self) -> Option<u64> {
        match self {
            EdgeData::Name(_) => None,
            EdgeData::Raw(value) => Some(*value),
        }
    }
}

/// One directed reference between two heap nodes.
///
/// A transient value object owned by the caller; it does not borrow the
/// backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node identifier.
    pub from: NodeId,
    /// Destination node identifier.
    pub to: NodeId,
    /// Resolved edge kind.
    pub kind: EdgeKind,
    /// Resolved name or raw payload, depending on the kind.
    pub data: EdgeData,
}
