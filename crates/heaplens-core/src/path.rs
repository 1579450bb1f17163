//! Selector-path traversal over a snapshot store.
//!
//! A path is an ordered sequence of selectors walked one hop at a time
//! from a starting node. Each selector either follows the outgoing edge
//! whose resolved data name matches, or the outgoing edge whose
//! destination class name matches. Every hop must match exactly one
//! edge; zero matches and multiple matches both fail with
//! [`SnapshotError::AmbiguousPath`], distinguished only by the reported
//! match count.

use std::fmt;

use smallvec::SmallVec;

use crate::edge::Edge;
use crate::error::SnapshotError;
use crate::id::NodeId;
use crate::node::Node;
use crate::store::SnapshotStore;

/// One hop of a traversal path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSelector {
    /// Follow the edge whose resolved data name equals this string.
    /// Only `Property`/`Variable` edges carry a name, so only those can
    /// match.
    Edge(String),
    /// Follow the edge whose destination node's class name equals this
    /// string.
    Node(String),
}

impl PathSelector {
    /// Parses the CLI spelling `edge:NAME` / `class:NAME`.
    pub fn parse(text: &str) -> Option<Self> {
        let (prefix, rest) = text.split_once(':')?;
        match prefix {
            "edge" => Some(PathSelector::Edge(rest.to_string())),
            "class" => Some(PathSelector::Node(rest.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for PathSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSelector::Edge(name) => write!(f, "edge:{name}"),
            PathSelector::Node(class) => write!(f, "class:{class}"),
        }
    }
}

/// Walks `selectors` one hop at a time from `start` and returns the final
/// node. An empty selector sequence returns the starting node itself.
///
/// Deterministic: a fixed store and selector sequence always resolves to
/// the same node or always fails the same way.
///
/// # Errors
///
/// [`SnapshotError::NodeNotFound`] if `start` names no node, or
/// [`SnapshotError::AmbiguousPath`] when a hop does not match exactly one
/// outgoing edge.
pub fn resolve_path<S: SnapshotStore + ?Sized>(
    store: &S,
    start: NodeId,
    selectors: &[PathSelector],
) -> Result<Node, SnapshotError> {
    let mut current = store.node_with_identifier(start)?;

    for selector in selectors {
        let edges = store.outgoing_edges(current.id)?;
        let mut matches: SmallVec<[&Edge; 2]> = SmallVec::new();
        for edge in &edges {
            let is_match = match selector {
                PathSelector::Edge(name) => edge.data.name() == Some(name.as_str()),
                PathSelector::Node(class) => {
                    store.node_with_identifier(edge.to)?.class_name == *class
                }
            };
            if is_match {
                matches.push(edge);
            }
        }
        if matches.len() != 1 {
            return Err(SnapshotError::AmbiguousPath {
                node: current.id,
                selector: selector.to_string(),
                matches: matches.len(),
            });
        }
        current = store.node_with_identifier(matches[0].to)?;
    }

    Ok(current)
}
