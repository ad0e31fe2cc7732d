//! Physical node records and store-assigned identifiers.

use serde::{Deserialize, Serialize};

use crate::semaphore::Status;

/// Store-assigned identifier of a physical node. Zero means the node
/// has not been persisted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Store-assigned identifier of a resource. Zero means unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

/// Store-assigned identifier of a secondary index. Zero means unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecondaryIndexId(pub u32);

impl NodeId {
    /// Sentinel for a node not yet assigned an id by the store.
    pub const UNASSIGNED: NodeId = NodeId(0);
}

impl ResourceId {
    /// Sentinel for a resource not yet assigned an id by the store.
    pub const UNASSIGNED: ResourceId = ResourceId(0);
}

impl SecondaryIndexId {
    /// Sentinel for a secondary index not yet assigned an id by the store.
    pub const UNASSIGNED: SecondaryIndexId = SecondaryIndexId(0);
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical data-store instance participating in the sharded
/// deployment.
///
/// Node names are unique case-insensitively across the registry. The
/// registry itself is replaced wholesale on every sync, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Store-assigned identity.
    pub id: NodeId,
    /// Unique name (case-insensitive).
    pub name: String,
    /// Per-node write-gate state.
    pub status: Status,
    /// Location of the node's data store.
    pub uri: String,
}

impl Node {
    /// A node record awaiting its store-assigned id.
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            name: name.into(),
            status: Status::Writable,
            uri: uri.into(),
        }
    }

    /// Case-insensitive name comparison used by uniqueness checks and
    /// registry lookups.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_name_matches_ignores_case() {
        let node = Node::new("Shard-A", "mem://a");
        assert!(node.name_matches("shard-a"));
        assert!(node.name_matches("SHARD-A"));
        assert!(!node.name_matches("shard-b"));
    }

    #[test]
    fn test_new_node_is_unassigned() {
        let node = Node::new("n", "mem://n");
        assert_eq!(node.id, NodeId::UNASSIGNED);
        assert!(node.status.is_writable());
    }
}
