//! The sharding schema: partition dimension, resources, and secondary
//! indexes.

use serde::{Deserialize, Serialize};

use crate::key::KeyType;
use crate::node::{ResourceId, SecondaryIndexId};

/// An alternate lookup path for a resource, mapping a secondary
/// attribute to a partition key. Resolution of the mapping is the
/// directory's job; this record only names the attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndex {
    /// Store-assigned identity.
    pub id: SecondaryIndexId,
    /// Indexed attribute name, unique within the owning resource.
    pub name: String,
    /// Domain of the indexed attribute.
    pub key_type: KeyType,
}

impl SecondaryIndex {
    /// A secondary-index record awaiting its store-assigned id.
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            id: SecondaryIndexId::UNASSIGNED,
            name: name.into(),
            key_type,
        }
    }
}

/// A logical entity type partitioned along the dimension.
///
/// Resource names are unique (case-sensitive) within the dimension;
/// secondary-index names are unique within the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Store-assigned identity.
    pub id: ResourceId,
    /// Unique name within the dimension.
    pub name: String,
    /// Secondary indexes declared on this resource.
    pub secondary_indexes: Vec<SecondaryIndex>,
}

impl Resource {
    /// A resource record awaiting its store-assigned id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::UNASSIGNED,
            name: name.into(),
            secondary_indexes: Vec::new(),
        }
    }

    /// Look up a secondary index by name.
    pub fn secondary_index(&self, name: &str) -> Option<&SecondaryIndex> {
        self.secondary_indexes.iter().find(|idx| idx.name == name)
    }

    /// True when a secondary index with this exact name exists.
    pub fn has_secondary_index(&self, name: &str) -> bool {
        self.secondary_index(name).is_some()
    }
}

/// The named axis of sharding. Owns the ordered resource collection;
/// exactly one dimension exists per hive installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDimension {
    /// Unique dimension name, also used to name index structures.
    pub name: String,
    /// Domain of the primary partition key.
    pub key_type: KeyType,
    /// Location of the dimension's index structures.
    pub index_uri: String,
    /// Resources partitioned along this dimension, in creation order.
    pub resources: Vec<Resource>,
}

impl PartitionDimension {
    /// A dimension with no resources yet.
    pub fn new(name: impl Into<String>, key_type: KeyType, index_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_type,
            index_uri: index_uri.into(),
            resources: Vec::new(),
        }
    }

    /// Look up a resource by exact name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Look up a resource by store-assigned id.
    pub fn resource_by_id(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// True when a resource with this exact name exists.
    pub fn has_resource(&self, name: &str) -> bool {
        self.resource(name).is_some()
    }
}
