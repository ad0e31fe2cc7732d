//! Error taxonomy for hive metadata operations.

use thiserror::Error;

/// Entity kinds named in duplicate/not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A physical data node.
    Node,
    /// A partitioned resource within the dimension.
    Resource,
    /// A secondary index on a resource.
    SecondaryIndex,
    /// The partition dimension itself.
    PartitionDimension,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Node => "node",
            EntityKind::Resource => "resource",
            EntityKind::SecondaryIndex => "secondary index",
            EntityKind::PartitionDimension => "partition dimension",
        };
        f.write_str(name)
    }
}

/// Failures surfaced by hive metadata operations.
///
/// Every mutating call is a single synchronous attempt; nothing here is
/// retried automatically. Store failures are wrapped, never recovered.
#[derive(Debug, Error)]
pub enum HiveError {
    /// A mutating call was issued while the hive is read-only. No store
    /// write has occurred.
    #[error("hive at {uri} is not writable")]
    NotWritable {
        /// URI of the read-only hive.
        uri: String,
    },

    /// A create call collided with an existing sibling name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// Kind of the colliding entity.
        kind: EntityKind,
        /// The name that already exists.
        name: String,
    },

    /// An update/delete referenced an id absent from the current
    /// in-memory collection.
    #[error("{kind} with id {id} not found")]
    NotFound {
        /// Kind of the missing entity.
        kind: EntityKind,
        /// The id that was not present.
        id: u32,
    },

    /// `create` was called against a URI that already holds a
    /// partition dimension.
    #[error("a hive with partition dimension {dimension} already exists at {uri}")]
    AlreadyExists {
        /// Name of the dimension already installed.
        dimension: String,
        /// URI of the existing installation.
        uri: String,
    },

    /// An underlying persistence call failed. The caller must retry or
    /// abort; this layer does neither.
    #[error("store failure: {0}")]
    Store(String),
}

impl HiveError {
    /// Wrap a store-layer failure message.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

/// Result alias for hive operations.
pub type Result<T> = std::result::Result<T, HiveError>;
