//! The metadata-store contract.

use std::sync::Arc;

use hive_core::{
    Node, NodeId, PartitionDimension, Resource, ResourceId, Result, SecondaryIndex,
    SecondaryIndexId, Semaphore,
};

/// Persistence operations for one hive installation.
///
/// Implementations persist each entity independently; the semaphore
/// increment is a separate, atomic write issued after the entity write.
/// A crash between the two leaves the store one step ahead of the
/// semaphore — callers own that gap, the store does not hide it.
///
/// The store enforces no name-uniqueness constraints of its own; the
/// facade checks preconditions against its in-memory snapshot before
/// writing.
pub trait HiveStore: Send + Sync {
    // ---- nodes ----

    /// Persist a new node, assigning its id. Returns the stored record.
    fn create_node(&self, node: &Node) -> Result<Node>;

    /// Update the node matching the given record's id.
    fn update_node(&self, node: &Node) -> Result<()>;

    /// Delete the node with the given id.
    fn delete_node(&self, id: NodeId) -> Result<()>;

    /// Load every node record.
    fn load_all_nodes(&self) -> Result<Vec<Node>>;

    // ---- partition dimension ----

    /// Persist the partition dimension. At most one exists per store.
    fn create_dimension(&self, dimension: &PartitionDimension) -> Result<()>;

    /// Update the dimension's own fields (name, key type, index URI).
    /// Resource membership is managed through the resource operations.
    fn update_dimension(&self, dimension: &PartitionDimension) -> Result<()>;

    /// Fetch the dimension, or `None` before it has been created.
    fn get_dimension(&self) -> Result<Option<PartitionDimension>>;

    // ---- resources ----

    /// Persist a new resource under the dimension, assigning its id.
    fn create_resource(&self, resource: &Resource) -> Result<Resource>;

    /// Delete the resource with the given id.
    fn delete_resource(&self, id: ResourceId) -> Result<()>;

    // ---- secondary indexes ----

    /// Persist a new secondary index under the given resource,
    /// assigning its id.
    fn create_secondary_index(
        &self,
        resource: ResourceId,
        index: &SecondaryIndex,
    ) -> Result<SecondaryIndex>;

    /// Delete the secondary index with the given id.
    fn delete_secondary_index(&self, id: SecondaryIndexId) -> Result<()>;

    // ---- semaphore ----

    /// Read the current semaphore.
    fn semaphore(&self) -> Result<Semaphore>;

    /// Overwrite the semaphore record (status changes).
    fn update_semaphore(&self, semaphore: &Semaphore) -> Result<()>;

    /// Atomically bump the persisted revision by one and return the
    /// new semaphore. This is the serialization point every mutation
    /// funnels through.
    fn increment_and_persist(&self) -> Result<Semaphore>;
}

/// Resolves a hive URI to a store handle.
///
/// Passed explicitly at facade construction; any caching across URIs
/// is an explicit keyed cache inside the provider, not ambient global
/// state.
pub trait StoreProvider: Send + Sync {
    /// Open (or reuse) the store behind the given URI.
    fn open(&self, uri: &str) -> Result<Arc<dyn HiveStore>>;
}
