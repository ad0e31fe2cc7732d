//! The directory boundary: key-to-node routing built from a pinned
//! (dimension, semaphore) pair.
//!
//! A directory is constructed fresh on every snapshot replacement and
//! never mutated; its validity is tied to the exact revision it was
//! built from. The facade enforces the pairing, this module enforces
//! the immutability.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hive_core::{Assigner, Node, NodeId, PartitionDimension, PartitionKey, Result, Semaphore};
use hive_store::StoreProvider;

/// Key-to-node lookup over one fixed metadata revision.
pub trait Directory: Send + Sync {
    /// The semaphore revision this directory was built from.
    fn revision(&self) -> u64;

    /// Nodes holding the given partition key.
    fn node_ids_for_key(&self, key: &PartitionKey) -> Vec<NodeId>;

    /// Produce a new partition key for an entity that has none,
    /// using the assigner the directory was built with. Uniqueness is
    /// not guaranteed, only well-formedness.
    fn assign_key(&self) -> PartitionKey;
}

/// Builds a directory for a (uri, assigner, semaphore, dimension)
/// tuple. Real routing engines implement this against their own index
/// storage; the facade only cares that the result is pinned to the
/// given revision.
pub trait DirectoryProvider: Send + Sync {
    /// Construct a directory for the given metadata revision.
    fn directory(
        &self,
        uri: &str,
        assigner: Arc<dyn Assigner>,
        semaphore: &Semaphore,
        dimension: &PartitionDimension,
    ) -> Result<Arc<dyn Directory>>;
}

/// Reference directory: stable hash of the key's byte encoding over
/// the writable node set captured at build time.
pub struct HashDirectory {
    revision: u64,
    dimension: PartitionDimension,
    assigner: Arc<dyn Assigner>,
    writable_nodes: Vec<NodeId>,
}

impl HashDirectory {
    /// Build a directory over the given nodes, keeping only writable
    /// ones as routing targets.
    pub fn new(
        semaphore: &Semaphore,
        dimension: PartitionDimension,
        assigner: Arc<dyn Assigner>,
        nodes: &[Node],
    ) -> Self {
        let writable_nodes = nodes
            .iter()
            .filter(|n| n.status.is_writable())
            .map(|n| n.id)
            .collect();
        Self {
            revision: semaphore.revision,
            dimension,
            assigner,
            writable_nodes,
        }
    }
}

impl Directory for HashDirectory {
    fn revision(&self) -> u64 {
        self.revision
    }

    fn node_ids_for_key(&self, key: &PartitionKey) -> Vec<NodeId> {
        if self.writable_nodes.is_empty() {
            return Vec::new();
        }
        let mut hasher = DefaultHasher::new();
        key.to_bytes().hash(&mut hasher);
        let slot = (hasher.finish() % self.writable_nodes.len() as u64) as usize;
        vec![self.writable_nodes[slot]]
    }

    fn assign_key(&self) -> PartitionKey {
        self.assigner.assign(&self.dimension)
    }
}

/// Provider for [`HashDirectory`]. Loads the node set through the
/// store behind the hive URI, mirroring how a database-backed
/// directory reads its own index tables.
pub struct HashDirectoryProvider {
    store_provider: Arc<dyn StoreProvider>,
}

impl HashDirectoryProvider {
    /// Wrap a store provider for node-set loading.
    pub fn new(store_provider: Arc<dyn StoreProvider>) -> Self {
        Self { store_provider }
    }
}

impl DirectoryProvider for HashDirectoryProvider {
    fn directory(
        &self,
        uri: &str,
        assigner: Arc<dyn Assigner>,
        semaphore: &Semaphore,
        dimension: &PartitionDimension,
    ) -> Result<Arc<dyn Directory>> {
        let store = self.store_provider.open(uri)?;
        let nodes = store.load_all_nodes()?;
        Ok(Arc::new(HashDirectory::new(
            semaphore,
            dimension.clone(),
            assigner,
            &nodes,
        )))
    }
}
