//! In-memory reference store.
//!
//! One mutex serializes every operation, so the entity-write /
//! semaphore-increment sequence can never be observed half-done
//! in-process. Shared across facades through [`MemoryStoreProvider`],
//! it stands in for a shared metadata database in tests and
//! single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use hive_core::{
    EntityKind, HiveError, Node, NodeId, PartitionDimension, Resource, ResourceId, Result,
    SecondaryIndex, SecondaryIndexId, Semaphore,
};

use crate::contract::{HiveStore, StoreProvider};

#[derive(Debug, Default)]
struct StoreState {
    semaphore: Semaphore,
    nodes: Vec<Node>,
    dimension: Option<PartitionDimension>,
    next_node_id: u32,
    next_resource_id: u32,
    next_secondary_index_id: u32,
}

/// Mutex-guarded in-memory metadata store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// An empty store: revision 0, writable, no entities.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HiveStore for MemoryStore {
    fn create_node(&self, node: &Node) -> Result<Node> {
        let mut state = self.state.lock();
        state.next_node_id += 1;
        let mut stored = node.clone();
        stored.id = NodeId(state.next_node_id);
        state.nodes.push(stored.clone());
        Ok(stored)
    }

    fn update_node(&self, node: &Node) -> Result<()> {
        let mut state = self.state.lock();
        let slot = state
            .nodes
            .iter_mut()
            .find(|n| n.id == node.id)
            .ok_or(HiveError::NotFound {
                kind: EntityKind::Node,
                id: node.id.0,
            })?;
        *slot = node.clone();
        Ok(())
    }

    fn delete_node(&self, id: NodeId) -> Result<()> {
        let mut state = self.state.lock();
        let before = state.nodes.len();
        state.nodes.retain(|n| n.id != id);
        if state.nodes.len() == before {
            return Err(HiveError::NotFound {
                kind: EntityKind::Node,
                id: id.0,
            });
        }
        Ok(())
    }

    fn load_all_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.state.lock().nodes.clone())
    }

    fn create_dimension(&self, dimension: &PartitionDimension) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(existing) = &state.dimension {
            return Err(HiveError::AlreadyExists {
                dimension: existing.name.clone(),
                uri: dimension.index_uri.clone(),
            });
        }
        state.dimension = Some(dimension.clone());
        Ok(())
    }

    fn update_dimension(&self, dimension: &PartitionDimension) -> Result<()> {
        let mut state = self.state.lock();
        let stored = state.dimension.as_mut().ok_or(HiveError::NotFound {
            kind: EntityKind::PartitionDimension,
            id: 0,
        })?;
        stored.name = dimension.name.clone();
        stored.key_type = dimension.key_type;
        stored.index_uri = dimension.index_uri.clone();
        Ok(())
    }

    fn get_dimension(&self) -> Result<Option<PartitionDimension>> {
        Ok(self.state.lock().dimension.clone())
    }

    fn create_resource(&self, resource: &Resource) -> Result<Resource> {
        let mut state = self.state.lock();
        state.next_resource_id += 1;
        let id = ResourceId(state.next_resource_id);
        let dimension = state.dimension.as_mut().ok_or(HiveError::NotFound {
            kind: EntityKind::PartitionDimension,
            id: 0,
        })?;
        let mut stored = resource.clone();
        stored.id = id;
        dimension.resources.push(stored.clone());
        Ok(stored)
    }

    fn delete_resource(&self, id: ResourceId) -> Result<()> {
        let mut state = self.state.lock();
        let dimension = state.dimension.as_mut().ok_or(HiveError::NotFound {
            kind: EntityKind::PartitionDimension,
            id: 0,
        })?;
        let before = dimension.resources.len();
        dimension.resources.retain(|r| r.id != id);
        if dimension.resources.len() == before {
            return Err(HiveError::NotFound {
                kind: EntityKind::Resource,
                id: id.0,
            });
        }
        Ok(())
    }

    fn create_secondary_index(
        &self,
        resource: ResourceId,
        index: &SecondaryIndex,
    ) -> Result<SecondaryIndex> {
        let mut state = self.state.lock();
        state.next_secondary_index_id += 1;
        let id = SecondaryIndexId(state.next_secondary_index_id);
        let dimension = state.dimension.as_mut().ok_or(HiveError::NotFound {
            kind: EntityKind::PartitionDimension,
            id: 0,
        })?;
        let parent = dimension
            .resources
            .iter_mut()
            .find(|r| r.id == resource)
            .ok_or(HiveError::NotFound {
                kind: EntityKind::Resource,
                id: resource.0,
            })?;
        let mut stored = index.clone();
        stored.id = id;
        parent.secondary_indexes.push(stored.clone());
        Ok(stored)
    }

    fn delete_secondary_index(&self, id: SecondaryIndexId) -> Result<()> {
        let mut state = self.state.lock();
        let dimension = state.dimension.as_mut().ok_or(HiveError::NotFound {
            kind: EntityKind::PartitionDimension,
            id: 0,
        })?;
        for resource in &mut dimension.resources {
            let before = resource.secondary_indexes.len();
            resource.secondary_indexes.retain(|idx| idx.id != id);
            if resource.secondary_indexes.len() != before {
                return Ok(());
            }
        }
        Err(HiveError::NotFound {
            kind: EntityKind::SecondaryIndex,
            id: id.0,
        })
    }

    fn semaphore(&self) -> Result<Semaphore> {
        Ok(self.state.lock().semaphore)
    }

    fn update_semaphore(&self, semaphore: &Semaphore) -> Result<()> {
        self.state.lock().semaphore = *semaphore;
        Ok(())
    }

    fn increment_and_persist(&self) -> Result<Semaphore> {
        let mut state = self.state.lock();
        state.semaphore = state.semaphore.incremented();
        debug!(revision = state.semaphore.revision, "semaphore incremented");
        Ok(state.semaphore)
    }
}

/// URI-keyed cache of [`MemoryStore`] instances.
///
/// Two facades opened on the same URI share one store, which is how the
/// tests model independent processes converging on shared metadata.
#[derive(Debug, Default)]
pub struct MemoryStoreProvider {
    stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStoreProvider {
    /// An empty provider.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreProvider for MemoryStoreProvider {
    fn open(&self, uri: &str) -> Result<Arc<dyn HiveStore>> {
        let mut stores = self.stores.lock();
        let store = stores
            .entry(uri.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new()))
            .clone();
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::KeyType;

    #[test]
    fn test_node_ids_are_assigned_sequentially() {
        let store = MemoryStore::new();
        let a = store.create_node(&Node::new("a", "mem://a")).unwrap();
        let b = store.create_node(&Node::new("b", "mem://b")).unwrap();
        assert_eq!(a.id, NodeId(1));
        assert_eq!(b.id, NodeId(2));
        assert_eq!(store.load_all_nodes().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_missing_node_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete_node(NodeId(42)).unwrap_err();
        assert!(matches!(err, HiveError::NotFound { .. }));
    }

    #[test]
    fn test_second_dimension_is_rejected() {
        let store = MemoryStore::new();
        let dim = PartitionDimension::new("CustomerId", KeyType::BigInt, "mem://hive");
        store.create_dimension(&dim).unwrap();
        let err = store.create_dimension(&dim).unwrap_err();
        assert!(matches!(err, HiveError::AlreadyExists { .. }));
    }

    #[test]
    fn test_increment_is_sequential() {
        let store = MemoryStore::new();
        assert_eq!(store.semaphore().unwrap().revision, 0);
        assert_eq!(store.increment_and_persist().unwrap().revision, 1);
        assert_eq!(store.increment_and_persist().unwrap().revision, 2);
    }

    #[test]
    fn test_provider_shares_store_per_uri() {
        let provider = MemoryStoreProvider::new();
        let a = provider.open("mem://hive").unwrap();
        let b = provider.open("mem://hive").unwrap();
        a.increment_and_persist().unwrap();
        assert_eq!(b.semaphore().unwrap().revision, 1);

        let other = provider.open("mem://other").unwrap();
        assert_eq!(other.semaphore().unwrap().revision, 0);
    }

    #[test]
    fn test_secondary_index_lifecycle() {
        let store = MemoryStore::new();
        let dim = PartitionDimension::new("CustomerId", KeyType::BigInt, "mem://hive");
        store.create_dimension(&dim).unwrap();
        let resource = store.create_resource(&Resource::new("orders")).unwrap();
        let index = store
            .create_secondary_index(resource.id, &SecondaryIndex::new("order_number", KeyType::Text))
            .unwrap();

        let stored = store.get_dimension().unwrap().unwrap();
        assert!(stored.resource("orders").unwrap().has_secondary_index("order_number"));

        store.delete_secondary_index(index.id).unwrap();
        let stored = store.get_dimension().unwrap().unwrap();
        assert!(stored.resource("orders").unwrap().secondary_indexes.is_empty());
    }
}
