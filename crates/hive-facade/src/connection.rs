//! The data-source boundary: node-to-connection resolution.
//!
//! Connection handles are opaque to the facade; it only routes node
//! records to the provider and caches the results per snapshot. The
//! provider may keep its own URI-keyed cache with a lifetime beyond any
//! single snapshot, which is why node deletion evicts explicitly
//! instead of relying on snapshot replacement.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use hive_core::{EntityKind, HiveError, Node, NodeId, PartitionKey, Result};

use crate::directory::Directory;

/// Opaque handle to a live data source.
pub trait DataSource: Send + Sync {
    /// Location this handle is connected to.
    fn uri(&self) -> &str;
}

/// Resolves a URI to a connection handle. `evict` drops any cached
/// handle for the URI; the default implementation caches nothing and
/// so has nothing to drop.
pub trait DataSourceProvider: Send + Sync {
    /// Open (or reuse) a handle for the given URI.
    fn data_source(&self, uri: &str) -> Result<Arc<dyn DataSource>>;

    /// Drop any cached handle for the URI.
    fn evict(&self, _uri: &str) {}
}

/// Minimal handle carrying only its URI. Real deployments substitute a
/// pooled connection here.
#[derive(Debug)]
pub struct UriDataSource {
    uri: String,
}

impl UriDataSource {
    /// Handle for the given URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl std::fmt::Debug for dyn DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource").field("uri", &self.uri()).finish()
    }
}

impl DataSource for UriDataSource {
    fn uri(&self) -> &str {
        &self.uri
    }
}

/// Provider that fabricates a fresh [`UriDataSource`] per call.
#[derive(Debug, Default)]
pub struct UriDataSourceProvider;

impl DataSourceProvider for UriDataSourceProvider {
    fn data_source(&self, uri: &str) -> Result<Arc<dyn DataSource>> {
        Ok(Arc::new(UriDataSource::new(uri)))
    }
}

/// Decorator adding an explicit URI-keyed cache over another provider.
///
/// This is the dependency-injected replacement for the original
/// design's process-wide caching singleton: the cache is owned by
/// whoever constructed it and shared only where it is passed.
pub struct CachingDataSourceProvider {
    inner: Arc<dyn DataSourceProvider>,
    cache: Mutex<HashMap<String, Arc<dyn DataSource>>>,
}

impl CachingDataSourceProvider {
    /// Cache handles produced by `inner`.
    pub fn new(inner: Arc<dyn DataSourceProvider>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl DataSourceProvider for CachingDataSourceProvider {
    fn data_source(&self, uri: &str) -> Result<Arc<dyn DataSource>> {
        if let Some(handle) = self.cache.lock().get(uri) {
            return Ok(handle.clone());
        }
        let handle = self.inner.data_source(uri)?;
        self.cache.lock().insert(uri.to_string(), handle.clone());
        Ok(handle)
    }

    fn evict(&self, uri: &str) {
        if self.cache.lock().remove(uri).is_some() {
            debug!(uri, "data-source cache entry evicted");
        }
        self.inner.evict(uri);
    }
}

/// Per-snapshot map from node id to data-source handle.
///
/// Built fresh alongside each directory and paired with the same node
/// registry; resolution for a node absent from that registry fails even
/// if the provider still caches the node's URI.
pub struct ConnectionResolver {
    directory: Arc<dyn Directory>,
    nodes: Vec<Node>,
    provider: Arc<dyn DataSourceProvider>,
    cache: Mutex<HashMap<NodeId, Arc<dyn DataSource>>>,
}

impl ConnectionResolver {
    /// Build a resolver over the given registry snapshot.
    pub fn new(
        directory: Arc<dyn Directory>,
        nodes: Vec<Node>,
        provider: Arc<dyn DataSourceProvider>,
    ) -> Self {
        Self {
            directory,
            nodes,
            provider,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a node id to a live handle, lazily opening it through
    /// the provider.
    pub fn resolve(&self, id: NodeId) -> Result<Arc<dyn DataSource>> {
        let node = self
            .nodes
            .iter()
            .find(|n| n.id == id)
            .ok_or(HiveError::NotFound {
                kind: EntityKind::Node,
                id: id.0,
            })?;
        if let Some(handle) = self.cache.lock().get(&id) {
            return Ok(handle.clone());
        }
        let handle = self.provider.data_source(&node.uri)?;
        self.cache.lock().insert(id, handle.clone());
        Ok(handle)
    }

    /// Resolve every node holding the given partition key.
    pub fn resolve_for_key(&self, key: &PartitionKey) -> Result<Vec<Arc<dyn DataSource>>> {
        self.directory
            .node_ids_for_key(key)
            .into_iter()
            .map(|id| self.resolve(id))
            .collect()
    }

    /// Evict the node's handle from this resolver and from the
    /// provider's cache. Called on node deletion; snapshot replacement
    /// alone is not guaranteed to drop provider-cached handles.
    pub fn remove_node(&self, node: &Node) {
        self.cache.lock().remove(&node.id);
        self.provider.evict(&node.uri);
        debug!(node = %node.id, uri = %node.uri, "connection entry removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::HashDirectory;
    use hive_core::{KeyType, PartitionDimension, RandomAssigner, Semaphore};

    fn node(id: u32, name: &str) -> Node {
        let mut n = Node::new(name, format!("mem://{name}"));
        n.id = NodeId(id);
        n
    }

    fn resolver_over(nodes: Vec<Node>) -> ConnectionResolver {
        let dimension = PartitionDimension::new("CustomerId", KeyType::BigInt, "mem://hive");
        let directory = Arc::new(HashDirectory::new(
            &Semaphore::new(),
            dimension,
            Arc::new(RandomAssigner),
            &nodes,
        ));
        let provider = Arc::new(CachingDataSourceProvider::new(Arc::new(
            UriDataSourceProvider,
        )));
        ConnectionResolver::new(directory, nodes, provider)
    }

    #[test]
    fn test_resolve_returns_node_uri() {
        let resolver = resolver_over(vec![node(1, "a")]);
        let handle = resolver.resolve(NodeId(1)).unwrap();
        assert_eq!(handle.uri(), "mem://a");
    }

    #[test]
    fn test_resolve_unknown_node_is_not_found() {
        let resolver = resolver_over(vec![node(1, "a")]);
        let err = resolver.resolve(NodeId(9)).unwrap_err();
        assert!(matches!(err, HiveError::NotFound { .. }));
    }

    #[test]
    fn test_resolve_for_key_follows_directory() {
        let resolver = resolver_over(vec![node(1, "a"), node(2, "b")]);
        let handles = resolver.resolve_for_key(&PartitionKey::BigInt(7)).unwrap();
        assert_eq!(handles.len(), 1);
        assert!(handles[0].uri().starts_with("mem://"));
    }

    #[test]
    fn test_caching_provider_reuses_handles() {
        let provider = CachingDataSourceProvider::new(Arc::new(UriDataSourceProvider));
        let a = provider.data_source("mem://a").unwrap();
        let b = provider.data_source("mem://a").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        provider.evict("mem://a");
        let c = provider.data_source("mem://a").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
