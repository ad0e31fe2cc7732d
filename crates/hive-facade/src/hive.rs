//! The orchestrating facade: snapshot ownership, the sync protocol,
//! and write-gated metadata CRUD.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use hive_core::{
    Assigner, EntityKind, HiveError, KeyType, Node, NodeId, PartitionDimension, RandomAssigner,
    Resource, ResourceId, Result, SecondaryIndex, SecondaryIndexId, Semaphore, Status,
};
use hive_store::{HiveStore, StoreProvider};

use crate::connection::{
    CachingDataSourceProvider, ConnectionResolver, DataSourceProvider, UriDataSourceProvider,
};
use crate::directory::{Directory, DirectoryProvider, HashDirectoryProvider};
use crate::schema::{NullSchemaInstaller, SchemaInstaller};

// =============================================================================
// Listeners
// =============================================================================

/// Callback invoked synchronously after a confirmed sync change.
///
/// Registered explicitly on the facade; there is no ambient
/// notification channel. Used for cascading invalidation of caches
/// keyed by revision.
pub trait ChangeListener: Send + Sync {
    /// The hive's snapshot was replaced at the given revision.
    fn hive_changed(&self, revision: u64);
}

// =============================================================================
// Snapshot
// =============================================================================

/// One internally consistent view of the hive.
///
/// Directory and connection resolver are `None` only before the
/// partition dimension has been created.
#[derive(Clone)]
pub struct HiveSnapshot {
    /// Semaphore the view was taken at.
    pub semaphore: Semaphore,
    /// Node registry at that revision.
    pub nodes: Vec<Node>,
    /// Partition dimension at that revision, if created.
    pub dimension: Option<PartitionDimension>,
    /// Directory built from exactly this dimension and semaphore.
    pub directory: Option<Arc<dyn Directory>>,
    /// Connection resolver paired with the same registry.
    pub connection: Option<Arc<ConnectionResolver>>,
}

impl HiveSnapshot {
    fn empty() -> Self {
        Self {
            semaphore: Semaphore::new(),
            nodes: Vec::new(),
            dimension: None,
            directory: None,
            connection: None,
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`Hive`] with optional collaborators. `load` attaches to
/// an existing installation, `create` provisions a new one.
pub struct HiveBuilder {
    uri: String,
    store_provider: Arc<dyn StoreProvider>,
    assigner: Arc<dyn Assigner>,
    directory_provider: Option<Arc<dyn DirectoryProvider>>,
    data_source_provider: Arc<dyn DataSourceProvider>,
    schema_installer: Arc<dyn SchemaInstaller>,
}

impl HiveBuilder {
    /// Builder with default collaborators: random assigner,
    /// hash-routing directory, caching URI data sources, no-op schema
    /// installer.
    pub fn new(uri: impl Into<String>, store_provider: Arc<dyn StoreProvider>) -> Self {
        Self {
            uri: uri.into(),
            store_provider,
            assigner: Arc::new(RandomAssigner),
            directory_provider: None,
            data_source_provider: Arc::new(CachingDataSourceProvider::new(Arc::new(
                UriDataSourceProvider,
            ))),
            schema_installer: Arc::new(NullSchemaInstaller),
        }
    }

    /// Substitute the key-assignment strategy.
    pub fn with_assigner(mut self, assigner: Arc<dyn Assigner>) -> Self {
        self.assigner = assigner;
        self
    }

    /// Substitute the directory provider.
    pub fn with_directory_provider(mut self, provider: Arc<dyn DirectoryProvider>) -> Self {
        self.directory_provider = Some(provider);
        self
    }

    /// Substitute the data-source provider.
    pub fn with_data_source_provider(mut self, provider: Arc<dyn DataSourceProvider>) -> Self {
        self.data_source_provider = provider;
        self
    }

    /// Substitute the schema installer.
    pub fn with_schema_installer(mut self, installer: Arc<dyn SchemaInstaller>) -> Self {
        self.schema_installer = installer;
        self
    }

    fn connect(self) -> Result<Hive> {
        let store = self.store_provider.open(&self.uri)?;
        let directory_provider = match self.directory_provider {
            Some(provider) => provider,
            None => Arc::new(HashDirectoryProvider::new(self.store_provider.clone())),
        };
        Ok(Hive {
            uri: self.uri,
            store,
            assigner: self.assigner,
            directory_provider,
            data_source_provider: self.data_source_provider,
            schema_installer: self.schema_installer,
            snapshot: RwLock::new(HiveSnapshot::empty()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Attach to an existing installation and perform the initial
    /// forced sync.
    pub fn load(self) -> Result<Hive> {
        let hive = self.connect()?;
        hive.force_sync()?;
        info!(uri = %hive.uri, revision = hive.revision(), "hive loaded");
        Ok(hive)
    }

    /// Provision a new installation with the given dimension. Fails
    /// with `AlreadyExists` if the URI already holds one.
    pub fn create(self, dimension_name: &str, key_type: KeyType) -> Result<Hive> {
        let hive = self.connect()?;
        if let Some(existing) = hive.store.get_dimension()? {
            return Err(HiveError::AlreadyExists {
                dimension: existing.name,
                uri: hive.uri,
            });
        }
        let dimension = PartitionDimension::new(dimension_name, key_type, hive.uri.clone());
        hive.store.create_dimension(&dimension)?;
        // Bootstrap installation failures are fatal, unlike the
        // best-effort installs after later metadata commits.
        hive.schema_installer.install(&dimension, &hive.uri)?;
        hive.increment_and_persist()?;
        info!(uri = %hive.uri, dimension = %dimension.name, "hive created");
        Ok(hive)
    }
}

// =============================================================================
// Facade
// =============================================================================

/// The facade for all fundamental CRUD on hive metadata, and the owner
/// of the one-lock snapshot the rest of the system reads through.
pub struct Hive {
    uri: String,
    store: Arc<dyn HiveStore>,
    assigner: Arc<dyn Assigner>,
    directory_provider: Arc<dyn DirectoryProvider>,
    data_source_provider: Arc<dyn DataSourceProvider>,
    schema_installer: Arc<dyn SchemaInstaller>,
    snapshot: RwLock<HiveSnapshot>,
    listeners: Mutex<Vec<Arc<dyn ChangeListener>>>,
}

impl std::fmt::Debug for Hive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hive").field("uri", &self.uri).finish_non_exhaustive()
    }
}

impl Hive {
    /// Attach to an existing installation with default collaborators.
    pub fn load(uri: impl Into<String>, store_provider: Arc<dyn StoreProvider>) -> Result<Hive> {
        HiveBuilder::new(uri, store_provider).load()
    }

    /// Provision a new installation with default collaborators.
    pub fn create(
        uri: impl Into<String>,
        dimension_name: &str,
        key_type: KeyType,
        store_provider: Arc<dyn StoreProvider>,
    ) -> Result<Hive> {
        HiveBuilder::new(uri, store_provider).create(dimension_name, key_type)
    }

    // -------------------------------------------------------------------------
    // Synchronization protocol
    // -------------------------------------------------------------------------

    /// Pull the persisted state into memory if the persisted revision
    /// differs from the in-memory one. Returns whether a replacement
    /// happened.
    pub fn sync(&self) -> Result<bool> {
        let persisted = self.store.semaphore()?;
        let current = self.snapshot.read().semaphore;
        if current.revision == persisted.revision {
            debug!(revision = current.revision, "sync: already current");
            return Ok(false);
        }
        self.replace_snapshot(persisted)?;
        Ok(true)
    }

    /// Replace the snapshot unconditionally, ignoring the revision
    /// comparison. Used at bootstrap and to force a local rebuild.
    pub fn force_sync(&self) -> Result<bool> {
        let persisted = self.store.semaphore()?;
        self.replace_snapshot(persisted)?;
        Ok(true)
    }

    /// Snapshot replacement. Nodes are always refreshed; the
    /// dimension/directory/connection triple is refreshed only when a
    /// dimension exists, and its absence is the expected pre-creation
    /// state, not a failure. The whole snapshot swaps in under one
    /// write lock.
    fn replace_snapshot(&self, semaphore: Semaphore) -> Result<()> {
        let nodes = self.store.load_all_nodes()?;
        match self.store.get_dimension()? {
            Some(dimension) => {
                let directory = self.directory_provider.directory(
                    &self.uri,
                    self.assigner.clone(),
                    &semaphore,
                    &dimension,
                )?;
                let connection = Arc::new(ConnectionResolver::new(
                    directory.clone(),
                    nodes.clone(),
                    self.data_source_provider.clone(),
                ));
                let mut snap = self.snapshot.write();
                snap.semaphore = semaphore;
                snap.nodes = nodes;
                snap.dimension = Some(dimension);
                snap.directory = Some(directory);
                snap.connection = Some(connection);
            }
            None => {
                let mut snap = self.snapshot.write();
                snap.semaphore = semaphore;
                snap.nodes = nodes;
            }
        }
        info!(uri = %self.uri, revision = semaphore.revision, "snapshot replaced");
        Ok(())
    }

    /// The funnel every mutation uses: bump the persisted revision
    /// atomically, then sync so the in-memory revision matches it.
    fn increment_and_persist(&self) -> Result<()> {
        self.store.increment_and_persist()?;
        self.sync()?;
        Ok(())
    }

    /// React to an externally signaled change: sync, and when a
    /// replacement happened, notify registered listeners.
    pub fn on_external_change(&self) -> Result<bool> {
        if !self.sync()? {
            return Ok(false);
        }
        let revision = self.revision();
        for listener in self.listeners.lock().iter() {
            listener.hive_changed(revision);
        }
        Ok(true)
    }

    /// Register a listener for confirmed sync changes.
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) {
        self.listeners.lock().push(listener);
    }

    // -------------------------------------------------------------------------
    // Write gate
    // -------------------------------------------------------------------------

    /// Update the hive's write-gate status. Persisted immediately with
    /// its own revision increment; other facades observe it on their
    /// next sync. Never gated itself, otherwise a read-only hive could
    /// not be unlocked.
    pub fn update_hive_status(&self, status: Status) -> Result<()> {
        let mut semaphore = self.store.semaphore()?;
        semaphore.status = status;
        self.store.update_semaphore(&semaphore)?;
        self.increment_and_persist()?;
        info!(uri = %self.uri, ?status, "hive status updated");
        Ok(())
    }

    fn assert_writable(&self) -> Result<()> {
        if self.status().is_writable() {
            Ok(())
        } else {
            Err(HiveError::NotWritable {
                uri: self.uri.clone(),
            })
        }
    }

    // -------------------------------------------------------------------------
    // Node CRUD
    // -------------------------------------------------------------------------

    fn assert_node_name_unique(&self, name: &str, siblings: &[Node]) -> Result<()> {
        let registry = self.snapshot.read();
        if registry.nodes.iter().chain(siblings).any(|n| n.name_matches(name)) {
            return Err(HiveError::DuplicateName {
                kind: EntityKind::Node,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Add a node to the deployment. Name must be unique
    /// (case-insensitive) across the registry.
    pub fn add_node(&self, node: Node) -> Result<Node> {
        self.assert_writable()?;
        self.assert_node_name_unique(&node.name, &[])?;
        let stored = self.store.create_node(&node)?;
        self.increment_and_persist()?;
        info!(uri = %self.uri, node = %stored.name, id = %stored.id, "node added");
        Ok(stored)
    }

    /// Add several nodes under one gate check and one revision
    /// increment. Uniqueness is checked against the registry and the
    /// earlier nodes of the same batch; the first collision aborts the
    /// remainder.
    pub fn add_nodes(&self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        self.assert_writable()?;
        let mut stored = Vec::with_capacity(nodes.len());
        for node in nodes {
            self.assert_node_name_unique(&node.name, &stored)?;
            stored.push(self.store.create_node(&node)?);
        }
        self.increment_and_persist()?;
        info!(uri = %self.uri, count = stored.len(), "nodes added");
        Ok(stored)
    }

    /// Update the node matching the given record's id.
    pub fn update_node(&self, node: Node) -> Result<Node> {
        self.assert_writable()?;
        self.assert_node_present(node.id)?;
        self.store.update_node(&node)?;
        self.increment_and_persist()?;
        Ok(node)
    }

    /// Update one node's write-gate status. A read-only hive rejects
    /// this like any other mutation; there is no silent override.
    pub fn update_node_status(&self, id: NodeId, status: Status) -> Result<Node> {
        self.assert_writable()?;
        let mut node = self.assert_node_present(id)?;
        node.status = status;
        self.store.update_node(&node)?;
        self.increment_and_persist()?;
        info!(uri = %self.uri, node = %node.name, ?status, "node status updated");
        Ok(node)
    }

    /// Delete a node and evict its connection-resolver entry. The
    /// resolver's provider may cache handles beyond a snapshot's
    /// lifetime, so eviction is explicit rather than left to the
    /// snapshot replacement.
    pub fn delete_node(&self, id: NodeId) -> Result<Node> {
        self.assert_writable()?;
        let node = self.assert_node_present(id)?;
        self.store.delete_node(id)?;
        self.increment_and_persist()?;
        match self.snapshot.read().connection.clone() {
            Some(connection) => connection.remove_node(&node),
            None => self.data_source_provider.evict(&node.uri),
        }
        info!(uri = %self.uri, node = %node.name, "node deleted");
        Ok(node)
    }

    fn assert_node_present(&self, id: NodeId) -> Result<Node> {
        self.snapshot
            .read()
            .nodes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or(HiveError::NotFound {
                kind: EntityKind::Node,
                id: id.0,
            })
    }

    // -------------------------------------------------------------------------
    // Dimension / resource / secondary-index CRUD
    // -------------------------------------------------------------------------

    fn current_dimension(&self) -> Result<PartitionDimension> {
        self.snapshot
            .read()
            .dimension
            .clone()
            .ok_or(HiveError::NotFound {
                kind: EntityKind::PartitionDimension,
                id: 0,
            })
    }

    /// Update the partition dimension's own fields. Node changes are
    /// not part of this call.
    pub fn update_partition_dimension(&self, dimension: PartitionDimension) -> Result<()> {
        self.assert_writable()?;
        self.store.update_dimension(&dimension)?;
        self.increment_and_persist()?;
        Ok(())
    }

    /// Add a resource to the dimension. Name must be unique
    /// (case-sensitive) among the dimension's resources. Schema
    /// materialization runs after the commit, best-effort.
    pub fn add_resource(&self, resource: Resource) -> Result<Resource> {
        self.assert_writable()?;
        let dimension = self.current_dimension()?;
        if dimension.has_resource(&resource.name) {
            return Err(HiveError::DuplicateName {
                kind: EntityKind::Resource,
                name: resource.name,
            });
        }
        let stored = self.store.create_resource(&resource)?;
        self.increment_and_persist()?;
        self.install_schema();
        info!(uri = %self.uri, resource = %stored.name, "resource added");
        Ok(stored)
    }

    /// Delete a resource by id.
    pub fn delete_resource(&self, id: ResourceId) -> Result<()> {
        self.assert_writable()?;
        let dimension = self.current_dimension()?;
        if dimension.resource_by_id(id).is_none() {
            return Err(HiveError::NotFound {
                kind: EntityKind::Resource,
                id: id.0,
            });
        }
        self.store.delete_resource(id)?;
        self.increment_and_persist()?;
        Ok(())
    }

    /// Add a secondary index to a resource. Name must be unique within
    /// the resource. Schema materialization runs after the commit,
    /// best-effort.
    pub fn add_secondary_index(
        &self,
        resource: ResourceId,
        index: SecondaryIndex,
    ) -> Result<SecondaryIndex> {
        self.assert_writable()?;
        let dimension = self.current_dimension()?;
        let parent = dimension.resource_by_id(resource).ok_or(HiveError::NotFound {
            kind: EntityKind::Resource,
            id: resource.0,
        })?;
        if parent.has_secondary_index(&index.name) {
            return Err(HiveError::DuplicateName {
                kind: EntityKind::SecondaryIndex,
                name: index.name,
            });
        }
        let stored = self.store.create_secondary_index(resource, &index)?;
        self.increment_and_persist()?;
        self.install_schema();
        info!(uri = %self.uri, index = %stored.name, "secondary index added");
        Ok(stored)
    }

    /// Delete a secondary index by id.
    pub fn delete_secondary_index(&self, id: SecondaryIndexId) -> Result<()> {
        self.assert_writable()?;
        let dimension = self.current_dimension()?;
        let present = dimension
            .resources
            .iter()
            .flat_map(|r| &r.secondary_indexes)
            .any(|idx| idx.id == id);
        if !present {
            return Err(HiveError::NotFound {
                kind: EntityKind::SecondaryIndex,
                id: id.0,
            });
        }
        self.store.delete_secondary_index(id)?;
        self.increment_and_persist()?;
        Ok(())
    }

    /// Post-commit schema materialization. Not transactional with the
    /// metadata write; failure is logged and the mutation stands.
    fn install_schema(&self) {
        let dimension = match self.snapshot.read().dimension.clone() {
            Some(dimension) => dimension,
            None => return,
        };
        if let Err(e) = self.schema_installer.install(&dimension, &dimension.index_uri) {
            warn!(uri = %self.uri, error = %e, "schema installation failed after commit");
        }
    }

    // -------------------------------------------------------------------------
    // Readers
    // -------------------------------------------------------------------------

    /// URI of this installation.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The in-memory revision.
    pub fn revision(&self) -> u64 {
        self.snapshot.read().semaphore.revision
    }

    /// Current write-gate status.
    pub fn status(&self) -> Status {
        self.snapshot.read().semaphore.status
    }

    /// The in-memory semaphore.
    pub fn semaphore(&self) -> Semaphore {
        self.snapshot.read().semaphore
    }

    /// A consistent copy of the whole snapshot. Everything in the
    /// returned view was installed together under one critical section.
    pub fn snapshot(&self) -> HiveSnapshot {
        self.snapshot.read().clone()
    }

    /// The node registry at the current revision.
    pub fn nodes(&self) -> Vec<Node> {
        self.snapshot.read().nodes.clone()
    }

    /// Look up a node by name, case-insensitively.
    pub fn node_by_name(&self, name: &str) -> Option<Node> {
        self.snapshot
            .read()
            .nodes
            .iter()
            .find(|n| n.name_matches(name))
            .cloned()
    }

    /// Look up a node by id.
    pub fn node_by_id(&self, id: NodeId) -> Option<Node> {
        self.snapshot.read().nodes.iter().find(|n| n.id == id).cloned()
    }

    /// The partition dimension, if created.
    pub fn partition_dimension(&self) -> Option<PartitionDimension> {
        self.snapshot.read().dimension.clone()
    }

    /// True when the dimension has a resource with this exact name.
    pub fn resource_exists(&self, name: &str) -> bool {
        self.snapshot
            .read()
            .dimension
            .as_ref()
            .is_some_and(|d| d.has_resource(name))
    }

    /// The directory paired with the current snapshot.
    pub fn directory(&self) -> Option<Arc<dyn Directory>> {
        self.snapshot.read().directory.clone()
    }

    /// The connection resolver paired with the current snapshot.
    pub fn connection(&self) -> Option<Arc<ConnectionResolver>> {
        self.snapshot.read().connection.clone()
    }

    /// The key-assignment strategy.
    pub fn assigner(&self) -> Arc<dyn Assigner> {
        self.assigner.clone()
    }
}

impl std::fmt::Display for Hive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snap = self.snapshot.read();
        let dimension = snap
            .dimension
            .as_ref()
            .map_or("none", |d| d.name.as_str());
        write!(
            f,
            "hive at {} revision {} dimension {}",
            self.uri, snap.semaphore.revision, dimension
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
