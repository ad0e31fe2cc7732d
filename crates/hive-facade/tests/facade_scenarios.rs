//! End-to-end scenarios for the facade: bootstrap, write gating,
//! uniqueness preconditions, cross-facade convergence, and connection
//! eviction.

#![allow(clippy::unwrap_used, missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use hive_facade::{
    CachingDataSourceProvider, ChangeListener, Hive, HiveBuilder, HiveError, KeyType, Node,
    NodeId, PartitionDimension, Resource, ResourceId, SchemaInstaller, SecondaryIndex, Status,
    UriDataSourceProvider,
};
use hive_store::MemoryStoreProvider;

fn provider() -> Arc<MemoryStoreProvider> {
    Arc::new(MemoryStoreProvider::new())
}

fn new_hive(provider: &Arc<MemoryStoreProvider>) -> Hive {
    Hive::create("mem://hive", "CustomerId", KeyType::BigInt, provider.clone()).unwrap()
}

#[test]
fn test_create_bootstraps_revision_one() {
    let hive = new_hive(&provider());

    assert_eq!(hive.revision(), 1);
    assert_eq!(hive.status(), Status::Writable);
    let dimension = hive.partition_dimension().unwrap();
    assert_eq!(dimension.name, "CustomerId");
    assert!(dimension.resources.is_empty());
    assert!(hive.directory().is_some());
}

#[test]
fn test_create_against_existing_hive_fails() {
    let provider = provider();
    let _hive = new_hive(&provider);

    let err = Hive::create("mem://hive", "OrderId", KeyType::Text, provider.clone()).unwrap_err();
    assert!(matches!(err, HiveError::AlreadyExists { .. }));

    // The existing dimension is untouched.
    let again = Hive::load("mem://hive", provider).unwrap();
    assert_eq!(again.partition_dimension().unwrap().name, "CustomerId");
}

#[test]
fn test_add_node_increments_revision() {
    let hive = new_hive(&provider());

    let stored = hive.add_node(Node::new("shard-1", "mem://shard-1")).unwrap();
    assert_eq!(hive.revision(), 2);
    assert_ne!(stored.id, NodeId::UNASSIGNED);
    assert_eq!(hive.nodes().len(), 1);
}

#[test]
fn test_duplicate_node_name_is_rejected_case_insensitively() {
    let hive = new_hive(&provider());
    hive.add_node(Node::new("shard-1", "mem://shard-1")).unwrap();
    let revision = hive.revision();

    let err = hive
        .add_node(Node::new("SHARD-1", "mem://elsewhere"))
        .unwrap_err();
    assert!(matches!(err, HiveError::DuplicateName { .. }));
    assert_eq!(hive.revision(), revision);
    assert_eq!(hive.nodes().len(), 1);
}

#[test]
fn test_add_nodes_is_one_increment() {
    let hive = new_hive(&provider());
    let before = hive.revision();

    let stored = hive
        .add_nodes(vec![
            Node::new("a", "mem://a"),
            Node::new("b", "mem://b"),
            Node::new("c", "mem://c"),
        ])
        .unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(hive.revision(), before + 1);
}

#[test]
fn test_add_nodes_rejects_batch_internal_duplicates() {
    let hive = new_hive(&provider());
    let err = hive
        .add_nodes(vec![Node::new("a", "mem://a"), Node::new("A", "mem://a2")])
        .unwrap_err();
    assert!(matches!(err, HiveError::DuplicateName { .. }));
}

#[test]
fn test_read_only_gate_blocks_every_mutation() {
    let hive = new_hive(&provider());
    hive.add_node(Node::new("shard-1", "mem://shard-1")).unwrap();

    hive.update_hive_status(Status::ReadOnly).unwrap();
    let revision = hive.revision();

    let err = hive.add_node(Node::new("shard-2", "mem://shard-2")).unwrap_err();
    assert!(matches!(err, HiveError::NotWritable { .. }));
    let err = hive.add_resource(Resource::new("orders")).unwrap_err();
    assert!(matches!(err, HiveError::NotWritable { .. }));
    let err = hive
        .update_node_status(hive.nodes()[0].id, Status::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, HiveError::NotWritable { .. }));

    // No store write happened: revision and registry are unchanged.
    assert_eq!(hive.revision(), revision);
    assert_eq!(hive.nodes().len(), 1);
}

#[test]
fn test_status_update_reopens_the_gate() {
    let hive = new_hive(&provider());
    hive.update_hive_status(Status::ReadOnly).unwrap();
    hive.update_hive_status(Status::Writable).unwrap();

    hive.add_node(Node::new("shard-1", "mem://shard-1")).unwrap();
    assert_eq!(hive.nodes().len(), 1);
}

#[test]
fn test_update_and_delete_require_known_ids() {
    let hive = new_hive(&provider());

    let mut ghost = Node::new("ghost", "mem://ghost");
    ghost.id = NodeId(99);
    assert!(matches!(
        hive.update_node(ghost).unwrap_err(),
        HiveError::NotFound { .. }
    ));
    assert!(matches!(
        hive.delete_node(NodeId(99)).unwrap_err(),
        HiveError::NotFound { .. }
    ));
    assert!(matches!(
        hive.delete_resource(ResourceId(99)).unwrap_err(),
        HiveError::NotFound { .. }
    ));
}

#[test]
fn test_resource_and_secondary_index_uniqueness() {
    let hive = new_hive(&provider());
    let orders = hive.add_resource(Resource::new("orders")).unwrap();
    assert!(hive.resource_exists("orders"));

    let err = hive.add_resource(Resource::new("orders")).unwrap_err();
    assert!(matches!(err, HiveError::DuplicateName { .. }));
    // Resource names are case-sensitive, unlike node names.
    hive.add_resource(Resource::new("Orders")).unwrap();

    hive.add_secondary_index(orders.id, SecondaryIndex::new("order_number", KeyType::Text))
        .unwrap();
    let err = hive
        .add_secondary_index(orders.id, SecondaryIndex::new("order_number", KeyType::Text))
        .unwrap_err();
    assert!(matches!(err, HiveError::DuplicateName { .. }));
}

#[test]
fn test_secondary_index_lifecycle() {
    let hive = new_hive(&provider());
    let orders = hive.add_resource(Resource::new("orders")).unwrap();
    let index = hive
        .add_secondary_index(orders.id, SecondaryIndex::new("order_number", KeyType::Text))
        .unwrap();

    hive.delete_secondary_index(index.id).unwrap();
    let dimension = hive.partition_dimension().unwrap();
    assert!(dimension.resource("orders").unwrap().secondary_indexes.is_empty());

    hive.delete_resource(orders.id).unwrap();
    assert!(!hive.resource_exists("orders"));
}

#[test]
fn test_two_facades_converge_via_sync() {
    let provider = provider();
    let a = new_hive(&provider);
    let b = Hive::load("mem://hive", provider.clone()).unwrap();
    assert_eq!(b.revision(), a.revision());

    a.add_resource(Resource::new("orders")).unwrap();
    assert_ne!(b.revision(), a.revision());

    assert!(b.sync().unwrap());
    assert_eq!(b.revision(), a.revision());
    assert!(b.partition_dimension().unwrap().has_resource("orders"));

    // Idempotent: no change, no replacement.
    assert!(!b.sync().unwrap());
}

#[test]
fn test_snapshot_pairing_is_atomic() {
    let provider = provider();
    let hive = new_hive(&provider);

    hive.add_node(Node::new("shard-1", "mem://shard-1")).unwrap();
    hive.add_resource(Resource::new("orders")).unwrap();

    // Every observed snapshot pairs its directory with the exact
    // revision the rest of the view was installed at.
    let snap = hive.snapshot();
    assert_eq!(snap.directory.unwrap().revision(), snap.semaphore.revision);
    assert!(snap.connection.is_some());
    assert_eq!(snap.nodes.len(), 1);
}

#[test]
fn test_status_change_propagates_to_other_facades() {
    let provider = provider();
    let a = new_hive(&provider);
    let b = Hive::load("mem://hive", provider).unwrap();

    a.update_hive_status(Status::ReadOnly).unwrap();
    assert_eq!(b.status(), Status::Writable);
    assert!(b.sync().unwrap());
    assert_eq!(b.status(), Status::ReadOnly);
}

#[test]
fn test_delete_node_evicts_connection_entry() {
    let store_provider = provider();
    let data_sources = Arc::new(CachingDataSourceProvider::new(Arc::new(
        UriDataSourceProvider,
    )));
    let hive = HiveBuilder::new("mem://hive", store_provider)
        .with_data_source_provider(data_sources.clone())
        .create("CustomerId", KeyType::BigInt)
        .unwrap();

    let node = hive.add_node(Node::new("shard-1", "mem://shard-1")).unwrap();
    let handle = hive.connection().unwrap().resolve(node.id).unwrap();
    assert_eq!(handle.uri(), "mem://shard-1");

    hive.delete_node(node.id).unwrap();

    // The post-deletion resolver no longer knows the node, even though
    // the provider could have kept serving its cached handle.
    let err = hive.connection().unwrap().resolve(node.id).unwrap_err();
    assert!(matches!(err, HiveError::NotFound { .. }));
}

#[test]
fn test_node_lookup_by_name_and_id() {
    let hive = new_hive(&provider());
    let stored = hive.add_node(Node::new("Shard-A", "mem://a")).unwrap();

    assert_eq!(hive.node_by_name("shard-a").unwrap().id, stored.id);
    assert_eq!(hive.node_by_id(stored.id).unwrap().name, "Shard-A");
    assert!(hive.node_by_name("shard-b").is_none());
}

#[test]
fn test_load_before_create_is_a_valid_bootstrap() {
    let provider = provider();
    let hive = Hive::load("mem://hive", provider).unwrap();

    assert_eq!(hive.revision(), 0);
    assert!(hive.partition_dimension().is_none());
    assert!(hive.directory().is_none());

    // Nodes can be registered before the dimension exists.
    hive.add_node(Node::new("shard-1", "mem://shard-1")).unwrap();
    assert_eq!(hive.nodes().len(), 1);

    // Resource creation needs the dimension.
    let err = hive.add_resource(Resource::new("orders")).unwrap_err();
    assert!(matches!(err, HiveError::NotFound { .. }));
}

#[test]
fn test_update_partition_dimension() {
    let provider = provider();
    let a = new_hive(&provider);
    let b = Hive::load("mem://hive", provider).unwrap();

    let mut dimension = a.partition_dimension().unwrap();
    dimension.name = "AccountId".into();
    a.update_partition_dimension(dimension).unwrap();

    assert!(b.sync().unwrap());
    assert_eq!(b.partition_dimension().unwrap().name, "AccountId");
}

#[derive(Default)]
struct RecordingListener {
    revisions: Mutex<Vec<u64>>,
}

impl ChangeListener for RecordingListener {
    fn hive_changed(&self, revision: u64) {
        self.revisions.lock().push(revision);
    }
}

#[test]
fn test_external_change_cascades_to_listeners() {
    let provider = provider();
    let a = new_hive(&provider);
    let b = Hive::load("mem://hive", provider).unwrap();

    let listener = Arc::new(RecordingListener::default());
    b.subscribe(listener.clone());

    a.add_node(Node::new("shard-1", "mem://shard-1")).unwrap();
    assert!(b.on_external_change().unwrap());
    assert_eq!(*listener.revisions.lock(), vec![b.revision()]);

    // Nothing changed: no sync, no notification.
    assert!(!b.on_external_change().unwrap());
    assert_eq!(listener.revisions.lock().len(), 1);
}

#[derive(Default)]
struct CountingInstaller {
    calls: AtomicUsize,
}

impl SchemaInstaller for CountingInstaller {
    fn install(&self, _dimension: &PartitionDimension, _uri: &str) -> hive_facade::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_schema_installation_runs_at_create_and_after_commits() {
    let installer = Arc::new(CountingInstaller::default());
    let hive = HiveBuilder::new("mem://hive", provider())
        .with_schema_installer(installer.clone())
        .create("CustomerId", KeyType::BigInt)
        .unwrap();
    assert_eq!(installer.calls.load(Ordering::SeqCst), 1);

    let orders = hive.add_resource(Resource::new("orders")).unwrap();
    assert_eq!(installer.calls.load(Ordering::SeqCst), 2);

    hive.add_secondary_index(orders.id, SecondaryIndex::new("order_number", KeyType::Text))
        .unwrap();
    assert_eq!(installer.calls.load(Ordering::SeqCst), 3);

    // Deletions do not materialize anything.
    hive.delete_resource(orders.id).unwrap();
    assert_eq!(installer.calls.load(Ordering::SeqCst), 3);
}

struct FailingInstaller;

impl SchemaInstaller for FailingInstaller {
    fn install(&self, _dimension: &PartitionDimension, _uri: &str) -> hive_facade::Result<()> {
        Err(HiveError::store("index database unreachable"))
    }
}

#[test]
fn test_failed_schema_install_does_not_roll_back_metadata() {
    // Bootstrap with a working installer, then swap in a failing one
    // by rebuilding against the same store.
    let store_provider = provider();
    let _seed = new_hive(&store_provider);

    let hive = HiveBuilder::new("mem://hive", store_provider)
        .with_schema_installer(Arc::new(FailingInstaller))
        .load()
        .unwrap();

    // Post-commit installation is best-effort: the resource stands.
    let before = hive.revision();
    hive.add_resource(Resource::new("orders")).unwrap();
    assert_eq!(hive.revision(), before + 1);
    assert!(hive.resource_exists("orders"));
}
