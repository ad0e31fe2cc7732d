//! The hive facade: the authoritative in-memory view of a sharded
//! deployment's metadata, kept convergent across processes by a
//! revision-gated synchronization protocol.
//!
//! # Architecture
//!
//! A [`Hive`] holds one snapshot — semaphore, node registry, partition
//! dimension, directory, connection resolver — behind a single lock,
//! replaced as a unit and never patched in place. Every mutation:
//!
//! 1. checks the write gate (semaphore status),
//! 2. checks its entity-specific precondition against the snapshot,
//! 3. persists through the [`hive_store::HiveStore`] contract,
//! 4. atomically increments the persisted revision and re-syncs.
//!
//! Independent facades on the same URI converge by polling
//! [`Hive::sync`] or by reacting to an external change signal; staleness
//! detection is nothing more than comparing the persisted revision with
//! the in-memory one.
//!
//! Key-to-node routing ([`Directory`]) and live connection handles
//! ([`DataSource`]) are external collaborators reached through
//! dependency-injected providers; the facade only rebuilds and pairs
//! them with the revision they were built from.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod directory;
pub mod hive;
pub mod schema;

pub use connection::{
    CachingDataSourceProvider, ConnectionResolver, DataSource, DataSourceProvider, UriDataSource,
    UriDataSourceProvider,
};
pub use directory::{Directory, DirectoryProvider, HashDirectory, HashDirectoryProvider};
pub use hive::{ChangeListener, Hive, HiveBuilder, HiveSnapshot};
pub use schema::{NullSchemaInstaller, SchemaInstaller};

pub use hive_core::{
    Assigner, EntityKind, HiveError, KeyType, Node, NodeId, PartitionDimension, PartitionKey,
    RandomAssigner, Resource, ResourceId, Result, RoundRobinAssigner, SecondaryIndex,
    SecondaryIndexId, Semaphore, Status,
};
