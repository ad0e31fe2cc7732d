//! Core metadata model for the hive control plane.
//!
//! This crate defines the sharding schema (partition dimension, resources,
//! secondary indexes), the physical node record, the versioned semaphore
//! used for staleness detection and write gating, and the pluggable
//! partition-key assignment strategies. It is pure data and pure logic:
//! no I/O, no locking, no persistence.
//!
//! Persistence contracts live in `hive-store`; the orchestrating facade
//! lives in `hive-facade`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assigner;
pub mod dimension;
pub mod error;
pub mod key;
pub mod node;
pub mod semaphore;

pub use assigner::{Assigner, RandomAssigner, RoundRobinAssigner};
pub use dimension::{PartitionDimension, Resource, SecondaryIndex};
pub use error::{EntityKind, HiveError, Result};
pub use key::{KeyType, PartitionKey};
pub use node::{Node, NodeId, ResourceId, SecondaryIndexId};
pub use semaphore::{Semaphore, Status};
