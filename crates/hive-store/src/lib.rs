//! Persistence contract for hive metadata, plus the in-memory
//! reference store.
//!
//! The contract is per-entity CRUD (nodes, the partition dimension,
//! resources, secondary indexes) and a semaphore with an atomic
//! increment. The facade funnels every successful mutation through
//! that increment, which is what makes cross-process staleness
//! detection possible.
//!
//! Only the memory backend lives here; SQL-backed stores are external
//! implementations of the same trait.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod contract;
pub mod memory;

pub use contract::{HiveStore, StoreProvider};
pub use memory::{MemoryStore, MemoryStoreProvider};
