//! Partition-key assignment strategies.
//!
//! An assigner produces a partition-key value for an entity that has
//! none yet. The contract is deliberately weak: the value must be
//! well-formed for the dimension's key domain, nothing more. Collision
//! avoidance and uniqueness are the directory's responsibility.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

use crate::dimension::PartitionDimension;
use crate::key::{KeyType, PartitionKey};

/// Strategy producing new partition-key values for unassigned entities.
pub trait Assigner: Send + Sync {
    /// Produce a value well-formed for the dimension's key domain.
    fn assign(&self, dimension: &PartitionDimension) -> PartitionKey;
}

/// Default strategy: uniform random selection from the key domain.
#[derive(Debug, Default)]
pub struct RandomAssigner;

impl Assigner for RandomAssigner {
    fn assign(&self, dimension: &PartitionDimension) -> PartitionKey {
        let mut rng = rand::thread_rng();
        match dimension.key_type {
            KeyType::Integer => PartitionKey::Integer(rng.gen()),
            KeyType::BigInt => PartitionKey::BigInt(rng.gen()),
            KeyType::Text => {
                let suffix: u128 = rng.gen();
                PartitionKey::Text(format!("{suffix:032x}"))
            }
        }
    }
}

/// Counter-based strategy, useful when deterministic key sequences are
/// wanted (tests, bulk loads).
#[derive(Debug, Default)]
pub struct RoundRobinAssigner {
    counter: AtomicU64,
}

impl Assigner for RoundRobinAssigner {
    fn assign(&self, dimension: &PartitionDimension) -> PartitionKey {
        let next = self.counter.fetch_add(1, Ordering::Relaxed);
        match dimension.key_type {
            KeyType::Integer => PartitionKey::Integer(next as i32),
            KeyType::BigInt => PartitionKey::BigInt(next as i64),
            KeyType::Text => PartitionKey::Text(format!("key-{next}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimension(key_type: KeyType) -> PartitionDimension {
        PartitionDimension::new("CustomerId", key_type, "mem://hive")
    }

    #[test]
    fn test_random_assigner_matches_domain() {
        let assigner = RandomAssigner;
        for key_type in [KeyType::Integer, KeyType::BigInt, KeyType::Text] {
            let key = assigner.assign(&dimension(key_type));
            assert_eq!(key.key_type(), key_type);
        }
    }

    #[test]
    fn test_round_robin_assigner_is_sequential() {
        let assigner = RoundRobinAssigner::default();
        let dim = dimension(KeyType::BigInt);
        assert_eq!(assigner.assign(&dim), PartitionKey::BigInt(0));
        assert_eq!(assigner.assign(&dim), PartitionKey::BigInt(1));
        assert_eq!(assigner.assign(&dim), PartitionKey::BigInt(2));
    }
}
