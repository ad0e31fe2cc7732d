//! The versioned write-gate token.

use serde::{Deserialize, Serialize};

/// Write-gate state of a hive installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Metadata mutations are permitted.
    Writable,
    /// Metadata mutations fail with `NotWritable`.
    ReadOnly,
}

impl Status {
    /// True when mutations are permitted.
    pub fn is_writable(self) -> bool {
        matches!(self, Status::Writable)
    }
}

/// Revision-and-status stamp used to detect metadata staleness.
///
/// The persisted revision strictly increases by one per successful
/// mutation; comparing it against an in-memory copy is the sole
/// staleness test the sync protocol performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semaphore {
    /// Monotonically increasing metadata revision.
    pub revision: u64,
    /// Current write-gate state.
    pub status: Status,
}

impl Semaphore {
    /// A fresh semaphore: revision zero, writable.
    pub fn new() -> Self {
        Self {
            revision: 0,
            status: Status::Writable,
        }
    }

    /// Copy with the revision bumped by one.
    pub fn incremented(self) -> Self {
        Self {
            revision: self.revision + 1,
            status: self.status,
        }
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semaphore_increment() {
        let sem = Semaphore::new();
        assert_eq!(sem.revision, 0);
        assert!(sem.status.is_writable());

        let next = sem.incremented();
        assert_eq!(next.revision, 1);
        assert_eq!(next.status, sem.status);
    }
}
