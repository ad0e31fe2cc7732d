//! The schema-installer boundary.
//!
//! After a resource or secondary-index commit, and at dimension
//! creation, the facade asks the installer to materialize physical
//! structures matching the new metadata. The call is synchronous but
//! not transactional with the metadata write.

use hive_core::{PartitionDimension, Result};

/// Materializes physical index structures for a dimension.
pub trait SchemaInstaller: Send + Sync {
    /// Install structures for the dimension at the given URI.
    fn install(&self, dimension: &PartitionDimension, uri: &str) -> Result<()>;
}

/// Installer that materializes nothing. The default for deployments
/// where index storage is provisioned out of band.
#[derive(Debug, Default)]
pub struct NullSchemaInstaller;

impl SchemaInstaller for NullSchemaInstaller {
    fn install(&self, _dimension: &PartitionDimension, _uri: &str) -> Result<()> {
        Ok(())
    }
}
