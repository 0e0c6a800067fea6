use tracing::{debug, info};

use darzi_core::ShopSnapshot;
use darzi_storage::StorageError;

use crate::error::ShopError;
use crate::DbHandle;

/// Whole-store export and import, used by the settings screen for backup
/// and migration between installations.
pub struct DataPortability {
    db: DbHandle,
}

impl DataPortability {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    /// Deep copy of every table. Exporting then importing into an empty
    /// store reproduces the identical record set.
    pub fn export_all(&self) -> Result<ShopSnapshot, ShopError> {
        let snapshot = self.db.borrow().export_all()?;
        debug!(
            clients = snapshot.clients.len(),
            orders = snapshot.orders.len(),
            "store exported"
        );
        Ok(snapshot)
    }

    pub fn export_json(&self) -> Result<serde_json::Value, ShopError> {
        let snapshot = self.export_all()?;
        serde_json::to_value(&snapshot)
            .map_err(|e| ShopError::Storage(StorageError::Serialization(e.to_string())))
    }

    /// Merges the snapshot into the store, last write wins per record, as
    /// one transaction: either every record lands or none do.
    pub fn import_all(&self, snapshot: &ShopSnapshot) -> Result<(), ShopError> {
        self.db.borrow_mut().import_all(snapshot)?;
        info!(
            clients = snapshot.clients.len(),
            measurements = snapshot.measurements.len(),
            orders = snapshot.orders.len(),
            "store imported"
        );
        Ok(())
    }

    /// Validates the document shape by typed deserialization before any
    /// write; a malformed document fails validation with the store
    /// untouched.
    pub fn import_json(&self, document: serde_json::Value) -> Result<(), ShopError> {
        let snapshot: ShopSnapshot = serde_json::from_value(document)
            .map_err(|e| ShopError::Validation(format!("malformed import document: {e}")))?;
        self.import_all(&snapshot)
    }
}
