use tracing::debug;

use darzi_core::{GarmentType, Rate, Setting};

use crate::error::ShopError;
use crate::DbHandle;

/// Default stitching charges per garment type. Last write wins, no history.
pub struct RateTable {
    db: DbHandle,
}

impl RateTable {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    pub fn get_all(&self) -> Result<Vec<Rate>, ShopError> {
        Ok(self.db.borrow().list_rates()?)
    }

    pub fn get(&self, garment_type: GarmentType) -> Result<Option<Rate>, ShopError> {
        Ok(self.db.borrow().get_rate(garment_type)?)
    }

    pub fn set(&self, garment_type: GarmentType, amount: f64) -> Result<(), ShopError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ShopError::Validation(format!(
                "rate must be a non-negative number, got {amount}"
            )));
        }
        self.db.borrow_mut().set_rate(garment_type, amount)?;
        debug!(garment = garment_type.as_str(), amount, "rate set");
        Ok(())
    }
}

/// Flat key/value shop configuration. Values are opaque strings here; the
/// UI owns their meaning.
pub struct SettingsStore {
    db: DbHandle,
}

impl SettingsStore {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    pub fn get_all(&self) -> Result<Vec<Setting>, ShopError> {
        Ok(self.db.borrow().list_settings()?)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, ShopError> {
        Ok(self.db.borrow().get_setting(key)?)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), ShopError> {
        self.db.borrow_mut().set_setting(key, value)?;
        debug!(key, "setting stored");
        Ok(())
    }
}
