use chrono::Utc;
use tracing::debug;

use darzi_core::measurement::validate_values;
use darzi_core::{ClientId, GarmentType, Measurement, MeasurementId, NewMeasurement};

use crate::error::ShopError;
use crate::DbHandle;

pub struct MeasurementStore {
    db: DbHandle,
}

impl MeasurementStore {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    /// Records a new measurement version. The previous active record for
    /// the `(client, garment_type)` pair is deactivated and the new record
    /// inserted as active with the next version number, atomically.
    /// Corrections are new versions; records are never edited in place.
    pub fn create(&self, new: NewMeasurement) -> Result<Measurement, ShopError> {
        validate_values(new.garment_type, &new.measurements)?;
        let measurement =
            self.db
                .borrow_mut()
                .insert_measurement(&new, MeasurementId::new(), Utc::now())?;
        debug!(
            id = %measurement.id,
            client = %measurement.client_id,
            garment = measurement.garment_type.as_str(),
            version = measurement.version,
            "measurement recorded"
        );
        Ok(measurement)
    }

    /// All of a client's measurement versions, grouped by garment type with
    /// the newest version first within each group.
    pub fn get_by_client(&self, client_id: &ClientId) -> Result<Vec<Measurement>, ShopError> {
        Ok(self.db.borrow().list_measurements_by_client(client_id)?)
    }

    pub fn get_active(
        &self,
        client_id: &ClientId,
        garment_type: GarmentType,
    ) -> Result<Option<Measurement>, ShopError> {
        Ok(self.db.borrow().get_active_measurement(client_id, garment_type)?)
    }
}
