pub mod clients;
pub mod config;
pub mod error;
pub mod measurements;
pub mod orders;
pub mod portability;

pub use clients::ClientStore;
pub use config::{RateTable, SettingsStore};
pub use error::ShopError;
pub use measurements::MeasurementStore;
pub use orders::OrderWorkflow;
pub use portability::DataPortability;

use std::cell::RefCell;
use std::rc::Rc;

use darzi_storage::ShopDb;

/// Shared handle to the shop database. The data layer runs on a single UI
/// thread of control, so a Rc<RefCell<..>> context is enough; each store
/// holds a clone, and tests build isolated in-memory handles.
pub type DbHandle = Rc<RefCell<ShopDb>>;

/// The full service surface the UI calls into, one instance per process.
pub struct Shop {
    pub clients: ClientStore,
    pub measurements: MeasurementStore,
    pub orders: OrderWorkflow,
    pub rates: RateTable,
    pub settings: SettingsStore,
    pub portability: DataPortability,
}

impl Shop {
    pub fn open(path: &str) -> Result<Self, ShopError> {
        Ok(Self::with_db(Rc::new(RefCell::new(ShopDb::open(path)?))))
    }

    pub fn open_in_memory() -> Result<Self, ShopError> {
        Ok(Self::with_db(Rc::new(RefCell::new(ShopDb::open_in_memory()?))))
    }

    pub fn with_db(db: DbHandle) -> Self {
        Self {
            clients: ClientStore::new(db.clone()),
            measurements: MeasurementStore::new(db.clone()),
            orders: OrderWorkflow::new(db.clone()),
            rates: RateTable::new(db.clone()),
            settings: SettingsStore::new(db.clone()),
            portability: DataPortability::new(db),
        }
    }
}
