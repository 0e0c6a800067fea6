use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::config::{Rate, Setting};
use crate::measurement::Measurement;
use crate::order::Order;

/// The whole-store export document: five named arrays of full records. This
/// is the system's one durable interchange format, so it must round-trip
/// losslessly through export and import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopSnapshot {
    pub clients: Vec<Client>,
    pub measurements: Vec<Measurement>,
    pub orders: Vec<Order>,
    pub settings: Vec<Setting>,
    pub rates: Vec<Rate>,
}

impl ShopSnapshot {
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
            && self.measurements.is_empty()
            && self.orders.is_empty()
            && self.settings.is_empty()
            && self.rates.is_empty()
    }
}
