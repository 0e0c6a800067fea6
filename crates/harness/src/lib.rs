use std::collections::BTreeMap;

use chrono::NaiveDate;

use darzi_core::{
    Client, ClientId, GarmentType, Measurement, MeasurementUnit, NewClient, NewMeasurement,
    NewOrder, Order, Priority,
};
use darzi_engine::{Shop, ShopError};

/// Test fixture wrapping a fully wired service surface over an isolated
/// in-memory database.
pub struct TestShop {
    pub shop: Shop,
}

impl TestShop {
    pub fn new() -> Result<Self, ShopError> {
        Ok(Self {
            shop: Shop::open_in_memory()?,
        })
    }

    pub fn open_at(path: &str) -> Result<Self, ShopError> {
        Ok(Self {
            shop: Shop::open(path)?,
        })
    }

    pub fn add_client(&self, name: &str, phone: &str) -> Result<Client, ShopError> {
        self.shop.clients.create(NewClient {
            name: name.into(),
            phone_number: phone.into(),
            ..Default::default()
        })
    }

    /// Records a measurement with plausible values for every required field
    /// of the garment's schema.
    pub fn add_measurement(
        &self,
        client_id: &ClientId,
        garment_type: GarmentType,
    ) -> Result<Measurement, ShopError> {
        self.shop.measurements.create(NewMeasurement {
            client_id: client_id.clone(),
            garment_type,
            measurements: garment_values(garment_type),
            unit: MeasurementUnit::Inches,
            notes: None,
        })
    }

    pub fn place_order(&self, client_id: &ClientId) -> Result<Order, ShopError> {
        self.shop.orders.create(order_input(client_id))
    }
}

/// A filled-in value map covering the garment's required fields.
pub fn garment_values(garment_type: GarmentType) -> BTreeMap<String, f64> {
    garment_type
        .field_schema()
        .iter()
        .filter(|spec| spec.required)
        .enumerate()
        .map(|(i, spec)| (spec.name.to_string(), 20.0 + i as f64))
        .collect()
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("test date")
}

/// A plain shirt order: fixed January dates so order ids are predictable,
/// explicit base charge so tests do not depend on the rate table.
pub fn order_input(client_id: &ClientId) -> NewOrder {
    NewOrder {
        client_id: client_id.clone(),
        order_date: date("2025-01-10"),
        delivery_date: date("2025-01-20"),
        priority: Priority::Normal,
        garment_type: GarmentType::Shirt,
        quantity: 1,
        fabric_details: None,
        design_details: None,
        base_charge: Some(500.0),
        customizations: Vec::new(),
        material_charges: 0.0,
        urgent_charges: 0.0,
        discount: None,
        notes: None,
    }
}
