pub mod client;
pub mod config;
pub mod error;
pub mod garment;
pub mod ids;
pub mod measurement;
pub mod order;
pub mod snapshot;

pub use client::{Client, ClientUpdate, NewClient};
pub use config::{Rate, Setting};
pub use error::CoreError;
pub use garment::{FieldSpec, GarmentType};
pub use ids::{ClientId, MeasurementId, OrderId};
pub use measurement::{Measurement, MeasurementUnit, NewMeasurement};
pub use order::{
    Customization, Discount, NewOrder, Order, OrderStatus, OrderUpdate, Payment, PaymentKind,
    PaymentMethod, Pricing, Priority, StatusEntry,
};
pub use snapshot::ShopSnapshot;
