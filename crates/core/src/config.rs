use serde::{Deserialize, Serialize};

use crate::garment::GarmentType;

/// Default stitching charge for a garment type. One row per type, no
/// history; setting a rate overwrites the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    pub garment_type: GarmentType,
    pub amount: f64,
}

/// Flat key/value shop configuration (shop name, receipt footer, and so on).
/// The data layer does not interpret the values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub key: String,
    pub value: String,
}
