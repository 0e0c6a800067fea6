use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::garment::GarmentType;
use crate::ids::{ClientId, MeasurementId};
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementUnit {
    Inches,
    Cm,
}

impl MeasurementUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inches => "inches",
            Self::Cm => "cm",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "inches" => Ok(Self::Inches),
            "cm" => Ok(Self::Cm),
            _ => Err(CoreError::UnknownVariant {
                kind: "measurement unit",
                value: s.to_string(),
            }),
        }
    }
}

/// One version of a client's measurements for a garment type. Versions are
/// dense from 1 per `(client, garment_type)` and at most one version per
/// pair is active. Records are immutable once written; a correction is a new
/// version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: MeasurementId,
    pub client_id: ClientId,
    pub garment_type: GarmentType,
    pub version: u32,
    pub is_active: bool,
    pub measurements: BTreeMap<String, f64>,
    pub unit: MeasurementUnit,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeasurement {
    pub client_id: ClientId,
    pub garment_type: GarmentType,
    pub measurements: BTreeMap<String, f64>,
    pub unit: MeasurementUnit,
    pub notes: Option<String>,
}

/// Checks a value map against the garment's field schema: every required
/// field present, no unknown fields, every supplied value finite and > 0.
pub fn validate_values(
    garment: GarmentType,
    values: &BTreeMap<String, f64>,
) -> Result<(), CoreError> {
    let schema = garment.field_schema();

    for spec in schema {
        if spec.required && !values.contains_key(spec.name) {
            return Err(CoreError::InvalidData(format!(
                "missing required field '{}' for {}",
                spec.name,
                garment.as_str()
            )));
        }
    }

    for (name, value) in values {
        if !schema.iter().any(|spec| spec.name == name.as_str()) {
            return Err(CoreError::InvalidData(format!(
                "unknown field '{}' for {}",
                name,
                garment.as_str()
            )));
        }
        if !value.is_finite() || *value <= 0.0 {
            return Err(CoreError::InvalidData(format!(
                "field '{name}' must be a positive number, got {value}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt_values() -> BTreeMap<String, f64> {
        [
            ("chest", 40.0),
            ("shoulder", 17.5),
            ("sleeve_length", 24.0),
            ("shirt_length", 29.0),
            ("neck", 15.5),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn accepts_complete_shirt_values() {
        assert!(validate_values(GarmentType::Shirt, &shirt_values()).is_ok());
    }

    #[test]
    fn accepts_optional_fields() {
        let mut values = shirt_values();
        values.insert("waist".into(), 34.0);
        assert!(validate_values(GarmentType::Shirt, &values).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let mut values = shirt_values();
        values.remove("neck");
        let err = validate_values(GarmentType::Shirt, &values).unwrap_err();
        assert!(err.to_string().contains("neck"));
    }

    #[test]
    fn rejects_unknown_field() {
        let mut values = shirt_values();
        values.insert("wingspan".into(), 70.0);
        assert!(validate_values(GarmentType::Shirt, &values).is_err());
    }

    #[test]
    fn rejects_non_positive_and_non_finite_values() {
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let mut values = shirt_values();
            values.insert("chest".into(), bad);
            assert!(
                validate_values(GarmentType::Shirt, &values).is_err(),
                "accepted {bad}"
            );
        }
    }
}
