use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GarmentType {
    Shirt,
    Pant,
    Kurta,
    Blouse,
    SalwarKameez,
    Sherwani,
    Suit,
    Lehenga,
}

impl GarmentType {
    pub const ALL: [GarmentType; 8] = [
        Self::Shirt,
        Self::Pant,
        Self::Kurta,
        Self::Blouse,
        Self::SalwarKameez,
        Self::Sherwani,
        Self::Suit,
        Self::Lehenga,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shirt => "shirt",
            Self::Pant => "pant",
            Self::Kurta => "kurta",
            Self::Blouse => "blouse",
            Self::SalwarKameez => "salwar_kameez",
            Self::Sherwani => "sherwani",
            Self::Suit => "suit",
            Self::Lehenga => "lehenga",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "shirt" => Ok(Self::Shirt),
            "pant" => Ok(Self::Pant),
            "kurta" => Ok(Self::Kurta),
            "blouse" => Ok(Self::Blouse),
            "salwar_kameez" => Ok(Self::SalwarKameez),
            "sherwani" => Ok(Self::Sherwani),
            "suit" => Ok(Self::Suit),
            "lehenga" => Ok(Self::Lehenga),
            _ => Err(CoreError::UnknownVariant {
                kind: "garment type",
                value: s.to_string(),
            }),
        }
    }

    /// Measurement fields recorded for this garment, in the order the
    /// measurement form presents them.
    pub fn field_schema(&self) -> &'static [FieldSpec] {
        match self {
            Self::Shirt => SHIRT_FIELDS,
            Self::Pant => PANT_FIELDS,
            Self::Kurta => KURTA_FIELDS,
            Self::Blouse => BLOUSE_FIELDS,
            Self::SalwarKameez => SALWAR_KAMEEZ_FIELDS,
            Self::Sherwani => SHERWANI_FIELDS,
            Self::Suit => SUIT_FIELDS,
            Self::Lehenga => LEHENGA_FIELDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
}

const fn req(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        required: true,
    }
}

const fn opt(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
    }
}

const SHIRT_FIELDS: &[FieldSpec] = &[
    req("chest"),
    req("shoulder"),
    req("sleeve_length"),
    req("shirt_length"),
    req("neck"),
    opt("waist"),
    opt("cuff"),
];

const PANT_FIELDS: &[FieldSpec] = &[
    req("waist"),
    req("hip"),
    req("length"),
    req("inseam"),
    opt("thigh"),
    opt("knee"),
    opt("bottom"),
];

const KURTA_FIELDS: &[FieldSpec] = &[
    req("chest"),
    req("shoulder"),
    req("sleeve_length"),
    req("kurta_length"),
    req("neck"),
    opt("waist"),
    opt("hip"),
];

const BLOUSE_FIELDS: &[FieldSpec] = &[
    req("bust"),
    req("under_bust"),
    req("shoulder"),
    req("sleeve_length"),
    req("blouse_length"),
    opt("armhole"),
    opt("front_neck_depth"),
    opt("back_neck_depth"),
];

const SALWAR_KAMEEZ_FIELDS: &[FieldSpec] = &[
    req("bust"),
    req("waist"),
    req("hip"),
    req("shoulder"),
    req("sleeve_length"),
    req("kameez_length"),
    req("salwar_length"),
    opt("bottom"),
    opt("ankle"),
];

const SHERWANI_FIELDS: &[FieldSpec] = &[
    req("chest"),
    req("waist"),
    req("shoulder"),
    req("sleeve_length"),
    req("sherwani_length"),
    req("neck"),
    opt("hip"),
];

const SUIT_FIELDS: &[FieldSpec] = &[
    req("chest"),
    req("waist"),
    req("shoulder"),
    req("sleeve_length"),
    req("jacket_length"),
    req("trouser_waist"),
    req("trouser_length"),
    opt("hip"),
    opt("neck"),
];

const LEHENGA_FIELDS: &[FieldSpec] = &[
    req("waist"),
    req("hip"),
    req("lehenga_length"),
    opt("blouse_bust"),
    opt("blouse_length"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_garment_has_a_schema_with_required_fields() {
        for garment in GarmentType::ALL {
            let schema = garment.field_schema();
            assert!(!schema.is_empty(), "{garment:?} has no fields");
            assert!(
                schema.iter().any(|f| f.required),
                "{garment:?} has no required fields"
            );
        }
    }

    #[test]
    fn as_str_parse_round_trip() {
        for garment in GarmentType::ALL {
            assert_eq!(GarmentType::parse(garment.as_str()).unwrap(), garment);
        }
        assert!(GarmentType::parse("tuxedo").is_err());
    }

    #[test]
    fn field_names_are_unique_per_schema() {
        for garment in GarmentType::ALL {
            let schema = garment.field_schema();
            for (i, spec) in schema.iter().enumerate() {
                assert!(
                    !schema[..i].iter().any(|other| other.name == spec.name),
                    "{garment:?} repeats field {}",
                    spec.name
                );
            }
        }
    }
}
