use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Human-readable record ids of the form `PFX-YYYYMMDD-NNNN`: the business
/// date the record was created, plus a 4-digit daily sequence starting at 1.
macro_rules! daily_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn from_parts(date: NaiveDate, sequence: u32) -> Self {
                Self(format!(
                    "{}-{}-{:04}",
                    Self::PREFIX,
                    date.format("%Y%m%d"),
                    sequence
                ))
            }

            pub fn from_string(raw: String) -> Self {
                Self(raw)
            }

            /// SQL LIKE pattern matching every id issued on `date`.
            pub fn day_pattern(date: NaiveDate) -> String {
                format!("{}-{}-%", Self::PREFIX, date.format("%Y%m%d"))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The daily sequence component, if the id is well formed.
            pub fn sequence(&self) -> Option<u32> {
                self.0.rsplit('-').next()?.parse().ok()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

daily_id!(ClientId, "CLT");
daily_id!(OrderId, "ORD");

/// Measurements are internal records, never shown to customers, so they use
/// a plain UUID instead of a daily sequence.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementId(Uuid);

impl MeasurementId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeasurementId({})", &self.0.to_string()[..8])
    }
}

impl Default for MeasurementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn order_id_format() {
        let id = OrderId::from_parts(date(2025, 1, 10), 4);
        assert_eq!(id.as_str(), "ORD-20250110-0004");
        assert_eq!(id.sequence(), Some(4));
    }

    #[test]
    fn client_id_format() {
        let id = ClientId::from_parts(date(2025, 12, 3), 127);
        assert_eq!(id.as_str(), "CLT-20251203-0127");
    }

    #[test]
    fn day_pattern_matches_prefix() {
        assert_eq!(OrderId::day_pattern(date(2025, 1, 10)), "ORD-20250110-%");
        assert_eq!(ClientId::day_pattern(date(2025, 1, 10)), "CLT-20250110-%");
    }

    #[test]
    fn sequence_of_malformed_id_is_none() {
        assert_eq!(OrderId::from_string("ORD-garbage".into()).sequence(), None);
    }
}
