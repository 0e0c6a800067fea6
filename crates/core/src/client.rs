use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::ClientId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Primary contact number, indexed for duplicate detection.
    pub phone_number: String,
    pub secondary_phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    /// Set at creation, immutable afterwards.
    pub registration_date: NaiveDate,
    /// Maintained by the order workflow, not by client updates.
    pub last_order_date: Option<NaiveDate>,
}

impl Client {
    /// Exact, case-sensitive match against either phone field.
    pub fn has_phone(&self, phone: &str) -> bool {
        self.phone_number == phone || self.secondary_phone.as_deref() == Some(phone)
    }

    /// Case-insensitive substring match over name, primary phone and id.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.phone_number.contains(query)
            || self.id.as_str().to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub name: String,
    pub phone_number: String,
    pub secondary_phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

/// Replacement values for every mutable client field. Id, registration date
/// and last order date are not part of the update surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdate {
    pub name: String,
    pub phone_number: String,
    pub secondary_phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Client {
        Client {
            id: ClientId::from_string("CLT-20250110-0001".into()),
            name: "Asha Verma".into(),
            phone_number: "9876543210".into(),
            secondary_phone: Some("9811111111".into()),
            address: None,
            email: None,
            notes: None,
            registration_date: "2025-01-10".parse().unwrap(),
            last_order_date: None,
        }
    }

    #[test]
    fn has_phone_checks_both_numbers_exactly() {
        let c = sample();
        assert!(c.has_phone("9876543210"));
        assert!(c.has_phone("9811111111"));
        assert!(!c.has_phone("987654321"));
    }

    #[test]
    fn matches_query_is_case_insensitive_on_name_and_id() {
        let c = sample();
        assert!(c.matches_query("asha"));
        assert!(c.matches_query("VERMA"));
        assert!(c.matches_query("clt-20250110"));
        assert!(c.matches_query("98765"));
        assert!(!c.matches_query("ravi"));
    }
}
