use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::garment::GarmentType;
use crate::ids::{ClientId, MeasurementId, OrderId};
use crate::measurement::Measurement;
use crate::CoreError;

/// Workflow stage of an order. The data layer accepts any target status and
/// records it in the history; it does not police the forward order, so the
/// UI is free to skip or revisit stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    FabricReceived,
    Cutting,
    Stitching,
    Trial,
    Alterations,
    Completed,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 10] = [
        Self::Placed,
        Self::FabricReceived,
        Self::Cutting,
        Self::Stitching,
        Self::Trial,
        Self::Alterations,
        Self::Completed,
        Self::Ready,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::FabricReceived => "fabric_received",
            Self::Cutting => "cutting",
            Self::Stitching => "stitching",
            Self::Trial => "trial",
            Self::Alterations => "alterations",
            Self::Completed => "completed",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "order status",
                value: s.to_string(),
            })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "normal" => Ok(Self::Normal),
            "urgent" => Ok(Self::Urgent),
            _ => Err(CoreError::UnknownVariant {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Upi => "upi",
            Self::BankTransfer => "bank_transfer",
            Self::Cheque => "cheque",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "upi" => Ok(Self::Upi),
            "bank_transfer" => Ok(Self::BankTransfer),
            "cheque" => Ok(Self::Cheque),
            _ => Err(CoreError::UnknownVariant {
                kind: "payment method",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Advance,
    Partial,
    Final,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Partial => "partial",
            Self::Final => "final",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "advance" => Ok(Self::Advance),
            "partial" => Ok(Self::Partial),
            "final" => Ok(Self::Final),
            _ => Err(CoreError::UnknownVariant {
                kind: "payment kind",
                value: s.to_string(),
            }),
        }
    }
}

/// One entry in an order's append-only status audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub amount: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub base_charge: f64,
    pub customizations: Vec<Customization>,
    pub material_charges: f64,
    pub urgent_charges: f64,
    pub discount: Option<Discount>,
    pub subtotal: f64,
    pub total: f64,
}

impl Pricing {
    /// Derives subtotal and total from the pricing components. The total is
    /// clamped at zero when the discount exceeds the subtotal.
    pub fn compute(
        base_charge: f64,
        customizations: Vec<Customization>,
        material_charges: f64,
        urgent_charges: f64,
        discount: Option<Discount>,
    ) -> Self {
        let subtotal = base_charge
            + customizations.iter().map(|c| c.amount).sum::<f64>()
            + material_charges
            + urgent_charges;
        let total = (subtotal - discount.as_ref().map_or(0.0, |d| d.amount)).max(0.0);
        Self {
            base_charge,
            customizations,
            material_charges,
            urgent_charges,
            discount,
            subtotal,
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub amount: f64,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    #[serde(rename = "type")]
    pub kind: PaymentKind,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub client_id: ClientId,
    /// Client snapshot frozen at order creation; never re-resolved from the
    /// live client record.
    pub client_name: String,
    pub client_phone: String,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub priority: Priority,
    pub garment_type: GarmentType,
    pub quantity: u32,
    pub fabric_details: Option<String>,
    pub design_details: Option<String>,
    pub measurement_id: Option<MeasurementId>,
    /// Copy of the measurement that was active when the order was placed,
    /// kept for traceability even if the client is measured again.
    pub measurement_snapshot: Option<Measurement>,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    pub pricing: Pricing,
    pub payments: Vec<Payment>,
}

impl Order {
    /// Sum of every recorded payment. Always derived, never stored.
    pub fn total_paid(&self) -> f64 {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Total minus payments. Negative on overpayment; the ledger keeps the
    /// real amounts rather than truncating.
    pub fn balance_due(&self) -> f64 {
        self.pricing.total - self.total_paid()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub client_id: ClientId,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub priority: Priority,
    pub garment_type: GarmentType,
    pub quantity: u32,
    pub fabric_details: Option<String>,
    pub design_details: Option<String>,
    /// Overrides the rate table's default for the garment type when set.
    pub base_charge: Option<f64>,
    pub customizations: Vec<Customization>,
    pub material_charges: f64,
    pub urgent_charges: f64,
    pub discount: Option<Discount>,
    /// Notes attached to the initial `placed` history entry.
    pub notes: Option<String>,
}

/// Replacement values for the order fields editable after creation. Status,
/// history and payments are only reachable through their dedicated
/// operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub priority: Priority,
    pub garment_type: GarmentType,
    pub quantity: u32,
    pub fabric_details: Option<String>,
    pub design_details: Option<String>,
    pub base_charge: f64,
    pub customizations: Vec<Customization>,
    pub material_charges: f64,
    pub urgent_charges: f64,
    pub discount: Option<Discount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_sums_components() {
        let pricing = Pricing::compute(
            500.0,
            vec![
                Customization {
                    description: "contrast collar".into(),
                    amount: 80.0,
                },
                Customization {
                    description: "monogram".into(),
                    amount: 20.0,
                },
            ],
            150.0,
            50.0,
            Some(Discount {
                amount: 100.0,
                reason: Some("regular".into()),
            }),
        );
        assert_eq!(pricing.subtotal, 800.0);
        assert_eq!(pricing.total, 700.0);
    }

    #[test]
    fn pricing_total_clamps_at_zero() {
        let pricing = Pricing::compute(
            100.0,
            vec![],
            0.0,
            0.0,
            Some(Discount {
                amount: 250.0,
                reason: None,
            }),
        );
        assert_eq!(pricing.subtotal, 100.0);
        assert_eq!(pricing.total, 0.0);
    }

    #[test]
    fn pricing_without_discount() {
        let pricing = Pricing::compute(300.0, vec![], 0.0, 0.0, None);
        assert_eq!(pricing.subtotal, 300.0);
        assert_eq!(pricing.total, 300.0);
    }

    #[test]
    fn status_round_trip_and_terminals() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Ready.is_terminal());
        assert!(OrderStatus::parse("misplaced").is_err());
    }
}
