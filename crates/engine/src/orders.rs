use chrono::Utc;
use tracing::debug;

use darzi_core::{
    ClientId, Customization, Discount, NewOrder, Order, OrderId, OrderStatus, OrderUpdate,
    Payment, Pricing, StatusEntry,
};
use darzi_storage::OrderDraft;

use crate::error::ShopError;
use crate::DbHandle;

pub struct OrderWorkflow {
    db: DbHandle,
}

impl OrderWorkflow {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    /// Places an order: freezes the client name/phone and the active
    /// measurement for the garment as snapshots, derives the pricing from
    /// the rate table default (unless the caller overrides the base
    /// charge), seeds the status history with `placed`, and stamps the
    /// client's last order date. All of it persists in one transaction.
    pub fn create(&self, new: NewOrder) -> Result<Order, ShopError> {
        if new.quantity < 1 {
            return Err(ShopError::Validation("quantity must be at least 1".into()));
        }
        if new.delivery_date < new.order_date {
            return Err(ShopError::Validation(format!(
                "delivery date {} is before order date {}",
                new.delivery_date, new.order_date
            )));
        }
        check_charges(
            new.base_charge.unwrap_or(0.0),
            &new.customizations,
            new.material_charges,
            new.urgent_charges,
            new.discount.as_ref(),
        )?;

        let mut db = self.db.borrow_mut();
        let client = db
            .get_client(&new.client_id)?
            .ok_or_else(|| ShopError::NotFound(format!("client {}", new.client_id)))?;
        let active = db.get_active_measurement(&new.client_id, new.garment_type)?;

        let base_charge = match new.base_charge {
            Some(base) => base,
            None => db
                .get_rate(new.garment_type)?
                .map(|rate| rate.amount)
                .unwrap_or(0.0),
        };
        let pricing = Pricing::compute(
            base_charge,
            new.customizations,
            new.material_charges,
            new.urgent_charges,
            new.discount,
        );

        let draft = OrderDraft {
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            client_phone: client.phone_number.clone(),
            order_date: new.order_date,
            delivery_date: new.delivery_date,
            priority: new.priority,
            garment_type: new.garment_type,
            quantity: new.quantity,
            fabric_details: new.fabric_details,
            design_details: new.design_details,
            measurement_id: active.as_ref().map(|m| m.id),
            measurement_snapshot: active,
            pricing,
            placed_at: Utc::now(),
            placed_notes: new.notes,
        };
        let order = db.insert_order(&draft)?;
        debug!(id = %order.id, client = %order.client_id, "order placed");
        Ok(order)
    }

    /// Appends a timestamped history entry and makes `status` current. Any
    /// target status is accepted; the history guarantees auditability, it
    /// does not police workflow order.
    pub fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        notes: Option<String>,
    ) -> Result<Order, ShopError> {
        let entry = StatusEntry {
            status,
            timestamp: Utc::now(),
            notes,
        };
        let mut db = self.db.borrow_mut();
        db.append_order_status(id, &entry)?;
        debug!(%id, status = status.as_str(), "order status changed");
        db.get_order(id)?
            .ok_or_else(|| ShopError::NotFound(format!("order {id}")))
    }

    /// Appends to the payment ledger. Overpayment is recorded, not
    /// rejected: the balance may go negative, keeping the ledger honest.
    pub fn add_payment(&self, id: &OrderId, payment: Payment) -> Result<Order, ShopError> {
        if !payment.amount.is_finite() || payment.amount <= 0.0 {
            return Err(ShopError::Validation(format!(
                "payment amount must be positive, got {}",
                payment.amount
            )));
        }
        let mut db = self.db.borrow_mut();
        db.append_order_payment(id, &payment)?;
        debug!(%id, amount = payment.amount, "payment recorded");
        db.get_order(id)?
            .ok_or_else(|| ShopError::NotFound(format!("order {id}")))
    }

    /// General field edit. Status, history and payments only change through
    /// `update_status` and `add_payment`, and the frozen snapshots are never
    /// re-resolved.
    pub fn update(&self, id: &OrderId, update: OrderUpdate) -> Result<Order, ShopError> {
        if update.quantity < 1 {
            return Err(ShopError::Validation("quantity must be at least 1".into()));
        }
        if update.delivery_date < update.order_date {
            return Err(ShopError::Validation(format!(
                "delivery date {} is before order date {}",
                update.delivery_date, update.order_date
            )));
        }
        check_charges(
            update.base_charge,
            &update.customizations,
            update.material_charges,
            update.urgent_charges,
            update.discount.as_ref(),
        )?;

        let mut db = self.db.borrow_mut();
        let mut order = db
            .get_order(id)?
            .ok_or_else(|| ShopError::NotFound(format!("order {id}")))?;
        order.order_date = update.order_date;
        order.delivery_date = update.delivery_date;
        order.priority = update.priority;
        order.garment_type = update.garment_type;
        order.quantity = update.quantity;
        order.fabric_details = update.fabric_details;
        order.design_details = update.design_details;
        order.pricing = Pricing::compute(
            update.base_charge,
            update.customizations,
            update.material_charges,
            update.urgent_charges,
            update.discount,
        );
        db.update_order(&order)?;
        debug!(%id, "order updated");
        Ok(order)
    }

    pub fn get_by_id(&self, id: &OrderId) -> Result<Option<Order>, ShopError> {
        Ok(self.db.borrow().get_order(id)?)
    }

    /// Newest orders first.
    pub fn get_all(&self) -> Result<Vec<Order>, ShopError> {
        Ok(self.db.borrow().list_orders()?)
    }

    pub fn get_by_client(&self, client_id: &ClientId) -> Result<Vec<Order>, ShopError> {
        Ok(self.db.borrow().list_orders_by_client(client_id)?)
    }
}

fn check_charges(
    base_charge: f64,
    customizations: &[Customization],
    material_charges: f64,
    urgent_charges: f64,
    discount: Option<&Discount>,
) -> Result<(), ShopError> {
    check_amount("base charge", base_charge)?;
    for customization in customizations {
        check_amount("customization amount", customization.amount)?;
    }
    check_amount("material charges", material_charges)?;
    check_amount("urgent charges", urgent_charges)?;
    if let Some(discount) = discount {
        check_amount("discount", discount.amount)?;
    }
    Ok(())
}

fn check_amount(label: &str, amount: f64) -> Result<(), ShopError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ShopError::Validation(format!(
            "{label} must be a non-negative number, got {amount}"
        )));
    }
    Ok(())
}
