use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use darzi_core::{
    Client, ClientId, Customization, Discount, GarmentType, Measurement, MeasurementId,
    MeasurementUnit, NewClient, NewMeasurement, Order, OrderId, OrderStatus, Payment, PaymentKind,
    PaymentMethod, Pricing, Priority, Rate, Setting, ShopSnapshot, StatusEntry,
};

use crate::error::StorageError;

/// Highest daily sequence representable in the 4-digit id suffix.
const MAX_DAILY_SEQUENCE: i64 = 9999;

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn parse_date(s: &str, label: &str) -> Result<NaiveDate, StorageError> {
    s.parse()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} date: {s}")))
}

fn parse_datetime(s: &str, label: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StorageError::Serialization(format!("invalid {label} timestamp: {s}")))
}

fn to_blob<T: serde::Serialize>(value: &T, label: &str) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec(value)
        .map_err(|e| StorageError::Serialization(format!("encoding {label}: {e}")))
}

fn from_blob<T: serde::de::DeserializeOwned>(bytes: &[u8], label: &str) -> Result<T, StorageError> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| StorageError::Serialization(format!("decoding {label}: {e}")))
}

/// The shared storage context: one sqlite connection, owned by whichever
/// service surface wraps it. Every composite write below runs as a single
/// transaction so a crash never leaves a half-applied state.
pub struct ShopDb {
    conn: Connection,
}

impl ShopDb {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Next free daily sequence for an id table, read inside the caller's
/// transaction so interleaved creates on the same day cannot collide.
fn next_daily_sequence(
    conn: &Connection,
    table: &str,
    day_pattern: &str,
) -> Result<u32, StorageError> {
    let sql =
        format!("SELECT MAX(CAST(substr(id, -4) AS INTEGER)) FROM {table} WHERE id LIKE ?1");
    let max: Option<i64> = conn.query_row(&sql, params![day_pattern], |row| row.get(0))?;
    let next = max.unwrap_or(0) + 1;
    if next > MAX_DAILY_SEQUENCE {
        return Err(StorageError::SequenceExhausted(table.to_string()));
    }
    Ok(next as u32)
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

const CLIENT_COLUMNS: &str = "id, name, phone_number, secondary_phone, address, email, notes, \
     registration_date, last_order_date";

fn read_client(row: &rusqlite::Row) -> Result<Client, StorageError> {
    let id: String = row.get(0)?;
    let registration_date: String = row.get(7)?;
    let last_order_date: Option<String> = row.get(8)?;
    Ok(Client {
        id: ClientId::from_string(id),
        name: row.get(1)?,
        phone_number: row.get(2)?,
        secondary_phone: row.get(3)?,
        address: row.get(4)?,
        email: row.get(5)?,
        notes: row.get(6)?,
        registration_date: parse_date(&registration_date, "registration")?,
        last_order_date: last_order_date
            .map(|d| parse_date(&d, "last order"))
            .transpose()?,
    })
}

impl ShopDb {
    pub fn insert_client(
        &mut self,
        new: &NewClient,
        registration_date: NaiveDate,
    ) -> Result<Client, StorageError> {
        let tx = self.conn.transaction()?;
        let sequence =
            next_daily_sequence(&tx, "clients", &ClientId::day_pattern(registration_date))?;
        let id = ClientId::from_parts(registration_date, sequence);
        tx.execute(
            "INSERT INTO clients (id, name, phone_number, secondary_phone, address, email, notes, registration_date, last_order_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
            params![
                id.as_str(),
                new.name,
                new.phone_number,
                new.secondary_phone,
                new.address,
                new.email,
                new.notes,
                registration_date.to_string(),
            ],
        )?;
        tx.commit()?;
        Ok(Client {
            id,
            name: new.name.clone(),
            phone_number: new.phone_number.clone(),
            secondary_phone: new.secondary_phone.clone(),
            address: new.address.clone(),
            email: new.email.clone(),
            notes: new.notes.clone(),
            registration_date,
            last_order_date: None,
        })
    }

    pub fn update_client(&mut self, client: &Client) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE clients SET name = ?1, phone_number = ?2, secondary_phone = ?3, address = ?4, email = ?5, notes = ?6
             WHERE id = ?7",
            params![
                client.name,
                client.phone_number,
                client.secondary_phone,
                client.address,
                client.email,
                client.notes,
                client.id.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("client {}", client.id)));
        }
        Ok(())
    }

    /// Hard delete. Orders and measurements referencing the client are left
    /// in place; see the design notes on cascade.
    pub fn delete_client(&mut self, id: &ClientId) -> Result<(), StorageError> {
        let deleted = self
            .conn
            .execute("DELETE FROM clients WHERE id = ?1", params![id.as_str()])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("client {id}")));
        }
        Ok(())
    }

    pub fn get_client(&self, id: &ClientId) -> Result<Option<Client>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id.as_str()], |row| {
            read_client(row).map_err(tunnel)
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn list_clients(&self) -> Result<Vec<Client>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY registration_date, id"
        ))?;
        let rows = stmt.query_map([], |row| read_client(row).map_err(tunnel))?;
        let mut clients = Vec::new();
        for row in rows {
            clients.push(row?);
        }
        Ok(clients)
    }
}

// ---------------------------------------------------------------------------
// Measurements
// ---------------------------------------------------------------------------

const MEASUREMENT_COLUMNS: &str =
    "id, client_id, garment_type, version, is_active, field_values, unit, notes, created_at";

fn read_measurement(row: &rusqlite::Row) -> Result<Measurement, StorageError> {
    let id_bytes: Vec<u8> = row.get(0)?;
    let client_id: String = row.get(1)?;
    let garment_type: String = row.get(2)?;
    let version: i64 = row.get(3)?;
    let values_blob: Vec<u8> = row.get(5)?;
    let unit: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    Ok(Measurement {
        id: MeasurementId::from_bytes(to_array::<16>(id_bytes, "measurement id")?),
        client_id: ClientId::from_string(client_id),
        garment_type: GarmentType::parse(&garment_type)?,
        version: version as u32,
        is_active: row.get(4)?,
        measurements: from_blob(&values_blob, "measurement values")?,
        unit: MeasurementUnit::parse(&unit)?,
        notes: row.get(7)?,
        created_at: parse_datetime(&created_at, "measurement")?,
    })
}

impl ShopDb {
    /// Deactivate-old / assign-version / insert-new as one transaction. The
    /// partial unique index on active rows backstops the invariant.
    pub fn insert_measurement(
        &mut self,
        new: &NewMeasurement,
        id: MeasurementId,
        created_at: DateTime<Utc>,
    ) -> Result<Measurement, StorageError> {
        let values_blob = to_blob(&new.measurements, "measurement values")?;
        let tx = self.conn.transaction()?;
        let prev: Option<i64> = tx.query_row(
            "SELECT MAX(version) FROM measurements WHERE client_id = ?1 AND garment_type = ?2",
            params![new.client_id.as_str(), new.garment_type.as_str()],
            |row| row.get(0),
        )?;
        let version = prev.unwrap_or(0) as u32 + 1;
        tx.execute(
            "UPDATE measurements SET is_active = 0
             WHERE client_id = ?1 AND garment_type = ?2 AND is_active = 1",
            params![new.client_id.as_str(), new.garment_type.as_str()],
        )?;
        tx.execute(
            "INSERT INTO measurements (id, client_id, garment_type, version, is_active, field_values, unit, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?8)",
            params![
                id.as_bytes().as_slice(),
                new.client_id.as_str(),
                new.garment_type.as_str(),
                version,
                values_blob,
                new.unit.as_str(),
                new.notes,
                created_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(Measurement {
            id,
            client_id: new.client_id.clone(),
            garment_type: new.garment_type,
            version,
            is_active: true,
            measurements: new.measurements.clone(),
            unit: new.unit,
            notes: new.notes.clone(),
            created_at,
        })
    }

    pub fn list_measurements_by_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<Measurement>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements
             WHERE client_id = ?1 ORDER BY garment_type, version DESC"
        ))?;
        let rows = stmt.query_map(params![client_id.as_str()], |row| {
            read_measurement(row).map_err(tunnel)
        })?;
        let mut measurements = Vec::new();
        for row in rows {
            measurements.push(row?);
        }
        Ok(measurements)
    }

    pub fn get_active_measurement(
        &self,
        client_id: &ClientId,
        garment_type: GarmentType,
    ) -> Result<Option<Measurement>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements
             WHERE client_id = ?1 AND garment_type = ?2 AND is_active = 1"
        ))?;
        let mut rows = stmt.query_map(
            params![client_id.as_str(), garment_type.as_str()],
            |row| read_measurement(row).map_err(tunnel),
        )?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn list_all_measurements(&self) -> Result<Vec<Measurement>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements
             ORDER BY client_id, garment_type, version"
        ))?;
        let rows = stmt.query_map([], |row| read_measurement(row).map_err(tunnel))?;
        let mut measurements = Vec::new();
        for row in rows {
            measurements.push(row?);
        }
        Ok(measurements)
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Everything the order workflow resolves before the insert transaction:
/// client and measurement snapshots already frozen, pricing already derived.
/// The id and the initial history entry are assigned inside the transaction.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub client_id: ClientId,
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
    pub measurement_snapshot: Option<Measurement>,
    pub pricing: Pricing,
    pub placed_at: DateTime<Utc>,
    pub placed_notes: Option<String>,
}

const ORDER_COLUMNS: &str = "id, client_id, client_name, client_phone, order_date, delivery_date, \
     priority, garment_type, quantity, fabric_details, design_details, measurement_id, \
     measurement_snapshot, status, base_charge, customizations, material_charges, urgent_charges, \
     discount_amount, discount_reason, subtotal, total";

fn read_order(row: &rusqlite::Row) -> Result<Order, StorageError> {
    let id: String = row.get(0)?;
    let client_id: String = row.get(1)?;
    let order_date: String = row.get(4)?;
    let delivery_date: String = row.get(5)?;
    let priority: String = row.get(6)?;
    let garment_type: String = row.get(7)?;
    let quantity: i64 = row.get(8)?;
    let measurement_id: Option<Vec<u8>> = row.get(11)?;
    let snapshot_blob: Option<Vec<u8>> = row.get(12)?;
    let status: String = row.get(13)?;
    let customizations_blob: Vec<u8> = row.get(15)?;
    let discount_amount: Option<f64> = row.get(18)?;
    let discount_reason: Option<String> = row.get(19)?;

    let customizations: Vec<Customization> = from_blob(&customizations_blob, "customizations")?;
    let measurement_snapshot = snapshot_blob
        .map(|blob| from_blob::<Measurement>(&blob, "measurement snapshot"))
        .transpose()?;
    let measurement_id = measurement_id
        .map(|bytes| Ok::<_, StorageError>(MeasurementId::from_bytes(to_array::<16>(bytes, "measurement id")?)))
        .transpose()?;

    Ok(Order {
        id: OrderId::from_string(id),
        client_id: ClientId::from_string(client_id),
        client_name: row.get(2)?,
        client_phone: row.get(3)?,
        order_date: parse_date(&order_date, "order")?,
        delivery_date: parse_date(&delivery_date, "delivery")?,
        priority: Priority::parse(&priority)?,
        garment_type: GarmentType::parse(&garment_type)?,
        quantity: quantity as u32,
        fabric_details: row.get(9)?,
        design_details: row.get(10)?,
        measurement_id,
        measurement_snapshot,
        status: OrderStatus::parse(&status)?,
        status_history: Vec::new(),
        pricing: Pricing {
            base_charge: row.get(14)?,
            customizations,
            material_charges: row.get(16)?,
            urgent_charges: row.get(17)?,
            discount: discount_amount.map(|amount| Discount {
                amount,
                reason: discount_reason,
            }),
            subtotal: row.get(20)?,
            total: row.get(21)?,
        },
        payments: Vec::new(),
    })
}

fn read_status_entry(row: &rusqlite::Row) -> Result<StatusEntry, StorageError> {
    let status: String = row.get(0)?;
    let changed_at: String = row.get(1)?;
    Ok(StatusEntry {
        status: OrderStatus::parse(&status)?,
        timestamp: parse_datetime(&changed_at, "status history")?,
        notes: row.get(2)?,
    })
}

fn read_payment(row: &rusqlite::Row) -> Result<Payment, StorageError> {
    let paid_on: String = row.get(1)?;
    let method: String = row.get(2)?;
    let kind: String = row.get(3)?;
    Ok(Payment {
        amount: row.get(0)?,
        date: parse_date(&paid_on, "payment")?,
        method: PaymentMethod::parse(&method)?,
        kind: PaymentKind::parse(&kind)?,
        receipt_number: row.get(4)?,
        notes: row.get(5)?,
    })
}

impl ShopDb {
    /// Inserts the order, seeds its history with the initial status and
    /// stamps the client's last order date, all in one transaction. The
    /// order id's daily sequence is read inside the same transaction, so
    /// interleaved same-day creates never collide.
    pub fn insert_order(&mut self, draft: &OrderDraft) -> Result<Order, StorageError> {
        let customizations_blob = to_blob(&draft.pricing.customizations, "customizations")?;
        let snapshot_blob = draft
            .measurement_snapshot
            .as_ref()
            .map(|m| to_blob(m, "measurement snapshot"))
            .transpose()?;

        let tx = self.conn.transaction()?;
        let sequence = next_daily_sequence(&tx, "orders", &OrderId::day_pattern(draft.order_date))?;
        let id = OrderId::from_parts(draft.order_date, sequence);

        tx.execute(
            "INSERT INTO orders (id, client_id, client_name, client_phone, order_date, delivery_date, priority, garment_type, quantity, fabric_details, design_details, measurement_id, measurement_snapshot, status, base_charge, customizations, material_charges, urgent_charges, discount_amount, discount_reason, subtotal, total)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            params![
                id.as_str(),
                draft.client_id.as_str(),
                draft.client_name,
                draft.client_phone,
                draft.order_date.to_string(),
                draft.delivery_date.to_string(),
                draft.priority.as_str(),
                draft.garment_type.as_str(),
                draft.quantity,
                draft.fabric_details,
                draft.design_details,
                draft.measurement_id.as_ref().map(|m| m.as_bytes().to_vec()),
                snapshot_blob,
                OrderStatus::Placed.as_str(),
                draft.pricing.base_charge,
                customizations_blob,
                draft.pricing.material_charges,
                draft.pricing.urgent_charges,
                draft.pricing.discount.as_ref().map(|d| d.amount),
                draft.pricing.discount.as_ref().and_then(|d| d.reason.clone()),
                draft.pricing.subtotal,
                draft.pricing.total,
            ],
        )?;

        tx.execute(
            "INSERT INTO order_status_history (order_id, seq, status, changed_at, notes)
             VALUES (?1, 0, ?2, ?3, ?4)",
            params![
                id.as_str(),
                OrderStatus::Placed.as_str(),
                draft.placed_at.to_rfc3339(),
                draft.placed_notes,
            ],
        )?;

        let touched = tx.execute(
            "UPDATE clients SET last_order_date = ?1 WHERE id = ?2",
            params![draft.order_date.to_string(), draft.client_id.as_str()],
        )?;
        if touched == 0 {
            return Err(StorageError::NotFound(format!("client {}", draft.client_id)));
        }

        tx.commit()?;

        Ok(Order {
            id,
            client_id: draft.client_id.clone(),
            client_name: draft.client_name.clone(),
            client_phone: draft.client_phone.clone(),
            order_date: draft.order_date,
            delivery_date: draft.delivery_date,
            priority: draft.priority,
            garment_type: draft.garment_type,
            quantity: draft.quantity,
            fabric_details: draft.fabric_details.clone(),
            design_details: draft.design_details.clone(),
            measurement_id: draft.measurement_id,
            measurement_snapshot: draft.measurement_snapshot.clone(),
            status: OrderStatus::Placed,
            status_history: vec![StatusEntry {
                status: OrderStatus::Placed,
                timestamp: draft.placed_at,
                notes: draft.placed_notes.clone(),
            }],
            pricing: draft.pricing.clone(),
            payments: Vec::new(),
        })
    }

    /// Sets the current status and appends the audit entry together.
    pub fn append_order_status(
        &mut self,
        order_id: &OrderId,
        entry: &StatusEntry,
    ) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            "UPDATE orders SET status = ?1 WHERE id = ?2",
            params![entry.status.as_str(), order_id.as_str()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("order {order_id}")));
        }
        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM order_status_history WHERE order_id = ?1",
            params![order_id.as_str()],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO order_status_history (order_id, seq, status, changed_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                order_id.as_str(),
                seq,
                entry.status.as_str(),
                entry.timestamp.to_rfc3339(),
                entry.notes,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn append_order_payment(
        &mut self,
        order_id: &OrderId,
        payment: &Payment,
    ) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE id = ?1)",
            params![order_id.as_str()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::NotFound(format!("order {order_id}")));
        }
        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM order_payments WHERE order_id = ?1",
            params![order_id.as_str()],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO order_payments (order_id, seq, amount, paid_on, method, kind, receipt_number, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                order_id.as_str(),
                seq,
                payment.amount,
                payment.date.to_string(),
                payment.method.as_str(),
                payment.kind.as_str(),
                payment.receipt_number,
                payment.notes,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Writes back the editable order fields. Status, history, payments and
    /// the frozen snapshots are deliberately not part of this statement.
    pub fn update_order(&mut self, order: &Order) -> Result<(), StorageError> {
        let customizations_blob = to_blob(&order.pricing.customizations, "customizations")?;
        let updated = self.conn.execute(
            "UPDATE orders SET order_date = ?1, delivery_date = ?2, priority = ?3, garment_type = ?4, quantity = ?5, fabric_details = ?6, design_details = ?7, base_charge = ?8, customizations = ?9, material_charges = ?10, urgent_charges = ?11, discount_amount = ?12, discount_reason = ?13, subtotal = ?14, total = ?15
             WHERE id = ?16",
            params![
                order.order_date.to_string(),
                order.delivery_date.to_string(),
                order.priority.as_str(),
                order.garment_type.as_str(),
                order.quantity,
                order.fabric_details,
                order.design_details,
                order.pricing.base_charge,
                customizations_blob,
                order.pricing.material_charges,
                order.pricing.urgent_charges,
                order.pricing.discount.as_ref().map(|d| d.amount),
                order.pricing.discount.as_ref().and_then(|d| d.reason.clone()),
                order.pricing.subtotal,
                order.pricing.total,
                order.id.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("order {}", order.id)));
        }
        Ok(())
    }

    pub fn get_order(&self, id: &OrderId) -> Result<Option<Order>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id.as_str()], |row| read_order(row).map_err(tunnel))?;
        match rows.next() {
            Some(row) => {
                let mut order = row?;
                self.load_order_children(&mut order)?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    pub fn list_orders(&self) -> Result<Vec<Order>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY order_date DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], |row| read_order(row).map_err(tunnel))?;
        let mut orders = Vec::new();
        for row in rows {
            orders.push(row?);
        }
        for order in &mut orders {
            self.load_order_children(order)?;
        }
        Ok(orders)
    }

    pub fn list_orders_by_client(&self, client_id: &ClientId) -> Result<Vec<Order>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE client_id = ?1 ORDER BY order_date DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![client_id.as_str()], |row| {
            read_order(row).map_err(tunnel)
        })?;
        let mut orders = Vec::new();
        for row in rows {
            orders.push(row?);
        }
        for order in &mut orders {
            self.load_order_children(order)?;
        }
        Ok(orders)
    }

    fn load_order_children(&self, order: &mut Order) -> Result<(), StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT status, changed_at, notes FROM order_status_history
             WHERE order_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![order.id.as_str()], |row| {
            read_status_entry(row).map_err(tunnel)
        })?;
        order.status_history.clear();
        for row in rows {
            order.status_history.push(row?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT amount, paid_on, method, kind, receipt_number, notes FROM order_payments
             WHERE order_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![order.id.as_str()], |row| {
            read_payment(row).map_err(tunnel)
        })?;
        order.payments.clear();
        for row in rows {
            order.payments.push(row?);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rates and settings
// ---------------------------------------------------------------------------

impl ShopDb {
    pub fn set_rate(&mut self, garment_type: GarmentType, amount: f64) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO rates (garment_type, amount) VALUES (?1, ?2)
             ON CONFLICT(garment_type) DO UPDATE SET amount = excluded.amount",
            params![garment_type.as_str(), amount],
        )?;
        Ok(())
    }

    pub fn get_rate(&self, garment_type: GarmentType) -> Result<Option<Rate>, StorageError> {
        let amount: Option<f64> = self
            .conn
            .query_row(
                "SELECT amount FROM rates WHERE garment_type = ?1",
                params![garment_type.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(amount.map(|amount| Rate {
            garment_type,
            amount,
        }))
    }

    pub fn list_rates(&self) -> Result<Vec<Rate>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT garment_type, amount FROM rates ORDER BY garment_type")?;
        let rows = stmt.query_map([], |row| {
            let garment_type: String = row.get(0)?;
            let amount: f64 = row.get(1)?;
            GarmentType::parse(&garment_type)
                .map(|garment_type| Rate {
                    garment_type,
                    amount,
                })
                .map_err(|e| tunnel(e.into()))
        })?;
        let mut rates = Vec::new();
        for row in rows {
            rates.push(row?);
        }
        Ok(rates)
    }

    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn list_settings(&self) -> Result<Vec<Setting>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok(Setting {
                key: row.get(0)?,
                value: row.get(1)?,
            })
        })?;
        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }
}

// ---------------------------------------------------------------------------
// Export / import
// ---------------------------------------------------------------------------

impl ShopDb {
    /// Full copy of every table, suitable for serialization.
    pub fn export_all(&self) -> Result<ShopSnapshot, StorageError> {
        Ok(ShopSnapshot {
            clients: self.list_clients()?,
            measurements: self.list_all_measurements()?,
            orders: self.list_orders()?,
            settings: self.list_settings()?,
            rates: self.list_rates()?,
        })
    }

    /// Merges a snapshot into the store, last write wins per primary key,
    /// as one transaction: a failure anywhere leaves the store untouched.
    pub fn import_all(&mut self, snapshot: &ShopSnapshot) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;

        for client in &snapshot.clients {
            tx.execute(
                "INSERT OR REPLACE INTO clients (id, name, phone_number, secondary_phone, address, email, notes, registration_date, last_order_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    client.id.as_str(),
                    client.name,
                    client.phone_number,
                    client.secondary_phone,
                    client.address,
                    client.email,
                    client.notes,
                    client.registration_date.to_string(),
                    client.last_order_date.map(|d| d.to_string()),
                ],
            )?;
        }

        for measurement in &snapshot.measurements {
            // An imported active record supersedes whatever was active for
            // the pair; the superseded record is deactivated, not dropped.
            if measurement.is_active {
                tx.execute(
                    "UPDATE measurements SET is_active = 0
                     WHERE client_id = ?1 AND garment_type = ?2 AND is_active = 1 AND id != ?3",
                    params![
                        measurement.client_id.as_str(),
                        measurement.garment_type.as_str(),
                        measurement.id.as_bytes().as_slice(),
                    ],
                )?;
            }
            let values_blob = to_blob(&measurement.measurements, "measurement values")?;
            tx.execute(
                "INSERT OR REPLACE INTO measurements (id, client_id, garment_type, version, is_active, field_values, unit, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    measurement.id.as_bytes().as_slice(),
                    measurement.client_id.as_str(),
                    measurement.garment_type.as_str(),
                    measurement.version,
                    measurement.is_active,
                    values_blob,
                    measurement.unit.as_str(),
                    measurement.notes,
                    measurement.created_at.to_rfc3339(),
                ],
            )?;
        }

        for order in &snapshot.orders {
            tx.execute(
                "DELETE FROM order_status_history WHERE order_id = ?1",
                params![order.id.as_str()],
            )?;
            tx.execute(
                "DELETE FROM order_payments WHERE order_id = ?1",
                params![order.id.as_str()],
            )?;
            let customizations_blob = to_blob(&order.pricing.customizations, "customizations")?;
            let snapshot_blob = order
                .measurement_snapshot
                .as_ref()
                .map(|m| to_blob(m, "measurement snapshot"))
                .transpose()?;
            tx.execute(
                "INSERT OR REPLACE INTO orders (id, client_id, client_name, client_phone, order_date, delivery_date, priority, garment_type, quantity, fabric_details, design_details, measurement_id, measurement_snapshot, status, base_charge, customizations, material_charges, urgent_charges, discount_amount, discount_reason, subtotal, total)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
                params![
                    order.id.as_str(),
                    order.client_id.as_str(),
                    order.client_name,
                    order.client_phone,
                    order.order_date.to_string(),
                    order.delivery_date.to_string(),
                    order.priority.as_str(),
                    order.garment_type.as_str(),
                    order.quantity,
                    order.fabric_details,
                    order.design_details,
                    order.measurement_id.as_ref().map(|m| m.as_bytes().to_vec()),
                    snapshot_blob,
                    order.status.as_str(),
                    order.pricing.base_charge,
                    customizations_blob,
                    order.pricing.material_charges,
                    order.pricing.urgent_charges,
                    order.pricing.discount.as_ref().map(|d| d.amount),
                    order.pricing.discount.as_ref().and_then(|d| d.reason.clone()),
                    order.pricing.subtotal,
                    order.pricing.total,
                ],
            )?;
            for (seq, entry) in order.status_history.iter().enumerate() {
                tx.execute(
                    "INSERT INTO order_status_history (order_id, seq, status, changed_at, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        order.id.as_str(),
                        seq as i64,
                        entry.status.as_str(),
                        entry.timestamp.to_rfc3339(),
                        entry.notes,
                    ],
                )?;
            }
            for (seq, payment) in order.payments.iter().enumerate() {
                tx.execute(
                    "INSERT INTO order_payments (order_id, seq, amount, paid_on, method, kind, receipt_number, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        order.id.as_str(),
                        seq as i64,
                        payment.amount,
                        payment.date.to_string(),
                        payment.method.as_str(),
                        payment.kind.as_str(),
                        payment.receipt_number,
                        payment.notes,
                    ],
                )?;
            }
        }

        for setting in &snapshot.settings {
            tx.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                params![setting.key, setting.value],
            )?;
        }

        for rate in &snapshot.rates {
            tx.execute(
                "INSERT OR REPLACE INTO rates (garment_type, amount) VALUES (?1, ?2)",
                params![rate.garment_type.as_str(), rate.amount],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Tunnel a StorageError through rusqlite's error system in query_map
/// closures that must return rusqlite::Error.
fn tunnel(e: StorageError) -> rusqlite::Error {
    match e {
        StorageError::Sqlite(sq) => sq,
        other => rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Blob,
            Box::new(OpaqueStorageError(other.to_string())),
        ),
    }
}

#[derive(Debug)]
struct OpaqueStorageError(String);

impl std::fmt::Display for OpaqueStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for OpaqueStorageError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_client(name: &str, phone: &str) -> NewClient {
        NewClient {
            name: name.into(),
            phone_number: phone.into(),
            ..Default::default()
        }
    }

    #[test]
    fn client_rows_survive_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("shop.db");
        let path = path.to_str().unwrap();

        let date: NaiveDate = "2025-01-10".parse()?;
        let id = {
            let mut db = ShopDb::open(path)?;
            db.insert_client(&new_client("Asha", "9876543210"), date)?.id
        };

        let db = ShopDb::open(path)?;
        let client = db.get_client(&id)?.expect("client persisted");
        assert_eq!(client.name, "Asha");
        assert_eq!(client.registration_date, date);
        Ok(())
    }

    #[test]
    fn daily_sequences_are_per_table_and_per_day() -> Result<(), Box<dyn std::error::Error>> {
        let mut db = ShopDb::open_in_memory()?;
        let day_one: NaiveDate = "2025-01-10".parse()?;
        let day_two: NaiveDate = "2025-01-11".parse()?;

        let a = db.insert_client(&new_client("A", "1"), day_one)?;
        let b = db.insert_client(&new_client("B", "2"), day_one)?;
        let c = db.insert_client(&new_client("C", "3"), day_two)?;

        assert_eq!(a.id.as_str(), "CLT-20250110-0001");
        assert_eq!(b.id.as_str(), "CLT-20250110-0002");
        assert_eq!(c.id.as_str(), "CLT-20250111-0001");
        Ok(())
    }

    #[test]
    fn daily_sequence_past_9999_is_exhausted() -> Result<(), Box<dyn std::error::Error>> {
        let mut db = ShopDb::open_in_memory()?;
        let date: NaiveDate = "2025-01-10".parse()?;

        // Seed the day's last representable id directly; records arriving
        // through import can carry any sequence.
        db.conn.execute(
            "INSERT INTO clients (id, name, phone_number, registration_date)
             VALUES (?1, 'Asha', '9876543210', ?2)",
            params![
                ClientId::from_parts(date, 9999).as_str(),
                date.to_string()
            ],
        )?;

        let err = db
            .insert_client(&new_client("Ravi", "9811111111"), date)
            .unwrap_err();
        assert!(matches!(err, StorageError::SequenceExhausted(_)));

        // The next day starts a fresh sequence.
        let next_day: NaiveDate = "2025-01-11".parse()?;
        let c = db.insert_client(&new_client("Ravi", "9811111111"), next_day)?;
        assert_eq!(c.id.as_str(), "CLT-20250111-0001");
        Ok(())
    }
}
