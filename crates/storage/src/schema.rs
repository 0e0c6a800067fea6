use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    check_version(conn)?;
    Ok(())
}

/// Refuses to touch a database written by a newer build rather than risk
/// misreading its rows.
fn check_version(conn: &Connection) -> Result<(), StorageError> {
    let found: i32 = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get(0)
    })?;
    if found > SCHEMA_VERSION {
        return Err(StorageError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS clients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    secondary_phone TEXT,
    address TEXT,
    email TEXT,
    notes TEXT,
    registration_date TEXT NOT NULL,
    last_order_date TEXT
);
CREATE INDEX IF NOT EXISTS idx_clients_phone ON clients (phone_number);

CREATE TABLE IF NOT EXISTS measurements (
    id BLOB PRIMARY KEY CHECK (length(id) = 16),
    client_id TEXT NOT NULL,
    garment_type TEXT NOT NULL,
    version INTEGER NOT NULL CHECK (version >= 1),
    is_active INTEGER NOT NULL CHECK (is_active IN (0, 1)),
    field_values BLOB NOT NULL,
    unit TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (client_id, garment_type, version)
);
CREATE INDEX IF NOT EXISTS idx_measurements_client ON measurements (client_id, garment_type, version DESC);
CREATE UNIQUE INDEX IF NOT EXISTS idx_measurements_active ON measurements (client_id, garment_type) WHERE is_active = 1;

CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    client_id TEXT NOT NULL,
    client_name TEXT NOT NULL,
    client_phone TEXT NOT NULL,
    order_date TEXT NOT NULL,
    delivery_date TEXT NOT NULL,
    priority TEXT NOT NULL,
    garment_type TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity >= 1),
    fabric_details TEXT,
    design_details TEXT,
    measurement_id BLOB CHECK (measurement_id IS NULL OR length(measurement_id) = 16),
    measurement_snapshot BLOB,
    status TEXT NOT NULL,
    base_charge REAL NOT NULL,
    customizations BLOB NOT NULL,
    material_charges REAL NOT NULL,
    urgent_charges REAL NOT NULL,
    discount_amount REAL,
    discount_reason TEXT,
    subtotal REAL NOT NULL,
    total REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_orders_client ON orders (client_id, order_date DESC);
CREATE INDEX IF NOT EXISTS idx_orders_date ON orders (order_date DESC);

CREATE TABLE IF NOT EXISTS order_status_history (
    order_id TEXT NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    status TEXT NOT NULL,
    changed_at TEXT NOT NULL,
    notes TEXT,
    PRIMARY KEY (order_id, seq)
);

CREATE TABLE IF NOT EXISTS order_payments (
    order_id TEXT NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    amount REAL NOT NULL CHECK (amount > 0),
    paid_on TEXT NOT NULL,
    method TEXT NOT NULL,
    kind TEXT NOT NULL,
    receipt_number TEXT,
    notes TEXT,
    PRIMARY KEY (order_id, seq)
);

CREATE TABLE IF NOT EXISTS rates (
    garment_type TEXT PRIMARY KEY,
    amount REAL NOT NULL CHECK (amount >= 0)
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_database_written_by_a_newer_build() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("shop.db");

        {
            let conn = Connection::open(&path)?;
            init_schema(&conn)?;
            conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, unixepoch())",
                [SCHEMA_VERSION + 1],
            )?;
        }

        let conn = Connection::open(&path)?;
        let err = init_schema(&conn).unwrap_err();
        assert!(matches!(
            err,
            StorageError::SchemaTooNew { found, supported }
                if found == SCHEMA_VERSION + 1 && supported == SCHEMA_VERSION
        ));
        Ok(())
    }

    #[test]
    fn init_schema_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        init_schema(&conn)?;
        Ok(())
    }
}
