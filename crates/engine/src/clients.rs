use chrono::Local;
use tracing::debug;

use darzi_core::{Client, ClientId, ClientUpdate, NewClient};

use crate::error::ShopError;
use crate::DbHandle;

pub struct ClientStore {
    db: DbHandle,
}

impl ClientStore {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    /// Assigns the id and registration date; everything else comes from the
    /// caller. Duplicate phone numbers are allowed on purpose; the UI
    /// consults `phone_exists` and asks for confirmation instead.
    pub fn create(&self, new: NewClient) -> Result<Client, ShopError> {
        let today = Local::now().date_naive();
        let client = self.db.borrow_mut().insert_client(&new, today)?;
        debug!(id = %client.id, "client created");
        Ok(client)
    }

    /// Replaces every mutable field. Id and registration date are immutable;
    /// the last order date belongs to the order workflow.
    pub fn update(&self, id: &ClientId, update: ClientUpdate) -> Result<Client, ShopError> {
        let mut db = self.db.borrow_mut();
        let mut client = db
            .get_client(id)?
            .ok_or_else(|| ShopError::NotFound(format!("client {id}")))?;
        client.name = update.name;
        client.phone_number = update.phone_number;
        client.secondary_phone = update.secondary_phone;
        client.address = update.address;
        client.email = update.email;
        client.notes = update.notes;
        db.update_client(&client)?;
        debug!(id = %client.id, "client updated");
        Ok(client)
    }

    /// Hard delete with no cascade: the client's orders and measurements
    /// stay behind as historical records.
    pub fn delete(&self, id: &ClientId) -> Result<(), ShopError> {
        self.db.borrow_mut().delete_client(id)?;
        debug!(%id, "client deleted");
        Ok(())
    }

    pub fn get_by_id(&self, id: &ClientId) -> Result<Option<Client>, ShopError> {
        Ok(self.db.borrow().get_client(id)?)
    }

    pub fn get_all(&self) -> Result<Vec<Client>, ShopError> {
        Ok(self.db.borrow().list_clients()?)
    }

    /// Advisory duplicate check: exact, case-sensitive match against both
    /// phone fields of every client except `exclude`. The store never
    /// rejects duplicates itself.
    pub fn phone_exists(
        &self,
        phone: &str,
        exclude: Option<&ClientId>,
    ) -> Result<bool, ShopError> {
        let clients = self.db.borrow().list_clients()?;
        Ok(clients
            .iter()
            .filter(|c| exclude != Some(&c.id))
            .any(|c| c.has_phone(phone)))
    }

    /// Case-insensitive substring search over name, phone number and id.
    pub fn search(&self, query: &str) -> Result<Vec<Client>, ShopError> {
        let mut clients = self.db.borrow().list_clients()?;
        clients.retain(|c| c.matches_query(query));
        Ok(clients)
    }
}
