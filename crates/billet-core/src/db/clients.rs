//! Client operations

use rusqlite::{params, OptionalExtension};

use super::{column_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Client, NewClient};

impl Database {
    /// Create a client
    pub fn create_client(&self, client: &NewClient) -> Result<Client> {
        let name = client.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Client name is required".to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO clients (name, company, address, phone, email, site_address)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                name,
                client.company,
                client.address,
                client.phone,
                client.email,
                client.site_address,
            ],
        )?;

        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_client(id)?
            .ok_or_else(|| Error::NotFound(format!("client {}", id)))
    }

    /// List all clients by name
    pub fn list_clients(&self) -> Result<Vec<Client>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, company, address, phone, email, site_address, created_at
            FROM clients
            ORDER BY name COLLATE NOCASE, id
            "#,
        )?;

        let clients = stmt
            .query_map([], Self::row_to_client)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(clients)
    }

    /// Get a single client by ID
    pub fn get_client(&self, id: i64) -> Result<Option<Client>> {
        let conn = self.conn()?;
        let client = conn
            .query_row(
                r#"
                SELECT id, name, company, address, phone, email, site_address, created_at
                FROM clients
                WHERE id = ?
                "#,
                params![id],
                Self::row_to_client,
            )
            .optional()?;

        Ok(client)
    }

    fn row_to_client(row: &rusqlite::Row) -> rusqlite::Result<Client> {
        Ok(Client {
            id: row.get(0)?,
            name: row.get(1)?,
            company: row.get(2)?,
            address: row.get(3)?,
            phone: row.get(4)?,
            email: row.get(5)?,
            site_address: row.get(6)?,
            created_at: column_datetime(row, 7)?,
        })
    }
}
