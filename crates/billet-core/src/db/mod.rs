//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `clients` - Client records
//! - `invoices` - Invoice creation, details, listing and lifecycle
//! - `analytics` - Window-filtered row fetches feeding the analytics engine
//! - `audit` - Audit trail of API requests and exports

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};
use crate::numeric::WireNumber;

mod analytics;
mod audit;
mod clients;
mod invoices;

pub use audit::{AuditAction, AuditEntry, AuditEvent, AuditQuery};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "BILLET_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"billet-salt-v1-x";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let output = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(output.as_bytes()))
}

fn conversion_error(idx: usize, e: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Read a SQLite `CURRENT_TIMESTAMP` column ("YYYY-MM-DD HH:MM:SS") as UTC
pub(crate) fn column_datetime(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .map_err(|e| conversion_error(idx, e))
}

/// Read an optional `YYYY-MM-DD` date column
pub(crate) fn column_date_opt(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| conversion_error(idx, e))
}

/// Read a required `YYYY-MM-DD` date column
pub(crate) fn column_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    column_date_opt(row, idx)?.ok_or(rusqlite::Error::InvalidColumnType(
        idx,
        "date".to_string(),
        rusqlite::types::Type::Null,
    ))
}

/// Read a numeric column through [`WireNumber`] so text and NULL values are
/// coerced the same way everywhere
pub(crate) fn column_number(
    row: &rusqlite::Row,
    idx: usize,
    field: &'static str,
) -> rusqlite::Result<f64> {
    let raw: WireNumber = row.get(idx)?;
    raw.to_f64(field).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `BILLET_DB_KEY` to be set. The database is encrypted with
    /// SQLCipher using a key derived from the passphrase via Argon2.
    /// Use `new_unencrypted()` for development and tests.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = match passphrase {
            Some(pass) => format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?),
            None => String::new(),
        };

        // Foreign keys are per-connection in SQLite, so every pooled
        // connection turns them on (the key must come first)
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if !key_pragma.is_empty() {
                conn.execute_batch(&key_pragma)?;
            }
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self { pool };
        db.run_migrations()?;

        Ok(db)
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "billet_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Clients
            CREATE TABLE IF NOT EXISTS clients (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                company TEXT NOT NULL DEFAULT '',
                address TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                site_address TEXT NOT NULL DEFAULT '',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_clients_name ON clients(name);

            -- Invoices
            CREATE TABLE IF NOT EXISTS invoices (
                id INTEGER PRIMARY KEY,
                invoice_no TEXT NOT NULL UNIQUE,
                client_id INTEGER REFERENCES clients(id) ON DELETE SET NULL,
                project_name TEXT NOT NULL DEFAULT '',
                invoice_date DATE NOT NULL,                 -- YYYY-MM-DD
                due_date DATE,
                subtotal REAL NOT NULL DEFAULT 0,
                discount REAL NOT NULL DEFAULT 0,
                vat_rate REAL NOT NULL DEFAULT 0,           -- percent
                vat_amount REAL NOT NULL DEFAULT 0,
                total REAL NOT NULL DEFAULT 0,
                notes TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'draft',       -- draft, sent, paid
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_invoices_date ON invoices(invoice_date);
            CREATE INDEX IF NOT EXISTS idx_invoices_client ON invoices(client_id);
            CREATE INDEX IF NOT EXISTS idx_invoices_status ON invoices(status);

            -- Invoice line items
            CREATE TABLE IF NOT EXISTS invoice_items (
                id INTEGER PRIMARY KEY,
                invoice_id INTEGER NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
                category TEXT,
                code TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                dimensions TEXT NOT NULL DEFAULT '',
                qty REAL NOT NULL DEFAULT 0,
                unit_price REAL NOT NULL DEFAULT 0,
                line_total REAL NOT NULL DEFAULT 0,
                image_url TEXT,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice ON invoice_items(invoice_id);

            -- Materials consumed per line item
            CREATE TABLE IF NOT EXISTS item_materials (
                id INTEGER PRIMARY KEY,
                invoice_item_id INTEGER NOT NULL REFERENCES invoice_items(id) ON DELETE CASCADE,
                material_name TEXT NOT NULL,
                unit TEXT NOT NULL DEFAULT '',
                qty_per_item REAL NOT NULL DEFAULT 0,
                total_qty REAL NOT NULL DEFAULT 0,
                unit_cost REAL NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_item_materials_item ON item_materials(invoice_item_id);
            CREATE INDEX IF NOT EXISTS idx_item_materials_name ON item_materials(material_name, unit);

            -- Audit trail of API requests; invoice_ids is a JSON array
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                client_id INTEGER,
                invoice_ids TEXT NOT NULL DEFAULT '[]',
                time_range TEXT,                            -- 7days, 30days, 90days, all
                export_file TEXT,
                row_count INTEGER,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log(action);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
