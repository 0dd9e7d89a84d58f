//! SQLite connection pool and schema initialization

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

const POOL_SIZE: u32 = 8;
const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, String> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create database directory: {}", e))?;
            }
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(POOL_SIZE)
            .connection_timeout(POOL_ACQUIRE_TIMEOUT)
            .build(manager)
            .map_err(|e| format!("Failed to create database pool: {}", e))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Acquire a pooled connection. Fails when the pool stays exhausted past
    /// the acquire timeout instead of blocking the handler indefinitely.
    pub fn conn(&self) -> Result<DbConn, String> {
        self.pool
            .get()
            .map_err(|e| format!("Database pool exhausted: {}", e))
    }

    fn init_schema(&self) -> Result<(), String> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL UNIQUE,
                neighborhood TEXT NOT NULL,
                property_type TEXT NOT NULL,
                bedrooms INTEGER NOT NULL,
                sqm INTEGER NOT NULL,
                price INTEGER NOT NULL,
                days_on_market INTEGER NOT NULL,
                listed_date TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_listings_neighborhood ON listings(neighborhood);

            CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid TEXT NOT NULL UNIQUE,
                payer TEXT NOT NULL,
                pay_to TEXT NOT NULL,
                value TEXT NOT NULL,
                nonce TEXT NOT NULL,
                tier INTEGER NOT NULL,
                resource TEXT NOT NULL,
                tx_hash TEXT NOT NULL,
                block_number INTEGER,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_payments_payer ON payments(payer);",
        )
        .map_err(|e| format!("Failed to initialize schema: {}", e))
    }
}
