//! Wallet persistence - schema and row access.
//!
//! The UNIQUE constraint on external_id is what makes concurrent
//! creation safe: the losing writer's insert is rejected and the
//! service falls back to a fresh read.

use crate::wallet::keys::{WalletKeyPair, WalletKeys};
use chrono::Utc;
use rusqlite::{Connection, Result as SqliteResult, params};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct WalletRecord {
    pub external_id: String,
    pub keys: WalletKeys,
}

pub struct WalletStore {
    conn: Mutex<Connection>,
}

impl WalletStore {
    /// Open (creating if needed) the wallet database and initialize
    /// the schema
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(database_url)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT UNIQUE NOT NULL,
                eth_public_key TEXT NOT NULL,
                eth_private_key TEXT NOT NULL,
                solana_public_key TEXT NOT NULL,
                solana_private_key TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Insert a freshly generated record. Returns Ok(false) when the
    /// uniqueness constraint rejected the row because another writer
    /// got there first.
    pub fn try_insert(&self, external_id: &str, keys: &WalletKeys) -> Result<bool, String> {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO wallets (external_id, eth_public_key, eth_private_key,
                solana_public_key, solana_private_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                external_id,
                keys.eth.public_address,
                keys.eth.private_key,
                keys.solana.public_address,
                keys.solana.private_key,
                Utc::now().to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(format!("failed to save wallet: {}", e)),
        }
    }

    pub fn get(&self, external_id: &str) -> Result<Option<WalletRecord>, String> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT external_id, eth_public_key, eth_private_key,
                        solana_public_key, solana_private_key
                 FROM wallets WHERE external_id = ?1",
            )
            .map_err(|e| format!("failed to prepare wallet query: {}", e))?;

        let mut rows = stmt
            .query_map(params![external_id], |row| {
                Ok(WalletRecord {
                    external_id: row.get(0)?,
                    keys: WalletKeys {
                        eth: WalletKeyPair {
                            public_address: row.get(1)?,
                            private_key: row.get(2)?,
                        },
                        solana: WalletKeyPair {
                            public_address: row.get(3)?,
                            private_key: row.get(4)?,
                        },
                    },
                })
            })
            .map_err(|e| format!("failed to query wallet: {}", e))?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(format!("failed to read wallet row: {}", e)),
            None => Ok(None),
        }
    }

    pub fn count(&self) -> Result<i64, String> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM wallets", [], |row| row.get(0))
            .map_err(|e| format!("failed to count wallets: {}", e))
    }
}
