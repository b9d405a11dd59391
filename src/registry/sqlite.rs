//! SQLite registry store

use super::{request_not_found, Committed, NewRequest, RegistryStore};
use crate::error::NetworkError;
use crate::launch::{GenesisAccount, GenesisValidator, LaunchId, Request, RequestContent, VestingAccount};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

const HEIGHT_KEY: &str = "height";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, NetworkError> {
        let conn = Connection::open(path)
            .map_err(|e| NetworkError::Database(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, NetworkError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| NetworkError::Database(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, NetworkError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS requests (
                launch_id INTEGER NOT NULL,
                request_id INTEGER NOT NULL,
                creator TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                content TEXT NOT NULL,
                PRIMARY KEY (launch_id, request_id)
            );
            CREATE TABLE IF NOT EXISTS genesis_accounts (
                launch_id INTEGER NOT NULL,
                address TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (launch_id, address)
            );
            CREATE TABLE IF NOT EXISTS vesting_accounts (
                launch_id INTEGER NOT NULL,
                address TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (launch_id, address)
            );
            CREATE TABLE IF NOT EXISTS genesis_validators (
                launch_id INTEGER NOT NULL,
                address TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (launch_id, address)
            );
            CREATE TABLE IF NOT EXISTS request_counters (
                launch_id INTEGER PRIMARY KEY,
                next_id INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| NetworkError::Database(format!("Failed to create tables: {}", e)))?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, NetworkError> {
        self.conn
            .lock()
            .map_err(|_| NetworkError::Database("Mutex poisoned".to_string()))
    }

    /// `table` is one of the fixed record tables, never user input.
    fn get_record<T: DeserializeOwned>(
        &self,
        table: &str,
        launch_id: LaunchId,
        address: &str,
    ) -> Result<Option<T>, NetworkError> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row(
                &format!("SELECT data FROM {} WHERE launch_id = ?1 AND address = ?2", table),
                params![launch_id as i64, address],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| NetworkError::Database(format!("Failed to query {}: {}", table, e)))?;

        data.map(|json| {
            serde_json::from_str(&json).map_err(|e| {
                NetworkError::Database(format!("Corrupt row in {}: {}", table, e))
            })
        })
        .transpose()
    }

    fn height_in(tx: &Transaction) -> Result<u64, NetworkError> {
        let value: Option<String> = tx
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![HEIGHT_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    fn bump_height(tx: &Transaction) -> Result<u64, NetworkError> {
        let height = Self::height_in(tx)? + 1;
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![HEIGHT_KEY, height.to_string()],
        )?;
        Ok(height)
    }

    fn upsert<T: Serialize>(
        tx: &Transaction,
        table: &str,
        launch_id: LaunchId,
        address: &str,
        record: &T,
    ) -> Result<(), NetworkError> {
        let data = serde_json::to_string(record)?;
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (launch_id, address, data) VALUES (?1, ?2, ?3)",
                table
            ),
            params![launch_id as i64, address, data],
        )?;
        Ok(())
    }

    fn apply(tx: &Transaction, launch_id: LaunchId, content: &RequestContent) -> Result<(), NetworkError> {
        match content {
            RequestContent::GenesisAccount(acc) => {
                Self::upsert(tx, "genesis_accounts", launch_id, &acc.address, acc)
            }
            RequestContent::VestingAccount(acc) => {
                Self::upsert(tx, "vesting_accounts", launch_id, &acc.address, acc)
            }
            RequestContent::GenesisValidator(val) => {
                Self::upsert(tx, "genesis_validators", launch_id, &val.address, val)
            }
            RequestContent::AccountRemoval { address } => {
                tx.execute(
                    "DELETE FROM genesis_accounts WHERE launch_id = ?1 AND address = ?2",
                    params![launch_id as i64, address],
                )?;
                tx.execute(
                    "DELETE FROM vesting_accounts WHERE launch_id = ?1 AND address = ?2",
                    params![launch_id as i64, address],
                )?;
                Ok(())
            }
            RequestContent::ValidatorRemoval { address } => {
                tx.execute(
                    "DELETE FROM genesis_validators WHERE launch_id = ?1 AND address = ?2",
                    params![launch_id as i64, address],
                )?;
                Ok(())
            }
        }
    }
}

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<Request> {
    let launch_id: i64 = row.get(0)?;
    let request_id: i64 = row.get(1)?;
    let content_json: String = row.get(4)?;
    let content: RequestContent = serde_json::from_str(&content_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Request {
        launch_id: launch_id as u64,
        request_id: request_id as u64,
        creator: row.get(2)?,
        created_at: row.get(3)?,
        content,
    })
}

impl RegistryStore for Database {
    fn genesis_account(&self, launch_id: LaunchId, address: &str) -> Result<Option<GenesisAccount>, NetworkError> {
        self.get_record("genesis_accounts", launch_id, address)
    }

    fn vesting_account(&self, launch_id: LaunchId, address: &str) -> Result<Option<VestingAccount>, NetworkError> {
        self.get_record("vesting_accounts", launch_id, address)
    }

    fn genesis_validator(&self, launch_id: LaunchId, address: &str) -> Result<Option<GenesisValidator>, NetworkError> {
        self.get_record("genesis_validators", launch_id, address)
    }

    fn requests(&self, launch_id: LaunchId) -> Result<Vec<Request>, NetworkError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT launch_id, request_id, creator, created_at, content
                 FROM requests WHERE launch_id = ?1 ORDER BY request_id ASC",
            )
            .map_err(|e| NetworkError::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![launch_id as i64], row_to_request)
            .map_err(|e| NetworkError::Database(format!("Failed to query requests: {}", e)))?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(
                row.map_err(|e| NetworkError::Database(format!("Failed to load request: {}", e)))?,
            );
        }
        Ok(requests)
    }

    fn commit_requests(&self, creator: &str, batch: Vec<NewRequest>, created_at: i64) -> Result<Committed, NetworkError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(|e| {
            NetworkError::Database(format!("Failed to start transaction: {}", e))
        })?;

        let mut request_ids = Vec::with_capacity(batch.len());
        for new in &batch {
            let next: Option<i64> = tx
                .query_row(
                    "SELECT next_id FROM request_counters WHERE launch_id = ?1",
                    params![new.launch_id as i64],
                    |row| row.get(0),
                )
                .optional()?;
            let request_id = next.unwrap_or(1);
            tx.execute(
                "INSERT OR REPLACE INTO request_counters (launch_id, next_id) VALUES (?1, ?2)",
                params![new.launch_id as i64, request_id + 1],
            )?;

            let content = serde_json::to_string(&new.content)?;
            tx.execute(
                "INSERT INTO requests (launch_id, request_id, creator, created_at, content)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![new.launch_id as i64, request_id, creator, created_at, content],
            )
            .map_err(|e| NetworkError::Database(format!("Failed to save request: {}", e)))?;
            request_ids.push(request_id as u64);
        }

        let height = Self::bump_height(&tx)?;
        tx.commit().map_err(|e| {
            NetworkError::Database(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(Committed { height, request_ids })
    }

    fn approve_request(&self, launch_id: LaunchId, request_id: u64) -> Result<Request, NetworkError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(|e| {
            NetworkError::Database(format!("Failed to start transaction: {}", e))
        })?;

        let request = tx
            .query_row(
                "SELECT launch_id, request_id, creator, created_at, content
                 FROM requests WHERE launch_id = ?1 AND request_id = ?2",
                params![launch_id as i64, request_id as i64],
                row_to_request,
            )
            .optional()?
            .ok_or_else(|| request_not_found(launch_id, request_id))?;

        tx.execute(
            "DELETE FROM requests WHERE launch_id = ?1 AND request_id = ?2",
            params![launch_id as i64, request_id as i64],
        )?;
        Self::apply(&tx, launch_id, &request.content)?;
        Self::bump_height(&tx)?;

        tx.commit().map_err(|e| {
            NetworkError::Database(format!("Failed to commit transaction: {}", e))
        })?;
        Ok(request)
    }

    fn height(&self) -> Result<u64, NetworkError> {
        let conn = self.lock()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![HEIGHT_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::{Coin, Coins};
    use tempfile::TempDir;

    fn account(launch_id: LaunchId, address: &str) -> NewRequest {
        NewRequest {
            launch_id,
            content: RequestContent::GenesisAccount(GenesisAccount {
                launch_id,
                address: address.to_string(),
                coins: Coins::new([Coin::new(1000, "stake").unwrap()]).unwrap(),
            }),
        }
    }

    #[test]
    fn test_database_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.db");
        let db = Database::open(path.to_str().unwrap()).unwrap();
        assert_eq!(db.height().unwrap(), 0);
    }

    #[test]
    fn test_commit_assigns_ids_per_launch() {
        let db = Database::open_in_memory().unwrap();
        let first = db
            .commit_requests("spn1creator", vec![account(1, "spn1a"), account(1, "spn1b")], 10)
            .unwrap();
        assert_eq!(first.request_ids, vec![1, 2]);
        assert_eq!(first.height, 1);

        let other = db.commit_requests("spn1creator", vec![account(2, "spn1a")], 11).unwrap();
        assert_eq!(other.request_ids, vec![1]);
        assert_eq!(other.height, 2);

        let requests = db.requests(1).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].content.address(), "spn1a");
        assert_eq!(requests[1].request_id, 2);
        assert_eq!(requests[1].creator, "spn1creator");
    }

    #[test]
    fn test_approve_moves_request_into_genesis() {
        let db = Database::open_in_memory().unwrap();
        db.commit_requests("spn1a", vec![account(1, "spn1a")], 10).unwrap();
        assert!(db.genesis_account(1, "spn1a").unwrap().is_none());

        let approved = db.approve_request(1, 1).unwrap();
        assert_eq!(approved.content.address(), "spn1a");
        assert!(db.requests(1).unwrap().is_empty());
        assert!(db.genesis_account(1, "spn1a").unwrap().is_some());

        // ids are not reused after approval
        let next = db.commit_requests("spn1b", vec![account(1, "spn1b")], 12).unwrap();
        assert_eq!(next.request_ids, vec![2]);
    }

    #[test]
    fn test_approve_unknown_request() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.approve_request(1, 9), Err(NetworkError::NotFound(_))));
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.db");
        {
            let db = Database::open(path.to_str().unwrap()).unwrap();
            db.commit_requests("spn1a", vec![account(7, "spn1a")], 10).unwrap();
        }
        let db = Database::open(path.to_str().unwrap()).unwrap();
        assert_eq!(db.height().unwrap(), 1);
        assert_eq!(db.requests(7).unwrap().len(), 1);
    }
}
