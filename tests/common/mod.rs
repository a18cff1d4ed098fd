// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use serde_json::Value;
use tally::application::LedgerService;
use tally::storage::{KeyValueStore, Keyspace, MemoryStore, RecordKey, SqliteStore};
use tempfile::TempDir;

/// Helper to create a service over a fresh in-memory store
pub fn memory_service() -> LedgerService<MemoryStore> {
    LedgerService::new(MemoryStore::new(), Keyspace::default())
}

/// Helper to create a test service with a temporary database
pub async fn sqlite_service() -> Result<(LedgerService<SqliteStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap(), Keyspace::default()).await?;
    Ok((service, temp_dir))
}

/// Write a record exactly as another tool would have stored it
pub async fn seed<S: KeyValueStore>(
    service: &LedgerService<S>,
    record: RecordKey,
    value: Value,
) -> Result<()> {
    let key = service.keys().key(record);
    service.store().set(&key, &value.to_string()).await
}

/// Write a raw string under a record key
pub async fn seed_raw<S: KeyValueStore>(
    service: &LedgerService<S>,
    record: RecordKey,
    raw: &str,
) -> Result<()> {
    let key = service.keys().key(record);
    service.store().set(&key, raw).await
}

/// Read back the raw stored string for a record key
pub async fn raw<S: KeyValueStore>(
    service: &LedgerService<S>,
    record: RecordKey,
) -> Result<Option<String>> {
    let key = service.keys().key(record);
    service.store().get(&key).await
}

/// Read back a stored JSON list
pub async fn stored_json<S: KeyValueStore>(
    service: &LedgerService<S>,
    record: RecordKey,
) -> Result<Value> {
    Ok(match raw(service, record).await? {
        Some(s) => serde_json::from_str(&s)?,
        None => Value::Null,
    })
}
