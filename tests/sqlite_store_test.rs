mod common;

use anyhow::Result;
use common::{seed, sqlite_service};
use serde_json::json;
use tally::application::LedgerService;
use tally::domain::{ApprovalKind, RequestStatus};
use tally::storage::{KeyValueStore, Keyspace, RecordKey, SqliteStore};
use tempfile::TempDir;

#[tokio::test]
async fn test_get_set_and_overwrite() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("kv.db").display());
    let store = SqliteStore::init(&db_url).await?;

    assert_eq!(store.get("missing").await?, None);

    store.set("a", "1").await?;
    store.set("a", "2").await?;
    assert_eq!(store.get("a").await?.as_deref(), Some("2"));

    store
        .set_many(&[("b".into(), "x".into()), ("c".into(), "y".into())])
        .await?;
    assert_eq!(store.keys().await?, vec!["a", "b", "c"]);
    assert_eq!(store.get("c").await?.as_deref(), Some("y"));

    Ok(())
}

#[tokio::test]
async fn test_migrate_is_idempotent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("kv.db").display());

    let store = SqliteStore::init(&db_url).await?;
    store.set("kept", "yes").await?;
    store.migrate().await?;

    assert_eq!(store.get("kept").await?.as_deref(), Some("yes"));

    Ok(())
}

#[tokio::test]
async fn test_connect_to_missing_database_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("absent.db");

    let result = LedgerService::connect(db_path.to_str().unwrap(), Keyspace::default()).await;
    assert!(result.is_err());
    assert!(!db_path.exists());

    Ok(())
}

#[tokio::test]
async fn test_state_survives_reconnect() -> Result<()> {
    let (service, temp_dir) = sqlite_service().await?;
    let db_path = temp_dir.path().join("test.db");

    seed(
        &service,
        RecordKey::Recharges,
        json!([{"id": "r1", "amount": 40, "status": "pending", "createdAt": "2024-01-01T00:00:00.000Z"}]),
    )
    .await?;
    let user_id = service.get_user_id().await?;
    service.approve_recharge("r1").await?;
    service.store().close().await;
    drop(service);

    let reopened = LedgerService::connect(db_path.to_str().unwrap(), Keyspace::default()).await?;
    assert_eq!(reopened.get_user_id().await?, user_id);
    assert_eq!(reopened.get_balance().await?, 104_000);

    let recharges = reopened.list_recharges().await?;
    assert_eq!(recharges[0].status, RequestStatus::Approved);

    let log = reopened.list_approvals().await?;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, ApprovalKind::RechargeApproved);

    Ok(())
}

#[tokio::test]
async fn test_full_flow_on_sqlite() -> Result<()> {
    let (service, _temp) = sqlite_service().await?;

    let withdrawal = service.submit_withdrawal(30_000, None).await?;
    assert_eq!(service.get_balance().await?, 70_000);

    service.reject_withdrawal(&withdrawal.request.id).await?;
    assert_eq!(service.get_balance().await?, 100_000);

    let keys = service.store().keys().await?;
    assert_eq!(
        keys,
        vec!["dmall_approvals", "dmall_balance", "dmall_withdraws"]
    );

    Ok(())
}
