//! Tests for reading ingestion and the alert lifecycle.
//!
//! These tests run the monitor services against an in-memory SQLite database
//! and verify that out-of-band readings raise the right alerts and that
//! resolution happens exactly once.

use care_home_monitor::entity::alert::{AlertType, Severity};
use care_home_monitor::entity::{alert, room, sensor_reading, user};
use care_home_monitor::monitor::{self, MonitorError, NewReading};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    EntityTrait, PaginatorTrait, Statement,
};
use std::sync::Arc;
use time::OffsetDateTime;

/// Create an in-memory SQLite database with required tables.
async fn setup_test_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    // Create room table
    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"CREATE TABLE room (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            room_number TEXT NOT NULL UNIQUE,
            room_name TEXT NULL,
            floor TEXT NOT NULL,
            capacity INTEGER NOT NULL,
            is_occupied INTEGER NOT NULL DEFAULT 0,
            notes TEXT NULL,
            created_at TEXT NOT NULL
        );"#,
    ))
    .await
    .expect("Failed to create room table");

    // Create user table
    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"CREATE TABLE user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL,
            created_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );"#,
    ))
    .await
    .expect("Failed to create user table");

    // Create sensor_reading table
    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"CREATE TABLE sensor_reading (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            room_id INTEGER NOT NULL,
            temperature REAL NOT NULL,
            humidity REAL NOT NULL,
            recorded_at TEXT NOT NULL,
            sensor_type TEXT NOT NULL,
            notes TEXT NULL
        );"#,
    ))
    .await
    .expect("Failed to create sensor_reading table");

    // Create alert table
    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"CREATE TABLE alert (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            room_id INTEGER NOT NULL,
            alert_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL,
            is_resolved INTEGER NOT NULL DEFAULT 0,
            resolved_at TEXT NULL,
            resolved_by_user_id INTEGER NULL,
            resolution_notes TEXT NULL
        );"#,
    ))
    .await
    .expect("Failed to create alert table");

    Arc::new(db)
}

async fn insert_room(db: &DatabaseConnection, room_number: &str) -> room::Model {
    room::ActiveModel {
        room_number: Set(room_number.to_string()),
        room_name: Set(None),
        floor: Set("1".to_string()),
        capacity: Set(2),
        is_occupied: Set(true),
        notes: Set(None),
        created_at: Set(OffsetDateTime::now_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert room")
}

async fn insert_user(db: &DatabaseConnection, username: &str) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set("$2b$12$placeholderplaceholderplace".to_string()),
        full_name: Set("Test Nurse".to_string()),
        email: Set(format!("{username}@example.com")),
        role: Set(user::Role::Nurse),
        created_at: Set(OffsetDateTime::now_utc()),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

fn reading(room_id: i32, temperature: f64, humidity: f64) -> NewReading {
    NewReading {
        room_id,
        temperature,
        humidity,
        sensor_type: None,
        notes: None,
    }
}

#[tokio::test]
async fn in_band_reading_is_stored_without_alert() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;

    let (stored, raised) = monitor::ingest_reading(&db, reading(room.id, 22.0, 45.0))
        .await
        .expect("Ingestion should succeed");

    assert_eq!(stored.room_id, room.id);
    assert_eq!(stored.temperature, 22.0);
    assert_eq!(stored.sensor_type, "DHT22");
    assert!(raised.is_none());

    let alert_count = alert::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(alert_count, 0);
}

#[tokio::test]
async fn very_cold_reading_raises_critical_temperature_alert() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;

    let (_, raised) = monitor::ingest_reading(&db, reading(room.id, 14.0, 45.0))
        .await
        .expect("Ingestion should succeed");

    let alert = raised.expect("An alert should have been raised");
    assert_eq!(alert.alert_type, AlertType::Temperature);
    assert_eq!(alert.severity, Severity::Critical);
    assert!(alert.message.contains("Temperature too low"));
    assert!(!alert.is_resolved);
    assert!(alert.resolved_at.is_none());
}

#[tokio::test]
async fn slightly_cold_reading_raises_medium_alert() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;

    let (_, raised) = monitor::ingest_reading(&db, reading(room.id, 17.0, 50.0))
        .await
        .expect("Ingestion should succeed");

    let alert = raised.expect("An alert should have been raised");
    assert_eq!(alert.alert_type, AlertType::Temperature);
    assert_eq!(alert.severity, Severity::Medium);
}

#[tokio::test]
async fn humid_reading_raises_medium_humidity_alert() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;

    let (_, raised) = monitor::ingest_reading(&db, reading(room.id, 22.0, 65.0))
        .await
        .expect("Ingestion should succeed");

    let alert = raised.expect("An alert should have been raised");
    assert_eq!(alert.alert_type, AlertType::Humidity);
    assert_eq!(alert.severity, Severity::Medium);
    assert!(alert.message.contains("Humidity too high"));
}

#[tokio::test]
async fn hot_and_dry_reading_raises_critical_environmental_alert() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;

    let (_, raised) = monitor::ingest_reading(&db, reading(room.id, 31.0, 20.0))
        .await
        .expect("Ingestion should succeed");

    let alert = raised.expect("An alert should have been raised");
    assert_eq!(alert.alert_type, AlertType::Environmental);
    assert_eq!(alert.severity, Severity::Critical);
    assert!(alert.message.contains("Temperature too high"));
    assert!(alert.message.contains("Humidity too low"));
    assert!(alert.message.contains(" and "));
}

#[tokio::test]
async fn reading_for_unknown_room_is_rejected() {
    let db = setup_test_db().await;

    let err = monitor::ingest_reading(&db, reading(999, 22.0, 45.0))
        .await
        .expect_err("Ingestion should fail");
    assert!(matches!(err, MonitorError::RoomNotFound(999)));

    // Nothing may be stored on the failure path.
    let reading_count = sensor_reading::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(reading_count, 0);
}

#[tokio::test]
async fn implausible_values_are_rejected_before_storage() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;

    let err = monitor::ingest_reading(&db, reading(room.id, 22.0, 150.0))
        .await
        .expect_err("Ingestion should fail");
    assert!(matches!(err, MonitorError::ImplausibleReading(_)));

    let err = monitor::ingest_reading(&db, reading(room.id, -80.0, 45.0))
        .await
        .expect_err("Ingestion should fail");
    assert!(matches!(err, MonitorError::ImplausibleReading(_)));

    let reading_count = sensor_reading::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(reading_count, 0);
    let alert_count = alert::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(alert_count, 0);
}

#[tokio::test]
async fn resolving_an_alert_records_who_and_when() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;
    let nurse = insert_user(&db, "nurse1").await;

    let (_, raised) = monitor::ingest_reading(&db, reading(room.id, 14.0, 45.0))
        .await
        .expect("Ingestion should succeed");
    let alert_id = raised.unwrap().id;

    let resolved = monitor::resolve_alert(&db, alert_id, nurse.id, Some("Heating fixed".into()))
        .await
        .expect("Resolution should succeed");

    assert!(resolved.is_resolved);
    assert!(resolved.resolved_at.is_some());
    assert_eq!(resolved.resolved_by_user_id, Some(nurse.id));
    assert_eq!(resolved.resolution_notes.as_deref(), Some("Heating fixed"));
}

#[tokio::test]
async fn resolving_twice_is_rejected_and_keeps_the_original_record() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;
    let nurse = insert_user(&db, "nurse1").await;
    let other = insert_user(&db, "nurse2").await;

    let (_, raised) = monitor::ingest_reading(&db, reading(room.id, 14.0, 45.0))
        .await
        .expect("Ingestion should succeed");
    let alert_id = raised.unwrap().id;

    let first = monitor::resolve_alert(&db, alert_id, nurse.id, Some("Heating fixed".into()))
        .await
        .expect("First resolution should succeed");

    let err = monitor::resolve_alert(&db, alert_id, other.id, Some("Me too".into()))
        .await
        .expect_err("Second resolution should fail");
    assert!(matches!(err, MonitorError::AlreadyResolved(_)));

    // The stored record still carries the first resolution.
    let stored = alert::Entity::find_by_id(alert_id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.resolved_by_user_id, Some(nurse.id));
    assert_eq!(stored.resolution_notes, first.resolution_notes);
}

#[tokio::test]
async fn resolving_a_nonexistent_alert_is_rejected() {
    let db = setup_test_db().await;
    let nurse = insert_user(&db, "nurse1").await;

    let err = monitor::resolve_alert(&db, 42, nurse.id, None)
        .await
        .expect_err("Resolution should fail");
    assert!(matches!(err, MonitorError::AlertNotFound(42)));
}

#[tokio::test]
async fn resolving_with_an_unknown_user_is_rejected() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;

    let (_, raised) = monitor::ingest_reading(&db, reading(room.id, 14.0, 45.0))
        .await
        .expect("Ingestion should succeed");
    let alert_id = raised.unwrap().id;

    let err = monitor::resolve_alert(&db, alert_id, 999, None)
        .await
        .expect_err("Resolution should fail");
    assert!(matches!(err, MonitorError::UserNotFound(999)));

    // The alert stays unresolved.
    let stored = alert::Entity::find_by_id(alert_id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_resolved);
}

#[tokio::test]
async fn room_alert_listings_carry_the_resolver_username() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;
    let nurse = insert_user(&db, "nurse1").await;

    let (_, raised) = monitor::ingest_reading(&db, reading(room.id, 14.0, 45.0))
        .await
        .expect("Ingestion should succeed");
    monitor::resolve_alert(&db, raised.unwrap().id, nurse.id, None)
        .await
        .expect("Resolution should succeed");
    let (_, unresolved) = monitor::ingest_reading(&db, reading(room.id, 31.0, 45.0))
        .await
        .expect("Ingestion should succeed");
    let unresolved = unresolved.unwrap();

    // The username map the listings join in covers every resolver id, and
    // only those.
    let alerts = alert::Entity::find().all(db.as_ref()).await.unwrap();
    let usernames =
        monitor::resolver_usernames(db.as_ref(), alerts.iter().filter_map(|a| a.resolved_by_user_id))
            .await
            .expect("Query should succeed");
    assert_eq!(usernames.get(&nurse.id).map(String::as_str), Some("nurse1"));
    assert_eq!(usernames.len(), 1);
    assert!(unresolved.resolved_by_user_id.is_none());
}

#[tokio::test]
async fn active_alerts_are_returned_newest_first() {
    let db = setup_test_db().await;
    let room = insert_room(&db, "101").await;
    let nurse = insert_user(&db, "nurse1").await;

    let (_, first) = monitor::ingest_reading(&db, reading(room.id, 14.0, 45.0))
        .await
        .expect("Ingestion should succeed");
    let (_, second) = monitor::ingest_reading(&db, reading(room.id, 31.0, 45.0))
        .await
        .expect("Ingestion should succeed");
    let first = first.unwrap();
    let second = second.unwrap();

    monitor::resolve_alert(&db, first.id, nurse.id, None)
        .await
        .expect("Resolution should succeed");

    let active = monitor::active_alerts_for_room(db.as_ref(), room.id)
        .await
        .expect("Query should succeed");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);
}
