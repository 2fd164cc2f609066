//! Reading ingestion and alert lifecycle services.
//!
//! The HTTP layer stays thin; everything that touches more than one table
//! lives here so the behaviour can be exercised directly against a database
//! in integration tests.

use crate::entity::{alert, room, sensor_reading, user};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QuerySelect, TransactionTrait,
};
use std::collections::HashMap;
use thiserror::Error;
use time::OffsetDateTime;

pub mod evaluator;

pub use evaluator::{AlertDraft, evaluate};

/// Bounds for physically plausible sensor values. Values outside these are
/// rejected at ingestion instead of flowing into alerting.
const PLAUSIBLE_TEMPERATURE: std::ops::RangeInclusive<f64> = -50.0..=100.0;
const PLAUSIBLE_HUMIDITY: std::ops::RangeInclusive<f64> = 0.0..=100.0;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("room {0} not found")]
    RoomNotFound(i32),
    #[error("alert {0} not found")]
    AlertNotFound(i32),
    #[error("user {0} not found")]
    UserNotFound(i32),
    #[error("alert {0} is already resolved")]
    AlreadyResolved(i32),
    #[error("implausible reading: {0}")]
    ImplausibleReading(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// A reading as submitted by a sensor or simulator, before persistence.
#[derive(Debug, Clone)]
pub struct NewReading {
    pub room_id: i32,
    pub temperature: f64,
    pub humidity: f64,
    pub sensor_type: Option<String>,
    pub notes: Option<String>,
}

/// Persist a reading and the alert it may imply, atomically.
///
/// The reading and its derived alert are committed in one transaction so a
/// failure can never leave a reading recorded without the alert it should
/// have raised. Returns the stored reading and the alert, if any fired.
pub async fn ingest_reading(
    db: &DatabaseConnection,
    reading: NewReading,
) -> Result<(sensor_reading::Model, Option<alert::Model>), MonitorError> {
    if !PLAUSIBLE_HUMIDITY.contains(&reading.humidity) {
        return Err(MonitorError::ImplausibleReading(format!(
            "humidity {}% is outside 0–100%",
            reading.humidity
        )));
    }
    if !PLAUSIBLE_TEMPERATURE.contains(&reading.temperature) {
        return Err(MonitorError::ImplausibleReading(format!(
            "temperature {}°C is outside -50–100°C",
            reading.temperature
        )));
    }

    let now = OffsetDateTime::now_utc();
    let txn = db.begin().await?;

    // The room check shares the insert transaction; a concurrent room
    // deletion rolls this back instead of surfacing as a FK violation.
    let room = room::Entity::find_by_id(reading.room_id).one(&txn).await?;
    if room.is_none() {
        return Err(MonitorError::RoomNotFound(reading.room_id));
    }

    let stored = sensor_reading::ActiveModel {
        room_id: Set(reading.room_id),
        temperature: Set(reading.temperature),
        humidity: Set(reading.humidity),
        recorded_at: Set(now),
        sensor_type: Set(reading.sensor_type.unwrap_or_else(|| "DHT22".to_string())),
        notes: Set(reading.notes),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let raised = match evaluate(stored.temperature, stored.humidity) {
        Some(draft) => {
            let alert = alert::ActiveModel {
                room_id: Set(stored.room_id),
                alert_type: Set(draft.alert_type),
                severity: Set(draft.severity),
                message: Set(draft.message),
                created_at: Set(now),
                is_resolved: Set(false),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            tracing::info!(
                room_id = stored.room_id,
                alert_id = alert.id,
                severity = ?alert.severity,
                "threshold alert raised"
            );
            Some(alert)
        }
        None => None,
    };

    txn.commit().await?;
    Ok((stored, raised))
}

/// Transition an alert from unresolved to resolved, exactly once.
///
/// An already-resolved alert is rejected with `AlreadyResolved` rather than
/// silently overwriting who resolved it and why.
pub async fn resolve_alert(
    db: &DatabaseConnection,
    alert_id: i32,
    user_id: i32,
    notes: Option<String>,
) -> Result<alert::Model, MonitorError> {
    let txn = db.begin().await?;

    // Exclusive row lock: two concurrent resolutions serialize here, so
    // the is_resolved guard holds even under races.
    let found = alert::Entity::find_by_id(alert_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or(MonitorError::AlertNotFound(alert_id))?;

    if found.is_resolved {
        return Err(MonitorError::AlreadyResolved(alert_id));
    }

    let resolver = user::Entity::find_by_id(user_id).one(&txn).await?;
    if resolver.is_none() {
        return Err(MonitorError::UserNotFound(user_id));
    }

    let mut model: alert::ActiveModel = found.into();
    model.is_resolved = Set(true);
    model.resolved_at = Set(Some(OffsetDateTime::now_utc()));
    model.resolved_by_user_id = Set(Some(user_id));
    model.resolution_notes = Set(notes);
    let resolved = model.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(alert_id, user_id, "alert resolved");
    Ok(resolved)
}

/// Usernames of the accounts behind the given resolver ids, one query.
///
/// Listings join this in so resolved alerts always carry the resolver's
/// username next to the id.
pub async fn resolver_usernames<I>(
    db: &DatabaseConnection,
    ids: I,
) -> Result<HashMap<i32, String>, DbErr>
where
    I: IntoIterator<Item = i32>,
{
    let ids: Vec<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
}

/// Unresolved alerts for a room, newest first. Used by the room details view.
pub async fn active_alerts_for_room(
    db: &DatabaseConnection,
    room_id: i32,
) -> Result<Vec<alert::Model>, DbErr> {
    use sea_orm::QueryOrder;
    alert::Entity::find()
        .filter(alert::Column::RoomId.eq(room_id))
        .filter(alert::Column::IsResolved.eq(false))
        .order_by_desc(alert::Column::CreatedAt)
        .all(db)
        .await
}
