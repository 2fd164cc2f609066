//! Sensor reading endpoints.
//!
//! - `GET /` - List all readings, newest first
//! - `GET /recent` - The most recent readings across all rooms
//! - `GET /{id}` - Fetch one reading
//! - `GET /room/{room_id}` - Readings for a room, newest first
//! - `GET /room/{room_id}/latest` - Most recent reading for a room
//! - `GET /daterange` - Readings within a time window
//! - `POST /` - Ingest a reading; may raise an alert
//! - `PUT /{id}` - Correct a stored reading (admin only)
//! - `DELETE /{id}` - Delete a reading (admin only)

use crate::AppResources;
use crate::api::alerts::AlertDto;
use crate::auth::AuthUser;
use crate::entity::user::Role;
use crate::entity::{room, sensor_reading};
use crate::error::ApiError;
use crate::monitor::{self, NewReading};
use axum::{
    Extension, Json,
    extract::{Path, Query},
};
use hyper::StatusCode;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const SENSORS_TAG: &str = "Sensor Data";

/// Sensor reading as exposed through the API, with the room number joined in.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    pub id: i32,
    pub room_id: i32,
    pub room_number: Option<String>,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    pub recorded_at: OffsetDateTime,
    pub sensor_type: String,
    pub notes: Option<String>,
}

impl ReadingDto {
    pub fn new(reading: sensor_reading::Model, room_number: Option<String>) -> Self {
        Self {
            id: reading.id,
            room_id: reading.room_id,
            room_number,
            temperature: reading.temperature,
            humidity: reading.humidity,
            recorded_at: reading.recorded_at,
            sensor_type: reading.sensor_type,
            notes: reading.notes,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingRequest {
    pub room_id: i32,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    pub sensor_type: Option<String>,
    pub notes: Option<String>,
}

/// The stored reading plus the alert it raised, if the values were out of
/// bounds.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub reading: ReadingDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_raised: Option<AlertDto>,
}

/// Administrative correction of a stored reading. No alert re-evaluation
/// happens; alerts reflect the values as originally reported. An explicit
/// `null` for notes clears them.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReadingRequest {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub sensor_type: Option<String>,
    #[serde(default, with = "crate::api::double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentQuery {
    /// Number of readings to return, newest first. Defaults to 50.
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DateRangeQuery {
    /// Start of the window, RFC 3339.
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    /// End of the window, RFC 3339.
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

/// Creates the sensor data API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_readings, ingest_reading))
        .routes(routes!(recent_readings))
        .routes(routes!(readings_by_date_range))
        .routes(routes!(get_reading, update_reading, delete_reading))
        .routes(routes!(readings_for_room))
        .routes(routes!(latest_reading_for_room))
}

fn dtos_with_rooms(rows: Vec<(sensor_reading::Model, Option<room::Model>)>) -> Vec<ReadingDto> {
    rows.into_iter()
        .map(|(reading, room)| ReadingDto::new(reading, room.map(|r| r.room_number)))
        .collect()
}

/// List all readings, newest first.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "",
    tag = SENSORS_TAG,
    operation_id = "List Readings",
    summary = "List all readings, newest first",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "List of readings", body = Vec<ReadingDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn list_readings(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
) -> Result<Json<Vec<ReadingDto>>, ApiError> {
    let rows = sensor_reading::Entity::find()
        .find_also_related(room::Entity)
        .order_by_desc(sensor_reading::Column::RecordedAt)
        .all(resources.db.as_ref())
        .await?;
    Ok(Json(dtos_with_rooms(rows)))
}

/// The most recent readings across all rooms.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/recent",
    tag = SENSORS_TAG,
    operation_id = "List Recent Readings",
    summary = "Most recent readings across all rooms",
    params(RecentQuery),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Recent readings", body = Vec<ReadingDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn recent_readings(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<ReadingDto>>, ApiError> {
    let count = query.count.unwrap_or(50);
    let rows = sensor_reading::Entity::find()
        .find_also_related(room::Entity)
        .order_by_desc(sensor_reading::Column::RecordedAt)
        .limit(count)
        .all(resources.db.as_ref())
        .await?;
    Ok(Json(dtos_with_rooms(rows)))
}

/// Readings within a time window, newest first.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/daterange",
    tag = SENSORS_TAG,
    operation_id = "List Readings By Date Range",
    summary = "Readings within a time window",
    params(DateRangeQuery),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Readings in the window", body = Vec<ReadingDto>),
        (status = 400, description = "End before start", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn readings_by_date_range(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<ReadingDto>>, ApiError> {
    if query.end < query.start {
        return Err(ApiError::bad_request("End date must not be before start date"));
    }
    let rows = sensor_reading::Entity::find()
        .filter(sensor_reading::Column::RecordedAt.gte(query.start))
        .filter(sensor_reading::Column::RecordedAt.lte(query.end))
        .find_also_related(room::Entity)
        .order_by_desc(sensor_reading::Column::RecordedAt)
        .all(resources.db.as_ref())
        .await?;
    Ok(Json(dtos_with_rooms(rows)))
}

/// Fetch one reading by id.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/{id}",
    tag = SENSORS_TAG,
    operation_id = "Get Reading",
    summary = "Fetch one reading",
    params(("id" = i32, Path, description = "Reading id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "The reading", body = ReadingDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such reading", body = ApiError),
    )
)]
async fn get_reading(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ReadingDto>, ApiError> {
    let row = sensor_reading::Entity::find_by_id(id)
        .find_also_related(room::Entity)
        .one(resources.db.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Sensor data with ID {id} not found")))?;
    Ok(Json(ReadingDto::new(row.0, row.1.map(|r| r.room_number))))
}

/// Readings for a room, newest first.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/room/{room_id}",
    tag = SENSORS_TAG,
    operation_id = "List Readings For Room",
    summary = "Readings for a room, newest first",
    params(("room_id" = i32, Path, description = "Room id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Readings for the room", body = Vec<ReadingDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such room", body = ApiError),
    )
)]
async fn readings_for_room(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(room_id): Path<i32>,
) -> Result<Json<Vec<ReadingDto>>, ApiError> {
    let db = resources.db.as_ref();
    let room = room::Entity::find_by_id(room_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Room with ID {room_id} not found")))?;

    let readings = sensor_reading::Entity::find()
        .filter(sensor_reading::Column::RoomId.eq(room_id))
        .order_by_desc(sensor_reading::Column::RecordedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|r| ReadingDto::new(r, Some(room.room_number.clone())))
        .collect();
    Ok(Json(readings))
}

/// Most recent reading for a room.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/room/{room_id}/latest",
    tag = SENSORS_TAG,
    operation_id = "Get Latest Reading For Room",
    summary = "Most recent reading for a room",
    params(("room_id" = i32, Path, description = "Room id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "The latest reading", body = ReadingDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such room, or no readings yet", body = ApiError),
    )
)]
async fn latest_reading_for_room(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(room_id): Path<i32>,
) -> Result<Json<ReadingDto>, ApiError> {
    let db = resources.db.as_ref();
    let room = room::Entity::find_by_id(room_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Room with ID {room_id} not found")))?;

    let latest = sensor_reading::Entity::find()
        .filter(sensor_reading::Column::RoomId.eq(room_id))
        .order_by_desc(sensor_reading::Column::RecordedAt)
        .one(db)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("No sensor data found for room {room_id}"))
        })?;
    Ok(Json(ReadingDto::new(latest, Some(room.room_number))))
}

/// Ingest a reading.
#[tracing::instrument(skip(resources, _auth, payload), fields(room_id = payload.room_id))]
#[utoipa::path(
    post,
    path = "",
    tag = SENSORS_TAG,
    operation_id = "Ingest Reading",
    summary = "Ingest a reading",
    description = "Stores the reading and evaluates it against the acceptable \
                   temperature and humidity bands. If a band is violated an \
                   alert is created atomically with the reading and returned \
                   in the response.",
    security(("Authorization" = [])),
    request_body(content = CreateReadingRequest, description = "Reading values"),
    responses(
        (status = 201, description = "Reading stored", body = IngestResponse),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such room", body = ApiError),
        (status = 422, description = "Physically implausible values", body = ApiError),
    )
)]
async fn ingest_reading(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Json(payload): Json<CreateReadingRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let db = resources.db.as_ref();
    let (reading, alert) = monitor::ingest_reading(
        db,
        NewReading {
            room_id: payload.room_id,
            temperature: payload.temperature,
            humidity: payload.humidity,
            sensor_type: payload.sensor_type,
            notes: payload.notes,
        },
    )
    .await?;

    let room_number = room::Entity::find_by_id(reading.room_id)
        .one(db)
        .await?
        .map(|r| r.room_number);

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            reading: ReadingDto::new(reading, room_number.clone()),
            alert_raised: alert.map(|a| AlertDto::new(a, room_number, None)),
        }),
    ))
}

/// Correct a stored reading.
#[tracing::instrument(skip(resources, auth, payload), fields(caller = %auth.username))]
#[utoipa::path(
    put,
    path = "/{id}",
    tag = SENSORS_TAG,
    operation_id = "Update Reading",
    summary = "Correct a stored reading",
    description = "Corrects the stored values without re-running alert \
                   evaluation.\n\n**Authorization:** Admin only.",
    params(("id" = i32, Path, description = "Reading id")),
    security(("Authorization" = [])),
    request_body(content = UpdateReadingRequest, description = "Fields to change"),
    responses(
        (status = 200, description = "The corrected reading", body = ReadingDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 404, description = "No such reading", body = ApiError),
    )
)]
async fn update_reading(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateReadingRequest>,
) -> Result<Json<ReadingDto>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let db = resources.db.as_ref();
    let found = sensor_reading::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Sensor data with ID {id} not found")))?;

    let mut model: sensor_reading::ActiveModel = found.into();
    if let Some(temperature) = payload.temperature {
        model.temperature = Set(temperature);
    }
    if let Some(humidity) = payload.humidity {
        model.humidity = Set(humidity);
    }
    if let Some(sensor_type) = payload.sensor_type {
        model.sensor_type = Set(sensor_type);
    }
    if let Some(notes) = payload.notes {
        model.notes = Set(notes);
    }
    let updated = model.update(db).await?;

    let room_number = room::Entity::find_by_id(updated.room_id)
        .one(db)
        .await?
        .map(|r| r.room_number);
    Ok(Json(ReadingDto::new(updated, room_number)))
}

/// Delete a reading.
#[tracing::instrument(skip(resources, auth), fields(caller = %auth.username))]
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = SENSORS_TAG,
    operation_id = "Delete Reading",
    summary = "Delete a reading",
    description = "**Authorization:** Admin only.",
    params(("id" = i32, Path, description = "Reading id")),
    security(("Authorization" = [])),
    responses(
        (status = 204, description = "Reading deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 404, description = "No such reading", body = ApiError),
    )
)]
async fn delete_reading(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let db = resources.db.as_ref();
    let found = sensor_reading::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Sensor data with ID {id} not found")))?;

    found.delete(db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_request_distinguishes_null_notes_from_absent() {
        let req: UpdateReadingRequest = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(req.notes, Some(None));

        let req: UpdateReadingRequest = serde_json::from_str(r#"{"temperature": 21.5}"#).unwrap();
        assert_eq!(req.notes, None);
        assert_eq!(req.temperature, Some(21.5));
    }
}
