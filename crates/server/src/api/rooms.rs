//! Room management endpoints.
//!
//! - `GET /` - List all rooms
//! - `GET /occupied` - Rooms currently occupied
//! - `GET /available` - Rooms with free capacity
//! - `GET /{id}` - Fetch one room
//! - `GET /{id}/details` - Room with residents, latest reading and open alerts
//! - `POST /` - Create a room (admin only)
//! - `PUT /{id}` - Update a room (admin only)
//! - `DELETE /{id}` - Delete a room (admin only)

use crate::AppResources;
use crate::api::alerts::AlertDto;
use crate::api::residents::ResidentDto;
use crate::api::sensor_data::ReadingDto;
use crate::auth::AuthUser;
use crate::entity::user::Role;
use crate::entity::{alert, resident, room, sensor_reading};
use crate::error::ApiError;
use crate::monitor;
use axum::{Extension, Json, extract::Path};
use hyper::StatusCode;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const ROOMS_TAG: &str = "Rooms";

/// Room as exposed through the API, with live occupancy counts.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    pub id: i32,
    pub room_number: String,
    pub room_name: Option<String>,
    pub floor: String,
    pub capacity: i32,
    pub is_occupied: bool,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
    pub resident_count: u64,
    pub sensor_reading_count: u64,
    pub active_alert_count: u64,
}

impl RoomDto {
    async fn load(db: &DatabaseConnection, room: room::Model) -> Result<Self, sea_orm::DbErr> {
        let resident_count = resident::Entity::find()
            .filter(resident::Column::RoomId.eq(room.id))
            .filter(resident::Column::IsActive.eq(true))
            .count(db)
            .await?;
        let sensor_reading_count = sensor_reading::Entity::find()
            .filter(sensor_reading::Column::RoomId.eq(room.id))
            .count(db)
            .await?;
        let active_alert_count = alert::Entity::find()
            .filter(alert::Column::RoomId.eq(room.id))
            .filter(alert::Column::IsResolved.eq(false))
            .count(db)
            .await?;
        Ok(Self {
            id: room.id,
            room_number: room.room_number,
            room_name: room.room_name,
            floor: room.floor,
            capacity: room.capacity,
            is_occupied: room.is_occupied,
            notes: room.notes,
            created_at: room.created_at,
            resident_count,
            sensor_reading_count,
            active_alert_count,
        })
    }
}

/// Room details for the per-room dashboard view.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailsDto {
    #[serde(flatten)]
    pub room: RoomDto,
    pub residents: Vec<ResidentDto>,
    pub latest_reading: Option<ReadingDto>,
    pub active_alerts: Vec<AlertDto>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub room_number: String,
    pub room_name: Option<String>,
    #[serde(default = "default_floor")]
    pub floor: String,
    #[serde(default = "default_capacity")]
    pub capacity: i32,
    #[serde(default)]
    pub is_occupied: bool,
    pub notes: Option<String>,
}

fn default_floor() -> String {
    "Ground".to_string()
}

fn default_capacity() -> i32 {
    1
}

/// Request to update a room. Absent fields keep their current value; the
/// nullable fields accept an explicit `null` to clear them.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomRequest {
    pub room_number: Option<String>,
    #[serde(default, with = "crate::api::double_option")]
    pub room_name: Option<Option<String>>,
    pub floor: Option<String>,
    pub capacity: Option<i32>,
    pub is_occupied: Option<bool>,
    #[serde(default, with = "crate::api::double_option")]
    pub notes: Option<Option<String>>,
}

/// Creates the rooms API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_rooms, create_room))
        .routes(routes!(occupied_rooms))
        .routes(routes!(available_rooms))
        .routes(routes!(get_room, update_room, delete_room))
        .routes(routes!(room_details))
}

async fn to_dtos(
    db: &DatabaseConnection,
    rooms: Vec<room::Model>,
) -> Result<Vec<RoomDto>, ApiError> {
    let mut dtos = Vec::with_capacity(rooms.len());
    for room in rooms {
        dtos.push(RoomDto::load(db, room).await?);
    }
    Ok(dtos)
}

/// List all rooms.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "",
    tag = ROOMS_TAG,
    operation_id = "List Rooms",
    summary = "List all rooms",
    description = "Returns every room ordered by room number.",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "List of rooms", body = Vec<RoomDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn list_rooms(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    let db = resources.db.as_ref();
    let rooms = room::Entity::find()
        .order_by_asc(room::Column::RoomNumber)
        .all(db)
        .await?;
    Ok(Json(to_dtos(db, rooms).await?))
}

/// List occupied rooms.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/occupied",
    tag = ROOMS_TAG,
    operation_id = "List Occupied Rooms",
    summary = "List occupied rooms",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Occupied rooms", body = Vec<RoomDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn occupied_rooms(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    let db = resources.db.as_ref();
    let rooms = room::Entity::find()
        .filter(room::Column::IsOccupied.eq(true))
        .order_by_asc(room::Column::RoomNumber)
        .all(db)
        .await?;
    Ok(Json(to_dtos(db, rooms).await?))
}

/// List rooms that are not occupied.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/available",
    tag = ROOMS_TAG,
    operation_id = "List Available Rooms",
    summary = "List available rooms",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Available rooms", body = Vec<RoomDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn available_rooms(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    let db = resources.db.as_ref();
    let rooms = room::Entity::find()
        .filter(room::Column::IsOccupied.eq(false))
        .order_by_asc(room::Column::RoomNumber)
        .all(db)
        .await?;
    Ok(Json(to_dtos(db, rooms).await?))
}

/// Fetch one room by id.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/{id}",
    tag = ROOMS_TAG,
    operation_id = "Get Room",
    summary = "Fetch one room",
    params(("id" = i32, Path, description = "Room id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "The room", body = RoomDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such room", body = ApiError),
    )
)]
async fn get_room(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<RoomDto>, ApiError> {
    let db = resources.db.as_ref();
    let found = room::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Room with ID {id} not found")))?;
    Ok(Json(RoomDto::load(db, found).await?))
}

/// Room with its residents, latest reading and open alerts.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/{id}/details",
    tag = ROOMS_TAG,
    operation_id = "Get Room Details",
    summary = "Room with residents, latest reading and open alerts",
    params(("id" = i32, Path, description = "Room id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Room details", body = RoomDetailsDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such room", body = ApiError),
    )
)]
async fn room_details(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<RoomDetailsDto>, ApiError> {
    let db = resources.db.as_ref();
    let found = room::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Room with ID {id} not found")))?;
    let room_number = found.room_number.clone();

    let residents = resident::Entity::find()
        .filter(resident::Column::RoomId.eq(id))
        .order_by_asc(resident::Column::LastName)
        .all(db)
        .await?
        .into_iter()
        .map(|r| ResidentDto::new(r, Some(room_number.clone())))
        .collect();

    let latest_reading = sensor_reading::Entity::find()
        .filter(sensor_reading::Column::RoomId.eq(id))
        .order_by_desc(sensor_reading::Column::RecordedAt)
        .one(db)
        .await?
        .map(|r| ReadingDto::new(r, Some(room_number.clone())));

    let active_alerts = monitor::active_alerts_for_room(db, id)
        .await?
        .into_iter()
        .map(|a| AlertDto::new(a, Some(room_number.clone()), None))
        .collect();

    Ok(Json(RoomDetailsDto {
        room: RoomDto::load(db, found).await?,
        residents,
        latest_reading,
        active_alerts,
    }))
}

/// Create a room.
#[tracing::instrument(skip(resources, auth, payload), fields(caller = %auth.username, room_number = %payload.room_number))]
#[utoipa::path(
    post,
    path = "",
    tag = ROOMS_TAG,
    operation_id = "Create Room",
    summary = "Create a room",
    description = "**Authorization:** Admin only.",
    security(("Authorization" = [])),
    request_body(content = CreateRoomRequest, description = "Room details"),
    responses(
        (status = 201, description = "Room created", body = RoomDto),
        (status = 400, description = "Room number already exists", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
    )
)]
async fn create_room(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomDto>), ApiError> {
    auth.require_role(&[Role::Admin])?;

    let db = resources.db.as_ref();
    let taken = room::Entity::find()
        .filter(room::Column::RoomNumber.eq(payload.room_number.clone()))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(ApiError::bad_request("Room number already exists"));
    }

    let created = room::ActiveModel {
        room_number: Set(payload.room_number),
        room_name: Set(payload.room_name),
        floor: Set(payload.floor),
        capacity: Set(payload.capacity),
        is_occupied: Set(payload.is_occupied),
        notes: Set(payload.notes),
        created_at: Set(OffsetDateTime::now_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(room_id = created.id, "room created");
    Ok((StatusCode::CREATED, Json(RoomDto::load(db, created).await?)))
}

/// Update a room.
#[tracing::instrument(skip(resources, auth, payload), fields(caller = %auth.username))]
#[utoipa::path(
    put,
    path = "/{id}",
    tag = ROOMS_TAG,
    operation_id = "Update Room",
    summary = "Update a room",
    description = "**Authorization:** Admin only.",
    params(("id" = i32, Path, description = "Room id")),
    security(("Authorization" = [])),
    request_body(content = UpdateRoomRequest, description = "Fields to change"),
    responses(
        (status = 200, description = "The updated room", body = RoomDto),
        (status = 400, description = "Room number already exists", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 404, description = "No such room", body = ApiError),
    )
)]
async fn update_room(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRoomRequest>,
) -> Result<Json<RoomDto>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let db = resources.db.as_ref();
    let found = room::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Room with ID {id} not found")))?;

    if let Some(room_number) = &payload.room_number {
        let taken = room::Entity::find()
            .filter(room::Column::RoomNumber.eq(room_number.clone()))
            .filter(room::Column::Id.ne(id))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(ApiError::bad_request("Room number already exists"));
        }
    }

    let mut model: room::ActiveModel = found.into();
    if let Some(room_number) = payload.room_number {
        model.room_number = Set(room_number);
    }
    if let Some(room_name) = payload.room_name {
        model.room_name = Set(room_name);
    }
    if let Some(floor) = payload.floor {
        model.floor = Set(floor);
    }
    if let Some(capacity) = payload.capacity {
        model.capacity = Set(capacity);
    }
    if let Some(is_occupied) = payload.is_occupied {
        model.is_occupied = Set(is_occupied);
    }
    if let Some(notes) = payload.notes {
        model.notes = Set(notes);
    }

    let updated = model.update(db).await?;
    Ok(Json(RoomDto::load(db, updated).await?))
}

/// Delete a room.
#[tracing::instrument(skip(resources, auth), fields(caller = %auth.username))]
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = ROOMS_TAG,
    operation_id = "Delete Room",
    summary = "Delete a room",
    description = "Deletes the room along with its readings and alerts. \
                   Residents assigned to it are unassigned, not deleted.\n\n\
                   **Authorization:** Admin only.",
    params(("id" = i32, Path, description = "Room id")),
    security(("Authorization" = [])),
    responses(
        (status = 204, description = "Room deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 404, description = "No such room", body = ApiError),
    )
)]
async fn delete_room(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let db = resources.db.as_ref();
    let found = room::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Room with ID {id} not found")))?;

    found.delete(db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let req: UpdateRoomRequest = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(req.notes, Some(None));
        assert_eq!(req.room_name, None);

        let req: UpdateRoomRequest =
            serde_json::from_str(r#"{"roomName": "Sunflower"}"#).unwrap();
        assert_eq!(req.room_name, Some(Some("Sunflower".to_string())));
        assert_eq!(req.notes, None);
    }

    #[test]
    fn create_request_fills_floor_and_capacity_defaults() {
        let req: CreateRoomRequest =
            serde_json::from_str(r#"{"roomNumber": "101"}"#).unwrap();
        assert_eq!(req.floor, "Ground");
        assert_eq!(req.capacity, 1);
        assert!(!req.is_occupied);
    }
}
