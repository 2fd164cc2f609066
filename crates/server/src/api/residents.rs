//! Resident management endpoints.
//!
//! - `GET /` - List all residents
//! - `GET /active` - Residents currently in care
//! - `GET /{id}` - Fetch one resident
//! - `GET /room/{room_id}` - Residents assigned to a room
//! - `POST /` - Admit a resident (admin or nurse)
//! - `PUT /{id}` - Update a resident (admin or nurse)
//! - `DELETE /{id}` - Remove a resident record (admin or nurse)

use crate::AppResources;
use crate::auth::AuthUser;
use crate::entity::user::Role;
use crate::entity::{resident, room};
use crate::error::ApiError;
use axum::{Extension, Json, extract::Path};
use hyper::StatusCode;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const RESIDENTS_TAG: &str = "Residents";

/// Resident as exposed through the API, with the derived age and the room
/// number joined in.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResidentDto {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    /// Whole years, computed from the date of birth.
    pub age: i32,
    pub medical_conditions: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub admission_date: OffsetDateTime,
    pub is_active: bool,
    pub room_id: Option<i32>,
    pub room_number: Option<String>,
}

impl ResidentDto {
    pub fn new(resident: resident::Model, room_number: Option<String>) -> Self {
        let age = age_in_years(resident.date_of_birth, OffsetDateTime::now_utc().date());
        Self {
            id: resident.id,
            first_name: resident.first_name,
            last_name: resident.last_name,
            date_of_birth: resident.date_of_birth,
            age,
            medical_conditions: resident.medical_conditions,
            emergency_contact: resident.emergency_contact,
            emergency_phone: resident.emergency_phone,
            admission_date: resident.admission_date,
            is_active: resident.is_active,
            room_id: resident.room_id,
            room_number,
        }
    }
}

/// Whole years between `born` and `today`, counting birthdays.
fn age_in_years(born: Date, today: Date) -> i32 {
    let mut age = today.year() - born.year();
    if (today.month() as u8, today.day()) < (born.month() as u8, born.day()) {
        age -= 1;
    }
    age
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateResidentRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub medical_conditions: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub room_id: Option<i32>,
}

/// Request to update a resident. Absent fields keep their current value.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResidentRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub medical_conditions: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub is_active: Option<bool>,
    /// Pass `null` explicitly to unassign; absent leaves the room unchanged.
    #[serde(default, with = "crate::api::double_option")]
    pub room_id: Option<Option<i32>>,
}

/// Creates the residents API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_residents, create_resident))
        .routes(routes!(active_residents))
        .routes(routes!(get_resident, update_resident, delete_resident))
        .routes(routes!(residents_in_room))
}

fn dtos_with_rooms(rows: Vec<(resident::Model, Option<room::Model>)>) -> Vec<ResidentDto> {
    rows.into_iter()
        .map(|(r, room)| ResidentDto::new(r, room.map(|r| r.room_number)))
        .collect()
}

/// Check that an assignment target exists before writing it.
async fn ensure_room_exists(db: &DatabaseConnection, room_id: i32) -> Result<(), ApiError> {
    let found = room::Entity::find_by_id(room_id).one(db).await?;
    if found.is_none() {
        return Err(ApiError::bad_request(format!(
            "Room with ID {room_id} does not exist"
        )));
    }
    Ok(())
}

/// List all residents.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "",
    tag = RESIDENTS_TAG,
    operation_id = "List Residents",
    summary = "List all residents",
    description = "Returns every resident record, including past residents, \
                   ordered by last name.",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "List of residents", body = Vec<ResidentDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn list_residents(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
) -> Result<Json<Vec<ResidentDto>>, ApiError> {
    let db = resources.db.as_ref();
    let rows = resident::Entity::find()
        .find_also_related(room::Entity)
        .order_by_asc(resident::Column::LastName)
        .all(db)
        .await?;
    Ok(Json(dtos_with_rooms(rows)))
}

/// List residents currently in care.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/active",
    tag = RESIDENTS_TAG,
    operation_id = "List Active Residents",
    summary = "List residents currently in care",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Active residents", body = Vec<ResidentDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn active_residents(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
) -> Result<Json<Vec<ResidentDto>>, ApiError> {
    let db = resources.db.as_ref();
    let rows = resident::Entity::find()
        .filter(resident::Column::IsActive.eq(true))
        .find_also_related(room::Entity)
        .order_by_asc(resident::Column::LastName)
        .all(db)
        .await?;
    Ok(Json(dtos_with_rooms(rows)))
}

/// Fetch one resident by id.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/{id}",
    tag = RESIDENTS_TAG,
    operation_id = "Get Resident",
    summary = "Fetch one resident",
    params(("id" = i32, Path, description = "Resident id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "The resident", body = ResidentDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such resident", body = ApiError),
    )
)]
async fn get_resident(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ResidentDto>, ApiError> {
    let db = resources.db.as_ref();
    let row = resident::Entity::find_by_id(id)
        .find_also_related(room::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Resident with ID {id} not found")))?;
    Ok(Json(ResidentDto::new(
        row.0,
        row.1.map(|r| r.room_number),
    )))
}

/// Residents assigned to a room.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/room/{room_id}",
    tag = RESIDENTS_TAG,
    operation_id = "List Residents In Room",
    summary = "Residents assigned to a room",
    params(("room_id" = i32, Path, description = "Room id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Residents in the room", body = Vec<ResidentDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such room", body = ApiError),
    )
)]
async fn residents_in_room(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(room_id): Path<i32>,
) -> Result<Json<Vec<ResidentDto>>, ApiError> {
    let db = resources.db.as_ref();
    let room = room::Entity::find_by_id(room_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Room with ID {room_id} not found")))?;

    let residents = resident::Entity::find()
        .filter(resident::Column::RoomId.eq(room_id))
        .order_by_asc(resident::Column::LastName)
        .all(db)
        .await?
        .into_iter()
        .map(|r| ResidentDto::new(r, Some(room.room_number.clone())))
        .collect();
    Ok(Json(residents))
}

/// Admit a resident.
#[tracing::instrument(skip(resources, auth, payload), fields(caller = %auth.username))]
#[utoipa::path(
    post,
    path = "",
    tag = RESIDENTS_TAG,
    operation_id = "Create Resident",
    summary = "Admit a resident",
    description = "Creates a resident record with the admission date set to \
                   now.\n\n**Authorization:** Admin or Nurse.",
    security(("Authorization" = [])),
    request_body(content = CreateResidentRequest, description = "Resident details"),
    responses(
        (status = 201, description = "Resident created", body = ResidentDto),
        (status = 400, description = "Assigned room does not exist", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is a caretaker", body = ApiError),
    )
)]
async fn create_resident(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Json(payload): Json<CreateResidentRequest>,
) -> Result<(StatusCode, Json<ResidentDto>), ApiError> {
    auth.require_role(&[Role::Admin, Role::Nurse])?;

    let db = resources.db.as_ref();
    if let Some(room_id) = payload.room_id {
        ensure_room_exists(db, room_id).await?;
    }

    let created = resident::ActiveModel {
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        date_of_birth: Set(payload.date_of_birth),
        medical_conditions: Set(payload.medical_conditions),
        emergency_contact: Set(payload.emergency_contact),
        emergency_phone: Set(payload.emergency_phone),
        admission_date: Set(OffsetDateTime::now_utc()),
        is_active: Set(true),
        room_id: Set(payload.room_id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let room_number = match created.room_id {
        Some(room_id) => room::Entity::find_by_id(room_id)
            .one(db)
            .await?
            .map(|r| r.room_number),
        None => None,
    };

    tracing::info!(resident_id = created.id, "resident admitted");
    Ok((
        StatusCode::CREATED,
        Json(ResidentDto::new(created, room_number)),
    ))
}

/// Update a resident.
#[tracing::instrument(skip(resources, auth, payload), fields(caller = %auth.username))]
#[utoipa::path(
    put,
    path = "/{id}",
    tag = RESIDENTS_TAG,
    operation_id = "Update Resident",
    summary = "Update a resident",
    description = "**Authorization:** Admin or Nurse.",
    params(("id" = i32, Path, description = "Resident id")),
    security(("Authorization" = [])),
    request_body(content = UpdateResidentRequest, description = "Fields to change"),
    responses(
        (status = 200, description = "The updated resident", body = ResidentDto),
        (status = 400, description = "Assigned room does not exist", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is a caretaker", body = ApiError),
        (status = 404, description = "No such resident", body = ApiError),
    )
)]
async fn update_resident(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateResidentRequest>,
) -> Result<Json<ResidentDto>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Nurse])?;

    let db = resources.db.as_ref();
    let found = resident::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Resident with ID {id} not found")))?;

    if let Some(Some(room_id)) = payload.room_id {
        ensure_room_exists(db, room_id).await?;
    }

    let mut model: resident::ActiveModel = found.into();
    if let Some(first_name) = payload.first_name {
        model.first_name = Set(first_name);
    }
    if let Some(last_name) = payload.last_name {
        model.last_name = Set(last_name);
    }
    if let Some(date_of_birth) = payload.date_of_birth {
        model.date_of_birth = Set(date_of_birth);
    }
    if let Some(medical_conditions) = payload.medical_conditions {
        model.medical_conditions = Set(Some(medical_conditions));
    }
    if let Some(emergency_contact) = payload.emergency_contact {
        model.emergency_contact = Set(Some(emergency_contact));
    }
    if let Some(emergency_phone) = payload.emergency_phone {
        model.emergency_phone = Set(Some(emergency_phone));
    }
    if let Some(is_active) = payload.is_active {
        model.is_active = Set(is_active);
    }
    if let Some(room_id) = payload.room_id {
        model.room_id = Set(room_id);
    }

    let updated = model.update(db).await?;
    let room_number = match updated.room_id {
        Some(room_id) => room::Entity::find_by_id(room_id)
            .one(db)
            .await?
            .map(|r| r.room_number),
        None => None,
    };
    Ok(Json(ResidentDto::new(updated, room_number)))
}

/// Delete a resident record.
#[tracing::instrument(skip(resources, auth), fields(caller = %auth.username))]
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = RESIDENTS_TAG,
    operation_id = "Delete Resident",
    summary = "Delete a resident record",
    description = "**Authorization:** Admin or Nurse.",
    params(("id" = i32, Path, description = "Resident id")),
    security(("Authorization" = [])),
    responses(
        (status = 204, description = "Resident deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is a caretaker", body = ApiError),
        (status = 404, description = "No such resident", body = ApiError),
    )
)]
async fn delete_resident(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    auth.require_role(&[Role::Admin, Role::Nurse])?;

    let db = resources.db.as_ref();
    let found = resident::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Resident with ID {id} not found")))?;

    found.delete(db).await?;
    Ok(StatusCode::NO_CONTENT)
}
