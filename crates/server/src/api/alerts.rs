//! Alert endpoints.
//!
//! - `GET /` - List all alerts, newest first
//! - `GET /active` - Unresolved alerts
//! - `GET /{id}` - Fetch one alert
//! - `GET /room/{room_id}` - Alerts for a room
//! - `GET /severity/{severity}` - Alerts of a given severity
//! - `POST /` - Raise an alert manually
//! - `POST /{id}/resolve` - Resolve an alert, exactly once
//! - `PUT /{id}` - Update an alert
//! - `DELETE /{id}` - Delete an alert (admin only)

use crate::AppResources;
use crate::auth::AuthUser;
use crate::entity::alert::{self, AlertType, Severity};
use crate::entity::user::Role;
use crate::entity::{room, user};
use crate::error::ApiError;
use crate::monitor;
use axum::{Extension, Json, extract::Path};
use hyper::StatusCode;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const ALERTS_TAG: &str = "Alerts";

/// Alert as exposed through the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertDto {
    pub id: i32,
    pub room_id: i32,
    pub room_number: Option<String>,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub created_at: OffsetDateTime,
    pub is_resolved: bool,
    pub resolved_at: Option<OffsetDateTime>,
    pub resolved_by_user_id: Option<i32>,
    pub resolved_by_username: Option<String>,
    pub resolution_notes: Option<String>,
}

impl AlertDto {
    pub fn new(
        alert: alert::Model,
        room_number: Option<String>,
        resolved_by_username: Option<String>,
    ) -> Self {
        Self {
            id: alert.id,
            room_id: alert.room_id,
            room_number,
            alert_type: alert.alert_type,
            severity: alert.severity,
            message: alert.message,
            created_at: alert.created_at,
            is_resolved: alert.is_resolved,
            resolved_at: alert.resolved_at,
            resolved_by_user_id: alert.resolved_by_user_id,
            resolved_by_username,
            resolution_notes: alert.resolution_notes,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    pub room_id: i32,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAlertRequest {
    /// Account that resolved the alert.
    pub user_id: i32,
    pub resolution_notes: Option<String>,
}

/// Request to update an alert. Absent fields keep their current value.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertRequest {
    pub alert_type: Option<AlertType>,
    pub severity: Option<Severity>,
    pub message: Option<String>,
}

/// Creates the alerts API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_alerts, create_alert))
        .routes(routes!(active_alerts))
        .routes(routes!(get_alert, update_alert, delete_alert))
        .routes(routes!(resolve_alert))
        .routes(routes!(alerts_for_room))
        .routes(routes!(alerts_by_severity))
}

/// List all alerts, newest first.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "",
    tag = ALERTS_TAG,
    operation_id = "List Alerts",
    summary = "List all alerts, newest first",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "List of alerts", body = Vec<AlertDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn list_alerts(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
) -> Result<Json<Vec<AlertDto>>, ApiError> {
    let db = resources.db.as_ref();
    let rows = alert::Entity::find()
        .find_also_related(room::Entity)
        .order_by_desc(alert::Column::CreatedAt)
        .all(db)
        .await?;
    let usernames =
        monitor::resolver_usernames(db, rows.iter().filter_map(|(a, _)| a.resolved_by_user_id))
            .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(a, room)| {
                let username = a.resolved_by_user_id.and_then(|id| usernames.get(&id).cloned());
                AlertDto::new(a, room.map(|r| r.room_number), username)
            })
            .collect(),
    ))
}

/// Unresolved alerts, newest first.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/active",
    tag = ALERTS_TAG,
    operation_id = "List Active Alerts",
    summary = "Unresolved alerts, newest first",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Unresolved alerts", body = Vec<AlertDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn active_alerts(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
) -> Result<Json<Vec<AlertDto>>, ApiError> {
    let rows = alert::Entity::find()
        .filter(alert::Column::IsResolved.eq(false))
        .find_also_related(room::Entity)
        .order_by_desc(alert::Column::CreatedAt)
        .all(resources.db.as_ref())
        .await?;
    Ok(Json(
        rows.into_iter()
            .map(|(a, room)| AlertDto::new(a, room.map(|r| r.room_number), None))
            .collect(),
    ))
}

/// Fetch one alert by id.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/{id}",
    tag = ALERTS_TAG,
    operation_id = "Get Alert",
    summary = "Fetch one alert",
    params(("id" = i32, Path, description = "Alert id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "The alert", body = AlertDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such alert", body = ApiError),
    )
)]
async fn get_alert(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<AlertDto>, ApiError> {
    let db = resources.db.as_ref();
    let (found, room) = alert::Entity::find_by_id(id)
        .find_also_related(room::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Alert with ID {id} not found")))?;

    let username = match found.resolved_by_user_id {
        Some(user_id) => user::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .map(|u| u.username),
        None => None,
    };
    Ok(Json(AlertDto::new(
        found,
        room.map(|r| r.room_number),
        username,
    )))
}

/// Alerts for a room, newest first.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/room/{room_id}",
    tag = ALERTS_TAG,
    operation_id = "List Alerts For Room",
    summary = "Alerts for a room, newest first",
    params(("room_id" = i32, Path, description = "Room id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Alerts for the room", body = Vec<AlertDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such room", body = ApiError),
    )
)]
async fn alerts_for_room(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(room_id): Path<i32>,
) -> Result<Json<Vec<AlertDto>>, ApiError> {
    let db = resources.db.as_ref();
    let room = room::Entity::find_by_id(room_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Room with ID {room_id} not found")))?;

    let alerts = alert::Entity::find()
        .filter(alert::Column::RoomId.eq(room_id))
        .order_by_desc(alert::Column::CreatedAt)
        .all(db)
        .await?;
    let usernames =
        monitor::resolver_usernames(db, alerts.iter().filter_map(|a| a.resolved_by_user_id))
            .await?;

    Ok(Json(
        alerts
            .into_iter()
            .map(|a| {
                let username = a.resolved_by_user_id.and_then(|id| usernames.get(&id).cloned());
                AlertDto::new(a, Some(room.room_number.clone()), username)
            })
            .collect(),
    ))
}

/// Alerts of a given severity, newest first.
#[tracing::instrument(skip(resources, _auth))]
#[utoipa::path(
    get,
    path = "/severity/{severity}",
    tag = ALERTS_TAG,
    operation_id = "List Alerts By Severity",
    summary = "Alerts of a given severity",
    description = "Severity is one of `Low`, `Medium` or `Critical`. Anything \
                   else is rejected.",
    params(("severity" = Severity, Path, description = "Severity level")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Alerts with that severity", body = Vec<AlertDto>),
        (status = 400, description = "Unknown severity level", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn alerts_by_severity(
    Extension(resources): Extension<AppResources>,
    AuthUser(_auth): AuthUser,
    Path(severity): Path<Severity>,
) -> Result<Json<Vec<AlertDto>>, ApiError> {
    let db = resources.db.as_ref();
    let rows = alert::Entity::find()
        .filter(alert::Column::Severity.eq(severity))
        .find_also_related(room::Entity)
        .order_by_desc(alert::Column::CreatedAt)
        .all(db)
        .await?;
    let usernames =
        monitor::resolver_usernames(db, rows.iter().filter_map(|(a, _)| a.resolved_by_user_id))
            .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(a, room)| {
                let username = a.resolved_by_user_id.and_then(|id| usernames.get(&id).cloned());
                AlertDto::new(a, room.map(|r| r.room_number), username)
            })
            .collect(),
    ))
}

/// Raise an alert manually.
#[tracing::instrument(skip(resources, auth, payload), fields(caller = %auth.username, room_id = payload.room_id))]
#[utoipa::path(
    post,
    path = "",
    tag = ALERTS_TAG,
    operation_id = "Create Alert",
    summary = "Raise an alert manually",
    description = "For conditions the sensors cannot see, such as a resident \
                   reporting a draft. Any authenticated staff member may raise \
                   one.",
    security(("Authorization" = [])),
    request_body(content = CreateAlertRequest, description = "Alert details"),
    responses(
        (status = 201, description = "Alert created", body = AlertDto),
        (status = 400, description = "Room does not exist", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    )
)]
async fn create_alert(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Json(payload): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<AlertDto>), ApiError> {
    let db = resources.db.as_ref();
    let room = room::Entity::find_by_id(payload.room_id).one(db).await?;
    let Some(room) = room else {
        return Err(ApiError::bad_request(format!(
            "Room with ID {} does not exist",
            payload.room_id
        )));
    };

    let created = alert::ActiveModel {
        room_id: Set(payload.room_id),
        alert_type: Set(payload.alert_type),
        severity: Set(payload.severity),
        message: Set(payload.message),
        created_at: Set(OffsetDateTime::now_utc()),
        is_resolved: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(alert_id = created.id, caller = %auth.username, "manual alert raised");
    Ok((
        StatusCode::CREATED,
        Json(AlertDto::new(created, Some(room.room_number), None)),
    ))
}

/// Resolve an alert.
#[tracing::instrument(skip(resources, auth, payload), fields(caller = %auth.username))]
#[utoipa::path(
    post,
    path = "/{id}/resolve",
    tag = ALERTS_TAG,
    operation_id = "Resolve Alert",
    summary = "Resolve an alert, exactly once",
    description = "Marks the alert resolved, recording who resolved it and \
                   when. Resolving an already-resolved alert is rejected so \
                   the original resolution record is never overwritten.",
    params(("id" = i32, Path, description = "Alert id")),
    security(("Authorization" = [])),
    request_body(content = ResolveAlertRequest, description = "Resolution details"),
    responses(
        (status = 200, description = "The resolved alert", body = AlertDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such alert or resolving user", body = ApiError),
        (status = 409, description = "Alert already resolved", body = ApiError),
    )
)]
async fn resolve_alert(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ResolveAlertRequest>,
) -> Result<Json<AlertDto>, ApiError> {
    let db = resources.db.as_ref();
    let resolved =
        monitor::resolve_alert(db, id, payload.user_id, payload.resolution_notes).await?;

    let room_number = room::Entity::find_by_id(resolved.room_id)
        .one(db)
        .await?
        .map(|r| r.room_number);
    let username = user::Entity::find_by_id(payload.user_id)
        .one(db)
        .await?
        .map(|u| u.username);

    tracing::info!(alert_id = id, caller = %auth.username, "alert resolved via API");
    Ok(Json(AlertDto::new(resolved, room_number, username)))
}

/// Update an alert.
#[tracing::instrument(skip(resources, auth, payload), fields(caller = %auth.username))]
#[utoipa::path(
    put,
    path = "/{id}",
    tag = ALERTS_TAG,
    operation_id = "Update Alert",
    summary = "Update an alert",
    description = "Edits the descriptive fields of an alert. Resolution state \
                   can only change through the resolve endpoint.",
    params(("id" = i32, Path, description = "Alert id")),
    security(("Authorization" = [])),
    request_body(content = UpdateAlertRequest, description = "Fields to change"),
    responses(
        (status = 200, description = "The updated alert", body = AlertDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such alert", body = ApiError),
    )
)]
async fn update_alert(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAlertRequest>,
) -> Result<Json<AlertDto>, ApiError> {
    let db = resources.db.as_ref();
    let found = alert::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Alert with ID {id} not found")))?;

    let mut model: alert::ActiveModel = found.into();
    if let Some(alert_type) = payload.alert_type {
        model.alert_type = Set(alert_type);
    }
    if let Some(severity) = payload.severity {
        model.severity = Set(severity);
    }
    if let Some(message) = payload.message {
        model.message = Set(message);
    }
    let updated = model.update(db).await?;

    let room_number = room::Entity::find_by_id(updated.room_id)
        .one(db)
        .await?
        .map(|r| r.room_number);
    Ok(Json(AlertDto::new(updated, room_number, None)))
}

/// Delete an alert.
#[tracing::instrument(skip(resources, auth), fields(caller = %auth.username))]
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = ALERTS_TAG,
    operation_id = "Delete Alert",
    summary = "Delete an alert",
    description = "**Authorization:** Admin only.",
    params(("id" = i32, Path, description = "Alert id")),
    security(("Authorization" = [])),
    responses(
        (status = 204, description = "Alert deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 404, description = "No such alert", body = ApiError),
    )
)]
async fn delete_alert(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let db = resources.db.as_ref();
    let found = alert::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Alert with ID {id} not found")))?;

    found.delete(db).await?;
    Ok(StatusCode::NO_CONTENT)
}
