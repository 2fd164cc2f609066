//! Staff account management endpoints.
//!
//! - `GET /` - List all accounts (admin only)
//! - `GET /{id}` - Fetch one account
//! - `PUT /{id}` - Update an account (admin, or the account holder)
//! - `DELETE /{id}` - Delete an account (admin only)

use crate::AppResources;
use crate::auth::{AuthUser, password};
use crate::entity::user::{self, Role};
use crate::error::ApiError;
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
pub const USERS_TAG: &str = "Users";

/// Staff account as exposed through the API. The password hash never leaves
/// the database layer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub is_active: bool,
}

impl From<user::Model> for UserDto {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            is_active: user.is_active,
        }
    }
}

/// Request to update an account. Absent fields keep their current value.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    /// New password in clear text; hashed before storage.
    pub password: Option<String>,
    /// Only admins may change roles.
    pub role: Option<Role>,
    /// Only admins may deactivate or reactivate accounts.
    pub is_active: Option<bool>,
}

/// Creates the users API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_users))
        .routes(routes!(get_user, update_user, delete_user))
}

/// List all staff accounts.
#[tracing::instrument(skip(resources, auth), fields(caller = %auth.username))]
#[utoipa::path(
    get,
    path = "",
    tag = USERS_TAG,
    operation_id = "List Users",
    summary = "List all staff accounts",
    description = "Returns every staff account, newest first.\n\n\
                   **Authorization:** Admin only.",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "List of accounts", body = Vec<UserDto>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
    )
)]
async fn list_users(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let users = user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .all(resources.db.as_ref())
        .await?;

    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// Fetch one staff account by id.
#[tracing::instrument(skip(resources, auth), fields(caller = %auth.username))]
#[utoipa::path(
    get,
    path = "/{id}",
    tag = USERS_TAG,
    operation_id = "Get User",
    summary = "Fetch one staff account",
    params(("id" = i32, Path, description = "Account id")),
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "The account", body = UserDto),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No such account", body = ApiError),
    )
)]
async fn get_user(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<UserDto>, ApiError> {
    let found = user::Entity::find_by_id(id)
        .one(resources.db.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User with ID {id} not found")))?;

    Ok(Json(found.into()))
}

/// Update a staff account.
#[tracing::instrument(skip(resources, auth, payload), fields(caller = %auth.username))]
#[utoipa::path(
    put,
    path = "/{id}",
    tag = USERS_TAG,
    operation_id = "Update User",
    summary = "Update a staff account",
    description = "Admins may update any account. Other users may only update \
                   their own, and may not change their role or active flag.",
    params(("id" = i32, Path, description = "Account id")),
    security(("Authorization" = [])),
    request_body(content = UpdateUserRequest, description = "Fields to change"),
    responses(
        (status = 200, description = "The updated account", body = UserDto),
        (status = 400, description = "Email already in use", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not allowed to edit this account", body = ApiError),
        (status = 404, description = "No such account", body = ApiError),
    )
)]
async fn update_user(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserDto>, ApiError> {
    if !auth.is_admin() && auth.id != id {
        return Err(ApiError::forbidden("You can only update your own account"));
    }
    if !auth.is_admin() && (payload.role.is_some() || payload.is_active.is_some()) {
        return Err(ApiError::forbidden(
            "Only admins can change roles or deactivate accounts",
        ));
    }

    let db = resources.db.as_ref();
    let found = user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User with ID {id} not found")))?;

    if let Some(email) = &payload.email {
        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .filter(user::Column::Id.ne(id))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(ApiError::bad_request("Email already in use"));
        }
    }

    let mut model: user::ActiveModel = found.into();
    if let Some(full_name) = payload.full_name {
        model.full_name = Set(full_name);
    }
    if let Some(email) = payload.email {
        model.email = Set(email);
    }
    if let Some(password) = payload.password {
        let hash = password::hash_password(&password).map_err(|e| {
            tracing::error!(error = ?e, "password hashing failed");
            ApiError::server_error()
        })?;
        model.password_hash = Set(hash);
    }
    if let Some(role) = payload.role {
        model.role = Set(role);
    }
    if let Some(is_active) = payload.is_active {
        model.is_active = Set(is_active);
    }

    let updated = model.update(db).await?;
    Ok(Json(updated.into()))
}

/// Delete a staff account.
#[tracing::instrument(skip(resources, auth), fields(caller = %auth.username))]
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = USERS_TAG,
    operation_id = "Delete User",
    summary = "Delete a staff account",
    description = "Removes the account. Alerts the user resolved keep their \
                   record but lose the resolver reference.\n\n\
                   **Authorization:** Admin only.",
    params(("id" = i32, Path, description = "Account id")),
    security(("Authorization" = [])),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 404, description = "No such account", body = ApiError),
    )
)]
async fn delete_user(
    Extension(resources): Extension<AppResources>,
    AuthUser(auth): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let db = resources.db.as_ref();
    let found = user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User with ID {id} not found")))?;

    found.delete(db).await?;
    Ok(StatusCode::NO_CONTENT)
}
