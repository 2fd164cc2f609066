//! Login and registration endpoints.
//!
//! - `POST /login` - Exchange credentials for a bearer token
//! - `POST /register` - Create a new staff account

use crate::AppResources;
use crate::api::users::UserDto;
use crate::auth::{jwt, password};
use crate::entity::user::{self, Role};
use crate::error::ApiError;
use axum::{Extension, Json};
use hyper::StatusCode;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const AUTH_TAG: &str = "Authentication";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login: the signed token plus the account it belongs to.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

/// Creates the auth API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(register))
}

/// Exchange username and password for a bearer token.
#[tracing::instrument(skip(resources, payload), fields(username = %payload.username))]
#[utoipa::path(
    post,
    path = "/login",
    tag = AUTH_TAG,
    operation_id = "Login",
    summary = "Exchange credentials for a bearer token",
    description = "Verifies the username/password pair and returns a signed JWT \
                   valid for the configured lifetime. Deactivated accounts are \
                   rejected with the same message as wrong credentials.",
    request_body(content = LoginRequest, description = "Credentials"),
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid username or password", body = ApiError),
    )
)]
async fn login(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let found = user::Entity::find()
        .filter(user::Column::Username.eq(payload.username.clone()))
        .one(resources.db.as_ref())
        .await?;

    // One rejection path for unknown users, wrong passwords and deactivated
    // accounts, so the response does not leak which one it was.
    let rejected = || ApiError::invalid_token("Invalid username or password");

    let Some(account) = found else {
        return Err(rejected());
    };
    if !account.is_active || !password::verify_password(&payload.password, &account.password_hash) {
        return Err(rejected());
    }

    let token = jwt::issue_token(&account, &resources.config.jwt).map_err(|e| {
        tracing::error!(error = ?e, "token issuance failed");
        ApiError::server_error()
    })?;

    tracing::info!(user_id = account.id, "login succeeded");
    Ok(Json(LoginResponse {
        token,
        user: account.into(),
    }))
}

/// Create a new staff account.
#[tracing::instrument(skip(resources, payload), fields(username = %payload.username))]
#[utoipa::path(
    post,
    path = "/register",
    tag = AUTH_TAG,
    operation_id = "Register",
    summary = "Create a new staff account",
    description = "Registers a staff account with the given role. Usernames and \
                   email addresses must be unique.",
    request_body(content = RegisterRequest, description = "Account details"),
    responses(
        (status = 201, description = "Account created", body = UserDto),
        (status = 400, description = "Username or email already taken", body = ApiError),
    )
)]
async fn register(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let db = resources.db.as_ref();

    let username_taken = user::Entity::find()
        .filter(user::Column::Username.eq(payload.username.clone()))
        .one(db)
        .await?;
    if username_taken.is_some() {
        return Err(ApiError::bad_request("Username already exists"));
    }

    let email_taken = user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.clone()))
        .one(db)
        .await?;
    if email_taken.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let hash = password::hash_password(&payload.password).map_err(|e| {
        tracing::error!(error = ?e, "password hashing failed");
        ApiError::server_error()
    })?;

    let created = user::ActiveModel {
        username: Set(payload.username),
        password_hash: Set(hash),
        full_name: Set(payload.full_name),
        email: Set(payload.email),
        role: Set(payload.role),
        created_at: Set(OffsetDateTime::now_utc()),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = created.id, "account registered");
    Ok((StatusCode::CREATED, Json(created.into())))
}
