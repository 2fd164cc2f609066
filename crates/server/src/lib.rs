//! Care home monitoring service.
//!
//! REST API for managing rooms, residents, environmental sensor readings,
//! alerts and staff accounts in an elderly care home. Readings that fall
//! outside the acceptable temperature/humidity bands raise alerts which
//! staff resolve through the API.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

pub mod api;
pub mod auth;
pub mod config;
pub mod entity;
pub mod error;
pub mod monitor;

/// Shared handles every request needs, attached as an axum Extension.
#[derive(Clone, Debug)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
}
