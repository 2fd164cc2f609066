//! API module providing the HTTP endpoints of the care home monitor.
//!
//! This module is organized into submodules:
//! - `auth` - Login and registration (/api/auth/*)
//! - `users` - Staff account management (/api/users/*)
//! - `rooms` - Room management (/api/rooms/*)
//! - `residents` - Resident management (/api/residents/*)
//! - `sensor_data` - Reading ingestion and queries (/api/sensordata/*)
//! - `alerts` - Alert queries and resolution (/api/alerts/*)
//! - `health` - Health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod alerts;
pub mod auth;
pub mod health;
pub mod openapi;
pub mod residents;
pub mod rooms;
pub mod sensor_data;
pub mod users;

pub use alerts::ALERTS_TAG;
pub use auth::AUTH_TAG;
pub use health::MISC_TAG;
pub use residents::RESIDENTS_TAG;
pub use rooms::ROOMS_TAG;
pub use sensor_data::SENSORS_TAG;
pub use users::USERS_TAG;

use crate::AppResources;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Deserializer distinguishing an absent JSON field from an explicit `null`.
///
/// Update requests use this for nullable columns: an absent field keeps the
/// stored value, `null` clears it.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}
/// Starts the web server with all configured routes.
#[tracing::instrument(skip(app_resources))]
pub async fn start_webserver(app_resources: AppResources) -> color_eyre::Result<()> {
    let listen_addr = app_resources.config.listen_addr.clone();

    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/api/auth", auth::router())
        .nest("/api/users", users::router())
        .nest("/api/rooms", rooms::router())
        .nest("/api/residents", residents::router())
        .nest("/api/sensordata", sensor_data::router())
        .nest("/api/alerts", alerts::router())
        .routes(routes!(health::health))
        // Attach application resources, CORS (the dashboard is served from a
        // different origin) and the standard TraceLayer.
        .layer(axum::Extension(app_resources))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    let router = router.merge(Redoc::with_url("/api-docs", api));

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "care home monitor listening");
    axum::serve(listener, router)
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
