//! OpenAPI/Utoipa configuration.

use crate::api::{
    ALERTS_TAG, AUTH_TAG, MISC_TAG, RESIDENTS_TAG, ROOMS_TAG, SENSORS_TAG, USERS_TAG,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Security addon for OpenAPI documentation.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let bearer = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .description(Some(
                    "Use the JWT token obtained from the `/api/auth/login` endpoint to authenticate.",
                ))
                .build();
            components.add_security_scheme("Authorization", SecurityScheme::Http(bearer));
        }
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Elderly Care Home Monitoring API",
        version = "1.0.0",
        description = "REST API for managing elderly care home rooms, residents, environmental sensors, and alerts."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = AUTH_TAG, description = "Authentication endpoints"),
        (name = USERS_TAG, description = "Staff account endpoints"),
        (name = ROOMS_TAG, description = "Room endpoints"),
        (name = RESIDENTS_TAG, description = "Resident endpoints"),
        (name = SENSORS_TAG, description = "Sensor reading endpoints"),
        (name = ALERTS_TAG, description = "Alert endpoints")
    )
)]
pub struct ApiDoc;
