use super::handlers::{
    ErrorBody, StatusMessage, TemperatureMessage, TemperaturesMessage, auth_check, health, led,
    temperature,
};
use utoipa::{
    Modify, OpenApi,
    openapi::{
        Tag,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";
pub const SWAGGER_UI_PATH: &str = "/swagger-ui";

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        temperature::latest,
        temperature::recent,
        led::set_led,
        auth_check::check_credentials,
    ),
    components(schemas(
        health::Health,
        led::LedRequest,
        StatusMessage,
        TemperatureMessage,
        TemperaturesMessage,
        ErrorBody,
    )),
    modifiers(&BasicAuth, &Tags)
)]
struct ApiDoc;

struct BasicAuth;

impl Modify for BasicAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "basic_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
            );
        }
    }
}

struct Tags;

impl Modify for Tags {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut health_tag = Tag::new("health");
        health_tag.description = Some("Liveness and build information".to_string());

        let mut cmd_tag = Tag::new("cmd");
        cmd_tag.description =
            Some("Sensor and actuator commands, HTTP Basic on every request".to_string());

        openapi.tags = Some(vec![health_tag, cmd_tag]);
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
