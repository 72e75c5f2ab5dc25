use super::{ErrorBody, MSG_INTERNAL, TemperatureMessage, TemperaturesMessage};
use crate::gateway::error_response;
use crate::store::{RECENT_TEMPERATURES, SensorStore};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

#[utoipa::path(
    get,
    path = "/cmd/temp",
    responses(
        (status = 200, description = "Latest temperature reading", body = TemperatureMessage),
        (status = 404, description = "No reading recorded yet", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    security(("basic_auth" = [])),
    tag = "cmd"
)]
pub async fn latest(Extension(sensors): Extension<Arc<dyn SensorStore>>) -> Response {
    match sensors.latest_temperature().await {
        Ok(Some(reading)) => Json(TemperatureMessage {
            message: reading.value,
        })
        .into_response(),
        Ok(None) => {
            debug!("No temperature reading recorded");
            error_response(StatusCode::NOT_FOUND, "no temperature reading")
        }
        Err(err) => {
            error!("Failed to read latest temperature: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
        }
    }
}

#[utoipa::path(
    get,
    path = "/cmd/temps",
    responses(
        (status = 200, description = "Up to 60 readings, newest first", body = TemperaturesMessage),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    security(("basic_auth" = [])),
    tag = "cmd"
)]
pub async fn recent(Extension(sensors): Extension<Arc<dyn SensorStore>>) -> Response {
    match sensors.recent_temperatures(RECENT_TEMPERATURES).await {
        Ok(readings) => {
            let message = readings.iter().map(|reading| reading.value).collect();
            Json(TemperaturesMessage { message }).into_response()
        }
        Err(err) => {
            error!("Failed to read recent temperatures: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
        }
    }
}
