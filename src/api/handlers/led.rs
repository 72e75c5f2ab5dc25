use super::{ErrorBody, StatusMessage};
use crate::{bus::Publisher, gateway::error_response};
use axum::{
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

/// Topic LED commands are published on.
#[derive(Clone, Debug)]
pub struct LedTopic(pub String);

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LedRequest {
    status: bool,
}

fn payload(status: bool) -> &'static str {
    if status { "on" } else { "off" }
}

#[utoipa::path(
    post,
    path = "/cmd/led",
    request_body = LedRequest,
    responses(
        (status = 200, description = "Command published", body = StatusMessage),
        (status = 400, description = "Body is not `{\"status\": bool}`", body = ErrorBody),
        (status = 502, description = "Actuator bus rejected the command", body = ErrorBody),
    ),
    security(("basic_auth" = [])),
    tag = "cmd"
)]
pub async fn set_led(
    Extension(publisher): Extension<Arc<dyn Publisher>>,
    Extension(topic): Extension<LedTopic>,
    body: Result<Json<LedRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            info!("Rejected LED request body: {rejection}");
            return error_response(StatusCode::BAD_REQUEST, "invalid request body");
        }
    };

    let command = payload(request.status);
    match publisher.publish(&topic.0, command).await {
        Ok(()) => Json(StatusMessage::ok()).into_response(),
        Err(err) => {
            error!("Failed to publish LED command: {err}");
            error_response(StatusCode::BAD_GATEWAY, "actuator unavailable")
        }
    }
}
