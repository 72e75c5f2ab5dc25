use super::{ErrorBody, StatusMessage};
use crate::gateway::AuthenticatedUser;
use axum::{extract::Extension, response::Json};
use tracing::debug;

#[utoipa::path(
    post,
    path = "/cmd/auth",
    responses(
        (status = 200, description = "Credentials accepted", body = StatusMessage),
        (status = 400, description = "Malformed authorization header or unknown origin", body = ErrorBody),
        (status = 403, description = "Bad credentials or blocked origin", body = ErrorBody),
    ),
    security(("basic_auth" = [])),
    tag = "cmd"
)]
// axum handler for the credential check
pub async fn check_credentials(Extension(user): Extension<AuthenticatedUser>) -> Json<StatusMessage> {
    debug!(user = %user.username, "credential check");
    Json(StatusMessage::ok())
}
