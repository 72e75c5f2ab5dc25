//! Authentication gateway for protected routes.
//!
//! Flow Overview:
//! 1) Resolve the caller origin from the peer address (400 if impossible).
//! 2) Refuse blocked origins before touching the credentials (403).
//! 3) Decode `Authorization: Basic` and check field syntax (400, not counted).
//! 4) Verify the password digest against the store (403 and one lockout
//!    failure for the origin on mismatch, 500 on lookup errors).
//! 5) Forward to the wrapped handler with an [`AuthenticatedUser`] extension.

pub mod credentials;
mod error;
pub mod lockout;
pub mod origin;
pub mod verifier;

#[cfg(test)]
mod tests;

pub use credentials::{Credential, decode_basic};
pub use error::{GatewayError, error_response};
pub use lockout::{
    DEFAULT_LOCKOUT_COOLDOWN, DEFAULT_LOCKOUT_THRESHOLD, LockoutEntry, LockoutTracker,
    MAX_LOCKOUT_COOLDOWN,
};
pub use origin::{ClientIdentity, resolve_origin};
pub use verifier::{CredentialVerifier, digest_password};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{Instrument, debug, info_span, warn};

use crate::store::UserStore;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    lockout_threshold: u32,
    lockout_cooldown: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_cooldown: DEFAULT_LOCKOUT_COOLDOWN,
        }
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: u32) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lockout_cooldown(mut self, cooldown: Duration) -> Self {
        self.lockout_cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn lockout_threshold(&self) -> u32 {
        self.lockout_threshold
    }

    #[must_use]
    pub fn lockout_cooldown(&self) -> Duration {
        self.lockout_cooldown
    }
}

/// Inserted into request extensions once the gateway forwards a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub origin: ClientIdentity,
}

pub struct AuthGateway {
    lockout: Arc<LockoutTracker>,
    verifier: CredentialVerifier,
}

impl AuthGateway {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, lockout: Arc<LockoutTracker>) -> Self {
        Self {
            lockout,
            verifier: CredentialVerifier::new(users),
        }
    }

    #[must_use]
    pub fn from_config(users: Arc<dyn UserStore>, config: &GatewayConfig) -> Self {
        Self::new(
            users,
            Arc::new(LockoutTracker::new(
                config.lockout_threshold(),
                config.lockout_cooldown(),
            )),
        )
    }

    #[must_use]
    pub fn lockout(&self) -> &Arc<LockoutTracker> {
        &self.lockout
    }

    /// Run one request through the gateway.
    ///
    /// `peer` is the raw peer address (`host:port`), `authorization` the raw header value.
    ///
    /// # Errors
    /// Any [`GatewayError`]; `UnknownUser` and `BadPassword` have already been
    /// recorded against the origin when returned.
    pub async fn authenticate(
        &self,
        peer: Option<&str>,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedUser, GatewayError> {
        let origin = resolve_origin(peer)?;

        if self.lockout.is_blocked(origin.as_str()) {
            return Err(GatewayError::OriginBlocked);
        }

        let credential = decode_basic(authorization)?;

        match self.verifier.verify(&credential).await {
            Ok(username) => Ok(AuthenticatedUser { username, origin }),
            Err(err) => {
                if err.counts_as_attempt() {
                    let failures = self.lockout.record_failure(origin.as_str());
                    warn!(
                        origin = %origin,
                        failures,
                        threshold = self.lockout.threshold(),
                        "credential verification failed"
                    );
                }
                Err(err)
            }
        }
    }
}

/// axum middleware guarding every route layered below it.
///
/// The peer address comes from `ConnectInfo<SocketAddr>`, so the app must be
/// served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub async fn require_auth(
    State(gateway): State<Arc<AuthGateway>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let span = info_span!("auth.gateway", peer = peer.as_deref().unwrap_or("none"));
    let verdict = gateway
        .authenticate(peer.as_deref(), authorization.as_deref())
        .instrument(span)
        .await;

    match verdict {
        Ok(user) => {
            debug!(user = %user.username, origin = %user.origin, "request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => {
            match &err {
                GatewayError::OriginBlocked => {
                    warn!(peer = peer.as_deref().unwrap_or("none"), "blocked origin rejected");
                }
                // Already logged where they happened.
                GatewayError::LookupError(_)
                | GatewayError::UnknownUser
                | GatewayError::BadPassword => {}
                other => debug!(reason = %other, "request rejected"),
            }
            err.into_response()
        }
    }
}
