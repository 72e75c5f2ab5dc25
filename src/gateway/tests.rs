//! Gateway tests: direct `authenticate` calls and the axum middleware.

use super::*;
use crate::store::{MemoryStore, StoreError};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    middleware,
    routing::post,
};
use base64ct::{Base64, Encoding};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

const PEER: &str = "198.51.100.23:41000";
const ORIGIN: &str = "198.51.100.23";

fn basic(pair: &str) -> String {
    format!("Basic {}", Base64::encode_string(pair.as_bytes()))
}

async fn store_with_user() -> Result<Arc<MemoryStore>, StoreError> {
    let store = Arc::new(MemoryStore::new());
    store
        .create_user("validuser", &digest_password("correct-horse"))
        .await?;
    Ok(store)
}

async fn gateway_with(lockout: LockoutTracker) -> Result<(Arc<AuthGateway>, Arc<MemoryStore>)> {
    let store = store_with_user().await?;
    let gateway = Arc::new(AuthGateway::new(store.clone(), Arc::new(lockout)));
    Ok((gateway, store))
}

async fn gateway() -> Result<(Arc<AuthGateway>, Arc<MemoryStore>)> {
    gateway_with(LockoutTracker::default()).await
}

#[tokio::test]
async fn correct_credentials_pass_without_lockout_effect() -> Result<()> {
    let (gateway, _) = gateway().await?;
    let user = gateway
        .authenticate(Some(PEER), Some(&basic("validuser:correct-horse")))
        .await?;
    assert_eq!(user.username, "validuser");
    assert_eq!(user.origin.as_str(), ORIGIN);
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 0);
    Ok(())
}

#[tokio::test]
async fn short_username_is_rejected_without_lockout() -> Result<()> {
    let (gateway, store) = gateway().await?;
    let result = gateway
        .authenticate(Some(PEER), Some(&basic("ab:correct-horse")))
        .await;
    assert!(matches!(result, Err(GatewayError::InvalidCredentialFormat)));
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 0);
    assert_eq!(store.lookups(), 0);
    Ok(())
}

#[tokio::test]
async fn wrong_password_counts_one_failure() -> Result<()> {
    let (gateway, _) = gateway().await?;
    let result = gateway
        .authenticate(Some(PEER), Some(&basic("validuser:wrong-pass")))
        .await;
    assert!(matches!(result, Err(GatewayError::BadPassword)));
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_user_counts_against_origin_not_username() -> Result<()> {
    let (gateway, _) = gateway().await?;
    let result = gateway
        .authenticate(Some(PEER), Some(&basic("validuser2:whatever")))
        .await;
    assert!(matches!(result, Err(GatewayError::UnknownUser)));
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 1);
    assert_eq!(gateway.lockout().failure_count("validuser2"), 0);
    Ok(())
}

#[tokio::test]
async fn bare_scheme_is_missing_credentials() -> Result<()> {
    let (gateway, _) = gateway().await?;
    let result = gateway.authenticate(Some(PEER), Some("Basic")).await;
    assert!(matches!(result, Err(GatewayError::MissingCredentials)));
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_headers_never_touch_the_counter() -> Result<()> {
    let (gateway, _) = gateway().await?;
    let malformed = [
        None,
        Some("Bearer abc".to_string()),
        Some("Basic %%%".to_string()),
        Some(basic("no-separator")),
        Some(basic("validuser:with space")),
    ];
    for header in &malformed {
        let before = gateway.lockout().failure_count(ORIGIN);
        let result = gateway.authenticate(Some(PEER), header.as_deref()).await;
        assert!(result.is_err());
        assert_eq!(gateway.lockout().failure_count(ORIGIN), before);
    }
    assert_eq!(gateway.lockout().tracked_origins(), 0);
    Ok(())
}

#[tokio::test]
async fn unresolved_origin_short_circuits() -> Result<()> {
    let (gateway, store) = gateway().await?;
    for peer in [None, Some("no-port-here")] {
        let result = gateway
            .authenticate(peer, Some(&basic("validuser:wrong-pass")))
            .await;
        assert!(matches!(result, Err(GatewayError::UnresolvedOrigin)));
    }
    assert_eq!(store.lookups(), 0);
    assert_eq!(gateway.lockout().tracked_origins(), 0);
    Ok(())
}

#[tokio::test]
async fn fifth_attempt_is_blocked_even_with_correct_password() -> Result<()> {
    let (gateway, store) = gateway().await?;
    for _ in 0..4 {
        let result = gateway
            .authenticate(Some(PEER), Some(&basic("validuser:wrong-pass")))
            .await;
        assert!(matches!(result, Err(GatewayError::BadPassword)));
    }
    assert!(gateway.lockout().is_blocked(ORIGIN));
    let lookups = store.lookups();

    let result = gateway
        .authenticate(Some(PEER), Some(&basic("validuser:correct-horse")))
        .await;
    assert!(matches!(result, Err(GatewayError::OriginBlocked)));
    // Blocked requests are refused before any lookup and are not counted.
    assert_eq!(store.lookups(), lookups);
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 4);

    // Another origin is unaffected.
    let other = gateway
        .authenticate(Some("203.0.113.9:5000"), Some(&basic("validuser:correct-horse")))
        .await;
    assert!(other.is_ok());
    Ok(())
}

#[tokio::test]
async fn blocked_origin_is_refused_before_decoding() -> Result<()> {
    let (gateway, _) = gateway().await?;
    for _ in 0..4 {
        gateway.lockout().record_failure(ORIGIN);
    }
    let result = gateway.authenticate(Some(PEER), Some("garbage")).await;
    assert!(matches!(result, Err(GatewayError::OriginBlocked)));
    Ok(())
}

#[tokio::test]
async fn block_lifts_after_cooldown_and_count_restarts() -> Result<()> {
    let cooldown = Duration::from_millis(200);
    let (gateway, _) = gateway_with(LockoutTracker::new(4, cooldown)).await?;
    for _ in 0..4 {
        let _ = gateway
            .authenticate(Some(PEER), Some(&basic("validuser:wrong-pass")))
            .await;
    }
    assert!(gateway.lockout().is_blocked(ORIGIN));

    tokio::time::sleep(cooldown + Duration::from_millis(50)).await;

    assert!(!gateway.lockout().is_blocked(ORIGIN));
    let result = gateway
        .authenticate(Some(PEER), Some(&basic("validuser:wrong-pass")))
        .await;
    assert!(matches!(result, Err(GatewayError::BadPassword)));
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 1);
    Ok(())
}

#[tokio::test]
async fn lookup_error_is_not_an_attempt() -> Result<()> {
    let (gateway, store) = gateway().await?;
    store.set_unavailable(true);
    let result = gateway
        .authenticate(Some(PEER), Some(&basic("validuser:correct-horse")))
        .await;
    assert!(matches!(result, Err(GatewayError::LookupError(_))));
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_wrong_passwords_lose_no_updates() -> Result<()> {
    let (gateway, _) = gateway().await?;
    let header = basic("validuser:wrong-pass");

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            let header = header.clone();
            tokio::spawn(async move { gateway.authenticate(Some(PEER), Some(&header)).await })
        })
        .collect();

    let mut bad_password = 0_u32;
    let mut blocked = 0_u32;
    for task in tasks {
        match task.await.context("gateway task panicked")? {
            Err(GatewayError::BadPassword) => bad_password += 1,
            Err(GatewayError::OriginBlocked) => blocked += 1,
            other => anyhow::bail!("unexpected verdict: {other:?}"),
        }
    }

    let count = gateway.lockout().failure_count(ORIGIN);
    assert_eq!(bad_password + blocked, 10);
    // Every request that passed the block check was counted exactly once.
    assert_eq!(count, bad_password);
    assert!(count >= 4);
    assert!(gateway.lockout().is_blocked(ORIGIN));
    Ok(())
}

#[test]
fn config_builds_tracker() {
    let config = GatewayConfig::new()
        .with_lockout_threshold(2)
        .with_lockout_cooldown(Duration::from_secs(30));
    let gateway = AuthGateway::from_config(Arc::new(MemoryStore::new()), &config);
    assert_eq!(gateway.lockout().threshold(), 2);
    assert_eq!(gateway.lockout().cooldown(), Duration::from_secs(30));

    let defaults = GatewayConfig::default();
    assert_eq!(defaults.lockout_threshold(), 4);
    assert_eq!(defaults.lockout_cooldown(), Duration::from_secs(14 * 60));
}

// --- middleware ---

fn protected_app(gateway: Arc<AuthGateway>, hits: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/cmd/auth",
            post(move |Extension(user): Extension<AuthenticatedUser>| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    user.username
                }
            }),
        )
        .layer(middleware::from_fn_with_state(gateway, require_auth))
}

fn request(peer: Option<SocketAddr>, authorization: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("POST").uri("/cmd/auth");
    if let Some(addr) = peer {
        builder = builder.extension(ConnectInfo(addr));
    }
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    builder.body(Body::empty()).context("failed to build request")
}

async fn json_body(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn peer_addr() -> Result<SocketAddr> {
    PEER.parse().context("invalid test peer")
}

#[tokio::test]
async fn middleware_forwards_authenticated_requests_once() -> Result<()> {
    let (gateway, _) = gateway().await?;
    let hits = Arc::new(AtomicUsize::new(0));
    let app = protected_app(gateway.clone(), hits.clone());

    let response = app
        .oneshot(request(
            Some(peer_addr()?),
            Some(&basic("validuser:correct-horse")),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"validuser");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.lockout().tracked_origins(), 0);
    Ok(())
}

#[tokio::test]
async fn middleware_renders_generic_errors() -> Result<()> {
    let (gateway, _) = gateway().await?;
    let hits = Arc::new(AtomicUsize::new(0));

    let cases = [
        (None, Some(basic("validuser:correct-horse")), StatusCode::BAD_REQUEST, "unknown origin"),
        (Some(peer_addr()?), None, StatusCode::BAD_REQUEST, "malformed authorization header"),
        (Some(peer_addr()?), Some(basic("ab:secret")), StatusCode::BAD_REQUEST, "malformed authorization header"),
        (Some(peer_addr()?), Some(basic("validuser:wrong-pass")), StatusCode::FORBIDDEN, "bad user credentials"),
        (Some(peer_addr()?), Some(basic("nobody:wrong-pass")), StatusCode::FORBIDDEN, "bad user credentials"),
    ];

    for (peer, header, status, message) in cases {
        let app = protected_app(gateway.clone(), hits.clone());
        let response = app.oneshot(request(peer, header.as_deref())?).await?;
        assert_eq!(response.status(), status);
        assert_eq!(
            response
                .headers()
                .get("x-content-type-options")
                .and_then(|v| v.to_str().ok()),
            Some("nosniff")
        );
        let body = json_body(response).await?;
        assert_eq!(body["error"], message);
    }

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 2);
    Ok(())
}

#[tokio::test]
async fn middleware_blocks_after_threshold() -> Result<()> {
    let (gateway, _) = gateway().await?;
    let hits = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let app = protected_app(gateway.clone(), hits.clone());
        let response = app
            .oneshot(request(Some(peer_addr()?), Some(&basic("validuser:wrong-pass")))?)
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let app = protected_app(gateway.clone(), hits.clone());
    let response = app
        .oneshot(request(Some(peer_addr()?), Some(&basic("validuser:correct-horse")))?)
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await?["error"], "origin blocked");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn middleware_maps_lookup_failure_to_500() -> Result<()> {
    let (gateway, store) = gateway().await?;
    store.set_unavailable(true);
    let hits = Arc::new(AtomicUsize::new(0));
    let app = protected_app(gateway.clone(), hits.clone());
    let response = app
        .oneshot(request(Some(peer_addr()?), Some(&basic("validuser:correct-horse")))?)
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await?["error"], "internal server error");
    assert_eq!(gateway.lockout().failure_count(ORIGIN), 0);
    Ok(())
}
