//! HTTP surface: public routes, gateway-protected `/cmd/*` routes and the
//! server bootstrap.

use crate::{
    api::handlers::{LedTopic, auth_check, health, led, root, temperature},
    bus::{BusError, Publisher, Subscriber},
    gateway::{AuthGateway, GatewayConfig, LockoutTracker, error_response, require_auth},
    store::{PgStore, SensorStore, UserStore},
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    },
    middleware,
    response::Response,
    routing::{get, post},
};
use sqlx::postgres::PgPoolOptions;
use std::{any::Any, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{Span, debug, error, info, info_span, warn};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use openapi::{OPENAPI_JSON_PATH, SWAGGER_UI_PATH, openapi};

/// How often expired lockout entries are dropped.
pub const LOCKOUT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Requests still running after this are answered with 408.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct ApiConfig {
    cors_origin: String,
    led_topic: String,
    temperature_topic: String,
    request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cors_origin: "http://localhost:3000".to_string(),
            led_topic: "led".to_string(),
            temperature_topic: "temperature".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = origin.into();
        self
    }

    #[must_use]
    pub fn with_led_topic(mut self, topic: impl Into<String>) -> Self {
        self.led_topic = topic.into();
        self
    }

    #[must_use]
    pub fn with_temperature_topic(mut self, topic: impl Into<String>) -> Self {
        self.temperature_topic = topic.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn cors_origin(&self) -> &str {
        &self.cors_origin
    }

    #[must_use]
    pub fn led_topic(&self) -> &str {
        &self.led_topic
    }

    #[must_use]
    pub fn temperature_topic(&self) -> &str {
        &self.temperature_topic
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Connect to Postgres, apply the schema, start temperature intake and serve
/// until ctrl-c.
///
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied,
/// the subscription fails, the CORS origin is invalid or the listener fails.
pub async fn new(
    port: u16,
    dsn: String,
    gateway_config: &GatewayConfig,
    api_config: &ApiConfig,
    publisher: Arc<dyn Publisher>,
    subscriber: Arc<dyn Subscriber>,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    store
        .ensure_schema()
        .await
        .context("Failed to apply database schema")?;

    let users: Arc<dyn UserStore> = store.clone();
    let gateway = Arc::new(AuthGateway::from_config(users, gateway_config));
    let sweeper = spawn_lockout_sweeper(gateway.lockout().clone(), LOCKOUT_SWEEP_INTERVAL);
    let ingest = spawn_temperature_ingest(
        subscriber.as_ref(),
        store.clone(),
        api_config.temperature_topic(),
    )
    .await
    .context("Failed to subscribe to temperature readings")?;

    let app = app(gateway, store, publisher, api_config)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {err}");
        }
        info!("Gracefully shutdown");
    })
    .await?;

    sweeper.abort();
    ingest.abort();

    Ok(())
}

/// Build the full router with every layer applied.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`; the
/// gateway needs the peer address.
///
/// # Errors
/// Returns an error if the configured CORS origin is not a valid URL.
pub fn app(
    gateway: Arc<AuthGateway>,
    sensors: Arc<dyn SensorStore>,
    publisher: Arc<dyn Publisher>,
    config: &ApiConfig,
) -> Result<Router> {
    let protected = Router::new()
        .route("/cmd/temp", get(temperature::latest))
        .route("/cmd/temps", get(temperature::recent))
        .route("/cmd/led", post(led::set_led))
        .route("/cmd/auth", post(auth_check::check_credentials))
        .route_layer(middleware::from_fn_with_state(gateway, require_auth));

    let routes = Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .merge(protected)
        .merge(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_JSON_PATH, openapi()));

    with_layers(routes, sensors, publisher, config)
}

/// Shared middleware stack, outermost first.
fn with_layers(
    routes: Router,
    sensors: Arc<dyn SensorStore>,
    publisher: Arc<dyn Publisher>,
    config: &ApiConfig,
) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(AllowOrigin::exact(cors_origin(config.cors_origin())?))
        .allow_credentials(true);

    let app = routes.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(SetResponseHeaderLayer::overriding(
                X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(TimeoutLayer::new(config.request_timeout()))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(Extension(sensors))
            .layer(Extension(publisher))
            .layer(Extension(LedTopic(config.led_topic().to_string()))),
    );

    Ok(app)
}

/// Subscribe to `topic` and store every reading that parses until the
/// subscription closes. Bad payloads are logged and skipped.
///
/// # Errors
/// Returns an error if the subscription cannot be opened.
pub async fn spawn_temperature_ingest(
    subscriber: &dyn Subscriber,
    sensors: Arc<dyn SensorStore>,
    topic: &str,
) -> Result<JoinHandle<()>, BusError> {
    let mut readings = subscriber.subscribe(topic).await?;
    let topic = topic.to_string();
    Ok(tokio::spawn(async move {
        while let Some(payload) = readings.recv().await {
            let Some(value) = parse_reading(&payload) else {
                warn!(topic = %topic, payload = %payload, "Ignoring invalid temperature reading");
                continue;
            };
            if let Err(err) = sensors.record_temperature(value).await {
                error!("Failed to store temperature reading: {err}");
            }
        }
        info!(topic = %topic, "temperature subscription closed");
    }))
}

fn parse_reading(payload: &str) -> Option<f64> {
    payload
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Periodically drop expired lockout entries so idle origins do not accumulate.
pub fn spawn_lockout_sweeper(lockout: Arc<LockoutTracker>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = lockout.purge_expired();
            if purged > 0 {
                debug!(purged, remaining = lockout.tracked_origins(), "lockout sweep");
            }
        }
    })
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {detail}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, handlers::MSG_INTERNAL)
}

fn cors_origin(url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid CORS origin: {url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}
