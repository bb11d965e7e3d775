//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: one-shot routes plus the stream fallback
//! - Wire up middleware (request ID, tracing, timeouts)
//! - Bind server to listener and drain on shutdown
//!
//! # Design Decisions
//! - Explicit one-shot routes win over the stream fallback, so `/videos`
//!   never reaches the stream resolver
//! - The request timeout wraps one-shot routes only; streams are unbounded

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, Service};
use crate::http::forward::{ForwardRoute, Forwarder};
use crate::http::request::{RequestIdExt, UuidRequestId};
use crate::lifecycle::Shutdown;
use crate::net::StreamTracker;
use crate::observability::metrics;
use crate::stream::{StreamError, StreamService};

/// Body of `GET /`.
pub const ROOT_MESSAGE: &str = "API Gateway running";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub streams: Arc<StreamService>,
    pub forwarder: Forwarder,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
    tracker: StreamTracker,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let config = Arc::new(config);
        let tracker = StreamTracker::new();
        let shutdown = Shutdown::new();

        let streams = Arc::new(StreamService::from_config(
            &config,
            tracker.clone(),
            shutdown.clone(),
        ));
        let state = AppState {
            config: config.clone(),
            streams,
            forwarder: Forwarder::new(&config),
        };

        let router = build_router(&config, state);
        Self {
            router,
            config,
            tracker,
            shutdown,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn tracker(&self) -> StreamTracker {
        self.tracker.clone()
    }

    /// Handle for stopping the server and its stream sessions.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run the server until shutdown is triggered.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut signal = self.shutdown.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.recv().await })
            .await?;

        tracing::info!(
            active_sessions = self.tracker.active_sessions(),
            opened = self.tracker.opened_connections(),
            released = self.tracker.released_connections(),
            "HTTP server stopped"
        );
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let one_shot = Router::new()
        .route("/", get(root))
        .route("/auth/google", get(auth_google))
        .route("/auth/github", get(auth_github))
        .route("/protected", get(protected))
        .route("/logs", get(logs))
        .route("/events", get(events))
        .route("/play/{*rest}", get(play))
        .route("/videos", get(videos))
        .route("/videos/{path}", get(video_file))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )));

    Router::new()
        .merge(one_shot)
        .fallback(stream_handler)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(
                    |request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request.request_id(),
                        )
                    },
                ))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

async fn root() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], ROOT_MESSAGE)
}

async fn auth_google(State(state): State<AppState>, request: Request<Body>) -> Response {
    let route = ForwardRoute::new(Service::Auth, "/auth/google");
    state.forwarder.forward(route, request).await
}

async fn auth_github(State(state): State<AppState>, request: Request<Body>) -> Response {
    let route = ForwardRoute::new(Service::Auth, "/auth/github");
    state.forwarder.forward(route, request).await
}

async fn protected(State(state): State<AppState>, request: Request<Body>) -> Response {
    let route = ForwardRoute::new(Service::Auth, "/protected").pass_authorization();
    state.forwarder.forward(route, request).await
}

async fn logs(State(state): State<AppState>, request: Request<Body>) -> Response {
    let route = ForwardRoute::new(Service::Media, "/logs").content_type("text/plain");
    state.forwarder.forward(route, request).await
}

async fn events(State(state): State<AppState>, request: Request<Body>) -> Response {
    let route = ForwardRoute::new(Service::Media, "/events").content_type("text/html");
    state.forwarder.forward(route, request).await
}

async fn play(State(state): State<AppState>, request: Request<Body>) -> Response {
    // Raw path keeps the client's percent-encoding intact.
    let rest = raw_suffix(&request, "/play/");
    let route = ForwardRoute::new(Service::Media, format!("/play/{rest}"))
        .keep_query()
        .content_type("video/x-msvideo");
    state.forwarder.forward(route, request).await
}

async fn videos(State(state): State<AppState>, request: Request<Body>) -> Response {
    let route = ForwardRoute::new(Service::Media, "/videos");
    state.forwarder.forward(route, request).await
}

async fn video_file(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = raw_suffix(&request, "/videos/");
    let route = ForwardRoute::new(Service::Media, format!("/video/{path}"));
    state.forwarder.forward(route, request).await
}

fn raw_suffix(request: &Request<Body>, prefix: &str) -> String {
    request
        .uri()
        .path()
        .strip_prefix(prefix)
        .unwrap_or_default()
        .to_string()
}

/// Fallback for every path without an explicit route.
///
/// Paths the stream resolver accepts start a relay; everything else is 404.
async fn stream_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    if state.streams.resolve(&path).is_none() {
        tracing::debug!(request_id = %request.request_id(), path = %path, "No route matched");
        metrics::record_request(method.as_str(), 404, "none", start);
        return StreamError::RouteNotResolved(path).into_response();
    }

    if method != Method::GET {
        metrics::record_request(method.as_str(), 405, "none", start);
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET")],
            "Method not allowed",
        )
            .into_response();
    }

    tracing::debug!(
        request_id = %request.request_id(),
        client = %client,
        path = %path,
        "Stream requested"
    );

    match state.streams.serve(&path, request.headers()).await {
        Ok(response) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), "stream", start);
            response
        }
        Err(err) => {
            metrics::record_request(method.as_str(), err.status_code().as_u16(), "stream", start);
            err.into_response()
        }
    }
}
