//! One-shot forwarding to the media and auth services.
//!
//! Each request maps to exactly one upstream request through a pooled
//! client. Status and end-to-end headers are copied back, the body is
//! streamed through without buffering.

use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::{GatewayConfig, Service, ServicesConfig};
use crate::http::request::{RequestIdExt, X_REQUEST_ID};
use crate::http::response::strip_hop_by_hop;
use crate::observability::metrics;

/// Where a one-shot route goes and how its response is shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRoute {
    pub service: Service,
    pub path: String,
    pub keep_query: bool,
    pub content_type: Option<&'static str>,
    pub pass_authorization: bool,
}

impl ForwardRoute {
    pub fn new(service: Service, path: impl Into<String>) -> Self {
        Self {
            service,
            path: path.into(),
            keep_query: false,
            content_type: None,
            pass_authorization: false,
        }
    }

    /// Replace the upstream content type with `content_type`.
    pub fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn keep_query(mut self) -> Self {
        self.keep_query = true;
        self
    }

    pub fn pass_authorization(mut self) -> Self {
        self.pass_authorization = true;
        self
    }

    /// Upstream path and query for a client request with `query`.
    fn path_and_query(&self, query: Option<&str>) -> String {
        match query {
            Some(q) if self.keep_query && !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }
}

/// Shared client for one-shot routes.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    services: ServicesConfig,
}

impl Forwarder {
    pub fn new(config: &GatewayConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.stream.connect_timeout()));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            services: config.services.clone(),
        }
    }

    /// Forward `request` according to `route`.
    ///
    /// Transport failures become `502 Upstream request failed`.
    pub async fn forward(&self, route: ForwardRoute, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request.request_id().to_string();
        let method = request.method().clone();
        let upstream = self.services.endpoint(route.service).authority();
        let uri = format!(
            "http://{}{}",
            upstream,
            route.path_and_query(request.uri().query())
        );

        tracing::debug!(
            request_id = %request_id,
            service = route.service.name(),
            uri = %uri,
            "Forwarding request"
        );

        let mut builder = Request::builder().method(method.clone()).uri(&uri);
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            builder = builder.header(X_REQUEST_ID, value);
        }
        if route.pass_authorization {
            if let Some(auth) = request.headers().get(header::AUTHORIZATION) {
                builder = builder.header(header::AUTHORIZATION, auth.clone());
            }
        }

        let upstream_request = match builder.body(Body::empty()) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(request_id = %request_id, uri = %uri, error = %e, "Invalid upstream request");
                metrics::record_request(method.as_str(), 502, &upstream, start);
                return bad_gateway();
            }
        };

        match self.client.request(upstream_request).await {
            Ok(response) => {
                let status = response.status();
                metrics::record_request(method.as_str(), status.as_u16(), &upstream, start);

                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                if let Some(content_type) = route.content_type {
                    parts
                        .headers
                        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
                }
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, upstream = %upstream, error = %e, "Upstream error");
                metrics::record_request(method.as_str(), 502, &upstream, start);
                bad_gateway()
            }
        }
    }
}

fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}
