// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! HTTP handlers binding the proxy and target engines to axum.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use odoh_common::protocol::{
    CONFIGS_PATH, HEALTH_PATH, METRICS_PATH, PROXY_PATH, QUERY_PATH, TARGET_HOST_PARAM,
    TARGET_PATH_PARAM,
};
use odoh_proxy::{Proxy, ProxyError, RelayRequest};
use odoh_target::{DnsRequest, Target, TargetError};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::metrics::Metrics;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// `proxy_errors` label for a query string that does not deserialize.
const INVALID_QUERY: &str = "invalid_query";

/// Shared application state.
pub struct AppState {
    pub target: Target,
    pub proxy: Proxy,
    pub metrics: Metrics,
}

#[derive(Debug, Deserialize)]
pub struct DnsParams {
    pub dns: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub targethost: Option<String>,
    pub targetpath: Option<String>,
}

/// Build the full router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route(QUERY_PATH, any(dns_query))
        .route(PROXY_PATH, any(proxy))
        .route(CONFIGS_PATH, get(odoh_configs))
        .route(HEALTH_PATH, get(health))
        .route(METRICS_PATH, get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Status code with its canonical reason phrase as a plain-text body.
fn status_response(status: StatusCode) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, TEXT_PLAIN)],
        status.canonical_reason().unwrap_or_default(),
    )
        .into_response()
}

/// `/dns-query` — plaintext DoH and oblivious ODoH.
pub async fn dns_query(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    params: Result<Query<DnsParams>, QueryRejection>,
    body: Bytes,
) -> Response {
    state.metrics.target_queries.inc();

    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => {
            debug!(error = %e, "rejected target query string");
            let status = StatusCode::BAD_REQUEST;
            state
                .metrics
                .target_errors
                .with_label_values(&[status.as_str()])
                .inc();
            return status_response(status);
        }
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let request = DnsRequest {
        method,
        content_type,
        dns_param: params.dns,
        body,
    };

    match state.target.handle(request).await {
        Ok(response) => {
            let protocol = match response.content_type {
                odoh_common::protocol::OBLIVIOUS_DNS_MESSAGE => "oblivious",
                _ => "plain",
            };
            state
                .metrics
                .target_valid_queries
                .with_label_values(&[protocol])
                .inc();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, response.content_type)],
                response.body,
            )
                .into_response()
        }
        Err(e) => {
            log_target_error(&e);
            let status = e.status();
            state
                .metrics
                .target_errors
                .with_label_values(&[status.as_str()])
                .inc();
            status_response(status)
        }
    }
}

fn log_target_error(e: &TargetError) {
    match e {
        TargetError::Resolve(_) | TargetError::EncodeAnswer(_) | TargetError::Encrypt(_) => {
            warn!(error = %e, "target query failed")
        }
        _ => debug!(error = %e, "rejected target query"),
    }
}

/// `/proxy?targethost=..&targetpath=..` — blind relay.
pub async fn proxy(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    params: Result<Query<ProxyParams>, QueryRejection>,
    body: Bytes,
) -> Response {
    state.metrics.proxy_queries.inc();

    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => {
            debug!(reason = INVALID_QUERY, error = %e, "rejected proxy query string");
            state
                .metrics
                .proxy_errors
                .with_label_values(&[INVALID_QUERY])
                .inc();
            return status_response(StatusCode::BAD_REQUEST);
        }
    };

    let request = RelayRequest {
        method,
        target_host: params.targethost,
        target_path: params.targetpath,
        headers,
        body,
    };

    match state.proxy.relay(request).await {
        Ok(response) => {
            state.metrics.proxy_valid_queries.inc();
            (response.status, response.headers, response.body).into_response()
        }
        Err(e) => {
            log_proxy_error(&e);
            state
                .metrics
                .proxy_errors
                .with_label_values(&[e.reason()])
                .inc();
            status_response(e.status())
        }
    }
}

fn log_proxy_error(e: &ProxyError) {
    match e {
        ProxyError::Transport(_) | ProxyError::Client(_) => {
            warn!(reason = e.reason(), error = %e, "proxy relay failed")
        }
        _ => debug!(reason = e.reason(), error = %e, "rejected proxy request"),
    }
}

/// `/.well-known/odohconfigs`
pub async fn odoh_configs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        state.target.config(),
    )
}

/// `/health`
pub async fn health() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], "ok")
}

/// `/metrics`
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// `/` — endpoint templates for this host.
pub async fn index(headers: HeaderMap) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let body = format!(
        "ODOH service\n\
         ----------------\n\
         Proxy endpoint: https://{host}{PROXY_PATH}{{?{TARGET_HOST_PARAM},{TARGET_PATH_PARAM}}}\n\
         Target endpoint: https://{host}{QUERY_PATH}{{?dns}}\n\
         ----------------\n"
    );
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], body)
}
