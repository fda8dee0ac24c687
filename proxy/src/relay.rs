// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blind relay: POST the opaque body to {scheme}://{targethost}{targetpath}
// and hand back whatever the target answers. The payload is never parsed.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, StatusCode};
use tracing::{debug, warn};

use crate::error::ProxyError;

/// Default timeout for the whole outbound exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2500);

/// Headers that describe one connection and never cross a proxy (RFC 9110 7.6.1).
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Scheme used to reach targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetScheme {
    #[default]
    Https,
    /// Plain HTTP; only for local deployments and tests.
    Http,
}

impl TargetScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

impl FromStr for TargetScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "https" => Ok(Self::Https),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown target scheme '{other}'")),
        }
    }
}

impl fmt::Display for TargetScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub timeout: Duration,
    /// Forward every end-to-end header in both directions, not just
    /// `Content-Type`.
    pub preserve_headers: bool,
    pub scheme: TargetScheme,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            preserve_headers: false,
            scheme: TargetScheme::Https,
        }
    }
}

/// An inbound `/proxy` request.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub method: Method,
    pub target_host: Option<String>,
    pub target_path: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What goes back to the client.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// ODoH proxy. Clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Proxy {
    client: reqwest::Client,
    config: ProxyConfig,
}

impl Proxy {
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout)
            .pool_max_idle_per_host(16)
            .build()
            .map_err(ProxyError::Client)?;
        Ok(Self::with_client(client, config))
    }

    /// Use a caller-built client. `config.timeout` is then the caller's job.
    pub fn with_client(client: reqwest::Client, config: ProxyConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Relay one request to its target.
    pub async fn relay(&self, request: RelayRequest) -> Result<RelayResponse, ProxyError> {
        if request.method != Method::POST {
            return Err(ProxyError::WrongMethod(request.method));
        }
        let host = non_empty(request.target_host.as_deref()).ok_or(ProxyError::MissingTargetHost)?;
        let path = non_empty(request.target_path.as_deref()).ok_or(ProxyError::MissingTargetPath)?;
        if request.body.is_empty() {
            return Err(ProxyError::EmptyRequestBody);
        }

        let url = format!("{}://{}{}", self.config.scheme, host, path);
        debug!(target_host = %host, target_path = %path, len = request.body.len(), "relaying");

        let outbound = if self.config.preserve_headers {
            end_to_end(&request.headers)
        } else {
            content_type_only(&request.headers)
        };

        let response = self
            .client
            .post(&url)
            .headers(outbound)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                warn!(target_host = %host, error = %e, "relay to target failed");
                ProxyError::Transport(e)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(target_host = %host, status = status.as_u16(), "target answered non-200");
            return Ok(status_only(status));
        }

        let mut headers = if self.config.preserve_headers {
            end_to_end(response.headers())
        } else {
            content_type_only(response.headers())
        };
        if !headers.contains_key(header::CONTENT_TYPE) {
            if let Some(value) = request.headers.get(header::CONTENT_TYPE) {
                headers.insert(header::CONTENT_TYPE, value.clone());
            }
        }

        let body = response.bytes().await.map_err(|e| {
            warn!(target_host = %host, error = %e, "failed to read target response");
            ProxyError::Transport(e)
        })?;

        Ok(RelayResponse {
            status,
            headers,
            body,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Response for a non-200 target answer: same status, canonical reason as body.
fn status_only(status: StatusCode) -> RelayResponse {
    // 1xx, 204 and 304 carry no body
    if status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
    {
        return RelayResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
    }

    let reason = status.canonical_reason().unwrap_or("");
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    RelayResponse {
        status,
        headers,
        body: Bytes::from(reason),
    }
}

fn content_type_only(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    if let Some(value) = headers.get(header::CONTENT_TYPE) {
        out.insert(header::CONTENT_TYPE, value.clone());
    }
    out
}

/// Copy all headers except hop-by-hop ones, those named in `Connection`,
/// `Host` and `Content-Length`.
fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.as_str())
            || name == header::HOST
            || name == header::CONTENT_LENGTH
            || listed.iter().any(|l| l == name.as_str())
        {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderName;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.append(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn end_to_end_strips_hop_by_hop() {
        let inbound = headers(&[
            ("content-type", "application/oblivious-dns-message"),
            ("connection", "keep-alive, x-private"),
            ("keep-alive", "timeout=5"),
            ("te", "trailers"),
            ("transfer-encoding", "chunked"),
            ("proxy-authorization", "Basic c2VjcmV0"),
            ("host", "proxy.example"),
            ("content-length", "42"),
            ("x-private", "1"),
            ("x-request-id", "abc"),
            ("accept", "application/oblivious-dns-message"),
        ]);

        let out = end_to_end(&inbound);
        assert_eq!(out.len(), 3);
        assert!(out.contains_key("content-type"));
        assert!(out.contains_key("x-request-id"));
        assert!(out.contains_key("accept"));
    }

    #[test]
    fn content_type_only_copies_one_header() {
        let inbound = headers(&[
            ("content-type", "application/dns-message"),
            ("x-request-id", "abc"),
        ]);
        let out = content_type_only(&inbound);
        assert_eq!(out.len(), 1);
        assert_eq!(out[header::CONTENT_TYPE], "application/dns-message");
    }

    #[test]
    fn non_200_carries_reason_text() {
        let response = status_only(StatusCode::IM_A_TEAPOT);
        assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
        assert_eq!(&response.body[..], b"I'm a teapot");
    }

    #[test]
    fn bodiless_statuses_stay_empty() {
        for status in [StatusCode::NO_CONTENT, StatusCode::NOT_MODIFIED] {
            let response = status_only(status);
            assert_eq!(response.status, status);
            assert!(response.body.is_empty());
            assert!(response.headers.get(header::CONTENT_TYPE).is_none());
        }
    }

    #[test]
    fn scheme_parsing() {
        assert_eq!("HTTPS".parse::<TargetScheme>().unwrap(), TargetScheme::Https);
        assert_eq!("http".parse::<TargetScheme>().unwrap(), TargetScheme::Http);
        assert!("ftp".parse::<TargetScheme>().is_err());
    }
}
