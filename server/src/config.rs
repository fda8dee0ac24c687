// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use odoh_common::crypto::SEED_LEN;
use odoh_proxy::{ProxyConfig, TargetScheme};
use odoh_target::{SelectionPolicy, TelemetryBackend};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("seed is not valid hex: {0}")]
    SeedHex(#[from] hex::FromHexError),

    #[error("seed too short: need at least {min} bytes, got {got}")]
    SeedTooShort { min: usize, got: usize },

    #[error("--cert and --key must be set when TLS is enabled")]
    MissingTlsFiles,

    #[error("at least one resolver is required")]
    NoResolvers,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "odohd",
    version,
    about = "Oblivious DNS-over-HTTPS proxy and target (RFC 9230)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Upstream nameservers (host:port, comma separated)
    #[arg(
        long,
        env = "RESOLVERS",
        value_delimiter = ',',
        default_values = ["1.1.1.1:53", "8.8.8.8:53", "9.9.9.9:53"]
    )]
    pub resolvers: Vec<String>,

    /// Upstream resolver timeout, covering connect, write and read
    #[arg(long, env = "RESOLVER_TIMEOUT", default_value = "2500ms", value_parser = parse_duration)]
    pub resolver_timeout: Duration,

    /// How a resolver is chosen per query: random | transaction-id
    #[arg(long, env = "RESOLVER_POLICY", default_value = "random")]
    pub resolver_policy: SelectionPolicy,

    /// Timeout for relaying a query to a target
    #[arg(long, env = "PROXY_TIMEOUT", default_value = "2500ms", value_parser = parse_duration)]
    pub proxy_timeout: Duration,

    /// Forward all end-to-end headers through the proxy, not just Content-Type
    #[arg(long, env = "PROXY_PRESERVE_HEADERS")]
    pub preserve_headers: bool,

    /// Scheme used by the proxy to reach targets: https | http
    #[arg(long, env = "PROXY_TARGET_SCHEME", default_value = "https")]
    pub target_scheme: TargetScheme,

    /// Hex-encoded key seed (at least 32 bytes); random when unset
    #[arg(long, env = "SEED_SECRET_KEY", hide_env_values = true)]
    pub seed: Option<String>,

    /// Instance name stamped on telemetry records
    #[arg(long, env = "TARGET_INSTANCE_NAME", default_value = "server_localhost")]
    pub instance_name: String,

    /// Experiment id stamped on telemetry records
    #[arg(long, env = "EXPERIMENT_ID", default_value = "EXP_LOCAL")]
    pub experiment_id: String,

    /// Telemetry backend: log | none
    #[arg(long, env = "TELEMETRY_TYPE", default_value = "log")]
    pub telemetry: TelemetryBackend,

    /// Telemetry queue capacity; records beyond it are dropped
    #[arg(long, env = "TELEMETRY_QUEUE", default_value_t = odoh_target::telemetry::DEFAULT_QUEUE)]
    pub telemetry_queue: usize,

    /// TLS certificate file (PEM)
    #[arg(long, env = "TLS_CERT")]
    pub cert: Option<PathBuf>,

    /// TLS private key file (PEM)
    #[arg(long, env = "TLS_KEY")]
    pub key: Option<PathBuf>,

    /// Serve plain HTTP
    #[arg(long, env = "DISABLE_TLS")]
    pub no_tls: bool,

    /// Enable debug logging
    #[arg(short, long, env = "VERBOSE")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate a key seed and print it with the resulting ODoH config
    Keygen,
}

impl Args {
    /// Decoded key seed, if one was configured.
    pub fn seed_bytes(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let Some(seed) = self.seed.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let bytes = hex::decode(seed)?;
        if bytes.len() < SEED_LEN {
            return Err(ConfigError::SeedTooShort {
                min: SEED_LEN,
                got: bytes.len(),
            });
        }
        Ok(Some(bytes))
    }

    /// Certificate and key paths, or `None` when TLS is disabled.
    pub fn tls_files(&self) -> Result<Option<(PathBuf, PathBuf)>, ConfigError> {
        if self.no_tls {
            return Ok(None);
        }
        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => Ok(Some((cert.clone(), key.clone()))),
            _ => Err(ConfigError::MissingTlsFiles),
        }
    }

    pub fn nameservers(&self) -> Result<Vec<String>, ConfigError> {
        let nameservers: Vec<String> = self
            .resolvers
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if nameservers.is_empty() {
            return Err(ConfigError::NoResolvers);
        }
        Ok(nameservers)
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig {
            timeout: self.proxy_timeout,
            preserve_headers: self.preserve_headers,
            scheme: self.target_scheme,
        }
    }
}

/// Parse durations like `2500ms`, `30s`, `5m`, `24h`. A bare number is seconds
/// and may be fractional (`2.5`).
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        let ms: u64 = ms.parse().map_err(|e| format!("invalid milliseconds: {e}"))?;
        Ok(Duration::from_millis(ms))
    } else if let Some(hours) = s.strip_suffix('h') {
        let h: u64 = hours.parse().map_err(|e| format!("invalid hours: {e}"))?;
        Ok(Duration::from_secs(h * 3600))
    } else if let Some(mins) = s.strip_suffix('m') {
        let m: u64 = mins.parse().map_err(|e| format!("invalid minutes: {e}"))?;
        Ok(Duration::from_secs(m * 60))
    } else if let Some(secs) = s.strip_suffix('s') {
        let s: u64 = secs.parse().map_err(|e| format!("invalid seconds: {e}"))?;
        Ok(Duration::from_secs(s))
    } else {
        let secs: f64 = s.parse().map_err(|e| format!("invalid duration: {e}"))?;
        Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration: {e}"))
    }
}
