// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! odohd — Oblivious DNS-over-HTTPS proxy and target
//!
//! One process serves both roles:
//!
//! - **Target** (`/dns-query`): answers plaintext DoH
//!   (`application/dns-message`) and ODoH (`application/oblivious-dns-message`)
//!   queries against upstream nameservers over TCP.
//! - **Proxy** (`/proxy?targethost=..&targetpath=..`): relays opaque bodies to
//!   a target without reading them.
//!
//! The target's public config is served at `/.well-known/odohconfigs`.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod tls;

use std::sync::Arc;

use odoh_common::crypto::KeyPair;
use odoh_proxy::Proxy;
use odoh_target::{ResolverSet, Target, TelemetrySink};
use tracing::info;

use crate::config::Args;
use crate::handlers::AppState;
use crate::metrics::Metrics;

/// Build the application state from configuration.
///
/// Spawns the telemetry drain task, so it must run inside a tokio runtime.
pub fn build_state(args: &Args) -> anyhow::Result<Arc<AppState>> {
    let keypair = match args.seed_bytes()? {
        Some(seed) => KeyPair::from_seed(&seed)?,
        None => KeyPair::generate()?,
    };
    info!(key_id = %hex::encode(keypair.key_id()), "ODoH key pair ready");

    let nameservers = args.nameservers()?;
    let resolvers = ResolverSet::network(&nameservers, args.resolver_timeout, args.resolver_policy)?;
    info!(
        resolvers = ?nameservers,
        policy = %args.resolver_policy,
        timeout_ms = args.resolver_timeout.as_millis() as u64,
        "upstream resolvers configured"
    );

    let telemetry = TelemetrySink::spawn(
        args.telemetry,
        args.telemetry_queue,
        args.instance_name.clone(),
        args.experiment_id.clone(),
    );

    let target = Target::new(Arc::new(keypair), resolvers, telemetry);
    let proxy = Proxy::new(args.proxy_config())?;

    Ok(Arc::new(AppState {
        target,
        proxy,
        metrics: Metrics::new()?,
    }))
}
