// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// odohd — Oblivious DNS-over-HTTPS proxy and target
//
// RFC 9230: Oblivious DNS over HTTPS
// RFC 8484: DNS Queries over HTTPS

use base64::Engine;
use clap::Parser;
use odoh_common::crypto::{KeyPair, SEED_LEN};
use rand::RngCore;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use odohd::config::{Args, Command};
use odohd::{build_state, handlers, tls};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    if let Some(Command::Keygen) = args.command {
        return keygen();
    }

    let tls_files = args.tls_files()?;
    let state = build_state(&args)?;
    let app = handlers::router(state);

    let listener = TcpListener::bind(args.listen).await?;

    match tls_files {
        Some((cert, key)) => {
            let config = tls::load_tls_config(&cert, &key)?;
            info!(addr = %args.listen, "ODoH listener started (HTTPS)");
            tls::serve_tls(listener, config, app).await?;
        }
        None => {
            info!(addr = %args.listen, "ODoH listener started (plain HTTP)");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// Generate a seed and print it with the resulting ODoH config.
fn keygen() -> anyhow::Result<()> {
    let mut seed = [0u8; SEED_LEN];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    let keypair = KeyPair::from_seed(&seed)?;

    let b64 = base64::engine::general_purpose::STANDARD;
    println!("# ODoH key material (DHKEM X25519 / HKDF-SHA256 / AES-128-GCM)");
    println!("SEED_SECRET_KEY={}", hex::encode(seed));
    println!("KEY_ID={}", hex::encode(keypair.key_id()));
    println!("ODOH_CONFIGS={}", b64.encode(keypair.configs()));

    Ok(())
}
