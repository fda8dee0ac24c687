// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ODoH Proxy — blind relay between clients and targets
//
// The proxy sees the client's address and the target's name, never the
// query. Bodies pass through untouched in both directions.

pub mod error;
pub mod relay;

pub use error::ProxyError;
pub use relay::{Proxy, ProxyConfig, RelayRequest, RelayResponse, TargetScheme};
