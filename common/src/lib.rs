// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ODoH Common — key pair handling and protocol framing shared by proxy and target
//
// Cryptographic stack (RFC 9230 / RFC 9180):
//   KEM:  DHKEM(X25519, HKDF-SHA256)
//   KDF:  HKDF-SHA256
//   AEAD: AES-128-GCM

pub mod crypto;
pub mod protocol;

pub use crypto::{KeyPair, ObliviousMessage, ObliviousQuery, ResponseContext};
pub use protocol::ContentType;
