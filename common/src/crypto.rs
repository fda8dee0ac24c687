// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ODoH key pair and per-query response contexts (RFC 9230).
//
// HPKE suite:
//   KEM:  DHKEM(X25519, HKDF-SHA256)  (0x0020)
//   KDF:  HKDF-SHA256                 (0x0001)
//   AEAD: AES-128-GCM                 (0x0001)
//
// The HPKE primitive and the ODoH message codec come from `odoh-rs`; this
// module only fixes the suite, caches the serialized config, and makes the
// response context single-use.

use bytes::{Bytes, BytesMut};
use odoh_rs::{
    compose, decrypt_query, decrypt_response, encrypt_query, encrypt_response, parse,
    ObliviousDoHConfig, ObliviousDoHConfigs, ObliviousDoHKeyPair, ObliviousDoHMessage,
    ObliviousDoHMessagePlaintext, OdohSecret, ResponseNonce,
};
use rand::{Rng, RngCore};
use tracing::debug;

pub use odoh_rs::ObliviousDoHConfigContents as ConfigContents;

/// DHKEM(X25519, HKDF-SHA256).
pub const KEM_X25519_HKDF_SHA256: u16 = 0x0020;
/// HKDF-SHA256.
pub const KDF_HKDF_SHA256: u16 = 0x0001;
/// AES-128-GCM.
pub const AEAD_AES_GCM_128: u16 = 0x0001;

/// Seed length for key derivation. Matches the X25519 secret key size.
pub const SEED_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("seed too short: need at least {min} bytes, got {got}")]
    SeedTooShort { min: usize, got: usize },

    #[error("failed to derive key identifier")]
    KeyIdentifier,

    #[error("failed to serialize ODoH config")]
    ConfigEncoding,

    #[error("malformed ODoH config")]
    MalformedConfig,

    #[error("no supported ODoH config found")]
    NoSupportedConfig,

    #[error("malformed oblivious message")]
    MalformedMessage,

    #[error("oblivious message is not a query")]
    NotAQuery,

    #[error("decryption failed: authentication failure or data corruption")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,
}

/// The target's HPKE key pair together with its serialized public config.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct KeyPair {
    inner: ObliviousDoHKeyPair,
    key_id: Bytes,
    configs: Bytes,
}

impl KeyPair {
    /// Derive a key pair from fresh OS randomness.
    pub fn generate() -> Result<Self, Error> {
        let mut seed = [0u8; SEED_LEN];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// Derive a key pair deterministically from `seed` (at least [`SEED_LEN`] bytes).
    ///
    /// The same seed always yields the same public config and key identifier,
    /// which lets several target instances share one advertised config.
    pub fn from_seed(seed: &[u8]) -> Result<Self, Error> {
        if seed.len() < SEED_LEN {
            return Err(Error::SeedTooShort {
                min: SEED_LEN,
                got: seed.len(),
            });
        }

        let inner = ObliviousDoHKeyPair::from_parameters(
            KEM_X25519_HKDF_SHA256,
            KDF_HKDF_SHA256,
            AEAD_AES_GCM_128,
            seed,
        );

        let key_id = inner
            .public()
            .identifier()
            .map_err(|_| Error::KeyIdentifier)?;

        let configs: ObliviousDoHConfigs =
            vec![ObliviousDoHConfig::from(inner.public().clone())].into();
        let configs = compose(&configs)
            .map(BytesMut::freeze)
            .map_err(|_| Error::ConfigEncoding)?;

        Ok(Self {
            inner,
            key_id: Bytes::from(key_id),
            configs,
        })
    }

    /// Key identifier of the current public config.
    pub fn key_id(&self) -> &[u8] {
        &self.key_id
    }

    /// Serialized `ObliviousDoHConfigs` holding exactly the current config.
    pub fn configs(&self) -> Bytes {
        self.configs.clone()
    }

    /// Public config contents, as a client would obtain them from [`Self::configs`].
    pub fn public(&self) -> &ConfigContents {
        self.inner.public()
    }

    /// Decrypt an oblivious query.
    ///
    /// Returns the plaintext DNS query and the context that must be used to
    /// seal its answer. Callers are expected to have compared
    /// [`ObliviousMessage::key_id`] with [`Self::key_id`] beforehand.
    pub fn open(&self, message: &ObliviousMessage) -> Result<(ObliviousQuery, ResponseContext), Error> {
        let (plaintext, secret) = decrypt_query(&message.inner, &self.inner).map_err(|e| {
            debug!(error = %e, "oblivious query decryption failed");
            Error::DecryptionFailed
        })?;

        let query = ObliviousQuery {
            message: plaintext.clone().into_msg(),
        };
        let context = ResponseContext {
            query: plaintext,
            secret,
        };

        Ok((query, context))
    }
}

/// Leading message-type byte of an ODoH query.
const MESSAGE_TYPE_QUERY: u8 = 0x01;

/// A parsed ODoH wire message (query or response).
pub struct ObliviousMessage {
    inner: ObliviousDoHMessage,
    msg_type: u8,
}

impl ObliviousMessage {
    /// Unmarshal an ODoH message from its wire form.
    pub fn parse(wire: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(wire);
        let inner = parse(&mut buf).map_err(|_| Error::MalformedMessage)?;
        // parse succeeded, so the type byte is present
        let msg_type = wire.first().copied().unwrap_or_default();
        Ok(Self { inner, msg_type })
    }

    /// Whether this is a query (as opposed to a response) message.
    pub fn is_query(&self) -> bool {
        self.msg_type == MESSAGE_TYPE_QUERY
    }

    /// Key identifier carried by a query message.
    pub fn key_id(&self) -> &[u8] {
        self.inner.key_id()
    }

    /// Marshal back to wire form.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        compose(&self.inner)
            .map(BytesMut::freeze)
            .map_err(|_| Error::MalformedMessage)
    }
}

/// Plaintext DNS query recovered from an oblivious message. Padding is stripped.
#[derive(Debug, Clone)]
pub struct ObliviousQuery {
    message: Bytes,
}

impl ObliviousQuery {
    /// Packed DNS query.
    pub fn message(&self) -> &[u8] {
        &self.message
    }
}

/// Single-use binding between one decrypted query and its encrypted answer.
///
/// Not `Clone`; [`ResponseContext::seal`] consumes it, so an answer can be
/// encrypted under a given context at most once.
pub struct ResponseContext {
    query: ObliviousDoHMessagePlaintext,
    secret: OdohSecret,
}

impl ResponseContext {
    /// Encrypt a packed DNS answer and marshal the resulting ODoH response.
    ///
    /// The context is consumed, so a second answer cannot be sealed with it:
    ///
    /// ```compile_fail
    /// use odoh_common::crypto::seal_query;
    /// use odoh_common::{KeyPair, ObliviousMessage};
    ///
    /// let kp = KeyPair::generate().unwrap();
    /// let (wire, _) = seal_query(kp.public(), b"query").unwrap();
    /// let message = ObliviousMessage::parse(&wire).unwrap();
    /// let (_, context) = kp.open(&message).unwrap();
    ///
    /// let _first = context.seal(b"answer");
    /// let _second = context.seal(b"another answer");
    /// ```
    pub fn seal(self, answer: &[u8]) -> Result<Bytes, Error> {
        let nonce: ResponseNonce = rand::thread_rng().gen();
        let response = ObliviousDoHMessagePlaintext::new(answer, 0);

        let sealed = encrypt_response(&self.query, &response, self.secret, nonce)
            .map_err(|_| Error::EncryptionFailed)?;

        compose(&sealed)
            .map(BytesMut::freeze)
            .map_err(|_| Error::EncryptionFailed)
    }
}

/// Parse a serialized config set and return the first supported config.
pub fn parse_configs(wire: &[u8]) -> Result<ConfigContents, Error> {
    let mut buf = Bytes::copy_from_slice(wire);
    let configs: ObliviousDoHConfigs = parse(&mut buf).map_err(|_| Error::MalformedConfig)?;
    configs
        .into_iter()
        .next()
        .map(ConfigContents::from)
        .ok_or(Error::NoSupportedConfig)
}

/// Client side of one ODoH exchange: holds what is needed to open the answer.
pub struct ClientContext {
    query: ObliviousDoHMessagePlaintext,
    secret: OdohSecret,
}

/// Encrypt a packed DNS query under a target's public config.
///
/// Returns the marshalled ODoH query and the context for opening the answer.
pub fn seal_query(config: &ConfigContents, dns_query: &[u8]) -> Result<(Bytes, ClientContext), Error> {
    let query = ObliviousDoHMessagePlaintext::new(dns_query, 0);
    let (message, secret) = encrypt_query(&query, config, &mut rand::thread_rng())
        .map_err(|_| Error::EncryptionFailed)?;

    let wire = compose(&message)
        .map(BytesMut::freeze)
        .map_err(|_| Error::EncryptionFailed)?;

    Ok((wire, ClientContext { query, secret }))
}

impl ClientContext {
    /// Decrypt a marshalled ODoH response into the packed DNS answer.
    pub fn open(self, wire: &[u8]) -> Result<Bytes, Error> {
        let message = ObliviousMessage::parse(wire)?;
        let plaintext = decrypt_response(&self.query, &message.inner, self.secret)
            .map_err(|_| Error::DecryptionFailed)?;
        Ok(plaintext.into_msg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_response_roundtrip() {
        let kp = KeyPair::generate().unwrap();
        let (wire, client) = seal_query(kp.public(), b"example.com A query").unwrap();

        let message = ObliviousMessage::parse(&wire).unwrap();
        assert_eq!(message.key_id(), kp.key_id());

        let (query, context) = kp.open(&message).unwrap();
        assert_eq!(query.message(), b"example.com A query");

        let sealed = context.seal(b"example.com A 127.0.0.1").unwrap();
        let answer = client.open(&sealed).unwrap();
        assert_eq!(&answer[..], b"example.com A 127.0.0.1");
    }

    #[test]
    fn seed_is_deterministic() {
        let seed = [7u8; SEED_LEN];
        let a = KeyPair::from_seed(&seed).unwrap();
        let b = KeyPair::from_seed(&seed).unwrap();
        assert_eq!(a.key_id(), b.key_id());
        assert_eq!(a.configs(), b.configs());

        let c = KeyPair::from_seed(&[8u8; SEED_LEN]).unwrap();
        assert_ne!(a.key_id(), c.key_id());
    }

    #[test]
    fn short_seed_rejected() {
        let result = KeyPair::from_seed(&[0u8; 10]);
        assert!(matches!(result, Err(Error::SeedTooShort { min: 32, got: 10 })));
    }

    #[test]
    fn configs_parse_back_to_public_key() {
        let kp = KeyPair::generate().unwrap();
        let config = parse_configs(&kp.configs()).unwrap();
        assert_eq!(config.identifier().unwrap(), kp.key_id().to_vec());
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let kp = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();

        let (wire, _) = seal_query(other.public(), b"secret query").unwrap();
        let message = ObliviousMessage::parse(&wire).unwrap();
        assert_ne!(message.key_id(), kp.key_id());
        assert!(kp.open(&message).is_err());
    }

    #[test]
    fn corrupted_ciphertext_fails() {
        let kp = KeyPair::generate().unwrap();
        let (wire, _) = seal_query(kp.public(), b"secret query").unwrap();

        let mut corrupted = wire.to_vec();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;

        let message = ObliviousMessage::parse(&corrupted).unwrap();
        let result = kp.open(&message);
        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[test]
    fn message_type_is_reported() {
        let kp = KeyPair::generate().unwrap();
        let (wire, _) = seal_query(kp.public(), b"query").unwrap();
        let query = ObliviousMessage::parse(&wire).unwrap();
        assert!(query.is_query());

        let (_, context) = kp.open(&query).unwrap();
        let sealed = context.seal(b"answer").unwrap();
        assert!(!ObliviousMessage::parse(&sealed).unwrap().is_query());

        // response type, empty key id, 4-byte payload
        let bare = ObliviousMessage::parse(&[2, 0, 0, 0, 4, 1, 2, 3, 4]).unwrap();
        assert!(!bare.is_query());
        assert!(bare.key_id().is_empty());
    }

    #[test]
    fn truncated_message_rejected() {
        let result = ObliviousMessage::parse(&[1, 2, 3]);
        assert!(matches!(result, Err(Error::MalformedMessage)));
    }

    #[test]
    fn answers_use_fresh_nonces() {
        let kp = KeyPair::generate().unwrap();
        let (wire, _) = seal_query(kp.public(), b"query").unwrap();
        let message = ObliviousMessage::parse(&wire).unwrap();

        let (_, first) = kp.open(&message).unwrap();
        let (_, second) = kp.open(&message).unwrap();

        let a = first.seal(b"same answer").unwrap();
        let b = second.seal(b"same answer").unwrap();
        assert_ne!(a, b);
    }
}
