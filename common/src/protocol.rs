// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP surface constants and DNS-over-TCP framing: 2-byte big-endian length
// prefix + payload (RFC 1035 Section 4.2.2, RFC 7766).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Plaintext DoH media type (RFC 8484).
pub const DNS_MESSAGE: &str = "application/dns-message";
/// Oblivious DoH media type (RFC 9230).
pub const OBLIVIOUS_DNS_MESSAGE: &str = "application/oblivious-dns-message";

pub const QUERY_PATH: &str = "/dns-query";
pub const PROXY_PATH: &str = "/proxy";
pub const CONFIGS_PATH: &str = "/.well-known/odohconfigs";
pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

/// GET parameter carrying a base64url DNS query.
pub const DNS_PARAM: &str = "dns";
pub const TARGET_HOST_PARAM: &str = "targethost";
pub const TARGET_PATH_PARAM: &str = "targetpath";

/// Maximum DNS message size over TCP.
pub const MAX_PAYLOAD: usize = 65535;

/// The two request bodies a target understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    DnsMessage,
    ObliviousDnsMessage,
}

impl ContentType {
    /// Map a `Content-Type` header value. Anything but the two ODoH/DoH media
    /// types yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(DNS_MESSAGE) {
            Some(Self::DnsMessage)
        } else if value.eq_ignore_ascii_case(OBLIVIOUS_DNS_MESSAGE) {
            Some(Self::ObliviousDnsMessage)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DnsMessage => DNS_MESSAGE,
            Self::ObliviousDnsMessage => OBLIVIOUS_DNS_MESSAGE,
        }
    }
}

/// Read a length-prefixed DNS message from a stream.
///
/// A zero length prefix is treated as an error: the peer sent no message.
pub async fn read_framed<R: AsyncRead + Unpin>(stream: &mut R) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;

    if len == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "zero-length message",
        ));
    }

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write a length-prefixed DNS message to a stream in a single write.
pub async fn write_framed<W: AsyncWrite + Unpin>(
    stream: &mut W,
    data: &[u8],
) -> std::io::Result<()> {
    if data.len() > MAX_PAYLOAD {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("message too large: {} > {}", data.len(), MAX_PAYLOAD),
        ));
    }

    let mut frame = Vec::with_capacity(2 + data.len());
    frame.extend_from_slice(&(data.len() as u16).to_be_bytes());
    frame.extend_from_slice(data);

    stream.write_all(&frame).await?;
    stream.flush().await?;
    Ok(())
}
