// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use http::{Method, StatusCode};
use thiserror::Error;

/// Why a relay attempt was refused or failed.
///
/// A non-200 answer from the target is not an error; it is relayed as-is.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("unsupported method {0}, expected POST")]
    WrongMethod(Method),

    #[error("missing targethost query parameter")]
    MissingTargetHost,

    #[error("missing targetpath query parameter")]
    MissingTargetPath,

    #[error("empty request body")]
    EmptyRequestBody,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to reach target: {0}")]
    Transport(#[source] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::WrongMethod(_)
            | Self::MissingTargetHost
            | Self::MissingTargetPath
            | Self::EmptyRequestBody => StatusCode::BAD_REQUEST,
            Self::Client(_) | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label for logs and the `reason` metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::WrongMethod(_) => "wrong_method",
            Self::MissingTargetHost => "missing_target_host",
            Self::MissingTargetPath => "missing_target_path",
            Self::EmptyRequestBody => "empty_request_body",
            Self::Client(_) => "client",
            Self::Transport(_) => "transport",
        }
    }
}
