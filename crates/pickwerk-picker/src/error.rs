// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Errors surfaced by picker sessions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// A failure reported by the bridge as `"<Code>: <detail>"`.
    #[error("{code}: {detail}")]
    Bridge { code: String, detail: String },

    #[error(transparent)]
    Core(#[from] pickwerk_core::PickwerkError),
}

impl SessionError {
    /// Parse a boundary error string.
    pub fn from_boundary(message: &str) -> Self {
        match message.split_once(": ") {
            Some((code, detail)) => Self::Bridge {
                code: code.to_string(),
                detail: detail.to_string(),
            },
            None => Self::Bridge {
                code: "NativeError".to_string(),
                detail: message.to_string(),
            },
        }
    }

    /// The stable error code, e.g. `AlreadyPresenting`.
    pub fn code(&self) -> &str {
        match self {
            Self::Bridge { code, .. } => code,
            Self::Core(e) => e.code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
