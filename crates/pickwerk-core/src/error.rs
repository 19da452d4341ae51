// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pickwerk.

use thiserror::Error;

/// Top-level error type for all Pickwerk operations.
///
/// Synchronous failures cross the C boundary as an owned string of the form
/// `"<Code>: <detail>"`, where `<Code>` is [`PickwerkError::code`].
#[derive(Debug, Error)]
pub enum PickwerkError {
    // -- Capability --
    #[error("native picker is not available on this platform")]
    Unavailable,

    #[error("failed to allocate native picker resources: {0}")]
    AllocationFailure(String),

    #[error("screen capture permission was denied")]
    PermissionDenied,

    // -- State machine --
    #[error("picker is already presenting")]
    AlreadyPresenting,

    #[error("invalid or destroyed picker handle")]
    InvalidHandle,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -- Native collaborator --
    #[error("native picker error: {0}")]
    Native(String),

    // -- Envelope / configuration --
    #[error("event envelope error: {0}")]
    Envelope(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PickwerkError {
    /// Stable identifier used as the prefix of boundary error strings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "NativeUnavailable",
            Self::AllocationFailure(_) => "AllocationFailure",
            Self::PermissionDenied => "PermissionDenied",
            Self::AlreadyPresenting => "AlreadyPresenting",
            Self::InvalidHandle => "InvalidHandle",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::Native(_) => "NativeError",
            Self::Envelope(_) | Self::Serialization(_) => "EnvelopeError",
            Self::Io(_) => "IoError",
        }
    }

    /// Message handed to the host through an error out-parameter.
    pub fn boundary_message(&self) -> String {
        format!("{}: {}", self.code(), self)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PickwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_message_carries_code_prefix() {
        let msg = PickwerkError::AlreadyPresenting.boundary_message();
        assert_eq!(msg, "AlreadyPresenting: picker is already presenting");
    }

    #[test]
    fn unavailable_maps_to_native_unavailable() {
        assert_eq!(PickwerkError::Unavailable.code(), "NativeUnavailable");
        assert!(
            PickwerkError::Native("boom".into())
                .boundary_message()
                .starts_with("NativeError: ")
        );
    }
}
