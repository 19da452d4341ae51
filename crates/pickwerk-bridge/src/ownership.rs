// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strings handed across the C boundary.
//
// A buffer leaves Rust only through `OwnedCString::into_raw` and comes back
// only through `OwnedCString::from_raw` (i.e. `pickwerk_picker_free_c_string`).
// Inside the crate the wrapper is the only representation; raw pointers exist
// at the edge and nowhere else.

use std::ffi::{CStr, CString, c_char};

use pickwerk_core::PickwerkError;

/// A UTF-8, NUL-terminated string whose ownership is transferred to the host.
///
/// The host must release it exactly once with `pickwerk_picker_free_c_string`.
#[derive(Debug, PartialEq, Eq)]
pub struct OwnedCString(CString);

impl OwnedCString {
    /// Build from arbitrary text. Interior NUL bytes would truncate the
    /// message on the C side, so they are replaced with U+FFFD.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cstring = match CString::new(text) {
            Ok(cstring) => cstring,
            Err(e) => {
                let cleaned = String::from_utf8_lossy(&e.into_vec()).replace('\0', "\u{FFFD}");
                // No NUL bytes remain after the replacement.
                CString::new(cleaned).unwrap_or_default()
            }
        };
        Self(cstring)
    }

    /// Boundary message for an error (`"<Code>: <detail>"`).
    pub fn from_error(err: &PickwerkError) -> Self {
        Self::new(err.boundary_message())
    }

    pub fn as_c_str(&self) -> &CStr {
        &self.0
    }

    /// Hand ownership to the host.
    pub fn into_raw(self) -> *const c_char {
        self.0.into_raw().cast_const()
    }

    /// Take ownership back from the host.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer previously returned by
    /// [`OwnedCString::into_raw`] that has not been reclaimed yet.
    pub unsafe fn from_raw(ptr: *const c_char) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        // SAFETY: the caller guarantees `ptr` came from `CString::into_raw`
        // and is reclaimed at most once.
        Some(Self(unsafe { CString::from_raw(ptr.cast_mut()) }))
    }
}

impl std::fmt::Display for OwnedCString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_string_lossy())
    }
}

/// Store an error message in a C out-parameter.
///
/// When `out` is null the host declined the message; it is logged and freed
/// here instead of leaking.
///
/// # Safety
///
/// `out` must be null or valid for a single pointer-sized write.
pub unsafe fn write_error(out: *mut *const c_char, err: &PickwerkError) {
    if out.is_null() {
        tracing::debug!(error = %err, "host passed no error out-parameter");
        return;
    }
    // SAFETY: `out` is non-null and writable per the caller contract.
    unsafe { out.write(OwnedCString::from_error(err).into_raw()) };
}
