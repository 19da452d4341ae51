// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Async host for the Pickwerk picker bridge.
//!
//! [`PickerSession`] drives the bridge through its C ABI exactly as a foreign
//! host would, and turns the callback envelopes into a `Stream` of
//! [`PickerEvent`]s.

pub mod error;
pub mod session;

pub use error::{Result, SessionError};
pub use pickwerk_core::{CaptureTarget, PickerConfig, PickerEvent, PickerItemKind};
pub use session::{PickerEvents, PickerSession, available};
