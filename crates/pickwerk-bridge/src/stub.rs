// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub backend for platforms without a native content picker.
//
// Reports itself unavailable, so the controller factory fails with
// `NativeUnavailable` before any other method is reached.

use pickwerk_core::PickerConfig;
use pickwerk_core::error::{PickwerkError, Result};

use crate::traits::{EventSink, NativePicker};

/// Availability probe for this platform.
pub fn is_available() -> bool {
    false
}

/// No-op backend returned where no native picker exists.
pub struct UnavailablePicker;

impl NativePicker for UnavailablePicker {
    fn is_available(&self) -> bool {
        is_available()
    }

    fn register_observers(&mut self) -> Result<()> {
        tracing::warn!("NativePicker::register_observers called on stub backend");
        Err(PickwerkError::Unavailable)
    }

    fn show(&mut self, _config: &PickerConfig, _sink: EventSink) -> Result<()> {
        tracing::warn!("NativePicker::show called on stub backend");
        Err(PickwerkError::Unavailable)
    }

    fn dismiss(&mut self) {}

    fn teardown(&mut self) {}
}
