// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Pickwerk: bridge between a host process and the system content picker.
//!
//! Hosts in any language drive the picker through the C ABI in [`ffi`]
//! (`include/pickwerk_picker.h`): create a controller bound to a callback,
//! present the picker, and receive the outcome later as a JSON envelope.
//! Rust hosts can use [`lifecycle`] directly.
//!
//! Threading: calls are expected from the thread that drives the native UI.
//! Callbacks for one handle never overlap, and none fires after `cancel`
//! (for the cancelled presentation) or `destroy` has returned.

pub mod controller;
pub mod ffi;
pub mod lifecycle;
pub mod ownership;
pub mod registry;
pub mod relay;
pub mod simulated;
pub mod traits;

#[cfg(all(target_os = "macos", feature = "native"))]
pub mod macos;

#[cfg(not(all(target_os = "macos", feature = "native")))]
pub mod stub;

#[cfg(test)]
mod testing;

use std::sync::OnceLock;

pub use controller::{CallbackRegistration, ControllerState, EventCallback};
pub use lifecycle::PickerHandle;
pub use traits::{EventSink, NativePicker};

/// Whether the native picker can be used in this process.
///
/// Probed once and cached, so repeated calls agree and never touch the UI.
pub fn is_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        let available = probe();
        tracing::debug!(available, "native picker availability probed");
        available
    })
}

fn probe() -> bool {
    #[cfg(all(target_os = "macos", feature = "native"))]
    {
        macos::is_available()
    }
    #[cfg(all(not(all(target_os = "macos", feature = "native")), feature = "mock"))]
    {
        true
    }
    #[cfg(not(any(all(target_os = "macos", feature = "native"), feature = "mock")))]
    {
        stub::is_available()
    }
}

/// The backend used by the C factory on this platform.
pub fn platform_backend() -> Box<dyn NativePicker> {
    #[cfg(all(target_os = "macos", feature = "native"))]
    {
        // macOS: ScreenCaptureKit's SCContentSharingPicker through objc2.
        Box::new(macos::ContentSharingPicker::new())
    }
    #[cfg(all(not(all(target_os = "macos", feature = "native")), feature = "mock"))]
    {
        // Mock builds answer every presentation with a canned selection.
        Box::new(simulated::SimulatedPicker::mock())
    }
    #[cfg(not(any(all(target_os = "macos", feature = "native"), feature = "mock")))]
    {
        // Everything else: reports unavailable.
        Box::new(stub::UnavailablePicker)
    }
}
