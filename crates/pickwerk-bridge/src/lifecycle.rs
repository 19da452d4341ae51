// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Controller factory and handle-level operations.
//
// Every controller lives in one process-wide registry. Hosts hold only the
// opaque `PickerHandle`; each call resolves it through a generation-checked
// lookup, so a destroyed or forged handle is rejected instead of dereferenced.
// The registry lock is held only for the lookup itself.

use std::ffi::c_void;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pickwerk_core::PickerConfig;
use pickwerk_core::error::{PickwerkError, Result};
use tracing::{debug, warn};

use crate::controller::{CallbackRegistration, Controller, ControllerState};
use crate::registry::{HandleKey, HandleRegistry};
use crate::traits::NativePicker;

static CONTROLLERS: Mutex<HandleRegistry<Arc<Controller>>> = Mutex::new(HandleRegistry::new());

fn controllers() -> MutexGuard<'static, HandleRegistry<Arc<Controller>>> {
    CONTROLLERS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Opaque token for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PickerHandle(HandleKey);

impl PickerHandle {
    /// Pointer form handed across the C boundary. Never null.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.into_raw()
    }

    /// Decode a host-supplied pointer; `None` for null.
    pub fn from_ptr(ptr: *const c_void) -> Option<Self> {
        HandleKey::from_raw(ptr).map(Self)
    }
}

impl std::fmt::Display for PickerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

fn resolve(handle: PickerHandle) -> Result<Arc<Controller>> {
    controllers()
        .get(handle.0)
        .cloned()
        .ok_or(PickwerkError::InvalidHandle)
}

/// Create a controller on `backend` and issue its handle.
///
/// The callback is not invoked here; it first fires after `present`.
pub fn create(
    backend: Box<dyn NativePicker>,
    registration: CallbackRegistration,
    config: PickerConfig,
) -> Result<PickerHandle> {
    let controller = Controller::new(backend, registration, config)?;
    let inserted = controllers().insert(controller);
    match inserted {
        Ok(key) => {
            debug!(handle = %key, "picker handle issued");
            Ok(PickerHandle(key))
        }
        Err(controller) => {
            controller.destroy();
            Err(PickwerkError::AllocationFailure(
                "picker handle table is full".into(),
            ))
        }
    }
}

/// Show the native picker for `handle`.
pub fn present(handle: PickerHandle) -> Result<()> {
    resolve(handle)?.present()
}

/// Cancel the active presentation, if any. Unknown handles are ignored.
pub fn cancel(handle: PickerHandle) {
    match resolve(handle) {
        Ok(controller) => controller.cancel(),
        Err(_) => warn!(handle = %handle, "cancel on unknown picker handle"),
    }
}

/// Destroy `handle`. Once this returns its callback never fires again.
pub fn destroy(handle: PickerHandle) {
    // Unregister first so concurrent lookups fail fast while teardown runs.
    let removed = controllers().remove(handle.0);
    match removed {
        Some(controller) => controller.destroy(),
        None => warn!(handle = %handle, "destroy on unknown or already destroyed picker handle"),
    }
}

/// Current state of `handle`, for diagnostics.
pub fn state(handle: PickerHandle) -> Option<ControllerState> {
    resolve(handle).ok().map(|controller| controller.state())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedRemote;
    use crate::testing::Recorder;

    fn create_simulated(remote: &SimulatedRemote, recorder: &Recorder) -> PickerHandle {
        create(
            Box::new(remote.picker()),
            recorder.registration(),
            PickerConfig::default(),
        )
        .expect("create")
    }

    #[test]
    fn handle_survives_pointer_round_trip() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        let back = PickerHandle::from_ptr(handle.as_ptr()).expect("non-null");
        assert_eq!(back, handle);
        assert_eq!(state(back), Some(ControllerState::Idle));
        destroy(handle);
    }

    #[test]
    fn destroyed_handle_is_invalid() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        destroy(handle);
        assert!(matches!(present(handle), Err(PickwerkError::InvalidHandle)));
        assert_eq!(state(handle), None);
        cancel(handle);
        destroy(handle);
        assert_eq!(remote.teardowns(), 1);
    }

    #[test]
    fn handles_are_independent() {
        let first_remote = SimulatedRemote::new();
        let second_remote = SimulatedRemote::new();
        let first_recorder = Recorder::new();
        let second_recorder = Recorder::new();
        let first = create_simulated(&first_remote, &first_recorder);
        let second = create_simulated(&second_remote, &second_recorder);

        present(first).expect("present first");
        present(second).expect("present second");
        assert!(second_remote.select(["Display 2"]));

        assert!(first_recorder.is_empty());
        assert_eq!(second_recorder.events(), vec![pickwerk_core::PickerEvent::selection(["Display 2"])]);
        assert!(matches!(
            state(first),
            Some(ControllerState::Presenting { .. })
        ));

        destroy(first);
        destroy(second);
    }

    #[test]
    fn structured_targets_reach_the_callback() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        present(handle).expect("present");
        let target = pickwerk_core::CaptureTarget {
            id: "window:com.example.Editor:7".into(),
            label: "Draft - Editor".into(),
            application: Some("Editor".into()),
            kind: pickwerk_core::PickerItemKind::Window,
            filter_blob: vec![1, 2, 3, 0, 255],
            stream_config_blob: Some(vec![9]),
            metadata: Some(serde_json::json!({ "window_id": 7 })),
        };
        assert!(remote.select_targets(vec![target.clone()]));

        assert_eq!(
            recorder.events(),
            vec![pickwerk_core::PickerEvent::selection_of(vec![target])]
        );
        destroy(handle);
    }

    #[test]
    fn config_reaches_the_backend() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let config = PickerConfig {
            allows_multiple: true,
            ..PickerConfig::default()
        };
        let handle = create(Box::new(remote.picker()), recorder.registration(), config)
            .expect("create");

        present(handle).expect("present");
        assert!(remote.last_config().expect("shown").allows_multiple);
        destroy(handle);
    }
}
