// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scriptable stand-in for the native picker.
//
// `SimulatedPicker` is the backend half and lives inside a controller;
// `SimulatedRemote` is the driver half kept by tests (or the mock host) to
// play the user: pick items, dismiss the picker, or make the native side
// fail. Both share one state cell.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pickwerk_core::error::{PickwerkError, Result};
use pickwerk_core::{CaptureTarget, OsVersion, PickerConfig, PickerEvent, PickerItemKind};

use crate::relay::SinkRelay;
use crate::traits::{EventSink, NativePicker};

#[derive(Default)]
struct SimState {
    unavailable: bool,
    deny_permission: bool,
    fail_allocation: bool,
    refuse_show: Option<String>,
    autopilot: Option<(PickerEvent, Duration)>,
    during_show: Option<PickerEvent>,
    os_version: Option<OsVersion>,
    observers: bool,
    sink: Option<EventSink>,
    last_config: Option<PickerConfig>,
    shows: usize,
    dismissals: usize,
    observer_registrations: usize,
    teardowns: usize,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Driver for a [`SimulatedPicker`].
#[derive(Clone, Default)]
pub struct SimulatedRemote {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend wired to this remote. Hand it to the controller factory.
    pub fn picker(&self) -> SimulatedPicker {
        SimulatedPicker {
            state: Arc::clone(&self.state),
        }
    }

    // -- Scripting --

    pub fn set_available(&self, available: bool) {
        lock(&self.state).unavailable = !available;
    }

    /// Observer registration will fail with `PermissionDenied`.
    pub fn deny_permission(&self) {
        lock(&self.state).deny_permission = true;
    }

    /// Observer registration will fail with `AllocationFailure`.
    pub fn fail_allocation(&self) {
        lock(&self.state).fail_allocation = true;
    }

    /// The next `show` fails with a native error carrying `message`.
    pub fn refuse_next_show(&self, message: impl Into<String>) {
        lock(&self.state).refuse_show = Some(message.into());
    }

    /// Answer every presentation with `event` after `delay`, from a separate
    /// thread, the way a user clicking in the real picker would.
    pub fn autopilot(&self, event: PickerEvent, delay: Duration) {
        lock(&self.state).autopilot = Some((event, delay));
    }

    /// The next `show` reports `event` before it returns, the way a native
    /// picker that fails to start synchronously would.
    pub fn report_during_show(&self, event: PickerEvent) {
        lock(&self.state).during_show = Some(event);
    }

    /// OS release the backend reports; `None` (the default) skips the
    /// minimum-version check.
    pub fn set_os_version(&self, version: OsVersion) {
        lock(&self.state).os_version = Some(version);
    }

    // -- Playing the user --

    /// Emit `event` for the active presentation, ending it.
    /// Returns `true` when it reached the host callback.
    pub fn emit(&self, event: PickerEvent) -> bool {
        // Release the lock before emitting: the host callback may re-enter
        // the backend through `present`.
        let sink = lock(&self.state).sink.take();
        match sink {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    pub fn select<I, S>(&self, items: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emit(PickerEvent::selection(items))
    }

    pub fn select_targets(&self, targets: Vec<CaptureTarget>) -> bool {
        self.emit(PickerEvent::selection_of(targets))
    }

    pub fn cancel_by_user(&self) -> bool {
        self.emit(PickerEvent::Cancelled)
    }

    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.emit(PickerEvent::error(message))
    }

    // -- Inspection --

    /// Sink of the active presentation without ending it.
    pub fn current_sink(&self) -> Option<EventSink> {
        lock(&self.state).sink.clone()
    }

    pub fn is_showing(&self) -> bool {
        lock(&self.state).sink.is_some()
    }

    pub fn has_observers(&self) -> bool {
        lock(&self.state).observers
    }

    pub fn last_config(&self) -> Option<PickerConfig> {
        lock(&self.state).last_config.clone()
    }

    pub fn shows(&self) -> usize {
        lock(&self.state).shows
    }

    pub fn dismissals(&self) -> usize {
        lock(&self.state).dismissals
    }

    pub fn observers_registered(&self) -> usize {
        lock(&self.state).observer_registrations
    }

    pub fn teardowns(&self) -> usize {
        lock(&self.state).teardowns
    }
}

/// Backend half of the simulation.
pub struct SimulatedPicker {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPicker {
    /// Backend that answers every presentation with [`mock_preset`].
    pub fn mock() -> Self {
        let remote = SimulatedRemote::new();
        remote.autopilot(mock_preset(), Duration::from_millis(10));
        remote.picker()
    }
}

impl NativePicker for SimulatedPicker {
    fn is_available(&self) -> bool {
        !lock(&self.state).unavailable
    }

    fn os_version(&self) -> Option<OsVersion> {
        lock(&self.state).os_version
    }

    fn register_observers(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.deny_permission {
            return Err(PickwerkError::PermissionDenied);
        }
        if state.fail_allocation {
            return Err(PickwerkError::AllocationFailure(
                "simulated picker could not allocate its controller".into(),
            ));
        }
        state.observers = true;
        state.observer_registrations += 1;
        Ok(())
    }

    fn show(&mut self, config: &PickerConfig, sink: EventSink) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.observers {
            return Err(PickwerkError::Native("observers are not registered".into()));
        }
        if let Some(message) = state.refuse_show.take() {
            return Err(PickwerkError::Native(message));
        }
        state.shows += 1;
        state.last_config = Some(config.clone());

        if let Some(event) = state.during_show.take() {
            drop(state);
            let relay = SinkRelay::new();
            relay.begin_show(sink);
            relay.forward(event);
            relay.end_show();
            return Ok(());
        }
        state.sink = Some(sink);

        if let Some((event, delay)) = state.autopilot.clone() {
            let remote = SimulatedRemote {
                state: Arc::clone(&self.state),
            };
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                remote.emit(event);
            });
        }
        Ok(())
    }

    fn dismiss(&mut self) {
        let mut state = lock(&self.state);
        if state.sink.take().is_some() {
            state.dismissals += 1;
        }
    }

    fn teardown(&mut self) {
        let mut state = lock(&self.state);
        state.sink = None;
        state.observers = false;
        state.teardowns += 1;
    }
}

/// Canned selection: the primary display and a TextEdit window.
pub fn mock_preset() -> PickerEvent {
    PickerEvent::selection_of(vec![
        CaptureTarget {
            id: "display:primary".into(),
            label: "Built-in Retina Display".into(),
            application: Some("System Display".into()),
            kind: PickerItemKind::Display,
            filter_blob: serde_json::to_vec(&serde_json::json!({
                "kind": "display",
                "width": 2560,
                "height": 1600
            }))
            .unwrap_or_default(),
            stream_config_blob: None,
            metadata: Some(serde_json::json!({
                "pixel_density": "retina",
                "refresh_hz": 60
            })),
        },
        CaptureTarget {
            id: "window:com.apple.TextEdit:42".into(),
            label: "Notes.txt - TextEdit".into(),
            application: Some("TextEdit".into()),
            kind: PickerItemKind::Window,
            filter_blob: serde_json::to_vec(&serde_json::json!({
                "kind": "window",
                "window_id": 42,
                "app": "com.apple.TextEdit"
            }))
            .unwrap_or_default(),
            stream_config_blob: None,
            metadata: Some(serde_json::json!({
                "bundle_id": "com.apple.TextEdit",
                "visibility": "hidden"
            })),
        },
    ])
}
