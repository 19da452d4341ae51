// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-handle presentation state machine.
//
//   Idle --present--> Presenting --outcome / cancel--> Idle
//   Idle | Presenting --destroy--> Destroyed (terminal)
//
// Locks, always taken in this order and never held across the host callback:
//   delivery -> state        (event delivery)
//   native                   (present / cancel / destroy, never while holding state)
//
// A forced `cancel` suppresses the outcome: the presentation is retired before
// the native UI is dismissed, so anything the backend emits afterwards is
// stale and dropped.

use std::ffi::{c_char, c_void};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use pickwerk_core::error::{PickwerkError, Result};
use pickwerk_core::{PickerConfig, PickerEvent, envelope};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::traits::{EventSink, NativePicker};

/// Host callback: receives the encoded envelope and the registration context.
/// The envelope pointer is only valid for the duration of the call.
pub type EventCallback = unsafe extern "C" fn(event_json: *const c_char, user_data: *mut c_void);

/// Opaque host context. Never dereferenced, only passed back.
#[derive(Debug, Clone, Copy)]
pub struct UserContext(*mut c_void);

// SAFETY: the bridge never dereferences the pointer; the host owns the
// referent and promises it stays valid for the lifetime of the handle.
unsafe impl Send for UserContext {}
// SAFETY: see above.
unsafe impl Sync for UserContext {}

impl UserContext {
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

/// The (callback, context) pair supplied at creation.
#[derive(Debug, Clone, Copy)]
pub struct CallbackRegistration {
    callback: EventCallback,
    context: UserContext,
}

impl CallbackRegistration {
    pub fn new(callback: EventCallback, context: *mut c_void) -> Self {
        Self {
            callback,
            context: UserContext(context),
        }
    }

    /// Invoke the host callback with an encoded envelope.
    fn invoke(&self, event: &PickerEvent) {
        let payload = match envelope::encode_c(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, kind = event.kind(), "event failed to encode, reporting error instead");
                match envelope::encode_c(&PickerEvent::error(format!("failed to encode event: {e}")))
                {
                    Ok(payload) => payload,
                    Err(_) => return,
                }
            }
        };
        // SAFETY: the host supplied `callback` for exactly this signature and
        // guarantees `context` outlives the handle. `payload` lives until the
        // callback returns.
        unsafe { (self.callback)(payload.as_ptr(), self.context.as_ptr()) };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Presenting { presentation: u64 },
    Destroyed,
}

struct StateCell {
    state: ControllerState,
    presentations: u64,
}

/// One picker controller, owned by the handle registry.
pub struct Controller {
    id: Uuid,
    registration: CallbackRegistration,
    config: PickerConfig,
    alive: AtomicBool,
    state: Mutex<StateCell>,
    native: Mutex<Box<dyn NativePicker>>,
    delivery: Mutex<()>,
    delivering_on: Mutex<Option<ThreadId>>,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking host callback must not wedge the handle forever.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Controller {
    /// Build a controller around `native`, registering its observers.
    ///
    /// On failure the backend is torn down and nothing stays allocated.
    pub fn new(
        mut native: Box<dyn NativePicker>,
        registration: CallbackRegistration,
        config: PickerConfig,
    ) -> Result<Arc<Self>> {
        if !native.is_available() {
            return Err(PickwerkError::Unavailable);
        }
        if let Some(running) = native.os_version() {
            if running < config.minimum_os {
                warn!(%running, minimum = %config.minimum_os, "OS older than the configured minimum");
                return Err(PickwerkError::Unavailable);
            }
        }
        if let Err(e) = native.register_observers() {
            native.teardown();
            return Err(e);
        }

        let controller = Arc::new(Self {
            id: Uuid::new_v4(),
            registration,
            config,
            alive: AtomicBool::new(true),
            state: Mutex::new(StateCell {
                state: ControllerState::Idle,
                presentations: 0,
            }),
            native: Mutex::new(native),
            delivery: Mutex::new(()),
            delivering_on: Mutex::new(None),
        });
        info!(controller = %controller.id, "picker controller created");
        Ok(controller)
    }

    pub fn state(&self) -> ControllerState {
        lock(&self.state).state
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Request the native UI. The outcome arrives later through the callback.
    pub fn present(self: &Arc<Self>) -> Result<()> {
        let presentation = {
            let mut cell = lock(&self.state);
            match cell.state {
                ControllerState::Destroyed => return Err(PickwerkError::InvalidHandle),
                ControllerState::Presenting { presentation } => {
                    warn!(controller = %self.id, presentation, "present rejected: already presenting");
                    return Err(PickwerkError::AlreadyPresenting);
                }
                ControllerState::Idle => {
                    cell.presentations += 1;
                    let presentation = cell.presentations;
                    cell.state = ControllerState::Presenting { presentation };
                    presentation
                }
            }
        };

        let sink = EventSink::new(Arc::downgrade(self), presentation);
        let shown = lock(&self.native).show(&self.config, sink);

        if let Err(e) = shown {
            let mut cell = lock(&self.state);
            if cell.state == (ControllerState::Presenting { presentation }) {
                cell.state = ControllerState::Idle;
            }
            warn!(controller = %self.id, presentation, error = %e, "native picker refused to present");
            return Err(e);
        }

        info!(controller = %self.id, presentation, "picker presented");
        Ok(())
    }

    /// End the active presentation without reporting an outcome.
    /// A no-op when idle; never fails.
    pub fn cancel(&self) {
        let cancelled = {
            let mut cell = lock(&self.state);
            match cell.state {
                ControllerState::Presenting { presentation } => {
                    cell.state = ControllerState::Idle;
                    Some(presentation)
                }
                ControllerState::Idle | ControllerState::Destroyed => None,
            }
        };

        if let Some(presentation) = cancelled {
            lock(&self.native).dismiss();
            info!(controller = %self.id, presentation, "picker presentation cancelled");
        }
        self.wait_for_delivery();
    }

    /// Terminal teardown. Once this returns the callback is never invoked
    /// again for this controller.
    pub fn destroy(&self) {
        {
            let mut cell = lock(&self.state);
            if cell.state == ControllerState::Destroyed {
                warn!(controller = %self.id, "controller destroyed twice");
                return;
            }
            cell.state = ControllerState::Destroyed;
        }
        self.alive.store(false, Ordering::Release);

        {
            let mut native = lock(&self.native);
            native.dismiss();
            native.teardown();
        }
        self.wait_for_delivery();
        info!(controller = %self.id, "picker controller destroyed");
    }

    /// Route a native outcome to the host. Only the first outcome of the
    /// current presentation is delivered; everything else is dropped.
    pub(crate) fn deliver(&self, presentation: u64, event: PickerEvent) -> bool {
        if !self.is_alive() {
            debug!(controller = %self.id, presentation, "dropping event for destroyed controller");
            return false;
        }

        let _serial = lock(&self.delivery);
        {
            let mut cell = lock(&self.state);
            match cell.state {
                ControllerState::Presenting { presentation: current } if current == presentation => {
                    cell.state = ControllerState::Idle;
                }
                state => {
                    debug!(
                        controller = %self.id,
                        presentation,
                        ?state,
                        kind = event.kind(),
                        "dropping stale picker event"
                    );
                    return false;
                }
            }
        }

        debug!(controller = %self.id, presentation, kind = event.kind(), "delivering picker event");
        *lock(&self.delivering_on) = Some(thread::current().id());
        self.registration.invoke(&event);
        *lock(&self.delivering_on) = None;
        true
    }

    /// Block until any in-flight callback has returned. Skipped when called
    /// from inside the callback itself, which would otherwise self-deadlock.
    fn wait_for_delivery(&self) {
        if *lock(&self.delivering_on) == Some(thread::current().id()) {
            return;
        }
        drop(lock(&self.delivery));
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
