// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Picker session: one bridge handle plus the channel its callback feeds.
//
// The callback context is a boxed `SessionContext` whose pointer is the
// handle's `user_data`. It is freed only after the handle is destroyed, and
// destroy guarantees the callback has stopped firing, so the callback never
// sees a dangling context.

use std::ffi::{CStr, c_char, c_void};
use std::pin::Pin;
use std::ptr::NonNull;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_util::stream::Stream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use pickwerk_bridge::ffi::{
    pickwerk_picker_cancel, pickwerk_picker_create, pickwerk_picker_destroy,
    pickwerk_picker_free_c_string, pickwerk_picker_is_available, pickwerk_picker_present,
};
use pickwerk_bridge::simulated::SimulatedPicker;
use pickwerk_bridge::{CallbackRegistration, NativePicker, lifecycle};
use pickwerk_core::{PickerConfig, PickerEvent, envelope};

use crate::error::{Result, SessionError};

/// Whether the native picker can be used in this process.
pub fn available() -> bool {
    pickwerk_picker_is_available()
}

struct SessionContext {
    sender: Mutex<UnboundedSender<PickerEvent>>,
}

impl SessionContext {
    fn send(&self, event: PickerEvent) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.send(event).is_err() {
            debug!("picker event dropped: no listener");
        }
    }
}

unsafe extern "C" fn forward_event(event_json: *const c_char, user_data: *mut c_void) {
    if event_json.is_null() || user_data.is_null() {
        return;
    }
    // SAFETY: `user_data` is the `SessionContext` owned by a live session;
    // the bridge stops calling before the session frees it.
    let context = unsafe { &*(user_data as *const SessionContext) };
    // SAFETY: the bridge passes a NUL-terminated string valid for this call.
    let json = unsafe { CStr::from_ptr(event_json) };

    let event = match envelope::decode_bytes(json.to_bytes()) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "undecodable picker envelope");
            PickerEvent::error(e.boundary_message())
        }
    };
    context.send(event);
}

/// Take ownership of a bridge error string.
fn take_error(ptr: *const c_char, fallback: &str) -> SessionError {
    if ptr.is_null() {
        return SessionError::from_boundary(fallback);
    }
    // SAFETY: `ptr` was just produced by the bridge and not yet freed.
    let message = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
    // SAFETY: released exactly once, through the bridge's own deallocator.
    unsafe { pickwerk_picker_free_c_string(ptr) };
    SessionError::from_boundary(&message)
}

/// Stream of outcomes for one session. Ends when the session is dropped or
/// a newer `listen` replaces it.
pub struct PickerEvents {
    inner: UnboundedReceiverStream<PickerEvent>,
}

impl Stream for PickerEvents {
    type Item = PickerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<PickerEvent>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// One picker controller owned by this process.
pub struct PickerSession {
    handle: NonNull<c_void>,
    context: NonNull<SessionContext>,
}

// SAFETY: the handle is an opaque token validated by the bridge on every
// call, and the context's only state is a Mutex-guarded sender.
unsafe impl Send for PickerSession {}

impl PickerSession {
    /// Controller on the platform backend, configured from the environment.
    pub fn new() -> Result<Self> {
        let context = new_context();
        let mut error: *const c_char = std::ptr::null();
        // SAFETY: `context` stays alive until after destroy (see Drop), and
        // `error` is a valid out-pointer.
        let handle = unsafe {
            pickwerk_picker_create(Some(forward_event), context.as_ptr().cast(), &mut error)
        };
        match NonNull::new(handle) {
            Some(handle) => {
                info!("picker session created");
                Ok(Self { handle, context })
            }
            None => {
                free_context(context);
                Err(take_error(error, "NativeError: failed to initialize native picker"))
            }
        }
    }

    /// Controller on the platform backend with an explicit configuration.
    pub fn new_with(config: PickerConfig) -> Result<Self> {
        Self::from_backend(pickwerk_bridge::platform_backend(), config)
    }

    /// Controller whose every launch yields the canned mock selection.
    pub fn new_mock() -> Result<Self> {
        Self::from_backend(Box::new(SimulatedPicker::mock()), PickerConfig::default())
    }

    /// Controller on any backend.
    pub fn from_backend(backend: Box<dyn NativePicker>, config: PickerConfig) -> Result<Self> {
        let context = new_context();
        let registration = CallbackRegistration::new(forward_event, context.as_ptr().cast());
        match lifecycle::create(backend, registration, config) {
            Ok(handle) => match NonNull::new(handle.as_ptr()) {
                Some(handle) => Ok(Self { handle, context }),
                None => {
                    lifecycle::destroy(handle);
                    free_context(context);
                    Err(SessionError::from_boundary("InvalidHandle: null handle issued"))
                }
            },
            Err(e) => {
                free_context(context);
                Err(e.into())
            }
        }
    }

    /// Show the picker. The outcome arrives on [`PickerSession::listen`].
    pub fn launch(&self) -> Result<()> {
        let mut error: *const c_char = std::ptr::null();
        // SAFETY: `self.handle` came from the bridge; `error` is a valid
        // out-pointer.
        let presented = unsafe { pickwerk_picker_present(self.handle.as_ptr(), &mut error) };
        if presented {
            Ok(())
        } else {
            Err(take_error(error, "NativeError: failed to present native picker"))
        }
    }

    /// Hide the picker. The pending presentation produces no event.
    pub fn stop(&self) {
        pickwerk_picker_cancel(self.handle.as_ptr());
    }

    /// Subscribe to outcomes. Replaces any earlier subscription.
    pub fn listen(&self) -> PickerEvents {
        let (sender, receiver) = mpsc::unbounded_channel();
        // SAFETY: the context outlives `self`.
        let context = unsafe { self.context.as_ref() };
        *context.sender.lock().unwrap_or_else(PoisonError::into_inner) = sender;
        PickerEvents {
            inner: UnboundedReceiverStream::new(receiver),
        }
    }
}

impl Drop for PickerSession {
    fn drop(&mut self) {
        pickwerk_picker_destroy(self.handle.as_ptr());
        free_context(self.context);
        info!("picker session closed");
    }
}

fn new_context() -> NonNull<SessionContext> {
    // A closed sender until the first `listen`.
    let (sender, _) = mpsc::unbounded_channel();
    let boxed = Box::new(SessionContext {
        sender: Mutex::new(sender),
    });
    NonNull::from(Box::leak(boxed))
}

fn free_context(context: NonNull<SessionContext>) {
    // SAFETY: allocated by `new_context`, and no handle refers to it anymore.
    drop(unsafe { Box::from_raw(context.as_ptr()) });
}
