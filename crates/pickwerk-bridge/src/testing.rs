// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test helper: a host callback that records every envelope it receives.

use std::ffi::{CStr, c_char, c_void};
use std::sync::{Arc, Mutex};

use pickwerk_core::{PickerEvent, envelope};

use crate::controller::CallbackRegistration;

type Hook = Box<dyn Fn(&PickerEvent) + Send>;

#[derive(Default)]
struct Inner {
    events: Mutex<Vec<PickerEvent>>,
    hook: Mutex<Option<Hook>>,
}

/// Recording callback. Keep the recorder alive for as long as any handle
/// registered with it exists.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Inner>,
}

unsafe extern "C" fn record(event_json: *const c_char, user_data: *mut c_void) {
    // SAFETY: `user_data` is the `Inner` kept alive by the owning `Recorder`,
    // and `event_json` is a valid C string for the duration of this call.
    let inner = unsafe { &*(user_data as *const Inner) };
    let json = unsafe { CStr::from_ptr(event_json) };
    let event = envelope::decode_bytes(json.to_bytes()).expect("envelope decodes");

    inner.events.lock().expect("events").push(event.clone());
    if let Some(hook) = inner.hook.lock().expect("hook").as_ref() {
        hook(&event);
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> unsafe extern "C" fn(*const c_char, *mut c_void) {
        record
    }

    pub fn context(&self) -> *mut c_void {
        Arc::as_ptr(&self.inner) as *mut c_void
    }

    pub fn registration(&self) -> CallbackRegistration {
        CallbackRegistration::new(record, self.context())
    }

    /// Run `hook` from inside the callback after each recorded event.
    pub fn set_hook(&self, hook: impl Fn(&PickerEvent) + Send + 'static) {
        *self.inner.hook.lock().expect("hook") = Some(Box::new(hook));
    }

    pub fn events(&self) -> Vec<PickerEvent> {
        self.inner.events.lock().expect("events").clone()
    }

    pub fn len(&self) -> usize {
        self.inner.events.lock().expect("events").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
