// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// C ABI exports (declared in include/pickwerk_picker.h).
//
// Conventions:
// - A handle is an opaque non-null pointer; it is never dereferenced.
// - Failures that happen synchronously are reported by a false/null return
//   plus a caller-owned message in `*error_message`, released with
//   `pickwerk_picker_free_c_string`. On success `*error_message` is untouched.
// - No panic unwinds into the host: each entry point catches it and reports
//   a native error (or logs it where there is no error channel).

use std::ffi::{c_char, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};

use pickwerk_core::PickerConfig;
use pickwerk_core::error::{PickwerkError, Result};
use tracing::error;

use crate::controller::{CallbackRegistration, EventCallback};
use crate::lifecycle::{self, PickerHandle};
use crate::ownership::{OwnedCString, write_error};

fn guarded<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        error!(operation, "panic caught at the C boundary");
        Err(PickwerkError::Native(format!("internal error during {operation}")))
    })
}

/// Whether the native picker can be used in this process.
#[unsafe(no_mangle)]
pub extern "C" fn pickwerk_picker_is_available() -> bool {
    guarded("is_available", || Ok(crate::is_available())).unwrap_or(false)
}

/// Create a picker controller bound to `callback` and `user_data`.
///
/// Returns null on failure and stores a message in `*error_message`.
///
/// # Safety
///
/// - `error_message` must be null or valid for writing one pointer.
/// - `user_data` must stay valid until the handle is destroyed.
/// - `callback` must be safe to call with a NUL-terminated UTF-8 string and
///   `user_data`, from the thread that drives the native picker.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pickwerk_picker_create(
    callback: Option<EventCallback>,
    user_data: *mut c_void,
    error_message: *mut *const c_char,
) -> *mut c_void {
    let created = guarded("create", || {
        let callback = callback
            .ok_or_else(|| PickwerkError::InvalidArgument("callback must not be null".into()))?;
        lifecycle::create(
            crate::platform_backend(),
            CallbackRegistration::new(callback, user_data),
            PickerConfig::from_env(),
        )
    });

    match created {
        Ok(handle) => handle.as_ptr(),
        Err(e) => {
            tracing::warn!(error = %e, "picker controller creation failed");
            // SAFETY: forwarded caller contract on `error_message`.
            unsafe { write_error(error_message, &e) };
            std::ptr::null_mut()
        }
    }
}

/// Present the native picker. Returns `false` and sets `*error_message` when
/// the picker is already presenting, the handle is invalid, or the native
/// side refuses.
///
/// # Safety
///
/// `error_message` must be null or valid for writing one pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pickwerk_picker_present(
    handle: *mut c_void,
    error_message: *mut *const c_char,
) -> bool {
    let presented = guarded("present", || {
        let handle = PickerHandle::from_ptr(handle).ok_or(PickwerkError::InvalidHandle)?;
        lifecycle::present(handle)
    });

    match presented {
        Ok(()) => true,
        Err(e) => {
            // SAFETY: forwarded caller contract on `error_message`.
            unsafe { write_error(error_message, &e) };
            false
        }
    }
}

/// Cancel any active presentation. The cancelled presentation reports no
/// event, and no callback for it runs after this returns.
#[unsafe(no_mangle)]
pub extern "C" fn pickwerk_picker_cancel(handle: *mut c_void) {
    let _ = guarded("cancel", || {
        if let Some(handle) = PickerHandle::from_ptr(handle) {
            lifecycle::cancel(handle);
        }
        Ok(())
    });
}

/// Destroy the controller, removing observers and releasing resources.
/// The callback never runs again once this returns.
#[unsafe(no_mangle)]
pub extern "C" fn pickwerk_picker_destroy(handle: *mut c_void) {
    let _ = guarded("destroy", || {
        if let Some(handle) = PickerHandle::from_ptr(handle) {
            lifecycle::destroy(handle);
        }
        Ok(())
    });
}

/// Free a string allocated by the bridge. Null is a no-op.
///
/// # Safety
///
/// `ptr` must be null or a string returned by this library that has not
/// been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pickwerk_picker_free_c_string(ptr: *const c_char) {
    // SAFETY: forwarded caller contract.
    drop(unsafe { OwnedCString::from_raw(ptr) });
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    use pickwerk_core::PickerEvent;

    use super::*;
    use crate::controller::ControllerState;
    use crate::simulated::SimulatedRemote;
    use crate::testing::Recorder;

    /// Observation window for "no callback fires" assertions.
    const QUIET_PERIOD: Duration = Duration::from_millis(50);

    fn create_simulated(remote: &SimulatedRemote, recorder: &Recorder) -> *mut c_void {
        lifecycle::create(
            Box::new(remote.picker()),
            recorder.registration(),
            PickerConfig::default(),
        )
        .expect("create")
        .as_ptr()
    }

    /// Take ownership of an error out-parameter and return its text.
    fn take_error(ptr: *const c_char) -> String {
        assert!(!ptr.is_null(), "expected an error message");
        // SAFETY: produced by the bridge's allocator, freed exactly once below.
        let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        unsafe { pickwerk_picker_free_c_string(ptr) };
        text
    }

    fn present(handle: *mut c_void) -> std::result::Result<(), String> {
        let mut err: *const c_char = std::ptr::null();
        // SAFETY: `err` is a valid local out-parameter.
        if unsafe { pickwerk_picker_present(handle, &mut err) } {
            assert!(err.is_null(), "success must not allocate an error");
            Ok(())
        } else {
            Err(take_error(err))
        }
    }

    /// Poll `done` for up to two seconds.
    fn wait_until(done: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    #[test]
    fn availability_is_stable() {
        let first = pickwerk_picker_is_available();
        for _ in 0..10 {
            assert_eq!(pickwerk_picker_is_available(), first);
        }
    }

    #[test]
    fn create_returns_handle_xor_error() {
        let recorder = Recorder::new();
        let mut err: *const c_char = std::ptr::null();
        // SAFETY: valid callback, context kept alive by `recorder`, valid out-param.
        let handle =
            unsafe { pickwerk_picker_create(Some(recorder.callback()), recorder.context(), &mut err) };

        if handle.is_null() {
            let message = take_error(err);
            if !crate::is_available() {
                assert!(message.starts_with("NativeUnavailable: "), "got {message}");
            }
        } else {
            assert!(err.is_null());
            pickwerk_picker_destroy(handle);
        }
        assert!(recorder.is_empty(), "creation must not invoke the callback");
    }

    #[test]
    fn null_callback_is_rejected() {
        let mut err: *const c_char = std::ptr::null();
        // SAFETY: valid out-param; null callback is the case under test.
        let handle = unsafe { pickwerk_picker_create(None, std::ptr::null_mut(), &mut err) };
        assert!(handle.is_null());
        assert!(take_error(err).starts_with("InvalidArgument: "));
    }

    fn creation_error(script: impl Fn(&SimulatedRemote)) -> PickwerkError {
        let remote = SimulatedRemote::new();
        script(&remote);
        let recorder = Recorder::new();
        lifecycle::create(
            Box::new(remote.picker()),
            recorder.registration(),
            PickerConfig::default(),
        )
        .unwrap_err()
    }

    #[test]
    fn simulated_failures_surface_their_codes() {
        let denied = creation_error(SimulatedRemote::deny_permission);
        assert_eq!(denied.code(), "PermissionDenied");

        let exhausted = creation_error(SimulatedRemote::fail_allocation);
        assert_eq!(exhausted.code(), "AllocationFailure");

        let absent = creation_error(|remote| remote.set_available(false));
        assert_eq!(absent.code(), "NativeUnavailable");
    }

    #[test]
    fn free_null_is_a_no_op() {
        // SAFETY: null is explicitly allowed.
        unsafe { pickwerk_picker_free_c_string(std::ptr::null()) };
    }

    #[test]
    fn present_on_null_or_destroyed_handle_is_invalid() {
        assert!(present(std::ptr::null_mut()).unwrap_err().starts_with("InvalidHandle: "));

        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);
        pickwerk_picker_destroy(handle);
        assert!(present(handle).unwrap_err().starts_with("InvalidHandle: "));
        assert_eq!(remote.shows(), 0);
    }

    #[test]
    fn selection_end_to_end() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        present(handle).expect("present");
        assert!(remote.select(["Window 1"]));
        assert_eq!(recorder.events(), vec![PickerEvent::selection(["Window 1"])]);

        pickwerk_picker_destroy(handle);
        assert!(!remote.select(["Window 2"]));
        thread::sleep(QUIET_PERIOD);
        assert_eq!(recorder.len(), 1);
        assert!(!remote.has_observers());
    }

    #[test]
    fn back_to_back_present_is_rejected() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        present(handle).expect("first present");
        let err = present(handle).unwrap_err();
        assert!(err.starts_with("AlreadyPresenting: "), "got {err}");
        assert_eq!(remote.shows(), 1, "no duplicate UI");
        assert!(recorder.is_empty(), "no callback");

        pickwerk_picker_destroy(handle);
    }

    #[test]
    fn present_is_reusable_after_each_outcome() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        present(handle).expect("present");
        assert!(remote.fail("stream start failed"));
        present(handle).expect("present after error");
        assert!(remote.cancel_by_user());
        present(handle).expect("present after user cancel");
        assert!(remote.select(["Window 3"]));

        assert_eq!(
            recorder.events(),
            vec![
                PickerEvent::error("stream start failed"),
                PickerEvent::Cancelled,
                PickerEvent::selection(["Window 3"]),
            ]
        );
        pickwerk_picker_destroy(handle);
    }

    #[test]
    fn cancel_on_idle_is_silent() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        pickwerk_picker_cancel(handle);
        pickwerk_picker_cancel(handle);
        thread::sleep(QUIET_PERIOD);
        assert!(recorder.is_empty());
        assert_eq!(remote.dismissals(), 0);

        pickwerk_picker_destroy(handle);
    }

    #[test]
    fn cancel_suppresses_the_outcome() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        present(handle).expect("present");
        let late = remote.current_sink().expect("presenting");
        pickwerk_picker_cancel(handle);

        assert_eq!(remote.dismissals(), 1);
        assert!(!late.emit(PickerEvent::selection(["too late"])));
        thread::sleep(QUIET_PERIOD);
        assert!(recorder.is_empty(), "cancel emits no event");

        let key = PickerHandle::from_ptr(handle).expect("handle");
        assert_eq!(lifecycle::state(key), Some(ControllerState::Idle));
        present(handle).expect("present after cancel");
        pickwerk_picker_destroy(handle);
    }

    #[test]
    fn cancel_waits_for_in_flight_delivery() {
        let remote = SimulatedRemote::new();
        remote.autopilot(PickerEvent::selection(["Window 1"]), Duration::ZERO);
        let recorder = Recorder::new();
        recorder.set_hook(|_| thread::sleep(Duration::from_millis(30)));
        let handle = create_simulated(&remote, &recorder);

        present(handle).expect("present");
        thread::sleep(Duration::from_millis(5));
        pickwerk_picker_cancel(handle);

        // Either the selection won the race and finished before cancel
        // returned, or cancel retired the presentation first. Nothing
        // arrives afterwards in either case.
        let seen = recorder.len();
        assert!(seen <= 1);
        thread::sleep(QUIET_PERIOD);
        assert_eq!(recorder.len(), seen);
        pickwerk_picker_destroy(handle);
    }

    #[test]
    fn destroy_while_presenting_silences_pending_work() {
        let remote = SimulatedRemote::new();
        remote.autopilot(PickerEvent::selection(["Window 1"]), Duration::from_millis(20));
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        present(handle).expect("present");
        pickwerk_picker_destroy(handle);

        thread::sleep(QUIET_PERIOD);
        assert!(recorder.is_empty());
        assert_eq!(remote.teardowns(), 1);
    }

    #[test]
    fn callbacks_for_one_handle_never_overlap() {
        const ROUNDS: usize = 4;

        let remote = SimulatedRemote::new();
        remote.autopilot(PickerEvent::selection(["Window 1"]), Duration::from_millis(1));
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);
        let raw = handle as usize;

        let active = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let (active, overlaps, calls) = (active.clone(), overlaps.clone(), calls.clone());
            recorder.set_hook(move |_| {
                if active.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                // The next outcome is emitted from the autopilot thread while
                // this callback is still running.
                if calls.fetch_add(1, Ordering::SeqCst) + 1 < ROUNDS {
                    present(raw as *mut c_void).expect("re-present from callback");
                }
                thread::sleep(Duration::from_millis(30));
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }

        present(handle).expect("present");
        assert!(wait_until(|| recorder.len() == ROUNDS), "got {} events", recorder.len());
        assert!(wait_until(|| active.load(Ordering::SeqCst) == 0));
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(remote.shows(), ROUNDS);

        pickwerk_picker_destroy(handle);
    }

    #[test]
    fn destroy_waits_for_callback_running_on_another_thread() {
        let remote = SimulatedRemote::new();
        remote.autopilot(PickerEvent::selection(["Window 1"]), Duration::ZERO);
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);

        let started = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        {
            let (started, finished) = (started.clone(), finished.clone());
            recorder.set_hook(move |_| {
                started.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                finished.store(true, Ordering::SeqCst);
            });
        }

        present(handle).expect("present");
        assert!(wait_until(|| started.load(Ordering::SeqCst)));
        pickwerk_picker_destroy(handle);

        assert!(
            finished.load(Ordering::SeqCst),
            "destroy returned while the callback was still running"
        );
        thread::sleep(QUIET_PERIOD);
        assert_eq!(recorder.len(), 1);
        assert_eq!(remote.teardowns(), 1);
    }

    #[test]
    fn outcome_reported_inside_show_is_delivered_after_callback() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);
        let raw = handle as usize;
        {
            let remote = remote.clone();
            let relaunched = AtomicBool::new(false);
            recorder.set_hook(move |_| {
                // Re-present from inside the callback while the backend
                // reports synchronously from `show`.
                if !relaunched.swap(true, Ordering::SeqCst) {
                    remote.report_during_show(PickerEvent::error("start failed"));
                    present(raw as *mut c_void).expect("re-present from callback");
                }
            });
        }

        present(handle).expect("present");
        assert!(remote.cancel_by_user());
        assert!(wait_until(|| recorder.len() == 2), "got {} events", recorder.len());
        assert_eq!(
            recorder.events(),
            vec![PickerEvent::Cancelled, PickerEvent::error("start failed")]
        );
        let key = PickerHandle::from_ptr(handle).expect("handle");
        assert_eq!(lifecycle::state(key), Some(ControllerState::Idle));

        pickwerk_picker_destroy(handle);
    }

    #[test]
    fn callback_may_present_again() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);
        let raw = handle as usize;
        recorder.set_hook(move |event| {
            if matches!(event, PickerEvent::Cancelled) {
                present(raw as *mut c_void).expect("re-present from callback");
            }
        });

        present(handle).expect("present");
        assert!(remote.cancel_by_user());
        assert_eq!(remote.shows(), 2);
        assert!(remote.select(["Window 1"]));
        assert_eq!(
            recorder.events(),
            vec![PickerEvent::Cancelled, PickerEvent::selection(["Window 1"])]
        );
        pickwerk_picker_destroy(handle);
    }

    #[test]
    fn callback_may_destroy_its_own_handle() {
        let remote = SimulatedRemote::new();
        let recorder = Recorder::new();
        let handle = create_simulated(&remote, &recorder);
        let raw = handle as usize;
        recorder.set_hook(move |_| pickwerk_picker_destroy(raw as *mut c_void));

        present(handle).expect("present");
        assert!(remote.select(["Window 1"]));
        assert_eq!(recorder.len(), 1);
        assert!(present(handle).unwrap_err().starts_with("InvalidHandle: "));
    }
}
