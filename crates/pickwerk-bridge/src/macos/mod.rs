// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// macOS backend: ScreenCaptureKit's `SCContentSharingPicker` via objc2.
//
// Requires macOS 14 or later at runtime; older systems report unavailable.
// The picker is a process-wide singleton. Each controller adds its own
// observer object, which holds the event sink of the presentation in flight
// and forwards the first outcome through it, then deactivates the picker.
// The configured `minimum_os` is checked against the running release when a
// controller is created.
//
// `present` must run on the main thread, matching AppKit's rules; calls from
// elsewhere fail with a native error instead of presenting.
//
// Unsafe code here is limited to message sends against documented
// ScreenCaptureKit and Foundation selectors and to declaring the observer
// class with `define_class!`.

#![cfg(all(target_os = "macos", feature = "native"))]

use objc2::rc::Retained;
use objc2::runtime::{AnyClass, AnyObject, Bool, NSObject};
use objc2::{AllocAnyThread, DefinedClass, MainThreadMarker, define_class, msg_send};
use objc2_foundation::{
    NSArray, NSData, NSNumber, NSOperatingSystemVersion, NSProcessInfo, NSRect, NSString,
};
use uuid::Uuid;

use pickwerk_core::error::{PickwerkError, Result};
use pickwerk_core::{CaptureTarget, OsVersion, PickerConfig, PickerEvent, PickerItemKind};

use crate::relay::{Forwarded, SinkRelay};
use crate::traits::{EventSink, NativePicker};

#[link(name = "ScreenCaptureKit", kind = "framework")]
unsafe extern "C" {}

// ---------------------------------------------------------------------------
// ScreenCaptureKit constants
// ---------------------------------------------------------------------------

/// `SCContentSharingPickerMode` option bits.
const MODE_SINGLE_WINDOW: usize = 1 << 0;
const MODE_MULTIPLE_WINDOWS: usize = 1 << 1;
const MODE_SINGLE_APPLICATION: usize = 1 << 2;
const MODE_MULTIPLE_APPLICATIONS: usize = 1 << 3;
const MODE_SINGLE_DISPLAY: usize = 1 << 4;

/// `SCShareableContentStyle` values.
const STYLE_WINDOW: isize = 1;
const STYLE_DISPLAY: isize = 2;
const STYLE_APPLICATION: isize = 3;

/// `SCStreamErrorDomain` and `SCStreamErrorUserDeclined`.
const STREAM_ERROR_DOMAIN: &str = "com.apple.ScreenCaptureKit.SCStreamErrorDomain";
const USER_DECLINED: isize = -3801;

/// First release shipping `SCContentSharingPicker`.
const MINIMUM_MAJOR: isize = 14;

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// macOS 14+ and the picker class is present in the loaded ScreenCaptureKit.
pub fn is_available() -> bool {
    let version = NSOperatingSystemVersion {
        majorVersion: MINIMUM_MAJOR,
        minorVersion: 0,
        patchVersion: 0,
    };
    // SAFETY: plain NSProcessInfo query, valid on every thread.
    #[allow(unused_unsafe)]
    let recent_enough =
        unsafe { NSProcessInfo::processInfo().isOperatingSystemAtLeastVersion(version) };
    recent_enough && AnyClass::get(c"SCContentSharingPicker").is_some()
}

/// Release of the running macOS.
fn running_os() -> OsVersion {
    // SAFETY: plain NSProcessInfo query, valid on every thread.
    #[allow(unused_unsafe)]
    let version = unsafe { NSProcessInfo::processInfo().operatingSystemVersion() };
    OsVersion::new(
        version.majorVersion as u32,
        version.minorVersion as u32,
        version.patchVersion as u32,
    )
}

fn shared_picker() -> Result<Retained<AnyObject>> {
    // SAFETY: `+[SCContentSharingPicker sharedPicker]` is a documented class
    // property; the class exists because availability was checked first.
    let picker: Option<Retained<AnyObject>> =
        unsafe { msg_send![objc2::class!(SCContentSharingPicker), sharedPicker] };
    picker.ok_or_else(|| {
        PickwerkError::AllocationFailure("SCContentSharingPicker.sharedPicker returned nil".into())
    })
}

/// Hide the shared picker UI.
fn deactivate() {
    if let Ok(picker) = shared_picker() {
        // SAFETY: deactivating hides the picker UI.
        unsafe {
            let _: () = msg_send![&picker, setActive: false];
        }
    }
}

fn picker_modes(config: &PickerConfig) -> usize {
    let mut modes = 0;
    if config.allows(PickerItemKind::Window) {
        modes |= if config.allows_multiple {
            MODE_MULTIPLE_WINDOWS
        } else {
            MODE_SINGLE_WINDOW
        };
    }
    if config.allows(PickerItemKind::Application) {
        modes |= if config.allows_multiple {
            MODE_MULTIPLE_APPLICATIONS
        } else {
            MODE_SINGLE_APPLICATION
        };
    }
    if config.allows(PickerItemKind::Display) {
        modes |= MODE_SINGLE_DISPLAY;
    }
    modes
}

// ---------------------------------------------------------------------------
// Filter -> CaptureTarget
// ---------------------------------------------------------------------------

fn capture_target(filter: &AnyObject) -> Result<CaptureTarget> {
    // SAFETY: `style`, `contentRect` and `pointPixelScale` are SCContentFilter
    // properties available on macOS 14.
    let (style, rect, scale): (isize, NSRect, f32) = unsafe {
        (
            msg_send![filter, style],
            msg_send![filter, contentRect],
            msg_send![filter, pointPixelScale],
        )
    };

    let kind = match style {
        STYLE_WINDOW => PickerItemKind::Window,
        STYLE_DISPLAY => PickerItemKind::Display,
        STYLE_APPLICATION => PickerItemKind::Application,
        _ => PickerItemKind::Unknown,
    };

    // SAFETY: NSKeyedArchiver class method; SCContentFilter adopts
    // NSSecureCoding. A nil result is handled below.
    let archived: Option<Retained<NSData>> = unsafe {
        msg_send![
            objc2::class!(NSKeyedArchiver),
            archivedDataWithRootObject: filter,
            requiringSecureCoding: Bool::YES,
            error: std::ptr::null_mut::<*mut AnyObject>()
        ]
    };
    let filter_blob = archived
        .map(|data| data.to_vec())
        .ok_or_else(|| PickwerkError::Native("content filter could not be archived".into()))?;

    Ok(CaptureTarget {
        id: format!("{}:{}", kind.as_str(), Uuid::new_v4()),
        label: format!("Selected {}", kind.as_str()),
        application: None,
        kind,
        filter_blob,
        stream_config_blob: None,
        metadata: Some(serde_json::json!({
            "content_rect": [rect.origin.x, rect.origin.y, rect.size.width, rect.size.height],
            "point_pixel_scale": scale,
        })),
    })
}

/// Boundary message for an `NSError` reported by the picker. A declined
/// capture maps to `PermissionDenied`.
fn error_message(error: &AnyObject) -> String {
    // SAFETY: `domain`, `code` and `localizedDescription` are NSError
    // accessors that never return nil.
    let (domain, code, description): (Retained<NSString>, isize, Retained<NSString>) = unsafe {
        (
            msg_send![error, domain],
            msg_send![error, code],
            msg_send![error, localizedDescription],
        )
    };
    if code == USER_DECLINED && domain.to_string() == STREAM_ERROR_DOMAIN {
        return PickwerkError::PermissionDenied.boundary_message();
    }
    PickwerkError::Native(format!("{description} ({domain} {code})")).boundary_message()
}

// ---------------------------------------------------------------------------
// Observer (SCContentSharingPickerObserver)
// ---------------------------------------------------------------------------

struct ObserverIvars {
    /// Presentation in flight. ScreenCaptureKit may report a start failure
    /// from inside `present`, so outcomes go through the relay.
    relay: SinkRelay,
}

// SAFETY: define_class! #[unsafe(super(NSObject))] declares PickerObserver as
// an ObjC class inheriting from NSObject. ScreenCaptureKit only sends the
// three observer selectors implemented below; protocol conformance is not
// checked at runtime.
define_class! {
    #[unsafe(super(NSObject))]
    #[name = "PickwerkContentSharingObserver"]
    #[ivars = ObserverIvars]
    struct PickerObserver;

    impl PickerObserver {
        /// The user closed the picker without choosing.
        #[unsafe(method(contentSharingPicker:didCancelForStream:))]
        fn did_cancel(&self, _picker: &AnyObject, _stream: Option<&AnyObject>) {
            self.forward(PickerEvent::Cancelled);
        }

        /// The user chose content; `filter` describes it.
        #[unsafe(method(contentSharingPicker:didUpdateWithFilter:forStream:))]
        fn did_update(&self, _picker: &AnyObject, filter: &AnyObject, _stream: Option<&AnyObject>) {
            let event = match capture_target(filter) {
                Ok(target) => PickerEvent::selection_of(vec![target]),
                Err(e) => PickerEvent::error(e.to_string()),
            };
            self.forward(event);
        }

        /// The picker failed to start.
        #[unsafe(method(contentSharingPickerStartDidFailWithError:))]
        fn did_fail(&self, error: &AnyObject) {
            self.forward(PickerEvent::error(error_message(error)));
        }
    }
}

impl PickerObserver {
    fn new() -> Retained<Self> {
        let this = Self::alloc().set_ivars(ObserverIvars {
            relay: SinkRelay::new(),
        });
        // SAFETY: Standard NSObject init via super.
        unsafe { msg_send![super(this), init] }
    }

    fn relay(&self) -> &SinkRelay {
        &self.ivars().relay
    }

    fn forward(&self, event: PickerEvent) {
        // The picker stays active until told otherwise; hide it once the
        // presentation has its outcome.
        if self.relay().is_armed() {
            deactivate();
        }
        if self.relay().forward(event) == Forwarded::Deferred {
            tracing::debug!("macOS: outcome reported during present, deferred");
        }
    }
}

// ---------------------------------------------------------------------------
// ContentSharingPicker
// ---------------------------------------------------------------------------

/// `SCContentSharingPicker` backend.
pub struct ContentSharingPicker {
    observer: Option<Retained<PickerObserver>>,
}

// SAFETY: the observer's only mutable state is its `SinkRelay`, and the
// shared picker is driven through message sends that ScreenCaptureKit
// serializes internally.
unsafe impl Send for ContentSharingPicker {}

impl ContentSharingPicker {
    pub fn new() -> Self {
        Self { observer: None }
    }
}

impl Default for ContentSharingPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl NativePicker for ContentSharingPicker {
    fn is_available(&self) -> bool {
        crate::is_available()
    }

    fn os_version(&self) -> Option<OsVersion> {
        Some(running_os())
    }

    fn register_observers(&mut self) -> Result<()> {
        let picker = shared_picker()?;
        let observer = PickerObserver::new();
        // SAFETY: `-addObserver:` retains nothing we rely on beyond the
        // observer object, which we keep alive until `teardown`.
        unsafe {
            let _: () = msg_send![&picker, addObserver: &*observer];
        }
        tracing::info!("macOS: content sharing observer registered");
        self.observer = Some(observer);
        Ok(())
    }

    fn show(&mut self, config: &PickerConfig, sink: EventSink) -> Result<()> {
        let _mtm = MainThreadMarker::new()
            .ok_or_else(|| PickwerkError::Native("must be called from the main thread".into()))?;
        let observer = self
            .observer
            .as_ref()
            .ok_or_else(|| PickwerkError::Native("observer is not registered".into()))?;
        let picker = shared_picker()?;

        let excluded: Vec<Retained<NSString>> = config
            .excluded_bundle_ids
            .iter()
            .map(|id| NSString::from_str(id))
            .collect();
        let excluded = NSArray::from_retained_slice(&excluded);

        // SAFETY: SCContentSharingPickerConfiguration and SCContentSharingPicker
        // selectors documented for macOS 14; main thread guaranteed above.
        unsafe {
            let configuration: Retained<AnyObject> =
                msg_send![objc2::class!(SCContentSharingPickerConfiguration), new];
            let _: () = msg_send![&configuration, setAllowedPickerModes: picker_modes(config)];
            let _: () = msg_send![&configuration, setExcludedBundleIDs: &*excluded];
            let _: () = msg_send![&picker, setDefaultConfiguration: &*configuration];

            if let Some(max) = config.max_stream_count {
                let max = NSNumber::new_u32(max);
                let _: () = msg_send![&picker, setMaximumStreamCount: &*max];
            }
        }

        observer.relay().begin_show(sink);
        // SAFETY: see above.
        unsafe {
            let _: () = msg_send![&picker, setActive: true];
            let _: () = msg_send![&picker, present];
        }
        observer.relay().end_show();
        tracing::info!(modes = picker_modes(config), "macOS: presenting SCContentSharingPicker");
        Ok(())
    }

    fn dismiss(&mut self) {
        let Some(observer) = self.observer.as_ref() else {
            return;
        };
        if observer.relay().disarm() {
            deactivate();
            tracing::info!("macOS: picker dismissed");
        }
    }

    fn teardown(&mut self) {
        let Some(observer) = self.observer.take() else {
            return;
        };
        observer.relay().disarm();
        if let Ok(picker) = shared_picker() {
            // SAFETY: removing an observer previously added in
            // `register_observers`.
            unsafe {
                let _: () = msg_send![&picker, removeObserver: &*observer];
            }
        }
        tracing::info!("macOS: content sharing observer removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_follow_config() {
        let single = PickerConfig::default();
        assert_eq!(
            picker_modes(&single),
            MODE_SINGLE_WINDOW | MODE_SINGLE_APPLICATION | MODE_SINGLE_DISPLAY
        );

        let windows_only = PickerConfig {
            allowed_kinds: vec![PickerItemKind::Window],
            allows_multiple: true,
            ..PickerConfig::default()
        };
        assert_eq!(picker_modes(&windows_only), MODE_MULTIPLE_WINDOWS);
    }
}
