// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic contract for the native picker collaborator.
//
// The bridge never renders anything itself. A backend shows the system picker
// when asked and reports the outcome later through the `EventSink` it was
// handed for that presentation.

use std::sync::Weak;

use pickwerk_core::error::Result;
use pickwerk_core::{OsVersion, PickerConfig, PickerEvent};

use crate::controller::Controller;

/// A native content picker.
///
/// All methods are called with the controller's backend lock held. A backend
/// must therefore never emit through an [`EventSink`] synchronously from
/// inside `show`; outcomes are reported from the native event source. A
/// backend that cannot rule that out routes its outcomes through a
/// [`SinkRelay`](crate::relay::SinkRelay).
/// Emitting from `dismiss` or `teardown` is allowed and the event is dropped,
/// since the presentation has already ended by then.
pub trait NativePicker: Send {
    /// Whether the capability can be used on this platform right now.
    fn is_available(&self) -> bool;

    /// Release of the running OS, checked against
    /// [`PickerConfig::minimum_os`] when a controller is created. `None`
    /// skips the check.
    fn os_version(&self) -> Option<OsVersion> {
        None
    }

    /// Register the observers that will receive picker outcomes. Called once,
    /// from the controller factory, before the handle is issued.
    fn register_observers(&mut self) -> Result<()>;

    /// Ask the native UI to appear. Returns as soon as the request is made.
    fn show(&mut self, config: &PickerConfig, sink: EventSink) -> Result<()>;

    /// Force the active presentation (if any) to end and forget its sink.
    fn dismiss(&mut self);

    /// Remove all observers and release native resources.
    fn teardown(&mut self);
}

/// Message channel from the native event source into one presentation.
///
/// Each sink is bound to the presentation it was created for; events emitted
/// after that presentation finished, was cancelled, or the controller was
/// destroyed are dropped.
#[derive(Clone)]
pub struct EventSink {
    target: Weak<Controller>,
    presentation: u64,
}

impl EventSink {
    pub(crate) fn new(target: Weak<Controller>, presentation: u64) -> Self {
        Self {
            target,
            presentation,
        }
    }

    /// Sequence number of the presentation this sink reports for.
    pub fn presentation(&self) -> u64 {
        self.presentation
    }

    /// Report an outcome. Returns `true` when the event reached the callback.
    pub fn emit(&self, event: PickerEvent) -> bool {
        match self.target.upgrade() {
            Some(controller) => controller.deliver(self.presentation, event),
            None => {
                tracing::debug!(
                    presentation = self.presentation,
                    kind = event.kind(),
                    "dropping picker event for released controller"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("presentation", &self.presentation)
            .field("attached", &(self.target.strong_count() > 0))
            .finish()
    }
}
