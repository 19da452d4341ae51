// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Holds the sink of the presentation in flight for backends whose native
// event source may report from inside `show`.
//
// An outcome that arrives while `show` is still running is parked and handed
// to a worker thread once `show` returns, so it is never delivered with the
// controller's backend lock held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use pickwerk_core::PickerEvent;
use tracing::debug;

use crate::traits::EventSink;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What [`SinkRelay::forward`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// No presentation was armed; the event was discarded.
    Dropped,
    /// Handed to the presentation's sink. The presentation is over.
    Sent,
    /// Arrived inside `show`; delivered once `show` returns.
    Deferred,
}

#[derive(Debug, Default)]
pub struct SinkRelay {
    sink: Mutex<Option<EventSink>>,
    in_show: AtomicBool,
    parked: Mutex<Option<PickerEvent>>,
}

impl SinkRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for a new presentation. Call at the start of `show`.
    pub fn begin_show(&self, sink: EventSink) {
        *lock(&self.parked) = None;
        *lock(&self.sink) = Some(sink);
        self.in_show.store(true, Ordering::Release);
    }

    /// Leave `show`. A parked outcome is delivered from a worker thread.
    pub fn end_show(&self) {
        self.in_show.store(false, Ordering::Release);
        let Some(event) = lock(&self.parked).take() else {
            return;
        };
        let Some(sink) = lock(&self.sink).take() else {
            return;
        };
        debug!(
            presentation = sink.presentation(),
            kind = event.kind(),
            "delivering outcome reported during show"
        );
        thread::spawn(move || {
            sink.emit(event);
        });
    }

    /// Route one outcome. Only the first outcome of a presentation counts.
    pub fn forward(&self, event: PickerEvent) -> Forwarded {
        if self.in_show.load(Ordering::Acquire) {
            if lock(&self.sink).is_none() {
                return Forwarded::Dropped;
            }
            let mut parked = lock(&self.parked);
            if parked.is_none() {
                *parked = Some(event);
            }
            return Forwarded::Deferred;
        }

        let Some(sink) = lock(&self.sink).take() else {
            debug!(kind = event.kind(), "picker event with no presentation");
            return Forwarded::Dropped;
        };
        sink.emit(event);
        Forwarded::Sent
    }

    /// Forget the armed presentation. Returns whether one was armed.
    pub fn disarm(&self) -> bool {
        *lock(&self.parked) = None;
        lock(&self.sink).take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.sink).is_some()
    }
}
