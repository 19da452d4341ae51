// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable rendering of picker outcomes.

use std::fmt::Write;

use pickwerk_picker::PickerEvent;

/// One line per chosen item. Structured targets show kind, id and owning
/// application when known.
pub fn summary(event: &PickerEvent) -> String {
    let mut out = String::new();
    match event {
        PickerEvent::Selection { targets, .. } if !targets.is_empty() => {
            for target in targets {
                let _ = write!(out, "{:<12} {}  {}", target.kind.as_str(), target.id, target.label);
                if let Some(app) = &target.application {
                    let _ = write!(out, "  ({app})");
                }
                out.push('\n');
            }
        }
        PickerEvent::Selection { items, .. } => {
            for item in items {
                let _ = writeln!(out, "{item}");
            }
        }
        PickerEvent::Cancelled => out.push_str("cancelled\n"),
        PickerEvent::Error { message } => {
            let _ = writeln!(out, "error: {message}");
        }
    }
    out
}
