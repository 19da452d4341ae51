// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Event envelope codec.
//
// Every outcome crosses the boundary as a self-describing JSON object:
//
//   {"version":1,"type":"selection","items":["Window 1"]}
//   {"version":1,"type":"cancelled"}
//   {"version":1,"type":"error","message":"..."}
//
// The `version` field is bumped on any incompatible schema change; decoders
// refuse versions they do not know.

use std::ffi::CString;

use serde::{Deserialize, Serialize};

use crate::error::{PickwerkError, Result};
use crate::types::PickerEvent;

/// Current envelope schema version.
pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    version: u32,
    #[serde(flatten)]
    event: &'a PickerEvent,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    #[serde(flatten)]
    event: PickerEvent,
}

/// Encode an event as an envelope JSON string.
pub fn encode(event: &PickerEvent) -> Result<String> {
    let json = serde_json::to_string(&EnvelopeOut {
        version: ENVELOPE_VERSION,
        event,
    })?;
    Ok(json)
}

/// Encode an event as a NUL-terminated buffer ready to hand to a callback.
pub fn encode_c(event: &PickerEvent) -> Result<CString> {
    // serde_json escapes U+0000, so an interior NUL means a codec bug.
    CString::new(encode(event)?).map_err(|e| PickwerkError::Envelope(e.to_string()))
}

/// Decode an envelope JSON string.
pub fn decode(json: &str) -> Result<PickerEvent> {
    let envelope: EnvelopeIn = serde_json::from_str(json)?;
    if envelope.version != ENVELOPE_VERSION {
        return Err(PickwerkError::Envelope(format!(
            "unsupported envelope version {} (expected {ENVELOPE_VERSION})",
            envelope.version
        )));
    }
    Ok(envelope.event)
}

/// Decode an envelope from raw UTF-8 bytes (no trailing NUL).
pub fn decode_bytes(bytes: &[u8]) -> Result<PickerEvent> {
    let json = std::str::from_utf8(bytes)
        .map_err(|e| PickwerkError::Envelope(format!("envelope is not valid UTF-8: {e}")))?;
    decode(json)
}
