// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pickwerk picker bridge.

use serde::{Deserialize, Serialize};

/// Simplified classification so hosts can group windows vs displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickerItemKind {
    Window,
    Display,
    Application,
    #[serde(other)]
    Unknown,
}

impl PickerItemKind {
    /// Wire keyword for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Window => "window",
            Self::Display => "display",
            Self::Application => "application",
            Self::Unknown => "unknown",
        }
    }
}

/// A capture target chosen in the native picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureTarget {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    pub kind: PickerItemKind,
    /// Serialized content filter. Opaque to hosts; base64 on the wire.
    #[serde(rename = "filter", with = "base64_bytes", default)]
    pub filter_blob: Vec<u8>,
    /// Serialized stream configuration, when the native side provides one.
    #[serde(
        rename = "configuration",
        with = "base64_opt_bytes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stream_config_blob: Option<Vec<u8>>,
    /// Free-form metadata surfaced for previews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Outcome of a single presentation.
///
/// On the wire this is the body of the event envelope, discriminated by the
/// `type` field (see [`crate::envelope`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PickerEvent {
    /// The user chose one or more items.
    Selection {
        /// Identifiers of the chosen items, in selection order.
        items: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        targets: Vec<CaptureTarget>,
    },
    /// The user dismissed the picker without choosing.
    Cancelled,
    /// The native picker failed after presentation began.
    Error { message: String },
}

impl PickerEvent {
    /// Selection carrying bare identifiers.
    pub fn selection<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Selection {
            items: items.into_iter().map(Into::into).collect(),
            targets: Vec::new(),
        }
    }

    /// Selection built from structured targets; `items` mirrors their ids.
    pub fn selection_of(targets: Vec<CaptureTarget>) -> Self {
        Self::Selection {
            items: targets.iter().map(|t| t.id.clone()).collect(),
            targets,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Discriminant as written on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Selection { .. } => "selection",
            Self::Cancelled => "cancelled",
            Self::Error { .. } => "error",
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

mod base64_opt_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
