// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Picker configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PickwerkError, Result};
use crate::types::PickerItemKind;

/// Environment variable naming a JSON config file read by the C factory.
pub const CONFIG_ENV_VAR: &str = "PICKWERK_PICKER_CONFIG";

/// Minimum OS version, compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    #[serde(default)]
    pub patch: u32,
}

impl OsVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl std::fmt::Display for OsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Settings applied to each presentation of the native picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Content kinds the user may pick. Empty means all.
    pub allowed_kinds: Vec<PickerItemKind>,
    /// Allow choosing more than one item in a single presentation.
    pub allows_multiple: bool,
    /// Upper bound on concurrently picked streams (native picker hint).
    pub max_stream_count: Option<u32>,
    /// Bundle identifiers hidden from the picker.
    pub excluded_bundle_ids: Vec<String>,
    /// Oldest OS release on which the native picker is considered usable
    /// (macOS 14 introduced `SCContentSharingPicker`).
    pub minimum_os: OsVersion,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            allowed_kinds: vec![
                PickerItemKind::Window,
                PickerItemKind::Display,
                PickerItemKind::Application,
            ],
            allows_multiple: false,
            max_stream_count: None,
            excluded_bundle_ids: Vec::new(),
            minimum_os: OsVersion::new(14, 0, 0),
        }
    }
}

impl PickerConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Load from the file named by [`CONFIG_ENV_VAR`], falling back to the
    /// defaults when the variable is unset or the file is unusable.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "ignoring unusable picker config");
                Self::default()
            }
        }
    }

    /// Whether items of `kind` may be offered.
    pub fn allows(&self, kind: PickerItemKind) -> bool {
        self.allowed_kinds.is_empty() || self.allowed_kinds.contains(&kind)
    }

    fn validate(&self) -> Result<()> {
        if self.max_stream_count == Some(0) {
            return Err(PickwerkError::InvalidArgument(
                "max_stream_count must be at least 1".into(),
            ));
        }
        if self.allowed_kinds.contains(&PickerItemKind::Unknown) {
            return Err(PickwerkError::InvalidArgument(
                "allowed_kinds may only contain window, display or application".into(),
            ));
        }
        Ok(())
    }
}
