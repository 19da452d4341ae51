// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pickwerk core: types, errors, configuration and the event envelope shared
// by the bridge and its hosts.

pub mod config;
pub mod envelope;
pub mod error;
pub mod types;

pub use config::{OsVersion, PickerConfig};
pub use error::{PickwerkError, Result};
pub use types::*;
