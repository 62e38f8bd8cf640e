// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SmartAds — Core types, configuration and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod strings;
pub mod types;
pub mod value;

pub use config::{AdsConfig, BridgeConfig, ProviderConfig};
pub use error::SmartAdsError;
pub use types::*;
pub use value::{EngageParams, NotificationPayload, ParamValue};
