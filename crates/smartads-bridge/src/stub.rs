// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native mobile APIs are unavailable.
//
// Every trait method returns `PlatformUnavailable`; the real implementation
// lives in the `ios` module.

use smartads_core::error::{Result, SmartAdsError};

use crate::traits::*;

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl PushPlatform for StubBridge {
    fn register_for_remote_notifications(&self) -> Result<()> {
        tracing::warn!("PushPlatform::register_for_remote_notifications called on stub bridge");
        Err(SmartAdsError::PlatformUnavailable)
    }

    fn unregister_for_remote_notifications(&self) -> Result<()> {
        tracing::warn!("PushPlatform::unregister_for_remote_notifications called on stub bridge");
        Err(SmartAdsError::PlatformUnavailable)
    }
}
