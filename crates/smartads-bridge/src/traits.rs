// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities.

pub use smartads_push::PushPlatform;

/// Native capabilities the bridge needs from the host OS.
///
/// Platforms without remote notifications return
/// `SmartAdsError::PlatformUnavailable` from the stub implementation.
pub trait PlatformBridge: PushPlatform {
    /// Human-readable platform name (e.g. "iOS").
    fn platform_name(&self) -> &str;
}
