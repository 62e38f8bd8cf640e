// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SmartAds — native platform bridge and C ABI.
//
// The flat `extern "C"` surface in `ffi` is what the scripting runtime links
// against.  It forwards to the runtime in `runtime`, which owns the ad and push
// facades.  Platform dispatch follows the target OS: iOS uses objc2, every
// other target gets the stub.

pub mod data_dir;
pub mod ffi;
pub mod logging;
pub mod runtime;
pub mod traits;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(not(target_os = "ios"))]
pub mod stub;

pub use runtime::{BridgeRuntime, OutgoingEvent, install_runtime, pump_events, take_runtime};

/// Retrieve the bridge implementation for the target operating system.
pub fn platform_bridge() -> Box<dyn traits::PlatformBridge> {
    #[cfg(target_os = "ios")]
    {
        // iOS: objc2 message sends to UIKit.
        Box::new(ios::IosBridge::new())
    }
    #[cfg(not(target_os = "ios"))]
    {
        // Desktop/CI: no remote notifications.
        Box::new(stub::StubBridge)
    }
}
