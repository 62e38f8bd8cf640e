// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS platform bridge via objc2.
//
// Requires compilation with the iOS SDK (Xcode).  Remote notification
// registration goes through UIApplication and must happen on the main thread;
// calls from other threads return `SmartAdsError::Bridge`.
//
// The device token and registration errors come back through the app
// delegate, which forwards them to `_didRegisterForPushNotifications` /
// `_didFailToRegisterForPushNotifications` in the C ABI.

#![cfg(target_os = "ios")]

use objc2::rc::Retained;
use std::ffi::CStr;

use objc2::runtime::{AnyClass, AnyObject};
use objc2::{MainThreadMarker, msg_send};
use objc2_ui_kit::UIApplication;

use smartads_core::error::{Result, SmartAdsError};

use crate::traits::*;

/// `UIUserNotificationTypeBadge | Sound | Alert`.
const USER_NOTIFICATION_TYPES: usize = (1 << 0) | (1 << 1) | (1 << 2);

/// Look up an Objective-C class at runtime. Classes removed from newer SDKs
/// yield `SmartAdsError::Bridge` instead of aborting.
fn lookup_class(name: &CStr) -> Result<&'static AnyClass> {
    AnyClass::get(name).ok_or_else(|| {
        SmartAdsError::Bridge(format!("class {} is not available", name.to_string_lossy()))
    })
}

/// Assert that we are on the main thread and return the marker.
fn require_main_thread() -> Result<MainThreadMarker> {
    MainThreadMarker::new()
        .ok_or_else(|| SmartAdsError::Bridge("must be called from the main thread".into()))
}

/// Concrete iOS platform bridge.
pub struct IosBridge;

impl IosBridge {
    /// Create a new iOS bridge instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for IosBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for IosBridge {
    fn platform_name(&self) -> &str {
        "iOS"
    }
}

// ---------------------------------------------------------------------------
// PushPlatform -- UIApplication remote notifications
// ---------------------------------------------------------------------------

impl PushPlatform for IosBridge {
    /// Request alert, badge and sound permissions, then ask APNs for a
    /// device token.
    fn register_for_remote_notifications(&self) -> Result<()> {
        let mtm = require_main_thread()?;
        let app = UIApplication::sharedApplication(mtm);

        tracing::info!("iOS: registering for remote notifications");

        let settings_class = lookup_class(c"UIUserNotificationSettings")?;
        // SAFETY: `settingsForTypes:categories:` is a class method of
        // UIUserNotificationSettings taking an NSUInteger bitmask and a
        // nullable NSSet. Main thread guaranteed by the marker above.
        let settings: Option<Retained<AnyObject>> = unsafe {
            msg_send![
                settings_class,
                settingsForTypes: USER_NOTIFICATION_TYPES,
                categories: Option::<&AnyObject>::None
            ]
        };
        let settings = settings.ok_or_else(|| {
            SmartAdsError::Bridge("UIUserNotificationSettings could not be created".into())
        })?;

        // SAFETY: documented UIApplication selectors, main thread only.
        unsafe {
            let _: () = msg_send![&*app, registerUserNotificationSettings: &*settings];
            let _: () = msg_send![&*app, registerForRemoteNotifications];
        }
        Ok(())
    }

    fn unregister_for_remote_notifications(&self) -> Result<()> {
        let mtm = require_main_thread()?;
        let app = UIApplication::sharedApplication(mtm);

        tracing::info!("iOS: unregistering for remote notifications");

        // SAFETY: documented UIApplication selector, main thread only.
        unsafe {
            let _: () = msg_send![&*app, unregisterForRemoteNotifications];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_class_is_a_bridge_error() {
        assert!(matches!(
            lookup_class(c"SmartAdsNoSuchClass"),
            Err(SmartAdsError::Bridge(_))
        ));
        assert!(lookup_class(c"UIApplication").is_ok());
    }
}
