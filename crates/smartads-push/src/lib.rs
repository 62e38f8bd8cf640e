// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SmartAds Push — push notification registration and launch payload handling.
// The OS side is reached through `PushPlatform`; outcomes flow back through
// the `did_*` entry points called by the native app delegate.

pub mod notifications;
pub mod platform;

pub use notifications::{PushEvent, PushNotifications, PushRegistration};
pub use platform::PushPlatform;
