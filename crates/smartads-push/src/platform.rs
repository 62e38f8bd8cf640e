// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OS push registration abstraction.

use smartads_core::error::Result;

/// Remote notification registration with the operating system.
///
/// Both calls only start the OS flow. The device token (or the failure)
/// arrives later through [`PushNotifications`](crate::PushNotifications)'s
/// `did_*` entry points.
pub trait PushPlatform: Send {
    fn register_for_remote_notifications(&self) -> Result<()>;

    fn unregister_for_remote_notifications(&self) -> Result<()>;
}
