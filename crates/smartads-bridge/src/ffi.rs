// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flat C ABI called by the game engine's scripting runtime.
//
// Every entry point only marshals: C strings become typed values, the call is
// forwarded to the runtime, and the result is turned back into a C primitive.
// Null or non-UTF-8 strings count as absent.  Panics are caught here and the
// falsy default is returned instead.

#![allow(non_snake_case)]

use std::ffi::{CStr, CString, c_char, c_int, c_long};
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, warn};

use smartads_core::strings::is_nil_or_empty;
use smartads_core::types::{Consent, DecisionPoint, LogLevel};
use smartads_core::value::{EngageParams, NotificationPayload};

use crate::logging;
use crate::runtime::{EventCallback, pump_events, with_runtime};

// ---------------------------------------------------------------------------
// Marshalling helpers
// ---------------------------------------------------------------------------

/// Run `f`, turning a panic into `fallback`.
fn guard<T>(entry: &'static str, fallback: T, f: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        error!(entry, "panic caught at the C boundary");
        fallback
    })
}

/// Borrow a C string argument.
///
/// # Safety
///
/// `ptr` is null or points to a NUL-terminated string that outlives the call.
unsafe fn opt_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    match unsafe { CStr::from_ptr(ptr) }.to_str() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "ignoring string argument that is not UTF-8");
            None
        }
    }
}

unsafe fn decision_point(ptr: *const c_char) -> Option<DecisionPoint> {
    DecisionPoint::from_optional(unsafe { opt_str(ptr) })
}

unsafe fn engage_params(ptr: *const c_char) -> Option<EngageParams> {
    let raw = unsafe { opt_str(ptr) };
    if is_nil_or_empty(raw) {
        return None;
    }
    match EngageParams::from_json(raw?) {
        Ok(params) => Some(params),
        Err(e) => {
            warn!(error = %e, "ignoring malformed engagement parameters");
            None
        }
    }
}

fn to_c_int(value: bool) -> c_int {
    c_int::from(value)
}

fn to_c_long(value: i64) -> c_long {
    c_long::try_from(value).unwrap_or(c_long::MAX)
}

// ---------------------------------------------------------------------------
// Ad session
// ---------------------------------------------------------------------------

/// # Safety
///
/// `config` is null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _registerForAds(
    config: *const c_char,
    user_consent: bool,
    age_restricted: bool,
) {
    guard("_registerForAds", (), || {
        let config = unsafe { opt_str(config) }.unwrap_or_default();
        let consent = Consent {
            user_consent,
            age_restricted,
        };
        with_runtime(|rt| rt.ads().register_for_ads(config, consent));
    })
}

/// # Safety
///
/// Both arguments are null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _isInterstitialAdAllowed(
    decision_point_name: *const c_char,
    engage_params_json: *const c_char,
    check_time: bool,
) -> c_int {
    guard("_isInterstitialAdAllowed", 0, || {
        let dp = unsafe { decision_point(decision_point_name) };
        let params = unsafe { engage_params(engage_params_json) };
        let allowed = with_runtime(|rt| {
            rt.ads()
                .is_interstitial_ad_allowed(dp.as_ref(), params.as_ref(), check_time)
        });
        to_c_int(allowed.unwrap_or(false))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _hasLoadedInterstitialAd() -> c_int {
    guard("_hasLoadedInterstitialAd", 0, || {
        to_c_int(with_runtime(|rt| rt.ads().has_loaded_interstitial_ad()).unwrap_or(false))
    })
}

/// # Safety
///
/// Both arguments are null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _showInterstitialAd(
    decision_point_name: *const c_char,
    engage_params_json: *const c_char,
) {
    guard("_showInterstitialAd", (), || {
        let dp = unsafe { decision_point(decision_point_name) };
        let params = unsafe { engage_params(engage_params_json) };
        with_runtime(|rt| rt.ads().show_interstitial_ad(dp.as_ref(), params.as_ref()));
    })
}

/// # Safety
///
/// Both arguments are null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _isRewardedAdAllowed(
    decision_point_name: *const c_char,
    engage_params_json: *const c_char,
    check_time: bool,
) -> c_int {
    guard("_isRewardedAdAllowed", 0, || {
        let dp = unsafe { decision_point(decision_point_name) };
        let params = unsafe { engage_params(engage_params_json) };
        let allowed = with_runtime(|rt| {
            rt.ads()
                .is_rewarded_ad_allowed(dp.as_ref(), params.as_ref(), check_time)
        });
        to_c_int(allowed.unwrap_or(false))
    })
}

/// # Safety
///
/// Both arguments are null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _timeUntilRewardedAdAllowed(
    decision_point_name: *const c_char,
    engage_params_json: *const c_char,
) -> c_long {
    guard("_timeUntilRewardedAdAllowed", 0, || {
        let dp = unsafe { decision_point(decision_point_name) };
        let params = unsafe { engage_params(engage_params_json) };
        let seconds = with_runtime(|rt| {
            rt.ads()
                .time_until_rewarded_ad_allowed(dp.as_ref(), params.as_ref())
        });
        to_c_long(seconds.unwrap_or(0))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _hasLoadedRewardedAd() -> c_int {
    guard("_hasLoadedRewardedAd", 0, || {
        to_c_int(with_runtime(|rt| rt.ads().has_loaded_rewarded_ad()).unwrap_or(false))
    })
}

/// # Safety
///
/// Both arguments are null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _showRewardedAd(
    decision_point_name: *const c_char,
    engage_params_json: *const c_char,
) {
    guard("_showRewardedAd", (), || {
        let dp = unsafe { decision_point(decision_point_name) };
        let params = unsafe { engage_params(engage_params_json) };
        with_runtime(|rt| rt.ads().show_rewarded_ad(dp.as_ref(), params.as_ref()));
    })
}

/// Unix seconds of the last close at the decision point, 0 for never.
///
/// # Safety
///
/// `decision_point_name` is null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _getLastShown(decision_point_name: *const c_char) -> c_long {
    guard("_getLastShown", 0, || {
        let Some(dp) = (unsafe { decision_point(decision_point_name) }) else {
            debug!("_getLastShown without a decision point");
            return 0;
        };
        let last = with_runtime(|rt| rt.ads().last_shown(&dp)).and_then(|r| {
            r.inspect_err(|e| warn!(error = %e, "could not read last shown"))
                .ok()
        });
        to_c_long(last.flatten().map_or(0, |at| at.timestamp()))
    })
}

/// # Safety
///
/// `decision_point_name` is null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _getSessionCount(decision_point_name: *const c_char) -> c_long {
    guard("_getSessionCount", 0, || {
        let Some(dp) = (unsafe { decision_point(decision_point_name) }) else {
            return 0;
        };
        let count = with_runtime(|rt| rt.ads().session_count(&dp)).and_then(|r| {
            r.inspect_err(|e| warn!(error = %e, "could not read session count"))
                .ok()
        });
        to_c_long(count.unwrap_or(0))
    })
}

/// # Safety
///
/// `decision_point_name` is null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _getDailyCount(decision_point_name: *const c_char) -> c_long {
    guard("_getDailyCount", 0, || {
        let Some(dp) = (unsafe { decision_point(decision_point_name) }) else {
            return 0;
        };
        let count = with_runtime(|rt| rt.ads().daily_count(&dp)).and_then(|r| {
            r.inspect_err(|e| warn!(error = %e, "could not read daily count"))
                .ok()
        });
        to_c_long(count.unwrap_or(0))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _pause() {
    guard("_pause", (), || {
        with_runtime(|rt| rt.ads().pause());
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _resume() {
    guard("_resume", (), || {
        with_runtime(|rt| rt.ads().resume());
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _destroy() {
    guard("_destroy", (), || {
        with_runtime(|rt| rt.ads().destroy());
    })
}

/// 0 debug, 1 info, 2 warning, 3 error.
#[unsafe(no_mangle)]
pub extern "C" fn _setLoggingLevel(level: c_int) {
    guard("_setLoggingLevel", (), || match LogLevel::from_raw(level) {
        Some(level) => logging::set_level(level),
        None => warn!(level, "ignoring unknown log level"),
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _fireEventNewSession() {
    guard("_fireEventNewSession", (), || {
        if let Some(Err(e)) = with_runtime(|rt| rt.ads().new_session()) {
            warn!(error = %e, "new session failed");
        }
    })
}

// ---------------------------------------------------------------------------
// Push notifications
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn _registerForPushNotifications() {
    guard("_registerForPushNotifications", (), || {
        // The outcome is delivered as an event; nobody awaits the receiver.
        with_runtime(|rt| drop(rt.push().register()));
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _unregisterForPushNotifications() {
    guard("_unregisterForPushNotifications", (), || {
        with_runtime(|rt| rt.push().unregister());
    })
}

/// Called by the app delegate with the device token as text.
///
/// # Safety
///
/// `device_token` is null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _didRegisterForPushNotifications(device_token: *const c_char) {
    guard("_didRegisterForPushNotifications", (), || {
        let token = unsafe { opt_str(device_token) }.unwrap_or_default();
        with_runtime(|rt| rt.push().did_register_with_device_token_string(token));
    })
}

/// # Safety
///
/// `error_message` is null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _didFailToRegisterForPushNotifications(error_message: *const c_char) {
    guard("_didFailToRegisterForPushNotifications", (), || {
        let message = unsafe { opt_str(error_message) }.unwrap_or("Unknown error");
        with_runtime(|rt| rt.push().did_fail_to_register(message));
    })
}

/// Called by the app delegate with the payload that launched the app.
///
/// # Safety
///
/// `payload_json` is null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _didLaunchWithPushNotification(payload_json: *const c_char) {
    guard("_didLaunchWithPushNotification", (), || {
        if let Some(payload) = unsafe { notification_payload(payload_json) } {
            with_runtime(|rt| rt.push().did_launch_with_notification(payload));
        }
    })
}

/// Called by the app delegate for notifications received while running.
///
/// # Safety
///
/// `payload_json` is null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _didReceivePushNotification(payload_json: *const c_char) {
    guard("_didReceivePushNotification", (), || {
        if let Some(payload) = unsafe { notification_payload(payload_json) } {
            with_runtime(|rt| rt.push().did_receive_notification(payload));
        }
    })
}

unsafe fn notification_payload(ptr: *const c_char) -> Option<NotificationPayload> {
    let raw = unsafe { opt_str(ptr) }?;
    NotificationPayload::from_json(raw)
        .inspect_err(|e| warn!(error = %e, "ignoring malformed notification payload"))
        .ok()
}

#[unsafe(no_mangle)]
pub extern "C" fn _applicationDidLaunchWithRemoteNotification() -> c_int {
    guard("_applicationDidLaunchWithRemoteNotification", 0, || {
        to_c_int(
            with_runtime(|rt| rt.push().application_did_launch_with_remote_notification())
                .unwrap_or(false),
        )
    })
}

/// The launch payload as JSON, or null. Consumes the payload; free the
/// result with `_freeString`.
#[unsafe(no_mangle)]
pub extern "C" fn _getRemoteNotification() -> *mut c_char {
    guard("_getRemoteNotification", std::ptr::null_mut(), || {
        let Some(payload) = with_runtime(|rt| rt.push().remote_notification()).flatten() else {
            return std::ptr::null_mut();
        };
        match payload.to_json().map(CString::new) {
            Ok(Ok(json)) => json.into_raw(),
            Ok(Err(e)) => {
                warn!(error = %e, "notification payload contains NUL");
                std::ptr::null_mut()
            }
            Err(e) => {
                warn!(error = %e, "could not serialize notification payload");
                std::ptr::null_mut()
            }
        }
    })
}

/// Release a string returned by this library.
///
/// # Safety
///
/// `ptr` is null or was returned by `_getRemoteNotification` and not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _freeString(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: allocated by CString::into_raw in this library.
    drop(unsafe { CString::from_raw(ptr) });
}

// ---------------------------------------------------------------------------
// Host plumbing
// ---------------------------------------------------------------------------

/// Install (or with null, remove) the event callback.
#[unsafe(no_mangle)]
pub extern "C" fn _setEventCallback(callback: Option<EventCallback>) {
    guard("_setEventCallback", (), || {
        with_runtime(|rt| rt.set_callback(callback));
        debug!(installed = callback.is_some(), "event callback set");
    })
}

/// Deliver queued events through the callback on the calling thread.
#[unsafe(no_mangle)]
pub extern "C" fn _pumpEvents() {
    guard("_pumpEvents", (), || {
        let delivered = pump_events();
        if delivered > 0 {
            debug!(delivered, "events delivered");
        }
    })
}

/// Route a host log line into the SDK log.
///
/// # Safety
///
/// `message` is null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _logToConsole(message: *const c_char) {
    guard("_logToConsole", (), || {
        if let Some(message) = unsafe { opt_str(message) } {
            info!(target: "smartads::host", "{message}");
        }
    })
}
