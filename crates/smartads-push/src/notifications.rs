// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Push notification facade.
//
// Registration is modelled as attempts.  `register` opens an attempt (or joins
// the open one) and hands back a oneshot receiver; the first platform report
// resolves every receiver of that attempt and the observer, exactly once.
// Reports that arrive with no attempt open are token refreshes: the token is
// stored and nothing is announced.

use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use smartads_core::strings::md5_hex;
use smartads_core::value::{NotificationPayload, ParamValue};

use crate::platform::PushPlatform;

/// Payload key set by the native side on the notification that launched the app.
const LAUNCH_KEY: &str = "_ddLaunch";
/// Payload key identifying the delivering service.
const SENDER_KEY: &str = "_ddCommunicationSender";
const APPLE_SENDER: &str = "APPLE_NOTIFICATION";

/// Outcome of one registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushRegistration {
    Registered { device_token: String },
    Failed { error: String },
}

/// Everything the observer is told about.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Registration(PushRegistration),
    Notification {
        payload: NotificationPayload,
        /// The notification launched the app.
        launched: bool,
    },
}

impl PushEvent {
    /// Callback method name on the runtime side.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Registration(PushRegistration::Registered { .. }) => {
                "DidRegisterForPushNotifications"
            }
            Self::Registration(PushRegistration::Failed { .. }) => {
                "DidFailToRegisterForPushNotifications"
            }
            Self::Notification { launched: true, .. } => "DidLaunchWithPushNotification",
            Self::Notification { launched: false, .. } => "DidReceivePushNotification",
        }
    }

    /// Callback message: the token, the error, or the payload as JSON.
    pub fn message(&self) -> String {
        match self {
            Self::Registration(PushRegistration::Registered { device_token }) => {
                device_token.clone()
            }
            Self::Registration(PushRegistration::Failed { error }) => error.clone(),
            Self::Notification { payload, .. } => payload.to_json().unwrap_or_else(|e| {
                warn!(error = %e, "could not serialize notification payload");
                "{}".to_owned()
            }),
        }
    }
}

pub type PushObserver = Box<dyn FnMut(&PushEvent) + Send>;

/// Push notification state for one app.
pub struct PushNotifications {
    platform: Box<dyn PushPlatform>,
    observer: Option<PushObserver>,
    /// Receivers of the open registration attempt.
    pending: Option<Vec<oneshot::Sender<PushRegistration>>>,
    device_token: Option<String>,
    launch_notification: Option<NotificationPayload>,
}

impl PushNotifications {
    pub fn new(platform: Box<dyn PushPlatform>) -> Self {
        Self {
            platform,
            observer: None,
            pending: None,
            device_token: None,
            launch_notification: None,
        }
    }

    /// Install the single observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl FnMut(&PushEvent) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Last device token reported by the platform.
    pub fn device_token(&self) -> Option<&str> {
        self.device_token.as_deref()
    }

    pub fn is_registration_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Ask the OS for a device token.
    ///
    /// The receiver resolves with this attempt's outcome. Calling again while
    /// an attempt is open joins it instead of starting another.
    #[instrument(skip(self))]
    pub fn register(&mut self) -> oneshot::Receiver<PushRegistration> {
        let (tx, rx) = oneshot::channel();

        if let Some(waiters) = self.pending.as_mut() {
            debug!(waiters = waiters.len(), "joining pending push registration");
            waiters.push(tx);
            return rx;
        }

        self.pending = Some(vec![tx]);
        match self.platform.register_for_remote_notifications() {
            Ok(()) => info!("registering for push notifications"),
            Err(e) => self.resolve(PushRegistration::Failed {
                error: e.to_string(),
            }),
        }
        rx
    }

    /// Stop receiving notifications and forget the device token. An open
    /// attempt resolves as failed.
    #[instrument(skip(self))]
    pub fn unregister(&mut self) {
        if let Err(e) = self.platform.unregister_for_remote_notifications() {
            warn!(error = %e, "unregister for push notifications failed");
        }
        if self.pending.is_some() {
            self.resolve(PushRegistration::Failed {
                error: "Unregistered before registration completed".into(),
            });
        }
        self.device_token = None;
        info!("unregistered for push notifications");
    }

    /// Platform entry point: raw APNs token bytes.
    pub fn did_register_with_device_token(&mut self, token: &[u8]) {
        self.did_register_with_device_token_string(&hex::encode(token));
    }

    /// Platform entry point: token already rendered as text. Angle brackets
    /// and spaces of `NSData` descriptions are stripped.
    pub fn did_register_with_device_token_string(&mut self, token: &str) {
        let device_token: String = token
            .chars()
            .filter(|c| !matches!(c, '<' | '>' | ' '))
            .collect();
        if device_token.is_empty() {
            self.did_fail_to_register("Empty device token");
            return;
        }

        // The token itself stays out of the log.
        info!(token_md5 = %md5_hex(&device_token), "did register for push notifications");
        self.device_token = Some(device_token.clone());
        self.resolve(PushRegistration::Registered { device_token });
    }

    /// Platform entry point: the OS refused registration.
    pub fn did_fail_to_register(&mut self, error: &str) {
        warn!(%error, "did fail to register for push notifications");
        self.resolve(PushRegistration::Failed {
            error: error.to_owned(),
        });
    }

    /// Platform entry point: the app was launched from `payload`.
    pub fn did_launch_with_notification(&mut self, mut payload: NotificationPayload) {
        debug!("did launch with push notification");
        payload.insert(SENDER_KEY, APPLE_SENDER);
        self.launch_notification = Some(payload.clone());
        self.notify(&PushEvent::Notification {
            payload,
            launched: true,
        });
    }

    /// Platform entry point: a notification arrived. Payloads flagged with
    /// `_ddLaunch` are treated as the launch notification.
    pub fn did_receive_notification(&mut self, mut payload: NotificationPayload) {
        if payload.get(LAUNCH_KEY).and_then(ParamValue::as_bool) == Some(true) {
            self.did_launch_with_notification(payload);
            return;
        }
        debug!("did receive push notification");
        payload.insert(SENDER_KEY, APPLE_SENDER);
        self.notify(&PushEvent::Notification {
            payload,
            launched: false,
        });
    }

    /// Whether a launch payload is waiting. Does not consume it.
    pub fn application_did_launch_with_remote_notification(&self) -> bool {
        self.launch_notification.is_some()
    }

    /// Take the launch payload. Later calls return `None`.
    pub fn remote_notification(&mut self) -> Option<NotificationPayload> {
        self.launch_notification.take()
    }

    fn resolve(&mut self, outcome: PushRegistration) {
        let Some(waiters) = self.pending.take() else {
            debug!(?outcome, "no registration pending, treating as refresh");
            return;
        };

        for waiter in waiters {
            // A dropped receiver just means nobody awaits this attempt.
            let _ = waiter.send(outcome.clone());
        }
        self.notify(&PushEvent::Registration(outcome));
    }

    fn notify(&mut self, event: &PushEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }
}
