// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The bridge runtime: one `AdService` / `PushNotifications` pair plus the
// host callback, kept in the single process-wide slot the C ABI talks to.
//
// The slot is created lazily from `BridgeConfig` on first use.  Hosts that
// link real ad networks or a custom push platform install their own runtime
// before the first C call.

use std::ffi::{CString, c_char};
use std::path::Path;
use std::sync::{LazyLock, Mutex, PoisonError, mpsc};

use tracing::{debug, error, info, warn};

use smartads_core::config::BridgeConfig;
use smartads_core::error::Result;
use smartads_engine::{AdMetrics, AdService, SimulatedNetworkFactory};
use smartads_push::{PushEvent, PushNotifications, PushPlatform};

use crate::traits::PlatformBridge;
use crate::{data_dir, logging, platform_bridge};

/// Bridge settings file inside the data directory.
pub const CONFIG_FILE: &str = "bridge.json";

/// Host callback receiving `(method, message)` pairs as NUL-terminated UTF-8.
pub type EventCallback = unsafe extern "C" fn(method: *const c_char, message: *const c_char);

/// Push events kept while nobody pumps. Newer events are dropped past this.
pub const MAX_QUEUED_PUSH_EVENTS: usize = 64;

/// One queued callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEvent {
    pub method: &'static str,
    pub message: String,
}

/// Adapts the platform bridge to the push facade.
struct PlatformPush(Box<dyn PlatformBridge>);

impl PushPlatform for PlatformPush {
    fn register_for_remote_notifications(&self) -> Result<()> {
        debug!(platform = self.0.platform_name(), "forwarding push registration");
        self.0.register_for_remote_notifications()
    }

    fn unregister_for_remote_notifications(&self) -> Result<()> {
        self.0.unregister_for_remote_notifications()
    }
}

pub struct BridgeRuntime {
    ads: AdService,
    push: PushNotifications,
    push_events: mpsc::Receiver<PushEvent>,
    callback: Option<EventCallback>,
}

impl BridgeRuntime {
    pub fn new(ads: AdService, mut push: PushNotifications) -> Self {
        let (tx, rx) = mpsc::sync_channel(MAX_QUEUED_PUSH_EVENTS);
        push.set_observer(move |event: &PushEvent| match tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(mpsc::TrySendError::Full(event)) => {
                warn!(method = event.method_name(), "push event queue full, dropping event");
            }
            Err(mpsc::TrySendError::Disconnected(_)) => {
                debug!("bridge runtime gone, dropping push event");
            }
        });
        Self {
            ads,
            push,
            push_events: rx,
            callback: None,
        }
    }

    /// Build the default runtime: simulated ad networks, the platform push
    /// bridge, and metrics stored under `data_dir` (in memory without one).
    pub fn from_config(config: &BridgeConfig, data_dir: Option<&Path>) -> Result<Self> {
        let metrics = open_metrics(config, data_dir)?;
        let ads = AdService::new(
            metrics,
            Box::new(SimulatedNetworkFactory {
                completes: config.simulated_ad_completes,
            }),
        );
        let push = PushNotifications::new(Box::new(PlatformPush(platform_bridge())));
        Ok(Self::new(ads, push))
    }

    pub fn ads(&mut self) -> &mut AdService {
        &mut self.ads
    }

    pub fn push(&mut self) -> &mut PushNotifications {
        &mut self.push
    }

    pub fn set_callback(&mut self, callback: Option<EventCallback>) {
        self.callback = callback;
    }

    pub fn callback(&self) -> Option<EventCallback> {
        self.callback
    }

    /// Drain queued ad and push events, ads first.
    pub fn take_outgoing(&mut self) -> Vec<OutgoingEvent> {
        let mut outgoing: Vec<OutgoingEvent> = self
            .ads
            .drain_events()
            .into_iter()
            .map(|event| OutgoingEvent {
                method: event.method_name(),
                message: event.message(),
            })
            .collect();
        outgoing.extend(self.push_events.try_iter().map(|event| OutgoingEvent {
            method: event.method_name(),
            message: event.message(),
        }));
        outgoing
    }
}

fn open_metrics(config: &BridgeConfig, data_dir: Option<&Path>) -> Result<AdMetrics> {
    let dir = config.data_dir.as_deref().or(data_dir);
    if let Some(dir) = dir {
        let path = dir.join(&config.metrics_file);
        match AdMetrics::open(&path) {
            Ok(metrics) => return Ok(metrics),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "falling back to in-memory ad metrics")
            }
        }
    }
    AdMetrics::open_in_memory()
}

// ---------------------------------------------------------------------------
// Process-wide slot
// ---------------------------------------------------------------------------

static RUNTIME: LazyLock<Mutex<Option<BridgeRuntime>>> = LazyLock::new(|| Mutex::new(None));

/// Replace the runtime used by the C ABI. Returns the previous one.
pub fn install_runtime(runtime: BridgeRuntime) -> Option<BridgeRuntime> {
    info!("installing bridge runtime");
    RUNTIME
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(runtime)
}

/// Remove the runtime; the next C call creates a default one.
pub fn take_runtime() -> Option<BridgeRuntime> {
    RUNTIME.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Run `f` against the runtime, creating the default one on first use.
/// `None` when no runtime could be created.
pub fn with_runtime<T>(f: impl FnOnce(&mut BridgeRuntime) -> T) -> Option<T> {
    let mut slot = RUNTIME.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_none() {
        match default_runtime() {
            Ok(runtime) => *slot = Some(runtime),
            Err(e) => {
                error!(error = %e, "could not create bridge runtime");
                return None;
            }
        }
    }
    slot.as_mut().map(f)
}

fn default_runtime() -> Result<BridgeRuntime> {
    let dir = data_dir::data_dir();
    let config = match &dir {
        Some(dir) => BridgeConfig::load(dir.join(CONFIG_FILE)).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable bridge config");
            BridgeConfig::default()
        }),
        None => BridgeConfig::default(),
    };
    logging::init(config.log_level);
    info!(data_dir = ?dir, "creating bridge runtime");
    BridgeRuntime::from_config(&config, dir.as_deref())
}

/// Deliver queued events through the host callback on the calling thread.
///
/// The runtime lock is released before the callback runs, so the host may
/// call back into the bridge. Without a callback events stay queued.
pub fn pump_events() -> usize {
    let Some((callback, events)) =
        with_runtime(|rt| rt.callback().map(|cb| (cb, rt.take_outgoing()))).flatten()
    else {
        return 0;
    };

    let mut delivered = 0;
    for event in events {
        let (Ok(method), Ok(message)) = (CString::new(event.method), CString::new(event.message))
        else {
            warn!(method = event.method, "dropping event with interior NUL");
            continue;
        };
        // SAFETY: both pointers stay valid for the duration of the call; the
        // host contract forbids retaining them.
        unsafe { callback(method.as_ptr(), message.as_ptr()) };
        delivered += 1;
    }
    delivered
}

/// Serialises tests that touch the process-wide slot.
#[cfg(test)]
pub(crate) static TEST_LOCK: Mutex<()> = Mutex::new(());
