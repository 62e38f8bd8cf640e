// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ad network abstraction.
//
// Third-party ad SDKs live behind `AdNetwork`.  They report load and display
// outcomes asynchronously, from whatever thread the SDK uses, through an
// `AdListener`.  The listener only enqueues; the owning `AdService` applies
// the events on its own thread the next time it is called.

use std::sync::mpsc;

use tracing::{debug, info};

use smartads_core::config::ProviderConfig;
use smartads_core::error::Result;
use smartads_core::types::{AdFormat, Consent};

/// Outcome reported by a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEventKind {
    /// A creative is cached and ready to show.
    Loaded,
    /// The load request failed.
    FailedToLoad { reason: String },
    /// The creative is now on screen.
    Showing,
    /// The creative could not be presented.
    FailedToShow { reason: String },
    /// The creative was dismissed. `complete` is true when a rewarded ad was
    /// watched to the end.
    Closed { complete: bool },
}

/// A network report tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEvent {
    pub format: AdFormat,
    /// Registration epoch the listener was issued in.
    pub generation: u64,
    /// Position of the reporting network in its waterfall.
    pub network: usize,
    pub kind: NetworkEventKind,
}

/// Callback handle given to a network for one load or show request.
///
/// Cheap to clone and `Send`, so SDK completion handlers may keep it.
#[derive(Debug, Clone)]
pub struct AdListener {
    format: AdFormat,
    generation: u64,
    network: usize,
    tx: mpsc::Sender<NetworkEvent>,
}

impl AdListener {
    pub(crate) fn new(
        format: AdFormat,
        generation: u64,
        network: usize,
        tx: mpsc::Sender<NetworkEvent>,
    ) -> Self {
        Self {
            format,
            generation,
            network,
            tx,
        }
    }

    pub fn loaded(&self) {
        self.send(NetworkEventKind::Loaded);
    }

    pub fn failed_to_load(&self, reason: impl Into<String>) {
        self.send(NetworkEventKind::FailedToLoad {
            reason: reason.into(),
        });
    }

    pub fn showing(&self) {
        self.send(NetworkEventKind::Showing);
    }

    pub fn failed_to_show(&self, reason: impl Into<String>) {
        self.send(NetworkEventKind::FailedToShow {
            reason: reason.into(),
        });
    }

    pub fn closed(&self, complete: bool) {
        self.send(NetworkEventKind::Closed { complete });
    }

    fn send(&self, kind: NetworkEventKind) {
        let event = NetworkEvent {
            format: self.format,
            generation: self.generation,
            network: self.network,
            kind,
        };
        if self.tx.send(event).is_err() {
            debug!(format = %self.format, "ad service gone, dropping network report");
        }
    }
}

/// A single ad network integration.
pub trait AdNetwork: Send {
    /// Provider name as configured, e.g. `"ADMOB"`.
    fn name(&self) -> &str;

    /// Start loading a creative. Must eventually report `loaded` or
    /// `failed_to_load` on `listener`.
    fn load(&mut self, listener: AdListener);

    /// Present the cached creative. Must report `showing` then `closed`, or
    /// `failed_to_show`.
    fn show(&mut self, listener: AdListener);
}

/// Builds networks from the provider entries of a registration.
pub trait AdNetworkFactory: Send {
    fn create(
        &self,
        provider: &ProviderConfig,
        format: AdFormat,
        consent: Consent,
    ) -> Result<Box<dyn AdNetwork>>;
}

// ---------------------------------------------------------------------------
// Simulated network
// ---------------------------------------------------------------------------

/// Network used where no native ad SDK is linked (desktop, CI).
///
/// Loads instantly; a show opens and immediately closes the ad.
#[derive(Debug, Clone)]
pub struct SimulatedNetwork {
    name: String,
    completes: bool,
}

impl SimulatedNetwork {
    pub fn new(name: impl Into<String>, completes: bool) -> Self {
        Self {
            name: name.into(),
            completes,
        }
    }
}

impl AdNetwork for SimulatedNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, listener: AdListener) {
        listener.loaded();
    }

    fn show(&mut self, listener: AdListener) {
        listener.showing();
        listener.closed(self.completes);
    }
}

/// Factory producing a [`SimulatedNetwork`] for every provider entry.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedNetworkFactory {
    /// Whether simulated ads count as watched to completion.
    pub completes: bool,
}

impl Default for SimulatedNetworkFactory {
    fn default() -> Self {
        Self { completes: true }
    }
}

impl AdNetworkFactory for SimulatedNetworkFactory {
    fn create(
        &self,
        provider: &ProviderConfig,
        format: AdFormat,
        consent: Consent,
    ) -> Result<Box<dyn AdNetwork>> {
        info!(
            provider = %provider.name,
            %format,
            user_consent = consent.user_consent,
            age_restricted = consent.age_restricted,
            "creating simulated ad network"
        );
        Ok(Box::new(SimulatedNetwork::new(&provider.name, self.completes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_tags_events_with_origin() {
        let (tx, rx) = mpsc::channel();
        let listener = AdListener::new(AdFormat::Rewarded, 3, 1, tx);

        listener.loaded();
        listener.failed_to_show("no fill");

        let first = rx.try_recv().expect("first event");
        assert_eq!(first.format, AdFormat::Rewarded);
        assert_eq!(first.generation, 3);
        assert_eq!(first.network, 1);
        assert_eq!(first.kind, NetworkEventKind::Loaded);

        let second = rx.try_recv().expect("second event");
        assert_eq!(
            second.kind,
            NetworkEventKind::FailedToShow {
                reason: "no fill".into()
            }
        );
    }

    #[test]
    fn listener_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        let listener = AdListener::new(AdFormat::Interstitial, 0, 0, tx);
        drop(rx);
        listener.closed(true);
    }

    #[test]
    fn simulated_network_opens_and_closes() {
        let (tx, rx) = mpsc::channel();
        let mut network = SimulatedNetwork::new("TEST", false);
        network.show(AdListener::new(AdFormat::Rewarded, 0, 0, tx));

        let kinds: Vec<_> = rx.try_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NetworkEventKind::Showing,
                NetworkEventKind::Closed { complete: false }
            ]
        );
    }
}
