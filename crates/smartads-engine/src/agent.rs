// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-format ad agent.
//
// An agent owns the waterfall of networks built for one ad format and walks
// it: load from the current network, show when asked, then move on to the
// next network and load again.  State machine:
//
//   Ready --request--> Loading --loaded--> Loaded --showing--> Showing
//     ^                   |                  |                    |
//     +---failed_to_load--+--failed_to_show--+------closed--------+
//
// The agent never touches metrics or the outgoing event queue; it reports an
// `AgentTransition` and leaves the bookkeeping to the service.

use std::sync::mpsc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use smartads_core::types::{AdFormat, DecisionPoint};

use crate::network::{AdListener, AdNetwork, NetworkEvent, NetworkEventKind};

/// Where an agent is in its load/show cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Ready,
    Loading,
    Loaded,
    Showing,
}

/// What a network report changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentTransition {
    Loaded {
        network: String,
    },
    LoadFailed {
        network: String,
        reason: String,
    },
    Opened {
        network: String,
        decision_point: Option<DecisionPoint>,
    },
    Closed {
        network: String,
        decision_point: Option<DecisionPoint>,
        complete: bool,
    },
    ShowFailed {
        network: String,
        reason: String,
    },
    /// Stale or out-of-order report; nothing changed.
    Ignored,
}

struct NetworkSlot {
    network: Box<dyn AdNetwork>,
    /// Ads shown by this network in the current session.
    shown: u32,
}

/// Drives the waterfall of one ad format.
pub struct AdAgent {
    format: AdFormat,
    slots: Vec<NetworkSlot>,
    current: usize,
    state: AgentState,
    max_per_session: Option<u32>,
    max_per_network: Option<u32>,
    /// Consecutive load failures; a full round without a fill stops loading.
    failed_in_round: usize,
    show_requested: bool,
    decision_point: Option<DecisionPoint>,
    last_show_time: Option<DateTime<Utc>>,
    shown_count: u32,
    generation: u64,
    tx: mpsc::Sender<NetworkEvent>,
}

impl AdAgent {
    pub fn new(
        format: AdFormat,
        networks: Vec<Box<dyn AdNetwork>>,
        max_per_session: Option<u32>,
        max_per_network: Option<u32>,
        generation: u64,
        tx: mpsc::Sender<NetworkEvent>,
    ) -> Self {
        Self {
            format,
            slots: networks
                .into_iter()
                .map(|network| NetworkSlot { network, shown: 0 })
                .collect(),
            current: 0,
            state: AgentState::Ready,
            max_per_session,
            max_per_network,
            failed_in_round: 0,
            show_requested: false,
            decision_point: None,
            last_show_time: None,
            shown_count: 0,
            generation,
            tx,
        }
    }

    pub fn format(&self) -> AdFormat {
        self.format
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// A creative is cached and not already handed to its network.
    pub fn is_ad_loaded(&self) -> bool {
        self.state == AgentState::Loaded && !self.show_requested
    }

    /// Ads opened by this agent during the current session.
    pub fn shown_count(&self) -> u32 {
        self.shown_count
    }

    /// When this agent's last ad was closed.
    pub fn last_show_time(&self) -> Option<DateTime<Utc>> {
        self.last_show_time
    }

    pub fn current_network(&self) -> Option<&str> {
        self.slots.get(self.current).map(|s| s.network.name())
    }

    pub fn network_count(&self) -> usize {
        self.slots.len()
    }

    fn session_limit_reached(&self) -> bool {
        self.max_per_session
            .is_some_and(|limit| self.shown_count >= limit)
    }

    /// Ask the current (or next eligible) network for a creative.
    pub fn request_ad(&mut self) {
        if self.slots.is_empty() {
            debug!(format = %self.format, "no ad networks, not requesting");
            return;
        }
        if self.state != AgentState::Ready {
            return;
        }
        if self.session_limit_reached() {
            debug!(format = %self.format, shown = self.shown_count, "session limit reached, not requesting");
            return;
        }
        if self.failed_in_round >= self.slots.len() {
            debug!(format = %self.format, "every network failed to fill, waiting");
            return;
        }
        let Some(index) = self.next_eligible(self.current) else {
            debug!(format = %self.format, "every network reached its per-network limit");
            return;
        };

        self.current = index;
        self.state = AgentState::Loading;
        let listener = self.listener();
        let slot = &mut self.slots[index];
        debug!(format = %self.format, network = slot.network.name(), "requesting ad");
        slot.network.load(listener);
    }

    /// Hand the cached creative to its network. Returns `false` when nothing
    /// is loaded.
    pub fn show_ad(&mut self, decision_point: Option<DecisionPoint>) -> bool {
        if !self.is_ad_loaded() {
            return false;
        }
        self.show_requested = true;
        self.decision_point = decision_point;
        let listener = self.listener();
        let slot = &mut self.slots[self.current];
        info!(format = %self.format, network = slot.network.name(), "showing ad");
        slot.network.show(listener);
        true
    }

    /// Reset per-session counts and resume loading.
    pub fn new_session(&mut self) {
        self.shown_count = 0;
        self.failed_in_round = 0;
        for slot in &mut self.slots {
            slot.shown = 0;
        }
        self.request_ad();
    }

    /// Apply a report from network `network`.
    pub fn handle(
        &mut self,
        network: usize,
        kind: NetworkEventKind,
        now: DateTime<Utc>,
    ) -> AgentTransition {
        if network != self.current || network >= self.slots.len() {
            debug!(format = %self.format, network, current = self.current, "ignoring report from inactive network");
            return AgentTransition::Ignored;
        }
        let name = self.slots[network].network.name().to_owned();

        match (self.state, kind) {
            (AgentState::Loading, NetworkEventKind::Loaded) => {
                self.state = AgentState::Loaded;
                self.failed_in_round = 0;
                info!(format = %self.format, network = %name, "ad loaded");
                AgentTransition::Loaded { network: name }
            }
            (AgentState::Loading, NetworkEventKind::FailedToLoad { reason }) => {
                warn!(format = %self.format, network = %name, %reason, "ad failed to load");
                self.state = AgentState::Ready;
                self.failed_in_round += 1;
                self.advance();
                self.request_ad();
                AgentTransition::LoadFailed {
                    network: name,
                    reason,
                }
            }
            (AgentState::Loaded, NetworkEventKind::Showing) if self.show_requested => {
                self.state = AgentState::Showing;
                self.show_requested = false;
                self.shown_count += 1;
                self.slots[network].shown += 1;
                AgentTransition::Opened {
                    network: name,
                    decision_point: self.decision_point.clone(),
                }
            }
            (AgentState::Showing, NetworkEventKind::Closed { complete }) => {
                info!(format = %self.format, network = %name, complete, "ad closed");
                self.state = AgentState::Ready;
                self.last_show_time = Some(now);
                self.failed_in_round = 0;
                let decision_point = self.decision_point.take();
                self.advance();
                self.request_ad();
                AgentTransition::Closed {
                    network: name,
                    decision_point,
                    complete,
                }
            }
            (
                AgentState::Loaded | AgentState::Showing,
                NetworkEventKind::FailedToShow { reason },
            ) => {
                warn!(format = %self.format, network = %name, %reason, "ad failed to show");
                self.state = AgentState::Ready;
                self.show_requested = false;
                self.decision_point = None;
                self.advance();
                self.request_ad();
                AgentTransition::ShowFailed {
                    network: name,
                    reason,
                }
            }
            (state, kind) => {
                debug!(format = %self.format, ?state, ?kind, "unexpected network report");
                AgentTransition::Ignored
            }
        }
    }

    fn advance(&mut self) {
        if !self.slots.is_empty() {
            self.current = (self.current + 1) % self.slots.len();
        }
    }

    /// First network at or after `start` still under its per-network limit.
    fn next_eligible(&self, start: usize) -> Option<usize> {
        let len = self.slots.len();
        (0..len).map(|offset| (start + offset) % len).find(|&i| {
            self.max_per_network
                .is_none_or(|limit| self.slots[i].shown < limit)
        })
    }

    fn listener(&self) -> AdListener {
        AdListener::new(self.format, self.generation, self.current, self.tx.clone())
    }
}
