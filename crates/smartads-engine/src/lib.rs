// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SmartAds Engine — the ad session facade.  Registration, eligibility policy,
// per-format ad agents over pluggable ad networks, persistent per-decision-point
// metrics, and the outgoing event queue consumed by the C bridge.

pub mod agent;
pub mod clock;
pub mod events;
pub mod metrics;
pub mod network;
pub mod policy;
pub mod service;

pub use agent::{AdAgent, AgentState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::AdEvent;
pub use metrics::AdMetrics;
pub use network::{AdListener, AdNetwork, AdNetworkFactory, SimulatedNetwork, SimulatedNetworkFactory};
pub use policy::{ShowPolicy, ShowRefusal};
pub use service::AdService;
