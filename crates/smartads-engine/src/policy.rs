// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Show eligibility policy.
//
// Pure functions over snapshots: the service gathers the agent state and the
// decision point's metrics, the policy decides.  Rules are checked in a fixed
// order and the first refusal wins.

use chrono::{DateTime, Utc};

use smartads_core::config::AdsConfig;
use smartads_core::types::DecisionPoint;
use smartads_core::value::EngageParams;

/// Engage may veto an individual ad.
pub const AD_SHOW_POINT: &str = "adShowPoint";
/// Per-decision-point session cap.
pub const SESSION_COUNT: &str = "ddnaAdSessionCount";
/// Per-decision-point daily cap.
pub const DAILY_COUNT: &str = "ddnaAdDailyCount";
/// Per-decision-point cooldown in seconds.
pub const SHOW_WAIT_SECS: &str = "ddnaAdShowWaitSecs";

/// Why an ad may not be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowRefusal {
    AdShowPoint,
    SessionLimitReached,
    SessionDecisionPointLimitReached,
    DailyDecisionPointLimitReached,
    MinTimeNotElapsed,
    MinTimeDecisionPointNotElapsed,
    NoAdAvailable,
}

impl ShowRefusal {
    /// Reason string reported to the scripting runtime.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AdShowPoint => "Engage disallowed the ad",
            Self::SessionLimitReached => "Session limit for environment reached",
            Self::SessionDecisionPointLimitReached => "Session limit for decision point reached",
            Self::DailyDecisionPointLimitReached => "Daily limit for decision point reached",
            Self::MinTimeNotElapsed => "Minimum environment time between ads not elapsed",
            Self::MinTimeDecisionPointNotElapsed => {
                "Minimum decision point time between ads not elapsed"
            }
            Self::NoAdAvailable => "Ad not loaded",
        }
    }

    /// Refusals that go away with time or a fill. Callers that bypass time
    /// treat these as allowed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::MinTimeNotElapsed | Self::MinTimeDecisionPointNotElapsed | Self::NoAdAvailable
        )
    }
}

impl std::fmt::Display for ShowRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Agent state the policy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentSnapshot {
    pub shown_count: u32,
    pub last_show_time: Option<DateTime<Utc>>,
    pub loaded: bool,
}

/// Stored metrics of one decision point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementMetrics {
    pub session_count: i64,
    pub daily_count: i64,
    pub last_shown: Option<DateTime<Utc>>,
}

/// Registration-wide limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowPolicy {
    /// Minimum seconds between two ads of the same format.
    pub min_interval_secs: i64,
    /// Ads per format and session, `None` for unlimited.
    pub max_per_session: Option<u32>,
}

impl From<&AdsConfig> for ShowPolicy {
    fn from(config: &AdsConfig) -> Self {
        Self {
            min_interval_secs: config.ad_minimum_interval,
            max_per_session: config.max_per_session(),
        }
    }
}

impl ShowPolicy {
    /// Decide whether an ad may be shown.
    ///
    /// `now` is `None` when the caller bypasses time; the two cooldown rules
    /// are then skipped. `placement` is only consulted when a decision point
    /// is given.
    pub fn evaluate(
        &self,
        agent: &AgentSnapshot,
        decision_point: Option<&DecisionPoint>,
        params: Option<&EngageParams>,
        placement: &PlacementMetrics,
        now: Option<DateTime<Utc>>,
    ) -> Result<(), ShowRefusal> {
        if params.and_then(|p| p.get_bool(AD_SHOW_POINT)) == Some(false) {
            return Err(ShowRefusal::AdShowPoint);
        }

        if self
            .max_per_session
            .is_some_and(|limit| agent.shown_count >= limit)
        {
            return Err(ShowRefusal::SessionLimitReached);
        }

        let placement_params = decision_point.and(params);

        if let Some(limit) = placement_limit(placement_params, SESSION_COUNT) {
            if placement.session_count >= limit {
                return Err(ShowRefusal::SessionDecisionPointLimitReached);
            }
        }

        if let Some(limit) = placement_limit(placement_params, DAILY_COUNT) {
            if placement.daily_count >= limit {
                return Err(ShowRefusal::DailyDecisionPointLimitReached);
            }
        }

        if let Some(now) = now {
            if let Some(last) = agent.last_show_time {
                if elapsed_secs(last, now) < self.min_interval_secs {
                    return Err(ShowRefusal::MinTimeNotElapsed);
                }
            }

            if let (Some(wait), Some(last)) = (
                placement_limit(placement_params, SHOW_WAIT_SECS),
                placement.last_shown,
            ) {
                if elapsed_secs(last, now) < wait {
                    return Err(ShowRefusal::MinTimeDecisionPointNotElapsed);
                }
            }
        }

        if !agent.loaded {
            return Err(ShowRefusal::NoAdAvailable);
        }

        Ok(())
    }

    /// Seconds until the cooldowns allow another rewarded ad, 0 when allowed.
    ///
    /// The larger of the two cooldowns decides which clock is consulted: the
    /// agent's global interval when it is at least the decision point's wait,
    /// otherwise the decision point's own wait.
    pub fn seconds_until_allowed(
        &self,
        agent: &AgentSnapshot,
        params: &EngageParams,
        placement: &PlacementMetrics,
        now: DateTime<Utc>,
    ) -> i64 {
        let wait = params.get_i64(SHOW_WAIT_SECS).unwrap_or(0);

        let (cooldown, since) = if self.min_interval_secs >= wait {
            (self.min_interval_secs, agent.last_show_time)
        } else {
            (wait, placement.last_shown)
        };

        since.map_or(0, |last| {
            cooldown.saturating_sub(elapsed_secs(last, now)).max(0)
        })
    }
}

/// Numeric limit under `key`. A present key that is not an integer counts
/// as a zero limit.
fn placement_limit(params: Option<&EngageParams>, key: &str) -> Option<i64> {
    let params = params?;
    params
        .contains(key)
        .then(|| params.get_i64(key).unwrap_or(0))
}

fn elapsed_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_seconds()
}
