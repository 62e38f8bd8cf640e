// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ad session facade.
//
// `AdService` is the one canonical API for registering, checking and showing
// ads.  It owns the metrics store, one agent per ad format and the outgoing
// event queue.  Network reports are applied at the start of every call (and
// by `process_network_events`), so all state changes happen on the caller's
// thread.

use std::collections::VecDeque;
use std::sync::mpsc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use smartads_core::config::AdsConfig;
use smartads_core::error::{Result, SmartAdsError};
use smartads_core::types::{AdFormat, Consent, DecisionPoint, SessionId};
use smartads_core::value::EngageParams;

use crate::agent::{AdAgent, AgentTransition};
use crate::clock::{Clock, SystemClock};
use crate::events::{AD_CLOSED_EVENT, AD_SHOW_EVENT, AdEvent};
use crate::metrics::AdMetrics;
use crate::network::{AdNetwork, AdNetworkFactory, NetworkEvent};
use crate::policy::{AgentSnapshot, PlacementMetrics, ShowPolicy, ShowRefusal};

const FORMATS: [AdFormat; 2] = [AdFormat::Interstitial, AdFormat::Rewarded];

const ADS_DISABLED: &str = "Ads disabled for this session";
const NOT_REGISTERED: &str = "Not registered";
const ADS_PAUSED: &str = "Ads paused";
const INVALID_ENGAGEMENT: &str = "Invalid engagement";

/// Outgoing events kept while nobody drains the queue. Newer events are
/// dropped past this.
pub const MAX_QUEUED_EVENTS: usize = 256;

impl From<&AdAgent> for AgentSnapshot {
    fn from(agent: &AdAgent) -> Self {
        Self {
            shown_count: agent.shown_count(),
            last_show_time: agent.last_show_time(),
            loaded: agent.is_ad_loaded(),
        }
    }
}

/// Owns ad registration, eligibility, display and metrics for one app.
pub struct AdService {
    metrics: AdMetrics,
    factory: Box<dyn AdNetworkFactory>,
    clock: Box<dyn Clock>,
    policy: ShowPolicy,
    interstitial: Option<AdAgent>,
    rewarded: Option<AdAgent>,
    /// Bumped on every (re-)registration and on destroy.
    generation: u64,
    tx: mpsc::Sender<NetworkEvent>,
    rx: mpsc::Receiver<NetworkEvent>,
    events: VecDeque<AdEvent>,
    session_id: SessionId,
    paused: bool,
    destroyed: bool,
}

impl AdService {
    pub fn new(metrics: AdMetrics, factory: Box<dyn AdNetworkFactory>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            metrics,
            factory,
            clock: Box::new(SystemClock),
            policy: ShowPolicy::default(),
            interstitial: None,
            rewarded: None,
            generation: 0,
            tx,
            rx,
            events: VecDeque::new(),
            session_id: SessionId::new(),
            paused: false,
            destroyed: false,
        }
    }

    /// Replace the wall clock used for cooldowns and metrics.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn agent(&self, format: AdFormat) -> Option<&AdAgent> {
        match format {
            AdFormat::Interstitial => self.interstitial.as_ref(),
            AdFormat::Rewarded => self.rewarded.as_ref(),
        }
    }

    // -- Registration -------------------------------------------------------

    /// Register using the engage response JSON delivered by the backend.
    #[instrument(skip(self, config))]
    pub fn register_for_ads(&mut self, config: &str, consent: Consent) {
        if self.destroyed {
            warn!("register_for_ads called after destroy, ignoring");
            return;
        }
        match AdsConfig::from_engage_response(config) {
            Ok(config) => self.register_with_config(config, consent),
            Err(e) => {
                warn!(error = %e, "rejecting ads configuration");
                self.drop_agents();
                let reason = format!("Invalid Engage response, {e}");
                for format in FORMATS {
                    self.enqueue(AdEvent::failed_to_register(format, reason.clone()));
                }
            }
        }
    }

    /// Register with an already parsed configuration. Replaces any previous
    /// registration; metrics are kept.
    pub fn register_with_config(&mut self, config: AdsConfig, consent: Consent) {
        if self.destroyed {
            warn!("register_with_config called after destroy, ignoring");
            return;
        }
        self.drop_agents();

        if !config.ad_show_session {
            info!("ads disabled for this session");
            for format in FORMATS {
                self.enqueue(AdEvent::failed_to_register(format, ADS_DISABLED));
            }
            return;
        }

        if config.interstitial_providers.is_none() && config.rewarded_providers.is_none() {
            for format in FORMATS {
                self.enqueue(AdEvent::failed_to_register(
                    format,
                    format!("Invalid Engage response, missing '{}' key", format.providers_key()),
                ));
            }
            return;
        }

        self.policy = ShowPolicy::from(&config);

        for format in FORMATS {
            match self.build_agent(&config, format, consent) {
                Ok(mut agent) => {
                    info!(%format, networks = agent.network_count(), "registered for ads");
                    agent.request_ad();
                    self.set_agent(format, Some(agent));
                    self.enqueue(AdEvent::registered(format));
                }
                Err(reason) => {
                    warn!(%format, %reason, "failed to register for ads");
                    self.enqueue(AdEvent::failed_to_register(format, reason));
                }
            }
        }
    }

    fn build_agent(
        &self,
        config: &AdsConfig,
        format: AdFormat,
        consent: Consent,
    ) -> std::result::Result<AdAgent, String> {
        let providers = config.providers(format).unwrap_or_default();
        if providers.is_empty() {
            return Err(format!("No {format} ad providers defined"));
        }

        let mut networks: Vec<Box<dyn AdNetwork>> = Vec::with_capacity(providers.len());
        let mut last_error = None;
        for provider in providers {
            match self.factory.create(provider, format, consent) {
                Ok(network) => networks.push(network),
                Err(e) => {
                    warn!(provider = %provider.name, %format, error = %e, "skipping ad network");
                    last_error = Some(e);
                }
            }
        }

        if networks.is_empty() {
            return Err(last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("No {format} ad providers defined")));
        }

        Ok(AdAgent::new(
            format,
            networks,
            config.max_per_session(),
            config.max_per_network(),
            self.generation,
            self.tx.clone(),
        ))
    }

    fn set_agent(&mut self, format: AdFormat, agent: Option<AdAgent>) {
        match format {
            AdFormat::Interstitial => self.interstitial = agent,
            AdFormat::Rewarded => self.rewarded = agent,
        }
    }

    fn drop_agents(&mut self) {
        self.interstitial = None;
        self.rewarded = None;
        self.generation = self.generation.wrapping_add(1);
    }

    // -- Eligibility --------------------------------------------------------

    pub fn is_interstitial_ad_allowed(
        &mut self,
        decision_point: Option<&DecisionPoint>,
        params: Option<&EngageParams>,
        check_time: bool,
    ) -> bool {
        self.is_ad_allowed(AdFormat::Interstitial, decision_point, params, check_time)
    }

    pub fn is_rewarded_ad_allowed(
        &mut self,
        decision_point: Option<&DecisionPoint>,
        params: Option<&EngageParams>,
        check_time: bool,
    ) -> bool {
        self.is_ad_allowed(AdFormat::Rewarded, decision_point, params, check_time)
    }

    /// Whether an ad of `format` may be shown now.
    ///
    /// With `check_time == false` the cooldowns are skipped and an unloaded
    /// ad does not count against eligibility; the clock is never read.
    pub fn is_ad_allowed(
        &mut self,
        format: AdFormat,
        decision_point: Option<&DecisionPoint>,
        params: Option<&EngageParams>,
        check_time: bool,
    ) -> bool {
        if self.destroyed {
            debug!(%format, "eligibility queried after destroy");
            return false;
        }
        self.process_network_events();

        let Some(agent) = self.agent(format) else {
            return false;
        };
        let snapshot = AgentSnapshot::from(agent);

        match (decision_point, params) {
            (Some(_), None) => {
                warn!(%format, "decision point given without engagement parameters");
                return false;
            }
            (None, None) => {
                warn!(%format, "checking ads without an engagement is deprecated");
                return true;
            }
            _ => {}
        }

        let now = check_time.then(|| self.clock.now());
        let placement = match self.placement(decision_point, now) {
            Ok(placement) => placement,
            Err(e) => {
                warn!(%format, error = %e, "could not read ad metrics");
                return false;
            }
        };

        match self
            .policy
            .evaluate(&snapshot, decision_point, params, &placement, now)
        {
            Ok(()) => true,
            Err(refusal) if refusal.is_transient() => {
                debug!(%format, %refusal, check_time, "ad not allowed yet");
                !check_time
            }
            Err(refusal) => {
                debug!(%format, %refusal, "ad not allowed");
                false
            }
        }
    }

    pub fn has_loaded_interstitial_ad(&mut self) -> bool {
        self.has_loaded_ad(AdFormat::Interstitial)
    }

    pub fn has_loaded_rewarded_ad(&mut self) -> bool {
        self.has_loaded_ad(AdFormat::Rewarded)
    }

    /// A creative of `format` is cached, regardless of eligibility.
    pub fn has_loaded_ad(&mut self, format: AdFormat) -> bool {
        if self.destroyed {
            return false;
        }
        self.process_network_events();
        self.agent(format).is_some_and(AdAgent::is_ad_loaded)
    }

    /// Seconds until cooldowns allow a rewarded ad; 0 when allowed or when
    /// there is nothing to wait for.
    pub fn time_until_rewarded_ad_allowed(
        &mut self,
        decision_point: Option<&DecisionPoint>,
        params: Option<&EngageParams>,
    ) -> i64 {
        if self.destroyed {
            return 0;
        }
        self.process_network_events();

        let Some(agent) = self.rewarded.as_ref() else {
            return 0;
        };
        let Some(params) = params else {
            return 0;
        };
        let snapshot = AgentSnapshot::from(agent);

        let now = self.clock.now();
        match self.placement(decision_point, Some(now)) {
            Ok(placement) => self
                .policy
                .seconds_until_allowed(&snapshot, params, &placement, now),
            Err(e) => {
                warn!(error = %e, "could not read ad metrics");
                0
            }
        }
    }

    fn placement(
        &self,
        decision_point: Option<&DecisionPoint>,
        now: Option<DateTime<Utc>>,
    ) -> Result<PlacementMetrics> {
        let Some(dp) = decision_point else {
            return Ok(PlacementMetrics::default());
        };
        Ok(PlacementMetrics {
            session_count: self.metrics.session_count(dp)?,
            daily_count: match now {
                Some(now) => self.metrics.daily_count(dp, now)?,
                None => self.metrics.recorded_daily_count(dp)?,
            },
            last_shown: self.metrics.last_shown(dp)?,
        })
    }

    // -- Display ------------------------------------------------------------

    pub fn show_interstitial_ad(
        &mut self,
        decision_point: Option<&DecisionPoint>,
        params: Option<&EngageParams>,
    ) {
        self.show_ad(AdFormat::Interstitial, decision_point, params);
    }

    pub fn show_rewarded_ad(
        &mut self,
        decision_point: Option<&DecisionPoint>,
        params: Option<&EngageParams>,
    ) {
        self.show_ad(AdFormat::Rewarded, decision_point, params);
    }

    /// Show an ad of `format`. The outcome arrives as events.
    #[instrument(skip(self, decision_point, params), fields(decision_point = ?decision_point.map(DecisionPoint::as_str)))]
    pub fn show_ad(
        &mut self,
        format: AdFormat,
        decision_point: Option<&DecisionPoint>,
        params: Option<&EngageParams>,
    ) {
        if self.destroyed {
            warn!("show called after destroy, ignoring");
            return;
        }
        self.process_network_events();

        let Some(agent) = self.agent(format) else {
            self.fail_to_open(format, NOT_REGISTERED);
            return;
        };
        let snapshot = AgentSnapshot::from(agent);

        if self.paused {
            self.fail_to_open(format, ADS_PAUSED);
            return;
        }

        match (decision_point, params) {
            (Some(_), None) => {
                self.fail_to_open(format, INVALID_ENGAGEMENT);
                return;
            }
            (None, None) => warn!("showing ads without an engagement is deprecated"),
            _ => {}
        }

        let now = self.clock.now();
        let placement = match self.placement(decision_point, Some(now)) {
            Ok(placement) => placement,
            Err(e) => {
                self.fail_to_open(format, e.to_string());
                return;
            }
        };

        if let Err(refusal) =
            self.policy
                .evaluate(&snapshot, decision_point, params, &placement, Some(now))
        {
            self.fail_to_open(format, refusal.reason());
            return;
        }

        let agent = match format {
            AdFormat::Interstitial => self.interstitial.as_mut(),
            AdFormat::Rewarded => self.rewarded.as_mut(),
        };
        if !agent.is_some_and(|agent| agent.show_ad(decision_point.cloned())) {
            self.fail_to_open(format, ShowRefusal::NoAdAvailable.reason());
            return;
        }

        self.process_network_events();
    }

    fn fail_to_open(&mut self, format: AdFormat, reason: impl Into<String>) {
        let reason = reason.into();
        info!(%format, %reason, "ad failed to open");
        self.enqueue(AdEvent::failed_to_open(format, reason));
    }

    // -- Metrics ------------------------------------------------------------

    /// When an ad was last closed at `decision_point`.
    pub fn last_shown(&self, decision_point: &DecisionPoint) -> Result<Option<DateTime<Utc>>> {
        self.ensure_alive()?;
        self.metrics.last_shown(decision_point)
    }

    pub fn session_count(&self, decision_point: &DecisionPoint) -> Result<i64> {
        self.ensure_alive()?;
        self.metrics.session_count(decision_point)
    }

    pub fn daily_count(&self, decision_point: &DecisionPoint) -> Result<i64> {
        self.ensure_alive()?;
        self.metrics.daily_count(decision_point, self.clock.now())
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            return Err(SmartAdsError::Destroyed);
        }
        Ok(())
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Refuse shows until [`resume`](Self::resume). Loaded ads are kept.
    pub fn pause(&mut self) {
        if self.destroyed {
            return;
        }
        if !self.paused {
            info!("ads paused");
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.destroyed {
            return;
        }
        if self.paused {
            info!("ads resumed");
        }
        self.paused = false;
    }

    /// Release agents and networks. Every later call is a no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.drop_agents();
        self.events.clear();
        while self.rx.try_recv().is_ok() {}
        self.destroyed = true;
        info!("ad service destroyed");
    }

    /// Start a new analytics session: reset session counters (and daily
    /// counters on a new UTC day) and resume loading on idle agents.
    #[instrument(skip(self))]
    pub fn new_session(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let now = self.clock.now();
        self.metrics.new_session(now)?;

        for agent in [self.interstitial.as_mut(), self.rewarded.as_mut()]
            .into_iter()
            .flatten()
        {
            agent.new_session();
        }

        self.session_id = SessionId::new();
        info!(session_id = %self.session_id, "new ad session");
        self.process_network_events();
        Ok(())
    }

    // -- Event plumbing -----------------------------------------------------

    /// Apply pending network reports. Returns the number applied.
    pub fn process_network_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(NetworkEvent {
            format,
            generation,
            network,
            kind,
        }) = self.rx.try_recv()
        {
            if self.destroyed || generation != self.generation {
                debug!(%format, generation, current = self.generation, "dropping stale network report");
                continue;
            }

            let now = self.clock.now();
            let agent = match format {
                AdFormat::Interstitial => self.interstitial.as_mut(),
                AdFormat::Rewarded => self.rewarded.as_mut(),
            };
            let Some(transition) = agent.map(|agent| agent.handle(network, kind, now)) else {
                continue;
            };
            self.apply(format, transition, now);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, format: AdFormat, transition: AgentTransition, now: DateTime<Utc>) {
        match transition {
            AgentTransition::Loaded { .. } => {
                if format == AdFormat::Rewarded {
                    self.enqueue(AdEvent::RewardedAdLoaded);
                }
            }
            AgentTransition::Opened {
                network,
                decision_point,
            } => {
                self.enqueue(AdEvent::record(
                    AD_SHOW_EVENT,
                    format,
                    &network,
                    "Fulfilled",
                    decision_point.as_ref(),
                ));
                self.enqueue(AdEvent::opened(format, decision_point));
            }
            AgentTransition::Closed {
                network,
                decision_point,
                complete,
            } => {
                if let Some(dp) = &decision_point {
                    if let Err(e) = self.metrics.record_ad_shown(dp, now) {
                        warn!(%format, decision_point = %dp, error = %e, "failed to record ad metrics");
                    }
                }
                self.enqueue(AdEvent::record(
                    AD_CLOSED_EVENT,
                    format,
                    &network,
                    "Success",
                    decision_point.as_ref(),
                ));
                self.enqueue(AdEvent::closed(format, complete));
            }
            AgentTransition::ShowFailed { reason, .. } => self.fail_to_open(format, reason),
            AgentTransition::LoadFailed { .. } | AgentTransition::Ignored => {}
        }
    }

    fn enqueue(&mut self, event: AdEvent) {
        if self.events.len() >= MAX_QUEUED_EVENTS {
            warn!(method = event.method_name(), queued = self.events.len(), "event queue full, dropping event");
            return;
        }
        self.events.push_back(event);
    }

    /// Take every queued outgoing event, oldest first.
    pub fn drain_events(&mut self) -> Vec<AdEvent> {
        self.process_network_events();
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::network::SimulatedNetworkFactory;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn config(min_interval: i64, max_per_session: i64) -> String {
        json!({
            "parameters": {
                "adShowSession": true,
                "adProviders": [{"adProvider": "ADMOB"}],
                "adRewardedProviders": [{"adProvider": "UNITY"}],
                "adMinimumInterval": min_interval,
                "adMaxPerSession": max_per_session
            }
        })
        .to_string()
    }

    fn service() -> (AdService, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap());
        let metrics = AdMetrics::open_in_memory().expect("metrics");
        let service = AdService::new(metrics, Box::new(SimulatedNetworkFactory::default()))
            .with_clock(clock.clone());
        (service, clock)
    }

    fn registered(min_interval: i64, max_per_session: i64) -> (AdService, ManualClock) {
        let (mut service, clock) = service();
        service.register_for_ads(&config(min_interval, max_per_session), Consent::default());
        service.drain_events();
        (service, clock)
    }

    fn dp(name: &str) -> DecisionPoint {
        DecisionPoint::new(name).expect("dp")
    }

    fn failures(events: &[AdEvent]) -> Vec<String> {
        events
            .iter()
            .filter(|e| e.method_name().starts_with("DidFailTo"))
            .map(AdEvent::message)
            .collect()
    }

    #[test]
    fn registration_announces_both_formats_and_loads() {
        let (mut service, _) = service();
        service.register_for_ads(&config(0, -1), Consent::default());

        assert!(service.has_loaded_interstitial_ad());
        assert!(service.has_loaded_rewarded_ad());
        assert_eq!(
            service.drain_events(),
            vec![
                AdEvent::RegisteredForInterstitialAds,
                AdEvent::RegisteredForRewardedAds,
                AdEvent::RewardedAdLoaded,
            ]
        );
    }

    #[test]
    fn disabled_session_fails_both_formats() {
        let (mut service, _) = service();
        service.register_for_ads(r#"{"parameters":{"adShowSession":false}}"#, Consent::default());
        assert_eq!(
            failures(&service.drain_events()),
            vec![ADS_DISABLED.to_owned(), ADS_DISABLED.to_owned()]
        );
        assert!(!service.is_interstitial_ad_allowed(None, None, true));
    }

    #[test]
    fn missing_provider_keys_are_reported() {
        let (mut service, _) = service();
        service.register_for_ads(r#"{"adShowSession":true}"#, Consent::default());
        assert_eq!(
            failures(&service.drain_events()),
            vec![
                "Invalid Engage response, missing 'adProviders' key".to_owned(),
                "Invalid Engage response, missing 'adRewardedProviders' key".to_owned(),
            ]
        );
    }

    #[test]
    fn empty_provider_list_fails_only_that_format() {
        let (mut service, _) = service();
        service.register_for_ads(
            r#"{"adShowSession":true,"adProviders":[],"adRewardedProviders":[{"adProvider":"UNITY"}]}"#,
            Consent::default(),
        );
        let events = service.drain_events();
        assert_eq!(
            events[0],
            AdEvent::FailedToRegisterForInterstitialAds {
                reason: "No interstitial ad providers defined".into()
            }
        );
        assert_eq!(events[1], AdEvent::RegisteredForRewardedAds);
        assert!(!service.has_loaded_interstitial_ad());
        assert!(service.has_loaded_rewarded_ad());
    }

    #[test]
    fn malformed_configuration_fails_registration() {
        let (mut service, _) = service();
        service.register_for_ads("{{{", Consent::default());
        let reasons = failures(&service.drain_events());
        assert_eq!(reasons.len(), 2);
        assert!(reasons.iter().all(|r| r.starts_with("Invalid Engage response")));
    }

    #[test]
    fn show_rewarded_ad_records_metrics_and_events() {
        let (mut service, _) = registered(0, -1);
        let point = dp("levelEnd");
        let params = EngageParams::default();

        assert!(service.is_rewarded_ad_allowed(Some(&point), Some(&params), true));
        service.show_rewarded_ad(Some(&point), Some(&params));

        let events = service.drain_events();
        let methods: Vec<_> = events.iter().map(AdEvent::method_name).collect();
        assert_eq!(
            methods,
            vec![
                "RecordEvent",
                "DidOpenRewardedAd",
                "RecordEvent",
                "DidCloseRewardedAd",
                "DidLoadRewardedAd",
            ]
        );
        assert_eq!(events[1].message(), "levelEnd");
        assert_eq!(events[3].message(), r#"{"reward":true}"#);

        assert_eq!(service.session_count(&point).expect("count"), 1);
        assert_eq!(service.daily_count(&point).expect("count"), 1);
        assert!(service.last_shown(&point).expect("last shown").is_some());
    }

    #[test]
    fn unregistered_service_refuses() {
        let (mut service, _) = service();
        assert!(!service.is_rewarded_ad_allowed(None, Some(&EngageParams::default()), true));
        assert!(!service.has_loaded_rewarded_ad());
        assert_eq!(service.time_until_rewarded_ad_allowed(None, Some(&EngageParams::default())), 0);

        service.show_interstitial_ad(None, None);
        assert_eq!(failures(&service.drain_events()), vec![NOT_REGISTERED.to_owned()]);
    }

    #[test]
    fn engagement_shape_rules() {
        let (mut service, _) = registered(0, -1);
        let point = dp("shop");

        // Decision point without parameters is an invalid engagement.
        assert!(!service.is_interstitial_ad_allowed(Some(&point), None, true));
        service.show_interstitial_ad(Some(&point), None);
        assert_eq!(failures(&service.drain_events()), vec![INVALID_ENGAGEMENT.to_owned()]);

        // No engagement at all is still allowed.
        assert!(service.is_interstitial_ad_allowed(None, None, true));
    }

    #[test]
    fn engage_veto_refuses_show() {
        let (mut service, _) = registered(0, -1);
        let params = EngageParams::default().with("adShowPoint", false);
        assert!(!service.is_interstitial_ad_allowed(None, Some(&params), false));
        service.show_interstitial_ad(None, Some(&params));
        assert_eq!(
            failures(&service.drain_events()),
            vec!["Engage disallowed the ad".to_owned()]
        );
    }

    #[test]
    fn minimum_interval_depends_on_check_time() {
        let (mut service, clock) = registered(60, -1);
        let params = EngageParams::default();

        service.show_interstitial_ad(None, Some(&params));
        service.drain_events();

        clock.advance(Duration::seconds(10));
        assert!(!service.is_interstitial_ad_allowed(None, Some(&params), true));
        assert!(service.is_interstitial_ad_allowed(None, Some(&params), false));

        service.show_interstitial_ad(None, Some(&params));
        assert_eq!(
            failures(&service.drain_events()),
            vec!["Minimum environment time between ads not elapsed".to_owned()]
        );

        clock.advance(Duration::seconds(60));
        assert!(service.is_interstitial_ad_allowed(None, Some(&params), true));
    }

    #[test]
    fn unchecked_eligibility_ignores_the_clock() {
        let (mut service, clock) = registered(3600, -1);
        let params = EngageParams::default();
        service.show_interstitial_ad(None, Some(&params));
        service.drain_events();

        let mut answers = Vec::new();
        for _ in 0..4 {
            answers.push(service.is_interstitial_ad_allowed(None, Some(&params), false));
            clock.advance(Duration::minutes(17));
        }
        assert_eq!(answers, vec![true; 4]);
    }

    #[test]
    fn time_until_rewarded_counts_down() {
        let (mut service, clock) = registered(100, -1);
        let params = EngageParams::default();
        assert_eq!(service.time_until_rewarded_ad_allowed(None, Some(&params)), 0);

        service.show_rewarded_ad(None, Some(&params));
        service.drain_events();
        clock.advance(Duration::seconds(30));
        assert_eq!(service.time_until_rewarded_ad_allowed(None, Some(&params)), 70);
        assert_eq!(service.time_until_rewarded_ad_allowed(None, None), 0);

        // A longer decision point wait takes over.
        let point = dp("chest");
        let waiting = EngageParams::default().with("ddnaAdShowWaitSecs", 300_i64);
        clock.advance(Duration::seconds(100));
        service.show_rewarded_ad(Some(&point), Some(&waiting));
        service.drain_events();
        clock.advance(Duration::seconds(45));
        assert_eq!(service.time_until_rewarded_ad_allowed(Some(&point), Some(&waiting)), 255);
    }

    #[test]
    fn session_limits_reset_on_new_session() {
        let (mut service, _) = registered(0, 1);
        let params = EngageParams::default();

        service.show_interstitial_ad(None, Some(&params));
        service.drain_events();
        assert!(!service.is_interstitial_ad_allowed(None, Some(&params), true));

        service.show_interstitial_ad(None, Some(&params));
        assert_eq!(
            failures(&service.drain_events()),
            vec!["Session limit for environment reached".to_owned()]
        );

        let before = service.session_id();
        service.new_session().expect("new session");
        assert_ne!(service.session_id(), before);
        assert!(service.is_interstitial_ad_allowed(None, Some(&params), true));
    }

    #[test]
    fn decision_point_caps() {
        let (mut service, _) = registered(0, -1);
        let point = dp("levelEnd");
        let params = EngageParams::default()
            .with("ddnaAdSessionCount", 1_i64)
            .with("ddnaAdDailyCount", 2_i64);

        service.show_interstitial_ad(Some(&point), Some(&params));
        service.drain_events();
        service.show_interstitial_ad(Some(&point), Some(&params));
        assert_eq!(
            failures(&service.drain_events()),
            vec!["Session limit for decision point reached".to_owned()]
        );

        service.new_session().expect("new session");
        service.show_interstitial_ad(Some(&point), Some(&params));
        service.drain_events();
        service.new_session().expect("new session");
        service.show_interstitial_ad(Some(&point), Some(&params));
        assert_eq!(
            failures(&service.drain_events()),
            vec!["Daily limit for decision point reached".to_owned()]
        );
        assert_eq!(service.daily_count(&point).expect("count"), 2);
    }

    #[test]
    fn pause_and_resume_keep_loaded_state() {
        let (mut service, _) = registered(0, -1);
        let loaded = service.has_loaded_interstitial_ad();

        service.pause();
        assert!(service.is_paused());
        assert_eq!(service.has_loaded_interstitial_ad(), loaded);
        service.show_interstitial_ad(None, Some(&EngageParams::default()));
        assert_eq!(failures(&service.drain_events()), vec![ADS_PAUSED.to_owned()]);

        service.resume();
        assert_eq!(service.has_loaded_interstitial_ad(), loaded);
    }

    #[test]
    fn everything_is_a_no_op_after_destroy() {
        let (mut service, _) = registered(0, -1);
        let point = dp("levelEnd");
        let params = EngageParams::default();

        service.destroy();
        service.destroy();
        assert!(service.is_destroyed());

        service.register_for_ads(&config(0, -1), Consent::default());
        service.show_rewarded_ad(Some(&point), Some(&params));
        service.pause();
        service.resume();
        assert!(!service.is_rewarded_ad_allowed(Some(&point), Some(&params), false));
        assert!(!service.has_loaded_interstitial_ad());
        assert_eq!(service.time_until_rewarded_ad_allowed(Some(&point), Some(&params)), 0);
        assert!(matches!(service.session_count(&point), Err(SmartAdsError::Destroyed)));
        assert!(matches!(service.new_session(), Err(SmartAdsError::Destroyed)));
        assert!(service.drain_events().is_empty());
    }

    #[test]
    fn reports_from_a_previous_registration_are_dropped() {
        let (mut service, _) = service();
        service.register_for_ads(&config(0, -1), Consent::default());
        // Re-register before the first load reports are applied.
        service.register_for_ads(&config(0, -1), Consent::default());

        let loaded = service
            .drain_events()
            .into_iter()
            .filter(|e| *e == AdEvent::RewardedAdLoaded)
            .count();
        assert_eq!(loaded, 1);
    }

    #[test]
    fn undrained_events_are_capped() {
        let (mut service, _) = service();
        for _ in 0..MAX_QUEUED_EVENTS {
            service.register_for_ads("not json", Consent::default());
        }
        let events = service.drain_events();
        assert_eq!(events.len(), MAX_QUEUED_EVENTS);
        assert_eq!(events[0].method_name(), "DidFailToRegisterForInterstitialAds");

        // Draining frees the queue again.
        service.register_for_ads("not json", Consent::default());
        assert_eq!(service.drain_events().len(), 2);
    }
}
