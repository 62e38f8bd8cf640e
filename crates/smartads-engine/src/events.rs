// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outgoing ad events.
//
// Each event maps onto one callback of the scripting runtime: a method name
// and a single string message.

use serde_json::json;

use smartads_core::types::{AdFormat, DecisionPoint};
use smartads_core::value::{ParamMap, ParamValue};

/// Analytics event name recorded when an ad opens.
pub const AD_SHOW_EVENT: &str = "adShow";
/// Analytics event name recorded when an ad closes.
pub const AD_CLOSED_EVENT: &str = "adClosed";

#[derive(Debug, Clone, PartialEq)]
pub enum AdEvent {
    RegisteredForInterstitialAds,
    FailedToRegisterForInterstitialAds { reason: String },
    RegisteredForRewardedAds,
    FailedToRegisterForRewardedAds { reason: String },
    InterstitialAdOpened,
    InterstitialAdFailedToOpen { reason: String },
    InterstitialAdClosed,
    RewardedAdLoaded,
    RewardedAdOpened { decision_point: Option<DecisionPoint> },
    RewardedAdFailedToOpen { reason: String },
    RewardedAdClosed { reward: bool },
    /// Ask the analytics layer to record an event.
    RecordEvent { name: String, params: ParamMap },
}

impl AdEvent {
    pub fn registered(format: AdFormat) -> Self {
        match format {
            AdFormat::Interstitial => Self::RegisteredForInterstitialAds,
            AdFormat::Rewarded => Self::RegisteredForRewardedAds,
        }
    }

    pub fn failed_to_register(format: AdFormat, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match format {
            AdFormat::Interstitial => Self::FailedToRegisterForInterstitialAds { reason },
            AdFormat::Rewarded => Self::FailedToRegisterForRewardedAds { reason },
        }
    }

    pub fn failed_to_open(format: AdFormat, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match format {
            AdFormat::Interstitial => Self::InterstitialAdFailedToOpen { reason },
            AdFormat::Rewarded => Self::RewardedAdFailedToOpen { reason },
        }
    }

    pub fn opened(format: AdFormat, decision_point: Option<DecisionPoint>) -> Self {
        match format {
            AdFormat::Interstitial => Self::InterstitialAdOpened,
            AdFormat::Rewarded => Self::RewardedAdOpened { decision_point },
        }
    }

    pub fn closed(format: AdFormat, complete: bool) -> Self {
        match format {
            AdFormat::Interstitial => Self::InterstitialAdClosed,
            AdFormat::Rewarded => Self::RewardedAdClosed { reward: complete },
        }
    }

    /// `adShow` / `adClosed` analytics record for `network`.
    pub fn record(
        name: &str,
        format: AdFormat,
        network: &str,
        status: &str,
        decision_point: Option<&DecisionPoint>,
    ) -> Self {
        let mut params = ParamMap::new();
        params.insert("adProvider".into(), ParamValue::from(network));
        params.insert("adType".into(), ParamValue::from(format.ad_type()));
        params.insert("adStatus".into(), ParamValue::from(status));
        if let Some(dp) = decision_point {
            params.insert("adPoint".into(), ParamValue::from(dp.as_str()));
        }
        Self::RecordEvent {
            name: name.to_owned(),
            params,
        }
    }

    /// Callback method name on the runtime side.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::RegisteredForInterstitialAds => "DidRegisterForInterstitialAds",
            Self::FailedToRegisterForInterstitialAds { .. } => {
                "DidFailToRegisterForInterstitialAds"
            }
            Self::RegisteredForRewardedAds => "DidRegisterForRewardedAds",
            Self::FailedToRegisterForRewardedAds { .. } => "DidFailToRegisterForRewardedAds",
            Self::InterstitialAdOpened => "DidOpenInterstitialAd",
            Self::InterstitialAdFailedToOpen { .. } => "DidFailToOpenInterstitialAd",
            Self::InterstitialAdClosed => "DidCloseInterstitialAd",
            Self::RewardedAdLoaded => "DidLoadRewardedAd",
            Self::RewardedAdOpened { .. } => "DidOpenRewardedAd",
            Self::RewardedAdFailedToOpen { .. } => "DidFailToOpenRewardedAd",
            Self::RewardedAdClosed { .. } => "DidCloseRewardedAd",
            Self::RecordEvent { .. } => "RecordEvent",
        }
    }

    /// Message argument of the callback; empty when the event carries none.
    pub fn message(&self) -> String {
        match self {
            Self::FailedToRegisterForInterstitialAds { reason }
            | Self::FailedToRegisterForRewardedAds { reason }
            | Self::InterstitialAdFailedToOpen { reason }
            | Self::RewardedAdFailedToOpen { reason } => reason.clone(),
            Self::RewardedAdOpened { decision_point } => decision_point
                .as_ref()
                .map(|dp| dp.as_str().to_owned())
                .unwrap_or_default(),
            Self::RewardedAdClosed { reward } => json!({ "reward": reward }).to_string(),
            Self::RecordEvent { name, params } => {
                json!({ "eventName": name, "parameters": params }).to_string()
            }
            Self::RegisteredForInterstitialAds
            | Self::RegisteredForRewardedAds
            | Self::InterstitialAdOpened
            | Self::InterstitialAdClosed
            | Self::RewardedAdLoaded => String::new(),
        }
    }
}
