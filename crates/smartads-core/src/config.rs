// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ads registration configuration and bridge settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SmartAdsError};
use crate::types::{AdFormat, LogLevel};

/// Sentinel used by the backend for "no limit".
const UNLIMITED: i64 = -1;

fn unlimited() -> i64 {
    UNLIMITED
}

/// One ad network entry of a provider list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Network identifier, e.g. `"ADMOB"`.
    #[serde(rename = "adProvider")]
    pub name: String,
    /// Expected revenue per mille, used only for reporting.
    #[serde(rename = "eCPM", default, skip_serializing_if = "Option::is_none")]
    pub ecpm: Option<i64>,
    /// Network-specific settings (app ids, zones, test mode, ...).
    #[serde(flatten)]
    pub settings: serde_json::Map<String, Value>,
}

/// Ads configuration delivered by the backend at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsConfig {
    /// Ads are enabled for this session.
    #[serde(rename = "adShowSession", default)]
    pub ad_show_session: bool,
    /// Interstitial waterfall. `None` when the key is absent.
    #[serde(rename = "adProviders", default)]
    pub interstitial_providers: Option<Vec<ProviderConfig>>,
    /// Rewarded waterfall. `None` when the key is absent.
    #[serde(rename = "adRewardedProviders", default)]
    pub rewarded_providers: Option<Vec<ProviderConfig>>,
    /// Minimum seconds between two ads of the same format.
    #[serde(rename = "adMinimumInterval", default)]
    pub ad_minimum_interval: i64,
    /// Maximum ads per session and format, `-1` for unlimited.
    #[serde(rename = "adMaxPerSession", default = "unlimited")]
    pub ad_max_per_session: i64,
    /// Maximum ads per network and session, `-1` for unlimited.
    #[serde(rename = "adMaxPerNetwork", default = "unlimited")]
    pub ad_max_per_network: i64,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            ad_show_session: false,
            interstitial_providers: None,
            rewarded_providers: None,
            ad_minimum_interval: 0,
            ad_max_per_session: UNLIMITED,
            ad_max_per_network: UNLIMITED,
        }
    }
}

impl AdsConfig {
    /// Parse the registration JSON.
    ///
    /// Accepts a full engage response (settings under `"parameters"`) or the
    /// parameters object on its own.
    pub fn from_engage_response(json: &str) -> Result<Self> {
        let mut root: Value = serde_json::from_str(json)
            .map_err(|e| SmartAdsError::InvalidConfig(format!("malformed JSON: {e}")))?;

        let params = if root.get("parameters").is_some() {
            match root["parameters"].take() {
                obj @ Value::Object(_) => obj,
                _ => {
                    return Err(SmartAdsError::InvalidConfig(
                        "'parameters' is not an object".into(),
                    ));
                }
            }
        } else if root.is_object() {
            root
        } else {
            return Err(SmartAdsError::InvalidConfig("expected a JSON object".into()));
        };

        let config: Self = serde_json::from_value(params)
            .map_err(|e| SmartAdsError::InvalidConfig(e.to_string()))?;
        debug!(
            interstitial = ?config.providers(AdFormat::Interstitial).map(<[_]>::len),
            rewarded = ?config.providers(AdFormat::Rewarded).map(<[_]>::len),
            "ads configuration parsed"
        );
        Ok(config)
    }

    /// Provider list for `format`, `None` when the key was absent.
    pub fn providers(&self, format: AdFormat) -> Option<&[ProviderConfig]> {
        match format {
            AdFormat::Interstitial => self.interstitial_providers.as_deref(),
            AdFormat::Rewarded => self.rewarded_providers.as_deref(),
        }
    }

    /// Session cap, `None` when unlimited.
    pub fn max_per_session(&self) -> Option<u32> {
        limit(self.ad_max_per_session)
    }

    /// Per-network cap, `None` when unlimited.
    pub fn max_per_network(&self) -> Option<u32> {
        limit(self.ad_max_per_network)
    }
}

fn limit(raw: i64) -> Option<u32> {
    if raw < 0 {
        None
    } else {
        Some(u32::try_from(raw).unwrap_or(u32::MAX))
    }
}

/// Persistent settings of the C bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Initial SDK log level until the runtime sets one.
    pub log_level: LogLevel,
    /// Directory holding the metrics database. Resolved from the environment
    /// when unset.
    pub data_dir: Option<PathBuf>,
    /// File name of the metrics database inside the data directory.
    pub metrics_file: String,
    /// Whether built-in simulated ads close as completed (rewarded).
    pub simulated_ad_completes: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            data_dir: None,
            metrics_file: "ad_metrics.db".into(),
            simulated_ad_completes: true,
        }
    }
}

impl BridgeConfig {
    /// Load settings from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGAGE_RESPONSE: &str = r#"{
        "transactionID": 2184799313132298240,
        "parameters": {
            "adShowSession": true,
            "adProviders": [
                {"adProvider": "ADMOB", "eCPM": 294, "adUnitId": "ca-app-pub-0000/1111"}
            ],
            "adRewardedProviders": [
                {"adProvider": "UNITY", "eCPM": 1060, "gameId": "106546", "testMode": false},
                {"adProvider": "VUNGLE", "eCPM": 4, "appId": "961178606"}
            ],
            "adFloorPrice": 1,
            "adMinimumInterval": 200,
            "adMaxPerSession": 20,
            "adMaxPerNetwork": 1
        }
    }"#;

    #[test]
    fn parses_full_engage_response() {
        let config = AdsConfig::from_engage_response(ENGAGE_RESPONSE).expect("parse");
        assert!(config.ad_show_session);
        assert_eq!(config.ad_minimum_interval, 200);
        assert_eq!(config.max_per_session(), Some(20));
        assert_eq!(config.max_per_network(), Some(1));

        let rewarded = config.providers(AdFormat::Rewarded).expect("rewarded list");
        assert_eq!(rewarded.len(), 2);
        assert_eq!(rewarded[0].name, "UNITY");
        assert_eq!(rewarded[0].ecpm, Some(1060));
        assert_eq!(rewarded[0].settings.get("gameId"), Some(&Value::from("106546")));
    }

    #[test]
    fn accepts_bare_parameters_and_applies_defaults() {
        let config =
            AdsConfig::from_engage_response(r#"{"adShowSession": true}"#).expect("parse");
        assert!(config.ad_show_session);
        assert_eq!(config.providers(AdFormat::Interstitial), None);
        assert_eq!(config.ad_minimum_interval, 0);
        assert_eq!(config.max_per_session(), None);
        assert_eq!(config.max_per_network(), None);
    }

    #[test]
    fn rejects_malformed_configuration() {
        assert!(matches!(
            AdsConfig::from_engage_response("not json"),
            Err(SmartAdsError::InvalidConfig(_))
        ));
        assert!(matches!(
            AdsConfig::from_engage_response(r#"{"parameters": 3}"#),
            Err(SmartAdsError::InvalidConfig(_))
        ));
        assert!(matches!(
            AdsConfig::from_engage_response(r#"{"adProviders": [{"eCPM": 1}]}"#),
            Err(SmartAdsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn bridge_config_defaults_when_file_missing() {
        let config = BridgeConfig::load("/nonexistent/smartads/bridge.json").expect("load");
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.metrics_file, "ad_metrics.db");
        assert!(config.simulated_ad_completes);
    }
}
