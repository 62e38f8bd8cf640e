// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the SmartAds bridge.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SmartAdsError};

/// Named ad placement slot.
///
/// Always non-empty; construct through [`DecisionPoint::new`] or
/// [`DecisionPoint::from_optional`] so the check happens once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionPoint(String);

impl DecisionPoint {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SmartAdsError::InvalidDecisionPoint);
        }
        Ok(Self(name))
    }

    /// `None` for a missing or empty name.
    pub fn from_optional(name: Option<&str>) -> Option<Self> {
        name.filter(|n| !n.is_empty()).map(|n| Self(n.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DecisionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two ad presentation formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdFormat {
    Interstitial,
    Rewarded,
}

impl AdFormat {
    /// Value reported as `adType` in recorded ad events.
    pub fn ad_type(&self) -> &'static str {
        match self {
            Self::Interstitial => "INTERSTITIAL",
            Self::Rewarded => "REWARDED",
        }
    }

    /// Key of the provider list in the registration parameters.
    pub fn providers_key(&self) -> &'static str {
        match self {
            Self::Interstitial => "adProviders",
            Self::Rewarded => "adRewardedProviders",
        }
    }
}

impl std::fmt::Display for AdFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interstitial => f.write_str("interstitial"),
            Self::Rewarded => f.write_str("rewarded"),
        }
    }
}

/// SDK logging level as exchanged with the scripting runtime.
///
/// The numeric values are part of the binding contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum LogLevel {
    Debug = 0,
    #[default]
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    /// Map the runtime's integer level. Unknown values yield `None`.
    pub fn from_raw(level: i32) -> Option<Self> {
        match level {
            0 => Some(Self::Debug),
            1 => Some(Self::Info),
            2 => Some(Self::Warning),
            3 => Some(Self::Error),
            _ => None,
        }
    }

    /// Equivalent `tracing` level.
    pub fn tracing_level(&self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

/// Privacy flags handed to every ad network at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    /// The user consented to personalised advertising.
    pub user_consent: bool,
    /// The user is below the age threshold for targeted ads.
    pub age_restricted: bool,
}

/// Identifier of the current analytics session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_decision_point_is_rejected() {
        assert!(matches!(
            DecisionPoint::new(""),
            Err(SmartAdsError::InvalidDecisionPoint)
        ));
        assert_eq!(DecisionPoint::from_optional(Some("")), None);
        assert_eq!(DecisionPoint::from_optional(None), None);
        assert_eq!(
            DecisionPoint::from_optional(Some("levelEnd")).map(|dp| dp.to_string()),
            Some("levelEnd".to_owned())
        );
    }

    #[test]
    fn log_levels_follow_runtime_numbering() {
        assert_eq!(LogLevel::from_raw(0), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_raw(3), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_raw(7), None);
        assert_eq!(LogLevel::Warning as i32, 2);
        assert_eq!(LogLevel::Warning.tracing_level(), tracing::Level::WARN);
    }
}
