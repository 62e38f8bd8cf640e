// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed key-value payloads crossing the scripting boundary.
//
// Engagement parameters and remote notification payloads arrive as JSON
// strings.  They are parsed once, at the boundary, into a closed set of value
// variants so the rest of the code never handles untyped JSON.  `null` members
// are dropped during conversion.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SmartAdsError};
use crate::strings::json_string_from_map;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(ParamMap),
}

/// String-keyed mapping of parameter values, ordered by key.
pub type ParamMap = BTreeMap<String, ParamValue>;

impl ParamValue {
    /// Convert a JSON value. Returns `None` for `null`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                // u64 beyond i64::MAX and real numbers both land here.
                None => n.as_f64().map(Self::Float),
            },
            Value::String(s) => Some(Self::String(s)),
            Value::Array(items) => Some(Self::List(
                items.into_iter().filter_map(Self::from_json).collect(),
            )),
            Value::Object(members) => Some(Self::Map(map_from_json(members))),
        }
    }

    /// Integer view. Floats with no fractional part are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

fn map_from_json(members: serde_json::Map<String, Value>) -> ParamMap {
    members
        .into_iter()
        .filter_map(|(k, v)| ParamValue::from_json(v).map(|v| (k, v)))
        .collect()
}

/// Parse a JSON document whose top level must be an object.
pub fn parse_object(json: &str) -> Result<ParamMap> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(members) => Ok(map_from_json(members)),
        other => Err(SmartAdsError::InvalidParameters(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The `parameters` object of an engagement response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EngageParams(ParamMap);

impl EngageParams {
    pub fn new(values: ParamMap) -> Self {
        Self(values)
    }

    /// Parse the serialized parameters passed with eligibility and show calls.
    pub fn from_json(json: &str) -> Result<Self> {
        parse_object(json).map(Self)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(ParamValue::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(ParamValue::as_bool)
    }

    pub fn as_map(&self) -> &ParamMap {
        &self.0
    }
}

/// Payload of a remote (push) notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NotificationPayload(ParamMap);

impl NotificationPayload {
    pub fn new(values: ParamMap) -> Self {
        Self(values)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        parse_object(json).map(Self)
    }

    pub fn to_json(&self) -> Result<String> {
        json_string_from_map(&self.0)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn as_map(&self) -> &ParamMap {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engagement_parameters() {
        let params = EngageParams::from_json(
            r#"{"adShowPoint":true,"ddnaAdSessionCount":3,"ddnaAdShowWaitSecs":2.0,"label":"x"}"#,
        )
        .expect("parse");
        assert_eq!(params.get_bool("adShowPoint"), Some(true));
        assert_eq!(params.get_i64("ddnaAdSessionCount"), Some(3));
        assert_eq!(params.get_i64("ddnaAdShowWaitSecs"), Some(2));
        assert_eq!(params.get("label").and_then(ParamValue::as_str), Some("x"));
        assert_eq!(params.get_i64("missing"), None);
    }

    #[test]
    fn nulls_are_dropped() {
        let params = EngageParams::from_json(r#"{"a":null,"b":{"c":null,"d":1}}"#).expect("parse");
        assert!(!params.contains("a"));
        match params.get("b") {
            Some(ParamValue::Map(inner)) => {
                assert_eq!(inner.len(), 1);
                assert_eq!(inner.get("d"), Some(&ParamValue::Int(1)));
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert!(matches!(
            EngageParams::from_json("[1,2]"),
            Err(SmartAdsError::InvalidParameters(_))
        ));
        assert!(matches!(
            EngageParams::from_json("{not json"),
            Err(SmartAdsError::Serialization(_))
        ));
    }

    #[test]
    fn fractional_numbers_are_not_integers() {
        assert_eq!(ParamValue::Float(2.5).as_i64(), None);
        assert_eq!(ParamValue::Float(4.0).as_i64(), Some(4));
    }

    #[test]
    fn notification_payload_serializes_back_to_json() {
        let payload =
            NotificationPayload::from_json(r#"{"aps":{"alert":"hi","badge":1},"_ddId":7}"#)
                .expect("parse");
        let json = payload.to_json().expect("serialize");
        let reparsed: Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(reparsed["aps"]["alert"], "hi");
        assert_eq!(reparsed["_ddId"], 7);
    }

    #[test]
    fn notification_json_has_sorted_keys() {
        let mut payload = NotificationPayload::default();
        payload.insert("z", 1_i64);
        payload.insert("a", "first");
        assert_eq!(payload.to_json().expect("serialize"), r#"{"a":"first","z":1}"#);
        assert_eq!(
            payload.to_json().expect("serialize"),
            json_string_from_map(payload.as_map()).expect("serialize")
        );
    }
}
