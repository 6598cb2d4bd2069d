//! Per-implementation settings.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// The settings object an implementation is initialized with.
///
/// A thin wrapper over a JSON object. Backends deserialize their own typed
/// settings out of it with [`Settings::parse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self` with every key of `overrides` replacing its own.
    pub fn merge(&self, overrides: &Settings) -> Settings {
        let mut merged = self.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        Settings(merged)
    }

    /// Deterministic hash of these settings.
    ///
    /// SHA-256 over canonical JSON (sorted keys at every depth), so two
    /// settings objects with the same content always share a fingerprint.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let canonical = canonicalize_json(&Value::Object(self.0.clone()));
        let json = serde_json::to_string(&canonical).unwrap_or_default();
        format!("{:x}", Sha256::digest(json.as_bytes()))
    }

    /// Deserialize into an implementation's typed settings.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| Error::Configuration(format!("invalid settings: {}", e)))
    }
}

impl From<Map<String, Value>> for Settings {
    fn from(map: Map<String, Value>) -> Self {
        Settings(map)
    }
}

impl TryFrom<Value> for Settings {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Settings(map)),
            Value::Null => Ok(Settings::new()),
            other => Err(Error::Configuration(format!(
                "settings must be a JSON object, got {}",
                other
            ))),
        }
    }
}

fn canonicalize_json(value: &Value) -> Value {
    use std::collections::BTreeMap;

    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<_, _> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize_json(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(canonicalize_json).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_ignores_key_order() {
        let a: Settings = json!({"root": "/tmp", "opts": {"x": 1, "y": 2}})
            .try_into()
            .unwrap();
        let b: Settings = json!({"opts": {"y": 2, "x": 1}, "root": "/tmp"})
            .try_into()
            .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_differs_on_content() {
        let a = Settings::new().with("root", "/a");
        let b = Settings::new().with("root", "/b");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_merge_overrides_win() {
        let base = Settings::new().with("root", "/a").with("mode", "rw");
        let merged = base.merge(&Settings::new().with("root", "/b"));
        assert_eq!(merged.get_str("root"), Some("/b"));
        assert_eq!(merged.get_str("mode"), Some("rw"));
        // base untouched
        assert_eq!(base.get_str("root"), Some("/a"));
    }

    #[test]
    fn test_parse_typed() {
        #[derive(Deserialize)]
        struct Local {
            root: String,
            #[serde(default)]
            create: bool,
        }

        let parsed: Local = Settings::new().with("root", "/data").parse().unwrap();
        assert_eq!(parsed.root, "/data");
        assert!(!parsed.create);

        let err = Settings::new().parse::<Local>().err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Settings::try_from(json!([1, 2])).is_err());
        assert!(Settings::try_from(Value::Null).unwrap().is_empty());
    }
}
