//! Configuration (spec.md's "out of scope" note, expanded per SPEC_FULL.md
//! §12): a generic key/value façade plus struct-unmarshal, with no opinion
//! on where the values came from. The framework never reads files,
//! environment variables, or CLI flags; the embedding application builds a
//! [`ConfigView`] however it likes and hands it to the container as an
//! `Instance` registration.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DiError, DiResult};
use crate::key::Identity;

/// A flat key/value configuration snapshot, backed by `serde_json::Value` so
/// any serde-deserializable type can be unmarshaled out of it.
#[derive(Debug, Clone, Default)]
pub struct ConfigView {
    values: HashMap<String, Value>,
}

impl ConfigView {
    pub fn new() -> Self {
        ConfigView::default()
    }

    /// Builds a view directly from a flat map, e.g. already-parsed JSON/TOML
    /// top-level keys.
    pub fn from_map(values: HashMap<String, Value>) -> Self {
        ConfigView { values }
    }

    /// Parses `raw` as a single JSON object and uses its top-level fields as
    /// keys.
    pub fn from_json_str(raw: &str) -> DiResult<Self> {
        let parsed: Value = serde_json::from_str(raw)
            .map_err(|err| DiError::Provider(Identity::of::<ConfigView>(), err.to_string()))?;
        let values = match parsed {
            Value::Object(map) => map.into_iter().collect(),
            _ => return Err(DiError::Provider(Identity::of::<ConfigView>(), "config root must be a JSON object".into())),
        };
        Ok(ConfigView { values })
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Unmarshals the value at `key` into `T`. Missing keys and type
    /// mismatches both surface as [`DiError::Provider`] naming `ConfigView`'s
    /// identity, since configuration lookup failures are application-level
    /// errors, not framework-internal ones.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> DiResult<T> {
        let raw = self
            .values
            .get(key)
            .ok_or_else(|| DiError::Provider(Identity::of::<ConfigView>(), format!("missing config key '{key}'")))?;
        serde_json::from_value(raw.clone())
            .map_err(|err| DiError::Provider(Identity::of::<ConfigView>(), format!("config key '{key}': {err}")))
    }

    /// Like [`ConfigView::get`] but returns `default` for a missing key
    /// instead of an error; a present-but-malformed value is still an error.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> DiResult<T> {
        if self.values.contains_key(key) {
            self.get(key)
        } else {
            Ok(default)
        }
    }
}
