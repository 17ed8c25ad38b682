//! Search options and their validation.
//!
//! A [`SearchConfig`] is an immutable map of option keys to JSON values.
//! Each modality resolves it into a typed options struct with the
//! validators below before any SQL is built, so an invalid option never
//! leaves a half-built fragment behind.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SearchError, SearchResult};

/// Option values for one search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchConfig(Map<String, Value>);

impl SearchConfig {
    /// Creates an empty configuration (all defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `key` set to `value`.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Looks up a raw option value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterates the configured keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns true if no option is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for SearchConfig {
    type Error = SearchError;

    fn try_from(value: Value) -> SearchResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SearchError::invalid_option(
                "config",
                other,
                "a JSON object of option keys",
            )),
        }
    }
}

/// An option whose value is one of a fixed set of names.
pub trait OptionChoice: Sized + Copy + 'static {
    /// Every accepted value, in documentation order.
    const ALL: &'static [Self];

    /// The option name of this value.
    fn as_str(&self) -> &'static str;

    /// Parses an option name.
    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == name)
    }

    /// Human-readable list of accepted values.
    fn allowed() -> String {
        let names: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
        format!("one of {}", names.join(", "))
    }
}

/// Rejects keys the modality does not know.
pub fn reject_unknown_keys(config: &SearchConfig, known: &[&str]) -> SearchResult<()> {
    let allowed = if known.is_empty() {
        "no options for this search".to_string()
    } else {
        format!("a known option ({})", known.join(", "))
    };
    match config.keys().find(|k| !known.contains(k)) {
        Some(unknown) => Err(SearchError::invalid_option(
            unknown,
            config.get(unknown).cloned().unwrap_or(Value::Null),
            allowed,
        )),
        None => Ok(()),
    }
}

/// Resolves an enumerated option, falling back to `default` when absent.
pub fn validate_choice<T: OptionChoice>(
    config: &SearchConfig,
    key: &str,
    default: T,
) -> SearchResult<T> {
    match config.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_str()
            .and_then(T::parse)
            .ok_or_else(|| SearchError::invalid_option(key, value, T::allowed())),
    }
}

/// Resolves a boolean flag.
pub fn validate_bool(config: &SearchConfig, key: &str, default: bool) -> SearchResult<bool> {
    match config.get(key) {
        None => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(SearchError::invalid_option(key, other, "one of true, false")),
    }
}

/// Resolves an optional limit-like value, which must be a positive integer.
pub fn validate_positive_int(config: &SearchConfig, key: &str) -> SearchResult<Option<i64>> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => match value.as_i64() {
            Some(n) if n > 0 => Ok(Some(n)),
            _ => Err(SearchError::invalid_option(key, value, "a positive integer")),
        },
    }
}

/// Resolves an integer within `range`.
pub fn validate_int_in(
    config: &SearchConfig,
    key: &str,
    default: i64,
    range: RangeInclusive<i64>,
) -> SearchResult<i64> {
    match config.get(key) {
        None => Ok(default),
        Some(value) => match value.as_i64() {
            Some(n) if range.contains(&n) => Ok(n),
            _ => Err(SearchError::invalid_option(
                key,
                value,
                format!("an integer between {} and {}", range.start(), range.end()),
            )),
        },
    }
}

/// Resolves `"none"` or a positive, finite float threshold.
pub fn validate_threshold(config: &SearchConfig, key: &str) -> SearchResult<Option<f64>> {
    match config.get(key) {
        None => Ok(None),
        Some(Value::String(s)) if s == "none" => Ok(None),
        Some(value) => match value.as_f64() {
            Some(t) if t.is_finite() && t > 0.0 => Ok(Some(t)),
            _ => Err(SearchError::invalid_option(
                key,
                value,
                "none or a positive number",
            )),
        },
    }
}

/// Resolves `"none"` or a non-empty name.
pub fn validate_name_or_none(config: &SearchConfig, key: &str) -> SearchResult<Option<String>> {
    match config.get(key) {
        None => Ok(None),
        Some(Value::String(s)) if s == "none" => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.clone())),
        Some(other) => Err(SearchError::invalid_option(
            key,
            other,
            "none or a non-empty name",
        )),
    }
}

/// Resolves an optional non-empty string.
pub fn validate_string(config: &SearchConfig, key: &str) -> SearchResult<Option<String>> {
    match config.get(key) {
        None => Ok(None),
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
        Some(other) => Err(SearchError::invalid_option(key, other, "a non-empty string")),
    }
}

/// Resolves an optional list of strings.
pub fn validate_string_list(
    config: &SearchConfig,
    key: &str,
) -> SearchResult<Option<Vec<String>>> {
    match config.get(key) {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SearchError::invalid_option(key, item, "a list of strings"))
            })
            .collect::<SearchResult<Vec<_>>>()
            .map(Some),
        Some(other) => Err(SearchError::invalid_option(key, other, "a list of strings")),
    }
}
