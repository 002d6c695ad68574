//! Locations, addresses, filters and the envelope that travels over the host channel.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::{collections::BTreeMap, fmt};

/// A logical endpoint category inside an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Background,
    Options,
    Popup,
    Content,
    Any,
}

impl Location {
    /// Wire name, as it appears in an envelope's `source`/`destination`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Location::Background => "background",
            Location::Options => "options",
            Location::Popup => "popup",
            Location::Content => "content",
            Location::Any => "any",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar filter value: text, number or boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl FilterValue {
    /// Strict equality against a raw JSON value. Numbers compare numerically,
    /// different kinds never match, non-scalars never match.
    pub fn matches(&self, candidate: &Value) -> bool {
        match (self, candidate) {
            (FilterValue::Bool(a), Value::Bool(b)) => a == b,
            (FilterValue::Text(a), Value::String(b)) => a == b,
            (FilterValue::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => a == b,
            },
            _ => false,
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

macro_rules! filter_value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(v: $ty) -> Self {
                    FilterValue::Number(Number::from(v))
                }
            }
        )*
    };
}

filter_value_from_int!(i32, i64, u32, u64);

/// Key/value metadata used for fine-grained matching.
///
/// Held by a subscriber, it is a *required subset*: every key must be present
/// in the message's filters with an equal value. Extra keys on the message are
/// ignored, and the empty set matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeMap<String, FilterValue>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check this set against the raw `filters` field of an incoming envelope.
    /// A missing or non-object field carries no keys.
    pub fn matches(&self, candidate: Option<&Value>) -> bool {
        let received = candidate.and_then(Value::as_object);
        self.0.iter().all(|(key, expected)| {
            received
                .and_then(|filters| filters.get(key))
                .is_some_and(|value| expected.matches(value))
        })
    }
}

impl<K, V> FromIterator<(K, V)> for FilterSet
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for FilterSet
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Source/destination/filters. A routing predicate when held by a subscriber,
/// routing metadata when attached to an outgoing envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSet>,
}

impl MessagePath {
    /// The wildcard path: matches every envelope.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn between(source: Location, destination: Location) -> Self {
        Self {
            source: Some(source),
            destination: Some(destination),
            filters: None,
        }
    }

    pub fn with_source(mut self, source: Location) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_destination(mut self, destination: Location) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_filters(mut self, filters: impl Into<FilterSet>) -> Self {
        self.filters = Some(filters.into());
        self
    }

    /// Evaluate the address predicate and then the filter predicate against a
    /// raw incoming envelope. Anything malformed fails closed.
    pub fn matches(&self, message: &Value) -> bool {
        let Some(envelope) = message.as_object() else {
            return false;
        };
        location_matches(self.source, envelope.get("source"))
            && location_matches(self.destination, envelope.get("destination"))
            && self
                .filters
                .as_ref()
                .map_or(true, |filters| filters.matches(envelope.get("filters")))
    }
}

fn location_matches(expected: Option<Location>, actual: Option<&Value>) -> bool {
    match expected {
        None => true,
        Some(location) => actual.and_then(Value::as_str) == Some(location.as_str()),
    }
}

/// The unit transmitted over the host channel: opaque `data` plus routing
/// fields as siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub data: T,
    #[serde(flatten)]
    pub path: MessagePath,
}

impl<T> Envelope<T> {
    pub fn new(data: T, path: MessagePath) -> Self {
        Self { data, path }
    }
}
