use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::utils::ts_seconds_float;

/// An arbitrary JSON value, re-exported for protocol payloads.
pub use serde_json::Value;

/// The type of a protocol map.
pub type Map<K, V> = std::collections::BTreeMap<K, V>;

/// A wrapper type for collections with attached meta data, serialized as
/// `{"values": [...]}` on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Values<T> {
    /// The values of the collection.
    pub values: Vec<T>,
}

impl<T> Values<T> {
    /// Creates an empty values struct.
    pub fn new() -> Values<T> {
        Values { values: Vec::new() }
    }

    /// Checks whether this struct is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<T> From<Vec<T>> for Values<T> {
    fn from(values: Vec<T>) -> Values<T> {
        Values { values }
    }
}

impl<T> std::ops::Deref for Values<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.values
    }
}

impl<T> std::ops::DerefMut for Values<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.values
    }
}

/// Raised when a level cannot be parsed from a string.
#[derive(Debug, Error)]
#[error("invalid level")]
pub struct ParseLevelError;

/// Represents the level of severity of an event or breadcrumb.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Indicates very spammy debug information.
    Debug,
    /// Informational messages.
    Info,
    /// A warning.
    Warning,
    /// An error.
    #[default]
    Error,
    /// Similar to an error but indicates a critical event that usually causes a shutdown.
    Fatal,
}

impl Level {
    /// A quick way to check if the level is `debug`.
    pub fn is_debug(&self) -> bool {
        *self == Level::Debug
    }

    /// A quick way to check if the level is `info`.
    pub fn is_info(&self) -> bool {
        *self == Level::Info
    }

    /// A quick way to check if the level is `error`.
    pub fn is_error(&self) -> bool {
        *self == Level::Error
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(string: &str) -> Result<Level, Self::Err> {
        Ok(match string {
            "debug" => Level::Debug,
            "info" | "log" => Level::Info,
            "warning" | "warn" => Level::Warning,
            "error" => Level::Error,
            "fatal" | "critical" => Level::Fatal,
            _ => return Err(ParseLevelError),
        })
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Level::Debug => write!(f, "debug"),
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
            Level::Fatal => write!(f, "fatal"),
        }
    }
}

/// A trace identifier, 16 random bytes rendered as 32 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceId(pub [u8; 16]);

impl Default for TraceId {
    fn default() -> Self {
        TraceId(*Uuid::new_v4().as_bytes())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TraceId({self})")
    }
}

impl FromStr for TraceId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<TraceId, ParseIdError> {
        let mut bytes = [0; 16];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseIdError)?;
        Ok(TraceId(bytes))
    }
}

/// A span identifier, 8 random bytes rendered as 16 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanId(pub [u8; 8]);

impl Default for SpanId {
    fn default() -> Self {
        let mut bytes = [0; 8];
        bytes.copy_from_slice(&Uuid::new_v4().as_bytes()[..8]);
        SpanId(bytes)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SpanId({self})")
    }
}

impl FromStr for SpanId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<SpanId, ParseIdError> {
        let mut bytes = [0; 8];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseIdError)?;
        Ok(SpanId(bytes))
    }
}

/// Raised when a trace or span id cannot be parsed from hex.
#[derive(Debug, Error)]
#[error("invalid id")]
pub struct ParseIdError;

macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<$ty, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_serde!(TraceId);
hex_serde!(SpanId);

/// Represents user info.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct User {
    /// The ID of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The email address of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// The remote ip address of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// A human readable username of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Additional data that should be sent along.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Represents a single breadcrumb.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Breadcrumb {
    /// The timestamp of the breadcrumb.  This is required.
    #[serde(default = "SystemTime::now", with = "ts_seconds_float")]
    pub timestamp: SystemTime,
    /// The type of the breadcrumb.
    #[serde(rename = "type", default = "default_breadcrumb_type")]
    pub ty: String,
    /// The optional category of the breadcrumb.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The level of the breadcrumb.  It defaults to info.
    #[serde(default = "default_breadcrumb_level")]
    pub level: Level,
    /// An optional human readable message for the breadcrumb.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Arbitrary breadcrumb data that should be sent along.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl Default for Breadcrumb {
    fn default() -> Breadcrumb {
        Breadcrumb {
            timestamp: SystemTime::now(),
            ty: default_breadcrumb_type(),
            category: None,
            level: default_breadcrumb_level(),
            message: None,
            data: Map::new(),
        }
    }
}

fn default_breadcrumb_type() -> String {
    "default".into()
}

fn default_breadcrumb_level() -> Level {
    Level::Info
}

/// A single exception.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Exception {
    /// The type of the exception.
    #[serde(rename = "type")]
    pub ty: String,
    /// The optional value of the exception.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// An optional module for this exception.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// An arbitrary context record attached to an event, keyed by context name.
pub type Context = Map<String, Value>;

/// The trace context, stored under the `trace` key of an event's contexts.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TraceContext {
    /// The id of the trace.
    pub trace_id: TraceId,
    /// The id of the span this context refers to.
    pub span_id: SpanId,
    /// The id of the parent span, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    /// A short machine readable identifier of the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    /// A human readable description of the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The status of the operation (e.g. `ok`, `cancelled`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl From<TraceContext> for Context {
    fn from(ctx: TraceContext) -> Context {
        match serde_json::to_value(ctx) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => Context::new(),
        }
    }
}

/// Information about the SDK that generated an event.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClientSdkInfo {
    /// The name of the SDK.
    pub name: String,
    /// The version of the SDK.
    pub version: String,
    /// A list of integrations with the SDK that were activated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrations: Vec<String>,
}

/// Represents a full event for the relay.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    /// The ID of the event.
    #[serde(default = "crate::random_uuid", serialize_with = "serialize_event_id_simple")]
    pub event_id: Uuid,
    /// The level of the event.
    #[serde(default)]
    pub level: Level,
    /// An optional fingerprint configuration to override the default.
    #[serde(default = "default_fingerprint", skip_serializing_if = "is_default_fingerprint")]
    pub fingerprint: Vec<String>,
    /// The culprit or transaction name of the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// A message to be sent with the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// A platform identifier for this event.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// The timestamp of when the event was created.
    #[serde(default = "SystemTime::now", with = "ts_seconds_float")]
    pub timestamp: SystemTime,
    /// An optional server name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// The release version of the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// The environment of the application (e.g. `production`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Optionally user data to be sent along.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// One or multiple chained (nested) exceptions.
    #[serde(default, skip_serializing_if = "Values::is_empty")]
    pub exception: Values<Exception>,
    /// A list of breadcrumbs.
    #[serde(default, skip_serializing_if = "Values::is_empty")]
    pub breadcrumbs: Values<Breadcrumb>,
    /// Optional tags to be attached to the event.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Map<String, String>,
    /// Optional extra information to be sent with the event.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    /// Optional contexts describing the environment (e.g. device, os or browser).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub contexts: Map<String, Context>,
    /// Information about the SDK that generated this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk: Option<ClientSdkInfo>,
}

fn default_fingerprint() -> Vec<String> {
    vec!["{{ default }}".into()]
}

fn is_default_fingerprint(fp: &[String]) -> bool {
    fp.len() == 1 && (fp[0] == "{{ default }}" || fp[0] == "{{default}}")
}

fn default_platform() -> String {
    "native".into()
}

pub(super) fn serialize_event_id_simple<S: serde::Serializer>(
    uuid: &Uuid,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&uuid.as_simple().to_string())
}

impl Default for Event {
    fn default() -> Event {
        Event {
            event_id: crate::random_uuid(),
            level: Level::Error,
            fingerprint: default_fingerprint(),
            transaction: None,
            message: None,
            platform: default_platform(),
            timestamp: SystemTime::now(),
            server_name: None,
            release: None,
            environment: None,
            user: None,
            exception: Values::new(),
            breadcrumbs: Values::new(),
            tags: Map::new(),
            extra: Map::new(),
            contexts: Map::new(),
            sdk: None,
        }
    }
}

impl Event {
    /// Creates a new event with a random ID and current timestamp.
    pub fn new() -> Event {
        Default::default()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Event(id: {}, ts: {})", self.event_id, crate::utils::to_rfc3339(&self.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("critical".parse::<Level>().unwrap(), Level::Fatal);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_trace_id_roundtrip() {
        let id = TraceId::default();
        let parsed: TraceId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.to_string().len(), 32);
    }

    #[test]
    fn test_event_serialization_skips_defaults() {
        let event = Event {
            event_id: "22d00b3f-d1b1-4b5d-8d20-49d138cd8a9c".parse().unwrap(),
            timestamp: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_595_256_674),
            ..Default::default()
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event_id":"22d00b3fd1b14b5d8d2049d138cd8a9c","level":"error","platform":"native","timestamp":1595256674}"#
        );
    }
}
