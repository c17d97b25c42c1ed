use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::ts_seconds_float;

use super::event::{ClientSdkInfo, Context, Map, SpanId, TraceId, User, Value};

/// A single span observed during a transaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Span {
    /// The ID of the span.
    pub span_id: SpanId,
    /// Determines which trace the span belongs to.
    pub trace_id: TraceId,
    /// Determines the parent of this span, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    /// Short code identifying the type of operation the span is measuring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    /// Longer description of the span's operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The status of the span (e.g. `ok`, `cancelled`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// The timestamp at the measuring of the span finished.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_ts_seconds_float")]
    pub timestamp: Option<SystemTime>,
    /// The timestamp at the measuring of the span started.
    #[serde(default = "SystemTime::now", with = "ts_seconds_float")]
    pub start_timestamp: SystemTime,
    /// Optional tags to be attached to the span.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Map<String, String>,
    /// Arbitrary additional data on the span.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl Default for Span {
    fn default() -> Span {
        Span {
            span_id: Default::default(),
            trace_id: Default::default(),
            parent_span_id: None,
            op: None,
            description: None,
            status: None,
            timestamp: None,
            start_timestamp: SystemTime::now(),
            tags: Map::new(),
            data: Map::new(),
        }
    }
}

/// Represents a finished transaction as sent in a transaction envelope item.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction event.
    #[serde(serialize_with = "super::event::serialize_event_id_simple")]
    pub event_id: Uuid,
    /// The transaction name.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "transaction")]
    pub name: Option<String>,
    /// A release identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// An environment identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Optionally user data attached to the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Optional tags to be attached to the transaction.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Map<String, String>,
    /// Optional extra information to be sent with the transaction.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    /// Optional contexts, holding at least the trace context.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub contexts: Map<String, Context>,
    /// A platform identifier.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// The timestamp at which the transaction finished.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_ts_seconds_float")]
    pub timestamp: Option<SystemTime>,
    /// The timestamp at which the transaction started.
    #[serde(default = "SystemTime::now", with = "ts_seconds_float")]
    pub start_timestamp: SystemTime,
    /// The collection of finished spans that happened within this transaction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<Span>,
    /// Information about the SDK that generated this transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk: Option<ClientSdkInfo>,
}

fn default_platform() -> String {
    "native".into()
}

impl Default for Transaction {
    fn default() -> Transaction {
        Transaction {
            event_id: crate::random_uuid(),
            name: None,
            release: None,
            environment: None,
            user: None,
            tags: Map::new(),
            extra: Map::new(),
            contexts: Map::new(),
            platform: default_platform(),
            timestamp: None,
            start_timestamp: SystemTime::now(),
            spans: Vec::new(),
            sdk: None,
        }
    }
}

impl Transaction {
    /// Creates a new transaction with a random ID.
    pub fn new() -> Transaction {
        Default::default()
    }
}

mod opt_ts_seconds_float {
    use super::*;
    use serde::{de, ser};

    pub fn deserialize<'de, D>(d: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        Ok(Some(ts_seconds_float::deserialize(d)?))
    }

    pub fn serialize<S>(st: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match st {
            Some(st) => ts_seconds_float::serialize(st, serializer),
            None => serializer.serialize_none(),
        }
    }
}
