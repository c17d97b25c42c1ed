use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::utils::ts_seconds_float;

/// The data category an envelope item (or dropped event) belongs to.
///
/// Rate limits and client reports are tracked per category.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    /// An error or message event.
    Error,
    /// A transaction event.
    Transaction,
    /// A release-health session update.
    Session,
    /// A binary attachment.
    Attachment,
    /// Everything else.
    Default,
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DataCategory::Error => write!(f, "error"),
            DataCategory::Transaction => write!(f, "transaction"),
            DataCategory::Session => write!(f, "session"),
            DataCategory::Attachment => write!(f, "attachment"),
            DataCategory::Default => write!(f, "default"),
        }
    }
}

/// The reason an event was discarded before it could be delivered.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// An event processor (integration or scope) returned `None`.
    EventProcessor,
    /// The `before_send` callback returned `None`.
    BeforeSend,
    /// The event lost the sampling dice roll.
    SampleRate,
    /// The local transport queue was at capacity.
    QueueOverflow,
    /// A rate limit communicated by the relay was in effect.
    RatelimitBackoff,
    /// Delivery failed with a non-retryable response.
    SendError,
    /// Delivery failed after exhausting retries on a transient error.
    NetworkError,
}

/// A single per-reason, per-category count of discarded events.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct DiscardedEvent {
    /// Why the events were discarded.
    pub reason: DiscardReason,
    /// The data category of the discarded events.
    pub category: DataCategory,
    /// How many events were discarded.
    pub quantity: u32,
}

/// A client report, aggregating counts of events the SDK had to drop.
///
/// This is sent as its own lightweight envelope item so operators can see
/// gaps in their telemetry coverage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClientReport {
    /// The timestamp at which the report was created.
    #[serde(default = "SystemTime::now", with = "ts_seconds_float")]
    pub timestamp: SystemTime,
    /// The aggregated drop counts.
    pub discarded_events: Vec<DiscardedEvent>,
}

impl Default for ClientReport {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            discarded_events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_report_serialization() {
        let report = ClientReport {
            timestamp: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_595_256_674),
            discarded_events: vec![DiscardedEvent {
                reason: DiscardReason::QueueOverflow,
                category: DataCategory::Error,
                quantity: 2,
            }],
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"timestamp":1595256674,"discarded_events":[{"reason":"queue_overflow","category":"error","quantity":2}]}"#
        );
    }
}
