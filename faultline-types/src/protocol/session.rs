use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::ts_rfc3339;

/// The status of a release-health session.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The session is healthy.
    ///
    /// This does not necessarily indicate that the session is still active.
    Ok,
    /// The session terminated normally.
    Exited,
    /// The session resulted in an application crash.
    Crashed,
    /// The session had an unexpected abrupt termination (not crashing).
    Abnormal,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::Ok
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SessionStatus::Ok => write!(f, "ok"),
            SessionStatus::Crashed => write!(f, "crashed"),
            SessionStatus::Abnormal => write!(f, "abnormal"),
            SessionStatus::Exited => write!(f, "exited"),
        }
    }
}

/// Additional attributes for sessions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAttributes {
    /// The release version string.
    pub release: String,
    /// The environment identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

fn is_false(val: &bool) -> bool {
    !val
}

/// A session update, as it is sent to the relay in a `session` envelope item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// The session identifier.
    #[serde(rename = "sid")]
    pub session_id: Uuid,
    /// The distinct identifier.  Should be device or user ID.
    #[serde(rename = "did", default, skip_serializing_if = "Option::is_none")]
    pub distinct_id: Option<String>,
    /// An optional logical clock.
    #[serde(rename = "seq", default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// The timestamp of when the session change event was created.
    #[serde(default = "SystemTime::now", with = "ts_rfc3339")]
    pub timestamp: SystemTime,
    /// The timestamp of when the session itself started.
    #[serde(with = "ts_rfc3339")]
    pub started: SystemTime,
    /// A flag that indicates that this is the initial transmission of the session.
    #[serde(default, skip_serializing_if = "is_false")]
    pub init: bool,
    /// An optional duration of the session in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// The status of the session.
    #[serde(default)]
    pub status: SessionStatus,
    /// The number of errors that occurred.
    pub errors: u64,
    /// The session event attributes.
    #[serde(rename = "attrs")]
    pub attributes: SessionAttributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_update_serialization() {
        let update = SessionUpdate {
            session_id: "22d00b3f-d1b1-4b5d-8d20-49d138cd8a9c".parse().unwrap(),
            distinct_id: Some("user1".into()),
            sequence: None,
            timestamp: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_595_256_674),
            started: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_595_256_600),
            init: true,
            duration: None,
            status: SessionStatus::Ok,
            errors: 0,
            attributes: SessionAttributes {
                release: "app@1.0.0".into(),
                environment: Some("production".into()),
            },
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains(r#""init":true"#));
        assert!(json.contains(r#""started":"2020-07-20T14:50:00Z""#));
        let roundtrip: SessionUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, update);
    }
}
