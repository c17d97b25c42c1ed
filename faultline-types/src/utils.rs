//! Useful utilities for working with timestamps.

use std::time::{Duration, SystemTime};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Converts a `SystemTime` object into a float unix timestamp.
pub fn datetime_to_timestamp(st: &SystemTime) -> f64 {
    match st.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => duration.as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// Converts a float unix timestamp into a `SystemTime`, if representable.
pub fn timestamp_to_datetime(ts: f64) -> Option<SystemTime> {
    if !ts.is_finite() || ts < 0.0 {
        return None;
    }
    let duration = Duration::from_secs_f64(ts);
    SystemTime::UNIX_EPOCH.checked_add(duration)
}

/// Formats a `SystemTime` as an RFC3339 string.
pub fn to_rfc3339(st: &SystemTime) -> String {
    st.duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .and_then(|duration| TryFrom::try_from(duration).ok())
        .and_then(|duration| OffsetDateTime::UNIX_EPOCH.checked_add(duration))
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_default()
}

/// Serde support for timestamps as float unix seconds.
pub mod ts_seconds_float {
    use std::fmt;

    use serde::{de, ser};

    use super::*;

    /// Deserializes a float unix timestamp into a `SystemTime`.
    pub fn deserialize<'de, D>(d: D) -> Result<SystemTime, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        d.deserialize_any(SecondsTimestampVisitor)
    }

    /// Serializes a `SystemTime` as float unix seconds.
    pub fn serialize<S>(st: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match st.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(duration) => {
                if duration.subsec_nanos() == 0 {
                    serializer.serialize_u64(duration.as_secs())
                } else {
                    serializer.serialize_f64(duration.as_secs_f64())
                }
            }
            Err(_) => Err(ser::Error::custom(format!(
                "invalid `SystemTime` instance: {st:?}"
            ))),
        }
    }

    struct SecondsTimestampVisitor;

    impl de::Visitor<'_> for SecondsTimestampVisitor {
        type Value = SystemTime;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a unix timestamp")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<SystemTime, E> {
            timestamp_to_datetime(value)
                .ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<SystemTime, E> {
            timestamp_to_datetime(value as f64)
                .ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<SystemTime, E> {
            timestamp_to_datetime(value as f64)
                .ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }
    }
}

/// Serde support for timestamps in RFC3339 format.
pub mod ts_rfc3339 {
    use std::fmt;

    use serde::{de, ser};
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    use super::*;

    /// Deserializes an RFC3339 string into a `SystemTime`.
    pub fn deserialize<'de, D>(d: D) -> Result<SystemTime, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        d.deserialize_str(Rfc3339Visitor)
    }

    /// Serializes a `SystemTime` in RFC3339 format.
    pub fn serialize<S>(st: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_str(&to_rfc3339(st))
    }

    struct Rfc3339Visitor;

    impl de::Visitor<'_> for Rfc3339Visitor {
        type Value = SystemTime;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "an rfc3339 timestamp")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<SystemTime, E> {
            let dt = OffsetDateTime::parse(value, &Rfc3339).map_err(E::custom)?;
            let ts = dt.unix_timestamp_nanos() as f64 / 1_000_000_000.0;
            timestamp_to_datetime(ts).ok_or_else(|| E::custom("timestamp out of range"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip() {
        let st = SystemTime::UNIX_EPOCH + Duration::from_millis(1_595_256_674_296);
        let ts = datetime_to_timestamp(&st);
        assert_eq!(timestamp_to_datetime(ts), Some(st));
    }

    #[test]
    fn test_rfc3339() {
        let st = SystemTime::UNIX_EPOCH + Duration::from_secs(1_595_256_674);
        assert_eq!(to_rfc3339(&st), "2020-07-20T14:51:14Z");
    }
}
