use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use thiserror::Error;

use crate::dsn::Dsn;
use crate::utils::datetime_to_timestamp;

/// The current latest protocol version.
pub const LATEST_PROTOCOL_VERSION: u16 = 7;

/// Represents an auth header parsing error.
#[derive(Debug, Error)]
#[error("invalid auth header")]
pub struct AuthParseError;

/// Represents the auth header the relay expects on envelope submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct Auth {
    timestamp: Option<f64>,
    client: Option<String>,
    version: u16,
    key: String,
    secret: Option<String>,
}

impl Auth {
    /// Returns the unix timestamp the client defined.
    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    /// Returns the protocol version the client speaks.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Returns the public key.
    pub fn public_key(&self) -> &str {
        &self.key
    }

    /// Returns the client's agent string.
    pub fn client_agent(&self) -> Option<&str> {
        self.client.as_deref()
    }
}

impl fmt::Display for Auth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Faultline faultline_key={}, faultline_version={}",
            self.key, self.version
        )?;
        if let Some(ts) = self.timestamp {
            write!(f, ", faultline_timestamp={ts}")?;
        }
        if let Some(ref client) = self.client {
            write!(f, ", faultline_client={client}")?;
        }
        if let Some(ref secret) = self.secret {
            write!(f, ", faultline_secret={secret}")?;
        }
        Ok(())
    }
}

impl FromStr for Auth {
    type Err = AuthParseError;

    fn from_str(s: &str) -> Result<Auth, AuthParseError> {
        let mut rv = Auth {
            timestamp: None,
            client: None,
            version: LATEST_PROTOCOL_VERSION,
            key: String::new(),
            secret: None,
        };
        let mut base_iter = s.splitn(2, ' ');
        if !base_iter
            .next()
            .unwrap_or_default()
            .eq_ignore_ascii_case("faultline")
        {
            return Err(AuthParseError);
        }
        for item in base_iter.next().unwrap_or_default().split(',') {
            let mut kviter = item.trim().split('=');
            match (kviter.next(), kviter.next()) {
                (Some("faultline_timestamp"), Some(ts)) => {
                    rv.timestamp = ts.parse().ok();
                }
                (Some("faultline_client"), Some(client)) => {
                    rv.client = Some(client.into());
                }
                (Some("faultline_version"), Some(version)) => {
                    rv.version = version.parse().map_err(|_| AuthParseError)?;
                }
                (Some("faultline_key"), Some(key)) => {
                    rv.key = key.into();
                }
                (Some("faultline_secret"), Some(secret)) => {
                    rv.secret = Some(secret.into());
                }
                _ => {}
            }
        }
        if rv.key.is_empty() {
            return Err(AuthParseError);
        }
        Ok(rv)
    }
}

pub(crate) fn auth_from_dsn_and_client(dsn: &Dsn, client: Option<&str>) -> Auth {
    Auth {
        timestamp: Some(datetime_to_timestamp(&SystemTime::now())),
        client: client.map(ToString::to_string),
        version: LATEST_PROTOCOL_VERSION,
        key: dsn.public_key().to_string(),
        secret: dsn.secret_key().map(ToString::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_roundtrip() {
        let dsn: Dsn = "https://key@ingest.faultline.dev/1".parse().unwrap();
        let auth = dsn.to_auth(Some("faultline.rust/0.4.0"));
        let parsed: Auth = auth.to_string().parse().unwrap();
        assert_eq!(parsed.public_key(), "key");
        assert_eq!(parsed.version(), LATEST_PROTOCOL_VERSION);
        assert_eq!(parsed.client_agent(), Some("faultline.rust/0.4.0"));
        assert!(parsed.timestamp().is_some());
    }

    #[test]
    fn test_auth_parse_errors() {
        assert!("Basic foo=bar".parse::<Auth>().is_err());
        assert!("Faultline faultline_version=7".parse::<Auth>().is_err());
    }
}
