use std::borrow::Cow;
use std::env;
#[cfg(any(feature = "ureq", feature = "panic"))]
use std::sync::Arc;

use crate::types::Dsn;
use crate::ClientOptions;

/// Apply default client options.
///
/// In addition to the static defaults on [`ClientOptions`] this fills in the
/// values that are looked up from the environment, installs the default
/// transport factory and, unless `default_integrations` is disabled, puts the
/// default integrations in front of the user supplied ones:
///
/// * [`PanicIntegration`](crate::integrations::panic::PanicIntegration)
///
/// Environment fallbacks:
///
/// * `dsn` from `FAULTLINE_DSN`
/// * `release` from `FAULTLINE_RELEASE`
/// * `environment` from `FAULTLINE_ENVIRONMENT`, and otherwise `debug` or
///   `release` depending on the build profile
pub fn apply_defaults(mut opts: ClientOptions) -> ClientOptions {
    #[cfg(feature = "ureq")]
    if opts.transport.is_none() {
        opts.transport = Some(Arc::new(crate::transports::DefaultTransportFactory));
    }
    if opts.default_integrations {
        #[cfg(feature = "panic")]
        opts.integrations.insert(
            0,
            Arc::new(crate::integrations::panic::PanicIntegration::new()),
        );
    }
    if opts.dsn.is_none() {
        opts.dsn = env::var("FAULTLINE_DSN")
            .ok()
            .and_then(|dsn| dsn.parse::<Dsn>().ok());
    }
    if opts.release.is_none() {
        opts.release = env::var("FAULTLINE_RELEASE").ok().map(Cow::Owned);
    }
    if opts.environment.is_none() {
        opts.environment = env::var("FAULTLINE_ENVIRONMENT")
            .ok()
            .map(Cow::Owned)
            .or_else(|| {
                Some(Cow::Borrowed(if cfg!(debug_assertions) {
                    "debug"
                } else {
                    "release"
                }))
            });
    }
    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_environment() {
        let opts = apply_defaults(ClientOptions {
            environment: None,
            ..Default::default()
        });
        assert!(opts.environment.is_some());

        let opts = apply_defaults(ClientOptions {
            environment: Some("staging".into()),
            ..Default::default()
        });
        assert_eq!(opts.environment.as_deref(), Some("staging"));
    }

    #[cfg(feature = "panic")]
    #[test]
    fn test_default_integrations() {
        let opts = apply_defaults(Default::default());
        assert!(opts.integrations.iter().any(|i| i.name() == "panic"));

        let opts = apply_defaults(ClientOptions {
            default_integrations: false,
            ..Default::default()
        });
        assert!(opts.integrations.is_empty());
    }
}
