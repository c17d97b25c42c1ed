use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::USER_AGENT;
use crate::protocol::{Breadcrumb, Event};
use crate::types::Dsn;
use crate::{Integration, IntoDsn, TransportFactory};

/// Type alias for before event/breadcrumb handlers.
pub type BeforeCallback<T> = Arc<dyn Fn(T) -> Option<T> + Send + Sync>;

/// Configuration settings for the client.
///
/// # Examples
///
/// ```
/// let _options = faultline_core::ClientOptions {
///     debug: true,
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    // Common options
    /// The DSN to use.  If not set the client is effectively disabled.
    pub dsn: Option<Dsn>,
    /// Enables debug mode.
    ///
    /// In debug mode debug information is printed to stderr to help you
    /// understand what the SDK is doing.
    pub debug: bool,
    /// The release to be sent with events.
    pub release: Option<Cow<'static, str>>,
    /// The environment to be sent with events.
    pub environment: Option<Cow<'static, str>>,
    /// The sample rate for event submission. (0.0 - 1.0, defaults to 1.0)
    pub sample_rate: f32,
    /// The sample rate for tracing transactions. (0.0 - 1.0, defaults to 0.0)
    pub traces_sample_rate: f32,
    /// Maximum number of breadcrumbs held on a scope. (defaults to 100)
    pub max_breadcrumbs: usize,
    /// The server name to be reported.
    pub server_name: Option<Cow<'static, str>>,
    // Integration options
    /// A list of integrations to enable.
    ///
    /// Integrations are deduplicated by name when the client is created; a
    /// later registration with the same name replaces the earlier one.
    pub integrations: Vec<Arc<dyn Integration>>,
    /// Whether to add default integrations.
    pub default_integrations: bool,
    // Hooks
    /// Callback that is executed before event sending.
    ///
    /// This runs after all event processors.  Returning `None` drops the
    /// event.  If the callback panics, the event is sent unmodified.
    pub before_send: Option<BeforeCallback<Event>>,
    /// Callback that is executed for each Breadcrumb being added.
    pub before_breadcrumb: Option<BeforeCallback<Breadcrumb>>,
    // Transport options
    /// The transport to use.
    ///
    /// This is typically either a boxed function taking the client options
    /// and the outcome recorder and returning a `Transport`, a boxed
    /// `Arc<Transport>` or alternatively the `DefaultTransportFactory`.
    pub transport: Option<Arc<dyn TransportFactory>>,
    /// Maximum number of envelopes the transport queue will hold before new
    /// envelopes are dropped. (defaults to 30)
    pub max_queue_size: usize,
    /// How often to retry sending an envelope after a transient send failure.
    /// (defaults to 3)
    pub send_retries: u32,
    /// The timeout on client drop for draining events on shutdown.
    pub shutdown_timeout: Duration,
    // Other options
    /// Maximum length of string values on events before truncation.
    /// (defaults to 1024)
    pub max_value_length: usize,
    /// The user agent that should be reported.
    pub user_agent: Cow<'static, str>,
}

impl ClientOptions {
    /// Creates new Options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a configured integration to the options.
    ///
    /// # Examples
    ///
    /// ```
    /// struct MyIntegration;
    ///
    /// impl faultline_core::Integration for MyIntegration {
    ///     fn name(&self) -> &'static str {
    ///         "my-integration"
    ///     }
    /// }
    ///
    /// let options = faultline_core::ClientOptions::new().add_integration(MyIntegration);
    /// assert_eq!(options.integrations.len(), 1);
    /// ```
    pub fn add_integration<I: Integration>(mut self, integration: I) -> Self {
        self.integrations.push(Arc::new(integration));
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Debug)]
        struct BeforeSend;
        let before_send = self.before_send.as_ref().map(|_| BeforeSend);
        #[derive(Debug)]
        struct BeforeBreadcrumb;
        let before_breadcrumb = self.before_breadcrumb.as_ref().map(|_| BeforeBreadcrumb);
        #[derive(Debug)]
        struct TransportFactory;

        let integrations: Vec<_> = self.integrations.iter().map(|i| i.name()).collect();

        f.debug_struct("ClientOptions")
            .field("dsn", &self.dsn)
            .field("debug", &self.debug)
            .field("release", &self.release)
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .field("traces_sample_rate", &self.traces_sample_rate)
            .field("max_breadcrumbs", &self.max_breadcrumbs)
            .field("server_name", &self.server_name)
            .field("integrations", &integrations)
            .field("default_integrations", &self.default_integrations)
            .field("before_send", &before_send)
            .field("before_breadcrumb", &before_breadcrumb)
            .field("transport", &TransportFactory)
            .field("max_queue_size", &self.max_queue_size)
            .field("send_retries", &self.send_retries)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("max_value_length", &self.max_value_length)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> ClientOptions {
        ClientOptions {
            dsn: None,
            debug: false,
            release: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
            max_breadcrumbs: 100,
            server_name: None,
            integrations: vec![],
            default_integrations: true,
            before_send: None,
            before_breadcrumb: None,
            transport: None,
            max_queue_size: 30,
            send_retries: 3,
            shutdown_timeout: Duration::from_secs(2),
            max_value_length: 1024,
            user_agent: Cow::Borrowed(&USER_AGENT),
        }
    }
}

impl<T: IntoDsn> From<(T, ClientOptions)> for ClientOptions {
    fn from((into_dsn, mut opts): (T, ClientOptions)) -> ClientOptions {
        // an unparsable DSN leaves the client disabled instead of panicking
        opts.dsn = match into_dsn.into_dsn() {
            Ok(dsn) => dsn,
            Err(err) => {
                faultline_debug!("[ClientOptions] invalid DSN: {err}");
                None
            }
        };
        opts
    }
}

impl<T: IntoDsn> From<T> for ClientOptions {
    fn from(into_dsn: T) -> ClientOptions {
        ClientOptions::from((into_dsn, ClientOptions::default()))
    }
}
