use std::time::Duration;

use ureq::{Agent, AgentBuilder};

use super::ratelimit::RateLimiter;
use super::thread::{SendResult, TransportThread};

use faultline_core::{faultline_debug, ClientOptions, Envelope, OutcomeRecorder, Transport};

/// A [`Transport`] that sends envelopes via the [`ureq`] library.
///
/// This is enabled by the `ureq` feature flag.
#[cfg_attr(doc_cfg, doc(cfg(feature = "ureq")))]
pub struct UreqHttpTransport {
    thread: TransportThread,
}

impl UreqHttpTransport {
    /// Creates a new Transport.
    pub fn new(options: &ClientOptions, outcomes: OutcomeRecorder) -> Self {
        Self::new_internal(options, outcomes, None)
    }

    /// Creates a new Transport that uses the specified [`ureq::Agent`].
    pub fn with_agent(options: &ClientOptions, outcomes: OutcomeRecorder, agent: Agent) -> Self {
        Self::new_internal(options, outcomes, Some(agent))
    }

    fn new_internal(
        options: &ClientOptions,
        outcomes: OutcomeRecorder,
        agent: Option<Agent>,
    ) -> Self {
        let dsn = options.dsn.as_ref().unwrap();
        let agent = agent.unwrap_or_else(|| AgentBuilder::new().build());
        let user_agent = options.user_agent.clone();
        let auth = dsn.to_auth(Some(&user_agent)).to_string();
        let url = dsn.envelope_api_url().to_string();

        let thread = TransportThread::new(options, outcomes, move |envelope, rl| {
            let mut body = Vec::new();
            if let Err(err) = envelope.to_writer(&mut body) {
                faultline_debug!("Failed to serialize envelope: {}", err);
                return SendResult::Fatal;
            }
            let request = agent
                .post(&url)
                .set("X-Faultline-Auth", &auth)
                .send_bytes(&body);

            match request {
                Ok(response) => {
                    update_rate_limits(rl, &response);
                    match response.into_string() {
                        Err(err) => {
                            faultline_debug!("Failed to read relay response: {}", err);
                        }
                        Ok(text) => {
                            faultline_debug!("Got relay response: `{}`", text);
                        }
                    }
                    SendResult::Success
                }
                Err(ureq::Error::Status(code, response)) => {
                    update_rate_limits(rl, &response);
                    if code == 429 {
                        if response.header("x-faultline-rate-limits").is_none()
                            && response.header("retry-after").is_none()
                        {
                            rl.update_from_429();
                        }
                        SendResult::RateLimited
                    } else if (500..600).contains(&code) {
                        faultline_debug!("Relay answered {}, will retry", code);
                        SendResult::Retryable
                    } else {
                        faultline_debug!("Relay rejected envelope with {}", code);
                        SendResult::Fatal
                    }
                }
                Err(err) => {
                    faultline_debug!("Failed to send envelope: {}", err);
                    SendResult::Retryable
                }
            }
        });
        Self { thread }
    }
}

fn update_rate_limits(rl: &mut RateLimiter, response: &ureq::Response) {
    if let Some(header) = response.header("x-faultline-rate-limits") {
        rl.update_from_faultline_header(header);
    } else if let Some(retry_after) = response.header("retry-after") {
        rl.update_from_retry_after(retry_after);
    }
}

impl Transport for UreqHttpTransport {
    fn send_envelope(&self, envelope: Envelope) {
        self.thread.send(envelope)
    }

    fn flush(&self, timeout: Duration) -> bool {
        self.thread.flush(timeout)
    }

    fn shutdown(&self, timeout: Duration) -> bool {
        self.flush(timeout)
    }
}
