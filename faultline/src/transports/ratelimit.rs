use httpdate::parse_http_date;
use std::time::{Duration, SystemTime};

use faultline_core::protocol::{DataCategory, DiscardReason, Envelope};
use faultline_core::OutcomeRecorder;

/// A utility that helps with rate limiting envelope submissions.
#[derive(Debug, Default)]
pub struct RateLimiter {
    global: Option<SystemTime>,
    error: Option<SystemTime>,
    session: Option<SystemTime>,
    transaction: Option<SystemTime>,
    attachment: Option<SystemTime>,
}

impl RateLimiter {
    /// Create a new RateLimiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the RateLimiter with information from a `Retry-After` header.
    pub fn update_from_retry_after(&mut self, header: &str) {
        let new_time = if let Ok(value) = header.parse::<f64>() {
            Some(SystemTime::now() + Duration::from_secs(value.ceil() as u64))
        } else if let Ok(value) = parse_http_date(header) {
            Some(value)
        } else {
            None
        };

        if new_time.is_some() {
            self.global = new_time;
        }
    }

    /// Updates the RateLimiter with information from a
    /// `X-Faultline-Rate-Limits` header.
    pub fn update_from_faultline_header(&mut self, header: &str) {
        // <rate-limit> = (<group>,)+
        // <group> = <time>:(<category>;)+:<scope>(:<reason>)?

        let mut parse_group = |group: &str| {
            let mut splits = group.split(':');
            let seconds = splits.next()?.parse::<f64>().ok()?;
            let categories = splits.next()?;
            let _scope = splits.next()?;

            let new_time = Some(SystemTime::now() + Duration::from_secs(seconds.ceil() as u64));

            if categories.is_empty() {
                self.global = new_time;
            }

            for category in categories.split(';') {
                match category {
                    "error" => self.error = new_time,
                    "session" => self.session = new_time,
                    "transaction" => self.transaction = new_time,
                    "attachment" => self.attachment = new_time,
                    _ => {}
                }
            }
            Some(())
        };

        for group in header.split(',') {
            parse_group(group.trim());
        }
    }

    /// Updates the RateLimiter from a `429` response that carried no
    /// rate limiting headers at all.
    pub fn update_from_429(&mut self) {
        self.global = Some(SystemTime::now() + Duration::from_secs(60));
    }

    /// Query the RateLimiter for a certain category of event.
    pub fn is_disabled(&self, category: RateLimitingCategory) -> Option<Duration> {
        if let Some(ts) = self.global {
            let time_left = ts.duration_since(SystemTime::now()).ok();
            if time_left.is_some() {
                return time_left;
            }
        }
        let time_left = match category {
            RateLimitingCategory::Any => self.global,
            RateLimitingCategory::Error => self.error,
            RateLimitingCategory::Session => self.session,
            RateLimitingCategory::Transaction => self.transaction,
            RateLimitingCategory::Attachment => self.attachment,
        }?;
        time_left.duration_since(SystemTime::now()).ok()
    }

    /// Removes all rate limited items from the envelope, recording each
    /// removal as a `RatelimitBackoff` outcome.
    ///
    /// Returns `None` if no items remain.  Client reports are never filtered,
    /// only the global limit keeps those from going out.
    pub fn filter_envelope(
        &self,
        envelope: Envelope,
        outcomes: &OutcomeRecorder,
    ) -> Option<Envelope> {
        envelope.filter(|item| {
            let category = item.data_category();
            let limit = match category {
                DataCategory::Error => self.is_disabled(RateLimitingCategory::Error),
                DataCategory::Session => self.is_disabled(RateLimitingCategory::Session),
                DataCategory::Transaction => self.is_disabled(RateLimitingCategory::Transaction),
                DataCategory::Attachment => self.is_disabled(RateLimitingCategory::Attachment),
                DataCategory::Default => self.is_disabled(RateLimitingCategory::Any),
            };
            if limit.is_some() {
                outcomes.record(DiscardReason::RatelimitBackoff, category);
                return false;
            }
            true
        })
    }
}

/// The Category of payload that a Rate Limit refers to.
#[non_exhaustive]
pub enum RateLimitingCategory {
    /// Rate Limit for any kind of payload.
    Any,
    /// Rate Limit pertaining to Errors.
    Error,
    /// Rate Limit pertaining to Sessions.
    Session,
    /// Rate Limit pertaining to Transactions.
    Transaction,
    /// Rate Limit pertaining to Attachments.
    Attachment,
}
