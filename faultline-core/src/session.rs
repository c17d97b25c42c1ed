//! Release health sessions.
//!
//! A session tracks one run of the application (or one logical unit of work)
//! for release health.  It lives on the isolation scope, so it naturally
//! spans all events captured within that unit of work: an error event bumps
//! the session's error count and a fatal event marks it as crashed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Instant, SystemTime};

use crate::protocol::{EnvelopeItem, Event, Level, SessionAttributes, SessionUpdate};
use crate::types::random_uuid;
use crate::{Client, Envelope, Hub, Scope};

pub use crate::protocol::SessionStatus;

/// An active release-health session.
#[derive(Clone, Debug)]
pub struct Session {
    client: Arc<Client>,
    session_update: SessionUpdate,
    started: Instant,
    dirty: bool,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close(SessionStatus::Exited);
        if self.dirty {
            let mut envelope = Envelope::new();
            envelope.add_item(self.session_update.clone());
            self.client.send_envelope(envelope);
        }
    }
}

impl Session {
    /// Starts a new session for the given client, pulling the distinct id
    /// from the scope's user.
    ///
    /// Returns `None` if the client options carry no release, as release
    /// health data is meaningless without one.
    pub(crate) fn from_client_and_scope(client: &Arc<Client>, scope: &Scope) -> Option<Self> {
        let options = client.options();
        let user = scope.user.as_deref();
        let distinct_id = user
            .and_then(|user| {
                user.id
                    .as_ref()
                    .or(user.email.as_ref())
                    .or(user.username.as_ref())
            })
            .cloned();
        Some(Self {
            client: client.clone(),
            session_update: SessionUpdate {
                session_id: random_uuid(),
                distinct_id,
                sequence: None,
                timestamp: SystemTime::now(),
                started: SystemTime::now(),
                init: true,
                duration: None,
                status: SessionStatus::Ok,
                errors: 0,
                attributes: SessionAttributes {
                    release: options.release.clone()?.into_owned(),
                    environment: options.environment.clone().map(|e| e.into_owned()),
                },
            },
            started: Instant::now(),
            dirty: true,
        })
    }

    pub(crate) fn update_from_event(&mut self, event: &Event) {
        if self.session_update.status != SessionStatus::Ok {
            // a session that has already transitioned to a "terminal" state
            // should not receive any more updates
            return;
        }
        let has_error = event.level >= Level::Error || !event.exception.is_empty();
        let is_crash = event.level == Level::Fatal;

        if is_crash {
            self.session_update.status = SessionStatus::Crashed;
        }
        if has_error {
            self.session_update.errors += 1;
            self.dirty = true;
        }
    }

    pub(crate) fn close(&mut self, status: SessionStatus) {
        if self.session_update.status == SessionStatus::Ok {
            let status = match status {
                SessionStatus::Ok => SessionStatus::Exited,
                s => s,
            };
            self.session_update.duration = Some(self.started.elapsed().as_secs_f64());
            self.session_update.status = status;
            self.dirty = true;
        }
    }

    /// Takes the pending session update for transmission, if anything changed
    /// since the last item was created.
    pub(crate) fn create_envelope_item(&mut self) -> Option<EnvelopeItem> {
        if self.dirty {
            self.session_update.timestamp = SystemTime::now();
            let item = self.session_update.clone().into();
            self.session_update.init = false;
            self.dirty = false;
            return Some(item);
        }
        None
    }
}

impl Hub {
    /// Start a new session for release health.
    ///
    /// The session is stored on the isolation scope and replaces any session
    /// already running there.  The replaced session is ended as exited.  This
    /// does nothing if the client options carry no release.
    pub fn start_session(&self) {
        if let Some(client) = self.client() {
            self.configure_isolation_scope(|scope| {
                if let Some(session) = Session::from_client_and_scope(&client, scope) {
                    // replacing the whole cell detaches forked scopes that
                    // still share the previous one
                    scope.session = Arc::new(Mutex::new(Some(session)));
                }
            })
        }
    }

    /// End the current session.
    pub fn end_session(&self) {
        self.end_session_with_status(SessionStatus::Exited)
    }

    /// End the current session with the given status.
    pub fn end_session_with_status(&self, status: SessionStatus) {
        self.configure_isolation_scope(|scope| {
            let session = scope
                .session
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(mut session) = session {
                session.close(status);
                // the Drop impl sends the final update
            }
        })
    }
}
