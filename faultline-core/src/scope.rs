use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::performance::{PropagationContext, TransactionOrSpan};
use crate::protocol::{
    Attachment, Breadcrumb, Context, Event, Level, TraceContext, Transaction, User, Value,
};
use crate::session::Session;
use crate::types::protocol::Map;
use crate::Client;

#[derive(Debug)]
pub(crate) struct Stack {
    top: StackLayer,
    layers: Vec<StackLayer>,
}

/// A function that can modify or drop an event before it is sent.
pub type EventProcessor = Arc<dyn Fn(Event) -> Option<Event> + Send + Sync>;

/// Holds contextual data for the current scope.
///
/// The scope is an object that can be cloned efficiently and stores data that
/// is locally relevant to an event.  For instance the scope will hold recorded
/// breadcrumbs and similar information.
///
/// Scopes form two tiers on a [`Hub`](crate::Hub): a long-lived *isolation
/// scope* that spans one logical unit of work, and a stack of short-lived
/// *current scopes* pushed by [`with_scope`](crate::Hub::with_scope).  When an
/// event is captured, the isolation scope's data is applied first and the
/// current scope's data second, so the more specific tier wins on conflicts.
///
/// Cloning a scope is cheap: all collections are behind [`Arc`]s and are only
/// copied when one of the clones writes to them.
#[derive(Clone, Default)]
pub struct Scope {
    pub(crate) level: Option<Level>,
    pub(crate) fingerprint: Option<Arc<[String]>>,
    pub(crate) transaction: Option<Arc<str>>,
    pub(crate) breadcrumbs: Arc<VecDeque<Breadcrumb>>,
    pub(crate) user: Option<Arc<User>>,
    pub(crate) extra: Arc<Map<String, Value>>,
    pub(crate) tags: Arc<Map<String, String>>,
    pub(crate) contexts: Arc<Map<String, Context>>,
    pub(crate) event_processors: Arc<Vec<EventProcessor>>,
    pub(crate) session: Arc<Mutex<Option<Session>>>,
    pub(crate) span: Arc<Option<TransactionOrSpan>>,
    pub(crate) attachments: Arc<Vec<Attachment>>,
    pub(crate) propagation_context: PropagationContext,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("level", &self.level)
            .field("fingerprint", &self.fingerprint)
            .field("transaction", &self.transaction)
            .field("breadcrumbs", &self.breadcrumbs)
            .field("user", &self.user)
            .field("extra", &self.extra)
            .field("tags", &self.tags)
            .field("contexts", &self.contexts)
            .field("event_processors", &self.event_processors.len())
            .field("span", &self.span)
            .field("attachments", &self.attachments.len())
            .field("propagation_context", &self.propagation_context)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StackLayer {
    pub client: Option<Arc<Client>>,
    pub scope: Arc<Scope>,
}

impl Stack {
    pub fn from_client_and_scope(client: Option<Arc<Client>>, scope: Arc<Scope>) -> Stack {
        Stack {
            top: StackLayer { client, scope },
            layers: vec![],
        }
    }

    pub fn push(&mut self) {
        let layer = self.top.clone();
        self.layers.push(layer);
    }

    pub fn pop(&mut self) {
        if self.layers.is_empty() {
            panic!("Pop from empty stack");
        }
        self.top = self.layers.pop().unwrap();
    }

    #[inline(always)]
    pub fn top(&self) -> &StackLayer {
        &self.top
    }

    #[inline(always)]
    pub fn top_mut(&mut self) -> &mut StackLayer {
        &mut self.top
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

/// A scope guard.
///
/// This is returned from [`Hub::push_scope`](crate::Hub::push_scope) and will
/// automatically pop the scope on drop.
#[derive(Default)]
pub struct ScopeGuard(pub(crate) Option<(Arc<RwLock<Stack>>, usize)>);

impl fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeGuard")
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some((stack, depth)) = self.0.take() {
            let popped_depth = {
                let mut stack = stack.write().unwrap_or_else(PoisonError::into_inner);
                let popped_depth = stack.depth();
                stack.pop();
                popped_depth
            };
            // NOTE: the `stack` lock must be released before panicking, as a
            // panic hook capturing the panic will want to lock the `stack`
            // itself (through `capture_event`), resulting in a deadlock.
            if popped_depth != depth {
                panic!("Popped scope guard out of order");
            }
        }
    }
}

impl Scope {
    /// Clear the scope.
    ///
    /// By default a scope will inherit all values from the higher scope.
    /// In some situations this might not be what a user wants.  Calling
    /// this method will wipe all data contained within.
    pub fn clear(&mut self) {
        *self = Default::default();
    }

    /// Creates a copy of this scope that no longer shares writes with it.
    ///
    /// The copy starts out with identical data.  Mutations on either side are
    /// invisible to the other; unmodified collections keep sharing storage.
    pub fn fork(&self) -> Scope {
        self.clone()
    }

    /// Deletes current breadcrumbs from the scope.
    pub fn clear_breadcrumbs(&mut self) {
        self.breadcrumbs = Default::default();
    }

    /// Sets a level override.
    pub fn set_level(&mut self, level: Option<Level>) {
        self.level = level;
    }

    /// Sets the fingerprint.
    pub fn set_fingerprint(&mut self, fingerprint: Option<&[&str]>) {
        self.fingerprint = fingerprint.map(|fp| fp.iter().map(|s| (*s).to_owned()).collect());
    }

    /// Sets the transaction name.
    pub fn set_transaction(&mut self, transaction: Option<&str>) {
        self.transaction = transaction.map(Arc::from);
        if let Some(name) = transaction {
            let trx = match self.span.as_ref() {
                Some(TransactionOrSpan::Span(span)) => &span.transaction,
                Some(TransactionOrSpan::Transaction(trx)) => &trx.inner,
                _ => return,
            };

            if let Some(trx) = trx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .transaction
                .as_mut()
            {
                trx.name = Some(name.into());
            }
        }
    }

    /// Sets the user for the current scope.
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user.map(Arc::new);
    }

    /// Retrieves the user of the current scope.
    pub fn user(&self) -> Option<&User> {
        self.user.as_deref()
    }

    /// Sets a tag to a specific value.
    pub fn set_tag<V: ToString>(&mut self, key: &str, value: V) {
        Arc::make_mut(&mut self.tags).insert(key.to_string(), value.to_string());
    }

    /// Removes a tag.
    ///
    /// If the tag is not set, does nothing.
    pub fn remove_tag(&mut self, key: &str) {
        Arc::make_mut(&mut self.tags).remove(key);
    }

    /// Sets a context for a key.
    pub fn set_context<C: Into<Context>>(&mut self, key: &str, value: C) {
        Arc::make_mut(&mut self.contexts).insert(key.to_string(), value.into());
    }

    /// Removes a context for a key.
    pub fn remove_context(&mut self, key: &str) {
        Arc::make_mut(&mut self.contexts).remove(key);
    }

    /// Sets a extra to a specific value.
    pub fn set_extra(&mut self, key: &str, value: Value) {
        Arc::make_mut(&mut self.extra).insert(key.to_string(), value);
    }

    /// Removes a extra.
    pub fn remove_extra(&mut self, key: &str) {
        Arc::make_mut(&mut self.extra).remove(key);
    }

    /// Add an event processor to the scope.
    ///
    /// Processors run in registration order after the scope data has been
    /// merged onto the event.  Returning `None` drops the event.  A processor
    /// that panics is skipped and the event passes through unchanged.
    pub fn add_event_processor<F>(&mut self, f: F)
    where
        F: Fn(Event) -> Option<Event> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.event_processors).push(Arc::new(f));
    }

    /// Adds an attachment to the scope.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        Arc::make_mut(&mut self.attachments).push(attachment);
    }

    /// Clears attachments from the scope.
    pub fn clear_attachments(&mut self) {
        Arc::make_mut(&mut self.attachments).clear();
    }

    /// Applies the contained scoped data to fill an event.
    ///
    /// This only merges data and does not run event processors, so that the
    /// data of multiple scope tiers can be layered onto an event before any
    /// processor sees it.
    pub(crate) fn apply_to_event(&self, mut event: Event) -> Event {
        if let Some(level) = self.level {
            event.level = level;
        }

        if event.user.is_none() {
            if let Some(user) = self.user.as_deref() {
                event.user = Some(user.clone());
            }
        }

        event.breadcrumbs.extend(self.breadcrumbs.iter().cloned());
        event
            .extra
            .extend(self.extra.iter().map(|(k, v)| (k.to_owned(), v.to_owned())));
        event
            .tags
            .extend(self.tags.iter().map(|(k, v)| (k.to_owned(), v.to_owned())));
        event.contexts.extend(
            self.contexts
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned())),
        );

        if let Some(span) = self.span.as_ref() {
            span.apply_to_event(&mut event);
        } else {
            self.apply_propagation_context(&mut event);
        }

        if event.transaction.is_none() {
            if let Some(txn) = self.transaction.as_deref() {
                event.transaction = Some(txn.to_owned());
            }
        }

        if event.fingerprint.len() == 1
            && (event.fingerprint[0] == "{{ default }}" || event.fingerprint[0] == "{{default}}")
        {
            if let Some(fp) = self.fingerprint.as_deref() {
                event.fingerprint = fp.to_owned();
            }
        }

        event
    }

    /// Runs the scope's event processors over the event in registration order.
    ///
    /// Returns `None` as soon as one processor drops the event.
    pub(crate) fn run_event_processors(&self, mut event: Event) -> Option<Event> {
        for processor in self.event_processors.as_ref() {
            let id = event.event_id;
            let backup = event.clone();
            event = match catch_unwind(AssertUnwindSafe(|| processor(event))) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    faultline_debug!("[Scope] event processor dropped event {id}");
                    return None;
                }
                Err(_) => {
                    faultline_debug!("[Scope] event processor panicked on event {id}");
                    backup
                }
            };
        }
        Some(event)
    }

    /// Applies the contained scoped data to fill a transaction.
    pub(crate) fn apply_to_transaction(&self, transaction: &mut Transaction) {
        if transaction.user.is_none() {
            if let Some(user) = self.user.as_deref() {
                transaction.user = Some(user.clone());
            }
        }

        transaction
            .extra
            .extend(self.extra.iter().map(|(k, v)| (k.to_owned(), v.to_owned())));
        transaction
            .tags
            .extend(self.tags.iter().map(|(k, v)| (k.to_owned(), v.to_owned())));
        transaction.contexts.extend(
            self.contexts
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned())),
        );
    }

    /// Set the given [`TransactionOrSpan`] as the active span for this scope.
    pub fn set_span(&mut self, span: Option<TransactionOrSpan>) {
        self.span = Arc::new(span);
    }

    /// Returns the currently active span.
    pub fn get_span(&self) -> Option<TransactionOrSpan> {
        self.span.as_ref().clone()
    }

    pub(crate) fn update_session_from_event(&self, event: &Event) {
        if let Some(session) = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            session.update_from_event(event);
        }
    }

    pub(crate) fn apply_propagation_context(&self, event: &mut Event) {
        if event.contexts.contains_key("trace") {
            return;
        }

        let context = TraceContext {
            trace_id: self.propagation_context.trace_id,
            span_id: self.propagation_context.span_id,
            ..Default::default()
        };
        event.contexts.insert("trace".into(), context.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_is_independent() {
        let mut scope = Scope::default();
        scope.set_tag("shared", "yes");

        let mut fork = scope.fork();
        fork.set_tag("forked", "yes");
        scope.set_tag("original", "yes");

        assert_eq!(scope.tags.get("shared").map(String::as_str), Some("yes"));
        assert_eq!(fork.tags.get("shared").map(String::as_str), Some("yes"));
        assert!(scope.tags.get("forked").is_none());
        assert!(fork.tags.get("original").is_none());
    }

    #[test]
    fn test_apply_does_not_run_processors() {
        let mut scope = Scope::default();
        scope.add_event_processor(|_| None);
        scope.set_tag("tag", "value");

        let event = scope.apply_to_event(Event::new());
        assert_eq!(event.tags.get("tag").map(String::as_str), Some("value"));

        assert!(scope.run_event_processors(event).is_none());
    }

    #[test]
    fn test_processor_panic_passes_event_through() {
        let mut scope = Scope::default();
        scope.add_event_processor(|_| panic!("oh no"));
        scope.add_event_processor(|mut event| {
            event.tags.insert("after".into(), "ran".into());
            Some(event)
        });

        let event = scope.run_event_processors(Event::new()).unwrap();
        assert_eq!(event.tags.get("after").map(String::as_str), Some("ran"));
    }

    #[test]
    fn test_event_data_wins_over_scope() {
        let mut scope = Scope::default();
        scope.set_user(Some(User {
            id: Some("scope-user".into()),
            ..Default::default()
        }));
        scope.set_transaction(Some("scope-txn"));

        let event = Event {
            user: Some(User {
                id: Some("event-user".into()),
                ..Default::default()
            }),
            transaction: Some("event-txn".into()),
            ..Default::default()
        };

        let event = scope.apply_to_event(event);
        assert_eq!(event.user.unwrap().id.unwrap(), "event-user");
        assert_eq!(event.transaction.unwrap(), "event-txn");
    }

    #[test]
    fn test_propagation_context_stamped_once() {
        let scope = Scope::default();
        let event = scope.apply_to_event(Event::new());
        let trace = event.contexts.get("trace").unwrap();
        let trace_id = trace.get("trace_id").unwrap().clone();

        // a second application must not overwrite the existing trace context
        let other = Scope::default();
        let event = other.apply_to_event(event);
        assert_eq!(event.contexts.get("trace").unwrap().get("trace_id"), Some(&trace_id));
    }
}
