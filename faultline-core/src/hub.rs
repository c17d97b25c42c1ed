use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock, MutexGuard, PoisonError, RwLock};
use std::thread;

use crate::protocol::{Event, Level};
use crate::scope::{Stack, StackLayer};
use crate::{Client, IntoBreadcrumbs, Scope, ScopeGuard, Uuid};

static PROCESS_HUB: LazyLock<(Arc<Hub>, thread::ThreadId)> = LazyLock::new(|| {
    (
        Arc::new(Hub::new(None, Arc::new(Default::default()))),
        thread::current().id(),
    )
});

thread_local! {
    static THREAD_HUB: (UnsafeCell<Arc<Hub>>, Cell<bool>) = (
        UnsafeCell::new(Arc::new(Hub::new_from_top(&PROCESS_HUB.0))),
        Cell::new(PROCESS_HUB.1 == thread::current().id())
    );
}

/// A guard that temporarily swaps the active hub in thread-local storage.
///
/// This type is `!Send` because it manages thread-local state and must be
/// dropped on the same thread where it was created.
pub(crate) struct SwitchGuard {
    inner: Option<(Arc<Hub>, bool)>,
    /// Makes this type `!Send` while keeping it `Sync`.
    _not_send: PhantomData<MutexGuard<'static, ()>>,
}

impl SwitchGuard {
    /// Swaps the current thread's hub for the one provided and returns a
    /// guard that, when dropped, swaps the previous one back in.
    pub(crate) fn new(mut hub: Arc<Hub>) -> Self {
        let inner = THREAD_HUB.with(|(thread_hub, is_process_hub)| {
            // SAFETY: `thread_hub` will always be a valid thread local hub,
            // by definition not shared between threads.
            let thread_hub = unsafe { &mut *thread_hub.get() };
            if std::ptr::eq(thread_hub.as_ref(), hub.as_ref()) {
                return None;
            }
            std::mem::swap(thread_hub, &mut hub);
            let was_process_hub = is_process_hub.replace(false);
            Some((hub, was_process_hub))
        });
        SwitchGuard {
            inner,
            _not_send: PhantomData,
        }
    }

    fn swap(&mut self) -> Option<Arc<Hub>> {
        if let Some((mut hub, was_process_hub)) = self.inner.take() {
            Some(THREAD_HUB.with(|(thread_hub, is_process_hub)| {
                let thread_hub = unsafe { &mut *thread_hub.get() };
                std::mem::swap(thread_hub, &mut hub);
                if was_process_hub {
                    is_process_hub.set(true);
                }
                hub
            }))
        } else {
            None
        }
    }
}

impl Drop for SwitchGuard {
    fn drop(&mut self) {
        let _ = self.swap();
    }
}

struct IsolationGuard<'a> {
    hub: &'a Hub,
    previous: Option<Arc<Scope>>,
}

impl Drop for IsolationGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self
                .hub
                .isolation_scope
                .write()
                .unwrap_or_else(PoisonError::into_inner) = previous;
        }
    }
}

/// The central object that manages scopes and clients.
///
/// This can be used to capture events and manage the scope.  This object is
/// internally synchronized so it can be used from multiple threads if needed.
/// The default hub that is available automatically is thread local.
///
/// Toplevel convenience functions are exposed that will automatically dispatch
/// to the thread local hub ([`Hub::current`]).  The thread local hub can be
/// temporarily changed using [`Hub::run`].
///
/// Each hub carries two tiers of scope: the *isolation scope*, which lives for
/// one logical unit of work and holds breadcrumbs, user and session state, and
/// a stack of *current scopes* pushed and popped by [`Hub::with_scope`].
pub struct Hub {
    stack: Arc<RwLock<Stack>>,
    isolation_scope: RwLock<Arc<Scope>>,
    last_event_id: RwLock<Option<Uuid>>,
}

impl Hub {
    fn with_stack<F: FnOnce(&Stack) -> R, R>(&self, f: F) -> R {
        let guard = self.stack.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn with_stack_mut<F: FnOnce(&mut Stack) -> R, R>(&self, f: F) -> R {
        let mut guard = self.stack.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub(crate) fn is_active_and_usage_safe(&self) -> bool {
        let guard = match self.stack.try_read() {
            Err(std::sync::TryLockError::Poisoned(err)) => err.into_inner(),
            Err(std::sync::TryLockError::WouldBlock) => return false,
            Ok(guard) => guard,
        };

        guard.top().client.as_ref().is_some_and(|c| c.is_enabled())
    }

    /// Creates a new hub from the given client and scope.
    ///
    /// The scope becomes the hub's isolation scope; the current scope stack
    /// starts out empty on top of it.
    pub fn new(client: Option<Arc<Client>>, scope: Arc<Scope>) -> Hub {
        Hub {
            stack: Arc::new(RwLock::new(Stack::from_client_and_scope(
                client,
                Arc::new(Default::default()),
            ))),
            isolation_scope: RwLock::new(scope),
            last_event_id: RwLock::new(None),
        }
    }

    /// Creates a new hub based on the top scope of the given hub.
    ///
    /// The new hub starts with a fork of the other hub's isolation scope, so
    /// later mutations on either hub are not visible on the other.
    pub fn new_from_top<H: AsRef<Hub>>(other: H) -> Hub {
        let hub = other.as_ref();
        let isolation = hub
            .isolation_scope
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let top = hub.top_layer();
        Hub {
            stack: Arc::new(RwLock::new(Stack::from_client_and_scope(
                top.client, top.scope,
            ))),
            isolation_scope: RwLock::new(isolation),
            last_event_id: RwLock::new(None),
        }
    }

    /// Returns the current, thread-local hub.
    ///
    /// The first time this is called on a thread, a new thread-local hub will
    /// be created based on the topmost scope of the hub on the main thread as
    /// returned by [`Hub::main`].
    ///
    /// To have control over which hub is installed as the current thread-local
    /// hub, use [`Hub::run`].
    pub fn current() -> Arc<Hub> {
        Hub::with(Arc::clone)
    }

    /// Returns the main thread's hub.
    ///
    /// This is similar to [`Hub::current`] but instead of picking the current
    /// thread's hub it returns the main thread's hub instead.
    pub fn main() -> Arc<Hub> {
        PROCESS_HUB.0.clone()
    }

    /// Invokes the callback with the current hub.
    ///
    /// This is a slightly more efficient version than [`Hub::current`], as it
    /// avoids a `clone`.
    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&Arc<Hub>) -> R,
    {
        THREAD_HUB.with(|(hub, is_process_hub)| {
            if is_process_hub.get() {
                f(&PROCESS_HUB.0)
            } else {
                f(unsafe { &*hub.get() })
            }
        })
    }

    /// Like [`Hub::with`] but only calls the function if a client is bound.
    ///
    /// This is useful for integrations that want to do efficiently nothing if
    /// there is no client bound.  Additionally this internally ensures that
    /// the client can be safely synchronized.  This prevents accidental
    /// recursive calls into the client.
    pub fn with_active<F, R>(f: F) -> R
    where
        F: FnOnce(&Arc<Hub>) -> R,
        R: Default,
    {
        Hub::with(|hub| {
            if hub.is_active_and_usage_safe() {
                f(hub)
            } else {
                Default::default()
            }
        })
    }

    /// Binds a hub to the current thread for the duration of the call.
    ///
    /// During the execution of `f` the given hub will be installed as the
    /// thread-local hub.  So any call to [`Hub::current`] during this time
    /// will return the provided hub.
    ///
    /// Once the function is finished executing, including after it panicked,
    /// the original hub is re-installed if one was present.
    pub fn run<F: FnOnce() -> R, R>(hub: Arc<Hub>, f: F) -> R {
        let _guard = SwitchGuard::new(hub);
        f()
    }

    /// Sends the event to the current client with the current scope.
    ///
    /// The returned id identifies the event even if it is later dropped by a
    /// processor, a callback or sampling.  If no client is bound the event is
    /// discarded and its id returned.
    ///
    /// See the global [`capture_event`](crate::capture_event) for more
    /// documentation.
    pub fn capture_event(&self, event: Event) -> Uuid {
        let isolation = self
            .isolation_scope
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.with_stack(|stack| {
            let top = stack.top();
            match top.client.as_ref() {
                Some(client) => {
                    let event_id =
                        client.capture_event(event, Some(&isolation), Some(&top.scope));
                    *self
                        .last_event_id
                        .write()
                        .unwrap_or_else(PoisonError::into_inner) = Some(event_id);
                    event_id
                }
                None => event.event_id,
            }
        })
    }

    /// Captures an arbitrary message.
    ///
    /// See the global [`capture_message`](crate::capture_message) for more
    /// documentation.
    pub fn capture_message(&self, msg: &str, level: Level) -> Uuid {
        let event = Event {
            message: Some(msg.to_string()),
            level,
            ..Default::default()
        };
        self.capture_event(event)
    }

    /// Invokes a function that can modify the current scope.
    ///
    /// See the global [`configure_scope`](crate::configure_scope) for more
    /// documentation.
    pub fn configure_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Scope) -> R,
    {
        self.with_stack_mut(|stack| {
            let top = stack.top_mut();
            f(Arc::make_mut(&mut top.scope))
        })
    }

    /// Invokes a function that can modify the isolation scope.
    ///
    /// Unlike [`Hub::configure_scope`] this affects the long-lived scope tier
    /// that outlives any [`Hub::with_scope`] blocks on this hub.
    pub fn configure_isolation_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Scope) -> R,
    {
        let mut guard = self
            .isolation_scope
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(Arc::make_mut(&mut guard))
    }

    /// Pushes a new scope.
    ///
    /// This returns a guard that when dropped will pop the scope again.
    pub fn push_scope(&self) -> ScopeGuard {
        self.with_stack_mut(|stack| {
            stack.push();
            ScopeGuard(Some((Arc::clone(&self.stack), stack.depth())))
        })
    }

    /// Temporarily pushes a scope for a single call optionally reconfiguring it.
    ///
    /// See the global [`with_scope`](crate::with_scope) for more
    /// documentation.
    pub fn with_scope<C, F, R>(&self, scope_config: C, callback: F) -> R
    where
        C: FnOnce(&mut Scope),
        F: FnOnce() -> R,
    {
        let _guard = self.push_scope();
        self.configure_scope(scope_config);
        callback()
    }

    /// Runs a callback with a forked isolation scope.
    ///
    /// The fork starts out with the current isolation scope's data and is
    /// installed for the duration of the callback, so breadcrumbs, user and
    /// session state recorded inside stay contained.  The previous isolation
    /// scope is restored afterwards, also when the callback panics.
    pub fn with_isolation_scope<C, F, R>(&self, scope_config: C, callback: F) -> R
    where
        C: FnOnce(&mut Scope),
        F: FnOnce() -> R,
    {
        let previous = {
            let mut guard = self
                .isolation_scope
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let mut forked = guard.fork();
            scope_config(&mut forked);
            std::mem::replace(&mut *guard, Arc::new(forked))
        };
        let _guard = IsolationGuard {
            hub: self,
            previous: Some(previous),
        };
        callback()
    }

    /// Adds a new breadcrumb to the isolation scope.
    ///
    /// Breadcrumbs go to the isolation tier so that they survive
    /// [`Hub::with_scope`] blocks and show up on every event of the current
    /// unit of work.
    ///
    /// See the global [`add_breadcrumb`](crate::add_breadcrumb) for more
    /// documentation.
    pub fn add_breadcrumb<B: IntoBreadcrumbs>(&self, breadcrumb: B) {
        let client = self.client();
        if let Some(client) = client {
            let options = client.options();
            self.configure_isolation_scope(|scope| {
                let breadcrumbs = Arc::make_mut(&mut scope.breadcrumbs);
                for breadcrumb in breadcrumb.into_breadcrumbs() {
                    let breadcrumb_opt = match &options.before_breadcrumb {
                        Some(callback) => callback(breadcrumb),
                        None => Some(breadcrumb),
                    };
                    if let Some(breadcrumb) = breadcrumb_opt {
                        breadcrumbs.push_back(breadcrumb);
                    }
                    while breadcrumbs.len() > options.max_breadcrumbs {
                        breadcrumbs.pop_front();
                    }
                }
            })
        }
    }

    /// Returns the currently bound client.
    pub fn client(&self) -> Option<Arc<Client>> {
        self.with_stack(|stack| stack.top().client.clone())
    }

    /// Binds a new client to the hub.
    pub fn bind_client(&self, client: Option<Arc<Client>>) {
        self.with_stack_mut(|stack| {
            stack.top_mut().client = client;
        })
    }

    /// Returns the last event id.
    pub fn last_event_id(&self) -> Option<Uuid> {
        *self
            .last_event_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn with_current_scope<F: FnOnce(&Scope) -> R, R>(&self, f: F) -> R {
        self.with_stack(|stack| f(&stack.top().scope))
    }

    pub(crate) fn with_current_scope_mut<F: FnOnce(&mut Scope) -> R, R>(&self, f: F) -> R {
        self.with_stack_mut(|stack| f(Arc::make_mut(&mut stack.top_mut().scope)))
    }

    pub(crate) fn with_isolation_scope_ref<F: FnOnce(&Scope) -> R, R>(&self, f: F) -> R {
        let guard = self
            .isolation_scope
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub(crate) fn top_layer(&self) -> StackLayer {
        self.with_stack(|stack| stack.top().clone())
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").finish_non_exhaustive()
    }
}

impl AsRef<Hub> for Hub {
    fn as_ref(&self) -> &Hub {
        self
    }
}
