use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::Hub;

/// A future that binds a [`Hub`] to its execution.
///
/// This activates the given hub for the duration of every poll, so that
/// scope data captured inside the future consistently lands on the hub it
/// was bound to, no matter which executor thread runs the poll.
///
/// This future must be polled on the same thread that created it unless the
/// executor re-installs the hub itself.
#[derive(Debug)]
pub struct FaultlineFuture<F> {
    hub: Arc<Hub>,
    future: F,
}

impl<F> FaultlineFuture<F> {
    /// Creates a new bound future with a [`Hub`].
    pub fn new(hub: Arc<Hub>, future: F) -> Self {
        Self { hub, future }
    }
}

impl<F> Future for FaultlineFuture<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let hub = self.hub.clone();
        // SAFETY: this is a pin projection to the inner future; `self` is
        // pinned, `future` is a structural field and never moved out.
        let future = unsafe { self.map_unchecked_mut(|s| &mut s.future) };
        Hub::run(hub, || future.poll(cx))
    }
}

/// Future extensions for the SDK.
pub trait FaultlineFutureExt: Sized {
    /// Binds a hub to the execution of this future.
    ///
    /// See [`FaultlineFuture`] for more information.
    fn bind_hub<H>(self, hub: H) -> FaultlineFuture<Self>
    where
        H: Into<Arc<Hub>>,
    {
        FaultlineFuture {
            future: self,
            hub: hub.into(),
        }
    }
}

impl<F> FaultlineFutureExt for F where F: Future {}
