use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::channel::oneshot;
use futures::future::{FusedFuture, LocalBoxFuture};

use crate::Rejection;

/// Outcome of a promise, as seen by whoever awaits it.
pub type Settled<T> = Result<T, Rejection>;

/// What the resolving side delivers through the channel.
enum Message<T> {
    Value(T),
    Rejected(Rejection),

    // No spawner was configured and the callback's future did not finish on its first poll,
    // so the awaiter drives the rest of it.
    Deferred(LocalBoxFuture<'static, Settled<T>>),
}

/// Creates a connected resolve handle and promise.
pub(crate) fn pair<T>() -> (Resolve<T>, Promise<T>) {
    let (sender, receiver) = oneshot::channel();

    (
        Resolve { sender },
        Promise {
            state: PromiseState::Waiting(receiver),
        },
    )
}

/// The settling side of a [`Promise`]. Consumed by whichever method settles it, so a promise
/// can be settled at most once.
pub(crate) struct Resolve<T> {
    sender: oneshot::Sender<Message<T>>,
}

impl<T> Resolve<T> {
    pub(crate) fn resolve(self, value: T) {
        if self.sender.send(Message::Value(value)).is_err() {
            tracing::trace!("callback settled but nobody is awaiting its promise");
        }
    }

    pub(crate) fn reject(self, rejection: Rejection) {
        if let Err(Message::Rejected(rejection)) = self.sender.send(Message::Rejected(rejection)) {
            report_unhandled(&rejection);
        }
    }

    pub(crate) fn settle(self, settled: Settled<T>) {
        match settled {
            Ok(value) => self.resolve(value),
            Err(rejection) => self.reject(rejection),
        }
    }

    pub(crate) fn defer(self, future: LocalBoxFuture<'static, Settled<T>>) {
        if self.sender.send(Message::Deferred(future)).is_err() {
            report_discarded_future();
        }
    }

    /// Whether the promise has been dropped, meaning nothing can observe the outcome.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.sender.is_canceled()
    }
}

fn report_unhandled(rejection: &Rejection) {
    tracing::warn!(%rejection, "unhandled rejection of a function queue callback");
}

fn report_discarded_future() {
    tracing::warn!(
        "dropping unfinished function queue callback future because its promise is gone; \
         configure a spawner to run such futures to completion"
    );
}

impl<T> fmt::Debug for Resolve<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolve")
            .field("is_abandoned", &self.is_abandoned())
            .finish_non_exhaustive()
    }
}

/// The eventual result of a callback placed in a [`FunctionQueue`][crate::FunctionQueue].
///
/// Await the promise to obtain the value the callback returned (or the output of the future it
/// returned). The promise resolves with a [`Rejection`] if the callback panicked, if its future
/// could not be spawned or if the queue was dropped before the callback ever ran.
///
/// Dropping the promise does not cancel the callback; it still runs when the queue is flushed.
/// A failure that can no longer be reported through a dropped promise is logged as a `warn`
/// event instead.
///
/// Futures returned by callbacks need something to drive them. With a spawner configured via
/// [`FunctionQueueBuilder::spawner()`][crate::FunctionQueueBuilder::spawner], they run on that
/// executor whether or not anyone awaits the promise. Without one, the future is polled once when
/// the callback runs and the rest of it is driven by whoever awaits the promise. Dropping the
/// promise of such a future before it finishes cancels it, which is logged as a `warn` event.
///
/// The promise is a [`FusedFuture`]: once it has produced its outcome, further polls return
/// [`Poll::Pending`].
///
/// # Example
///
/// ```rust
/// use function_queue::FunctionQueue;
/// use futures::executor::block_on;
///
/// let owner = "plugin host".to_string();
/// let queue = FunctionQueue::<String>::new();
///
/// let promise = queue.enqueue(&owner, |owner| owner.len());
/// queue.flush(&owner);
///
/// assert_eq!(block_on(promise).unwrap(), 11);
/// ```
#[must_use = "the promise is the only place where the callback's result or failure is reported"]
pub struct Promise<T> {
    state: PromiseState<T>,
}

enum PromiseState<T> {
    Waiting(oneshot::Receiver<Message<T>>),
    Driving(LocalBoxFuture<'static, Settled<T>>),
    Done,
}

impl<T> Future for Promise<T> {
    type Output = Settled<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            match &mut this.state {
                PromiseState::Waiting(receiver) => {
                    let message = ready!(Pin::new(receiver).poll(cx));

                    match message {
                        Ok(Message::Value(value)) => {
                            this.state = PromiseState::Done;
                            return Poll::Ready(Ok(value));
                        }
                        Ok(Message::Rejected(rejection)) => {
                            this.state = PromiseState::Done;
                            return Poll::Ready(Err(rejection));
                        }
                        Ok(Message::Deferred(future)) => {
                            this.state = PromiseState::Driving(future);
                        }
                        Err(oneshot::Canceled) => {
                            this.state = PromiseState::Done;
                            return Poll::Ready(Err(Rejection::Abandoned));
                        }
                    }
                }
                PromiseState::Driving(future) => {
                    let settled = ready!(future.as_mut().poll(cx));
                    this.state = PromiseState::Done;
                    return Poll::Ready(settled);
                }
                PromiseState::Done => return Poll::Pending,
            }
        }
    }
}

impl<T> FusedFuture for Promise<T> {
    fn is_terminated(&self) -> bool {
        matches!(self.state, PromiseState::Done)
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        match &mut self.state {
            PromiseState::Waiting(receiver) => match receiver.try_recv() {
                Ok(Some(Message::Rejected(rejection))) => report_unhandled(&rejection),
                Ok(Some(Message::Deferred(_))) => report_discarded_future(),
                _ => {}
            },
            PromiseState::Driving(_) => report_discarded_future(),
            PromiseState::Done => {}
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            PromiseState::Waiting(_) => "waiting",
            PromiseState::Driving(_) => "driving",
            PromiseState::Done => "done",
        };

        f.debug_struct("Promise").field("state", &state).finish()
    }
}
