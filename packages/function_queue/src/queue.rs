use std::any::{self, Any};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::task::LocalSpawn;

use crate::latch::Latch;
use crate::promise::{self, Promise};
use crate::resolver::{Entry, pipe_resolver};
use crate::{ContextualError, FunctionQueueBuilder, Job};

/// Defers callbacks until the queue is flushed, then runs every later callback immediately.
///
/// The queue collects callbacks while it is pending. The first call to [`flush()`][Self::flush]
/// invokes the collected callbacks in the order they were enqueued, flips the queue into the
/// executed state and fires the optional lifecycle hook. From then on, [`enqueue()`][Self::enqueue]
/// invokes each callback before returning.
///
/// The queue does not own the object it is embedded in. Every operation that may invoke
/// callbacks takes that owner by reference and passes it on to them. Host types typically
/// expose the queue through the [`DeferredExecution`][crate::DeferredExecution] trait.
///
/// Each enqueued callback hands back a [`Promise`] that settles with the callback's result.
/// Futures returned by callbacks are not awaited by the queue: callbacks start in order but may
/// complete in any order.
///
/// # Thread safety
///
/// The queue is single-threaded. It is neither [`Send`] nor [`Sync`].
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
///
/// use function_queue::FunctionQueue;
///
/// let log = RefCell::new(Vec::new());
/// let queue = FunctionQueue::<RefCell<Vec<&str>>>::new();
///
/// drop(queue.enqueue(&log, |log| log.borrow_mut().push("A")));
/// drop(queue.enqueue(&log, |log| log.borrow_mut().push("B")));
/// assert!(log.borrow().is_empty());
///
/// queue.flush(&log);
/// assert_eq!(*log.borrow(), ["A", "B"]);
///
/// // The queue has been executed, so this runs right away.
/// drop(queue.enqueue(&log, |log| log.borrow_mut().push("C")));
/// assert_eq!(*log.borrow(), ["A", "B", "C"]);
/// ```
pub struct FunctionQueue<O> {
    latch: Cell<Latch>,

    // Never borrowed while an entry runs, as entries may enqueue more entries.
    entries: RefCell<VecDeque<Entry<O>>>,

    on_executed: Cell<Option<Box<dyn FnOnce()>>>,
    spawner: Option<Rc<dyn LocalSpawn>>,
}

impl<O> FunctionQueue<O>
where
    O: 'static,
{
    /// Creates a pending queue with no lifecycle hook and no spawner.
    ///
    /// Use [`builder()`][Self::builder] to customize the queue.
    #[must_use]
    pub fn new() -> Self {
        Self::new_inner(None, None)
    }

    /// Starts building a customized queue.
    pub fn builder() -> FunctionQueueBuilder<O> {
        FunctionQueueBuilder::new()
    }

    pub(crate) fn new_inner(
        on_executed: Option<Box<dyn FnOnce()>>,
        spawner: Option<Rc<dyn LocalSpawn>>,
    ) -> Self {
        Self {
            latch: Cell::new(Latch::Pending),
            entries: RefCell::new(VecDeque::new()),
            on_executed: Cell::new(on_executed),
            spawner,
        }
    }

    /// Whether the queue has been flushed. Once `true`, it stays `true`.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.latch.get().is_executed()
    }

    /// The number of callbacks waiting to be invoked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no callbacks are waiting to be invoked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Enqueues a callback that returns its result synchronously.
    ///
    /// If the queue has already been executed, the callback runs before this method returns.
    /// Otherwise it runs when the queue is flushed.
    pub fn enqueue<F, T>(&self, owner: &O, callback: F) -> Promise<T>
    where
        F: FnOnce(&O) -> T + 'static,
        T: 'static,
    {
        self.enqueue_job(owner, Job::new(callback))
    }

    /// Enqueues a callback that returns a future. The promise settles with the future's output.
    ///
    /// The callback itself is invoked the same way as with [`enqueue()`][Self::enqueue]. The
    /// future it returns is spawned onto the configured spawner. If there is none, the future is
    /// polled once right after the callback returns and the remainder is driven by whoever awaits
    /// the promise; dropping the promise before such a future finishes cancels it.
    pub fn enqueue_async<F, Fut>(&self, owner: &O, callback: F) -> Promise<Fut::Output>
    where
        F: FnOnce(&O) -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: 'static,
    {
        self.enqueue_job(owner, Job::deferred(callback))
    }

    /// Enqueues a prepared [`Job`].
    pub fn enqueue_job<T>(&self, owner: &O, job: Job<O, T>) -> Promise<T>
    where
        T: 'static,
    {
        let (resolve, promise) = promise::pair();
        let entry = pipe_resolver(job, resolve, self.spawner.clone());

        if self.is_executed() {
            // Anything left over from a flush pass goes first, to preserve enqueue order.
            self.drain(owner);

            tracing::trace!("function queue already executed, running callback immediately");
            entry(owner);
        } else {
            let mut entries = self.entries.borrow_mut();
            entries.push_back(entry);

            tracing::trace!(
                queued = entries.len(),
                "deferred callback until function queue is executed"
            );
        }

        promise
    }

    /// Enqueues a type-erased value, verifying at runtime that it is a callable producing `T`.
    ///
    /// Accepted inputs are a [`Job<O, T>`], a function pointer `fn(&O) -> T` and a boxed closure
    /// `Box<dyn FnOnce(&O) -> T>`. Closures and function items have unique types that cannot be
    /// recognized at runtime, so coerce them to one of those types first.
    ///
    /// # Errors
    ///
    /// Returns a [`Validation`][crate::ErrorKind::Validation] error naming the type of `input`
    /// if it is none of the accepted types. Neither the queue contents nor its execution state
    /// are affected in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use function_queue::{FunctionQueue, Job};
    ///
    /// let queue = FunctionQueue::<()>::new();
    ///
    /// let error = queue.try_enqueue::<u32, _>(&(), 42_i32).unwrap_err();
    /// assert_eq!(
    ///     error.message(),
    ///     "Cannot enqueue input of type \"i32\", expected a function."
    /// );
    ///
    /// let job = queue
    ///     .try_enqueue::<u32, _>(&(), Job::<(), u32>::new(|()| 42))
    ///     .unwrap();
    ///
    /// let boxed: Box<dyn FnOnce(&()) -> u32> = Box::new(|()| 7);
    /// let closure = queue.try_enqueue::<u32, _>(&(), boxed).unwrap();
    ///
    /// assert_eq!(queue.len(), 2);
    /// # drop((job, closure));
    /// ```
    pub fn try_enqueue<T, V>(&self, owner: &O, input: V) -> Result<Promise<T>, ContextualError>
    where
        T: 'static,
        V: Any,
    {
        let received = any::type_name::<V>();
        let input: Box<dyn Any> = Box::new(input);

        let input = match input.downcast::<Job<O, T>>() {
            Ok(job) => return Ok(self.enqueue_job(owner, *job)),
            Err(input) => input,
        };

        let input = match input.downcast::<fn(&O) -> T>() {
            Ok(function) => return Ok(self.enqueue(owner, *function)),
            Err(input) => input,
        };

        let Ok(closure) = input.downcast::<Box<dyn FnOnce(&O) -> T>>() else {
            tracing::debug!(received, "rejected non-callable function queue input");
            return Err(ContextualError::not_callable(received));
        };

        Ok(self.enqueue(owner, *closure))
    }

    /// Invokes the queued callbacks in the order they were enqueued and marks the queue as
    /// executed. Returns the owner.
    ///
    /// Only the callbacks queued at the moment this method is called are invoked. Callbacks
    /// that those callbacks enqueue are kept for the next `enqueue()` or `flush()` call, which
    /// runs them immediately because the queue is executed by then.
    ///
    /// The first call fires the lifecycle hook after the latch has flipped. Later calls never
    /// fire it again and never re-run a callback.
    ///
    /// A panicking callback rejects its own promise and does not prevent later callbacks from
    /// running. Futures returned by callbacks are not awaited.
    pub fn flush<'o>(&self, owner: &'o O) -> &'o O {
        if self.is_executed() {
            self.drain(owner);
            return owner;
        }

        self.drain(owner);

        // A callback may have flushed the queue from within the pass above.
        if !self.is_executed() {
            self.latch.set(Latch::Executed);

            tracing::debug!(
                left_for_next_pass = self.len(),
                "function queue executed"
            );

            if let Some(hook) = self.on_executed.take() {
                hook();
            }
        }

        owner
    }

    /// Invokes as many entries as the store held on entry, front first.
    fn drain(&self, owner: &O) {
        let pending = self.len();

        if pending == 0 {
            return;
        }

        tracing::debug!(pending, "draining function queue");

        for _ in 0..pending {
            let next = self.entries.borrow_mut().pop_front();

            // A nested flush may already have taken the rest.
            let Some(entry) = next else {
                break;
            };

            entry(owner);
        }
    }
}

impl<O> Default for FunctionQueue<O>
where
    O: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Drop for FunctionQueue<O> {
    fn drop(&mut self) {
        let abandoned = self.entries.get_mut().len();

        if abandoned > 0 {
            tracing::debug!(
                abandoned,
                "function queue dropped before its callbacks were invoked"
            );
        }
    }
}

impl<O> fmt::Debug for FunctionQueue<O> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionQueue")
            .field("latch", &self.latch.get())
            .field("len", &self.entries.try_borrow().map(|entries| entries.len()).ok())
            .field("has_spawner", &self.spawner.is_some())
            .finish_non_exhaustive()
    }
}
