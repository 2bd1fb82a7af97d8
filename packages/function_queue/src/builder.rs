use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use futures::task::LocalSpawn;

use crate::FunctionQueue;

/// Builder for creating an instance of [`FunctionQueue`].
///
/// All settings are optional. A queue built without any settings behaves like
/// [`FunctionQueue::new()`].
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use function_queue::FunctionQueue;
///
/// let ready = Rc::new(Cell::new(false));
///
/// let queue = FunctionQueue::<()>::builder()
///     .on_executed({
///         let ready = Rc::clone(&ready);
///         move || ready.set(true)
///     })
///     .build();
///
/// queue.flush(&());
/// assert!(ready.get());
/// ```
#[must_use]
pub struct FunctionQueueBuilder<O> {
    on_executed: Option<Box<dyn FnOnce()>>,
    spawner: Option<Rc<dyn LocalSpawn>>,

    _owner: PhantomData<fn(&O)>,
}

impl<O> FunctionQueueBuilder<O>
where
    O: 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            on_executed: None,
            spawner: None,
            _owner: PhantomData,
        }
    }

    /// Sets the lifecycle hook that runs once the queue has been flushed for the first time.
    ///
    /// The hook runs exactly once, after the latch has flipped to the executed state and before
    /// [`FunctionQueue::flush()`] returns. By default there is no hook.
    pub fn on_executed<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        self.on_executed = Some(Box::new(hook));
        self
    }

    /// Sets the executor that drives futures returned by callbacks.
    ///
    /// With a spawner, a callback's future is spawned the moment the callback is invoked and
    /// runs to completion even if nobody awaits the promise. Without one, the future is polled
    /// once when the callback is invoked and the rest of it is driven by whoever awaits the
    /// promise. A future that is still unfinished when its promise is dropped is then cancelled
    /// and a `warn` event is logged.
    ///
    /// # Examples
    ///
    /// ```
    /// use function_queue::FunctionQueue;
    /// use futures::executor::LocalPool;
    /// use futures::future;
    ///
    /// let mut pool = LocalPool::new();
    ///
    /// let queue = FunctionQueue::<()>::builder()
    ///     .spawner(pool.spawner())
    ///     .build();
    ///
    /// let promise = queue.enqueue_async(&(), |()| future::ready("done"));
    /// queue.flush(&());
    ///
    /// assert_eq!(pool.run_until(promise).unwrap(), "done");
    /// ```
    pub fn spawner<S>(mut self, spawner: S) -> Self
    where
        S: LocalSpawn + 'static,
    {
        self.spawner = Some(Rc::new(spawner));
        self
    }

    /// Builds the queue with the specified configuration.
    #[must_use]
    pub fn build(self) -> FunctionQueue<O> {
        FunctionQueue::new_inner(self.on_executed, self.spawner)
    }
}

impl<O> fmt::Debug for FunctionQueueBuilder<O> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionQueueBuilder")
            .field("has_on_executed", &self.on_executed.is_some())
            .field("has_spawner", &self.spawner.is_some())
            .finish()
    }
}
