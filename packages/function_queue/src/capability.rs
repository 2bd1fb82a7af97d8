use std::any::Any;
use std::future::Future;

use crate::{ContextualError, FunctionQueue, Promise};

/// Gives a host type the deferred execution capability of an embedded [`FunctionQueue`].
///
/// Implement [`function_queue()`][Self::function_queue] to point at the queue the type holds;
/// every other method is provided and passes `self` to the queued callbacks as their owner.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
///
/// use function_queue::{DeferredExecution, FunctionQueue};
///
/// #[derive(Default)]
/// struct PluginHost {
///     loaded: RefCell<Vec<&'static str>>,
///     setup: FunctionQueue<PluginHost>,
/// }
///
/// impl DeferredExecution for PluginHost {
///     fn function_queue(&self) -> &FunctionQueue<Self> {
///         &self.setup
///     }
/// }
///
/// let host = PluginHost::default();
///
/// drop(host.enqueue(|host| host.loaded.borrow_mut().push("lint")));
/// assert!(host.loaded.borrow().is_empty());
///
/// host.execute();
/// assert!(host.is_executed());
/// assert_eq!(*host.loaded.borrow(), ["lint"]);
/// ```
pub trait DeferredExecution: Sized + 'static {
    /// The queue that holds this object's deferred callbacks.
    fn function_queue(&self) -> &FunctionQueue<Self>;

    /// Whether the deferred callbacks have been executed.
    ///
    /// See [`FunctionQueue::is_executed()`].
    #[must_use]
    fn is_executed(&self) -> bool {
        self.function_queue().is_executed()
    }

    /// Defers `callback` until [`execute()`][Self::execute], or runs it right away if that has
    /// already happened.
    ///
    /// See [`FunctionQueue::enqueue()`].
    fn enqueue<F, T>(&self, callback: F) -> Promise<T>
    where
        F: FnOnce(&Self) -> T + 'static,
        T: 'static,
    {
        self.function_queue().enqueue(self, callback)
    }

    /// Defers a callback that returns a future.
    ///
    /// See [`FunctionQueue::enqueue_async()`].
    fn enqueue_async<F, Fut>(&self, callback: F) -> Promise<Fut::Output>
    where
        F: FnOnce(&Self) -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: 'static,
    {
        self.function_queue().enqueue_async(self, callback)
    }

    /// Defers a type-erased callback after checking that it is callable.
    ///
    /// See [`FunctionQueue::try_enqueue()`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if `input` is not a [`Job<Self, T>`][crate::Job], a
    /// `fn(&Self) -> T` or a `Box<dyn FnOnce(&Self) -> T>`.
    fn try_enqueue<T, V>(&self, input: V) -> Result<Promise<T>, ContextualError>
    where
        T: 'static,
        V: Any,
    {
        self.function_queue().try_enqueue(self, input)
    }

    /// Runs the deferred callbacks and switches to running new callbacks immediately.
    ///
    /// See [`FunctionQueue::flush()`].
    fn execute(&self) -> &Self {
        self.function_queue().flush(self)
    }
}
